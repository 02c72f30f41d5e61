use nr_core::Voice;

/// Picks a voice for `locale`: an exact locale match first, then the same language.
/// `None` leaves the choice to the engine.
pub fn select_voice(voices: &[Voice], locale: &str) -> Option<Voice> {
    let wanted = normalize(locale);
    let family = language(&wanted);

    best_of(voices.iter().filter(|v| normalize(&v.locale) == wanted))
        .or_else(|| best_of(voices.iter().filter(|v| language(&normalize(&v.locale)) == family)))
        .cloned()
}

fn best_of<'a>(mut candidates: impl Iterator<Item = &'a Voice>) -> Option<&'a Voice> {
    let first = candidates.next()?;
    if first.default {
        return Some(first);
    }
    Some(candidates.find(|v| v.default).unwrap_or(first))
}

fn normalize(locale: &str) -> String {
    locale.trim().replace('_', "-").to_ascii_lowercase()
}

fn language(locale: &str) -> &str {
    locale.split('-').next().unwrap_or(locale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, locale: &str, default: bool) -> Voice {
        Voice {
            name: name.to_string(),
            locale: locale.to_string(),
            default,
        }
    }

    #[test]
    fn test_exact_match_wins() {
        let voices = vec![
            voice("anna", "de-DE", true),
            voice("leni", "de_CH", false),
            voice("tom", "en-US", false),
        ];
        assert_eq!(select_voice(&voices, "de-CH").unwrap().name, "leni");
    }

    #[test]
    fn test_language_family_fallback() {
        let voices = vec![
            voice("tom", "en-US", false),
            voice("jonas", "de-AT", false),
            voice("anna", "de-DE", true),
        ];
        assert_eq!(select_voice(&voices, "de-CH").unwrap().name, "anna");
    }

    #[test]
    fn test_no_match_defers_to_engine() {
        let voices = vec![voice("tom", "en-US", true)];
        assert_eq!(select_voice(&voices, "de-CH"), None);
        assert_eq!(select_voice(&[], "de-CH"), None);
    }
}

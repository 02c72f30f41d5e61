/// Default upper bound for one utterance, in characters.
pub const MAX_CHUNK_CHARS: usize = 220;

/// Splits `text` into utterance-sized chunks of at most `max_chars` characters.
///
/// Each cut prefers the last sentence end before the limit, then the last whitespace,
/// then a hard cut on a character boundary. Chunks are trimmed and never empty.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let limit = match rest.char_indices().nth(max_chars) {
            Some((byte, _)) => byte,
            None => {
                chunks.push(rest.to_string());
                break;
            }
        };

        let cut = sentence_cut(rest, limit)
            .or_else(|| whitespace_cut(rest, limit))
            .unwrap_or(limit);

        let chunk = rest[..cut].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = rest[cut..].trim_start();
    }
    chunks
}

/// Byte offset just past the last sentence terminator in `rest[..limit]` that is
/// followed by whitespace
fn sentence_cut(rest: &str, limit: usize) -> Option<usize> {
    rest[..limit]
        .char_indices()
        .filter(|(_, c)| matches!(c, '.' | '!' | '?' | '…'))
        .map(|(i, c)| i + c.len_utf8())
        .filter(|&end| end <= limit && rest[end..].starts_with(char::is_whitespace))
        .last()
}

fn whitespace_cut(rest: &str, limit: usize) -> Option<usize> {
    rest.char_indices()
        .take_while(|(i, _)| *i <= limit)
        .filter(|(i, c)| *i > 0 && c.is_whitespace())
        .map(|(i, _)| i)
        .last()
}

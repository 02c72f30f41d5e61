use crate::{keys, load_json};
use nr_core::{Article, KeyValueStore, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Eviction never trims the collection below this many articles.
pub const MIN_RETAINED: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The first write hit the quota; the oldest articles were dropped and the retry succeeded
    Evicted { kept: usize, removed: usize },
    /// The retry failed as well; nothing new was written
    Exhausted,
}

/// Result of a save: the outcome and the collection that is now authoritative.
#[derive(Debug, Clone)]
pub struct Persisted {
    pub outcome: SaveOutcome,
    pub articles: Vec<Article>,
}

/// The persisted article collection, stored newest first under one key.
#[derive(Clone)]
pub struct CollectionStore {
    store: Arc<dyn KeyValueStore>,
}

impl CollectionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(!self.load()?.is_empty())
    }

    /// Stored articles; a missing or unreadable value yields an empty collection
    pub fn load(&self) -> Result<Vec<Article>> {
        match load_json::<Vec<Article>>(self.store.as_ref(), keys::ARTICLES) {
            Ok(articles) => Ok(articles.unwrap_or_default()),
            Err(e) if matches!(e, nr_core::Error::Serialization(_)) => {
                warn!("⚠️ Stored articles are unreadable, starting empty: {}", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Writes the collection. A quota failure evicts the oldest half (keeping at least
    /// [`MIN_RETAINED`]) and retries once.
    pub fn save(&self, articles: Vec<Article>) -> Result<Persisted> {
        let json = serde_json::to_string(&articles)?;
        match self.store.set(keys::ARTICLES, &json) {
            Ok(()) => {
                return Ok(Persisted {
                    outcome: SaveOutcome::Saved,
                    articles,
                })
            }
            Err(e) if e.is_quota() => warn!("⚠️ {}; evicting oldest articles", e),
            Err(e) => return Err(e),
        }

        let kept = retained_len(articles.len());
        let evicted: Vec<Article> = articles.iter().take(kept).cloned().collect();
        let json = serde_json::to_string(&evicted)?;
        match self.store.set(keys::ARTICLES, &json) {
            Ok(()) => {
                let removed = articles.len() - kept;
                info!("💾 Stored {} articles after evicting {}", kept, removed);
                Ok(Persisted {
                    outcome: SaveOutcome::Evicted { kept, removed },
                    articles: evicted,
                })
            }
            Err(e) => {
                warn!("⚠️ Storage exhausted after eviction: {}", e);
                Ok(Persisted {
                    outcome: SaveOutcome::Exhausted,
                    articles,
                })
            }
        }
    }
}

fn retained_len(len: usize) -> usize {
    (len - len / 2).max(MIN_RETAINED).min(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MemoryConfig, MemoryStorage};

    fn article(n: usize) -> Article {
        Article {
            id: format!("https://example.org/{}", n),
            title: format!("Article {}", n),
            published_at: format!("2025-01-01T08:{:02}:00", 59 - n),
            category: "general".to_string(),
            url: format!("https://example.org/{}", n),
            content: "x".repeat(40),
            raw_content: "x".repeat(40),
            summary: None,
        }
    }

    fn articles(n: usize) -> Vec<Article> {
        (0..n).map(article).collect()
    }

    #[test]
    fn test_retained_len() {
        assert_eq!(retained_len(0), 0);
        assert_eq!(retained_len(4), 4);
        assert_eq!(retained_len(15), 10);
        assert_eq!(retained_len(24), 12);
        assert_eq!(retained_len(25), 13);
    }

    #[test]
    fn test_save_and_load() {
        let store = CollectionStore::new(Arc::new(MemoryStorage::new()));
        assert!(!store.exists().unwrap());

        let persisted = store.save(articles(3)).unwrap();
        assert_eq!(persisted.outcome, SaveOutcome::Saved);
        assert_eq!(store.load().unwrap(), articles(3));
        assert!(store.exists().unwrap());
    }

    #[test]
    fn test_quota_evicts_oldest_half() {
        let full = serde_json::to_string(&articles(24)).unwrap().len();
        let half = serde_json::to_string(&articles(12)).unwrap().len();
        let quota = keys::ARTICLES.len() + (full + half) / 2;
        let store = CollectionStore::new(Arc::new(MemoryStorage::with_config(MemoryConfig {
            quota_bytes: Some(quota),
        })));

        let persisted = store.save(articles(24)).unwrap();
        assert_eq!(
            persisted.outcome,
            SaveOutcome::Evicted {
                kept: 12,
                removed: 12
            }
        );
        assert_eq!(persisted.articles, articles(12));
        assert_eq!(store.load().unwrap(), articles(12));
    }

    #[test]
    fn test_second_failure_reports_exhausted() {
        let store = CollectionStore::new(Arc::new(MemoryStorage::with_config(MemoryConfig {
            quota_bytes: Some(64),
        })));

        let persisted = store.save(articles(30)).unwrap();
        assert_eq!(persisted.outcome, SaveOutcome::Exhausted);
        // the merged set stays authoritative in memory
        assert_eq!(persisted.articles.len(), 30);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_eviction_never_below_minimum() {
        let ten = serde_json::to_string(&articles(10)).unwrap().len();
        let store = CollectionStore::new(Arc::new(MemoryStorage::with_config(MemoryConfig {
            quota_bytes: Some(keys::ARTICLES.len() + ten),
        })));

        let persisted = store.save(articles(14)).unwrap();
        assert_eq!(
            persisted.outcome,
            SaveOutcome::Evicted {
                kept: 10,
                removed: 4
            }
        );
    }

    #[test]
    fn test_corrupt_value_loads_empty() {
        let kv = Arc::new(MemoryStorage::new());
        kv.set(keys::ARTICLES, "{not json").unwrap();
        let store = CollectionStore::new(kv);
        assert!(store.load().unwrap().is_empty());
    }
}

use crate::archive::{read_package, ArchiveDescriptor, ArchiveSource};
use crate::parser::{parse_bytes, ParserLabels};
use chrono::{FixedOffset, Utc};
use nr_core::{sort_newest_first, Article, KeyValueStore, Result};
use nr_storage::{state, CollectionStore, SaveOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Outcome of one ingestion call.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// The collection now authoritative for the session, newest first
    pub articles: Vec<Article>,
    pub archive_date: String,
    pub parsed: usize,
    pub skipped: usize,
    pub storage: SaveOutcome,
    /// True when `fetch_latest` found nothing newer and skipped the download
    pub up_to_date: bool,
}

impl IngestReport {
    pub fn storage_exhausted(&self) -> bool {
        self.storage == SaveOutcome::Exhausted
    }
}

/// Downloads, parses and merges archive packages into the stored collection.
pub struct IngestionService {
    source: Arc<dyn ArchiveSource>,
    store: Arc<dyn KeyValueStore>,
    collection: CollectionStore,
    labels: ParserLabels,
    offset: FixedOffset,
    fetch_lock: Mutex<()>,
}

impl IngestionService {
    pub fn new(
        source: Arc<dyn ArchiveSource>,
        store: Arc<dyn KeyValueStore>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            source,
            collection: CollectionStore::new(store.clone()),
            store,
            labels: ParserLabels::default(),
            offset,
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn with_labels(mut self, labels: ParserLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn load_local(&self) -> Result<Vec<Article>> {
        self.collection.load()
    }

    /// Remote archive dates, newest first
    pub async fn available_dates(&self) -> Result<Vec<String>> {
        let mut dates: Vec<String> = self
            .source
            .catalogue()
            .await?
            .into_iter()
            .map(|a| a.date)
            .collect();
        dates.sort_by(|a, b| b.cmp(a));
        dates.dedup();
        Ok(dates)
    }

    pub async fn fetch_latest(&self) -> Result<IngestReport> {
        let _guard = self.fetch_lock.lock().await;

        let latest = self.source.latest().await?;
        let last_update = state::load_last_update(self.store.as_ref())?;
        if last_update.as_deref() == Some(latest.date.as_str()) {
            let local = self.collection.load()?;
            if !local.is_empty() {
                info!("✨ Archive {} already merged, {} local articles", latest.date, local.len());
                return Ok(IngestReport {
                    articles: local,
                    archive_date: latest.date,
                    parsed: 0,
                    skipped: 0,
                    storage: SaveOutcome::Saved,
                    up_to_date: true,
                });
            }
        }

        let report = self.ingest(&latest).await?;
        if report.storage_exhausted() {
            warn!("⚠️ Archive {} not persisted, will retry next fetch", latest.date);
            return Ok(report);
        }
        if let Err(e) = state::store_last_update(self.store.as_ref(), &latest.date) {
            warn!("⚠️ Could not record last update {}: {}", latest.date, e);
        }
        Ok(report)
    }

    pub async fn fetch_for_date(&self, date: &str) -> Result<IngestReport> {
        let _guard = self.fetch_lock.lock().await;
        let archive = ArchiveDescriptor {
            date: date.to_string(),
            download_url: None,
        };
        self.ingest(&archive).await
    }

    async fn ingest(&self, archive: &ArchiveDescriptor) -> Result<IngestReport> {
        info!("📰 Downloading archive {}", archive.date);
        let bytes = self.source.download(archive).await?;
        let (fresh, skipped) = self.parse_package(&bytes)?;
        let parsed = fresh.len();
        info!("📑 Parsed {} articles from {} ({} skipped)", parsed, archive.date, skipped);

        let existing = self.collection.load()?;
        let merged = merge(fresh, existing, &self.offset);
        let persisted = self.collection.save(merged)?;
        info!("💾 Collection now holds {} articles", persisted.articles.len());

        Ok(IngestReport {
            articles: persisted.articles,
            archive_date: archive.date.clone(),
            parsed,
            skipped,
            storage: persisted.outcome,
            up_to_date: false,
        })
    }

    /// Parses every entry of a package; failures are logged, counted and skipped
    pub fn parse_package(&self, bytes: &[u8]) -> Result<(Vec<Article>, usize)> {
        let ingested_at = Utc::now();
        let mut articles = Vec::new();
        let mut skipped = 0;
        for (path, data) in read_package(bytes)? {
            match parse_bytes(&data, &path, ingested_at, &self.labels) {
                Ok(article) => articles.push(article),
                Err(e) => {
                    warn!("⚠️ Skipping entry: {}", e);
                    skipped += 1;
                }
            }
        }
        Ok((articles, skipped))
    }
}

/// Fresh articles take precedence by id (first occurrence wins); stored articles are kept
/// only for ids the fresh set lacks. The union is sorted newest first.
pub fn merge(fresh: Vec<Article>, existing: Vec<Article>, offset: &FixedOffset) -> Vec<Article> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(fresh.len() + existing.len());
    for article in fresh.into_iter().chain(existing) {
        if seen.insert(article.id.clone()) {
            merged.push(article);
        } else {
            debug!("Dropping duplicate article {}", article.id);
        }
    }
    sort_newest_first(&mut merged, offset);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::build_package;
    use nr_core::Error;
    use nr_storage::{keys, MemoryConfig, MemoryStorage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeSource {
        latest_date: String,
        package: Vec<u8>,
        downloads: AtomicUsize,
        offline: bool,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn new(date: &str, entries: &[(&str, &str)]) -> Self {
            Self {
                latest_date: date.to_string(),
                package: build_package(entries),
                downloads: AtomicUsize::new(0),
                offline: false,
                delay: None,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl ArchiveSource for FakeSource {
        async fn latest(&self) -> Result<ArchiveDescriptor> {
            if self.offline {
                return Err(Error::Network("offline".to_string()));
            }
            Ok(ArchiveDescriptor {
                date: self.latest_date.clone(),
                download_url: None,
            })
        }

        async fn catalogue(&self) -> Result<Vec<ArchiveDescriptor>> {
            Ok(["2025-01-01", "2025-01-03", "2025-01-02"]
                .iter()
                .map(|d| ArchiveDescriptor {
                    date: d.to_string(),
                    download_url: None,
                })
                .collect())
        }

        async fn download(&self, _archive: &ArchiveDescriptor) -> Result<Vec<u8>> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(self.package.clone())
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn entry(title: &str, date: &str, category: Option<&str>, url: &str) -> String {
        let mut raw = format!("# {}\n\n**Datum:** {}\n\n", title, date);
        if let Some(category) = category {
            raw.push_str(&format!("**Kategorie:** {}\n\n", category));
        }
        raw.push_str(&format!("**URL:** {}\n\n---\n\nBody of {}.\n", url, title));
        raw
    }

    fn scenario_entries() -> Vec<(String, String)> {
        vec![
            (
                "2025-01-03/one.md".to_string(),
                entry("One", "2025-01-01T08:00:00", Some("Welt"), "https://example.org/1"),
            ),
            (
                "2025-01-03/two.md".to_string(),
                entry("Two", "2025-01-03T08:00:00", Some("Schweiz"), "https://example.org/2"),
            ),
            (
                "2025-01-03/three.md".to_string(),
                entry("Three", "2025-01-02T08:00:00", None, "https://example.org/3"),
            ),
            ("2025-01-03/manifest.json".to_string(), "{}".to_string()),
        ]
    }

    fn service_with(source: Arc<FakeSource>) -> (IngestionService, Arc<MemoryStorage>) {
        let kv = Arc::new(MemoryStorage::new());
        (IngestionService::new(source, kv.clone(), utc()), kv)
    }

    fn fake(date: &str, entries: &[(String, String)]) -> Arc<FakeSource> {
        let refs: Vec<(&str, &str)> = entries
            .iter()
            .map(|(n, d)| (n.as_str(), d.as_str()))
            .collect();
        Arc::new(FakeSource::new(date, &refs))
    }

    #[tokio::test]
    async fn test_three_entries_sorted_with_default_category() {
        let (service, kv) = service_with(fake("2025-01-03", &scenario_entries()));
        let report = service.fetch_latest().await.unwrap();

        let titles: Vec<_> = report.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Two", "Three", "One"]);
        assert_eq!(report.articles[1].category, "general");
        assert_eq!(report.parsed, 3);
        assert_eq!(report.skipped, 0);
        assert!(!report.up_to_date);
        assert_eq!(kv.get(keys::LAST_UPDATE).unwrap().as_deref(), Some("2025-01-03"));
        assert_eq!(service.load_local().unwrap(), report.articles);
    }

    #[tokio::test]
    async fn test_unchanged_remote_date_skips_download() {
        let source = fake("2025-01-03", &scenario_entries());
        let (service, _kv) = service_with(source.clone());
        let first = service.fetch_latest().await.unwrap();
        let second = service.fetch_latest().await.unwrap();

        assert!(second.up_to_date);
        assert_eq!(second.articles, first.articles);
        assert_eq!(source.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let (service, _kv) = service_with(fake("2025-01-03", &scenario_entries()));
        let first = service.fetch_for_date("2025-01-03").await.unwrap();
        let second = service.fetch_for_date("2025-01-03").await.unwrap();
        assert_eq!(first.articles, second.articles);
        assert_eq!(second.articles.len(), 3);
    }

    #[tokio::test]
    async fn test_fresh_articles_take_precedence() {
        let (service, kv) = service_with(fake("2025-01-03", &scenario_entries()));
        let old_two = entry("Two (old)", "2025-01-03T08:00:00", None, "https://example.org/2");
        let mut stale = service
            .parse_package(&build_package(&[("old/two.md", old_two.as_str())]))
            .unwrap()
            .0;
        stale.push(Article {
            id: "kept".to_string(),
            title: "Kept".to_string(),
            published_at: "2024-12-31".to_string(),
            category: "general".to_string(),
            url: String::new(),
            content: String::new(),
            raw_content: String::new(),
            summary: None,
        });
        CollectionStore::new(kv).save(stale).unwrap();

        let report = service.fetch_for_date("2025-01-03").await.unwrap();
        let two = report.articles.iter().find(|a| a.id == "https://example.org/2").unwrap();
        assert_eq!(two.title, "Two");
        assert_eq!(report.articles.len(), 4);
        assert_eq!(report.articles.last().unwrap().id, "kept");
    }

    #[tokio::test]
    async fn test_broken_entries_are_skipped() {
        let mut entries = scenario_entries();
        entries.push(("2025-01-03/empty.md".to_string(), "   \n".to_string()));
        let (service, _kv) = service_with(fake("2025-01-03", &entries));
        let report = service.fetch_latest().await.unwrap();
        assert_eq!(report.parsed, 3);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_network_failure_leaves_store_untouched() {
        let mut source = FakeSource::new("2025-01-03", &[]);
        source.offline = true;
        let (service, kv) = service_with(Arc::new(source));
        let err = service.fetch_latest().await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(kv.get(keys::ARTICLES).unwrap(), None);
        assert_eq!(kv.get(keys::LAST_UPDATE).unwrap(), None);
    }

    #[tokio::test]
    async fn test_exhausted_storage_does_not_mark_archive_merged() {
        let body = "Lang. ".repeat(200);
        let entries: Vec<(String, String)> = ["one", "two"]
            .iter()
            .map(|name| {
                let mut raw = entry(name, "2025-01-03T08:00:00", None, &format!("https://example.org/{}", name));
                raw.push_str(&body);
                (format!("2025-01-03/{}.md", name), raw)
            })
            .collect();
        let source = fake("2025-01-03", &entries);
        let kv = Arc::new(MemoryStorage::with_config(MemoryConfig {
            quota_bytes: Some(600),
        }));
        let service = IngestionService::new(source.clone(), kv.clone(), utc());

        let first = service.fetch_latest().await.unwrap();
        assert!(first.storage_exhausted());
        assert_eq!(first.articles.len(), 2);
        assert_eq!(kv.get(keys::LAST_UPDATE).unwrap(), None);

        let second = service.fetch_latest().await.unwrap();
        assert!(!second.up_to_date);
        assert_eq!(source.downloads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_overlapping_fetches_run_one_at_a_time() {
        let mut source = FakeSource::new("2025-01-03", &[]);
        source.package = build_package(&[(
            "2025-01-03/two.md",
            entry("Two", "2025-01-03T08:00:00", None, "https://example.org/2").as_str(),
        )]);
        source.delay = Some(Duration::from_millis(30));
        let source = Arc::new(source);
        let (service, _kv) = service_with(source.clone());

        let (latest, dated) = tokio::join!(
            service.fetch_latest(),
            service.fetch_for_date("2025-01-03")
        );
        assert!(latest.is_ok());
        assert_eq!(dated.unwrap().articles.len(), 1);
        assert_eq!(source.downloads.load(Ordering::SeqCst), 2);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_available_dates_descending() {
        let (service, _kv) = service_with(fake("2025-01-03", &scenario_entries()));
        assert_eq!(
            service.available_dates().await.unwrap(),
            vec!["2025-01-03", "2025-01-02", "2025-01-01"]
        );
    }

    #[test]
    fn test_merge_first_occurrence_wins() {
        let mut a = Article {
            id: "same".to_string(),
            title: "first".to_string(),
            published_at: "2025-01-01".to_string(),
            category: "general".to_string(),
            url: String::new(),
            content: String::new(),
            raw_content: String::new(),
            summary: None,
        };
        let mut b = a.clone();
        b.title = "second".to_string();
        let merged = merge(vec![a.clone(), b], vec![], &utc());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "first");

        a.title = "stored".to_string();
        let merged = merge(vec![], vec![a], &utc());
        assert_eq!(merged[0].title, "stored");
    }
}

use crate::archive::{ArchiveDescriptor, ArchiveSource};
use async_trait::async_trait;
use nr_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Deserialize)]
struct CatalogueResponse {
    archives: Vec<ArchiveDescriptor>,
}

/// Archive catalogue served over HTTP: `{base}/latest`, `{base}/list`, `{base}/download/{date}`.
pub struct HttpArchiveSource {
    client: Client,
    base: Url,
}

impl HttpArchiveSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = normalize_base(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid archive path {}: {}", path, e)))
    }

    /// The descriptor's download URL resolved against the base, or the conventional path
    pub fn download_url(&self, archive: &ArchiveDescriptor) -> Result<Url> {
        match archive.download_url.as_deref() {
            Some(url) if !url.trim().is_empty() => self.endpoint(url.trim()),
            _ => self.endpoint(&format!("download/{}", archive.date)),
        }
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", url, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("{} returned {}", url, status)));
        }
        Ok(response)
    }
}

fn normalize_base(base_url: &str) -> Result<Url> {
    let mut raw = base_url.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid archive base URL {}: {}", base_url, e)))
}

#[async_trait]
impl ArchiveSource for HttpArchiveSource {
    async fn latest(&self) -> Result<ArchiveDescriptor> {
        let response = self.get(self.endpoint("latest")?).await?;
        Ok(response.json::<ArchiveDescriptor>().await?)
    }

    async fn catalogue(&self) -> Result<Vec<ArchiveDescriptor>> {
        let response = self.get(self.endpoint("list")?).await?;
        let mut archives = response.json::<CatalogueResponse>().await?.archives;
        archives.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(archives)
    }

    async fn download(&self, archive: &ArchiveDescriptor) -> Result<Vec<u8>> {
        let response = self.get(self.download_url(archive)?).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

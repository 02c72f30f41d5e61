use async_trait::async_trait;
use nr_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// One published archive as announced by the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDescriptor {
    pub date: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Remote catalogue of dated archive packages.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Descriptor of the most recent archive
    async fn latest(&self) -> Result<ArchiveDescriptor>;

    /// All available archives, newest first
    async fn catalogue(&self) -> Result<Vec<ArchiveDescriptor>>;

    /// Raw zip package bytes for one archive
    async fn download(&self, archive: &ArchiveDescriptor) -> Result<Vec<u8>>;
}

/// Article entries of a zip package as `(path, bytes)`, in archive order.
/// Directories, non-markdown files and manifest entries are left out.
pub fn read_package(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| Error::Archive(e.to_string()))?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Archive(e.to_string()))?;
        let name = entry.name().to_string();
        if entry.is_dir() || !is_article_entry(&name) {
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((name, data));
    }
    Ok(entries)
}

fn is_article_entry(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".md") && !name.contains("manifest")
}

#[cfg(test)]
pub(crate) fn build_package(entries: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, data) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

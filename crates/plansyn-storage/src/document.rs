//! Content-addressed archive for downloaded plan documents.
//!
//! A downloaded document lands at `<source>/<sha256>.<ext>` under the
//! archive root, with the extension taken from its download URL. The
//! same bytes fetched again, in this run or a later one, resolve to the
//! same path and are recognized instead of re-written. Writes stage
//! through a temp file and rename, so a crashed run never leaves a
//! partial document at a final path.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

/// Outcome of archiving one document.
#[derive(Debug, Clone)]
pub struct ArchivedDocument {
    pub content_hash: String,
    pub path: PathBuf,
    pub byte_count: usize,
    /// False when the same content was already archived.
    pub was_new: bool,
}

#[derive(Debug, Clone)]
pub struct DocumentArchive {
    root: PathBuf,
}

impl DocumentArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Archive one downloaded document, deduplicating by content hash.
    pub async fn archive(
        &self,
        source: &str,
        origin_url: &str,
        bytes: &[u8],
    ) -> Result<ArchivedDocument> {
        let content_hash = content_hash(bytes);
        let dir = self.root.join(source);
        let path = dir.join(format!("{content_hash}.{}", extension_from_url(origin_url)));

        if fs::try_exists(&path)
            .await
            .with_context(|| format!("checking {}", path.display()))?
        {
            return Ok(ArchivedDocument {
                content_hash,
                path,
                byte_count: bytes.len(),
                was_new: false,
            });
        }

        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let staging = dir.join(format!(".{}.part", Uuid::new_v4()));
        fs::write(&staging, bytes)
            .await
            .with_context(|| format!("staging {}", staging.display()))?;
        if let Err(err) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(err).with_context(|| format!("publishing {}", path.display()));
        }

        Ok(ArchivedDocument {
            content_hash,
            path,
            byte_count: bytes.len(),
            was_new: true,
        })
    }
}

fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// File extension from the URL's final path segment. Query strings and
/// fragments are ignored; segments without a short alphanumeric extension
/// fall back to `bin`.
fn extension_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or("");
    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=8).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extension_comes_from_the_url_path() {
        assert_eq!(extension_from_url("https://x.no/plan.pdf"), "pdf");
        assert_eq!(extension_from_url("https://x.no/a/b/data.sos?key=1"), "sos");
        assert_eq!(extension_from_url("https://x.no/download"), "bin");
        assert_eq!(extension_from_url("https://x.no/plan.tar.gz#frag"), "gz");
        assert_eq!(extension_from_url("https://x.no/.hidden"), "bin");
        assert_eq!(extension_from_url("https://x.no/odd.ex-t"), "bin");
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(
            content_hash(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn same_bytes_archive_once() {
        let dir = tempdir().expect("tempdir");
        let archive = DocumentArchive::new(dir.path());

        let first = archive
            .archive("geonorge", "https://x.no/plan.pdf", b"%PDF-1.4 same")
            .await
            .expect("first");
        let second = archive
            .archive("geonorge", "https://x.no/plan.pdf", b"%PDF-1.4 same")
            .await
            .expect("second");

        assert!(first.was_new);
        assert!(!second.was_new);
        assert_eq!(first.path, second.path);
        assert!(first.path.exists());
        assert_eq!(
            std::fs::read(&first.path).expect("read back"),
            b"%PDF-1.4 same"
        );
    }

    #[tokio::test]
    async fn sources_archive_into_separate_directories() {
        let dir = tempdir().expect("tempdir");
        let archive = DocumentArchive::new(dir.path());

        let a = archive
            .archive("geonorge", "https://x.no/a.sos", b"sosi bytes")
            .await
            .expect("a");
        let b = archive
            .archive("oslo_origo", "https://x.no/a.sos", b"sosi bytes")
            .await
            .expect("b");

        assert!(a.path.starts_with(dir.path().join("geonorge")));
        assert!(b.path.starts_with(dir.path().join("oslo_origo")));
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[tokio::test]
    async fn no_staging_files_remain_after_archiving() {
        let dir = tempdir().expect("tempdir");
        let archive = DocumentArchive::new(dir.path());
        archive
            .archive("geonorge", "https://x.no/plan.pdf", b"bytes")
            .await
            .expect("archive");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("geonorge"))
            .expect("read dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }
}

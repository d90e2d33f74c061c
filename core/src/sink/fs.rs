use crate::determinism::run_id::sha256_hex;
use crate::error::{CoreError, CoreResult};
use std::fs;
use std::path::{Component, Path, PathBuf};
use time::{Duration, OffsetDateTime};
use tracing::info;
use url::Url;

use super::interface::{ReportSink, StoredReport};

/// Stores report objects under a local directory, laid out by object key.
pub struct FsReportSink {
    root: PathBuf,
    destination: String,
}

impl FsReportSink {
    pub fn create(root: impl AsRef<Path>) -> CoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let root = fs::canonicalize(&root)?;
        Ok(Self {
            destination: root.to_string_lossy().to_string(),
            root,
        })
    }

    pub fn path_for(&self, object_key: &str) -> CoreResult<PathBuf> {
        let rel = Path::new(object_key);
        if object_key.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(CoreError::Sink(format!("invalid object key {:?}", object_key)));
        }
        Ok(self.root.join(rel))
    }
}

impl ReportSink for FsReportSink {
    fn destination(&self) -> &str {
        &self.destination
    }

    fn store(&self, object_key: &str, bytes: &[u8]) -> CoreResult<StoredReport> {
        let path = self.path_for(object_key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a retried store never observes a torn object.
        let tmp = path.with_extension("partial");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        info!(object_key, size_bytes = bytes.len(), "stored report");
        Ok(StoredReport {
            destination: self.destination.clone(),
            object_key: object_key.to_string(),
            sha256: sha256_hex(bytes),
            size_bytes: bytes.len() as u64,
        })
    }

    fn retrieval_link(&self, stored: &StoredReport, expires_in: Duration) -> CoreResult<String> {
        let path = self.path_for(&stored.object_key)?;
        if !path.is_file() {
            return Err(CoreError::Sink(format!(
                "stored report not found: {}",
                stored.object_key
            )));
        }
        let mut url = Url::from_file_path(&path)
            .map_err(|_| CoreError::Sink(format!("cannot build link for {}", path.display())))?;
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(expires_in)
            .ok_or_else(|| {
                CoreError::Sink(format!(
                    "link expiry out of range: {} days",
                    expires_in.whole_days()
                ))
            })?;
        url.query_pairs_mut()
            .append_pair("expires", &expires_at.unix_timestamp().to_string())
            .append_pair("sha256", &stored.sha256);
        Ok(url.to_string())
    }
}

use crate::error::CoreResult;
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use super::interface::{Notification, Notifier};

/// Appends each notification as one NDJSON line for a mail relay to pick up.
pub struct OutboxNotifier {
    path: PathBuf,
}

impl OutboxNotifier {
    pub fn open_or_create(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Notifier for OutboxNotifier {
    fn notify(&self, notification: &Notification) -> CoreResult<()> {
        let line = serde_json::to_string(&json!({
            "queued_at": OffsetDateTime::now_utc().format(&Rfc3339)?,
            "notification": notification,
        }))?;
        let mut f = OpenOptions::new().append(true).open(&self.path)?;
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
        info!(
            recipients = notification.recipients.len(),
            "queued report notification"
        );
        Ok(())
    }
}

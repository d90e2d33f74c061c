use crate::audit::event::{compute_event_hash, finalize_event, AuditEvent, ZERO_HASH_64};
use crate::error::{CoreError, CoreResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only NDJSON run log; each event commits to the previous one.
pub struct AuditLog {
    path: PathBuf,
    last_hash: String,
}

impl AuditLog {
    pub fn open_or_create(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            File::create(&path)?;
        }
        let last_hash = read_events(&path)?
            .last()
            .map(|e| e.event_hash.clone())
            .unwrap_or_else(|| ZERO_HASH_64.to_string());
        Ok(Self { path, last_hash })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, mut event: AuditEvent) -> CoreResult<AuditEvent> {
        event.prev_event_hash = self.last_hash.clone();
        let event = finalize_event(event)?;
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        let mut f = OpenOptions::new().append(true).open(&self.path)?;
        f.write_all(&line)?;
        self.last_hash = event.event_hash.clone();
        Ok(event)
    }
}

pub fn read_events(path: impl AsRef<Path>) -> CoreResult<Vec<AuditEvent>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}

pub fn verify_chain(events: &[AuditEvent]) -> CoreResult<()> {
    let mut prev = ZERO_HASH_64.to_string();
    for (idx, e) in events.iter().enumerate() {
        if e.prev_event_hash != prev {
            return Err(CoreError::InvalidInput(format!(
                "audit chain broken at event {}",
                idx
            )));
        }
        if compute_event_hash(e)? != e.event_hash {
            return Err(CoreError::InvalidInput(format!(
                "audit event {} hash mismatch",
                idx
            )));
        }
        prev = e.event_hash.clone();
    }
    Ok(())
}

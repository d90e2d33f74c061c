use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

pub const REPORT_KEY_PREFIX: &str = "weekly-reports";
pub const DEFAULT_LINK_EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredReport {
    pub destination: String,
    pub object_key: String,
    pub sha256: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Object storage for finished reports. `store` must be safe to call again
/// with the same key and bytes after a failure.
pub trait ReportSink {
    fn destination(&self) -> &str;
    fn store(&self, object_key: &str, bytes: &[u8]) -> CoreResult<StoredReport>;
    fn retrieval_link(&self, stored: &StoredReport, expires_in: Duration) -> CoreResult<String>;
}

pub trait Notifier {
    fn notify(&self, notification: &Notification) -> CoreResult<()>;
}

// weekly-reports/YYYY/MM/DD/<file_name>
pub fn report_object_key(generated_at: OffsetDateTime, file_name: &str) -> CoreResult<String> {
    let date_path = generated_at.format(format_description!("[year]/[month]/[day]"))?;
    Ok(format!("{}/{}/{}", REPORT_KEY_PREFIX, date_path, file_name))
}

pub fn compose_notification(
    sender: &str,
    recipients: &[String],
    link: &str,
    expires_in: Duration,
    generated_at: OffsetDateTime,
) -> CoreResult<Notification> {
    let day = generated_at.format(format_description!("[year]-[month]-[day]"))?;
    Ok(Notification {
        sender: sender.to_string(),
        recipients: recipients.to_vec(),
        subject: format!("Weekly SOC 2 Audit Report - {}", day),
        body: format!(
            "The weekly SOC 2 compliance report is ready.\n\nDownload (expires in {} days):\n{}",
            expires_in.whole_days(),
            link
        ),
    })
}

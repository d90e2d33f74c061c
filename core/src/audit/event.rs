use crate::determinism::json_canonical;
use crate::determinism::run_id::sha256_hex;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    System,
    Operator,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    ReportRunStarted,
    AssessmentFetched,
    EvidenceAggregated,
    ReportSynthesized,
    ReportStored,
    NotificationSent,
    ReportRunCompleted,
    ReportRunFailed,
    RunStateChanged,
}

impl AuditEventType {
    pub fn required_detail_keys(self) -> &'static [&'static str] {
        match self {
            AuditEventType::ReportRunStarted => &["freshness_days", "workers"],
            AuditEventType::AssessmentFetched => &["control_sets", "controls"],
            AuditEventType::EvidenceAggregated => &["controls", "records", "placeholders"],
            AuditEventType::ReportSynthesized => &[
                "total_controls",
                "passing_controls",
                "failing_controls",
                "compliance_rate",
            ],
            AuditEventType::ReportStored => &["object_key", "sha256", "size_bytes"],
            AuditEventType::NotificationSent => &["recipient_count"],
            AuditEventType::ReportRunCompleted => &["object_key"],
            AuditEventType::ReportRunFailed => &["stage", "error"],
            AuditEventType::RunStateChanged => &["from_state", "to_state", "reason"],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub ts_utc: String, // RFC3339
    pub event_type: AuditEventType,
    pub run_id: String,
    pub assessment_id: String,
    pub actor: Actor,
    pub details: serde_json::Value,
    pub prev_event_hash: String, // hex 64
    pub event_hash: String,      // hex 64
}

pub const ZERO_HASH_64: &str = "0000000000000000000000000000000000000000000000000000000000000000";

impl AuditEvent {
    pub fn system(
        event_type: AuditEventType,
        run_id: &str,
        assessment_id: &str,
        details: serde_json::Value,
    ) -> Self {
        Self {
            ts_utc: now_rfc3339_utc(),
            event_type,
            run_id: run_id.to_string(),
            assessment_id: assessment_id.to_string(),
            actor: Actor::System,
            details,
            prev_event_hash: String::new(),
            event_hash: String::new(),
        }
    }
}

// Hash covers the whole envelope with event_hash zeroed.
pub fn compute_event_hash(event: &AuditEvent) -> CoreResult<String> {
    let mut e = event.clone();
    e.event_hash = ZERO_HASH_64.to_string();
    Ok(sha256_hex(&json_canonical::to_canonical_bytes(&e)?))
}

pub fn finalize_event(mut event: AuditEvent) -> CoreResult<AuditEvent> {
    if !is_hex64(&event.prev_event_hash) {
        return Err(CoreError::InvalidInput(
            "prev_event_hash must be 64 hex chars".to_string(),
        ));
    }
    for k in event.event_type.required_detail_keys() {
        if event.details.get(k).is_none() {
            return Err(CoreError::InvalidInput(format!(
                "event {:?} missing details.{}",
                event.event_type, k
            )));
        }
    }
    event.event_hash = compute_event_hash(&event)?;
    Ok(event)
}

fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn now_rfc3339_utc() -> String {
    // UTC offsets always format as RFC3339.
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Control {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlSet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub controls: Vec<Control>,
}

impl ControlSet {
    // Unnamed sets fall back to their id so report rows stay distinct per set.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub control_sets: Vec<ControlSet>,
}

impl Assessment {
    pub fn control_count(&self) -> usize {
        self.control_sets.iter().map(|cs| cs.controls.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceFolder {
    pub id: String,
    pub date: String, // YYYY-MM-DD
}

// Vendors ship this either as a bare status string or as an object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ComplianceCheck {
    Status(String),
    Detail {
        #[serde(default)]
        status: Option<String>,
    },
}

impl ComplianceCheck {
    pub fn status(&self) -> Option<&str> {
        match self {
            ComplianceCheck::Status(s) => Some(s.as_str()),
            ComplianceCheck::Detail { status } => status.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawEvidenceItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_check: Option<ComplianceCheck>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_response: Option<String>,
    #[serde(default)]
    pub resources_included: Vec<ResourceRef>,
}

impl RawEvidenceItem {
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceErrorKind {
    Timeout,
    Throttled,
    Unavailable,
    AccessDenied,
    NotFound,
    Malformed,
}

impl SourceErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            SourceErrorKind::Timeout | SourceErrorKind::Throttled | SourceErrorKind::Unavailable
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceErrorKind::Timeout => "TIMEOUT",
            SourceErrorKind::Throttled => "THROTTLED",
            SourceErrorKind::Unavailable => "UNAVAILABLE",
            SourceErrorKind::AccessDenied => "ACCESS_DENIED",
            SourceErrorKind::NotFound => "NOT_FOUND",
            SourceErrorKind::Malformed => "MALFORMED",
        }
    }
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Read side of the compliance vendor API. Every call carries the deadline the
/// caller is willing to wait until; implementations should fail with
/// `SourceErrorKind::Timeout` rather than block past it.
pub trait EvidenceSource: Sync {
    fn get_assessment(&self, assessment_id: &str, deadline: Instant) -> SourceResult<Assessment>;

    fn get_evidence_folders(
        &self,
        assessment_id: &str,
        control_set_id: &str,
        control_id: &str,
        deadline: Instant,
    ) -> SourceResult<Vec<EvidenceFolder>>;

    fn get_evidence_items(
        &self,
        assessment_id: &str,
        control_set_id: &str,
        evidence_folder_id: &str,
        deadline: Instant,
    ) -> SourceResult<Vec<RawEvidenceItem>>;
}

impl<S: EvidenceSource + ?Sized> EvidenceSource for &S {
    fn get_assessment(&self, assessment_id: &str, deadline: Instant) -> SourceResult<Assessment> {
        (**self).get_assessment(assessment_id, deadline)
    }

    fn get_evidence_folders(
        &self,
        assessment_id: &str,
        control_set_id: &str,
        control_id: &str,
        deadline: Instant,
    ) -> SourceResult<Vec<EvidenceFolder>> {
        (**self).get_evidence_folders(assessment_id, control_set_id, control_id, deadline)
    }

    fn get_evidence_items(
        &self,
        assessment_id: &str,
        control_set_id: &str,
        evidence_folder_id: &str,
        deadline: Instant,
    ) -> SourceResult<Vec<RawEvidenceItem>> {
        (**self).get_evidence_items(assessment_id, control_set_id, evidence_folder_id, deadline)
    }
}

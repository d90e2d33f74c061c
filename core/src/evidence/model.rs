use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

pub const NO_EVIDENCE: &str = "No Evidence";
pub const MANUAL_REVIEW_REQUIRED: &str = "Manual Review Required";
pub const NOT_APPLICABLE: &str = "N/A";
pub const NO_EVIDENCE_FOUND: &str = "No evidence found";

pub const FOLDER_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse_folder_date(s: &str) -> CoreResult<Date> {
    Date::parse(s.trim(), FOLDER_DATE_FORMAT).map_err(|e| {
        CoreError::InvalidInput(format!("invalid evidence folder date {:?}: {}", s, e))
    })
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "String", try_from = "String")]
pub enum ComplianceStatus {
    PASSED,
    FAILED,
    WARNING,
    UNKNOWN,
}

impl ComplianceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceStatus::PASSED => "PASSED",
            ComplianceStatus::FAILED => "FAILED",
            ComplianceStatus::WARNING => "WARNING",
            ComplianceStatus::UNKNOWN => "UNKNOWN",
        }
    }

    // Vendor vocabularies differ: Security Hub says PASSED/FAILED, config-rule
    // style checks say COMPLIANT/NON_COMPLIANT.
    pub fn from_vendor(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "PASSED" | "COMPLIANT" => ComplianceStatus::PASSED,
            "FAILED" | "NON_COMPLIANT" => ComplianceStatus::FAILED,
            "WARNING" => ComplianceStatus::WARNING,
            _ => ComplianceStatus::UNKNOWN,
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, ComplianceStatus::FAILED | ComplianceStatus::WARNING)
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ComplianceStatus> for String {
    fn from(s: ComplianceStatus) -> Self {
        s.as_str().to_string()
    }
}

impl TryFrom<String> for ComplianceStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "PASSED" => Ok(ComplianceStatus::PASSED),
            "FAILED" => Ok(ComplianceStatus::FAILED),
            "WARNING" => Ok(ComplianceStatus::WARNING),
            "UNKNOWN" => Ok(ComplianceStatus::UNKNOWN),
            other => Err(format!("unknown compliance status {:?}", other)),
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "String", from = "String")]
pub enum Severity {
    CRITICAL,
    HIGH,
    MEDIUM,
    LOW,
    // Explicit source severities outside the ranked scale (e.g. INFORMATIONAL).
    UNRANKED(String),
}

impl Severity {
    pub fn from_vendor(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "CRITICAL" => Severity::CRITICAL,
            "HIGH" => Severity::HIGH,
            "MEDIUM" => Severity::MEDIUM,
            "LOW" => Severity::LOW,
            other => Severity::UNRANKED(other.to_string()),
        }
    }

    pub fn rank(&self) -> Option<u8> {
        match self {
            Severity::CRITICAL => Some(0),
            Severity::HIGH => Some(1),
            Severity::MEDIUM => Some(2),
            Severity::LOW => Some(3),
            Severity::UNRANKED(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Severity::CRITICAL => "CRITICAL",
            Severity::HIGH => "HIGH",
            Severity::MEDIUM => "MEDIUM",
            Severity::LOW => "LOW",
            Severity::UNRANKED(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        s.as_str().to_string()
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::from_vendor(&s)
    }
}

// NoEvidence is declared first so that any real date orders above it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(into = "String", try_from = "String")]
pub enum EvidenceDate {
    NoEvidence,
    Dated(Date),
}

impl fmt::Display for EvidenceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceDate::NoEvidence => f.write_str(NO_EVIDENCE),
            EvidenceDate::Dated(d) => {
                let s = d.format(FOLDER_DATE_FORMAT).map_err(|_| fmt::Error)?;
                f.write_str(&s)
            }
        }
    }
}

impl From<EvidenceDate> for String {
    fn from(d: EvidenceDate) -> Self {
        d.to_string()
    }
}

impl TryFrom<String> for EvidenceDate {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == NO_EVIDENCE {
            return Ok(EvidenceDate::NoEvidence);
        }
        parse_folder_date(&s)
            .map(EvidenceDate::Dated)
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "String", from = "String")]
pub enum EvidenceType {
    Source(String),
    ManualReview,
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceType::Source(s) => f.write_str(s),
            EvidenceType::ManualReview => f.write_str(MANUAL_REVIEW_REQUIRED),
        }
    }
}

impl From<EvidenceType> for String {
    fn from(t: EvidenceType) -> Self {
        t.to_string()
    }
}

impl From<String> for EvidenceType {
    fn from(s: String) -> Self {
        if s == MANUAL_REVIEW_REQUIRED {
            EvidenceType::ManualReview
        } else {
            EvidenceType::Source(s)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "String", from = "String")]
pub enum ResourceReference {
    Identifier(String),
    NotApplicable,
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceReference::Identifier(s) => f.write_str(s),
            ResourceReference::NotApplicable => f.write_str(NOT_APPLICABLE),
        }
    }
}

impl From<ResourceReference> for String {
    fn from(r: ResourceReference) -> Self {
        r.to_string()
    }
}

impl From<String> for ResourceReference {
    fn from(s: String) -> Self {
        if s == NOT_APPLICABLE {
            ResourceReference::NotApplicable
        } else {
            ResourceReference::Identifier(s)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizedEvidenceRecord {
    pub control_set_name: String,
    pub control_id: String,
    pub control_name: String,
    pub evidence_date: EvidenceDate,
    pub evidence_type: EvidenceType,
    pub compliance_status: ComplianceStatus,
    pub finding: String,
    pub resource_reference: ResourceReference,
    pub severity: Severity,
}

impl NormalizedEvidenceRecord {
    pub fn placeholder(
        control_set_name: &str,
        control_id: &str,
        control_name: &str,
        reason: &str,
    ) -> Self {
        Self {
            control_set_name: control_set_name.to_string(),
            control_id: control_id.to_string(),
            control_name: control_name.to_string(),
            evidence_date: EvidenceDate::NoEvidence,
            evidence_type: EvidenceType::ManualReview,
            compliance_status: ComplianceStatus::UNKNOWN,
            finding: reason.to_string(),
            resource_reference: ResourceReference::NotApplicable,
            severity: Severity::LOW,
        }
    }

    pub fn control_key(&self) -> (&str, &str) {
        (self.control_set_name.as_str(), self.control_id.as_str())
    }
}

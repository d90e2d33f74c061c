use crate::source::interface::RawEvidenceItem;

use super::model::{ComplianceStatus, ResourceReference, Severity};

pub type ExtractionRule = fn(&RawEvidenceItem) -> Option<String>;

pub const FINDING_COMPLIANCE_STATUS: &str = "findingComplianceStatus";
pub const FINDING_SEVERITY: &str = "findingSeverity";

// Evaluated in order, first non-empty value wins.
pub const STATUS_RULES: &[ExtractionRule] = &[compliance_check_status, attribute_compliance_status];
pub const SEVERITY_RULES: &[ExtractionRule] = &[attribute_severity];
pub const RESOURCE_RULES: &[ExtractionRule] = &[first_resource_arn, first_resource_value];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: ComplianceStatus,
    pub severity: Severity,
    pub resource: ResourceReference,
}

pub fn classify(item: &RawEvidenceItem) -> Classification {
    let status = derive_status(item);
    Classification {
        severity: derive_severity(item, status),
        resource: derive_resource(item),
        status,
    }
}

pub fn derive_status(item: &RawEvidenceItem) -> ComplianceStatus {
    first_match(STATUS_RULES, item)
        .map(|s| ComplianceStatus::from_vendor(&s))
        .unwrap_or(ComplianceStatus::UNKNOWN)
}

pub fn derive_severity(item: &RawEvidenceItem, status: ComplianceStatus) -> Severity {
    match first_match(SEVERITY_RULES, item) {
        Some(s) => Severity::from_vendor(&s),
        None if status == ComplianceStatus::FAILED => Severity::MEDIUM,
        None => Severity::LOW,
    }
}

// Only the first referenced resource is surfaced per record.
pub fn derive_resource(item: &RawEvidenceItem) -> ResourceReference {
    first_match(RESOURCE_RULES, item)
        .map(ResourceReference::from)
        .unwrap_or(ResourceReference::NotApplicable)
}

pub fn first_match(rules: &[ExtractionRule], item: &RawEvidenceItem) -> Option<String> {
    rules.iter().find_map(|rule| rule(item))
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn compliance_check_status(item: &RawEvidenceItem) -> Option<String> {
    item.compliance_check
        .as_ref()
        .and_then(|c| c.status())
        .and_then(non_blank)
}

fn attribute_compliance_status(item: &RawEvidenceItem) -> Option<String> {
    item.attribute_str(FINDING_COMPLIANCE_STATUS)
        .and_then(non_blank)
}

fn attribute_severity(item: &RawEvidenceItem) -> Option<String> {
    item.attribute_str(FINDING_SEVERITY).and_then(non_blank)
}

fn first_resource_arn(item: &RawEvidenceItem) -> Option<String> {
    item.resources_included
        .first()
        .and_then(|r| r.arn.as_deref())
        .and_then(non_blank)
}

fn first_resource_value(item: &RawEvidenceItem) -> Option<String> {
    item.resources_included
        .first()
        .and_then(|r| r.value.as_deref())
        .and_then(non_blank)
}

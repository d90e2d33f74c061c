use audit_report_core::evidence::classifier::classify;
use audit_report_core::evidence::model::{ComplianceStatus, ResourceReference, Severity};
use audit_report_core::source::interface::{ComplianceCheck, RawEvidenceItem, ResourceRef};
use std::collections::BTreeMap;

fn with_attributes(pairs: &[(&str, &str)]) -> RawEvidenceItem {
    let attributes: BTreeMap<String, serde_json::Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
        .collect();
    RawEvidenceItem {
        attributes,
        ..Default::default()
    }
}

#[test]
fn attribute_status_is_case_insensitive() {
    let c = classify(&with_attributes(&[("findingComplianceStatus", "failed")]));
    assert_eq!(c.status, ComplianceStatus::FAILED);
    // No explicit severity on a failure defaults to MEDIUM.
    assert_eq!(c.severity, Severity::MEDIUM);
}

#[test]
fn missing_compliance_fields_resolve_to_unknown() {
    let c = classify(&RawEvidenceItem::default());
    assert_eq!(c.status, ComplianceStatus::UNKNOWN);
    assert_eq!(c.severity, Severity::LOW);
    assert_eq!(c.resource, ResourceReference::NotApplicable);
}

#[test]
fn compliance_check_takes_precedence_over_attributes() {
    let mut item = with_attributes(&[("findingComplianceStatus", "FAILED")]);
    item.compliance_check = Some(ComplianceCheck::Status("COMPLIANT".to_string()));
    assert_eq!(classify(&item).status, ComplianceStatus::PASSED);

    item.compliance_check = Some(ComplianceCheck::Detail {
        status: Some("NON_COMPLIANT".to_string()),
    });
    assert_eq!(classify(&item).status, ComplianceStatus::FAILED);
}

#[test]
fn blank_compliance_check_falls_through_to_attributes() {
    let mut item = with_attributes(&[("findingComplianceStatus", "WARNING")]);
    item.compliance_check = Some(ComplianceCheck::Detail { status: None });
    assert_eq!(classify(&item).status, ComplianceStatus::WARNING);

    item.compliance_check = Some(ComplianceCheck::Status("  ".to_string()));
    assert_eq!(classify(&item).status, ComplianceStatus::WARNING);
}

#[test]
fn unrecognized_vendor_status_is_unknown() {
    let item = with_attributes(&[("findingComplianceStatus", "NOT_AVAILABLE")]);
    assert_eq!(classify(&item).status, ComplianceStatus::UNKNOWN);
}

#[test]
fn explicit_severity_is_kept_even_outside_the_ranked_scale() {
    let c = classify(&with_attributes(&[
        ("findingComplianceStatus", "FAILED"),
        ("findingSeverity", "critical"),
    ]));
    assert_eq!(c.severity, Severity::CRITICAL);

    let c = classify(&with_attributes(&[("findingSeverity", "INFORMATIONAL")]));
    assert_eq!(c.severity, Severity::UNRANKED("INFORMATIONAL".to_string()));
    assert_eq!(c.severity.rank(), None);
}

#[test]
fn resource_prefers_arn_then_value_of_first_entry() {
    let mut item = RawEvidenceItem::default();
    item.resources_included = vec![ResourceRef {
        arn: Some("arn:aws:iam::123456789012:root".to_string()),
        value: Some("root".to_string()),
    }];
    assert_eq!(
        classify(&item).resource,
        ResourceReference::Identifier("arn:aws:iam::123456789012:root".to_string())
    );

    item.resources_included = vec![ResourceRef {
        arn: None,
        value: Some("bucket-logs".to_string()),
    }];
    assert_eq!(
        classify(&item).resource,
        ResourceReference::Identifier("bucket-logs".to_string())
    );
}

#[test]
fn vendor_item_json_deserializes_both_check_shapes() {
    let bare: RawEvidenceItem = serde_json::from_value(serde_json::json!({
        "dataSource": "AWS Config",
        "complianceCheck": "NON_COMPLIANT",
        "textResponse": "bucket is public"
    }))
    .unwrap();
    assert_eq!(classify(&bare).status, ComplianceStatus::FAILED);

    let nested: RawEvidenceItem = serde_json::from_value(serde_json::json!({
        "complianceCheck": {"status": "PASSED"},
        "resourcesIncluded": [{"arn": "arn:aws:s3:::logs"}]
    }))
    .unwrap();
    let c = classify(&nested);
    assert_eq!(c.status, ComplianceStatus::PASSED);
    assert_eq!(
        c.resource,
        ResourceReference::Identifier("arn:aws:s3:::logs".to_string())
    );
}

#[test]
fn severity_case_folding_covers_non_ascii_letters() {
    let c = classify(&with_attributes(&[("findingSeverity", "élevé")]));
    assert_eq!(c.severity, Severity::UNRANKED("ÉLEVÉ".to_string()));
}

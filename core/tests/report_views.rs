use audit_report_core::evidence::model::{
    ComplianceStatus, EvidenceDate, EvidenceType, NormalizedEvidenceRecord, ResourceReference,
    Severity,
};
use audit_report_core::report::render::{
    render_control_status_csv, render_executive_summary_csv, render_failed_findings_csv,
};
use audit_report_core::report::views::{
    control_status_rollup, executive_summary, failed_findings, FailedFindingsView, ReportBundle,
};
use time::macros::{date, datetime};
use time::Date;

fn record(
    control_id: &str,
    status: ComplianceStatus,
    severity: Severity,
    day: Date,
) -> NormalizedEvidenceRecord {
    NormalizedEvidenceRecord {
        control_set_name: "CC6 Logical Access".to_string(),
        control_id: control_id.to_string(),
        control_name: format!("Control {}", control_id),
        evidence_date: EvidenceDate::Dated(day),
        evidence_type: EvidenceType::Source("AWS Config".to_string()),
        compliance_status: status,
        finding: format!("{} {}", control_id, status),
        resource_reference: ResourceReference::NotApplicable,
        severity,
    }
}

#[test]
fn compliance_rate_is_zero_without_controls() {
    let s = executive_summary(&[], datetime!(2024-03-15 12:00 UTC));
    assert_eq!(s.total_controls, 0);
    assert_eq!(s.compliance_rate, 0.0);
    assert_eq!(s.compliance_rate_label(), "0.0%");
}

#[test]
fn compliance_rate_counts_distinct_controls() {
    let d = date!(2024-03-14);
    let records = vec![
        record("C1", ComplianceStatus::PASSED, Severity::LOW, d),
        record("C1", ComplianceStatus::PASSED, Severity::LOW, d),
        record("C2", ComplianceStatus::PASSED, Severity::LOW, d),
        record("C3", ComplianceStatus::PASSED, Severity::LOW, d),
        record("C3", ComplianceStatus::FAILED, Severity::HIGH, d),
        record("C4", ComplianceStatus::UNKNOWN, Severity::LOW, d),
    ];
    let s = executive_summary(&records, datetime!(2024-03-15 12:00 UTC));
    assert_eq!(s.total_controls, 4);
    assert_eq!(s.passing_controls, 3);
    // A control can count as passing and failing at once.
    assert_eq!(s.failing_controls, 1);
    assert_eq!(s.compliance_rate, 75.0);
    assert_eq!(s.compliance_rate_label(), "75.0%");
}

#[test]
fn same_control_id_in_two_sets_counts_twice() {
    let d = date!(2024-03-14);
    let mut other = record("C1", ComplianceStatus::FAILED, Severity::LOW, d);
    other.control_set_name = "CC7 System Operations".to_string();
    let records = vec![record("C1", ComplianceStatus::PASSED, Severity::LOW, d), other];
    let s = executive_summary(&records, datetime!(2024-03-15 12:00 UTC));
    assert_eq!(s.total_controls, 2);
    assert_eq!(s.compliance_rate, 50.0);
}

#[test]
fn failed_findings_sorted_by_severity_rank() {
    let d = date!(2024-03-14);
    let records = vec![
        record("C1", ComplianceStatus::FAILED, Severity::LOW, d),
        record("C2", ComplianceStatus::PASSED, Severity::CRITICAL, d),
        record("C3", ComplianceStatus::FAILED, Severity::CRITICAL, d),
        record("C4", ComplianceStatus::WARNING, Severity::MEDIUM, d),
    ];
    let FailedFindingsView::Findings(rows) = failed_findings(&records) else {
        panic!("expected findings");
    };
    let order: Vec<&str> = rows.iter().map(|r| r.severity.as_str()).collect();
    assert_eq!(order, vec!["CRITICAL", "MEDIUM", "LOW"]);
    assert_eq!(rows[0].control_id, "C3");
}

#[test]
fn unranked_severities_sort_last_and_ties_keep_order() {
    let d = date!(2024-03-14);
    let records = vec![
        record("C1", ComplianceStatus::FAILED, Severity::UNRANKED("INFORMATIONAL".to_string()), d),
        record("C2", ComplianceStatus::FAILED, Severity::HIGH, d),
        record("C3", ComplianceStatus::FAILED, Severity::HIGH, d),
    ];
    let FailedFindingsView::Findings(rows) = failed_findings(&records) else {
        panic!("expected findings");
    };
    let ids: Vec<&str> = rows.iter().map(|r| r.control_id.as_str()).collect();
    assert_eq!(ids, vec!["C2", "C3", "C1"]);
}

#[test]
fn no_failures_yields_placeholder_row() {
    let records = vec![record(
        "C1",
        ComplianceStatus::PASSED,
        Severity::LOW,
        date!(2024-03-14),
    )];
    let view = failed_findings(&records);
    assert_eq!(view, FailedFindingsView::NoFailures);
    assert_eq!(view.row_count(), 1);
    assert_eq!(
        render_failed_findings_csv(&view).unwrap(),
        "Status\nNo failed findings\n"
    );
}

#[test]
fn rollup_keeps_first_status_and_latest_date() {
    let records = vec![
        record("C2", ComplianceStatus::FAILED, Severity::LOW, date!(2024-03-10)),
        record("C1", ComplianceStatus::PASSED, Severity::LOW, date!(2024-03-09)),
        record("C2", ComplianceStatus::PASSED, Severity::LOW, date!(2024-03-14)),
        NormalizedEvidenceRecord::placeholder(
            "CC6 Logical Access",
            "C3",
            "Control C3",
            "No evidence found",
        ),
    ];
    let rows = control_status_rollup(&records);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].control_id, "C1");
    assert_eq!(rows[1].control_id, "C2");
    assert_eq!(rows[1].compliance_status, ComplianceStatus::FAILED);
    assert_eq!(rows[1].evidence_date, EvidenceDate::Dated(date!(2024-03-14)));
    assert_eq!(rows[2].evidence_date, EvidenceDate::NoEvidence);

    let csv = render_control_status_csv(&rows).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "ControlSetName,ControlId,ControlName,ComplianceStatus,EvidenceDate"
    );
    assert_eq!(
        lines[2],
        "CC6 Logical Access,C2,Control C2,FAILED,2024-03-14"
    );
    assert_eq!(
        lines[3],
        "CC6 Logical Access,C3,Control C3,UNKNOWN,No Evidence"
    );
}

#[test]
fn executive_summary_csv_layout() {
    let d = date!(2024-03-14);
    let bundle = ReportBundle::synthesize(
        vec![
            record("C1", ComplianceStatus::PASSED, Severity::LOW, d),
            record("C2", ComplianceStatus::FAILED, Severity::HIGH, d),
            record("C3", ComplianceStatus::PASSED, Severity::LOW, d),
        ],
        datetime!(2024-03-15 06:05 UTC),
    );
    let csv = render_executive_summary_csv(&bundle.executive_summary).unwrap();
    assert_eq!(
        csv,
        "Metric,Value\n\
         Total Controls,3\n\
         Passing,2\n\
         Failing,1\n\
         Compliance Rate (%),66.7%\n\
         Generated,2024-03-15 06:05\n"
    );
    assert_eq!(bundle.full_detail().len(), 3);
}

use crate::evidence::model::{ComplianceStatus, EvidenceDate, NormalizedEvidenceRecord};
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;

pub const NO_FAILED_FINDINGS: &str = "No failed findings";

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutiveSummary {
    pub total_controls: usize,
    pub passing_controls: usize,
    pub failing_controls: usize,
    pub compliance_rate: f64,
    pub generated_at: OffsetDateTime,
}

impl ExecutiveSummary {
    pub fn compliance_rate_label(&self) -> String {
        format!("{:.1}%", self.compliance_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlStatusRow {
    pub control_set_name: String,
    pub control_id: String,
    pub control_name: String,
    pub compliance_status: ComplianceStatus,
    pub evidence_date: EvidenceDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedFindingsView {
    Findings(Vec<NormalizedEvidenceRecord>),
    NoFailures,
}

impl FailedFindingsView {
    pub fn row_count(&self) -> usize {
        match self {
            FailedFindingsView::Findings(rows) => rows.len(),
            FailedFindingsView::NoFailures => 1,
        }
    }
}

/// All four report views over one immutable record snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBundle {
    pub executive_summary: ExecutiveSummary,
    pub control_status: Vec<ControlStatusRow>,
    pub failed_findings: FailedFindingsView,
    pub records: Vec<NormalizedEvidenceRecord>,
}

impl ReportBundle {
    pub fn synthesize(records: Vec<NormalizedEvidenceRecord>, generated_at: OffsetDateTime) -> Self {
        Self {
            executive_summary: executive_summary(&records, generated_at),
            control_status: control_status_rollup(&records),
            failed_findings: failed_findings(&records),
            records,
        }
    }

    pub fn full_detail(&self) -> &[NormalizedEvidenceRecord] {
        full_detail(&self.records)
    }
}

pub fn executive_summary(
    records: &[NormalizedEvidenceRecord],
    generated_at: OffsetDateTime,
) -> ExecutiveSummary {
    let total: BTreeSet<(&str, &str)> = records.iter().map(|r| r.control_key()).collect();
    let passing = distinct_controls_with(records, ComplianceStatus::PASSED);
    let failing = distinct_controls_with(records, ComplianceStatus::FAILED);
    let compliance_rate = if total.is_empty() {
        0.0
    } else {
        passing as f64 / total.len() as f64 * 100.0
    };
    ExecutiveSummary {
        total_controls: total.len(),
        passing_controls: passing,
        failing_controls: failing,
        compliance_rate,
        generated_at,
    }
}

fn distinct_controls_with(records: &[NormalizedEvidenceRecord], status: ComplianceStatus) -> usize {
    records
        .iter()
        .filter(|r| r.compliance_status == status)
        .map(|r| r.control_key())
        .collect::<BTreeSet<_>>()
        .len()
}

// Status is the first one seen for the control, not the worst or the latest.
pub fn control_status_rollup(records: &[NormalizedEvidenceRecord]) -> Vec<ControlStatusRow> {
    let mut rows: BTreeMap<(&str, &str, &str), ControlStatusRow> = BTreeMap::new();
    for r in records {
        let key = (
            r.control_set_name.as_str(),
            r.control_id.as_str(),
            r.control_name.as_str(),
        );
        rows.entry(key)
            .and_modify(|row| {
                if r.evidence_date > row.evidence_date {
                    row.evidence_date = r.evidence_date;
                }
            })
            .or_insert_with(|| ControlStatusRow {
                control_set_name: r.control_set_name.clone(),
                control_id: r.control_id.clone(),
                control_name: r.control_name.clone(),
                compliance_status: r.compliance_status,
                evidence_date: r.evidence_date,
            });
    }
    rows.into_values().collect()
}

pub fn failed_findings(records: &[NormalizedEvidenceRecord]) -> FailedFindingsView {
    let mut rows: Vec<NormalizedEvidenceRecord> = records
        .iter()
        .filter(|r| r.compliance_status.is_failure())
        .cloned()
        .collect();
    if rows.is_empty() {
        return FailedFindingsView::NoFailures;
    }
    // Stable: equal severities keep their collection order. Unranked go last.
    rows.sort_by_key(|r| r.severity.rank().unwrap_or(u8::MAX));
    FailedFindingsView::Findings(rows)
}

pub fn full_detail(records: &[NormalizedEvidenceRecord]) -> &[NormalizedEvidenceRecord] {
    records
}

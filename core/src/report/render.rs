use crate::error::{CoreError, CoreResult};
use crate::evidence::model::NormalizedEvidenceRecord;
use time::format_description::FormatItem;
use time::macros::format_description;

use super::views::{
    ControlStatusRow, ExecutiveSummary, FailedFindingsView, NO_FAILED_FINDINGS,
};

pub const GENERATED_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

pub const DETAIL_HEADERS: [&str; 9] = [
    "ControlSetName",
    "ControlId",
    "ControlName",
    "EvidenceDate",
    "EvidenceType",
    "ComplianceStatus",
    "Finding",
    "ResourceReference",
    "Severity",
];

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![])
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> CoreResult<String> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes)
        .map_err(|e| CoreError::InvalidInput(format!("rendered csv is not utf-8: {}", e)))
}

pub fn render_executive_summary_csv(summary: &ExecutiveSummary) -> CoreResult<String> {
    let generated = summary.generated_at.format(GENERATED_FORMAT)?;
    let mut wtr = csv_writer();
    wtr.write_record(["Metric", "Value"])?;
    wtr.write_record(["Total Controls", summary.total_controls.to_string().as_str()])?;
    wtr.write_record(["Passing", summary.passing_controls.to_string().as_str()])?;
    wtr.write_record(["Failing", summary.failing_controls.to_string().as_str()])?;
    wtr.write_record(["Compliance Rate (%)", summary.compliance_rate_label().as_str()])?;
    wtr.write_record(["Generated", generated.as_str()])?;
    finish(wtr)
}

pub fn render_control_status_csv(rows: &[ControlStatusRow]) -> CoreResult<String> {
    let mut wtr = csv_writer();
    wtr.write_record([
        "ControlSetName",
        "ControlId",
        "ControlName",
        "ComplianceStatus",
        "EvidenceDate",
    ])?;
    for row in rows {
        wtr.write_record([
            row.control_set_name.as_str(),
            row.control_id.as_str(),
            row.control_name.as_str(),
            row.compliance_status.as_str(),
            row.evidence_date.to_string().as_str(),
        ])?;
    }
    finish(wtr)
}

pub fn render_failed_findings_csv(view: &FailedFindingsView) -> CoreResult<String> {
    match view {
        FailedFindingsView::NoFailures => {
            let mut wtr = csv_writer();
            wtr.write_record(["Status"])?;
            wtr.write_record([NO_FAILED_FINDINGS])?;
            finish(wtr)
        }
        FailedFindingsView::Findings(rows) => render_records_csv(rows),
    }
}

pub fn render_records_csv(records: &[NormalizedEvidenceRecord]) -> CoreResult<String> {
    let mut wtr = csv_writer();
    wtr.write_record(DETAIL_HEADERS)?;
    for r in records {
        wtr.write_record([
            r.control_set_name.as_str(),
            r.control_id.as_str(),
            r.control_name.as_str(),
            r.evidence_date.to_string().as_str(),
            r.evidence_type.to_string().as_str(),
            r.compliance_status.as_str(),
            r.finding.as_str(),
            r.resource_reference.to_string().as_str(),
            r.severity.as_str(),
        ])?;
    }
    finish(wtr)
}

pub fn parse_records_csv(csv_text: &str) -> CoreResult<Vec<NormalizedEvidenceRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_text.as_bytes());
    let headers = rdr.headers()?.clone();
    if headers.iter().ne(DETAIL_HEADERS.iter().copied()) {
        return Err(CoreError::InvalidInput(format!(
            "unexpected evidence detail headers: {:?}",
            headers
        )));
    }
    let mut out = Vec::new();
    for row in rdr.deserialize() {
        out.push(row?);
    }
    Ok(out)
}

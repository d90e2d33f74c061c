use crate::determinism::json_canonical;
use crate::determinism::run_id::sha256_hex;
use crate::determinism::zip::{read_zip_entries, zip_entries_deterministic};
use crate::error::{CoreError, CoreResult};
use crate::evidence::model::NormalizedEvidenceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use super::render::{
    parse_records_csv, render_control_status_csv, render_executive_summary_csv,
    render_failed_findings_csv, render_records_csv,
};
use super::views::ReportBundle;

pub const REPORT_SCHEMA_VERSION: &str = "WEEKLY_AUDIT_REPORT_V1";
pub const MANIFEST_PATH: &str = "report_manifest.json";

pub const EXECUTIVE_SUMMARY: (&str, &str) = ("Executive Summary", "executive_summary.csv");
pub const CONTROL_STATUS: (&str, &str) = ("Control Status", "control_status.csv");
pub const FAILED_FINDINGS: (&str, &str) = ("Failed Findings", "failed_findings.csv");
pub const ALL_EVIDENCE_DETAILS: (&str, &str) = ("All Evidence Details", "all_evidence_details.csv");

const FILE_STAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute]");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewEntry {
    pub name: String,
    pub path: String,
    pub row_count: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportManifest {
    pub schema_version: String,
    pub run_id: String,
    pub assessment_id: String,
    pub generated_at: String, // RFC3339 UTC
    pub record_count: u64,
    pub compliance_rate: String, // one decimal; canonical JSON carries no floats
    pub views: Vec<ViewEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub sha256: String,
    pub manifest: ReportManifest,
}

#[derive(Debug, Clone)]
pub struct UnpackedReport {
    pub manifest: ReportManifest,
    pub views: BTreeMap<String, String>,
}

impl UnpackedReport {
    pub fn view(&self, path: &str) -> CoreResult<&str> {
        self.views
            .get(path)
            .map(String::as_str)
            .ok_or_else(|| CoreError::InvalidInput(format!("report view missing: {}", path)))
    }

    pub fn records(&self) -> CoreResult<Vec<NormalizedEvidenceRecord>> {
        parse_records_csv(self.view(ALL_EVIDENCE_DETAILS.1)?)
    }
}

pub fn report_file_name(generated_at: OffsetDateTime) -> CoreResult<String> {
    Ok(format!(
        "SOC2_Weekly_Report_{}.zip",
        generated_at.format(FILE_STAMP_FORMAT)?
    ))
}

pub fn pack_report(
    bundle: &ReportBundle,
    run_id: &str,
    assessment_id: &str,
) -> CoreResult<ReportArchive> {
    let summary = &bundle.executive_summary;
    let rendered = [
        (
            EXECUTIVE_SUMMARY,
            render_executive_summary_csv(summary)?,
            5usize,
        ),
        (
            CONTROL_STATUS,
            render_control_status_csv(&bundle.control_status)?,
            bundle.control_status.len(),
        ),
        (
            FAILED_FINDINGS,
            render_failed_findings_csv(&bundle.failed_findings)?,
            bundle.failed_findings.row_count(),
        ),
        (
            ALL_EVIDENCE_DETAILS,
            render_records_csv(bundle.full_detail())?,
            bundle.records.len(),
        ),
    ];

    let mut views = Vec::with_capacity(rendered.len());
    let mut entries = Vec::with_capacity(rendered.len() + 1);
    for ((name, path), csv_text, row_count) in rendered {
        views.push(ViewEntry {
            name: name.to_string(),
            path: path.to_string(),
            row_count: row_count as u64,
            sha256: sha256_hex(csv_text.as_bytes()),
        });
        entries.push((path.to_string(), csv_text.into_bytes()));
    }

    let manifest = ReportManifest {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        run_id: run_id.to_string(),
        assessment_id: assessment_id.to_string(),
        generated_at: summary.generated_at.format(&Rfc3339)?,
        record_count: bundle.records.len() as u64,
        compliance_rate: format!("{:.1}", summary.compliance_rate),
        views,
    };
    entries.push((
        MANIFEST_PATH.to_string(),
        json_canonical::to_canonical_bytes(&manifest)?,
    ));

    let bytes = zip_entries_deterministic(&entries)?;
    Ok(ReportArchive {
        file_name: report_file_name(summary.generated_at)?,
        sha256: sha256_hex(&bytes),
        bytes,
        manifest,
    })
}

pub fn unpack_report(bytes: &[u8]) -> CoreResult<UnpackedReport> {
    let mut manifest = None;
    let mut views = BTreeMap::new();
    for (path, content) in read_zip_entries(bytes)? {
        if path == MANIFEST_PATH {
            manifest = Some(serde_json::from_slice::<ReportManifest>(&content)?);
            continue;
        }
        let text = String::from_utf8(content)
            .map_err(|_| CoreError::InvalidInput(format!("view {} is not utf-8", path)))?;
        views.insert(path, text);
    }
    let manifest = manifest
        .ok_or_else(|| CoreError::InvalidInput(format!("{} missing from report", MANIFEST_PATH)))?;
    if manifest.schema_version != REPORT_SCHEMA_VERSION {
        return Err(CoreError::InvalidInput(format!(
            "unsupported report schema {}",
            manifest.schema_version
        )));
    }
    Ok(UnpackedReport { manifest, views })
}

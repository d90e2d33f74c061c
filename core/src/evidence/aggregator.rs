use crate::error::CoreResult;
use crate::source::interface::{Control, ControlSet, EvidenceSource, RawEvidenceItem};
use rayon::prelude::*;
use std::time::{Duration as StdDuration, Instant};
use time::{Date, Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use super::classifier::classify;
use super::model::{
    parse_folder_date, EvidenceDate, EvidenceType, NormalizedEvidenceRecord, NO_EVIDENCE_FOUND,
};

pub const DEFAULT_FRESHNESS_DAYS: i64 = 7;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
pub const NO_ITEMS_IN_SELECTED_FOLDERS: &str = "No evidence items in selected folders";

#[derive(Debug, Clone)]
pub struct AggregationOptions {
    pub run_time: OffsetDateTime,
    pub freshness_window: Duration,
    pub workers: usize,
    pub call_timeout: StdDuration,
}

impl AggregationOptions {
    pub fn new(run_time: OffsetDateTime) -> Self {
        Self {
            run_time,
            freshness_window: Duration::days(DEFAULT_FRESHNESS_DAYS),
            workers: DEFAULT_WORKERS,
            call_timeout: StdDuration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
        }
    }

    // Folders are compared by calendar day, not by instant.
    // A window reaching past the calendar's start admits every folder.
    pub fn cutoff_date(&self) -> Date {
        self.run_time
            .checked_sub(self.freshness_window)
            .map(|t| t.date())
            .unwrap_or(Date::MIN)
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.call_timeout
    }
}

/// Outcome for one control. Never empty: a control that yields no usable
/// evidence is represented by exactly one placeholder record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvidence {
    Collected(Vec<NormalizedEvidenceRecord>),
    Placeholder(NormalizedEvidenceRecord),
}

impl ControlEvidence {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ControlEvidence::Placeholder(_))
    }

    pub fn into_records(self) -> Vec<NormalizedEvidenceRecord> {
        match self {
            ControlEvidence::Collected(records) => records,
            ControlEvidence::Placeholder(record) => vec![record],
        }
    }
}

pub fn aggregate<S: EvidenceSource>(
    source: &S,
    assessment_id: &str,
    control_sets: &[ControlSet],
    options: &AggregationOptions,
) -> Vec<NormalizedEvidenceRecord> {
    aggregate_controls(source, assessment_id, control_sets, options)
        .into_iter()
        .flat_map(ControlEvidence::into_records)
        .collect()
}

/// Per-control outcomes in source order (control set, then control).
pub fn aggregate_controls<S: EvidenceSource>(
    source: &S,
    assessment_id: &str,
    control_sets: &[ControlSet],
    options: &AggregationOptions,
) -> Vec<ControlEvidence> {
    let jobs: Vec<(&ControlSet, &Control)> = control_sets
        .iter()
        .flat_map(|cs| cs.controls.iter().map(move |c| (cs, c)))
        .collect();
    info!(
        control_sets = control_sets.len(),
        controls = jobs.len(),
        cutoff = %options.cutoff_date(),
        workers = options.workers,
        "collecting evidence"
    );

    let run_sequential = || -> Vec<ControlEvidence> {
        jobs.iter()
            .map(|(cs, c)| collect_control(source, assessment_id, cs, c, options))
            .collect()
    };

    let outcomes = if options.workers <= 1 || jobs.len() <= 1 {
        run_sequential()
    } else {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .build()
        {
            // par_iter().collect() keeps input order.
            Ok(pool) => pool.install(|| {
                jobs.par_iter()
                    .map(|(cs, c)| collect_control(source, assessment_id, cs, c, options))
                    .collect()
            }),
            Err(e) => {
                warn!(error = %e, "worker pool unavailable, collecting sequentially");
                run_sequential()
            }
        }
    };

    let placeholders = outcomes.iter().filter(|o| o.is_placeholder()).count();
    info!(
        controls = outcomes.len(),
        placeholders, "evidence collection finished"
    );
    outcomes
}

pub fn collect_control<S: EvidenceSource>(
    source: &S,
    assessment_id: &str,
    control_set: &ControlSet,
    control: &Control,
    options: &AggregationOptions,
) -> ControlEvidence {
    let placeholder = |reason: &str| {
        NormalizedEvidenceRecord::placeholder(
            control_set.display_name(),
            &control.id,
            &control.name,
            reason,
        )
    };
    match try_collect_control(source, assessment_id, control_set, control, options) {
        Ok(None) => {
            debug!(control_id = %control.id, "no evidence folders");
            ControlEvidence::Placeholder(placeholder(NO_EVIDENCE_FOUND))
        }
        Ok(Some(records)) if records.is_empty() => {
            debug!(control_id = %control.id, "selected evidence folders were empty");
            ControlEvidence::Placeholder(placeholder(NO_ITEMS_IN_SELECTED_FOLDERS))
        }
        Ok(Some(records)) => {
            debug!(control_id = %control.id, records = records.len(), "evidence collected");
            ControlEvidence::Collected(records)
        }
        Err(e) => {
            warn!(control_id = %control.id, error = %e, "error processing control");
            ControlEvidence::Placeholder(placeholder(&e.to_string()))
        }
    }
}

// None means the control has no evidence folders at all.
fn try_collect_control<S: EvidenceSource>(
    source: &S,
    assessment_id: &str,
    control_set: &ControlSet,
    control: &Control,
    options: &AggregationOptions,
) -> CoreResult<Option<Vec<NormalizedEvidenceRecord>>> {
    let folders = source.get_evidence_folders(
        assessment_id,
        &control_set.id,
        &control.id,
        options.deadline(),
    )?;
    if folders.is_empty() {
        return Ok(None);
    }

    let mut dated = Vec::with_capacity(folders.len());
    for folder in &folders {
        dated.push((parse_folder_date(&folder.date)?, folder));
    }

    let cutoff = options.cutoff_date();
    let mut selected: Vec<_> = dated.iter().filter(|(d, _)| *d >= cutoff).collect();
    if selected.is_empty() {
        // Nothing in the window: fall back to the newest folder.
        // rev() makes ties resolve to the first-listed folder.
        if let Some(latest) = dated.iter().rev().max_by_key(|(d, _)| *d) {
            debug!(control_id = %control.id, folder_id = %latest.1.id, "no fresh folders, using latest");
            selected.push(latest);
        }
    }

    let mut records = Vec::new();
    for (date, folder) in selected {
        let items = source.get_evidence_items(
            assessment_id,
            &control_set.id,
            &folder.id,
            options.deadline(),
        )?;
        records.extend(
            items
                .iter()
                .map(|item| normalize_item(control_set, control, *date, item)),
        );
    }
    Ok(Some(records))
}

pub fn normalize_item(
    control_set: &ControlSet,
    control: &Control,
    folder_date: Date,
    item: &RawEvidenceItem,
) -> NormalizedEvidenceRecord {
    let c = classify(item);
    NormalizedEvidenceRecord {
        control_set_name: control_set.display_name().to_string(),
        control_id: control.id.clone(),
        control_name: control.name.clone(),
        evidence_date: EvidenceDate::Dated(folder_date),
        evidence_type: EvidenceType::from(item.data_source.clone().unwrap_or_default()),
        compliance_status: c.status,
        finding: item.text_response.clone().unwrap_or_default(),
        resource_reference: c.resource,
        severity: c.severity,
    }
}

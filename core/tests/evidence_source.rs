use audit_report_core::evidence::aggregator::{aggregate, AggregationOptions};
use audit_report_core::source::interface::{
    Assessment, EvidenceFolder, EvidenceSource, RawEvidenceItem, SourceError, SourceErrorKind,
    SourceResult,
};
use audit_report_core::source::retry::RetryingSource;
use audit_report_core::source::snapshot::SnapshotSource;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use time::macros::datetime;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/assessment_snapshot.json")
}

fn later() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

#[test]
fn snapshot_serves_assessment_structure() {
    let source = SnapshotSource::from_path(fixture()).unwrap();
    let a = source.get_assessment("a-weekly-soc2", later()).unwrap();
    assert_eq!(a.control_sets.len(), 2);
    assert_eq!(a.control_count(), 4);
    assert_eq!(a.control_sets[0].controls[0].id, "CC6.1");

    let folders = source
        .get_evidence_folders("a-weekly-soc2", "cs-cc6", "CC6.1", later())
        .unwrap();
    let ids: Vec<&str> = folders.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["f-cc6-1-new", "f-cc6-1-old"]);

    let items = source
        .get_evidence_items("a-weekly-soc2", "cs-cc6", "f-cc6-1-new", later())
        .unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn snapshot_reports_unknown_ids_and_expired_deadlines() {
    let source = SnapshotSource::from_path(fixture()).unwrap();
    let err = source.get_assessment("other", later()).unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::NotFound);

    let err = source
        .get_evidence_folders("a-weekly-soc2", "cs-cc6", "CC9.9", later())
        .unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::NotFound);

    let past = Instant::now();
    std::thread::sleep(Duration::from_millis(5));
    let err = source.get_assessment("a-weekly-soc2", past).unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::Timeout);
    assert!(err.is_transient());
}

#[test]
fn snapshot_aggregates_every_control() {
    let source = SnapshotSource::from_path(fixture()).unwrap();
    let a = source.get_assessment("a-weekly-soc2", later()).unwrap();
    let records = aggregate(
        &source,
        "a-weekly-soc2",
        &a.control_sets,
        &AggregationOptions::new(datetime!(2024-03-15 12:00 UTC)),
    );
    let ids: Vec<&str> = records.iter().map(|r| r.control_id.as_str()).collect();
    assert_eq!(ids, vec!["CC6.1", "CC6.1", "CC6.2", "CC7.2", "CC7.3"]);
}

// Fails with the queued errors first, then succeeds.
struct FlakySource {
    failures: Mutex<VecDeque<SourceError>>,
    calls: AtomicUsize,
}

impl FlakySource {
    fn new(failures: Vec<SourceError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> SourceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap().pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl EvidenceSource for FlakySource {
    fn get_assessment(&self, assessment_id: &str, _deadline: Instant) -> SourceResult<Assessment> {
        self.next()?;
        Ok(Assessment {
            id: assessment_id.to_string(),
            name: String::new(),
            control_sets: vec![],
        })
    }

    fn get_evidence_folders(
        &self,
        _assessment_id: &str,
        _control_set_id: &str,
        _control_id: &str,
        _deadline: Instant,
    ) -> SourceResult<Vec<EvidenceFolder>> {
        self.next()?;
        Ok(vec![])
    }

    fn get_evidence_items(
        &self,
        _assessment_id: &str,
        _control_set_id: &str,
        _evidence_folder_id: &str,
        _deadline: Instant,
    ) -> SourceResult<Vec<RawEvidenceItem>> {
        self.next()?;
        Ok(vec![])
    }
}

fn throttled() -> SourceError {
    SourceError::new(SourceErrorKind::Throttled, "rate exceeded")
}

#[test]
fn transient_failure_is_retried_once() {
    let flaky = FlakySource::new(vec![throttled()]);
    let source = RetryingSource::new(&flaky);
    assert!(source.get_assessment("a", later()).is_ok());
    assert_eq!(flaky.calls(), 2);
}

#[test]
fn second_transient_failure_surfaces() {
    let flaky = FlakySource::new(vec![throttled(), throttled()]);
    let source = RetryingSource::new(&flaky);
    let err = source
        .get_evidence_folders("a", "cs", "c", later())
        .unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::Throttled);
    assert_eq!(flaky.calls(), 2);
}

#[test]
fn permanent_failure_is_not_retried() {
    let flaky = FlakySource::new(vec![SourceError::new(
        SourceErrorKind::AccessDenied,
        "not authorized",
    )]);
    let source = RetryingSource::new(&flaky);
    assert!(source.get_evidence_items("a", "cs", "f", later()).is_err());
    assert_eq!(flaky.calls(), 1);
}

#[test]
fn no_retry_once_deadline_has_passed() {
    let flaky = FlakySource::new(vec![throttled()]);
    let source = RetryingSource::new(&flaky);
    let deadline = Instant::now();
    std::thread::sleep(Duration::from_millis(5));
    assert!(source.get_assessment("a", deadline).is_err());
    assert_eq!(flaky.calls(), 1);
}

#[test]
fn retry_budget_is_configurable() {
    let flaky = FlakySource::new(vec![throttled(), throttled()]);
    let source = RetryingSource::with_max_retries(&flaky, 2);
    assert!(source.get_assessment("a", later()).is_ok());
    assert_eq!(flaky.calls(), 3);
    assert_eq!(source.inner().calls(), 3);
}

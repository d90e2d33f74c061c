use std::time::Instant;
use tracing::warn;

use super::interface::{
    Assessment, EvidenceFolder, EvidenceSource, RawEvidenceItem, SourceResult,
};

pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Wraps a source so that transient failures (timeout, throttling,
/// unavailability) are retried before surfacing. Permanent failures and calls
/// whose deadline has already passed are returned as-is.
pub struct RetryingSource<S: EvidenceSource> {
    inner: S,
    max_retries: u32,
}

impl<S: EvidenceSource> RetryingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(inner: S, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn call<T>(
        &self,
        operation: &'static str,
        deadline: Instant,
        f: impl Fn(Instant) -> SourceResult<T>,
    ) -> SourceResult<T> {
        let mut attempt = 0u32;
        loop {
            match f(deadline) {
                Ok(v) => return Ok(v),
                Err(e)
                    if e.is_transient()
                        && attempt < self.max_retries
                        && Instant::now() < deadline =>
                {
                    attempt += 1;
                    warn!(operation, attempt, error = %e, "transient evidence source failure, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S: EvidenceSource> EvidenceSource for RetryingSource<S> {
    fn get_assessment(&self, assessment_id: &str, deadline: Instant) -> SourceResult<Assessment> {
        self.call("get_assessment", deadline, |d| {
            self.inner.get_assessment(assessment_id, d)
        })
    }

    fn get_evidence_folders(
        &self,
        assessment_id: &str,
        control_set_id: &str,
        control_id: &str,
        deadline: Instant,
    ) -> SourceResult<Vec<EvidenceFolder>> {
        self.call("get_evidence_folders", deadline, |d| {
            self.inner
                .get_evidence_folders(assessment_id, control_set_id, control_id, d)
        })
    }

    fn get_evidence_items(
        &self,
        assessment_id: &str,
        control_set_id: &str,
        evidence_folder_id: &str,
        deadline: Instant,
    ) -> SourceResult<Vec<RawEvidenceItem>> {
        self.call("get_evidence_items", deadline, |d| {
            self.inner
                .get_evidence_items(assessment_id, control_set_id, evidence_folder_id, d)
        })
    }
}

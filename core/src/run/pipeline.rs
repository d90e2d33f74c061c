use crate::audit::event::{AuditEvent, AuditEventType};
use crate::audit::log::AuditLog;
use crate::config::ReportConfig;
use crate::determinism::run_id::new_run_id;
use crate::error::{CoreError, CoreResult};
use crate::evidence::aggregator::{aggregate_controls, ControlEvidence};
use crate::report::archive::{pack_report, ReportArchive};
use crate::report::views::ReportBundle;
use crate::sink::interface::{compose_notification, report_object_key, Notifier, ReportSink};
use crate::source::interface::EvidenceSource;
use crate::source::retry::RetryingSource;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use super::lifecycle::{emit_state_changed, valid_transition, RunState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    FetchAssessment,
    Synthesize,
    Store,
    Notify,
    Audit,
}

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub run_time: OffsetDateTime,
}

impl RunContext {
    pub fn now() -> Self {
        Self {
            run_id: new_run_id(),
            run_time: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: String,
    pub state: RunState,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::COMPLETED && self.error.is_none()
    }

    // {statusCode, body} where body is a JSON string.
    pub fn to_response(&self) -> serde_json::Value {
        if self.succeeded() {
            json!({
                "statusCode": 200,
                "body": json!({
                    "message": "Report generated successfully",
                    "run_id": self.run_id,
                    "object_key": self.object_key,
                    "record_count": self.record_count,
                })
                .to_string(),
            })
        } else {
            json!({
                "statusCode": 500,
                "body": json!({
                    "error": self.error.clone().unwrap_or_default(),
                    "run_id": self.run_id,
                })
                .to_string(),
            })
        }
    }
}

type StageResult<T> = Result<T, (Stage, CoreError)>;

fn at(stage: Stage) -> impl FnOnce(CoreError) -> (Stage, CoreError) {
    move |e| (stage, e)
}

/// Drives one invocation: fetch -> aggregate -> synthesize -> store -> notify.
/// Holds the packed archive once synthesized so that a failed delivery can be
/// retried with `deliver` without touching the evidence source again.
pub struct ReportRunner<'a, S: EvidenceSource, K: ReportSink, N: Notifier> {
    config: &'a ReportConfig,
    source: RetryingSource<&'a S>,
    sink: &'a K,
    notifier: &'a N,
    audit: AuditLog,
    ctx: RunContext,
    state: RunState,
    record_count: usize,
    archive: Option<ReportArchive>,
}

impl<'a, S: EvidenceSource, K: ReportSink, N: Notifier> ReportRunner<'a, S, K, N> {
    pub fn new(
        config: &'a ReportConfig,
        source: &'a S,
        sink: &'a K,
        notifier: &'a N,
        audit: AuditLog,
        ctx: RunContext,
    ) -> Self {
        Self {
            config,
            source: RetryingSource::new(source),
            sink,
            notifier,
            audit,
            ctx,
            state: RunState::CREATED,
            record_count: 0,
            archive: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn archive(&self) -> Option<&ReportArchive> {
        self.archive.as_ref()
    }

    pub fn run(&mut self) -> RunOutcome {
        info!(run_id = %self.ctx.run_id, assessment_id = %self.config.assessment_id, "starting weekly audit report generation");
        match self.collect_and_synthesize() {
            Ok(()) => self.deliver(),
            Err((stage, e)) => self.fail(stage, e),
        }
    }

    /// Stores and announces the already packed archive. Valid right after
    /// synthesis or after a failed delivery.
    pub fn deliver(&mut self) -> RunOutcome {
        let Some(archive) = self.archive.clone() else {
            return self.fail(
                Stage::Store,
                CoreError::RunState("no synthesized report to deliver".to_string()),
            );
        };
        match self.deliver_archive(&archive) {
            Ok(outcome) => outcome,
            Err((stage, e)) => self.fail(stage, e),
        }
    }

    fn collect_and_synthesize(&mut self) -> StageResult<()> {
        self.transition(RunState::COLLECTING, "run started")
            .map_err(at(Stage::Audit))?;
        self.record(
            AuditEventType::ReportRunStarted,
            json!({
                "freshness_days": self.config.freshness_days,
                "workers": self.config.workers,
            }),
        )?;

        let options = self.config.aggregation_options(self.ctx.run_time);
        let assessment = self
            .source
            .get_assessment(
                &self.config.assessment_id,
                Instant::now() + options.call_timeout,
            )
            .map_err(|e| (Stage::FetchAssessment, CoreError::from(e)))?;
        info!(
            control_sets = assessment.control_sets.len(),
            controls = assessment.control_count(),
            "retrieved assessment"
        );
        self.record(
            AuditEventType::AssessmentFetched,
            json!({
                "control_sets": assessment.control_sets.len(),
                "controls": assessment.control_count(),
            }),
        )?;

        let outcomes = aggregate_controls(
            &self.source,
            &self.config.assessment_id,
            &assessment.control_sets,
            &options,
        );
        let placeholders = outcomes.iter().filter(|o| o.is_placeholder()).count();
        let controls = outcomes.len();
        let records: Vec<_> = outcomes
            .into_iter()
            .flat_map(ControlEvidence::into_records)
            .collect();
        self.record_count = records.len();
        self.record(
            AuditEventType::EvidenceAggregated,
            json!({
                "controls": controls,
                "records": records.len(),
                "placeholders": placeholders,
            }),
        )?;

        self.transition(RunState::SYNTHESIZING, "evidence collected")
            .map_err(at(Stage::Audit))?;
        let bundle = ReportBundle::synthesize(records, self.ctx.run_time);
        let archive = pack_report(&bundle, &self.ctx.run_id, &self.config.assessment_id)
            .map_err(at(Stage::Synthesize))?;
        let summary = &bundle.executive_summary;
        self.record(
            AuditEventType::ReportSynthesized,
            json!({
                "total_controls": summary.total_controls,
                "passing_controls": summary.passing_controls,
                "failing_controls": summary.failing_controls,
                "compliance_rate": archive.manifest.compliance_rate,
            }),
        )?;
        info!(
            records = bundle.records.len(),
            compliance_rate = %summary.compliance_rate_label(),
            archive_sha256 = %archive.sha256,
            "report synthesized"
        );
        self.archive = Some(archive);
        Ok(())
    }

    fn deliver_archive(&mut self, archive: &ReportArchive) -> StageResult<RunOutcome> {
        self.transition(RunState::DELIVERING, "report ready")
            .map_err(at(Stage::Audit))?;

        let object_key = report_object_key(self.ctx.run_time, &archive.file_name)
            .map_err(at(Stage::Store))?;
        let stored = self
            .sink
            .store(&object_key, &archive.bytes)
            .map_err(at(Stage::Store))?;
        self.record(
            AuditEventType::ReportStored,
            json!({
                "object_key": stored.object_key,
                "sha256": stored.sha256,
                "size_bytes": stored.size_bytes,
            }),
        )?;

        let expiry = self.config.link_expiry();
        let link = self
            .sink
            .retrieval_link(&stored, expiry)
            .map_err(at(Stage::Store))?;
        let notification = compose_notification(
            &self.config.sender,
            &self.config.recipients,
            &link,
            expiry,
            self.ctx.run_time,
        )
        .map_err(at(Stage::Notify))?;
        self.notifier
            .notify(&notification)
            .map_err(at(Stage::Notify))?;
        self.record(
            AuditEventType::NotificationSent,
            json!({ "recipient_count": notification.recipients.len() }),
        )?;
        info!(
            recipients = notification.recipients.len(),
            "sent notifications"
        );

        self.transition(RunState::COMPLETED, "report delivered")
            .map_err(at(Stage::Audit))?;
        self.record(
            AuditEventType::ReportRunCompleted,
            json!({ "object_key": stored.object_key }),
        )?;

        Ok(RunOutcome {
            run_id: self.ctx.run_id.clone(),
            state: self.state,
            record_count: self.record_count,
            object_key: Some(stored.object_key),
            retrieval_link: Some(link),
            failed_stage: None,
            error: None,
        })
    }

    fn fail(&mut self, stage: Stage, e: CoreError) -> RunOutcome {
        let message = e.to_string();
        error!(run_id = %self.ctx.run_id, stage = ?stage, error = %message, "failed to generate report");
        if let Err(audit_err) = self.record(
            AuditEventType::ReportRunFailed,
            json!({ "stage": stage, "error": message }),
        ) {
            warn!(error = %audit_err.1, "could not record run failure");
        }
        if valid_transition(self.state, RunState::FAILED) {
            if let Err(audit_err) = self.transition(RunState::FAILED, "run failed") {
                warn!(error = %audit_err, "could not record failed state");
            }
        }
        RunOutcome {
            run_id: self.ctx.run_id.clone(),
            state: self.state,
            record_count: self.record_count,
            object_key: None,
            retrieval_link: None,
            failed_stage: Some(stage),
            error: Some(message),
        }
    }

    fn record(&mut self, event_type: AuditEventType, details: serde_json::Value) -> StageResult<()> {
        self.audit
            .append(AuditEvent::system(
                event_type,
                &self.ctx.run_id,
                &self.config.assessment_id,
                details,
            ))
            .map(|_| ())
            .map_err(at(Stage::Audit))
    }

    fn transition(&mut self, to: RunState, reason: &str) -> CoreResult<()> {
        if !valid_transition(self.state, to) {
            return Err(CoreError::RunState(format!(
                "invalid run state transition {:?} -> {:?}",
                self.state, to
            )));
        }
        emit_state_changed(
            &mut self.audit,
            &self.ctx.run_id,
            &self.config.assessment_id,
            self.state,
            to,
            reason,
        )?;
        self.state = to;
        Ok(())
    }
}

use crate::audit::event::{AuditEvent, AuditEventType};
use crate::audit::log::AuditLog;
use crate::error::CoreResult;
use serde::{Deserialize, Serialize};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunState {
    CREATED,
    COLLECTING,
    SYNTHESIZING,
    DELIVERING,
    COMPLETED,
    FAILED,
}

pub fn valid_transition(from: RunState, to: RunState) -> bool {
    use RunState::*;
    match (from, to) {
        (CREATED, COLLECTING) => true,
        (COLLECTING, SYNTHESIZING) => true,
        (SYNTHESIZING, DELIVERING) => true,
        (DELIVERING, COMPLETED) => true,
        // Delivery retry from an already synthesized report.
        (FAILED, DELIVERING) => true,
        (COMPLETED, _) => false,
        (FAILED, FAILED) => false,
        (_, FAILED) => true,
        _ => false,
    }
}

pub fn emit_state_changed(
    audit: &mut AuditLog,
    run_id: &str,
    assessment_id: &str,
    from: RunState,
    to: RunState,
    reason: &str,
) -> CoreResult<()> {
    audit.append(AuditEvent::system(
        AuditEventType::RunStateChanged,
        run_id,
        assessment_id,
        serde_json::json!({
            "from_state": format!("{:?}", from),
            "to_state": format!("{:?}", to),
            "reason": reason
        }),
    ))?;
    Ok(())
}

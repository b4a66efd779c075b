use std::collections::HashMap;

use context::{Context, PhaseState, EXTRACT, LOAD, PHASE_ORDER, TRANSFORM};
use models::ErrorRecord;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

const RECENT_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    /// 0 on success, non-zero on fatal error, per spec §6's exit-code
    /// contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failed => 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PhaseSummary {
    pub status: PhaseState,
    pub metrics: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorRecord>,
}

/// `{task_id, status, export_id?, conversation_count, message_count,
/// phases, resumed_from_checkpoint?}`, per spec §4.9.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub task_id: Uuid,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_id: Option<i64>,
    pub conversation_count: usize,
    pub message_count: usize,
    pub phases: HashMap<String, PhaseSummary>,
    pub resumed_from_checkpoint: bool,
}

pub(crate) fn build(ctx: &Context, resumed_from_checkpoint: bool, success: bool) -> RunSummary {
    let mut phases = HashMap::with_capacity(PHASE_ORDER.len());
    for name in PHASE_ORDER {
        let Some(status) = ctx.phases.get_phase_status(name) else {
            continue;
        };
        let errors = ctx.errors.recent(RECENT_ERRORS).into_iter().filter(|e| e.phase == name).collect();
        phases.insert(
            name.to_string(),
            PhaseSummary {
                status: status.state,
                metrics: status.metrics,
                errors,
            },
        );
    }

    let conversation_count = phases
        .get(TRANSFORM)
        .and_then(|p| p.metrics.get("conversation_count"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;
    let message_count = phases
        .get(TRANSFORM)
        .and_then(|p| p.metrics.get("message_count"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;

    let load_failed = phases.get(LOAD).map(|p| p.status == PhaseState::Failed).unwrap_or(false);
    let extract_failed = phases.get(EXTRACT).map(|p| p.status == PhaseState::Failed).unwrap_or(false);
    let transform_failed = phases.get(TRANSFORM).map(|p| p.status == PhaseState::Failed).unwrap_or(false);

    let status = if success && !extract_failed && !transform_failed && !load_failed {
        RunStatus::Success
    } else {
        RunStatus::Failed
    };

    RunSummary {
        task_id: ctx.task_id,
        status,
        export_id: ctx.identity().export_id,
        conversation_count,
        message_count,
        phases,
        resumed_from_checkpoint,
    }
}

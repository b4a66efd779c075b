use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three named phases the pipeline always runs in order.
pub const EXTRACT: &str = "extract";
pub const TRANSFORM: &str = "transform";
pub const LOAD: &str = "load";

pub const PHASE_ORDER: [&str; 3] = [EXTRACT, TRANSFORM, LOAD];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Pending,
    InProgress,
    Completed,
    Warning,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseStatus {
    pub state: PhaseState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub metrics: HashMap<String, Value>,
}

impl Default for PhaseStatus {
    fn default() -> Self {
        Self {
            state: PhaseState::Pending,
            started_at: None,
            ended_at: None,
            duration_ms: None,
            metrics: HashMap::new(),
        }
    }
}

/// Tracks per-phase state for `extract`, `transform`, `load`. Mutations
/// are serialized behind a single `Mutex`, matching spec §5's "each
/// sub-manager must serialize its own mutations."
#[derive(Debug)]
pub struct PhaseManager {
    phases: Mutex<HashMap<String, PhaseStatus>>,
}

impl PhaseManager {
    pub fn new() -> Self {
        let mut phases = HashMap::new();
        for name in PHASE_ORDER {
            phases.insert(name.to_string(), PhaseStatus::default());
        }
        Self {
            phases: Mutex::new(phases),
        }
    }

    pub fn start_phase(&self, name: &str, total_conversations: Option<i64>, total_messages: Option<i64>) {
        let mut phases = self.phases.lock().unwrap();
        let status = phases.entry(name.to_string()).or_default();
        status.state = PhaseState::InProgress;
        status.started_at = Some(Utc::now());
        status.ended_at = None;
        status.duration_ms = None;
        if let Some(n) = total_conversations {
            status.metrics.insert("total_conversations".into(), Value::from(n));
        }
        if let Some(n) = total_messages {
            status.metrics.insert("total_messages".into(), Value::from(n));
        }
    }

    pub fn end_phase(&self, name: &str, state: PhaseState) {
        assert!(
            matches!(state, PhaseState::Completed | PhaseState::Warning | PhaseState::Failed),
            "end_phase must be called with a terminal state"
        );
        let mut phases = self.phases.lock().unwrap();
        let status = phases.entry(name.to_string()).or_default();
        status.state = state;
        let now = Utc::now();
        status.ended_at = Some(now);
        if let Some(started) = status.started_at {
            status.duration_ms = Some((now - started).num_milliseconds());
        }
    }

    pub fn update_phase_metric(&self, name: &str, key: &str, value: Value) {
        let mut phases = self.phases.lock().unwrap();
        let status = phases.entry(name.to_string()).or_default();
        status.metrics.insert(key.to_string(), value);
    }

    pub fn get_phase_status(&self, name: &str) -> Option<PhaseStatus> {
        self.phases.lock().unwrap().get(name).cloned()
    }

    /// Can resume at `name` only if every phase before it in
    /// `PHASE_ORDER` is `Completed`.
    pub fn can_resume_from_phase(&self, name: &str) -> bool {
        let phases = self.phases.lock().unwrap();
        for candidate in PHASE_ORDER {
            if candidate == name {
                return true;
            }
            match phases.get(candidate) {
                Some(status) if status.state == PhaseState::Completed => continue,
                _ => return false,
            }
        }
        false
    }

    pub fn snapshot(&self) -> HashMap<String, PhaseStatus> {
        self.phases.lock().unwrap().clone()
    }

    pub fn restore(&self, snapshot: HashMap<String, PhaseStatus>) {
        *self.phases.lock().unwrap() = snapshot;
    }
}

impl Default for PhaseManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_resume_requires_all_prior_phases_completed() {
        let pm = PhaseManager::new();
        assert!(pm.can_resume_from_phase(EXTRACT));
        assert!(!pm.can_resume_from_phase(TRANSFORM));

        pm.start_phase(EXTRACT, None, None);
        pm.end_phase(EXTRACT, PhaseState::Completed);
        assert!(pm.can_resume_from_phase(TRANSFORM));
        assert!(!pm.can_resume_from_phase(LOAD));

        pm.start_phase(TRANSFORM, None, None);
        pm.end_phase(TRANSFORM, PhaseState::Failed);
        assert!(!pm.can_resume_from_phase(LOAD));
    }

    #[test]
    fn end_phase_records_duration() {
        let pm = PhaseManager::new();
        pm.start_phase(EXTRACT, Some(3), None);
        pm.end_phase(EXTRACT, PhaseState::Completed);
        let status = pm.get_phase_status(EXTRACT).unwrap();
        assert_eq!(status.state, PhaseState::Completed);
        assert!(status.duration_ms.is_some());
        assert_eq!(status.metrics["total_conversations"], Value::from(3));
    }
}

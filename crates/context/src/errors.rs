use std::sync::Mutex;

use chrono::Utc;
use models::ErrorRecord;
use serde_json::Value;

use crate::phase::{PhaseManager, PhaseState};

/// Centralizes observability of non-fatal and fatal errors across the
/// pipeline, per spec §4.1. Fatal errors flip the named phase to
/// `Failed` via `PhaseManager`; non-fatal errors flip it to `Warning`
/// (if it isn't already `Failed`) and never propagate further.
pub struct ErrorLogger {
    records: Mutex<Vec<ErrorRecord>>,
}

impl ErrorLogger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn record_error(
        &self,
        phases: &PhaseManager,
        phase: &str,
        message: impl Into<String>,
        details: Option<Value>,
        fatal: bool,
    ) {
        let message = message.into();
        let record = ErrorRecord {
            phase: phase.to_string(),
            timestamp: Utc::now(),
            message: message.clone(),
            details: details.clone(),
            fatal,
        };

        if fatal {
            tracing::error!(phase, %message, details = ?details, "fatal error");
            phases.end_phase(phase, PhaseState::Failed);
        } else {
            tracing::warn!(phase, %message, details = ?details, "non-fatal error");
            if let Some(status) = phases.get_phase_status(phase) {
                if status.state != PhaseState::Failed {
                    phases.update_phase_metric(phase, "had_warning", Value::Bool(true));
                }
            }
        }

        self.records.lock().unwrap().push(record);
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn fatal_count(&self) -> usize {
        self.records.lock().unwrap().iter().filter(|e| e.fatal).count()
    }

    pub fn error_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Up to `n` most recent errors, newest last, for the run summary
    /// per spec §7.
    pub fn recent(&self, n: usize) -> Vec<ErrorRecord> {
        let records = self.records.lock().unwrap();
        let start = records.len().saturating_sub(n);
        records[start..].to_vec()
    }

    pub fn restore(&self, records: Vec<ErrorRecord>) {
        *self.records.lock().unwrap() = records;
    }
}

impl Default for ErrorLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::EXTRACT;

    #[test]
    fn fatal_error_fails_the_phase() {
        let phases = PhaseManager::new();
        let errors = ErrorLogger::new();
        phases.start_phase(EXTRACT, None, None);

        errors.record_error(&phases, EXTRACT, "boom", None, true);

        assert_eq!(phases.get_phase_status(EXTRACT).unwrap().state, PhaseState::Failed);
        assert_eq!(errors.fatal_count(), 1);
    }

    #[test]
    fn non_fatal_error_does_not_fail_the_phase() {
        let phases = PhaseManager::new();
        let errors = ErrorLogger::new();
        phases.start_phase(EXTRACT, None, None);

        errors.record_error(&phases, EXTRACT, "minor issue", None, false);

        assert_eq!(phases.get_phase_status(EXTRACT).unwrap().state, PhaseState::InProgress);
        assert_eq!(errors.fatal_count(), 0);
        assert_eq!(errors.error_count(), 1);
    }
}

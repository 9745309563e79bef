//! Between-session environment step: expire old stressors, then draw and
//! apply new ones.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::patient::{LapseCheck, PatientState, PatientStateModel};
use crate::stressors::{Stressor, StressorCatalog};

/// Default bounds on stressors drawn per session boundary.
pub const MIN_STRESSORS: usize = 1;
pub const MAX_STRESSORS: usize = 3;

/// What happened at one session boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReport {
    pub session_number: u32,
    pub expired: Vec<Stressor>,
    pub applied: Vec<Stressor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lapse_check: Option<LapseCheck>,
}

impl EnvironmentReport {
    fn skipped(session_number: u32) -> Self {
        Self {
            session_number,
            expired: Vec::new(),
            applied: Vec::new(),
            lapse_check: None,
        }
    }
}

/// Samples stressors from an injected catalog.
#[derive(Debug, Clone)]
pub struct EnvironmentStep {
    catalog: StressorCatalog,
    min_stressors: usize,
    max_stressors: usize,
}

impl EnvironmentStep {
    /// Create a step that samples from `catalog`.
    pub fn new(catalog: StressorCatalog) -> Self {
        Self {
            catalog,
            min_stressors: MIN_STRESSORS,
            max_stressors: MAX_STRESSORS,
        }
    }

    /// Catalog this step samples from.
    pub fn catalog(&self) -> &StressorCatalog {
        &self.catalog
    }

    /// Run the step before `session_number`. Session 1 is skipped without
    /// consuming randomness.
    ///
    /// Expiry runs before sampling so a stressor cannot be aged out and
    /// redrawn in the same step. Draw order: stressor count, then the
    /// sample, then the lapse check.
    pub fn run<R: Rng + ?Sized>(
        &self,
        model: &PatientStateModel,
        state: &mut PatientState,
        session_number: u32,
        rng: &mut R,
    ) -> EnvironmentReport {
        if session_number <= 1 {
            return EnvironmentReport::skipped(session_number);
        }

        let expired = expire_stressors(state, session_number);

        let count = rng.random_range(self.min_stressors..=self.max_stressors);
        let applied = self.catalog.sample(count, rng);
        for stressor in &applied {
            log::info!(
                "Session {}: stressor {:?} ({}, severity {}, {})",
                session_number,
                stressor.name,
                stressor.category,
                stressor.severity,
                stressor.likely_duration
            );
        }
        let lapse_check = model.apply_stressors(state, applied.clone(), session_number, rng);

        EnvironmentReport {
            session_number,
            expired,
            applied,
            lapse_check: Some(lapse_check),
        }
    }
}

/// Remove ledger entries whose duration bucket has elapsed, returning them
/// in ledger order.
pub fn expire_stressors(state: &mut PatientState, current_session: u32) -> Vec<Stressor> {
    let ledger = state.stressor_ledger_mut();
    let mut expired = Vec::new();
    ledger.retain(|entry| {
        if entry.is_expired(current_session) {
            log::debug!(
                "Stressor {:?} expired after {} session(s)",
                entry.stressor.name,
                entry.sessions_active(current_session)
            );
            expired.push(entry.stressor.clone());
            false
        } else {
            true
        }
    });
    expired
}

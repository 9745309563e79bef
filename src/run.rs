//! Multi-session run loop and its serialized output.
//!
//! A [`SimulationRun`] owns everything one simulated patient needs: the
//! state, the model, the catalogs, the collaborators and the single seeded
//! generator. Sessions run strictly in sequence:
//!
//! 1. snapshot the initial state,
//! 2. run the environment step (from session 2 on),
//! 3. drive the session,
//! 4. consolidate, then fold in the rubric score when the model has rubric
//!    rules,
//! 5. snapshot the final state and emit a [`SessionRecord`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{Difficulty, RunSeed, SimulationConfig};
use crate::dialogue::{
    DialogueAgent, ExcerptSummarizer, HeuristicRubricScorer, ProfileSummarizer, Role,
    RubricScorer, RubricScores, ScriptedPatient, ScriptedTherapist, TranscriptEntry,
};
use crate::environment::EnvironmentStep;
use crate::error::SimError;
use crate::patient::{
    LapseCheck, ModelVariant, PatientState, PatientStateModel, RubricOutcome, StateSnapshot,
    TurnUpdate,
};
use crate::session::{EndReason, SessionInputs, SessionSimulator};
use crate::strategies::{SessionAgenda, SessionGoal, SessionGoals, StrategyCatalog};
use crate::stressors::Stressor;
use crate::utilities::file_handler::FileHandler;

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// One completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_number: u32,
    /// Programme goal for this session; absent past the last planned session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_goal: Option<SessionGoal>,
    pub initial_state: StateSnapshot,
    pub final_state: StateSnapshot,
    pub stressors_applied: Vec<Stressor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stressors_expired: Vec<Stressor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lapse_check: Option<LapseCheck>,
    pub transcript: Vec<TranscriptEntry>,
    pub strategies_used: Vec<String>,
    pub strategy_usage: BTreeMap<String, usize>,
    pub turns_taken: usize,
    pub end_reason: EndReason,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turn_updates: Vec<TurnUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric_scores: Option<RubricScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric_outcome: Option<RubricOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_summary: Option<String>,
}

/// Everything a run produced, written once at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub seed: RunSeed,
    pub variant: ModelVariant,
    pub difficulty: Difficulty,
    pub num_sessions: u32,
    pub max_turns: usize,
    pub first_speaker: Role,
    pub profile: String,
    pub profile_summary: String,
    pub sessions: Vec<SessionRecord>,
    pub final_state: StateSnapshot,
}

impl RunOutput {
    /// `simulated_dialogue_<YYYYMMDD_HHMMSS>.json`
    pub fn file_name(&self) -> String {
        format!(
            "simulated_dialogue_{}.json",
            self.created_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Write the output under `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SimError> {
        FileHandler::new(dir.as_ref()).save(&self.file_name(), self)
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External agents a run talks to.
#[derive(Debug)]
pub struct Collaborators {
    pub patient: Box<dyn DialogueAgent>,
    pub therapist: Box<dyn DialogueAgent>,
    pub summarizer: Box<dyn ProfileSummarizer>,
    /// Only consulted when the model has rubric rules.
    pub scorer: Option<Box<dyn RubricScorer>>,
}

impl Collaborators {
    /// The offline, deterministic agents.
    pub fn scripted() -> Self {
        Self {
            patient: Box::new(ScriptedPatient::new()),
            therapist: Box::new(ScriptedTherapist::new()),
            summarizer: Box::new(ExcerptSummarizer::default()),
            scorer: Some(Box::new(HeuristicRubricScorer)),
        }
    }
}

// ---------------------------------------------------------------------------
// SimulationRun
// ---------------------------------------------------------------------------

/// One simulated patient's full multi-session run.
#[derive(Debug)]
pub struct SimulationRun {
    config: SimulationConfig,
    seed: RunSeed,
    rng: ChaCha20Rng,
    model: PatientStateModel,
    state: PatientState,
    environment: EnvironmentStep,
    session: SessionSimulator,
    agenda: SessionAgenda,
    goals: SessionGoals,
    strategies: StrategyCatalog,
    collaborators: Collaborators,
}

impl SimulationRun {
    /// Build a run. Fails on an invalid configuration, a missing or
    /// malformed seed, an unreadable catalog, or collaborators wired to the
    /// wrong role.
    pub fn new(config: SimulationConfig, collaborators: Collaborators) -> Result<Self, SimError> {
        config.validate()?;
        let seed = config.run_seed()?.ok_or(SimError::MissingSeed)?;
        if collaborators.patient.role() != Role::Patient
            || collaborators.therapist.role() != Role::Therapist
        {
            return Err(SimError::invalid_config(
                "patient and therapist agents are wired to the wrong roles",
            ));
        }
        let model = PatientStateModel::new(config.model_config())?;
        let catalog = config.load_catalog()?;
        let state = model.initial_state();
        Ok(Self {
            seed,
            rng: seed.rng(),
            environment: EnvironmentStep::new(catalog),
            session: SessionSimulator::new(config.max_turns, config.first_speaker),
            agenda: SessionAgenda::builtin(),
            goals: SessionGoals::builtin(),
            strategies: StrategyCatalog::builtin(),
            model,
            state,
            config,
            collaborators,
        })
    }

    /// Seed this run was built with.
    pub fn seed(&self) -> RunSeed {
        self.seed
    }

    /// Current patient state.
    pub fn state(&self) -> &PatientState {
        &self.state
    }

    pub fn model(&self) -> &PatientStateModel {
        &self.model
    }

    /// Run every session and return the output record.
    pub async fn execute(mut self, profile: &str) -> RunOutput {
        let created_at = Utc::now();
        let profile_summary = match self.collaborators.summarizer.summarize(profile).await {
            Ok(summary) => summary,
            Err(err) => {
                log::warn!("Profile summarization failed ({}); using the raw profile", err);
                profile.to_string()
            }
        };

        log::info!(
            "Starting {} run: {} session(s), seed {}",
            self.model.config().variant,
            self.config.num_sessions,
            self.seed
        );

        let mut sessions = Vec::with_capacity(self.config.num_sessions as usize);
        for session_number in 1..=self.config.num_sessions {
            let record = self.run_session(session_number, &profile_summary).await;
            sessions.push(record);
        }

        RunOutput {
            run_id: Uuid::new_v4(),
            created_at,
            seed: self.seed,
            variant: self.model.config().variant,
            difficulty: self.config.difficulty,
            num_sessions: self.config.num_sessions,
            max_turns: self.config.max_turns,
            first_speaker: self.config.first_speaker,
            profile: profile.to_string(),
            profile_summary,
            final_state: self.state.snapshot(),
            sessions,
        }
    }

    async fn run_session(&mut self, session_number: u32, profile_summary: &str) -> SessionRecord {
        let initial_state = self.state.snapshot();

        let report = self
            .environment
            .run(&self.model, &mut self.state, session_number, &mut self.rng);

        let inputs = SessionInputs {
            session_number,
            difficulty: self.config.difficulty,
            profile_summary,
            agenda: &self.agenda,
            goals: &self.goals,
            strategy_catalog: &self.strategies,
        };
        let outcome = self
            .session
            .run(
                &inputs,
                &self.model,
                &mut self.state,
                self.collaborators.patient.as_ref(),
                self.collaborators.therapist.as_ref(),
                &mut self.rng,
            )
            .await;

        let prior = self.state.snapshot();
        self.model.consolidate_after_session(&mut self.state);

        let (rubric_scores, rubric_outcome) = self.score_session(&outcome.transcript, &prior).await;

        SessionRecord {
            session_number,
            session_goal: self.goals.for_session(session_number).cloned(),
            initial_state,
            final_state: self.state.snapshot(),
            stressors_applied: report.applied,
            stressors_expired: report.expired,
            lapse_check: report.lapse_check,
            transcript: outcome.transcript,
            strategies_used: outcome.strategies_used,
            strategy_usage: outcome.strategy_usage,
            turns_taken: outcome.turns_taken,
            end_reason: outcome.end_reason,
            turn_updates: outcome.turn_updates,
            rubric_scores,
            rubric_outcome,
            patient_summary: outcome.patient_summary,
        }
    }

    /// Score the session and apply the delta. Skipped when the model has no
    /// rubric rules, no scorer is wired, or the scorer fails.
    async fn score_session(
        &mut self,
        transcript: &[TranscriptEntry],
        prior: &StateSnapshot,
    ) -> (Option<RubricScores>, Option<RubricOutcome>) {
        if self.model.config().rubric.is_none() {
            return (None, None);
        }
        let Some(scorer) = self.collaborators.scorer.as_ref() else {
            return (None, None);
        };
        let scores = match scorer.score(transcript, prior).await {
            Ok(scores) => scores,
            Err(err) => {
                log::warn!("Rubric scoring failed ({}); skipping rubric update", err);
                return (None, None);
            }
        };
        let delta_motivation = scores.motivation.clamped() as f64 - self.state.motivation();
        let delta_confidence = scores.confidence.clamped() as f64 - self.state.self_efficacy();
        let outcome = self
            .model
            .apply_rubric_delta(&mut self.state, delta_motivation, delta_confidence);
        log::debug!(
            "Rubric motivation {} confidence {} applied",
            scores.motivation.clamped(),
            scores.confidence.clamped()
        );
        (Some(scores), Some(outcome))
    }
}

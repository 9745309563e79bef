//! Drives one session: alternating patient and therapist turns until the
//! patient signals resolution or the turn budget runs out.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{Difficulty, DEFAULT_MAX_TURNS};
use crate::dialogue::{DialogueAgent, Role, TranscriptEntry, TurnContext};
use crate::patient::{PatientState, PatientStateModel, TurnUpdate};
use crate::strategies::{SessionAgenda, SessionGoals, StrategyCatalog, StrategyClassification};

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Resolved,
    TurnBudgetExhausted,
}

/// Fixed inputs shared by every turn of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionInputs<'a> {
    pub session_number: u32,
    pub difficulty: Difficulty,
    pub profile_summary: &'a str,
    pub agenda: &'a SessionAgenda,
    pub goals: &'a SessionGoals,
    pub strategy_catalog: &'a StrategyCatalog,
}

/// What a session produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub transcript: Vec<TranscriptEntry>,
    pub turns_taken: usize,
    pub end_reason: EndReason,
    /// Strategy ids in the order the therapist used them.
    pub strategies_used: Vec<String>,
    pub strategy_usage: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turn_updates: Vec<TurnUpdate>,
    /// Last summary the patient agent gave of itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_summary: Option<String>,
}

/// Turn-taking policy for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSimulator {
    max_turns: usize,
    first_speaker: Role,
}

impl Default for SessionSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS, Role::Therapist)
    }
}

impl SessionSimulator {
    /// Create a simulator with the given turn budget and opening speaker.
    pub fn new(max_turns: usize, first_speaker: Role) -> Self {
        Self {
            max_turns,
            first_speaker,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn first_speaker(&self) -> Role {
        self.first_speaker
    }

    /// Run one session against `state`.
    ///
    /// After every turn the session ends if the patient reported resolution
    /// or `turn_index` reached `max_turns`. A failed agent call is recorded
    /// as a placeholder turn and still counts. When the model has turn
    /// dynamics they run after each therapist turn, before the patient
    /// answers.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        inputs: &SessionInputs<'_>,
        model: &PatientStateModel,
        state: &mut PatientState,
        patient: &dyn DialogueAgent,
        therapist: &dyn DialogueAgent,
        rng: &mut R,
    ) -> SessionOutcome {
        let session_goal = inputs.goals.for_session(inputs.session_number);
        let mut transcript: Vec<TranscriptEntry> = Vec::new();
        let mut strategies_used = Vec::new();
        let mut strategy_usage: BTreeMap<String, usize> = BTreeMap::new();
        let mut turn_updates = Vec::new();
        let mut patient_summary = None;

        let mut turn_index = 0;
        let mut speaker = self.first_speaker;
        let mut previous_speaker: Option<Role> = None;
        let mut last_classification: Option<StrategyClassification> = None;

        log::info!(
            "Session {} started ({} speaks first, budget {} turns)",
            inputs.session_number,
            speaker,
            self.max_turns
        );

        let end_reason = loop {
            let mut action = None;
            if speaker == Role::Patient && previous_speaker == Some(Role::Therapist) {
                if let Some(update) = model.state_update(state, last_classification, rng) {
                    action = Some(update.action);
                    turn_updates.push(update);
                }
            }

            let state_summary = state.summary();
            let result = {
                let ctx = TurnContext {
                    session_number: inputs.session_number,
                    turn_index,
                    max_turns: self.max_turns,
                    difficulty: inputs.difficulty,
                    profile_summary: inputs.profile_summary,
                    state_summary: &state_summary,
                    recent_lapse: state.lapse_flag(),
                    transcript: &transcript,
                    agenda_phase: inputs.agenda.phase_for(inputs.session_number, turn_index),
                    session_goal,
                    strategy_catalog: inputs.strategy_catalog,
                    strategy_usage: &strategy_usage,
                };
                match speaker {
                    Role::Patient => patient.take_turn(&ctx).await,
                    Role::Therapist => therapist.take_turn(&ctx).await,
                }
            };

            let mut resolved = false;
            match result {
                Ok(reply) => {
                    let mut entry = TranscriptEntry::new(speaker, reply.reply);
                    match speaker {
                        Role::Patient => {
                            resolved = reply.resolution_status.unwrap_or_else(|| {
                                log::debug!("Patient turn {} gave no resolution status", turn_index);
                                false
                            });
                            entry.action = action;
                            if reply.summary.is_some() {
                                patient_summary = reply.summary;
                            }
                        }
                        Role::Therapist => {
                            last_classification = reply.strategy_classification;
                            entry.strategy_classification = reply.strategy_classification;
                            for id in &reply.strategy_ids {
                                if !inputs.strategy_catalog.contains(id) {
                                    log::warn!("Therapist used unknown strategy id {:?}", id);
                                }
                                *strategy_usage.entry(id.clone()).or_insert(0) += 1;
                                strategies_used.push(id.clone());
                            }
                            entry.strategy_ids = reply.strategy_ids;
                        }
                    }
                    transcript.push(entry);
                }
                Err(err) => {
                    log::warn!(
                        "Session {} turn {}: {} agent failed: {}",
                        inputs.session_number,
                        turn_index,
                        speaker,
                        err
                    );
                    if speaker == Role::Therapist {
                        last_classification = None;
                    }
                    let mut entry = TranscriptEntry::placeholder(speaker, &err);
                    entry.action = action;
                    transcript.push(entry);
                }
            }

            turn_index += 1;
            if resolved {
                break EndReason::Resolved;
            }
            if turn_index >= self.max_turns {
                break EndReason::TurnBudgetExhausted;
            }
            previous_speaker = Some(speaker);
            speaker = speaker.other();
        };

        log::info!(
            "Session {} ended after {} turns ({:?})",
            inputs.session_number,
            turn_index,
            end_reason
        );

        SessionOutcome {
            transcript,
            turns_taken: turn_index,
            end_reason,
            strategies_used,
            strategy_usage,
            turn_updates,
            patient_summary,
        }
    }
}

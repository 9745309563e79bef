//! Dialogue collaborators.
//!
//! The simulator never reads dialogue text. It hands a [`TurnContext`] to
//! a [`DialogueAgent`] and reads back the typed fields of [`AgentReply`]:
//! the reply itself, the patient's resolution signal and the therapist's
//! strategy classification. Profile summarization and rubric scoring sit
//! behind their own traits. Any of these can be backed by a language model;
//! [`scripted`] provides offline implementations.

pub mod scripted;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Difficulty;
use crate::patient::{ActionOutcome, StateSnapshot};
use crate::strategies::{AgendaPhase, SessionGoal, StrategyCatalog, StrategyClassification};

pub use scripted::{ExcerptSummarizer, HeuristicRubricScorer, ScriptedPatient, ScriptedTherapist};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of an external collaborator. The simulator recovers from every
/// variant locally.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("malformed collaborator response: {message}")]
    Malformed { message: String },

    #[error("collaborator returned an empty response")]
    EmptyResponse,

    #[error("collaborator call timed out")]
    Timeout,
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Therapist,
}

impl Role {
    /// The speaker who answers this role.
    pub fn other(self) -> Self {
        match self {
            Self::Patient => Self::Therapist,
            Self::Therapist => Self::Patient,
        }
    }

    /// Lower-case role name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Therapist => "therapist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_classification: Option<StrategyClassification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategy_ids: Vec<String>,
    /// Cope/urge outcome of the turn update that preceded this patient turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionOutcome>,
    /// The collaborator call failed and `content` is a placeholder.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl TranscriptEntry {
    /// A successful turn with plain content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            strategy_classification: None,
            strategy_ids: Vec::new(),
            action: None,
            failed: false,
        }
    }

    /// Placeholder recorded when the collaborator for `role` failed.
    pub fn placeholder(role: Role, error: &AgentError) -> Self {
        Self {
            failed: true,
            ..Self::new(role, format!("[{} turn unavailable: {}]", role, error))
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator contract
// ---------------------------------------------------------------------------

/// Everything an agent sees when asked for a turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    pub session_number: u32,
    pub turn_index: usize,
    pub max_turns: usize,
    pub difficulty: Difficulty,
    pub profile_summary: &'a str,
    /// Rendered [`crate::patient::PatientState::summary`].
    pub state_summary: &'a str,
    pub recent_lapse: bool,
    pub transcript: &'a [TranscriptEntry],
    pub agenda_phase: &'a AgendaPhase,
    pub session_goal: Option<&'a SessionGoal>,
    pub strategy_catalog: &'a StrategyCatalog,
    /// How often each strategy id has been used this session.
    pub strategy_usage: &'a BTreeMap<String, usize>,
}

impl TurnContext<'_> {
    /// Most recent transcript entry spoken by `role`.
    pub fn last_entry(&self, role: Role) -> Option<&TranscriptEntry> {
        self.transcript.iter().rev().find(|entry| entry.role == role)
    }
}

/// Typed fields read back from a dialogue turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub reply: String,
    /// Patient only. `None` reads as "not resolved".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_status: Option<bool>,
    /// Therapist only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_classification: Option<StrategyClassification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategy_ids: Vec<String>,
    /// Patient's own compact read of their state, passed through opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AgentReply {
    /// Reply with no structured fields.
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }
}

/// Produces one side of the conversation.
#[async_trait]
pub trait DialogueAgent: Send + Sync + fmt::Debug {
    fn role(&self) -> Role;

    async fn take_turn(&self, ctx: &TurnContext<'_>) -> Result<AgentReply, AgentError>;
}

/// Condenses a free-text patient history once per run.
#[async_trait]
pub trait ProfileSummarizer: Send + Sync + fmt::Debug {
    async fn summarize(&self, profile: &str) -> Result<String, AgentError>;
}

/// One scored rubric item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricItem {
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl RubricItem {
    /// Item with an empty rationale.
    pub fn new(score: i64) -> Self {
        Self {
            score,
            rationale: None,
        }
    }

    /// Score forced into 1..=5.
    pub fn clamped(&self) -> i64 {
        self.score.clamp(RUBRIC_MIN, RUBRIC_MAX)
    }
}

pub const RUBRIC_MIN: i64 = 1;
pub const RUBRIC_MAX: i64 = 5;

/// Post-session motivation and confidence scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricScores {
    pub motivation: RubricItem,
    pub confidence: RubricItem,
}

/// Scores a finished session against the prior state.
#[async_trait]
pub trait RubricScorer: Send + Sync + fmt::Debug {
    async fn score(
        &self,
        transcript: &[TranscriptEntry],
        prior: &StateSnapshot,
    ) -> Result<RubricScores, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rubric_item_clamps() {
        assert_eq!(RubricItem::new(9).clamped(), 5);
        assert_eq!(RubricItem::new(-3).clamped(), 1);
        assert_eq!(RubricItem::new(3).clamped(), 3);
    }

    #[test]
    fn test_rubric_scores_parse_nested_shape() {
        let scores: RubricScores = serde_json::from_str(
            r#"{"motivation": {"score": 4, "rationale": "change talk"}, "confidence": {"score": 2}}"#,
        )
        .unwrap();
        assert_eq!(scores.motivation.score, 4);
        assert_eq!(scores.confidence.rationale, None);
    }

    #[test]
    fn test_reply_without_resolution_parses() {
        let reply: AgentReply = serde_json::from_str(r#"{"reply": "hi"}"#).unwrap();
        assert_eq!(reply.resolution_status, None);
        assert_eq!(reply.strategy_classification, None);
    }

    #[test]
    fn test_unknown_classification_in_reply_is_other() {
        let reply: AgentReply =
            serde_json::from_str(r#"{"reply": "hi", "strategy_classification": "Humor"}"#).unwrap();
        assert_eq!(reply.strategy_classification, Some(StrategyClassification::Other));
    }

    #[test]
    fn test_placeholder_entry_is_marked() {
        let entry = TranscriptEntry::placeholder(Role::Therapist, &AgentError::Timeout);
        assert!(entry.failed);
        assert!(entry.content.contains("therapist"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["failed"], true);
        let ok = serde_json::to_value(TranscriptEntry::new(Role::Patient, "x")).unwrap();
        assert!(ok.get("failed").is_none());
    }

    #[test]
    fn test_role_alternates() {
        assert_eq!(Role::Patient.other(), Role::Therapist);
        assert_eq!(Role::Therapist.other().other(), Role::Therapist);
    }
}

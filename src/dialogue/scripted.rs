//! Offline collaborators.
//!
//! Deterministic stand-ins for the language-model agents, so a full run can
//! be driven (and tested) without a network. Their output depends only on
//! the [`TurnContext`] they are handed.

use async_trait::async_trait;

use crate::config::Difficulty;
use crate::patient::StateSnapshot;
use crate::strategies::StrategyClassification;

use super::{
    AgentError, AgentReply, DialogueAgent, ProfileSummarizer, RubricItem, RubricScorer,
    RubricScores, Role, TranscriptEntry, TurnContext,
};

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

const EASY_LINES: &[&str] = &[
    "That makes sense. I could try writing down when the urges hit.",
    "I hadn't thought about it that way, but you're right.",
    "I want to stay on track. What should I do when my friends call?",
    "I think I can manage a walk after work instead of stopping at the bar.",
];

const MEDIUM_LINES: &[&str] = &[
    "Maybe. Some of that sounds useful, but I'm not sure about the rest.",
    "I get what you're saying, I just don't know if it works for me.",
    "I tried something like that before and it only helped a little.",
    "Part of me wants to change and part of me just wants a break.",
];

const HARD_LINES: &[&str] = &[
    "I don't see how talking about it changes anything.",
    "Everyone says that. It's easy when you're not the one living it.",
    "Honestly, a drink is the only thing that takes the edge off.",
    "I've heard all this before. It didn't work then either.",
];

const LAPSE_LINE: &str = "I slipped again this week. I'm not proud of it.";

const CLOSING_LINE: &str =
    "I think we've covered everything for today. I'll try the plan. See you next time.";

/// Rule-based patient. Resolves once the session has run long enough for
/// the configured difficulty, later after a recent lapse.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPatient {
    /// Overrides the difficulty-based resolution turn.
    pub resolve_after: Option<usize>,
}

impl ScriptedPatient {
    /// Patient that resolves at the difficulty's default turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Patient that resolves after a fixed number of its own turns.
    pub fn resolving_after(turns: usize) -> Self {
        Self {
            resolve_after: Some(turns),
        }
    }

    fn resolution_turn(&self, ctx: &TurnContext<'_>) -> usize {
        let base = self.resolve_after.unwrap_or(match ctx.difficulty {
            Difficulty::Easy => 12,
            Difficulty::Medium => 24,
            Difficulty::Hard => 40,
        });
        if ctx.recent_lapse {
            base + 10
        } else {
            base
        }
    }
}

#[async_trait]
impl DialogueAgent for ScriptedPatient {
    fn role(&self) -> Role {
        Role::Patient
    }

    async fn take_turn(&self, ctx: &TurnContext<'_>) -> Result<AgentReply, AgentError> {
        let resolved = ctx.turn_index >= self.resolution_turn(ctx);
        let reply = if resolved {
            CLOSING_LINE.to_string()
        } else if ctx.recent_lapse && ctx.last_entry(Role::Patient).is_none() {
            LAPSE_LINE.to_string()
        } else {
            let lines = match ctx.difficulty {
                Difficulty::Easy => EASY_LINES,
                Difficulty::Medium => MEDIUM_LINES,
                Difficulty::Hard => HARD_LINES,
            };
            let idx = (ctx.turn_index / 2 + ctx.session_number as usize) % lines.len();
            lines[idx].to_string()
        };
        Ok(AgentReply {
            reply,
            resolution_status: Some(resolved),
            ..AgentReply::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Therapist
// ---------------------------------------------------------------------------

const CLASSIFICATION_CYCLE: [StrategyClassification; 4] = [
    StrategyClassification::MiReflection,
    StrategyClassification::Validation,
    StrategyClassification::MiReflection,
    StrategyClassification::DirectiveAdvice,
];

/// Rule-based therapist. Follows the agenda phase, preferring the least
/// used of the recommended strategies.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTherapist;

impl ScriptedTherapist {
    /// Therapist starting at the head of the classification cycle.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DialogueAgent for ScriptedTherapist {
    fn role(&self) -> Role {
        Role::Therapist
    }

    async fn take_turn(&self, ctx: &TurnContext<'_>) -> Result<AgentReply, AgentError> {
        let strategy_id = ctx
            .agenda_phase
            .strategies
            .iter()
            .min_by_key(|id| ctx.strategy_usage.get(id.as_str()).copied().unwrap_or(0))
            .cloned();
        let strategy_name = strategy_id
            .as_deref()
            .and_then(|id| ctx.strategy_catalog.get(id))
            .map(|s| s.name.as_str())
            .unwrap_or("a quick check-in");

        let therapist_turns = ctx
            .transcript
            .iter()
            .filter(|e| e.role == Role::Therapist)
            .count();
        let classification = CLASSIFICATION_CYCLE[therapist_turns % CLASSIFICATION_CYCLE.len()];

        let reply = if therapist_turns == 0 {
            let focus = ctx
                .session_goal
                .map(|goal| goal.cbt_stage_goal.as_str())
                .unwrap_or("checking in on how things have been");
            format!(
                "Welcome back. Today I'd like us to focus on: {} Let's start with {}.",
                focus, strategy_name
            )
        } else {
            let opener = match classification {
                StrategyClassification::MiReflection => "It sounds like part of you wants things to be different.",
                StrategyClassification::Validation => "That makes sense given everything you're carrying.",
                StrategyClassification::DirectiveAdvice => "Here's something concrete to try this week.",
                _ => "Let's keep going.",
            };
            format!("{} Let's work on {}.", opener, strategy_name)
        };

        Ok(AgentReply {
            reply,
            strategy_classification: Some(classification),
            strategy_ids: strategy_id.into_iter().collect(),
            ..AgentReply::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Profile summarizer
// ---------------------------------------------------------------------------

/// Keeps the first few sentences of the profile.
#[derive(Debug, Clone)]
pub struct ExcerptSummarizer {
    pub max_sentences: usize,
}

impl Default for ExcerptSummarizer {
    fn default() -> Self {
        Self { max_sentences: 3 }
    }
}

#[async_trait]
impl ProfileSummarizer for ExcerptSummarizer {
    async fn summarize(&self, profile: &str) -> Result<String, AgentError> {
        let sentences: Vec<&str> = profile
            .split_inclusive(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(self.max_sentences)
            .collect();
        if sentences.is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        Ok(sentences.join(" "))
    }
}

// ---------------------------------------------------------------------------
// Rubric scorer
// ---------------------------------------------------------------------------

/// Scores from the prior state nudged by the classifications seen in the
/// transcript.
#[derive(Debug, Clone, Default)]
pub struct HeuristicRubricScorer;

#[async_trait]
impl RubricScorer for HeuristicRubricScorer {
    async fn score(
        &self,
        transcript: &[TranscriptEntry],
        prior: &StateSnapshot,
    ) -> Result<RubricScores, AgentError> {
        let count = |wanted: StrategyClassification| {
            transcript
                .iter()
                .filter(|e| e.strategy_classification == Some(wanted))
                .count()
        };
        let reflections = count(StrategyClassification::MiReflection);
        let confrontations = count(StrategyClassification::Confrontational);
        let supportive = count(StrategyClassification::Validation)
            + count(StrategyClassification::DirectiveAdvice);

        let mut motivation = prior.motivation.round() as i64;
        if reflections >= 2 {
            motivation += 1;
        }
        if confrontations > reflections {
            motivation -= 1;
        }

        let mut confidence = prior.self_efficacy.round() as i64;
        if supportive >= 2 {
            confidence += 1;
        }
        if prior.lapse_flag {
            confidence -= 1;
        }

        Ok(RubricScores {
            motivation: RubricItem {
                score: motivation,
                rationale: Some(format!("{} reflective turn(s)", reflections)),
            },
            confidence: RubricItem {
                score: confidence,
                rationale: Some(format!("{} supportive turn(s)", supportive)),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::patient::{ModelVariant, PatientStateModel};
    use crate::strategies::{SessionAgenda, SessionGoals, StrategyCatalog};

    struct Fixture {
        agenda: SessionAgenda,
        goals: SessionGoals,
        catalog: StrategyCatalog,
        usage: BTreeMap<String, usize>,
        transcript: Vec<TranscriptEntry>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                agenda: SessionAgenda::builtin(),
                goals: SessionGoals::builtin(),
                catalog: StrategyCatalog::builtin(),
                usage: BTreeMap::new(),
                transcript: Vec::new(),
            }
        }

        fn ctx(&self, turn_index: usize, difficulty: Difficulty, recent_lapse: bool) -> TurnContext<'_> {
            TurnContext {
                session_number: 1,
                turn_index,
                max_turns: 60,
                difficulty,
                profile_summary: "",
                state_summary: "",
                recent_lapse,
                transcript: &self.transcript,
                agenda_phase: self.agenda.phase_for(1, turn_index),
                session_goal: self.goals.for_session(1),
                strategy_catalog: &self.catalog,
                strategy_usage: &self.usage,
            }
        }
    }

    #[tokio::test]
    async fn test_patient_resolves_by_difficulty() {
        let fixture = Fixture::new();
        let patient = ScriptedPatient::new();
        let early = patient.take_turn(&fixture.ctx(5, Difficulty::Easy, false)).await.unwrap();
        assert_eq!(early.resolution_status, Some(false));
        let late = patient.take_turn(&fixture.ctx(12, Difficulty::Easy, false)).await.unwrap();
        assert_eq!(late.resolution_status, Some(true));
        let lapsed = patient.take_turn(&fixture.ctx(12, Difficulty::Easy, true)).await.unwrap();
        assert_eq!(lapsed.resolution_status, Some(false));
    }

    #[tokio::test]
    async fn test_therapist_prefers_least_used_strategy() {
        let mut fixture = Fixture::new();
        fixture.usage.insert("mi_agenda".into(), 2);
        fixture.usage.insert("mi_values".into(), 1);
        let therapist = ScriptedTherapist::new();
        let reply = therapist.take_turn(&fixture.ctx(0, Difficulty::Hard, false)).await.unwrap();
        assert_eq!(reply.strategy_ids, vec!["mi_scales".to_string()]);
        assert_eq!(reply.strategy_classification, Some(StrategyClassification::MiReflection));
        assert!(reply.reply.contains("Build trust"));
    }

    #[tokio::test]
    async fn test_therapist_cycles_classifications() {
        let mut fixture = Fixture::new();
        fixture.transcript.push(TranscriptEntry::new(Role::Therapist, "hello"));
        fixture.transcript.push(TranscriptEntry::new(Role::Patient, "hi"));
        let reply = ScriptedTherapist
            .take_turn(&fixture.ctx(2, Difficulty::Hard, false))
            .await
            .unwrap();
        assert_eq!(reply.strategy_classification, Some(StrategyClassification::Validation));
    }

    #[tokio::test]
    async fn test_summarizer_keeps_leading_sentences() {
        let summarizer = ExcerptSummarizer { max_sentences: 2 };
        let summary = summarizer
            .summarize("Drinks daily. Lost a job last year. Lives alone.")
            .await
            .unwrap();
        assert_eq!(summary, "Drinks daily. Lost a job last year.");
        assert!(summarizer.summarize("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_heuristic_scores_follow_transcript() {
        let model = PatientStateModel::from_variant(ModelVariant::Rubric);
        let prior = model.initial_state().snapshot();
        let mut transcript = Vec::new();
        for classification in [
            StrategyClassification::MiReflection,
            StrategyClassification::MiReflection,
            StrategyClassification::Validation,
        ] {
            let mut entry = TranscriptEntry::new(Role::Therapist, "...");
            entry.strategy_classification = Some(classification);
            transcript.push(entry);
        }
        let scores = HeuristicRubricScorer.score(&transcript, &prior).await.unwrap();
        assert_eq!(scores.motivation.score, 4);
        assert_eq!(scores.confidence.score, 3);
    }
}

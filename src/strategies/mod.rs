//! Therapeutic strategies: the catalog of named techniques, and the coarse
//! classification of a therapist turn that feeds back into patient state.

pub mod agenda;

use std::fmt;

use serde::{Deserialize, Serialize};

use StrategyFamily::{ActionableTool, CognitiveBehavioral, MotivationalInterviewing};

pub use agenda::{AgendaPhase, SessionAgenda, SessionGoal, SessionGoals};

// ---------------------------------------------------------------------------
// Turn classification
// ---------------------------------------------------------------------------

/// Style label attached to a therapist turn.
///
/// Unrecognized labels parse to [`StrategyClassification::Other`], which has
/// no effect on patient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StrategyClassification {
    MiReflection,
    Validation,
    DirectiveAdvice,
    Confrontational,
    Other,
}

impl StrategyClassification {
    pub const ALL: [StrategyClassification; 5] = [
        Self::MiReflection,
        Self::Validation,
        Self::DirectiveAdvice,
        Self::Confrontational,
        Self::Other,
    ];

    /// Label used in transcripts and by dialogue agents.
    pub fn label(self) -> &'static str {
        match self {
            Self::MiReflection => "MI-style reflection",
            Self::Validation => "Validation",
            Self::DirectiveAdvice => "Directive advice",
            Self::Confrontational => "Confrontational style",
            Self::Other => "Other",
        }
    }

    /// Parse a label; anything unrecognized becomes [`StrategyClassification::Other`].
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
            .unwrap_or(Self::Other)
    }
}

impl From<String> for StrategyClassification {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<StrategyClassification> for String {
    fn from(classification: StrategyClassification) -> Self {
        classification.label().to_string()
    }
}

impl fmt::Display for StrategyClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Strategy catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyFamily {
    MotivationalInterviewing,
    CognitiveBehavioral,
    ActionableTool,
}

/// A named technique the therapist can draw on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub family: StrategyFamily,
}

const CATALOG: &[(&str, &str, StrategyFamily)] = &[
    ("mi_scales", "importance / confidence / readiness scale (0–10)", MotivationalInterviewing),
    ("mi_ep_e", "Elicit–Provide–Elicit", MotivationalInterviewing),
    ("mi_decisional_balance", "decisional balance", MotivationalInterviewing),
    ("mi_values", "values clarification", MotivationalInterviewing),
    ("mi_agenda", "agenda mapping", MotivationalInterviewing),
    ("cbt_functional_analysis", "functional analysis of a recent episode", CognitiveBehavioral),
    ("cbt_trigger_mapping", "trigger mapping", CognitiveBehavioral),
    ("cbt_reappraisal", "cognitive reappraisal of urges", CognitiveBehavioral),
    ("cbt_coping_skills", "coping-skill rehearsal for cravings", CognitiveBehavioral),
    ("cbt_refusal", "refusal-skills scripting", CognitiveBehavioral),
    ("cbt_stimulus_control", "stimulus control", CognitiveBehavioral),
    ("cbt_exposure", "graded exposure / urge-surfing", CognitiveBehavioral),
    ("cbt_problem_solving", "problem-solving for barriers", CognitiveBehavioral),
    ("cbt_behavioral_activation", "Behavioral activation (small tasks)", CognitiveBehavioral),
    ("cbt_goal_setting", "Goal setting and strength review", CognitiveBehavioral),
    ("act_hobbies", "explore specific hobbies or interests", ActionableTool),
    ("act_routine", "structured daily routine", ActionableTool),
    ("act_grounding", "grounding techniques", ActionableTool),
    ("act_support_group", "join support group or community", ActionableTool),
    ("act_psychoeducation", "psychoeducation on brain/emotions", ActionableTool),
    ("act_emotional_triggers", "identify emotional triggers", ActionableTool),
    ("act_assertive_comm", "assertive communication techniques", ActionableTool),
    ("act_journaling", "journal thoughts and emotions", ActionableTool),
    ("act_relaxation", "relaxation techniques", ActionableTool),
    ("act_goals", "short-term and long-term goals", ActionableTool),
    ("act_mindfulness", "mindfulness-based activities", ActionableTool),
    ("act_strengths", "reinforce personal strengths", ActionableTool),
    ("act_health", "nutrition, sleep, and exercise education", ActionableTool),
    ("act_crisis_plan", "develop a crisis plan", ActionableTool),
    ("act_vision_board", "vision board of positive outcomes", ActionableTool),
    ("act_gratitude", "gratitude journaling", ActionableTool),
    ("act_complementary_therapy", "complementary therapies resources", ActionableTool),
    ("act_community", "contribute to community", ActionableTool),
];

/// Immutable strategy catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyCatalog {
    strategies: Vec<Strategy>,
}

impl StrategyCatalog {
    /// The bundled MI, CBT and tool strategies.
    pub fn builtin() -> Self {
        Self {
            strategies: CATALOG
                .iter()
                .map(|&(id, name, family)| Strategy {
                    id: id.to_string(),
                    name: name.to_string(),
                    family,
                })
                .collect(),
        }
    }

    /// Look up a strategy by id.
    pub fn get(&self, id: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn family(&self, family: StrategyFamily) -> impl Iterator<Item = &Strategy> {
        self.strategies.iter().filter(move |s| s.family == family)
    }

    pub fn all(&self) -> &[Strategy] {
        &self.strategies
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

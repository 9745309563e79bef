//! Per-session goals and the turn-indexed agenda that recommends strategies
//! to the therapist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stage goal for one session of the six-session programme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGoal {
    pub cbt_stage_goal: String,
    pub mi_focus: String,
}

const GOALS: &[(&str, &str)] = &[
    (
        "Build trust, assessment, set safety/limits.",
        "Engage: Use 0-10 importance/confidence rulers; start trigger/urge log.",
    ),
    (
        "Identifying negative cognitions.",
        "Focus: Review log; use values/agenda mapping to map thought → feeling → body → action.",
    ),
    (
        "Challenging false beliefs.",
        "Evoke: Elicit change talk (DARN) using double-sided reflections; challenge the core thought (e.g., 'one time won't hurt').",
    ),
    (
        "Restructuring cognitive patterns.",
        "Bridge Evoke → Plan: Formulate an If-Then plan; move change talk to CAT (Commitment, Activation, Taking steps).",
    ),
    (
        "Behavioral skill building.",
        "Plan: Redesign a high-risk window; create a crisis micro-plan and plan for barriers.",
    ),
    (
        "Consolidation & termination.",
        "Maintenance: Review gains; extend the plan for relapse prevention and peer support.",
    ),
];

/// Goals keyed by 1-based session number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGoals {
    goals: BTreeMap<u32, SessionGoal>,
}

impl SessionGoals {
    /// The six-session programme goals.
    pub fn builtin() -> Self {
        let goals = GOALS
            .iter()
            .zip(1u32..)
            .map(|(&(stage, focus), session)| {
                (
                    session,
                    SessionGoal {
                        cbt_stage_goal: stage.to_string(),
                        mi_focus: focus.to_string(),
                    },
                )
            })
            .collect();
        Self { goals }
    }

    /// Goal for a 1-based session number, if the programme plans one.
    pub fn for_session(&self, session_number: u32) -> Option<&SessionGoal> {
        self.goals.get(&session_number)
    }
}

impl Default for SessionGoals {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Agenda
// ---------------------------------------------------------------------------

/// A named stretch of a session with its recommended strategy ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaPhase {
    pub name: String,
    /// Inclusive turn-index bounds.
    pub first_turn: usize,
    pub last_turn: usize,
    pub strategies: Vec<String>,
}

impl AgendaPhase {
    fn new(name: &str, first_turn: usize, last_turn: usize, strategies: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            first_turn,
            last_turn,
            strategies: strategies.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether `turn_index` falls inside this phase.
    pub fn covers(&self, turn_index: usize) -> bool {
        (self.first_turn..=self.last_turn).contains(&turn_index)
    }
}

type PhaseRow = (&'static str, &'static [&'static str]);

/// Three phases per session: turns 0–20, 21–40, 41–60.
const AGENDA: &[[PhaseRow; 3]] = &[
    [
        ("Rapport & Goal Alignment", &["mi_agenda", "mi_values", "mi_scales"]),
        ("Episode Clarification", &["cbt_functional_analysis", "cbt_trigger_mapping"]),
        ("Closing & Micro-Commitment", &["cbt_coping_skills", "cbt_goal_setting", "act_crisis_plan"]),
    ],
    [
        ("Check-in & Review", &["mi_scales", "cbt_functional_analysis"]),
        ("Identifying Negative Cognitions", &["cbt_trigger_mapping", "cbt_reappraisal"]),
        ("Closing & Micro-Commitment", &["cbt_coping_skills", "act_journaling"]),
    ],
    [
        ("Check-in & Review", &["mi_decisional_balance", "cbt_problem_solving"]),
        ("Challenging False Beliefs", &["cbt_reappraisal", "mi_ep_e"]),
        ("Closing & Micro-Commitment", &["cbt_refusal", "act_assertive_comm"]),
    ],
    [
        ("Check-in & Review", &["mi_scales", "cbt_functional_analysis"]),
        ("Restructuring Cognitive Patterns", &["cbt_coping_skills", "cbt_stimulus_control"]),
        ("Closing & Micro-Commitment", &["act_routine", "act_hobbies"]),
    ],
    [
        ("Check-in & Review", &["mi_values", "cbt_problem_solving"]),
        ("Behavioral Skill Building", &["cbt_behavioral_activation", "cbt_exposure"]),
        ("Closing & Micro-Commitment", &["act_support_group", "act_community"]),
    ],
    [
        ("Review & Consolidate", &["cbt_goal_setting", "act_strengths"]),
        ("Relapse Prevention & Future Planning", &["act_crisis_plan", "act_health"]),
        ("Closing & Termination", &["act_goals", "act_complementary_therapy"]),
    ],
];

const PHASE_BOUNDS: [(usize, usize); 3] = [(0, 20), (21, 40), (41, 60)];

/// Maps (session, turn index) to the current agenda phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAgenda {
    sessions: BTreeMap<u32, Vec<AgendaPhase>>,
    fallback: AgendaPhase,
}

impl SessionAgenda {
    /// The bundled per-session agenda.
    pub fn builtin() -> Self {
        let sessions = AGENDA
            .iter()
            .zip(1u32..)
            .map(|(rows, session)| {
                let phases = rows
                    .iter()
                    .zip(PHASE_BOUNDS)
                    .map(|(&(name, strategies), (first, last))| {
                        AgendaPhase::new(name, first, last, strategies)
                    })
                    .collect();
                (session, phases)
            })
            .collect();
        Self {
            sessions,
            fallback: AgendaPhase::new(
                "Default",
                0,
                usize::MAX,
                &["mi_scales", "cbt_functional_analysis"],
            ),
        }
    }

    /// Phase covering `turn_index` in `session_number`, or the default phase
    /// when the session has no agenda or the turn runs past it.
    pub fn phase_for(&self, session_number: u32, turn_index: usize) -> &AgendaPhase {
        self.sessions
            .get(&session_number)
            .and_then(|phases| phases.iter().find(|p| p.covers(turn_index)))
            .unwrap_or(&self.fallback)
    }
}

impl Default for SessionAgenda {
    fn default() -> Self {
        Self::builtin()
    }
}

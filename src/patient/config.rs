//! Parameters of the patient-state model.
//!
//! There is one update engine ([`super::PatientStateModel`]); the simple,
//! rubric-scored and rich behaviours are all instances of [`ModelConfig`].
//! The presets below carry the constants each variant runs with, and any
//! of them can be overridden wholesale from YAML.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::strategies::StrategyClassification;
use crate::stressors::StressorCategory;

use super::state::{AffectState, FieldRange, InitialValues, StateField, StateScales};

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Named preset of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Six fields on 0–10, ledger cleared every session.
    #[default]
    Simple,
    /// 1–5 motivation/confidence/craving moved by an external rubric score.
    Rubric,
    /// Unit-interval fields with affect and per-turn dynamics.
    Rich,
}

impl ModelVariant {
    /// Lower-case variant name, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Rubric => "rubric",
            Self::Rich => "rich",
        }
    }

    /// The preset [`ModelConfig`] for this variant.
    pub fn preset(self) -> ModelConfig {
        match self {
            Self::Simple => ModelConfig::simple(),
            Self::Rubric => ModelConfig::rubric(),
            Self::Rich => ModelConfig::rich(),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "rubric" => Ok(Self::Rubric),
            "rich" => Ok(Self::Rich),
            other => Err(SimError::invalid_config(format!(
                "unknown model variant {:?} (expected simple, rubric or rich)",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter blocks
// ---------------------------------------------------------------------------

/// A signed adjustment to one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    pub field: StateField,
    pub delta: f64,
}

impl FieldDelta {
    pub const fn new(field: StateField, delta: f64) -> Self {
        Self { field, delta }
    }
}

/// Magnitudes of the logistic lapse predictor.
///
/// Signs are fixed by the model: craving, stress, habit and shame push the
/// probability up, self-efficacy, control and motivation pull it down. All
/// weights must therefore be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapseWeights {
    pub craving: f64,
    pub trigger_salience: f64,
    pub habit_strength: f64,
    pub self_efficacy: f64,
    pub cognitive_control: f64,
    pub motivation: f64,
    #[serde(default)]
    pub shame: f64,
}

impl LapseWeights {
    fn magnitudes(&self) -> [f64; 7] {
        [
            self.craving,
            self.trigger_salience,
            self.habit_strength,
            self.self_efficacy,
            self.cognitive_control,
            self.motivation,
            self.shame,
        ]
    }

    fn is_valid(&self) -> bool {
        self.magnitudes().iter().all(|w| w.is_finite() && *w >= 0.0)
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            craving: self.craving * factor,
            trigger_salience: self.trigger_salience * factor,
            habit_strength: self.habit_strength * factor,
            self_efficacy: self.self_efficacy * factor,
            cognitive_control: self.cognitive_control * factor,
            motivation: self.motivation * factor,
            shame: self.shame * factor,
        }
    }
}

/// What a lapse does to the patient. Magnitudes, applied with fixed signs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapseConsequence {
    pub self_efficacy_drop: f64,
    pub motivation_drop: f64,
    pub habit_gain: f64,
}

/// Fixed gains applied once at the end of every session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Consolidation {
    pub motivation_gain: f64,
    pub self_efficacy_gain: f64,
    pub cognitive_control_gain: f64,
    pub trigger_salience_drop: f64,
}

/// How the stressor ledger is carried across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerPolicy {
    /// Consolidation empties the ledger.
    ClearEachSession,
    /// The ledger persists; the environment step expires entries by their
    /// duration bucket.
    ExpireByDuration,
}

/// Threshold rules applied after a rubric delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubricRules {
    /// Confidence at or above this relieves craving.
    pub relief_confidence_min: f64,
    pub craving_relief: f64,
    /// Confidence at or below this, together with high craving, forces a lapse.
    pub lapse_confidence_max: f64,
    pub lapse_craving_min: f64,
}

impl Default for RubricRules {
    fn default() -> Self {
        Self {
            relief_confidence_min: 4.0,
            craving_relief: 1.0,
            lapse_confidence_max: 2.0,
            lapse_craving_min: 4.0,
        }
    }
}

/// Weights of the per-turn craving recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CravingWeights {
    pub stress: f64,
    pub habit_strength: f64,
    pub cognitive_control: f64,
    pub self_efficacy: f64,
    pub emotional_pain: f64,
}

/// Learning rates after an urge-driven action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgeLearning {
    /// Fraction of the remaining headroom added to habit strength.
    pub habit_rate: f64,
    pub self_efficacy_drop: f64,
    pub shame_gain: f64,
}

/// Learning rates after a coping action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CopeLearning {
    pub habit_drop: f64,
    pub self_efficacy_gain: f64,
    pub cognitive_control_gain: f64,
}

/// Per-turn state update run between a therapist turn and the next
/// patient turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnDynamics {
    /// Stress added per unprocessed stressor.
    pub alpha_stress: f64,
    /// Additional stress per unprocessed stressor.
    pub lambda_decay: f64,
    pub craving_weights: CravingWeights,
    pub urge_weights: LapseWeights,
    pub urge_learning: UrgeLearning,
    pub cope_learning: CopeLearning,
}

impl Default for TurnDynamics {
    fn default() -> Self {
        Self {
            alpha_stress: 0.1,
            lambda_decay: 0.05,
            craving_weights: CravingWeights {
                stress: 0.2,
                habit_strength: 0.3,
                cognitive_control: 0.15,
                self_efficacy: 0.15,
                emotional_pain: 0.2,
            },
            urge_weights: LapseWeights {
                craving: 0.4,
                trigger_salience: 0.3,
                habit_strength: 0.2,
                cognitive_control: 0.1,
                self_efficacy: 0.2,
                motivation: 0.3,
                shame: 0.1,
            },
            urge_learning: UrgeLearning {
                habit_rate: 0.1,
                self_efficacy_drop: 0.05,
                shame_gain: 0.05,
            },
            cope_learning: CopeLearning {
                habit_drop: 0.05,
                self_efficacy_gain: 0.05,
                cognitive_control_gain: 0.05,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Every constant the state model reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub variant: ModelVariant,
    pub scales: StateScales,
    pub initial: InitialValues,
    pub lapse_weights: LapseWeights,
    pub lapse_consequence: LapseConsequence,
    pub consolidation: Consolidation,
    /// Category effect table; categories missing here have no effect.
    #[serde(default)]
    pub stressor_effects: BTreeMap<StressorCategory, Vec<FieldDelta>>,
    pub ledger_policy: LedgerPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric: Option<RubricRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_dynamics: Option<TurnDynamics>,
    /// Effect of a therapist turn's classification, applied by the turn
    /// dynamics.
    #[serde(default)]
    pub strategy_effects: BTreeMap<StrategyClassification, Vec<FieldDelta>>,
}

const TEN_POINT: FieldRange = FieldRange::new(0.0, 10.0);
const FIVE_POINT: FieldRange = FieldRange::new(1.0, 5.0);
const UNIT: FieldRange = FieldRange::new(0.0, 1.0);

const SIMPLE_WEIGHTS: LapseWeights = LapseWeights {
    craving: 0.3,
    trigger_salience: 0.2,
    habit_strength: 0.3,
    self_efficacy: 0.2,
    cognitive_control: 0.1,
    motivation: 0.1,
    shame: 0.0,
};

impl ModelConfig {
    /// Six fields on 0–10 starting at 5; the ledger is cleared each session.
    pub fn simple() -> Self {
        Self {
            variant: ModelVariant::Simple,
            scales: StateScales::uniform(TEN_POINT),
            initial: InitialValues {
                craving: 5.0,
                trigger_salience: 5.0,
                motivation: 5.0,
                self_efficacy: 5.0,
                cognitive_control: 5.0,
                habit_strength: 5.0,
                affect: None,
            },
            lapse_weights: SIMPLE_WEIGHTS,
            lapse_consequence: LapseConsequence {
                self_efficacy_drop: 2.0,
                motivation_drop: 2.0,
                habit_gain: 2.0,
            },
            consolidation: Consolidation {
                motivation_gain: 1.0,
                self_efficacy_gain: 1.0,
                cognitive_control_gain: 1.0,
                trigger_salience_drop: 1.0,
            },
            stressor_effects: category_effects(1.0),
            ledger_policy: LedgerPolicy::ClearEachSession,
            rubric: None,
            turn_dynamics: None,
            strategy_effects: BTreeMap::new(),
        }
    }

    /// Craving, motivation and confidence on 1–5, moved at session end by
    /// an external rubric score instead of fixed consolidation gains.
    pub fn rubric() -> Self {
        let mut scales = StateScales::uniform(TEN_POINT);
        scales.craving = FIVE_POINT;
        scales.motivation = FIVE_POINT;
        scales.self_efficacy = FIVE_POINT;
        Self {
            variant: ModelVariant::Rubric,
            scales,
            initial: InitialValues {
                craving: 3.0,
                trigger_salience: 5.0,
                motivation: 3.0,
                self_efficacy: 3.0,
                cognitive_control: 5.0,
                habit_strength: 5.0,
                affect: None,
            },
            lapse_weights: SIMPLE_WEIGHTS,
            lapse_consequence: LapseConsequence {
                self_efficacy_drop: 1.0,
                motivation_drop: 1.0,
                habit_gain: 2.0,
            },
            consolidation: Consolidation {
                motivation_gain: 0.0,
                self_efficacy_gain: 0.0,
                cognitive_control_gain: 1.0,
                trigger_salience_drop: 1.0,
            },
            stressor_effects: category_effects(1.0),
            ledger_policy: LedgerPolicy::ExpireByDuration,
            rubric: Some(RubricRules::default()),
            turn_dynamics: None,
            strategy_effects: BTreeMap::new(),
        }
    }

    /// Every field on the unit interval, with affect and per-turn dynamics.
    pub fn rich() -> Self {
        Self {
            variant: ModelVariant::Rich,
            scales: StateScales::uniform(UNIT),
            initial: InitialValues {
                craving: 0.6,
                trigger_salience: 0.7,
                motivation: 0.5,
                self_efficacy: 0.4,
                cognitive_control: 0.4,
                habit_strength: 0.7,
                affect: Some(AffectState {
                    emotional_pain: 0.6,
                    shame: 0.5,
                }),
            },
            lapse_weights: SIMPLE_WEIGHTS.scaled(10.0),
            lapse_consequence: LapseConsequence {
                self_efficacy_drop: 0.2,
                motivation_drop: 0.2,
                habit_gain: 0.2,
            },
            consolidation: Consolidation {
                motivation_gain: 0.1,
                self_efficacy_gain: 0.1,
                cognitive_control_gain: 0.1,
                trigger_salience_drop: 0.1,
            },
            stressor_effects: category_effects(0.1),
            ledger_policy: LedgerPolicy::ExpireByDuration,
            rubric: None,
            turn_dynamics: Some(TurnDynamics::default()),
            strategy_effects: strategy_effects(),
        }
    }

    /// Reject parameter sets the engine cannot run with.
    pub fn validate(&self) -> Result<(), SimError> {
        for field in StateField::ALL {
            let range = self.scales.range(field);
            if !range.is_valid() {
                return Err(SimError::invalid_config(format!(
                    "{} range [{}, {}] is inverted or non-finite",
                    field, range.min, range.max
                )));
            }
        }
        if !self.lapse_weights.is_valid() {
            return Err(SimError::invalid_config(
                "lapse weights must be finite and non-negative",
            ));
        }
        if let Some(dynamics) = &self.turn_dynamics {
            if !dynamics.urge_weights.is_valid() {
                return Err(SimError::invalid_config(
                    "urge weights must be finite and non-negative",
                ));
            }
            if self.initial.affect.is_none() {
                log::warn!("Turn dynamics enabled without affect fields; pain and shame read as zero");
            }
        }
        let deltas = self
            .stressor_effects
            .values()
            .chain(self.strategy_effects.values())
            .flatten();
        for delta in deltas {
            if !delta.delta.is_finite() {
                return Err(SimError::invalid_config(format!(
                    "non-finite delta for {}",
                    delta.field
                )));
            }
        }
        Ok(())
    }

    /// Effects for `category`, empty for unknown categories.
    pub fn stressor_effect(&self, category: &StressorCategory) -> &[FieldDelta] {
        self.stressor_effects
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Deltas for a therapist classification; empty when the table has none.
    pub fn strategy_effect(&self, classification: StrategyClassification) -> &[FieldDelta] {
        self.strategy_effects
            .get(&classification)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::simple()
    }
}

/// Category table in ten-point units, multiplied by `scale`.
fn category_effects(scale: f64) -> BTreeMap<StressorCategory, Vec<FieldDelta>> {
    use StateField::*;

    let table: [(StressorCategory, &[(StateField, f64)]); 8] = [
        (
            StressorCategory::SocialEnvironmental,
            &[(TriggerSalience, 1.0), (Craving, 1.0)],
        ),
        (StressorCategory::Interpersonal, &[(TriggerSalience, 2.0)]),
        (StressorCategory::WorkAcademic, &[(SelfEfficacy, -1.0)]),
        (
            StressorCategory::EmotionalCognitive,
            &[(Craving, 1.0), (Motivation, -1.0)],
        ),
        (StressorCategory::PhysicalBiological, &[(SelfEfficacy, -1.0)]),
        (StressorCategory::LifeEvents, &[(TriggerSalience, 2.0)]),
        (
            StressorCategory::SupportiveEvents,
            &[(Motivation, 1.0), (SelfEfficacy, 1.0)],
        ),
        (StressorCategory::TreatmentRecovery, &[]),
    ];

    table
        .into_iter()
        .map(|(category, deltas)| {
            let deltas = deltas
                .iter()
                .map(|&(field, delta)| FieldDelta::new(field, delta * scale))
                .collect();
            (category, deltas)
        })
        .collect()
}

fn strategy_effects() -> BTreeMap<StrategyClassification, Vec<FieldDelta>> {
    use StateField::*;

    BTreeMap::from([
        (
            StrategyClassification::MiReflection,
            vec![
                FieldDelta::new(Motivation, 0.05),
                FieldDelta::new(SelfEfficacy, 0.05),
            ],
        ),
        (
            StrategyClassification::Validation,
            vec![
                FieldDelta::new(Shame, -0.1),
                FieldDelta::new(EmotionalPain, -0.05),
            ],
        ),
        (
            StrategyClassification::DirectiveAdvice,
            vec![FieldDelta::new(CognitiveControl, 0.05)],
        ),
        (
            StrategyClassification::Confrontational,
            vec![
                FieldDelta::new(Motivation, 0.02),
                FieldDelta::new(EmotionalPain, 0.02),
            ],
        ),
    ])
}

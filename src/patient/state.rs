//! The patient state vector and its bounded fields.
//!
//! Every numeric field carries its own closed interval. All writes go
//! through [`PatientState::set`] / [`PatientState::adjust`], which clamp to
//! that interval, so no sequence of updates can leave a field out of range.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stressors::{ActiveStressor, Stressor};

// ---------------------------------------------------------------------------
// Field ranges
// ---------------------------------------------------------------------------

/// A closed numeric interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldRange {
    pub min: f64,
    pub max: f64,
}

impl FieldRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the interval. NaN collapses to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Names of the numeric fields of [`PatientState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Craving,
    /// Also reported as "stress".
    TriggerSalience,
    Motivation,
    /// Also reported as "confidence".
    SelfEfficacy,
    CognitiveControl,
    HabitStrength,
    EmotionalPain,
    Shame,
}

impl StateField {
    pub const ALL: [StateField; 8] = [
        StateField::Craving,
        StateField::TriggerSalience,
        StateField::Motivation,
        StateField::SelfEfficacy,
        StateField::CognitiveControl,
        StateField::HabitStrength,
        StateField::EmotionalPain,
        StateField::Shame,
    ];

    /// Whether the field only exists when affect tracking is enabled.
    pub fn is_affect(self) -> bool {
        matches!(self, StateField::EmotionalPain | StateField::Shame)
    }

    pub fn label(self) -> &'static str {
        match self {
            StateField::Craving => "Craving Level",
            StateField::TriggerSalience => "Trigger Salience/Stress",
            StateField::Motivation => "Motivation",
            StateField::SelfEfficacy => "Self-Efficacy/Confidence",
            StateField::CognitiveControl => "Cognitive Control/Adherence",
            StateField::HabitStrength => "Habit Strength",
            StateField::EmotionalPain => "Emotional Pain",
            StateField::Shame => "Shame",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Declared interval for each state field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateScales {
    pub craving: FieldRange,
    pub trigger_salience: FieldRange,
    pub motivation: FieldRange,
    pub self_efficacy: FieldRange,
    pub cognitive_control: FieldRange,
    pub habit_strength: FieldRange,
    pub emotional_pain: FieldRange,
    pub shame: FieldRange,
}

impl StateScales {
    /// Every field on the same interval.
    pub const fn uniform(range: FieldRange) -> Self {
        Self {
            craving: range,
            trigger_salience: range,
            motivation: range,
            self_efficacy: range,
            cognitive_control: range,
            habit_strength: range,
            emotional_pain: range,
            shame: range,
        }
    }

    /// Range for `field`.
    pub fn range(&self, field: StateField) -> FieldRange {
        match field {
            StateField::Craving => self.craving,
            StateField::TriggerSalience => self.trigger_salience,
            StateField::Motivation => self.motivation,
            StateField::SelfEfficacy => self.self_efficacy,
            StateField::CognitiveControl => self.cognitive_control,
            StateField::HabitStrength => self.habit_strength,
            StateField::EmotionalPain => self.emotional_pain,
            StateField::Shame => self.shame,
        }
    }
}

// ---------------------------------------------------------------------------
// Initial values
// ---------------------------------------------------------------------------

/// Starting values for a fresh patient. `None` affect fields disable affect
/// tracking for the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialValues {
    pub craving: f64,
    pub trigger_salience: f64,
    pub motivation: f64,
    pub self_efficacy: f64,
    pub cognitive_control: f64,
    pub habit_strength: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affect: Option<AffectState>,
}

/// Affect fields, present only in the rich variant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AffectState {
    pub emotional_pain: f64,
    pub shame: f64,
}

// ---------------------------------------------------------------------------
// PatientState
// ---------------------------------------------------------------------------

/// The simulated patient's state, owned by the run loop for a whole
/// multi-session run.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientState {
    scales: StateScales,
    craving: f64,
    trigger_salience: f64,
    motivation: f64,
    self_efficacy: f64,
    cognitive_control: f64,
    habit_strength: f64,
    affect: Option<AffectState>,
    lapse_flag: bool,
    stressor_ledger: Vec<ActiveStressor>,
}

impl PatientState {
    /// Build a state from initial values, clamping each into its scale.
    pub fn new(scales: StateScales, initial: &InitialValues) -> Self {
        let mut state = Self {
            scales,
            craving: 0.0,
            trigger_salience: 0.0,
            motivation: 0.0,
            self_efficacy: 0.0,
            cognitive_control: 0.0,
            habit_strength: 0.0,
            affect: initial.affect.map(|_| AffectState::default()),
            lapse_flag: false,
            stressor_ledger: Vec::new(),
        };
        state.set(StateField::Craving, initial.craving);
        state.set(StateField::TriggerSalience, initial.trigger_salience);
        state.set(StateField::Motivation, initial.motivation);
        state.set(StateField::SelfEfficacy, initial.self_efficacy);
        state.set(StateField::CognitiveControl, initial.cognitive_control);
        state.set(StateField::HabitStrength, initial.habit_strength);
        if let Some(affect) = initial.affect {
            state.set(StateField::EmotionalPain, affect.emotional_pain);
            state.set(StateField::Shame, affect.shame);
        }
        state
    }

    pub fn scales(&self) -> &StateScales {
        &self.scales
    }

    /// Current value of `field`, or `None` for an affect field while affect
    /// tracking is off.
    pub fn get(&self, field: StateField) -> Option<f64> {
        match field {
            StateField::Craving => Some(self.craving),
            StateField::TriggerSalience => Some(self.trigger_salience),
            StateField::Motivation => Some(self.motivation),
            StateField::SelfEfficacy => Some(self.self_efficacy),
            StateField::CognitiveControl => Some(self.cognitive_control),
            StateField::HabitStrength => Some(self.habit_strength),
            StateField::EmotionalPain => self.affect.map(|a| a.emotional_pain),
            StateField::Shame => self.affect.map(|a| a.shame),
        }
    }

    /// Value of `field`, reading absent affect fields as zero.
    pub fn value(&self, field: StateField) -> f64 {
        self.get(field).unwrap_or(0.0)
    }

    /// Set `field` to `value`, clamped to its scale. Writes to affect fields
    /// are ignored while affect tracking is off.
    pub fn set(&mut self, field: StateField, value: f64) {
        let clamped = self.scales.range(field).clamp(value);
        match field {
            StateField::Craving => self.craving = clamped,
            StateField::TriggerSalience => self.trigger_salience = clamped,
            StateField::Motivation => self.motivation = clamped,
            StateField::SelfEfficacy => self.self_efficacy = clamped,
            StateField::CognitiveControl => self.cognitive_control = clamped,
            StateField::HabitStrength => self.habit_strength = clamped,
            StateField::EmotionalPain => {
                if let Some(affect) = self.affect.as_mut() {
                    affect.emotional_pain = clamped;
                }
            }
            StateField::Shame => {
                if let Some(affect) = self.affect.as_mut() {
                    affect.shame = clamped;
                }
            }
        }
    }

    /// Add `delta` to `field`, clamped. Non-finite deltas are ignored.
    pub fn adjust(&mut self, field: StateField, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        if let Some(current) = self.get(field) {
            self.set(field, current + delta);
        }
    }

    pub fn craving(&self) -> f64 {
        self.craving
    }

    pub fn trigger_salience(&self) -> f64 {
        self.trigger_salience
    }

    pub fn motivation(&self) -> f64 {
        self.motivation
    }

    pub fn self_efficacy(&self) -> f64 {
        self.self_efficacy
    }

    pub fn cognitive_control(&self) -> f64 {
        self.cognitive_control
    }

    pub fn habit_strength(&self) -> f64 {
        self.habit_strength
    }

    /// Affect fields, when the model tracks them.
    pub fn affect(&self) -> Option<AffectState> {
        self.affect
    }

    pub fn lapse_flag(&self) -> bool {
        self.lapse_flag
    }

    /// Set or clear the lapse flag.
    pub fn set_lapse_flag(&mut self, lapsed: bool) {
        self.lapse_flag = lapsed;
    }

    /// Active stressors in the order they were added.
    pub fn stressor_ledger(&self) -> &[ActiveStressor] {
        &self.stressor_ledger
    }

    pub(crate) fn stressor_ledger_mut(&mut self) -> &mut Vec<ActiveStressor> {
        &mut self.stressor_ledger
    }

    pub(crate) fn record_stressor(&mut self, stressor: Stressor, session_added: u32) {
        self.stressor_ledger
            .push(ActiveStressor::new(stressor, session_added));
    }

    pub(crate) fn clear_ledger(&mut self) {
        self.stressor_ledger.clear();
    }

    /// Whether every numeric field lies inside its declared interval.
    pub fn is_within_bounds(&self) -> bool {
        StateField::ALL.iter().all(|&field| match self.get(field) {
            Some(value) => self.scales.range(field).contains(value),
            None => true,
        })
    }

    /// Serializable copy of the current values.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            craving: self.craving,
            trigger_salience: self.trigger_salience,
            motivation: self.motivation,
            self_efficacy: self.self_efficacy,
            cognitive_control: self.cognitive_control,
            habit_strength: self.habit_strength,
            emotional_pain: self.affect.map(|a| a.emotional_pain),
            shame: self.affect.map(|a| a.shame),
            lapse_flag: self.lapse_flag,
            active_stressors: self
                .stressor_ledger
                .iter()
                .map(|entry| entry.stressor.name.clone())
                .collect(),
        }
    }

    /// Human-readable state block handed to the dialogue collaborators.
    pub fn summary(&self) -> String {
        let mut lines = Vec::with_capacity(10);
        for field in StateField::ALL {
            if let Some(value) = self.get(field) {
                lines.push(format!(
                    "  - {}: {}/{}",
                    field.label(),
                    format_value(value),
                    format_value(self.scales.range(field).max)
                ));
            }
        }
        lines.push(format!(
            "  - Recent Lapse: {}",
            if self.lapse_flag { "Yes" } else { "No" }
        ));
        let mut summary = lines.join("\n");
        if !self.stressor_ledger.is_empty() {
            summary.push_str("\n  - Recent Stressors:");
            for entry in &self.stressor_ledger {
                summary.push_str(&format!(
                    "\n    - {}: {}",
                    entry.stressor.name, entry.stressor.description
                ));
            }
        }
        summary
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable copy of a [`PatientState`], as written to the run output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub craving: f64,
    pub trigger_salience: f64,
    pub motivation: f64,
    pub self_efficacy: f64,
    pub cognitive_control: f64,
    pub habit_strength: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_pain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shame: Option<f64>,
    pub lapse_flag: bool,
    #[serde(default)]
    pub active_stressors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_point_state() -> PatientState {
        PatientState::new(
            StateScales::uniform(FieldRange::new(0.0, 10.0)),
            &InitialValues {
                craving: 5.0,
                trigger_salience: 5.0,
                motivation: 5.0,
                self_efficacy: 5.0,
                cognitive_control: 5.0,
                habit_strength: 5.0,
                affect: None,
            },
        )
    }

    #[test]
    fn test_adjust_clamps_at_both_ends() {
        let mut state = ten_point_state();
        state.adjust(StateField::Craving, 40.0);
        assert_eq!(state.craving(), 10.0);
        state.adjust(StateField::Craving, -40.0);
        assert_eq!(state.craving(), 0.0);
    }

    #[test]
    fn test_initial_values_are_clamped() {
        let state = PatientState::new(
            StateScales::uniform(FieldRange::new(1.0, 5.0)),
            &InitialValues {
                craving: 9.0,
                trigger_salience: -3.0,
                motivation: 3.0,
                self_efficacy: 3.0,
                cognitive_control: 3.0,
                habit_strength: 3.0,
                affect: None,
            },
        );
        assert_eq!(state.craving(), 5.0);
        assert_eq!(state.trigger_salience(), 1.0);
        assert!(state.is_within_bounds());
    }

    #[test]
    fn test_affect_writes_ignored_without_affect() {
        let mut state = ten_point_state();
        state.adjust(StateField::Shame, 0.5);
        assert_eq!(state.get(StateField::Shame), None);
        assert_eq!(state.value(StateField::Shame), 0.0);
    }

    #[test]
    fn test_non_finite_delta_is_ignored() {
        let mut state = ten_point_state();
        state.adjust(StateField::Motivation, f64::NAN);
        state.adjust(StateField::Motivation, f64::INFINITY);
        assert_eq!(state.motivation(), 5.0);
    }

    #[test]
    fn test_summary_lists_fields_and_lapse() {
        let mut state = ten_point_state();
        state.set_lapse_flag(true);
        let summary = state.summary();
        assert!(summary.contains("Craving Level: 5/10"));
        assert!(summary.contains("Recent Lapse: Yes"));
        assert!(!summary.contains("Shame"));
    }

    #[test]
    fn test_snapshot_omits_absent_affect() {
        let snapshot = ten_point_state().snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("shame").is_none());
        assert_eq!(json["craving"], 5.0);
    }
}

//! The patient-state update engine.
//!
//! [`PatientStateModel`] holds a validated [`ModelConfig`] and applies its
//! equations to a [`PatientState`] owned by the caller. Every stochastic
//! operation takes the run's generator explicitly.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::strategies::StrategyClassification;
use crate::stressors::Stressor;

use super::config::{LapseWeights, LedgerPolicy, ModelConfig, ModelVariant};
use super::state::{PatientState, StateField};

/// Standard logistic function.
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Result of one lapse check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapseCheck {
    pub probability: f64,
    pub draw: f64,
    pub lapsed: bool,
}

/// Which threshold rules fired after a rubric delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RubricOutcome {
    pub craving_relieved: bool,
    pub forced_lapse: bool,
}

/// Parameterized update engine shared by every model variant.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientStateModel {
    config: ModelConfig,
}

impl PatientStateModel {
    /// Build a model, rejecting configurations that fail
    /// [`ModelConfig::validate`].
    pub fn new(config: ModelConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Model for one of the built-in presets. Presets are always valid.
    pub fn from_variant(variant: ModelVariant) -> Self {
        Self {
            config: variant.preset(),
        }
    }

    /// The parameters driving this model.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Fresh state at the configured initial values.
    pub fn initial_state(&self) -> PatientState {
        PatientState::new(self.config.scales, &self.config.initial)
    }

    // -----------------------------------------------------------------------
    // Stressors and lapses
    // -----------------------------------------------------------------------

    /// Record each stressor in the ledger, apply its category effect, then
    /// run the lapse check once for the whole batch.
    pub fn apply_stressors<R: Rng + ?Sized>(
        &self,
        state: &mut PatientState,
        stressors: Vec<Stressor>,
        session_number: u32,
        rng: &mut R,
    ) -> LapseCheck {
        for stressor in stressors {
            let effects = self.config.stressor_effect(&stressor.category);
            if effects.is_empty() {
                log::debug!(
                    "Stressor {:?} ({}) has no state effect",
                    stressor.name,
                    stressor.category
                );
            }
            for effect in effects {
                state.adjust(effect.field, effect.delta);
            }
            log::debug!(
                "Applied stressor {:?} ({}) in session {}",
                stressor.name,
                stressor.category,
                session_number
            );
            state.record_stressor(stressor, session_number);
        }
        self.check_for_lapse(state, rng)
    }

    /// Logistic lapse probability for the current state.
    pub fn compute_lapse_probability(&self, state: &PatientState) -> f64 {
        sigmoid(linear_predictor(&self.config.lapse_weights, state))
    }

    /// One uniform draw against [`Self::compute_lapse_probability`]. On a
    /// lapse, sets the flag and applies the configured consequences.
    pub fn check_for_lapse<R: Rng + ?Sized>(&self, state: &mut PatientState, rng: &mut R) -> LapseCheck {
        let probability = self.compute_lapse_probability(state);
        let draw: f64 = rng.random();
        let lapsed = draw < probability;
        if lapsed {
            let consequence = &self.config.lapse_consequence;
            state.set_lapse_flag(true);
            state.adjust(StateField::SelfEfficacy, -consequence.self_efficacy_drop);
            state.adjust(StateField::Motivation, -consequence.motivation_drop);
            state.adjust(StateField::HabitStrength, consequence.habit_gain);
            log::info!("Lapse occurred (p = {:.3}, draw = {:.3})", probability, draw);
        } else {
            log::debug!("No lapse (p = {:.3}, draw = {:.3})", probability, draw);
        }
        LapseCheck {
            probability,
            draw,
            lapsed,
        }
    }

    // -----------------------------------------------------------------------
    // Session end
    // -----------------------------------------------------------------------

    /// Fixed end-of-session gains. Call exactly once per session.
    ///
    /// Resets the lapse flag; the ledger is cleared only under
    /// [`LedgerPolicy::ClearEachSession`].
    pub fn consolidate_after_session(&self, state: &mut PatientState) {
        let steps = &self.config.consolidation;
        state.adjust(StateField::Motivation, steps.motivation_gain);
        state.adjust(StateField::SelfEfficacy, steps.self_efficacy_gain);
        state.adjust(StateField::CognitiveControl, steps.cognitive_control_gain);
        state.adjust(StateField::TriggerSalience, -steps.trigger_salience_drop);
        state.set_lapse_flag(false);
        if self.config.ledger_policy == LedgerPolicy::ClearEachSession {
            state.clear_ledger();
        }
    }

    /// Fold externally scored deltas into motivation and confidence, then
    /// apply the threshold rules in order: high confidence relieves
    /// craving, then low confidence with high craving forces a lapse.
    ///
    /// Without rubric rules configured only the deltas are applied.
    pub fn apply_rubric_delta(
        &self,
        state: &mut PatientState,
        delta_motivation: f64,
        delta_confidence: f64,
    ) -> RubricOutcome {
        state.adjust(StateField::Motivation, delta_motivation);
        state.adjust(StateField::SelfEfficacy, delta_confidence);

        let Some(rules) = self.config.rubric else {
            return RubricOutcome::default();
        };
        let mut outcome = RubricOutcome::default();
        if state.self_efficacy() >= rules.relief_confidence_min {
            state.adjust(StateField::Craving, -rules.craving_relief);
            outcome.craving_relieved = true;
        }
        if state.self_efficacy() <= rules.lapse_confidence_max
            && state.craving() >= rules.lapse_craving_min
        {
            state.set_lapse_flag(true);
            outcome.forced_lapse = true;
            log::info!(
                "Low confidence ({}) with high craving ({}) forced a lapse",
                state.self_efficacy(),
                state.craving()
            );
        }
        outcome
    }

    /// Apply the effect of a therapist turn's classification. `Other` and
    /// classifications missing from the table change nothing.
    pub fn apply_strategy(&self, state: &mut PatientState, classification: StrategyClassification) {
        for effect in self.config.strategy_effect(classification) {
            state.adjust(effect.field, effect.delta);
        }
    }
}

/// Weighted sum with the model's fixed signs.
pub(crate) fn linear_predictor(weights: &LapseWeights, state: &PatientState) -> f64 {
    weights.craving * state.craving()
        + weights.trigger_salience * state.trigger_salience()
        + weights.habit_strength * state.habit_strength()
        + weights.shame * state.value(StateField::Shame)
        - weights.self_efficacy * state.self_efficacy()
        - weights.cognitive_control * state.cognitive_control()
        - weights.motivation * state.motivation()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stressors::StressorCatalog;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn simple() -> PatientStateModel {
        PatientStateModel::from_variant(ModelVariant::Simple)
    }

    fn interpersonal() -> Stressor {
        Stressor::new("Interpersonal", "Relationship conflict", "Unresolved argument with partner", 3, "Days–Weeks")
    }

    #[test]
    fn test_sigmoid_midpoint_and_symmetry() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_simple_lapse_probability_at_baseline() {
        let model = simple();
        let state = model.initial_state();
        // z = 5 * (0.3 + 0.2 + 0.3 - 0.2 - 0.1 - 0.1) = 2.0
        assert!((model.compute_lapse_probability(&state) - sigmoid(2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_interpersonal_stressor_scenario() {
        let model = simple();
        let mut state = model.initial_state();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let check = model.apply_stressors(&mut state, vec![interpersonal()], 2, &mut rng);

        assert_eq!(state.trigger_salience(), 7.0);
        assert_eq!(state.craving(), 5.0);
        assert_eq!(state.cognitive_control(), 5.0);
        assert_eq!(state.stressor_ledger().len(), 1);
        assert_eq!(state.stressor_ledger()[0].session_added, 2);

        // The check ran once against the post-stressor vector.
        let mut expected = model.initial_state();
        expected.set(StateField::TriggerSalience, 7.0);
        assert!((check.probability - model.compute_lapse_probability(&expected)).abs() < 1e-12);
        assert_eq!(check.lapsed, check.draw < check.probability);
        assert_eq!(state.lapse_flag(), check.lapsed);
        if check.lapsed {
            assert_eq!(state.self_efficacy(), 3.0);
            assert_eq!(state.motivation(), 3.0);
            assert_eq!(state.habit_strength(), 7.0);
        } else {
            assert_eq!(state.self_efficacy(), 5.0);
            assert_eq!(state.motivation(), 5.0);
            assert_eq!(state.habit_strength(), 5.0);
        }
    }

    /// Always draws just below 1.0, so no lapse check can fire.
    struct TopOfRange;

    impl rand::RngCore for TopOfRange {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }

        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(u8::MAX);
        }
    }

    #[test]
    fn test_category_effects_per_category() {
        use StateField::*;

        let cases: [(&str, &[(StateField, f64)]); 8] = [
            ("Social/Environmental", &[(TriggerSalience, 1.0), (Craving, 1.0)]),
            ("Interpersonal", &[(TriggerSalience, 2.0)]),
            ("Work/Academic", &[(SelfEfficacy, -1.0)]),
            ("Emotional/Cognitive", &[(Craving, 1.0), (Motivation, -1.0)]),
            ("Physical/Biological", &[(SelfEfficacy, -1.0)]),
            ("Life Events", &[(TriggerSalience, 2.0)]),
            ("Treatment/Recovery", &[]),
            ("Supportive events", &[(Motivation, 1.0), (SelfEfficacy, 1.0)]),
        ];
        let fields = [
            Craving,
            TriggerSalience,
            Motivation,
            SelfEfficacy,
            CognitiveControl,
            HabitStrength,
        ];

        let model = simple();
        for (category, deltas) in cases {
            let mut state = model.initial_state();
            let stressor = Stressor::new(category, "event", "", 2, "Days");
            let check = model.apply_stressors(&mut state, vec![stressor], 2, &mut TopOfRange);
            assert!(!check.lapsed, "{}", category);
            assert!(!state.lapse_flag());

            for field in fields {
                let expected = 5.0
                    + deltas
                        .iter()
                        .filter(|(changed, _)| *changed == field)
                        .map(|(_, delta)| delta)
                        .sum::<f64>();
                assert_eq!(state.value(field), expected, "{} / {:?}", category, field);
            }
            assert_eq!(state.stressor_ledger().len(), 1);
        }
    }

    #[test]
    fn test_rich_category_effects_are_rescaled() {
        let model = PatientStateModel::from_variant(ModelVariant::Rich);
        let mut state = model.initial_state();
        let supportive = Stressor::new("Supportive events", "Support meeting", "", 2, "Hours–Days");
        model.apply_stressors(&mut state, vec![supportive], 2, &mut TopOfRange);
        assert!((state.motivation() - 0.6).abs() < 1e-9);
        assert!((state.self_efficacy() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_lapse_check_runs_once_per_batch() {
        let model = simple();
        let mut state = model.initial_state();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let mut replay = ChaCha20Rng::seed_from_u64(9);
        let stressors = StressorCatalog::builtin().entries()[..3].to_vec();
        let check = model.apply_stressors(&mut state, stressors, 2, &mut rng);
        // Exactly one f64 was drawn.
        let first: f64 = replay.random();
        assert_eq!(check.draw, first);
        assert_eq!(rng.random::<u64>(), replay.random::<u64>());
    }

    #[test]
    fn test_unknown_category_only_records() {
        let model = simple();
        let mut state = model.initial_state();
        let before = state.snapshot();
        let odd = Stressor::new("Weather", "Heatwave", "Hot week", 1, "Days");
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let check = model.apply_stressors(&mut state, vec![odd], 2, &mut rng);
        if !check.lapsed {
            let mut after = state.snapshot();
            after.active_stressors.clear();
            assert_eq!(after, before);
        }
        assert_eq!(state.stressor_ledger().len(), 1);
    }

    #[test]
    fn test_consolidation_applies_steps_once() {
        let model = simple();
        let mut state = model.initial_state();
        state.set_lapse_flag(true);
        state.record_stressor(interpersonal(), 1);
        model.consolidate_after_session(&mut state);
        assert_eq!(state.motivation(), 6.0);
        assert_eq!(state.self_efficacy(), 6.0);
        assert_eq!(state.cognitive_control(), 6.0);
        assert_eq!(state.trigger_salience(), 4.0);
        assert!(!state.lapse_flag());
        assert!(state.stressor_ledger().is_empty());
    }

    #[test]
    fn test_consolidation_keeps_ledger_under_expiry_policy() {
        let model = PatientStateModel::from_variant(ModelVariant::Rubric);
        let mut state = model.initial_state();
        state.record_stressor(interpersonal(), 1);
        model.consolidate_after_session(&mut state);
        assert_eq!(state.stressor_ledger().len(), 1);
        assert_eq!(state.cognitive_control(), 6.0);
        // Motivation and confidence move only through the rubric.
        assert_eq!(state.motivation(), 3.0);
    }

    #[test]
    fn test_rubric_relief_reads_post_delta_confidence() {
        let model = PatientStateModel::from_variant(ModelVariant::Rubric);
        let mut state = model.initial_state();
        state.set(StateField::SelfEfficacy, 4.0);
        state.set(StateField::Craving, 3.0);
        let outcome = model.apply_rubric_delta(&mut state, 0.0, 0.0);
        assert!(outcome.craving_relieved);
        assert_eq!(state.craving(), 2.0);
        assert!(!state.lapse_flag());
    }

    #[test]
    fn test_rubric_forces_lapse() {
        let model = PatientStateModel::from_variant(ModelVariant::Rubric);
        let mut state = model.initial_state();
        state.set(StateField::SelfEfficacy, 3.0);
        state.set(StateField::Craving, 4.0);
        let outcome = model.apply_rubric_delta(&mut state, 0.0, -1.0);
        assert_eq!(state.self_efficacy(), 2.0);
        assert!(outcome.forced_lapse);
        assert!(state.lapse_flag());
    }

    #[test]
    fn test_rubric_relief_floors_at_one() {
        let model = PatientStateModel::from_variant(ModelVariant::Rubric);
        let mut state = model.initial_state();
        state.set(StateField::Craving, 1.0);
        model.apply_rubric_delta(&mut state, 9.0, 9.0);
        assert_eq!(state.self_efficacy(), 5.0);
        assert_eq!(state.motivation(), 5.0);
        assert_eq!(state.craving(), 1.0);
    }

    #[test]
    fn test_strategy_effects() {
        let model = PatientStateModel::from_variant(ModelVariant::Rich);
        let mut state = model.initial_state();
        model.apply_strategy(&mut state, StrategyClassification::Validation);
        assert!((state.value(StateField::Shame) - 0.4).abs() < 1e-9);
        assert!((state.value(StateField::EmotionalPain) - 0.55).abs() < 1e-9);

        let before = state.clone();
        model.apply_strategy(&mut state, StrategyClassification::Other);
        assert_eq!(state, before);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ModelConfig::simple();
        config.scales.craving = crate::patient::FieldRange::new(3.0, 1.0);
        assert!(PatientStateModel::new(config).is_err());
    }

    fn variant_strategy() -> impl Strategy<Value = ModelVariant> {
        prop_oneof![
            Just(ModelVariant::Simple),
            Just(ModelVariant::Rubric),
            Just(ModelVariant::Rich),
        ]
    }

    proptest! {
        #[test]
        fn prop_stressor_sequences_stay_in_bounds(
            variant in variant_strategy(),
            picks in proptest::collection::vec(0usize..31, 0..50),
            deltas in proptest::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 0..5),
            seed in any::<u64>(),
        ) {
            let model = PatientStateModel::from_variant(variant);
            let catalog = StressorCatalog::builtin();
            let mut state = model.initial_state();
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            for (i, pick) in picks.iter().enumerate() {
                let stressor = catalog.entries()[pick % catalog.len()].clone();
                model.apply_stressors(&mut state, vec![stressor], i as u32 + 2, &mut rng);
                prop_assert!(state.is_within_bounds());
            }
            for (dm, dc) in deltas {
                model.apply_rubric_delta(&mut state, dm, dc);
                prop_assert!(state.is_within_bounds());
                model.consolidate_after_session(&mut state);
                prop_assert!(state.is_within_bounds());
            }
        }

        #[test]
        fn prop_lapse_probability_is_monotone(
            variant in variant_strategy(),
            base in proptest::collection::vec(0.0f64..=1.0, 6),
            step in 0.0f64..=1.0,
        ) {
            let model = PatientStateModel::from_variant(variant);
            let scales = model.config().scales;
            let mut state = model.initial_state();
            let fields = [
                StateField::Craving,
                StateField::TriggerSalience,
                StateField::Motivation,
                StateField::SelfEfficacy,
                StateField::CognitiveControl,
                StateField::HabitStrength,
            ];
            for (field, frac) in fields.iter().zip(&base) {
                let range = scales.range(*field);
                state.set(*field, range.min + frac * (range.max - range.min));
            }
            let p0 = model.compute_lapse_probability(&state);
            prop_assert!(p0 > 0.0 && p0 < 1.0);

            for field in fields {
                let range = scales.range(field);
                let mut raised = state.clone();
                raised.adjust(field, step * (range.max - range.min));
                let p1 = model.compute_lapse_probability(&raised);
                match field {
                    StateField::Craving | StateField::TriggerSalience | StateField::HabitStrength => {
                        prop_assert!(p1 >= p0)
                    }
                    _ => prop_assert!(p1 <= p0),
                }
            }
        }
    }
}

//! Per-turn internal-state update for models with [`TurnDynamics`].
//!
//! Runs between a therapist turn and the following patient turn. It folds
//! new stressors into stress, recomputes craving, samples whether the
//! patient copes or acts on the urge, applies the matching learning rule and
//! finally the therapist turn's classification effect. The cope/urge draw
//! is separate from the lapse check.
//!
//! [`TurnDynamics`]: super::config::TurnDynamics

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::strategies::StrategyClassification;

use super::model::{linear_predictor, sigmoid, PatientStateModel};
use super::state::{PatientState, StateField};

/// What the patient did with the urge on this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    #[serde(rename = "cope")]
    Cope,
    #[serde(rename = "urge-driven")]
    UrgeDriven,
}

impl ActionOutcome {
    /// Serialized name of the outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cope => "cope",
            Self::UrgeDriven => "urge-driven",
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one turn update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnUpdate {
    pub stressors_processed: usize,
    pub urge_probability: f64,
    pub draw: f64,
    pub action: ActionOutcome,
}

impl PatientStateModel {
    /// Run the turn update. Returns `None`, without drawing, when the model
    /// has no turn dynamics.
    pub fn state_update<R: Rng + ?Sized>(
        &self,
        state: &mut PatientState,
        classification: Option<StrategyClassification>,
        rng: &mut R,
    ) -> Option<TurnUpdate> {
        let dynamics = self.config().turn_dynamics?;

        let mut stressors_processed = 0;
        for entry in state.stressor_ledger_mut().iter_mut().filter(|e| !e.processed) {
            entry.processed = true;
            stressors_processed += 1;
        }
        if stressors_processed > 0 {
            let n = stressors_processed as f64;
            state.adjust(
                StateField::TriggerSalience,
                n * dynamics.alpha_stress + n * dynamics.lambda_decay,
            );
        }

        let beta = &dynamics.craving_weights;
        let craving = beta.stress * state.trigger_salience() + beta.habit_strength * state.habit_strength()
            - beta.cognitive_control * state.cognitive_control()
            - beta.self_efficacy * state.self_efficacy()
            + beta.emotional_pain * state.value(StateField::EmotionalPain);
        state.set(StateField::Craving, craving);

        let urge_probability = sigmoid(linear_predictor(&dynamics.urge_weights, state));
        let draw: f64 = rng.random();
        let action = if draw < urge_probability {
            ActionOutcome::UrgeDriven
        } else {
            ActionOutcome::Cope
        };

        match action {
            ActionOutcome::UrgeDriven => {
                let rates = &dynamics.urge_learning;
                let headroom = state.scales().habit_strength.max - state.habit_strength();
                state.adjust(StateField::HabitStrength, rates.habit_rate * headroom);
                state.adjust(StateField::SelfEfficacy, -rates.self_efficacy_drop);
                state.adjust(StateField::Shame, rates.shame_gain);
            }
            ActionOutcome::Cope => {
                let rates = &dynamics.cope_learning;
                state.adjust(StateField::HabitStrength, -rates.habit_drop);
                state.adjust(StateField::SelfEfficacy, rates.self_efficacy_gain);
                state.adjust(StateField::CognitiveControl, rates.cognitive_control_gain);
            }
        }

        if let Some(classification) = classification {
            self.apply_strategy(state, classification);
        }

        log::debug!(
            "Turn update: {} (p_urge = {:.3}, {} stressor(s) processed)",
            action,
            urge_probability,
            stressors_processed
        );
        Some(TurnUpdate {
            stressors_processed,
            urge_probability,
            draw,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::ModelVariant;
    use crate::stressors::Stressor;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rich() -> PatientStateModel {
        PatientStateModel::from_variant(ModelVariant::Rich)
    }

    #[test]
    fn test_disabled_without_dynamics() {
        let model = PatientStateModel::from_variant(ModelVariant::Simple);
        let mut state = model.initial_state();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut untouched = ChaCha20Rng::seed_from_u64(1);
        assert!(model.state_update(&mut state, None, &mut rng).is_none());
        assert_eq!(rng.random::<u64>(), untouched.random::<u64>());
    }

    #[test]
    fn test_craving_recomputed_from_state() {
        let model = rich();
        let mut state = model.initial_state();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let update = model.state_update(&mut state, None, &mut rng).unwrap();
        assert_eq!(update.stressors_processed, 0);
        // 0.2*0.7 + 0.3*0.7 - 0.15*0.4 - 0.15*0.4 + 0.2*0.6 = 0.35
        assert!((state.craving() - 0.35).abs() < 1e-9);
        assert_eq!(
            update.action,
            if update.draw < update.urge_probability {
                ActionOutcome::UrgeDriven
            } else {
                ActionOutcome::Cope
            }
        );
    }

    #[test]
    fn test_learning_rules() {
        let model = rich();
        let mut state = model.initial_state();
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let update = model.state_update(&mut state, None, &mut rng).unwrap();
        match update.action {
            ActionOutcome::UrgeDriven => {
                assert!((state.habit_strength() - 0.73).abs() < 1e-9);
                assert!((state.self_efficacy() - 0.35).abs() < 1e-9);
                assert!((state.value(StateField::Shame) - 0.55).abs() < 1e-9);
            }
            ActionOutcome::Cope => {
                assert!((state.habit_strength() - 0.65).abs() < 1e-9);
                assert!((state.self_efficacy() - 0.45).abs() < 1e-9);
                assert!((state.cognitive_control() - 0.45).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_stressors_processed_once() {
        let model = rich();
        let mut state = model.initial_state();
        state.record_stressor(Stressor::new("Interpersonal", "a", "", 2, "Days"), 2);
        state.record_stressor(Stressor::new("Life Events", "b", "", 2, "Months"), 2);
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let first = model.state_update(&mut state, None, &mut rng).unwrap();
        assert_eq!(first.stressors_processed, 2);
        // 0.7 + 2 * (0.1 + 0.05), clamped to 1.
        assert_eq!(state.trigger_salience(), 1.0);
        assert!(state.stressor_ledger().iter().all(|e| e.processed));
        let second = model.state_update(&mut state, None, &mut rng).unwrap();
        assert_eq!(second.stressors_processed, 0);
    }

    #[test]
    fn test_same_seed_same_actions() {
        let model = rich();
        let run = |seed| {
            let mut state = model.initial_state();
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            (0..20)
                .map(|_| {
                    model
                        .state_update(&mut state, Some(StrategyClassification::MiReflection), &mut rng)
                        .map(|u| u.action)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(21), run(21));
    }

    #[test]
    fn test_action_outcome_labels() {
        assert_eq!(serde_json::to_string(&ActionOutcome::UrgeDriven).unwrap(), "\"urge-driven\"");
        assert_eq!(ActionOutcome::Cope.to_string(), "cope");
    }
}

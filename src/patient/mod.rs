//! Simulated patient: the bounded state vector, the parameter presets and
//! the update engine that mutates it.

pub mod config;
pub mod dynamics;
pub mod model;
pub mod state;

pub use config::{
    Consolidation, CopeLearning, CravingWeights, FieldDelta, LapseConsequence, LapseWeights,
    LedgerPolicy, ModelConfig, ModelVariant, RubricRules, TurnDynamics, UrgeLearning,
};
pub use dynamics::{ActionOutcome, TurnUpdate};
pub use model::{sigmoid, LapseCheck, PatientStateModel, RubricOutcome};
pub use state::{
    AffectState, FieldRange, InitialValues, PatientState, StateField, StateScales, StateSnapshot,
};

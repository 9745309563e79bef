//! # recovery-sim
//!
//! Synthetic multi-session therapy dialogues driven by a deterministic
//! patient-state simulation.
//!
//! The core is a small bounded state vector (craving, stress, motivation,
//! self-efficacy, cognitive control, habit strength and, in the rich model,
//! emotional pain and shame) updated by closed-form rules: stressor
//! effects, a logistic lapse model, end-of-session consolidation, rubric
//! deltas and an optional per-turn cope/urge process. Dialogue text comes
//! from pluggable agents behind async traits; all randomness comes from one
//! seeded generator per run, so a seed reproduces a run exactly.

pub mod config;
pub mod dialogue;
pub mod environment;
pub mod error;
pub mod patient;
pub mod run;
pub mod session;
pub mod strategies;
pub mod stressors;
pub mod utilities;

pub use config::{Difficulty, RunSeed, SimulationConfig};
pub use dialogue::{AgentError, AgentReply, DialogueAgent, ProfileSummarizer, RubricScorer};
pub use environment::{EnvironmentReport, EnvironmentStep};
pub use error::SimError;
pub use patient::{ModelConfig, ModelVariant, PatientState, PatientStateModel};
pub use run::{Collaborators, RunOutput, SessionRecord, SimulationRun};
pub use session::{SessionOutcome, SessionSimulator};
pub use stressors::{Severity, Stressor, StressorCatalog};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

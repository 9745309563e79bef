//! Error types for the simulator.
//!
//! The state model itself never fails: out-of-range inputs are clamped and
//! unknown labels are ignored. Errors only come from building a run
//! (configuration, seed, catalogs) and from writing its output.

use thiserror::Error;

/// Errors raised while configuring or persisting a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The seed string could not be parsed into a generator seed.
    #[error("invalid run seed {input:?}: expected a decimal or 0x-prefixed hex u64")]
    InvalidSeed { input: String },

    /// No seed was supplied; a run cannot be reproduced without one.
    #[error("no run seed configured")]
    MissingSeed,

    /// A configuration value is outside what the simulator accepts.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Filesystem error while reading configuration or writing output.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl SimError {
    /// Shorthand for [`SimError::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_seed_message_names_input() {
        let err = SimError::InvalidSeed {
            input: "0xZZ".into(),
        };
        assert!(err.to_string().contains("0xZZ"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SimError = io.into();
        assert!(matches!(err, SimError::Io(_)));
    }
}

//! Run configuration.
//!
//! A [`SimulationConfig`] is usually read from YAML; every field has a
//! default, so an empty document is a valid six-session run of the simple
//! model.
//!
//! ```yaml
//! variant: rich
//! num_sessions: 6
//! max_turns: 60
//! first_speaker: therapist
//! difficulty: hard
//! seed: "0x2a"
//! output_dir: outputs
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::dialogue::Role;
use crate::error::SimError;
use crate::patient::{ModelConfig, ModelVariant};
use crate::stressors::StressorCatalog;

/// Default number of sessions in a run.
pub const DEFAULT_NUM_SESSIONS: u32 = 6;

/// Default per-session turn budget.
pub const DEFAULT_MAX_TURNS: usize = 60;

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// How resistant the simulated patient is to intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    #[default]
    Hard,
}

impl Difficulty {
    /// Lower-case level name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Role-play instruction handed to the patient agent.
    pub fn description(self) -> &'static str {
        match self {
            Self::Easy => {
                "You are generally receptive to intervention and express willingness to follow \
                 coping plans and try alternative behaviors. You tend to respond positively to \
                 suggestions."
            }
            Self::Medium => {
                "You are ambivalent and show partial resistance. You may agree with some \
                 strategies, but push back on others."
            }
            Self::Hard => {
                "You have long-standing alcohol use, entrenched pessimism and low self-efficacy. \
                 You doubt your ability to recover and have substantial mistrust or skepticism \
                 about treatment. You often challenge or deflect suggestions, emphasize barriers, \
                 and may minimize the need for change."
            }
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(SimError::invalid_config(format!(
                "unknown difficulty {:?} (expected easy, medium or hard)",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// Seed of the single per-run generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunSeed(pub u64);

impl RunSeed {
    /// Parse a decimal or `0x`-prefixed hexadecimal seed.
    pub fn parse(input: &str) -> Result<Self, SimError> {
        let trimmed = input.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed.map(Self).map_err(|_| SimError::InvalidSeed {
            input: input.to_string(),
        })
    }

    /// Fresh seed from the thread-local generator.
    pub fn generate() -> Self {
        Self(rand::rng().random())
    }

    /// Raw seed value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// The run's generator.
    pub fn rng(self) -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(self.0)
    }
}

impl fmt::Display for RunSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunSeed {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// SimulationConfig
// ---------------------------------------------------------------------------

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub variant: ModelVariant,
    /// Full parameter set replacing the variant preset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
    pub num_sessions: u32,
    pub max_turns: usize,
    pub first_speaker: Role,
    pub difficulty: Difficulty,
    /// Decimal or `0x` hex. A run without a seed cannot start.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_seed"
    )]
    pub seed: Option<String>,
    pub output_dir: PathBuf,
    /// JSON stressor catalog replacing the bundled one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stressor_catalog: Option<PathBuf>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            variant: ModelVariant::default(),
            model: None,
            num_sessions: DEFAULT_NUM_SESSIONS,
            max_turns: DEFAULT_MAX_TURNS,
            first_speaker: Role::Therapist,
            difficulty: Difficulty::default(),
            seed: None,
            output_dir: PathBuf::from("outputs"),
            stressor_catalog: None,
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SimError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("Loaded simulation config from {}", path.display());
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.num_sessions == 0 {
            return Err(SimError::invalid_config("num_sessions must be at least 1"));
        }
        if self.max_turns == 0 {
            return Err(SimError::invalid_config("max_turns must be at least 1"));
        }
        if let Some(seed) = &self.seed {
            RunSeed::parse(seed)?;
        }
        self.model_config().validate()
    }

    /// The explicit model override, or the preset for `variant`.
    pub fn model_config(&self) -> ModelConfig {
        match &self.model {
            Some(model) => {
                if model.variant != self.variant {
                    log::debug!(
                        "Model override is a {} model; ignoring variant {}",
                        model.variant,
                        self.variant
                    );
                }
                model.clone()
            }
            None => self.variant.preset(),
        }
    }

    /// Parsed seed, or `None` when unset.
    pub fn run_seed(&self) -> Result<Option<RunSeed>, SimError> {
        self.seed.as_deref().map(RunSeed::parse).transpose()
    }

    /// The configured catalog file, or the bundled catalog.
    pub fn load_catalog(&self) -> Result<StressorCatalog, SimError> {
        match &self.stressor_catalog {
            Some(path) => {
                let catalog = StressorCatalog::from_json_file(path)?;
                log::info!(
                    "Loaded {} stressors from {}",
                    catalog.len(),
                    path.display()
                );
                Ok(catalog)
            }
            None => Ok(StressorCatalog::builtin()),
        }
    }
}

/// Accept `seed: 42` as well as `seed: "0x2a"`.
fn deserialize_seed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SeedRepr {
        Number(u64),
        Text(String),
    }

    Ok(Option::<SeedRepr>::deserialize(deserializer)?.map(|seed| match seed {
        SeedRepr::Number(n) => n.to_string(),
        SeedRepr::Text(text) => text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = SimulationConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.num_sessions, 6);
        assert_eq!(config.max_turns, 60);
        assert_eq!(config.first_speaker, Role::Therapist);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.variant, ModelVariant::Simple);
    }

    #[test]
    fn test_yaml_fields() {
        let config = SimulationConfig::from_yaml_str(
            "variant: rich\nnum_sessions: 3\nfirst_speaker: patient\ndifficulty: easy\nseed: \"0x2a\"\n",
        )
        .unwrap();
        assert_eq!(config.variant, ModelVariant::Rich);
        assert_eq!(config.first_speaker, Role::Patient);
        assert_eq!(config.run_seed().unwrap(), Some(RunSeed(42)));
        assert!(config.model_config().turn_dynamics.is_some());
    }

    #[test]
    fn test_integer_seed_accepted() {
        let config = SimulationConfig::from_yaml_str("seed: 12345").unwrap();
        assert_eq!(config.run_seed().unwrap(), Some(RunSeed(12345)));
    }

    #[test]
    fn test_zero_sessions_rejected() {
        let err = SimulationConfig::from_yaml_str("num_sessions: 0").unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig { .. }));
    }

    #[test]
    fn test_bad_seed_rejected_at_load() {
        let err = SimulationConfig::from_yaml_str("seed: banana").unwrap_err();
        assert!(matches!(err, SimError::InvalidSeed { .. }));
    }

    #[test]
    fn test_seed_parsing() {
        assert_eq!(RunSeed::parse("12345").unwrap(), RunSeed(12345));
        assert_eq!(RunSeed::parse(" 0xFF ").unwrap(), RunSeed(255));
        assert_eq!(RunSeed::parse("0X10").unwrap(), RunSeed(16));
        assert!(RunSeed::parse("").is_err());
        assert!(RunSeed::parse("-1").is_err());
        assert!(RunSeed::parse("0x").is_err());
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = RunSeed(7).rng();
        let mut b = RunSeed(7).rng();
        assert_eq!(a.random::<u64>(), b.random::<u64>());
    }

    #[test]
    fn test_model_override_with_inverted_range_rejected() {
        let mut model = ModelConfig::rubric();
        model.scales.craving = crate::patient::FieldRange::new(5.0, 1.0);
        let config = SimulationConfig {
            variant: ModelVariant::Rubric,
            model: Some(model),
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_catalog_file_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"Category": "Life Events", "Stressor": "Eviction", "Severity": 3, "Likely Duration": "Months"}}]"#
        )
        .unwrap();
        let config = SimulationConfig {
            stressor_catalog: Some(file.path().to_path_buf()),
            ..SimulationConfig::default()
        };
        let catalog = config.load_catalog().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].name, "Eviction");
    }

    #[test]
    fn test_difficulty_descriptions() {
        assert!(Difficulty::Hard.description().contains("skepticism"));
        assert_eq!("Medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
    }
}

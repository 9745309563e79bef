//! Stressors: labeled life events that perturb the patient between sessions.
//!
//! Catalog entries use the same field names as the JSON catalogs the
//! dialogue pipeline ships with (`Category`, `Stressor`, `Description`,
//! `Severity`, `Likely Duration`), so external catalogs load unchanged.

pub mod catalog;

use std::fmt;
use std::fs;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SimError;

pub use catalog::builtin_stressors;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Stressor category. Labels outside the known set are kept verbatim in
/// [`StressorCategory::Other`] and have no effect on the patient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StressorCategory {
    SocialEnvironmental,
    Interpersonal,
    WorkAcademic,
    EmotionalCognitive,
    PhysicalBiological,
    LifeEvents,
    TreatmentRecovery,
    SupportiveEvents,
    Other(String),
}

impl StressorCategory {
    /// Catalog label for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SocialEnvironmental => "Social/Environmental",
            Self::Interpersonal => "Interpersonal",
            Self::WorkAcademic => "Work/Academic",
            Self::EmotionalCognitive => "Emotional/Cognitive",
            Self::PhysicalBiological => "Physical/Biological",
            Self::LifeEvents => "Life Events",
            Self::TreatmentRecovery => "Treatment/Recovery",
            Self::SupportiveEvents => "Supportive events",
            Self::Other(label) => label,
        }
    }
}

impl From<&str> for StressorCategory {
    fn from(label: &str) -> Self {
        match label.trim() {
            "Social/Environmental" => Self::SocialEnvironmental,
            "Interpersonal" => Self::Interpersonal,
            "Work/Academic" => Self::WorkAcademic,
            "Emotional/Cognitive" => Self::EmotionalCognitive,
            "Physical/Biological" => Self::PhysicalBiological,
            "Life Events" => Self::LifeEvents,
            "Treatment/Recovery" => Self::TreatmentRecovery,
            other if other.eq_ignore_ascii_case("supportive events") => Self::SupportiveEvents,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for StressorCategory {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl From<StressorCategory> for String {
    fn from(category: StressorCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for StressorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Duration buckets
// ---------------------------------------------------------------------------

/// Coarse "likely duration" of a stressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationBucket {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl DurationBucket {
    /// Parse a duration label such as `"Days–Weeks"` or `"Hours-Days"`.
    ///
    /// A range resolves to the longest bucket it names. Returns `None` when
    /// no bucket word is present.
    pub fn parse(text: &str) -> Option<Self> {
        text.split(|c: char| c == '–' || c == '—' || c == '-' || c == '/' || c.is_whitespace())
            .filter_map(|token| Self::from_word(token.trim()))
            .max()
    }

    fn from_word(word: &str) -> Option<Self> {
        let word = word.to_ascii_lowercase();
        let word = word.trim_end_matches('s');
        match word {
            "minute" => Some(Self::Minutes),
            "hour" => Some(Self::Hours),
            "day" => Some(Self::Days),
            "week" => Some(Self::Weeks),
            "month" => Some(Self::Months),
            _ => None,
        }
    }

    /// Sessions a stressor stays active before it expires; `None` never
    /// expires by session count.
    pub fn expiry_sessions(self) -> Option<u32> {
        match self {
            Self::Minutes | Self::Hours | Self::Days => Some(1),
            Self::Weeks => Some(3),
            Self::Months => None,
        }
    }

    /// Whether a stressor active for `sessions_active` sessions has run its course.
    pub fn is_expired(self, sessions_active: u32) -> bool {
        self.expiry_sessions()
            .is_some_and(|threshold| sessions_active >= threshold)
    }
}

// ---------------------------------------------------------------------------
// Stressor
// ---------------------------------------------------------------------------

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stressor {
    #[serde(rename = "Category", alias = "category")]
    pub category: StressorCategory,
    #[serde(rename = "Stressor", alias = "stressor", alias = "name")]
    pub name: String,
    #[serde(rename = "Description", alias = "description", default)]
    pub description: String,
    #[serde(rename = "Severity", alias = "severity", default)]
    pub severity: Severity,
    #[serde(rename = "Likely Duration", alias = "likely_duration", default)]
    pub likely_duration: String,
}

impl Stressor {
    /// Build an entry with a numeric severity.
    pub fn new(
        category: impl Into<StressorCategory>,
        name: impl Into<String>,
        description: impl Into<String>,
        severity: u8,
        likely_duration: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            description: description.into(),
            severity: Severity::Level(severity),
            likely_duration: likely_duration.into(),
        }
    }

    /// Replace the severity, e.g. with a textual grade.
    pub fn with_severity(mut self, severity: impl Into<Severity>) -> Self {
        self.severity = severity.into();
        self
    }

    /// Parsed duration bucket. Unrecognized labels fall back to
    /// [`DurationBucket::Days`].
    pub fn duration_bucket(&self) -> DurationBucket {
        DurationBucket::parse(&self.likely_duration).unwrap_or_else(|| {
            log::warn!(
                "Unrecognized duration {:?} for stressor {:?}; treating as days",
                self.likely_duration,
                self.name
            );
            DurationBucket::Days
        })
    }
}

/// Stressor severity. Catalogs grade it either numerically (`3`, `"3"`) or
/// with a label such as `"High"` or `"Medium–High"`; labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Severity {
    Level(u8),
    Label(String),
}

impl Severity {
    /// Numeric level, when the catalog gave one.
    pub fn level(&self) -> Option<u8> {
        match self {
            Self::Level(level) => Some(*level),
            Self::Label(_) => None,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Level(0)
    }
}

impl From<u8> for Severity {
    fn from(level: u8) -> Self {
        Self::Level(level)
    }
}

impl From<&str> for Severity {
    fn from(text: &str) -> Self {
        let text = text.trim();
        match text.parse::<u8>() {
            Ok(level) => Self::Level(level),
            Err(_) => Self::Label(text.to_string()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(level) => write!(f, "{}", level),
            Self::Label(label) => f.write_str(label),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SeverityRepr {
            Number(u8),
            Text(String),
        }

        match SeverityRepr::deserialize(deserializer)? {
            SeverityRepr::Number(level) => Ok(Self::Level(level)),
            SeverityRepr::Text(text) if text.trim().is_empty() => {
                Err(serde::de::Error::custom("empty severity"))
            }
            SeverityRepr::Text(text) => Ok(Self::from(text.as_str())),
        }
    }
}

/// A stressor in a patient's ledger, tagged with the session it arrived in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStressor {
    #[serde(flatten)]
    pub stressor: Stressor,
    pub session_added: u32,
    /// Set once turn dynamics have folded this stressor into stress.
    #[serde(default)]
    pub processed: bool,
}

impl ActiveStressor {
    /// Tag `stressor` with the session it arrived in.
    pub fn new(stressor: Stressor, session_added: u32) -> Self {
        Self {
            stressor,
            session_added,
            processed: false,
        }
    }

    /// Whole sessions elapsed since the stressor arrived.
    pub fn sessions_active(&self, current_session: u32) -> u32 {
        current_session.saturating_sub(self.session_added)
    }

    /// Whether this entry should leave the ledger at `current_session`.
    pub fn is_expired(&self, current_session: u32) -> bool {
        self.stressor
            .duration_bucket()
            .is_expired(self.sessions_active(current_session))
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable set of stressors to sample from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StressorCatalog {
    entries: Vec<Stressor>,
}

impl StressorCatalog {
    /// Wrap a list of entries.
    pub fn new(entries: Vec<Stressor>) -> Self {
        Self { entries }
    }

    /// The catalog bundled with the crate.
    pub fn builtin() -> Self {
        Self::new(builtin_stressors())
    }

    /// Load a JSON array of stressors.
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Load a catalog from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Entries in catalog order.
    pub fn entries(&self) -> &[Stressor] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Draw up to `count` distinct entries, in draw order.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Stressor> {
        let amount = count.min(self.entries.len());
        rand::seq::index::sample(rng, self.entries.len(), amount)
            .into_iter()
            .map(|idx| self.entries[idx].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_duration_range_takes_longest_bucket() {
        assert_eq!(DurationBucket::parse("Days–Weeks"), Some(DurationBucket::Weeks));
        assert_eq!(DurationBucket::parse("Hours-Days"), Some(DurationBucket::Days));
        assert_eq!(DurationBucket::parse("Weeks–Months"), Some(DurationBucket::Months));
        assert_eq!(DurationBucket::parse("Hours"), Some(DurationBucket::Hours));
        assert_eq!(DurationBucket::parse("minutes"), Some(DurationBucket::Minutes));
        assert_eq!(DurationBucket::parse("forever"), None);
    }

    #[test]
    fn test_expiry_thresholds() {
        assert!(!DurationBucket::Hours.is_expired(0));
        assert!(DurationBucket::Hours.is_expired(1));
        assert!(!DurationBucket::Weeks.is_expired(2));
        assert!(DurationBucket::Weeks.is_expired(3));
        assert!(!DurationBucket::Months.is_expired(100));
    }

    #[test]
    fn test_unknown_duration_falls_back_to_days() {
        let stressor = Stressor::new("Interpersonal", "x", "y", 1, "a while");
        assert_eq!(stressor.duration_bucket(), DurationBucket::Days);
    }

    #[test]
    fn test_category_labels_roundtrip() {
        assert_eq!(
            StressorCategory::from("Life Events"),
            StressorCategory::LifeEvents
        );
        let other = StressorCategory::from("Weather");
        assert_eq!(other, StressorCategory::Other("Weather".into()));
        assert_eq!(String::from(other), "Weather");
    }

    #[test]
    fn test_catalog_json_accepts_string_severity() {
        let json = r#"[
            {"Category": "Interpersonal", "Stressor": "Relationship conflict",
             "Description": "Unresolved argument with partner", "Severity": "3",
             "Likely Duration": "Days–Weeks"},
            {"Category": "Made Up", "Stressor": "Odd", "Severity": 1,
             "Likely Duration": "Hours"}
        ]"#;
        let catalog = StressorCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].severity, Severity::Level(3));
        assert_eq!(
            catalog.entries()[1].category,
            StressorCategory::Other("Made Up".into())
        );
    }

    #[test]
    fn test_catalog_rejects_bad_severity() {
        for severity in ["-1", "\"  \"", "{\"level\": 2}"] {
            let json = format!(
                r#"[{{"Category": "Interpersonal", "Stressor": "x", "Severity": {}}}]"#,
                severity
            );
            assert!(StressorCatalog::from_json_str(&json).is_err(), "{}", severity);
        }
    }

    #[test]
    fn test_catalog_accepts_graded_severity() {
        let json = r#"[
            {"Category": "Social/Environmental", "Stressor": "Drinking-centered events",
             "Description": "Attended an event where alcohol was central",
             "Severity": "High", "Likely Duration": "Hours–Days"},
            {"Category": "Interpersonal", "Stressor": "Family conflict",
             "Description": "Ongoing tension with family members",
             "Severity": "Medium–High", "Likely Duration": "Weeks–Months"}
        ]"#;
        let catalog = StressorCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.entries()[0].severity, Severity::Label("High".into()));
        let graded = &catalog.entries()[1];
        assert_eq!(graded.severity, Severity::Label("Medium–High".into()));
        assert_eq!(graded.severity.level(), None);
        assert_eq!(graded.severity.to_string(), "Medium–High");
        assert_eq!(graded.duration_bucket(), DurationBucket::Months);
        let built = Stressor::new("Social/Environmental", "Drinking-centered events", "", 0, "Hours–Days")
            .with_severity("High");
        assert_eq!(built.severity, catalog.entries()[0].severity);
        assert_eq!(Stressor::new("Interpersonal", "x", "", 0, "Days").with_severity(" 2 ").severity.level(), Some(2));

        // Labels survive a save and reload.
        let saved = serde_json::to_string(catalog.entries()).unwrap();
        assert!(saved.contains(r#""Severity":"Medium–High""#));
        assert_eq!(StressorCatalog::from_json_str(&saved).unwrap(), catalog);
    }

    #[test]
    fn test_sample_is_distinct_and_bounded() {
        let catalog = StressorCatalog::builtin();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let drawn = catalog.sample(3, &mut rng);
        assert_eq!(drawn.len(), 3);
        assert_ne!(drawn[0].name, drawn[1].name);
        assert_ne!(drawn[1].name, drawn[2].name);
        assert_ne!(drawn[0].name, drawn[2].name);

        let small = StressorCatalog::new(drawn.clone());
        assert_eq!(small.sample(10, &mut rng).len(), 3);
        assert!(StressorCatalog::default().sample(2, &mut rng).is_empty());
    }

    #[test]
    fn test_sample_is_reproducible() {
        let catalog = StressorCatalog::builtin();
        let a = catalog.sample(3, &mut ChaCha20Rng::seed_from_u64(5));
        let b = catalog.sample(3, &mut ChaCha20Rng::seed_from_u64(5));
        assert_eq!(a, b);
    }
}

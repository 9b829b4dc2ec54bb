use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Exact-match name of the template's population column.
pub const DEFAULT_POPULATION_COLUMN: &str = " Population ";

/// Default percentage gap for both flags.
pub const DEFAULT_THRESHOLD: f64 = 50.0;

/// Sector catalog offered for upload, in display order.
pub const DEFAULT_SECTORS: [&str; 7] = [
    "Nutrition",
    "Health",
    "WASH",
    "Early Recovery",
    "Shelter",
    "Protection",
    "Education",
];

// ---------------------------------------------------------------------------
// Engine config
// ---------------------------------------------------------------------------

/// Percentage gaps above which a row is flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Highest vs second highest.
    #[serde(default = "default_threshold")]
    pub second: f64,
    /// Highest vs third highest.
    #[serde(default = "default_threshold")]
    pub third: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            second: DEFAULT_THRESHOLD,
            third: DEFAULT_THRESHOLD,
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_population_column() -> String {
    DEFAULT_POPULATION_COLUMN.to_string()
}

/// Settings that affect analytics only; the join never reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    pub thresholds: ThresholdConfig,
    pub population_column: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            population_column: default_population_column(),
        }
    }
}

impl MergeConfig {
    pub fn with_thresholds(mut self, second: f64, third: f64) -> Self {
        self.thresholds = ThresholdConfig { second, third };
        self
    }

    pub fn with_population_column(mut self, column: impl Into<String>) -> Self {
        self.population_column = column.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Manifest (TOML)
// ---------------------------------------------------------------------------

/// A merge run described on disk: which files, which columns, which sectors.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeManifest {
    #[serde(default = "default_population_column")]
    pub population_column: String,
    pub template: TemplateSource,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub sectors: Vec<SectorSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSource {
    pub file: String,
    #[serde(default)]
    pub join_column: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectorSource {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub join_column: Option<String>,
    #[serde(default)]
    pub pin_column: Option<String>,
    #[serde(default)]
    pub severity_column: Option<String>,
    #[serde(default)]
    pub ready: bool,
}

impl MergeManifest {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let manifest: MergeManifest =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.sectors.is_empty() {
            return Err(MergeError::ConfigValidation(
                "at least one sector is required".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for sector in &self.sectors {
            if sector.name.trim().is_empty() {
                return Err(MergeError::ConfigValidation("sector name must not be empty".into()));
            }
            if !seen.insert(sector.name.as_str()) {
                return Err(MergeError::ConfigValidation(format!(
                    "duplicate sector '{}'",
                    sector.name
                )));
            }
        }

        for (label, value) in [("second", self.thresholds.second), ("third", self.thresholds.third)] {
            if !value.is_finite() {
                return Err(MergeError::ConfigValidation(format!(
                    "threshold '{label}' must be a finite number, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Engine config carried by this manifest.
    pub fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            thresholds: self.thresholds,
            population_column: self.population_column.clone(),
        }
    }

    pub fn ready_count(&self) -> usize {
        self.sectors.iter().filter(|s| s.ready).count()
    }

    /// Sectors whose names are not in [`DEFAULT_SECTORS`].
    pub fn custom_sectors(&self) -> Vec<&str> {
        self.sectors
            .iter()
            .map(|s| s.name.as_str())
            .filter(|name| !DEFAULT_SECTORS.contains(name))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

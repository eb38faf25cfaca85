use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_address")]
    pub address: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Directory served under /static
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default)]
    pub permissive_cors: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            address: default_web_address(),
            port: default_web_port(),
            static_dir: default_static_dir(),
            permissive_cors: false,
        }
    }
}

/// Everything the scorer reads. Fixed at startup, never mutated afterwards.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScoringConfig {
    #[serde(default)]
    pub caps: FactorCaps,
    #[serde(default)]
    pub weights: FactorWeights,
    #[serde(default)]
    pub targets: SuggestionTargets,
    #[serde(default)]
    pub bands: BandThresholds,
    /// Exponent of the discipline-incident penalty curve
    #[serde(default = "default_incident_exponent")]
    pub incident_exponent: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            caps: FactorCaps::default(),
            weights: FactorWeights::default(),
            targets: SuggestionTargets::default(),
            bands: BandThresholds::default(),
            incident_exponent: default_incident_exponent(),
        }
    }
}

/// Raw value at which a factor saturates. Training level is also the
/// upper bound accepted from callers.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct FactorCaps {
    #[serde(default = "default_cap_years")]
    pub years_in_network: u32,
    #[serde(default = "default_cap_referrals")]
    pub referrals: u32,
    #[serde(default = "default_cap_incidents")]
    pub discipline_incidents: u32,
    #[serde(default = "default_cap_training")]
    pub training_level: u32,
    #[serde(default = "default_cap_contributions")]
    pub community_contributions: u32,
}

impl Default for FactorCaps {
    fn default() -> Self {
        Self {
            years_in_network: default_cap_years(),
            referrals: default_cap_referrals(),
            discipline_incidents: default_cap_incidents(),
            training_level: default_cap_training(),
            community_contributions: default_cap_contributions(),
        }
    }
}

/// Maximum points each factor can contribute. Must sum to 100.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct FactorWeights {
    #[serde(default = "default_weight_years")]
    pub years_in_network: f64,
    #[serde(default = "default_weight_referrals")]
    pub referrals: f64,
    #[serde(default = "default_weight_incidents")]
    pub discipline_incidents: f64,
    #[serde(default = "default_weight_training")]
    pub training_level: f64,
    #[serde(default = "default_weight_contributions")]
    pub community_contributions: f64,
}

impl FactorWeights {
    pub fn total(&self) -> f64 {
        self.years_in_network
            + self.referrals
            + self.discipline_incidents
            + self.training_level
            + self.community_contributions
    }

    fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("years_in_network", self.years_in_network),
            ("referrals", self.referrals),
            ("discipline_incidents", self.discipline_incidents),
            ("training_level", self.training_level),
            ("community_contributions", self.community_contributions),
        ]
        .into_iter()
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            years_in_network: default_weight_years(),
            referrals: default_weight_referrals(),
            discipline_incidents: default_weight_incidents(),
            training_level: default_weight_training(),
            community_contributions: default_weight_contributions(),
        }
    }
}

/// Fractions of each cap below which a suggestion is generated
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct SuggestionTargets {
    #[serde(default = "default_target_referrals")]
    pub referrals: f64,
    #[serde(default = "default_target_training")]
    pub training_level: f64,
    #[serde(default = "default_target_contributions")]
    pub community_contributions: f64,
    #[serde(default = "default_target_years")]
    pub years_in_network: f64,
}

impl Default for SuggestionTargets {
    fn default() -> Self {
        Self {
            referrals: default_target_referrals(),
            training_level: default_target_training(),
            community_contributions: default_target_contributions(),
            years_in_network: default_target_years(),
        }
    }
}

/// Minimum scores for the two upper bands
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct BandThresholds {
    #[serde(default = "default_band_excellent")]
    pub excellent: u8,
    #[serde(default = "default_band_good")]
    pub good: u8,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            excellent: default_band_excellent(),
            good: default_band_good(),
        }
    }
}

// Default value functions
fn default_web_address() -> String { "0.0.0.0".to_string() }
fn default_web_port() -> u16 { 8000 }
fn default_static_dir() -> String { "static".to_string() }
fn default_incident_exponent() -> f64 { 1.5 }
fn default_cap_years() -> u32 { 10 }
fn default_cap_referrals() -> u32 { 7 }
fn default_cap_incidents() -> u32 { 5 }
fn default_cap_training() -> u32 { 5 }
fn default_cap_contributions() -> u32 { 10 }
fn default_weight_years() -> f64 { 15.0 }
fn default_weight_referrals() -> f64 { 25.0 }
fn default_weight_incidents() -> f64 { 25.0 }
fn default_weight_training() -> f64 { 20.0 }
fn default_weight_contributions() -> f64 { 15.0 }
fn default_target_referrals() -> f64 { 0.8 }
fn default_target_training() -> f64 { 0.8 }
fn default_target_contributions() -> f64 { 0.7 }
fn default_target_years() -> f64 { 0.6 }
fn default_band_excellent() -> u8 { 80 }
fn default_band_good() -> u8 { 50 }

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", path, e))
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    /// Returns whether the file was actually read.
    pub fn load_or_default(path: &str) -> anyhow::Result<(Self, bool)> {
        if Path::new(path).exists() {
            Ok((Self::load(path)?, true))
        } else {
            Ok((Self::default(), false))
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.scoring.validate()?;
        Ok(config)
    }
}

impl ScoringConfig {
    /// Reject configurations under which the score would leave [0, 100]
    /// or normalization would divide by zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        let caps = [
            ("years_in_network", self.caps.years_in_network),
            ("referrals", self.caps.referrals),
            ("discipline_incidents", self.caps.discipline_incidents),
            ("training_level", self.caps.training_level),
            ("community_contributions", self.caps.community_contributions),
        ];
        for (name, cap) in caps {
            anyhow::ensure!(cap > 0, "scoring.caps.{} must be positive", name);
        }

        for (name, weight) in self.weights.iter() {
            anyhow::ensure!(
                weight.is_finite() && weight >= 0.0,
                "scoring.weights.{} must be a non-negative number (got {})",
                name,
                weight
            );
        }
        let total = self.weights.total();
        anyhow::ensure!(
            (total - 100.0).abs() <= WEIGHT_SUM_TOLERANCE,
            "scoring.weights must sum to 100 (got {})",
            total
        );

        let targets = [
            ("referrals", self.targets.referrals),
            ("training_level", self.targets.training_level),
            ("community_contributions", self.targets.community_contributions),
            ("years_in_network", self.targets.years_in_network),
        ];
        for (name, target) in targets {
            anyhow::ensure!(
                (0.0..=1.0).contains(&target),
                "scoring.targets.{} must be within [0, 1] (got {})",
                name,
                target
            );
        }

        anyhow::ensure!(
            self.bands.good <= self.bands.excellent && self.bands.excellent <= 100,
            "scoring.bands must satisfy good <= excellent <= 100 (got good={}, excellent={})",
            self.bands.good,
            self.bands.excellent
        );

        anyhow::ensure!(
            self.incident_exponent.is_finite() && self.incident_exponent > 0.0,
            "scoring.incident_exponent must be positive (got {})",
            self.incident_exponent
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weights.total(), 100.0);
        assert_eq!(config.incident_exponent, 1.5);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(config.web.port, 8000);
        assert_eq!(config.web.static_dir, "static");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [web]
            port = 9090

            [scoring.caps]
            referrals = 10

            [scoring.weights]
            referrals = 20
            training_level = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.web.port, 9090);
        assert_eq!(config.web.address, "0.0.0.0");
        assert_eq!(config.scoring.caps.referrals, 10);
        assert_eq!(config.scoring.caps.years_in_network, 10);
        assert_eq!(config.scoring.weights.referrals, 20.0);
        assert_eq!(config.scoring.weights.discipline_incidents, 25.0);
        assert_eq!(config.scoring.targets, SuggestionTargets::default());
    }

    #[test]
    fn test_weights_must_sum_to_100() {
        let err = Config::parse("[scoring.weights]\nreferrals = 30\n").unwrap_err();
        assert!(err.to_string().contains("sum to 100"), "unexpected error: {}", err);
    }

    #[test]
    fn test_zero_cap_rejected() {
        let err = Config::parse("[scoring.caps]\ntraining_level = 0\n").unwrap_err();
        assert!(err.to_string().contains("training_level"), "unexpected error: {}", err);
    }

    #[test]
    fn test_target_out_of_range_rejected() {
        let mut config = ScoringConfig::default();
        config.targets.years_in_network = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_bands_rejected() {
        let mut config = ScoringConfig::default();
        config.bands.good = 90;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = ScoringConfig::default();
        config.weights.years_in_network = -5.0;
        config.weights.referrals = 45.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_file_matches_defaults() {
        let config = Config::parse(include_str!("../bunker-trust.toml")).unwrap();
        assert_eq!(config.scoring, ScoringConfig::default());
        assert_eq!(config.web.port, WebConfig::default().port);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let (config, from_file) = Config::load_or_default("does-not-exist.toml").unwrap();
        assert!(!from_file);
        assert_eq!(config.scoring, ScoringConfig::default());
    }
}

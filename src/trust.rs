/// Trust Scorer module
///
/// Turns five raw occupant factors into a bounded 0-100 trust score.
/// - each factor is clamped to its cap and rescaled to [0, 1]
/// - tenure, referrals, training and contributions add points linearly
/// - discipline incidents remove points along `1 - inc^exponent`
///
/// Band, strengths and suggestions are derived in `feedback`.

use serde::Deserialize;

use crate::config::{FactorCaps, FactorWeights, ScoringConfig};
use crate::error::{Result, TrustError};
use crate::feedback::{self, TrustScoreResult};

/// Body of a score request. Signed fields so negative values reach
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustScoreRequest {
    pub years_in_network: i64,
    pub referrals: i64,
    pub discipline_incidents: i64,
    pub training_level: i64,
    pub community_contributions: i64,
}

impl TrustScoreRequest {
    /// Check every field and report all violations at once.
    pub fn validate(&self, caps: &FactorCaps) -> Result<TrustScoreInput> {
        let mut problems = Vec::new();

        let input = TrustScoreInput {
            years_in_network: non_negative("yearsInNetwork", self.years_in_network, &mut problems),
            referrals: non_negative("referrals", self.referrals, &mut problems),
            discipline_incidents: non_negative(
                "disciplineIncidents",
                self.discipline_incidents,
                &mut problems,
            ),
            training_level: bounded(
                "trainingLevel",
                self.training_level,
                caps.training_level,
                &mut problems,
            ),
            community_contributions: non_negative(
                "communityContributions",
                self.community_contributions,
                &mut problems,
            ),
        };

        if problems.is_empty() {
            Ok(input)
        } else {
            Err(TrustError::InvalidInput(problems.join("; ")))
        }
    }
}

// Values past u32::MAX saturate; every cap is a u32 so the normalized
// result is unchanged.
fn non_negative(field: &str, value: i64, problems: &mut Vec<String>) -> u32 {
    if value < 0 {
        problems.push(format!("{} must be >= 0 (got {})", field, value));
        return 0;
    }
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn bounded(field: &str, value: i64, max: u32, problems: &mut Vec<String>) -> u32 {
    match u32::try_from(value) {
        Ok(v) if v <= max => v,
        _ => {
            problems.push(format!("{} must be between 0 and {} (got {})", field, max, value));
            0
        }
    }
}

/// Validated raw factor values for one occupant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrustScoreInput {
    pub years_in_network: u32,
    pub referrals: u32,
    pub discipline_incidents: u32,
    pub training_level: u32,
    pub community_contributions: u32,
}

/// Factor values rescaled to [0, 1]. `discipline_incidents` is the
/// incident fraction, not a clean-record fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedFactors {
    pub years_in_network: f64,
    pub referrals: f64,
    pub discipline_incidents: f64,
    pub training_level: f64,
    pub community_contributions: f64,
}

impl NormalizedFactors {
    pub fn clamped(&self) -> Self {
        Self {
            years_in_network: self.years_in_network.clamp(0.0, 1.0),
            referrals: self.referrals.clamp(0.0, 1.0),
            discipline_incidents: self.discipline_incidents.clamp(0.0, 1.0),
            training_level: self.training_level.clamp(0.0, 1.0),
            community_contributions: self.community_contributions.clamp(0.0, 1.0),
        }
    }
}

/// Point contribution of each factor before rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorPoints {
    pub years_in_network: f64,
    pub referrals: f64,
    pub clean_record: f64,
    pub training: f64,
    pub community_contributions: f64,
}

impl FactorPoints {
    pub fn total(&self) -> f64 {
        self.years_in_network
            + self.referrals
            + self.clean_record
            + self.training
            + self.community_contributions
    }

    /// Round half to even, then clamp to [0, 100]
    pub fn score(&self) -> u8 {
        // NaN casts to 0
        self.total().round_ties_even().clamp(0.0, 100.0) as u8
    }
}

/// `min(value, cap) / cap`. `cap` must be positive, which config
/// validation guarantees.
pub fn normalize(value: u32, cap: u32) -> f64 {
    f64::from(value.min(cap)) / f64::from(cap)
}

/// Weighted aggregation. Fractions are re-clamped to [0, 1] first so the
/// clean-record term stays within [0, weight] whatever the caller passes.
pub fn aggregate(
    factors: &NormalizedFactors,
    weights: &FactorWeights,
    incident_exponent: f64,
) -> FactorPoints {
    let f = factors.clamped();
    FactorPoints {
        years_in_network: f.years_in_network * weights.years_in_network,
        referrals: f.referrals * weights.referrals,
        clean_record: (1.0 - f.discipline_incidents.powf(incident_exponent))
            * weights.discipline_incidents,
        training: f.training_level * weights.training_level,
        community_contributions: f.community_contributions * weights.community_contributions,
    }
}

/// Stateless scorer holding the immutable scoring configuration.
/// Shared across requests behind an `Arc`.
pub struct TrustScorer {
    config: ScoringConfig,
}

impl TrustScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn normalize(&self, input: &TrustScoreInput) -> NormalizedFactors {
        let caps = &self.config.caps;
        NormalizedFactors {
            years_in_network: normalize(input.years_in_network, caps.years_in_network),
            referrals: normalize(input.referrals, caps.referrals),
            discipline_incidents: normalize(input.discipline_incidents, caps.discipline_incidents),
            training_level: normalize(input.training_level, caps.training_level),
            community_contributions: normalize(
                input.community_contributions,
                caps.community_contributions,
            ),
        }
    }

    pub fn aggregate(&self, factors: &NormalizedFactors) -> FactorPoints {
        aggregate(factors, &self.config.weights, self.config.incident_exponent)
    }

    /// Score and explain a validated input
    pub fn evaluate(&self, input: &TrustScoreInput) -> TrustScoreResult {
        let factors = self.normalize(input).clamped();
        let points = self.aggregate(&factors);
        feedback::build(&points, &factors, &self.config)
    }

    /// Validate a raw request, then score it
    pub fn evaluate_request(&self, request: &TrustScoreRequest) -> Result<TrustScoreResult> {
        let input = request.validate(&self.config.caps)?;
        Ok(self.evaluate(&input))
    }
}

use serde::{Serialize, Serializer};
use std::cmp::Ordering;

use crate::config::{BandThresholds, ScoringConfig};
use crate::trust::{FactorPoints, NormalizedFactors};

pub const ON_TRACK: &str = "Keep doing what you're doing — you're on track!";

/// Qualitative score tier used to route manual review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustBand {
    Excellent,
    Good,
    NeedsReview,
}

impl TrustBand {
    pub fn from_score(score: u8, bands: &BandThresholds) -> Self {
        match score {
            s if s >= bands.excellent => TrustBand::Excellent,
            s if s >= bands.good => TrustBand::Good,
            _ => TrustBand::NeedsReview,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrustBand::Excellent => "Excellent -> fast-track eligible",
            TrustBand::Good => "Good -> standard checks",
            TrustBand::NeedsReview => "Needs review –> manual checks",
        }
    }
}

impl Serialize for TrustBand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Factors in their fixed ranking order (ties keep this order)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Tenure,
    Referrals,
    CleanRecord,
    Training,
    Contributions,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Tenure,
        Factor::Referrals,
        Factor::CleanRecord,
        Factor::Training,
        Factor::Contributions,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Factor::Tenure => "Tenure",
            Factor::Referrals => "Referrals",
            Factor::CleanRecord => "Clean record",
            Factor::Training => "Training",
            Factor::Contributions => "Contributions",
        }
    }

    fn points(self, points: &FactorPoints) -> f64 {
        match self {
            Factor::Tenure => points.years_in_network,
            Factor::Referrals => points.referrals,
            Factor::CleanRecord => points.clean_record,
            Factor::Training => points.training,
            Factor::Contributions => points.community_contributions,
        }
    }
}

/// Per-factor points, each rounded to one decimal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsBreakdown {
    pub years_in_network: f64,
    pub referrals: f64,
    pub clean_record: f64,
    pub training: f64,
    pub community_contributions: f64,
}

impl From<&FactorPoints> for PointsBreakdown {
    fn from(points: &FactorPoints) -> Self {
        Self {
            years_in_network: round_to_tenths(points.years_in_network),
            referrals: round_to_tenths(points.referrals),
            clean_record: round_to_tenths(points.clean_record),
            training: round_to_tenths(points.training),
            community_contributions: round_to_tenths(points.community_contributions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustScoreResult {
    pub score: u8,
    pub band: TrustBand,
    pub explanation: String,
    pub points_breakdown: PointsBreakdown,
    /// Never empty
    pub suggestions: Vec<String>,
}

/// Round to one decimal place from the exact binary value, ties to even.
/// Float formatting is exact, so going through it avoids the error that
/// `(x * 10.0).round() / 10.0` picks up on values like 0.35.
pub fn round_to_tenths(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// The `n` highest-scoring factors, stable on ties
pub fn strongest(points: &FactorPoints, n: usize) -> Vec<Factor> {
    let mut ranked: Vec<(Factor, f64)> = Factor::ALL
        .iter()
        .map(|&factor| (factor, factor.points(points)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.into_iter().take(n).map(|(factor, _)| factor).collect()
}

/// Whole units of a factor still needed to reach `target` of its cap
fn shortfall(target: f64, fraction: f64, cap: u32) -> f64 {
    let cap = f64::from(cap);
    (target * cap - fraction * cap).max(0.0).ceil()
}

/// Suggestion rules, evaluated in fixed order. Falls back to a single
/// on-track message when no rule fires.
pub fn suggestions(
    points: &FactorPoints,
    factors: &NormalizedFactors,
    config: &ScoringConfig,
) -> Vec<String> {
    let caps = &config.caps;
    let weights = &config.weights;
    let targets = &config.targets;
    let mut out = Vec::new();

    if factors.discipline_incidents > 0.0 {
        let recoverable = (weights.discipline_incidents - points.clean_record)
            .max(0.0)
            .round_ties_even();
        out.push(format!(
            "Maintain a clean record (no new incidents) to regain -> {} points over time.",
            recoverable as i64
        ));
    }

    let need_referrals = shortfall(targets.referrals, factors.referrals, caps.referrals);
    if need_referrals > 0.0 {
        out.push(format!(
            "Secure -> {} additional verified referral(s) to strengthen social proof.",
            need_referrals as i64
        ));
    }

    if factors.training_level < targets.training_level {
        let gain = ((targets.training_level - factors.training_level) * weights.training_level)
            .round_ties_even();
        out.push(format!(
            "Complete training to reach level 4–5 (unlocks ~{} pts).",
            gain as i64
        ));
    }

    let need_contributions = shortfall(
        targets.community_contributions,
        factors.community_contributions,
        caps.community_contributions,
    );
    if need_contributions > 0.0 {
        out.push(format!(
            "Add -> {} more community contribution(s).",
            need_contributions as i64
        ));
    }

    let need_years = shortfall(
        targets.years_in_network,
        factors.years_in_network,
        caps.years_in_network,
    );
    if need_years > 0.0 {
        out.push(format!(
            "Sustain participation for -> {} more year(s) to improve stability.",
            need_years as i64
        ));
    }

    if out.is_empty() {
        out.push(ON_TRACK.to_string());
    }
    out
}

/// Assemble the full result from the point terms and the fractions they
/// were computed from.
pub fn build(
    points: &FactorPoints,
    factors: &NormalizedFactors,
    config: &ScoringConfig,
) -> TrustScoreResult {
    let score = points.score();
    let band = TrustBand::from_score(score, &config.bands);
    let strengths = strongest(points, 2)
        .into_iter()
        .map(Factor::label)
        .collect::<Vec<_>>()
        .join(", ");

    let explanation = format!(
        "Score {} • {}. Strongest signals: {}. Focus on the suggestions below to raise your score.",
        score,
        band.label(),
        strengths
    );

    TrustScoreResult {
        score,
        band,
        explanation,
        points_breakdown: PointsBreakdown::from(points),
        suggestions: suggestions(points, factors, config),
    }
}

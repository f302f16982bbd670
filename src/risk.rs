use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AssessError;
use crate::models::{EmotionProfile, RiskAssessment, RiskRule, Severity};

/// Labels summed into the total indicator score. Case-sensitive.
pub const INDICATOR_LABELS: [&str; 7] = [
    "Depression",
    "Anxiety",
    "Stress",
    "Suicidal",
    "sadness",
    "worry",
    "empty",
];

const HIGH_SEVERITY_LABELS: [&str; 3] = ["Depression", "Suicidal", "Anxiety"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRules {
    pub primary_threshold: f64,
    /// Minimum indicator score for either secondary rule to apply.
    pub indicator_floor: f64,
    pub distress_min: f64,
    pub hopelessness_min: f64,
    pub polarity_max: f64,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self {
            primary_threshold: 55.0,
            indicator_floor: 15.0,
            distress_min: 0.6,
            hopelessness_min: 0.5,
            polarity_max: -0.3,
        }
    }
}

impl RiskRules {
    pub fn validate(&self) -> Result<(), AssessError> {
        let fields = [
            ("primary_threshold", self.primary_threshold),
            ("indicator_floor", self.indicator_floor),
            ("distress_min", self.distress_min),
            ("hopelessness_min", self.hopelessness_min),
            ("polarity_max", self.polarity_max),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(AssessError::InvalidRules(format!("{name} must be finite")));
        }
        if self.indicator_floor > self.primary_threshold {
            return Err(AssessError::InvalidRules(format!(
                "indicator_floor {} exceeds primary_threshold {}",
                self.indicator_floor, self.primary_threshold
            )));
        }
        Ok(())
    }

    fn decide(&self, total: f64, profile: &EmotionProfile) -> RiskRule {
        if total >= self.primary_threshold {
            RiskRule::PrimaryThreshold
        } else if profile.distress_level() >= self.distress_min
            && profile.hopelessness_level() >= self.hopelessness_min
            && total >= self.indicator_floor
        {
            RiskRule::DistressHopelessness
        } else if profile.polarity_score() <= self.polarity_max && total >= self.indicator_floor {
            RiskRule::NegativePolarity
        } else {
            RiskRule::NoSignal
        }
    }
}

/// Scores a profile with the default rules. Never fails: missing labels,
/// NaN and non-finite dimensions count as zero.
pub fn assess_risk(profile: &EmotionProfile) -> RiskAssessment {
    assess_risk_with(profile, &RiskRules::default())
}

pub fn assess_risk_with(profile: &EmotionProfile, rules: &RiskRules) -> RiskAssessment {
    let indicator_breakdown: BTreeMap<String, f64> = INDICATOR_LABELS
        .iter()
        .map(|label| (label.to_string(), profile.weight(label)))
        .collect();
    let total: f64 = INDICATOR_LABELS.iter().map(|label| profile.weight(label)).sum();
    let total = if total.is_nan() { 0.0 } else { total };

    let rule = rules.decide(total, profile);
    let explanation = explain(rule, total, rules.primary_threshold, profile.polarity_score());
    debug!(total, ?rule, "scored emotion profile");

    RiskAssessment {
        is_at_risk: rule != RiskRule::NoSignal,
        total_indicator_score: total,
        threshold: rules.primary_threshold,
        indicator_breakdown,
        rule,
        explanation,
    }
}

/// Entry point for callers that may not have a profile yet.
pub fn assess(profile: Option<&EmotionProfile>) -> Result<RiskAssessment, AssessError> {
    assess_with(profile, &RiskRules::default())
}

pub fn assess_with(
    profile: Option<&EmotionProfile>,
    rules: &RiskRules,
) -> Result<RiskAssessment, AssessError> {
    let profile =
        profile.ok_or_else(|| AssessError::InvalidInput("profile is missing".to_string()))?;
    rules.validate()?;
    Ok(assess_risk_with(profile, rules))
}

fn explain(rule: RiskRule, total: f64, threshold: f64, polarity: f64) -> String {
    let reason = match rule {
        RiskRule::PrimaryThreshold => {
            "The user shows significant indicators of early depression: the indicator score meets the threshold."
        }
        RiskRule::DistressHopelessness => {
            "The user shows significant indicators of early depression: elevated indicators combined with high distress and hopelessness."
        }
        RiskRule::NegativePolarity => {
            "The user shows significant indicators of early depression: elevated indicators combined with strongly negative sentiment."
        }
        RiskRule::NoSignal => "The user doesn't show significant indicators of depression.",
    };
    format!(
        "{reason} Total depression score: {total:.1}% (threshold is {threshold}%), overall sentiment: {polarity:.2}."
    )
}

/// Per-post severity from the classifier's top label and its confidence.
pub fn classify_severity(label: &str, confidence: f64) -> Severity {
    let high = if HIGH_SEVERITY_LABELS.contains(&label) {
        0.65
    } else {
        0.75
    };
    if confidence >= high {
        Severity::High
    } else if confidence >= 0.50 {
        Severity::Moderate
    } else {
        Severity::Low
    }
}

pub fn polarity_label(polarity: f64) -> &'static str {
    if polarity > 0.15 {
        "Positive"
    } else if polarity < -0.15 {
        "Negative"
    } else {
        "Neutral"
    }
}

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emotion weights and dimension scores for one subject's analyzed posts.
///
/// Labels are expected in canonical spelling; see `ingest` for how upstream
/// documents are normalized before they get here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionProfile {
    pub emotion_weights: BTreeMap<String, f64>,
    pub distress: f64,
    pub hopelessness: f64,
    pub polarity: f64,
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl EmotionProfile {
    /// Weight of `label`. NaN and absent labels are 0; infinities are held
    /// at `±f64::MAX` so a larger weight never scores lower.
    pub fn weight(&self, label: &str) -> f64 {
        match self.emotion_weights.get(label) {
            Some(value) if value.is_nan() => 0.0,
            Some(value) => value.clamp(-f64::MAX, f64::MAX),
            None => 0.0,
        }
    }

    pub fn distress_level(&self) -> f64 {
        finite_or_zero(self.distress)
    }

    pub fn hopelessness_level(&self) -> f64 {
        finite_or_zero(self.hopelessness)
    }

    pub fn polarity_score(&self) -> f64 {
        finite_or_zero(self.polarity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRule {
    PrimaryThreshold,
    DistressHopelessness,
    NegativePolarity,
    NoSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub is_at_risk: bool,
    pub total_indicator_score: f64,
    pub threshold: f64,
    pub indicator_breakdown: BTreeMap<String, f64>,
    pub rule: RiskRule,
    pub explanation: String,
}

impl RiskAssessment {
    pub fn label(&self) -> &'static str {
        if self.is_at_risk {
            "Has Early Signs of Depression"
        } else {
            "Doesn't have signs of depression"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low Severity",
            Severity::Moderate => "Moderate Severity",
            Severity::High => "High Severity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedPost {
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub prediction: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub username: Option<String>,
    pub profile: EmotionProfile,
    pub posts: Vec<AnalyzedPost>,
}

/// Metadata kept next to every saved report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub assessment: RiskAssessment,
}

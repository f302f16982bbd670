use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{AnalysisBundle, AnalyzedPost, RiskAssessment};
use crate::risk;

const TOP_EMOTIONS: usize = 8;
const POST_PREVIEW_CHARS: usize = 60;

pub fn date_range(posts: &[AnalyzedPost]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut stamps = posts.iter().filter_map(|post| post.created_at);
    let first = stamps.next()?;
    Some(stamps.fold((first, first), |(earliest, latest), stamp| {
        (earliest.min(stamp), latest.max(stamp))
    }))
}

pub fn format_date_range(posts: &[AnalyzedPost]) -> Option<String> {
    date_range(posts).map(|(earliest, latest)| {
        format!(
            "Posts from {} to {}",
            earliest.format("%b %d, %Y"),
            latest.format("%b %d, %Y")
        )
    })
}

/// Emotions sorted by weight, heaviest first; ties break on label.
pub fn top_emotions(bundle: &AnalysisBundle, limit: usize) -> Vec<(&str, f64)> {
    let mut emotions: Vec<(&str, f64)> = bundle
        .profile
        .emotion_weights
        .iter()
        .map(|(label, value)| (label.as_str(), *value))
        .collect();
    emotions.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    emotions.truncate(limit);
    emotions
}

fn display_label(label: &str) -> &str {
    if label == "Depression" {
        "Depressive"
    } else {
        label
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let escaped = flat.replace('|', "\\|");
    if escaped.chars().count() <= POST_PREVIEW_CHARS {
        escaped
    } else {
        let cut: String = escaped.chars().take(POST_PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    }
}

pub fn build_report(
    bundle: &AnalysisBundle,
    assessment: &RiskAssessment,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();
    let subject = bundle.username.as_deref().unwrap_or("unknown subject");

    let _ = writeln!(output, "# Depression Analysis Report");
    let _ = writeln!(
        output,
        "Generated for @{} on {}",
        subject,
        generated_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(range) = format_date_range(&bundle.posts) {
        let _ = writeln!(output, "{range}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Assessment");
    let _ = writeln!(output, "**{}**", assessment.label());
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", assessment.explanation);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Indicator Breakdown");
    for (label, value) in assessment.indicator_breakdown.iter() {
        let _ = writeln!(output, "- {}: {:.1}%", display_label(label), value);
    }
    let _ = writeln!(
        output,
        "- Total: {:.1}% (threshold {}%)",
        assessment.total_indicator_score, assessment.threshold
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Detected Emotions");
    let emotions = top_emotions(bundle, TOP_EMOTIONS);
    if emotions.is_empty() {
        let _ = writeln!(output, "No emotion data available.");
    } else {
        for (label, value) in emotions {
            let _ = writeln!(output, "- {}: {:.1}%", display_label(label), value);
        }
    }

    let profile = &bundle.profile;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Emotional Dimensions");
    let _ = writeln!(output, "- Distress: {:.1}/10", profile.distress_level() * 10.0);
    let _ = writeln!(output, "- Hopelessness: {:.1}/10", profile.hopelessness_level() * 10.0);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall Sentiment");
    let _ = writeln!(
        output,
        "{} ({:.2})",
        risk::polarity_label(profile.polarity_score()),
        profile.polarity_score()
    );

    if !bundle.posts.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Analyzed Posts");
        let _ = writeln!(output, "| Date | Post | Label | Confidence | Severity |");
        let _ = writeln!(output, "| --- | --- | --- | --- | --- |");
        for post in bundle.posts.iter() {
            let date = post
                .created_at
                .map(|stamp| stamp.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let (label, severity) = match post.prediction.as_deref() {
                Some(label) => (
                    display_label(label),
                    risk::classify_severity(label, post.confidence).as_str(),
                ),
                None => ("", ""),
            };
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.2} | {} |",
                date,
                preview(&post.text),
                label,
                post.confidence,
                severity
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "_This report is automatically generated and is not a clinical diagnosis. \
         If concerned, please consult a healthcare professional._"
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmotionProfile;
    use chrono::TimeZone;

    fn post(text: &str, day: u32, prediction: Option<&str>, confidence: f64) -> AnalyzedPost {
        AnalyzedPost {
            text: text.to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2026, 1, day, 9, 30, 0).unwrap()),
            prediction: prediction.map(str::to_string),
            confidence,
        }
    }

    fn sample_bundle() -> AnalysisBundle {
        AnalysisBundle {
            username: Some("avery".to_string()),
            profile: EmotionProfile {
                emotion_weights: [("Depression", 30.0), ("sadness", 30.0), ("happiness", 5.0)]
                    .into_iter()
                    .map(|(label, value)| (label.to_string(), value))
                    .collect(),
                distress: 0.42,
                hopelessness: 0.3,
                polarity: -0.35,
            },
            posts: vec![
                post("cannot sleep again", 20, Some("Depression"), 0.7),
                post("coffee with friends", 2, Some("happiness"), 0.6),
            ],
        }
    }

    #[test]
    fn date_range_spans_earliest_to_latest() {
        let bundle = sample_bundle();
        assert_eq!(
            format_date_range(&bundle.posts).as_deref(),
            Some("Posts from Jan 02, 2026 to Jan 20, 2026")
        );
        assert_eq!(date_range(&[]), None);
    }

    #[test]
    fn top_emotions_sort_by_weight_then_label() {
        let bundle = sample_bundle();
        let top = top_emotions(&bundle, 2);
        assert_eq!(top, vec![("Depression", 30.0), ("sadness", 30.0)]);
    }

    #[test]
    fn long_posts_are_truncated() {
        let text = "a".repeat(80);
        let shown = preview(&text);
        assert_eq!(shown.chars().count(), POST_PREVIEW_CHARS);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("x | y\nz"), "x \\| y z");
    }

    #[test]
    fn report_includes_assessment_and_sections() {
        let bundle = sample_bundle();
        let assessment = risk::assess_risk(&bundle.profile);
        let generated = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let report = build_report(&bundle, &assessment, generated);

        assert!(report.contains("Generated for @avery on 2026-02-01 12:00"));
        assert!(report.contains("**Has Early Signs of Depression**"));
        assert!(report.contains("- Depressive: 30.0%"));
        assert!(report.contains("- Total: 60.0% (threshold 55%)"));
        assert!(report.contains("- Distress: 4.2/10"));
        assert!(report.contains("Negative (-0.35)"));
        assert!(report.contains("| cannot sleep again | Depressive | 0.70 | High Severity |"));
        assert!(report.contains("| coffee with friends | happiness | 0.60 | Moderate Severity |"));
        assert!(report.contains("not a clinical diagnosis"));
    }

    #[test]
    fn detected_emotions_are_rounded() {
        let mut bundle = sample_bundle();
        bundle
            .profile
            .emotion_weights
            .insert("love".to_string(), 100.0 / 3.0);
        let assessment = risk::assess_risk(&bundle.profile);
        let report = build_report(&bundle, &assessment, Utc::now());
        assert!(report.contains("- love: 33.3%"));
        assert!(!report.contains("33.333"));
        assert!(report.contains("- happiness: 5.0%"));
    }

    #[test]
    fn report_handles_empty_bundle() {
        let bundle = AnalysisBundle::default();
        let assessment = risk::assess_risk(&bundle.profile);
        let report = build_report(&bundle, &assessment, Utc::now());
        assert!(report.contains("@unknown subject"));
        assert!(report.contains("No emotion data available."));
        assert!(!report.contains("## Analyzed Posts"));
    }
}

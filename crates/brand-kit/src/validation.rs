// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Parsing and normalization of raw model output
//!
//! Brand data is validated strictly: any violation fails the operation and
//! nothing is silently defaulted. Design audits are lenient: missing or
//! malformed scores and lists are replaced with neutral defaults.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{BrandKitError, BrandKitResult},
    types::{BrandData, Spacing, Trend, Typography, VisionAnalysis},
};

/// Minimum number of brand colors the model must return
pub const MIN_PRIMARY_COLORS: usize = 3;
/// Colors beyond this count are dropped
pub const MAX_PRIMARY_COLORS: usize = 5;
/// Minimum brand voice length after trimming
pub const MIN_BRAND_VOICE_CHARS: usize = 20;
/// Exact number of design guidelines kept
pub const DESIGN_GUIDELINE_COUNT: usize = 4;
/// Maximum number of feedback or recommendation entries
pub const MAX_AUDIT_ENTRIES: usize = 5;
/// Score used when the model omits one or returns a non-number
pub const DEFAULT_SCORE: u8 = 50;
/// Minimum length of a generated image prompt after trimming
pub const MIN_PROMPT_CHARS: usize = 10;

/// Feedback used when the model returns none
pub const DEFAULT_FEEDBACK: &str = "Design analysis completed. Review metrics for details.";
/// Recommendation used when the model returns none
pub const DEFAULT_RECOMMENDATION: &str = "Continue refining design based on brand guidelines.";

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9A-F]{3}|[0-9A-F]{6}|[0-9A-F]{8})$").expect("hex color regex is valid")
});

/// Remove Markdown code-fence markers and surrounding whitespace
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json\n", "")
        .replace("```json", "")
        .replace("```\n", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Normalize a brand color to an uppercase `#` hex code
///
/// # Errors
///
/// Returns a validation error for empty input or anything that is not a 3, 6
/// or 8 digit hex code after normalization.
pub fn normalize_color(raw: &str) -> BrandKitResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BrandKitError::validation(
            "Invalid color format in brand analysis",
        ));
    }

    let prefixed = if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{trimmed}")
    };
    let normalized = prefixed.to_uppercase();

    if HEX_COLOR.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(BrandKitError::validation(format!(
            "Invalid color format in brand analysis: {trimmed}"
        )))
    }
}

/// Round and clamp a score to 0..=100
///
/// Numbers and numeric strings are accepted; anything else yields
/// [`DEFAULT_SCORE`].
pub fn clamp_score(value: Option<&Value>) -> u8 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => DEFAULT_SCORE,
    }
}

/// String entries of a JSON array; other entries are skipped
pub fn string_entries(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse fence-stripped model output as JSON
///
/// # Errors
///
/// Malformed JSON is a validation error.
pub fn parse_json(cleaned: &str) -> BrandKitResult<Value> {
    Ok(serde_json::from_str(cleaned)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBrandData {
    #[serde(default)]
    primary_colors: Option<Value>,
    #[serde(default)]
    brand_voice: Option<Value>,
    #[serde(default)]
    design_guidelines: Option<Value>,
    #[serde(default)]
    typography: Option<Value>,
    #[serde(default)]
    spacing: Option<Value>,
    #[serde(default)]
    layout_patterns: Option<Value>,
}

/// Parse and validate a brand identity response
///
/// Colors are normalized and truncated to [`MAX_PRIMARY_COLORS`], guidelines
/// to [`DESIGN_GUIDELINE_COUNT`]. Malformed optional sections are dropped. The
/// screenshot, when given, is carried into the result.
///
/// # Errors
///
/// Returns a validation error for malformed JSON, fewer than
/// [`MIN_PRIMARY_COLORS`] colors, any invalid color, a short brand voice or
/// fewer than [`DESIGN_GUIDELINE_COUNT`] guidelines.
pub fn parse_brand_data(cleaned: &str, screenshot: Option<&str>) -> BrandKitResult<BrandData> {
    let raw: RawBrandData = serde_json::from_str(cleaned)?;

    let colors = match raw.primary_colors {
        Some(Value::Array(colors)) if colors.len() >= MIN_PRIMARY_COLORS => colors,
        _ => {
            return Err(BrandKitError::validation(
                "Invalid brand analysis: missing or insufficient primary colors",
            ));
        }
    };
    let primary_colors = colors
        .iter()
        .take(MAX_PRIMARY_COLORS)
        .map(|color| match color {
            Value::String(s) => normalize_color(s),
            _ => Err(BrandKitError::validation(
                "Invalid color format in brand analysis",
            )),
        })
        .collect::<BrandKitResult<Vec<_>>>()?;

    let brand_voice = match raw.brand_voice {
        Some(Value::String(voice)) if voice.trim().chars().count() >= MIN_BRAND_VOICE_CHARS => {
            voice
        }
        _ => {
            return Err(BrandKitError::validation(
                "Invalid brand analysis: insufficient brand voice description",
            ));
        }
    };

    let guidelines = string_entries(raw.design_guidelines.as_ref());
    if guidelines.len() < DESIGN_GUIDELINE_COUNT {
        return Err(BrandKitError::validation(
            "Invalid brand analysis: insufficient design guidelines",
        ));
    }
    let design_guidelines = guidelines
        .into_iter()
        .take(DESIGN_GUIDELINE_COUNT)
        .collect();

    Ok(BrandData {
        primary_colors,
        brand_voice,
        design_guidelines,
        typography: raw
            .typography
            .and_then(|v| serde_json::from_value::<Typography>(v).ok()),
        spacing: raw
            .spacing
            .and_then(|v| serde_json::from_value::<Spacing>(v).ok()),
        layout_patterns: raw
            .layout_patterns
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok()),
        website_screenshot: screenshot.map(str::to_string),
    })
}

fn bounded_entries(value: Option<&Value>, placeholder: &str) -> Vec<String> {
    let mut entries = string_entries(value);
    entries.truncate(MAX_AUDIT_ENTRIES);
    if entries.is_empty() {
        entries.push(placeholder.to_string());
    }
    entries
}

/// Normalize a parsed design audit
///
/// # Errors
///
/// Returns a validation error when the response is not a JSON object.
pub fn vision_analysis_from_value(value: &Value) -> BrandKitResult<VisionAnalysis> {
    let Some(object) = value.as_object() else {
        return Err(BrandKitError::validation("Invalid design analysis response"));
    };

    Ok(VisionAnalysis {
        score: clamp_score(object.get("score")),
        color_consistency: clamp_score(object.get("colorConsistency")),
        typography_scale: clamp_score(object.get("typographyScale")),
        spacing_rhythm: clamp_score(object.get("spacingRhythm")),
        accessibility: clamp_score(object.get("accessibility")),
        feedback: bounded_entries(object.get("feedback"), DEFAULT_FEEDBACK),
        recommendations: bounded_entries(object.get("recommendations"), DEFAULT_RECOMMENDATION),
    })
}

/// Parse a trend list; every entry needs `id`, `name` and `desc`
///
/// # Errors
///
/// Returns a validation error for malformed JSON or entries missing a field.
pub fn parse_trends(cleaned: &str) -> BrandKitResult<Vec<Trend>> {
    Ok(serde_json::from_str(cleaned)?)
}

/// Check a generated image prompt is long enough to be usable
///
/// # Errors
///
/// Returns a validation error for output shorter than [`MIN_PROMPT_CHARS`].
pub fn validate_prompt_output(text: &str) -> BrandKitResult<()> {
    if text.trim().chars().count() < MIN_PROMPT_CHARS {
        return Err(BrandKitError::validation(
            "Invalid response from Firefly prompt generator",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn brand_json(colors: Value) -> String {
        json!({
            "primaryColors": colors,
            "brandVoice": "Playful and bold. Speaks to young urban creatives.",
            "designGuidelines": ["Generous whitespace", "Rounded corners", "Bold type", "High contrast", "Extra"],
        })
        .to_string()
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn colors_are_normalized() {
        assert_eq!(normalize_color(" 1a73e8 ").unwrap(), "#1A73E8");
        assert_eq!(normalize_color("#fff").unwrap(), "#FFF");
        assert_eq!(normalize_color("#1a73e8cc").unwrap(), "#1A73E8CC");

        assert!(normalize_color("").is_err());
        assert!(normalize_color("   ").is_err());
        assert!(normalize_color("#12345").is_err());
        assert!(normalize_color("blue").is_err());
    }

    #[test]
    fn brand_data_is_normalized() {
        let raw = brand_json(json!(["ff0000", "#00ff00", " #0000FF ", "abc", "#123456", "#654321"]));
        let brand = parse_brand_data(&raw, None).unwrap();

        assert_eq!(
            brand.primary_colors,
            vec!["#FF0000", "#00FF00", "#0000FF", "#ABC", "#123456"]
        );
        assert_eq!(brand.design_guidelines.len(), 4);
        assert_eq!(brand.design_guidelines[3], "High contrast");
        assert!(brand.website_screenshot.is_none());
    }

    #[test]
    fn five_valid_colors_pass_unchanged() {
        let colors = json!(["#1A73E8", "#34A853", "#FBBC05", "#EA4335", "#FFFFFF"]);
        let brand = parse_brand_data(&brand_json(colors), Some("iVBORw0KGgo=")).unwrap();

        assert_eq!(
            brand.primary_colors,
            vec!["#1A73E8", "#34A853", "#FBBC05", "#EA4335", "#FFFFFF"]
        );
        assert_eq!(brand.website_screenshot.as_deref(), Some("iVBORw0KGgo="));
    }

    #[test]
    fn too_few_colors_fail() {
        let error = parse_brand_data(&brand_json(json!(["#FFFFFF", "#000000"])), None).unwrap_err();
        assert!(error.is_validation_error());
        assert!(error.to_string().contains("insufficient primary colors"));

        let error = parse_brand_data(&brand_json(json!("#FFFFFF")), None).unwrap_err();
        assert!(error.to_string().contains("insufficient primary colors"));
    }

    #[test]
    fn non_string_color_fails() {
        let error = parse_brand_data(&brand_json(json!(["#FFFFFF", 12, "#000000"])), None)
            .unwrap_err();
        assert!(error.to_string().contains("Invalid color format"));
    }

    #[test]
    fn short_brand_voice_fails() {
        let raw = json!({
            "primaryColors": ["#111", "#222", "#333"],
            "brandVoice": "   Too short.   ",
            "designGuidelines": ["a", "b", "c", "d"],
        })
        .to_string();

        let error = parse_brand_data(&raw, None).unwrap_err();
        assert!(error.to_string().contains("insufficient brand voice"));
    }

    #[test]
    fn three_guidelines_fail() {
        let raw = json!({
            "primaryColors": ["#111", "#222", "#333"],
            "brandVoice": "A calm, trustworthy voice for families.",
            "designGuidelines": ["a", "b", "c"],
        })
        .to_string();

        let error = parse_brand_data(&raw, None).unwrap_err();
        assert!(error.to_string().contains("insufficient design guidelines"));
    }

    #[test]
    fn optional_sections_survive_or_drop() {
        let raw = json!({
            "primaryColors": ["#111", "#222", "#333"],
            "brandVoice": "A calm, trustworthy voice for families.",
            "designGuidelines": ["a", "b", "c", "d"],
            "typography": { "primaryFont": "Inter", "fontWeights": ["400", "700"] },
            "spacing": "8px everywhere",
            "layoutPatterns": ["Grid-based", "Card layouts"],
        })
        .to_string();

        let brand = parse_brand_data(&raw, None).unwrap();
        let typography = brand.typography.unwrap();
        assert_eq!(typography.primary_font.as_deref(), Some("Inter"));
        assert_eq!(typography.font_weights.unwrap().len(), 2);
        assert!(brand.spacing.is_none());
        assert_eq!(brand.layout_patterns.unwrap().len(), 2);
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let error = parse_brand_data("not json", None).unwrap_err();
        assert!(error.is_validation_error());
    }

    #[test]
    fn scores_are_clamped() {
        assert_eq!(clamp_score(Some(&json!(150))), 100);
        assert_eq!(clamp_score(Some(&json!(-3))), 0);
        assert_eq!(clamp_score(Some(&json!(72.5))), 73);
        assert_eq!(clamp_score(Some(&json!("85"))), 85);
        assert_eq!(clamp_score(Some(&json!("high"))), DEFAULT_SCORE);
        assert_eq!(clamp_score(Some(&Value::Null)), DEFAULT_SCORE);
        assert_eq!(clamp_score(None), DEFAULT_SCORE);
    }

    #[test]
    fn vision_analysis_defaults() {
        let value = json!({
            "score": 150,
            "colorConsistency": -3,
            "typographyScale": "85",
            "spacingRhythm": 61.4,
            "feedback": ["a", 1, "b", "c", "d", "e", "f"],
        });

        let analysis = vision_analysis_from_value(&value).unwrap();
        assert_eq!(analysis.score, 100);
        assert_eq!(analysis.color_consistency, 0);
        assert_eq!(analysis.typography_scale, 85);
        assert_eq!(analysis.spacing_rhythm, 61);
        assert_eq!(analysis.accessibility, DEFAULT_SCORE);
        assert_eq!(analysis.feedback, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(analysis.recommendations, vec![DEFAULT_RECOMMENDATION]);

        let empty = vision_analysis_from_value(&json!({ "feedback": [] })).unwrap();
        assert_eq!(empty.feedback, vec![DEFAULT_FEEDBACK]);

        assert!(vision_analysis_from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn trends_require_every_field() {
        let trends = parse_trends(
            r#"[{"id":"y2k-revival","name":"Y2K Revival","desc":"Chrome and gradients"}]"#,
        )
        .unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].id, "y2k-revival");

        let error = parse_trends(r#"[{"id":"x","name":"X"}]"#).unwrap_err();
        assert!(error.is_validation_error());
        assert!(parse_trends(r#"{"id":"x"}"#).is_err());
    }

    #[test]
    fn prompt_output_length() {
        assert!(validate_prompt_output("  short  ").is_err());
        assert!(validate_prompt_output("A sunlit flat-lay of sneakers").is_ok());
    }
}

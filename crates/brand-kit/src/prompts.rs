// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prompt construction for each operation

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::types::{BrandData, Language};

/// System prompt for brand identity extraction
pub const BRAND_SYSTEM_PROMPT: &str =
    "You are a brand analysis expert. Return only valid JSON. No markdown. No explanations.";

/// System prompt for design audits
pub const DESIGN_SYSTEM_PROMPT: &str = "You are a professional design auditor conducting \
thorough brand compliance reviews. Analyze designs objectively against brand guidelines. \
Provide specific, actionable feedback. Be fair but firm in your assessments.";

const BRAND_RESPONSE_SHAPE: &str = r##"REQUIRED FORMAT:
{
  "primaryColors": ["#HEXCOD", "#HEXCOD", "#HEXCOD"],
  "brandVoice": "Sentence 1. Sentence 2. Sentence 3.",
  "designGuidelines": ["Pattern 1", "Pattern 2", "Pattern 3", "Pattern 4"],
  "typography": {
    "primaryFont": "Font family",
    "secondaryFont": "Secondary font",
    "fontWeights": ["400", "600", "700"],
    "headingStyle": "Heading style"
  },
  "spacing": {
    "baseUnit": "8px",
    "scale": "4px, 8px, 16px, 24px, 32px"
  },
  "layoutPatterns": ["Layout pattern 1", "Layout pattern 2"]
}"##;

/// Brand extraction from website text
pub fn brand_from_text(content: &str, language: Language) -> String {
    format!(
        "Analyze the brand from this website content and extract brand identity. \
Return ONLY valid JSON in {lang}.

WEBSITE CONTENT:
{content}

ANALYSIS REQUIREMENTS:
1. primaryColors: EXACTLY 3-5 hex color codes that would represent this brand's color scheme
2. brandVoice: 2-3 sentences describing the brand's personality and target audience
3. designGuidelines: EXACTLY 4 key design principles for this brand
4. typography: Recommended typography system for this brand
5. spacing: Recommended spacing system for this brand
6. layoutPatterns: 2-3 recommended layout approaches for this brand

{BRAND_RESPONSE_SHAPE}",
        lang = language.name(),
    )
}

/// Brand extraction from a website screenshot
pub fn brand_from_screenshot(language: Language) -> String {
    format!(
        "Analyze this brand screenshot and extract the brand identity. \
Return ONLY valid JSON in {lang}.

ANALYSIS REQUIREMENTS:
1. primaryColors: EXACTLY 3-5 hex color codes from the most prominent brand colors in the image
2. brandVoice: 2-3 sentences describing the brand's personality and target audience based on visual elements
3. designGuidelines: EXACTLY 4 key design patterns observed in the screenshot
4. typography: Font styles and weights visible in the image
5. spacing: Spacing patterns observed in the layout
6. layoutPatterns: 2-3 layout approaches used in the design

{BRAND_RESPONSE_SHAPE}",
        lang = language.name(),
    )
}

/// Image-generation prompt request
///
/// Uses the first three brand colors and the first sentence of the brand voice.
pub fn firefly(
    trend: &str,
    brand: &BrandData,
    events: &[String],
    trendy_suggestions: bool,
    language: Language,
) -> String {
    let colors = brand
        .primary_colors
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let voice = brand.brand_voice.split('.').next().unwrap_or_default().trim();

    let mut prompt = format!(
        "Create a concise Adobe Firefly prompt (max 100 words) in {lang} for: {trend}\n\n\
Brand: {colors} colors, {voice}",
        lang = language.name(),
    );

    if !events.is_empty() {
        let _ = write!(prompt, "\n\nTie it to these events: {}", events.join(", "));
    }
    if trendy_suggestions {
        prompt.push_str("\n\nBlend in currently popular visual elements where they suit the brand.");
    }

    prompt.push_str(
        "\n\nInclude: style, composition, lighting, mood, brand colors. Be specific and direct.",
    );
    prompt
}

/// Trend suggestions for a given day, optionally tailored to a brand
pub fn trends(brand: Option<&BrandData>, language: Language, today: NaiveDate) -> String {
    let brand_context = brand.map_or_else(String::new, |brand| {
        format!(
            "\n\nBrand Context to Consider:\n\
- Brand Voice: {}\n\
- Primary Colors: {}\n\
- Design Guidelines: {}\n\n\
Tailor trend suggestions that align with this brand's identity, voice, and aesthetic preferences.",
            brand.brand_voice,
            brand.primary_colors.join(", "),
            brand.design_guidelines.join("; "),
        )
    });

    format!(
        "You are a design trend expert. Based on today's date ({date}), suggest 8-12 trending \
design styles, viral content themes, and relevant upcoming festivals/events in {lang}.{brand_context}

Consider:
- Current social media trends
- Upcoming festivals and holidays in the next 2 months
- Viral visual aesthetics
- Popular design movements
- Seasonal themes

Return ONLY a valid JSON array with this exact structure:
[
  {{
    \"id\": \"kebab-case-id\",
    \"name\": \"Trend Name\",
    \"desc\": \"Brief description (under 60 chars)\"
  }}
]

Return ONLY the JSON array, no markdown formatting or additional text.",
        date = today.format("%B %-d, %Y"),
        lang = language.name(),
    )
}

/// Design audit against brand guidelines
pub fn design_audit(brand: &BrandData, language: Language) -> String {
    let mut requirements = format!(
        "- Colors: {}\n- Voice: {}\n- Guidelines: {}",
        brand.primary_colors.join(", "),
        brand.brand_voice,
        brand.design_guidelines.join(" | "),
    );

    if let Some(typography) = &brand.typography {
        let _ = write!(
            requirements,
            "\n- Typography: Primary: {}, Secondary: {}, Weights: {}, Heading Style: {}",
            typography.primary_font.as_deref().unwrap_or("unspecified"),
            typography.secondary_font.as_deref().unwrap_or("unspecified"),
            typography
                .font_weights
                .as_ref()
                .map_or_else(|| "unspecified".to_string(), |w| w.join(", ")),
            typography.heading_style.as_deref().unwrap_or("unspecified"),
        );
    }
    if let Some(spacing) = &brand.spacing {
        let _ = write!(
            requirements,
            "\n- Spacing System: Base unit {}, Scale {}",
            spacing.base_unit.as_deref().unwrap_or("unspecified"),
            spacing.scale.as_deref().unwrap_or("unspecified"),
        );
    }
    if let Some(layouts) = &brand.layout_patterns {
        let _ = write!(requirements, "\n- Layout Patterns: {}", layouts.join(", "));
    }

    let reference = if brand.website_screenshot.is_some() {
        "Use the second image (brand website) as visual reference for brand consistency.\n\n"
    } else {
        ""
    };

    format!(
        "Analyze this design image against the brand guidelines below. Provide an objective \
assessment in {lang}.

BRAND REQUIREMENTS:
{requirements}

{reference}RATE THIS DESIGN (0-100 scale):

1. Color Consistency: How well does the design use the required brand colors?
2. Typography: Does it use appropriate fonts and text hierarchy?
3. Spacing: Is the spacing consistent and well-structured?
4. Accessibility: Are contrast, text size, and usability standards met?
5. Overall Brand Alignment: How well does this represent the brand?

SCORING: Be critical but fair. Empty designs score 0-20. Perfect brand alignment scores 90-100.

Return ONLY valid JSON:
{{
  \"score\": 0-100,
  \"colorConsistency\": 0-100,
  \"typographyScale\": 0-100,
  \"spacingRhythm\": 0-100,
  \"accessibility\": 0-100,
  \"feedback\": [\"3-5 specific observations\"],
  \"recommendations\": [\"3-5 actionable suggestions\"]
}}",
        lang = language.name(),
    )
}

// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Domain models and typed requests
//!
//! The result types serialize to the camelCase JSON shapes the model is asked
//! to produce, so a cached or returned value can be handed straight to a UI.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Response language for generated text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// English (the fallback for unknown codes)
    #[default]
    #[serde(rename = "en")]
    English,
    /// Spanish
    #[serde(rename = "es")]
    Spanish,
    /// French
    #[serde(rename = "fr")]
    French,
}

impl Language {
    /// Resolve a language code, falling back to English for unknown codes
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" => Self::Spanish,
            "fr" => Self::French,
            _ => Self::English,
        }
    }

    /// Two-letter language code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Spanish => "es",
            Self::French => "fr",
        }
    }

    /// Language name as used inside prompts
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Spanish",
            Self::French => "French",
        }
    }
}

impl From<&str> for Language {
    fn from(code: &str) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Typography observed on, or recommended for, a brand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    /// Primary font family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_font: Option<String>,
    /// Secondary font family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_font: Option<String>,
    /// Font weights in use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weights: Option<Vec<String>>,
    /// Heading style description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_style: Option<String>,
}

/// Spacing system of a brand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spacing {
    /// Base spacing unit, e.g. `8px`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_unit: Option<String>,
    /// Spacing scale, e.g. `4px, 8px, 16px`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
}

/// Validated brand identity
///
/// Invariants: 3 to 5 uppercase `#` hex colors, a brand voice of at least 20
/// characters and exactly 4 design guidelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandData {
    /// Primary brand colors
    pub primary_colors: Vec<String>,
    /// Brand personality and audience description
    pub brand_voice: String,
    /// Key design guidelines
    pub design_guidelines: Vec<String>,
    /// Typography system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography: Option<Typography>,
    /// Spacing system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Spacing>,
    /// Layout approaches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_patterns: Option<Vec<String>>,
    /// Base64 screenshot the brand was extracted from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_screenshot: Option<String>,
}

/// Normalized design audit scores and feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionAnalysis {
    /// Overall brand alignment (0-100)
    pub score: u8,
    /// Use of the brand colors (0-100)
    pub color_consistency: u8,
    /// Typography and text hierarchy (0-100)
    pub typography_scale: u8,
    /// Spacing consistency (0-100)
    pub spacing_rhythm: u8,
    /// Contrast, text size and usability (0-100)
    pub accessibility: u8,
    /// Up to 5 observations
    pub feedback: Vec<String>,
    /// Up to 5 actionable suggestions
    pub recommendations: Vec<String>,
}

/// A suggested design trend, content theme or upcoming event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    /// Kebab-case identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Short description
    pub desc: String,
}

/// Request to extract a brand identity
#[derive(Debug, Clone)]
pub struct BrandIdentityRequest {
    content: String,
    language: Language,
    screenshot: Option<String>,
    cancellation: Option<CancellationToken>,
}

impl BrandIdentityRequest {
    /// Create a request from website content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            language: Language::default(),
            screenshot: None,
            cancellation: None,
        }
    }

    /// Set the response language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Analyze a base64 website screenshot instead of the text content
    pub fn with_screenshot(mut self, screenshot_base64: impl Into<String>) -> Self {
        self.screenshot = Some(screenshot_base64.into());
        self
    }

    /// Abort the operation when this token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Website content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Response language
    pub fn language(&self) -> Language {
        self.language
    }

    /// Base64 screenshot, if any
    pub fn screenshot(&self) -> Option<&str> {
        self.screenshot.as_deref()
    }

    /// Cancellation token, if any
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

/// Request to generate an image-generation prompt
#[derive(Debug, Clone)]
pub struct PromptRequest {
    trend: String,
    brand: BrandData,
    events: Vec<String>,
    trendy_suggestions: bool,
    language: Language,
    cancellation: Option<CancellationToken>,
}

impl PromptRequest {
    /// Create a request for a trend in the context of a brand
    pub fn new(trend: impl Into<String>, brand: BrandData) -> Self {
        Self {
            trend: trend.into(),
            brand,
            events: Vec::new(),
            trendy_suggestions: false,
            language: Language::default(),
            cancellation: None,
        }
    }

    /// Set the events or festivals the prompt should reference
    pub fn with_events(mut self, events: Vec<String>) -> Self {
        self.events = events;
        self
    }

    /// Ask for currently popular visual elements to be worked in
    pub fn with_trendy_suggestions(mut self, enabled: bool) -> Self {
        self.trendy_suggestions = enabled;
        self
    }

    /// Set the response language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Abort the operation when this token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Trend name
    pub fn trend(&self) -> &str {
        &self.trend
    }

    /// Brand context
    pub fn brand(&self) -> &BrandData {
        &self.brand
    }

    /// Selected events
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Whether trendy suggestions were requested
    pub fn trendy_suggestions(&self) -> bool {
        self.trendy_suggestions
    }

    /// Response language
    pub fn language(&self) -> Language {
        self.language
    }

    /// Cancellation token, if any
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

/// Request for trend suggestions
#[derive(Debug, Clone, Default)]
pub struct TrendsRequest {
    brand: Option<BrandData>,
    language: Language,
    cancellation: Option<CancellationToken>,
}

impl TrendsRequest {
    /// Create a request without brand context
    pub fn new() -> Self {
        Self::default()
    }

    /// Tailor suggestions to a brand
    pub fn with_brand(mut self, brand: BrandData) -> Self {
        self.brand = Some(brand);
        self
    }

    /// Set the response language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Abort the operation when this token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Brand context, if any
    pub fn brand(&self) -> Option<&BrandData> {
        self.brand.as_ref()
    }

    /// Response language
    pub fn language(&self) -> Language {
        self.language
    }

    /// Cancellation token, if any
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

/// Request to audit a rendered design against a brand
#[derive(Debug, Clone)]
pub struct DesignAuditRequest {
    image: String,
    brand: BrandData,
    language: Language,
    screen_image: bool,
    cancellation: Option<CancellationToken>,
}

impl DesignAuditRequest {
    /// Create a request from a base64 design image and brand guidelines
    pub fn new(image_base64: impl Into<String>, brand: BrandData) -> Self {
        Self {
            image: image_base64.into(),
            brand,
            language: Language::default(),
            screen_image: false,
            cancellation: None,
        }
    }

    /// Set the response language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Abort the operation when this token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Run the design image through the image safety checks before auditing
    pub fn with_image_screening(mut self, enabled: bool) -> Self {
        self.screen_image = enabled;
        self
    }

    /// Base64 design image
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Whether the design image is screened before auditing
    pub fn screens_image(&self) -> bool {
        self.screen_image
    }

    /// Brand guidelines
    pub fn brand(&self) -> &BrandData {
        &self.brand
    }

    /// Response language
    pub fn language(&self) -> Language {
        self.language
    }

    /// Cancellation token, if any
    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

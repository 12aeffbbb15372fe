// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! LLM-backed brand identity tooling
//!
//! This crate wraps a hosted, OpenAI-compatible chat-completion API (Groq by
//! default) and exposes four operations for design tools:
//!
//! - [`BrandKit::extract_brand_identity`]: colors, voice and design guidelines
//!   from website text or a screenshot
//! - [`BrandKit::generate_firefly_prompt`]: an image-generation prompt for a
//!   trend in a brand's style
//! - [`BrandKit::get_viral_trends`]: current design trends and upcoming events
//! - [`BrandKit::analyze_design`]: a scored audit of a design against a brand
//!
//! # Architecture
//!
//! - [`model`]: wire types and the [`ChatModel`] seam with its HTTP client
//! - [`retry`]: error classification and exponential backoff with jitter
//! - [`cache`]: time-to-live response cache keyed by request fingerprints
//! - [`safety`]: layered content-safety gate (word list, optional local
//!   classifiers, model fallback)
//! - [`validation`]: parsing and normalization of model output
//! - [`prompts`]: prompt construction
//! - [`config`]: layered settings from files and environment
//! - [`error`]: error types
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use brand_kit::{BrandIdentityRequest, BrandKit, BrandKitConfig, Language};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BrandKitConfig::load()?;
//! let brand_kit = BrandKit::from_config(&config)?;
//!
//! let request = BrandIdentityRequest::new("Acme builds reusable rockets for everyone.")
//!     .with_language(Language::Spanish);
//! let brand = brand_kit.extract_brand_identity(request).await?;
//!
//! println!("Primary colors: {}", brand.primary_colors.join(", "));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod prompts;
pub mod retry;
pub mod safety;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use cache::{CacheKey, CacheStats, ResponseCache};
pub use client::{BrandKit, BrandKitBuilder};
pub use config::BrandKitConfig;
pub use error::{BrandKitError, BrandKitResult, ClassifiedError, ModelError, Operation};
pub use model::{ChatModel, CompletionRequest, GroqClient};
pub use retry::{Retrier, RetryPolicy};
pub use safety::{
    ClassifierLoader, ImageClassifier, LazyClassifier, SafetyGate, TextClassifier, Verdict,
};
pub use types::{
    BrandData, BrandIdentityRequest, DesignAuditRequest, Language, PromptRequest, Spacing, Trend,
    TrendsRequest, Typography, VisionAnalysis,
};
pub use tokio_util::sync::CancellationToken;

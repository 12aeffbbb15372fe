// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Command line arguments and command dispatch

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use brand_kit::{
    BrandData, BrandIdentityRequest, BrandKit, BrandKitConfig, DesignAuditRequest, Language,
    PromptRequest, TrendsRequest,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Brand identity extraction and design auditing
#[derive(Debug, Parser)]
#[command(name = "brand-kit", version, about)]
pub struct Cli {
    /// Extra configuration file, layered over `brand-kit.*` in the working
    /// directory
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Output language
    #[arg(
        long,
        short,
        global = true,
        env = "BRAND_KIT_LANGUAGE",
        default_value = "en",
        value_parser = ["en", "es", "fr"]
    )]
    pub language: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available operations
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract a brand identity from website text or a screenshot
    Brand(BrandArgs),
    /// Generate an image-generation prompt for a trend
    Prompt(PromptArgs),
    /// Suggest current design trends and upcoming events
    Trends(TrendsArgs),
    /// Score a design image against a brand identity
    Audit(AuditArgs),
}

#[derive(Debug, Args)]
pub struct BrandArgs {
    /// Website text
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,
    /// File holding website text
    #[arg(long)]
    pub content_file: Option<PathBuf>,
    /// PNG screenshot of the website
    #[arg(long)]
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PromptArgs {
    /// Trend to build the prompt around
    #[arg(long)]
    pub trend: String,
    /// Brand identity JSON, as printed by `brand-kit brand`
    #[arg(long)]
    pub brand: PathBuf,
    /// Event to tie the prompt to; repeatable
    #[arg(long = "event")]
    pub events: Vec<String>,
    /// Blend in currently popular visual elements
    #[arg(long)]
    pub trendy: bool,
}

#[derive(Debug, Args)]
pub struct TrendsArgs {
    /// Brand identity JSON to tailor the suggestions to
    #[arg(long)]
    pub brand: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// JPEG design image
    #[arg(long)]
    pub image: PathBuf,
    /// Brand identity JSON
    #[arg(long)]
    pub brand: PathBuf,
    /// Screen the design image for explicit content before the audit
    #[arg(long)]
    pub screen_image: bool,
}

impl Cli {
    /// Requested output language
    pub fn language(&self) -> Language {
        Language::from_code(&self.language)
    }
}

/// Run the selected command and return its result as JSON
pub async fn run(cli: Cli, cancellation: CancellationToken) -> Result<Value> {
    let config = BrandKitConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let brand_kit = BrandKit::from_config(&config)?;
    let language = cli.language();
    debug!(?language, configured = brand_kit.is_configured(), "client ready");

    match cli.command {
        Command::Brand(args) => {
            let content = match (args.content, args.content_file) {
                (Some(content), _) => content,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => String::new(),
            };
            ensure!(
                !content.trim().is_empty() || args.screenshot.is_some(),
                "Provide --content, --content-file or --screenshot"
            );

            let mut request = BrandIdentityRequest::new(content)
                .with_language(language)
                .with_cancellation(cancellation);
            if let Some(path) = args.screenshot {
                request = request.with_screenshot(read_image(&path).await?);
            }

            let brand = brand_kit.extract_brand_identity(request).await?;
            info!(colors = brand.primary_colors.len(), "brand identity extracted");
            Ok(serde_json::to_value(brand)?)
        }
        Command::Prompt(args) => {
            let brand = read_brand(&args.brand).await?;
            let request = PromptRequest::new(args.trend, brand)
                .with_events(args.events)
                .with_trendy_suggestions(args.trendy)
                .with_language(language)
                .with_cancellation(cancellation);

            let prompt = brand_kit.generate_firefly_prompt(request).await?;
            Ok(json!({ "prompt": prompt.trim() }))
        }
        Command::Trends(args) => {
            let mut request = TrendsRequest::new()
                .with_language(language)
                .with_cancellation(cancellation);
            if let Some(path) = args.brand {
                request = request.with_brand(read_brand(&path).await?);
            }

            let trends = brand_kit.get_viral_trends(request).await?;
            info!(count = trends.len(), "trends received");
            Ok(serde_json::to_value(trends)?)
        }
        Command::Audit(args) => {
            let brand = read_brand(&args.brand).await?;
            let image = read_image(&args.image).await?;
            let request = DesignAuditRequest::new(image, brand)
                .with_image_screening(args.screen_image)
                .with_language(language)
                .with_cancellation(cancellation);

            let analysis = brand_kit.analyze_design(request).await?;
            info!(score = analysis.score, "design audited");
            Ok(serde_json::to_value(analysis)?)
        }
    }
}

/// Read an image file as base64
pub async fn read_image(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    ensure!(!bytes.is_empty(), "Image {} is empty", path.display());
    Ok(BASE64.encode(bytes))
}

/// Read a brand identity JSON file
pub async fn read_brand(path: &Path) -> Result<BrandData> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read brand file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid brand identity in {}", path.display()))
}

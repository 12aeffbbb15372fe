// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! The brand-kit client and its four operations
//!
//! [`BrandKit`] owns the model handle, the retrier, the safety gate and the
//! response cache. Build one per process and share it; every operation takes
//! `&self`.

use std::{
    fmt,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, field, info, instrument, warn};
use uuid::Uuid;

use crate::{
    cache::{CacheKey, CacheStats, DEFAULT_TTL, ResponseCache},
    config::BrandKitConfig,
    error::{BrandKitError, BrandKitResult, Operation},
    model::{
        ChatMessage, ChatModel, CompletionRequest, ContentPart, DEFAULT_TEXT_MODEL,
        DEFAULT_VISION_MODEL, GroqClient,
    },
    prompts,
    retry::{Retrier, RetryPolicy},
    safety::{
        ClassifierLoader, DEFAULT_IMAGE_EXPLICIT_THRESHOLD, ImageClassifier, LazyClassifier,
        SafetyGate, TextClassifier,
    },
    types::{
        BrandData, BrandIdentityRequest, DesignAuditRequest, PromptRequest, Trend, TrendsRequest,
        VisionAnalysis,
    },
    validation::{
        parse_brand_data, parse_json, parse_trends, strip_code_fences, string_entries,
        validate_prompt_output, vision_analysis_from_value,
    },
};

/// A cached operation result
#[derive(Debug, Clone)]
enum CachedResponse {
    Brand(BrandData),
    Design(VisionAnalysis),
}

/// Builder for [`BrandKit`]
pub struct BrandKitBuilder {
    model: Option<Arc<dyn ChatModel>>,
    text_model: String,
    vision_model: String,
    retry_policy: RetryPolicy,
    cache_ttl: Duration,
    classifiers_enabled: bool,
    text_classifier: Option<Arc<dyn ClassifierLoader<dyn TextClassifier>>>,
    image_classifier: Option<Arc<dyn ClassifierLoader<dyn ImageClassifier>>>,
    image_threshold: f32,
}

impl BrandKitBuilder {
    fn new() -> Self {
        Self {
            model: None,
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            retry_policy: RetryPolicy::default(),
            cache_ttl: DEFAULT_TTL,
            classifiers_enabled: false,
            text_classifier: None,
            image_classifier: None,
            image_threshold: DEFAULT_IMAGE_EXPLICIT_THRESHOLD,
        }
    }

    /// Set the chat model
    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the text and vision model identifiers
    pub fn models(mut self, text_model: impl Into<String>, vision_model: impl Into<String>) -> Self {
        self.text_model = text_model.into();
        self.vision_model = vision_model.into();
        self
    }

    /// Set the retry policy
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the default cache time-to-live
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Declare whether the host can run local classifiers
    pub fn classifiers_enabled(mut self, enabled: bool) -> Self {
        self.classifiers_enabled = enabled;
        self
    }

    /// Loader for the local text classifier
    pub fn text_classifier(
        mut self,
        loader: Arc<dyn ClassifierLoader<dyn TextClassifier>>,
    ) -> Self {
        self.text_classifier = Some(loader);
        self
    }

    /// Loader for the local image classifier
    pub fn image_classifier(
        mut self,
        loader: Arc<dyn ClassifierLoader<dyn ImageClassifier>>,
    ) -> Self {
        self.image_classifier = Some(loader);
        self
    }

    /// Probability above which a local image prediction rejects
    pub fn image_threshold(mut self, threshold: f32) -> Self {
        self.image_threshold = threshold;
        self
    }

    /// Build the client
    pub fn build(self) -> BrandKit {
        let text_classifier = self.text_classifier.map_or_else(LazyClassifier::disabled, |l| {
            LazyClassifier::new(l, self.classifiers_enabled)
        });
        let image_classifier = self
            .image_classifier
            .map_or_else(LazyClassifier::disabled, |l| {
                LazyClassifier::new(l, self.classifiers_enabled)
            });

        let gate = SafetyGate::new(
            self.model.clone(),
            self.text_model.clone(),
            self.vision_model.clone(),
        )
        .with_text_classifier(text_classifier)
        .with_image_classifier(image_classifier)
        .with_image_threshold(self.image_threshold);

        BrandKit {
            model: self.model,
            text_model: self.text_model,
            vision_model: self.vision_model,
            retrier: Retrier::new(self.retry_policy),
            gate,
            cache: ResponseCache::with_ttl(self.cache_ttl),
        }
    }
}

impl fmt::Debug for BrandKitBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrandKitBuilder")
            .field("has_model", &self.model.is_some())
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("retry_policy", &self.retry_policy)
            .field("cache_ttl", &self.cache_ttl)
            .field("classifiers_enabled", &self.classifiers_enabled)
            .finish_non_exhaustive()
    }
}

/// Brand identity extraction, prompt generation, trend suggestions and
/// design audits on top of a hosted chat model
pub struct BrandKit {
    model: Option<Arc<dyn ChatModel>>,
    text_model: String,
    vision_model: String,
    retrier: Retrier,
    gate: SafetyGate,
    cache: ResponseCache<CachedResponse>,
}

impl BrandKit {
    /// Start building a client
    pub fn builder() -> BrandKitBuilder {
        BrandKitBuilder::new()
    }

    /// Builder preconfigured from settings
    ///
    /// Without an API key no model is attached: operations fail with
    /// [`BrandKitError::NotConfigured`] and model-based moderation is skipped.
    pub fn builder_from_config(config: &BrandKitConfig) -> BrandKitResult<BrandKitBuilder> {
        config.validate()?;

        let mut builder = Self::builder()
            .models(config.api.text_model.clone(), config.api.vision_model.clone())
            .retry_policy(config.retry.policy())
            .cache_ttl(config.cache.ttl())
            .classifiers_enabled(config.safety.classifiers_enabled)
            .image_threshold(config.safety.image_explicit_threshold);

        if config.api.is_configured() {
            let client = GroqClient::new(
                &config.api.api_key,
                Some(config.api.base_url.clone()),
                config.api.timeout_seconds,
            )?;
            builder = builder.model(Arc::new(client));
        } else {
            warn!("no API key configured, model-backed operations are unavailable");
        }

        Ok(builder)
    }

    /// Create a client from settings
    pub fn from_config(config: &BrandKitConfig) -> BrandKitResult<Self> {
        Ok(Self::builder_from_config(config)?.build())
    }

    /// Whether a model is attached
    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// The content safety gate, for screening caller-supplied content
    pub fn safety(&self) -> &SafetyGate {
        &self.gate
    }

    /// Response cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached response
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop stale cached responses, returning how many were removed
    pub fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired()
    }

    /// Derive brand colors, voice and design guidelines from website content
    /// or a screenshot
    ///
    /// Results are cached by language, input kind and a fingerprint of the
    /// input.
    #[instrument(
        skip(self, request),
        fields(
            language = %request.language(),
            with_screenshot = request.screenshot().is_some(),
            request_id
        )
    )]
    pub async fn extract_brand_identity(
        &self,
        request: BrandIdentityRequest,
    ) -> BrandKitResult<BrandData> {
        self.guarded(
            Operation::BrandAnalysis,
            request.cancellation(),
            self.brand_identity(&request),
        )
        .await
    }

    /// Generate an image-generation prompt for a trend in a brand's style
    #[instrument(skip(self, request), fields(language = %request.language(), trend = %request.trend(), request_id))]
    pub async fn generate_firefly_prompt(&self, request: PromptRequest) -> BrandKitResult<String> {
        self.guarded(
            Operation::PromptGeneration,
            request.cancellation(),
            self.firefly_prompt(&request),
        )
        .await
    }

    /// Suggest current design trends, content themes and upcoming events
    #[instrument(skip(self, request), fields(language = %request.language(), with_brand = request.brand().is_some(), request_id))]
    pub async fn get_viral_trends(&self, request: TrendsRequest) -> BrandKitResult<Vec<Trend>> {
        self.guarded(
            Operation::TrendAnalysis,
            request.cancellation(),
            self.viral_trends(&request),
        )
        .await
    }

    /// Score a design image against brand guidelines
    ///
    /// Results are cached by language, a fingerprint of the image and the brand
    /// colors.
    #[instrument(skip(self, request), fields(language = %request.language(), request_id))]
    pub async fn analyze_design(
        &self,
        request: DesignAuditRequest,
    ) -> BrandKitResult<VisionAnalysis> {
        self.guarded(
            Operation::DesignAnalysis,
            request.cancellation(),
            self.design_analysis(&request),
        )
        .await
    }

    /// Run an operation body, racing it against the cancellation token and
    /// prefixing any failure with the operation name
    async fn guarded<T>(
        &self,
        operation: Operation,
        cancellation: Option<&CancellationToken>,
        work: impl Future<Output = BrandKitResult<T>>,
    ) -> BrandKitResult<T> {
        let request_id = Uuid::new_v4();
        Span::current().record("request_id", field::display(request_id));
        let start_time = Instant::now();

        let result = match cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => Err(BrandKitError::Cancelled),
                    result = work => result,
                }
            }
            None => work.await,
        };

        let duration_ms = start_time.elapsed().as_millis();
        match &result {
            Ok(_) => info!(
                request_id = %request_id,
                operation = %operation,
                duration_ms,
                "Operation completed"
            ),
            Err(e) if e.is_cancelled() => info!(
                request_id = %request_id,
                operation = %operation,
                duration_ms,
                "Operation cancelled"
            ),
            Err(e) => warn!(
                request_id = %request_id,
                operation = %operation,
                duration_ms,
                error = %e,
                "Operation failed"
            ),
        }

        result.map_err(|e| e.in_operation(operation))
    }

    fn require_model(&self) -> BrandKitResult<&Arc<dyn ChatModel>> {
        self.model.as_ref().ok_or_else(BrandKitError::not_configured)
    }

    /// Invoke the model through the retrier
    async fn call(&self, request: CompletionRequest) -> BrandKitResult<String> {
        let model = self.require_model()?;
        debug!(model = %request.model, has_image = request.has_image(), "invoking model");

        let answer = self
            .retrier
            .run(|| {
                let model = Arc::clone(model);
                let request = request.clone();
                async move { model.complete(request).await }
            })
            .await?;

        Ok(answer)
    }

    /// Invoke the model and strip code fences from the answer
    async fn invoke(&self, request: CompletionRequest) -> BrandKitResult<String> {
        let raw = self.call(request).await?;
        Ok(strip_code_fences(&raw))
    }

    async fn brand_identity(&self, request: &BrandIdentityRequest) -> BrandKitResult<BrandData> {
        let key = CacheKey::brand(request.language(), request.screenshot(), request.content());
        if let Some(CachedResponse::Brand(brand)) = self.cache.get(&key) {
            debug!(key = %key, "brand analysis served from cache");
            return Ok(brand);
        }

        let language = request.language();
        let model_request = match request.screenshot() {
            Some(screenshot) => CompletionRequest::new(
                self.vision_model.clone(),
                vec![
                    ChatMessage::system(prompts::BRAND_SYSTEM_PROMPT),
                    ChatMessage::user_parts(vec![
                        ContentPart::text(prompts::brand_from_screenshot(language)),
                        ContentPart::image("image/png", screenshot),
                    ]),
                ],
            ),
            None => CompletionRequest::new(
                self.text_model.clone(),
                vec![
                    ChatMessage::system(prompts::BRAND_SYSTEM_PROMPT),
                    ChatMessage::user(prompts::brand_from_text(request.content(), language)),
                ],
            ),
        }
        .with_temperature(0.1)
        .with_max_tokens(1024)
        .with_json_response();

        let cleaned = self.invoke(model_request).await?;
        let brand = parse_brand_data(or_empty(&cleaned, "{}"), request.screenshot())?;

        self.cache.insert(key, CachedResponse::Brand(brand.clone()));
        Ok(brand)
    }

    async fn firefly_prompt(&self, request: &PromptRequest) -> BrandKitResult<String> {
        let prompt = prompts::firefly(
            request.trend(),
            request.brand(),
            request.events(),
            request.trendy_suggestions(),
            request.language(),
        );
        let model_request =
            CompletionRequest::new(self.text_model.clone(), vec![ChatMessage::user(prompt)])
                .with_temperature(0.2)
                .with_max_tokens(200);

        let raw = self.call(model_request).await?;

        validate_prompt_output(&raw)?;
        self.gate.check_text(&raw, "firefly prompt").await?;
        Ok(raw)
    }

    async fn viral_trends(&self, request: &TrendsRequest) -> BrandKitResult<Vec<Trend>> {
        let today = Local::now().date_naive();
        let prompt = prompts::trends(request.brand(), request.language(), today);
        let model_request =
            CompletionRequest::new(self.text_model.clone(), vec![ChatMessage::user(prompt)])
                .with_temperature(0.3)
                .with_max_tokens(1024);

        let cleaned = self.invoke(model_request).await?;
        self.gate.check_text(&cleaned, "trends response").await?;

        let trends = parse_trends(or_empty(&cleaned, "[]"))?;
        for trend in &trends {
            self.gate.check_text(&trend.name, "trend name").await?;
            self.gate
                .check_text(&trend.desc, "trend description")
                .await?;
        }

        if trends.is_empty() {
            return Err(BrandKitError::validation("Invalid trends response"));
        }

        Ok(trends)
    }

    async fn design_analysis(&self, request: &DesignAuditRequest) -> BrandKitResult<VisionAnalysis> {
        // Screened requests are screened even when the analysis is cached
        if request.screens_image() {
            self.gate.check_image(request.image(), "design image").await?;
        }

        let brand = request.brand();
        let key = CacheKey::design(request.language(), request.image(), &brand.primary_colors);
        if let Some(CachedResponse::Design(analysis)) = self.cache.get(&key) {
            debug!(key = %key, "design analysis served from cache");
            return Ok(analysis);
        }

        let mut parts = vec![
            ContentPart::text(prompts::design_audit(brand, request.language())),
            ContentPart::image("image/jpeg", request.image()),
        ];
        if let Some(screenshot) = &brand.website_screenshot {
            parts.push(ContentPart::image("image/jpeg", screenshot));
        }

        let model_request = CompletionRequest::new(
            self.vision_model.clone(),
            vec![
                ChatMessage::system(prompts::DESIGN_SYSTEM_PROMPT),
                ChatMessage::user_parts(parts),
            ],
        )
        .with_temperature(0.2)
        .with_max_tokens(1500);

        let cleaned = self.invoke(model_request).await?;
        self.gate
            .check_text(&cleaned, "design analysis response")
            .await?;

        let value = parse_json(or_empty(&cleaned, "{}"))?;
        for feedback in string_entries(value.get("feedback")) {
            if !feedback.trim().is_empty() {
                self.gate.check_text(&feedback, "design feedback").await?;
            }
        }
        for recommendation in string_entries(value.get("recommendations")) {
            if !recommendation.trim().is_empty() {
                self.gate
                    .check_text(&recommendation, "design recommendation")
                    .await?;
            }
        }

        let analysis = vision_analysis_from_value(&value)?;
        self.cache.insert(key, CachedResponse::Design(analysis.clone()));
        Ok(analysis)
    }
}

impl fmt::Debug for BrandKit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrandKit")
            .field("has_model", &self.model.is_some())
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("retrier", &self.retrier)
            .field("gate", &self.gate)
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}

/// Empty model output parses as the given empty document
fn or_empty<'a>(cleaned: &'a str, empty: &'a str) -> &'a str {
    if cleaned.is_empty() { empty } else { cleaned }
}

// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Layered content-safety checks for text and images
//!
//! Text passes through a lexical block-list, an optional local classifier and
//! a model-based classifier, in that order. Images skip the lexical layer. The
//! first layer that positively rejects the content wins.
//!
//! The gate fails open: a layer that cannot reach a verdict (classifier not
//! available, model call failed, unparseable answer) yields
//! [`Verdict::Indeterminate`], which permits the content.

use std::{
    fmt,
    sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::{
    error::{BrandKitError, BrandKitResult},
    model::{ChatMessage, ChatModel, CompletionRequest, ContentPart},
    validation::strip_code_fences,
};

/// Default probability above which a local image prediction rejects
pub const DEFAULT_IMAGE_EXPLICIT_THRESHOLD: f32 = 0.75;

/// Label the local text classifier reports explicit content under
pub const SEXUAL_EXPLICIT_LABEL: &str = "sexual_explicit";

const TEXT_MODERATION_PROMPT: &str = r#"You are a content safety filter. Return only valid JSON: { "explicit": boolean, "confidence": 0-100 }"#;
const IMAGE_MODERATION_PROMPT: &str = r#"You are an image safety classifier. Return only valid JSON: { "explicit": boolean, "confidence": 0-100 }"#;

static EXPLICIT_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(porn|sex|nude|nudes|xxx|fuck|shit|bitch|cunt|rape|incest|fetish)\b")
        .expect("explicit word regex is valid")
});

static EXPLICIT_IMAGE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)porn|sex|sexy").expect("image class regex is valid"));

/// Outcome of one safety layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The layer positively allowed the content
    Allowed,
    /// The layer positively rejected the content
    Rejected {
        /// Why the content was rejected
        reason: String,
    },
    /// The layer could not decide
    Indeterminate,
}

impl Verdict {
    /// Create a rejection
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Whether the content may pass; only a rejection blocks it
    pub fn permits(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// A single label prediction from a local text classifier
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrediction {
    /// Label name, e.g. `sexual_explicit`
    pub label: String,
    /// Whether the label's threshold was met
    pub matched: bool,
    /// Probability of the label
    pub probability: f32,
}

/// A single class prediction from a local image classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePrediction {
    /// Class name, e.g. `Porn`
    pub class_name: String,
    /// Probability of the class
    pub probability: f32,
}

/// Local text classifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Predict labels for a piece of text
    async fn classify(&self, text: &str) -> anyhow::Result<Vec<TextPrediction>>;
}

/// Local image classifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Predict classes for a base64 encoded image
    async fn classify(&self, image_base64: &str) -> anyhow::Result<Vec<ImagePrediction>>;
}

/// Loads a classifier on first use
#[async_trait]
pub trait ClassifierLoader<T: ?Sized + Send + Sync>: Send + Sync {
    /// Load the classifier
    async fn load(&self) -> anyhow::Result<Arc<T>>;
}

/// A classifier that is loaded at most once, on first use
///
/// Concurrent first callers share one pending load. A failed load is
/// remembered and the classifier stays unavailable for the lifetime of this
/// value.
pub struct LazyClassifier<T: ?Sized + Send + Sync> {
    enabled: bool,
    loader: Option<Arc<dyn ClassifierLoader<T>>>,
    cell: OnceCell<Option<Arc<T>>>,
}

impl<T: ?Sized + Send + Sync> LazyClassifier<T> {
    /// A classifier that never loads
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            loader: None,
            cell: OnceCell::new(),
        }
    }

    /// A classifier loaded through `loader` when `enabled` is set
    ///
    /// `enabled` is the host's statement that it can run local models.
    pub fn new(loader: Arc<dyn ClassifierLoader<T>>, enabled: bool) -> Self {
        Self {
            enabled,
            loader: Some(loader),
            cell: OnceCell::new(),
        }
    }

    /// Whether loading may be attempted
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.loader.is_some()
    }

    /// Whether a load has finished, successfully or not
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// The loaded classifier, loading it on first use
    pub async fn get(&self) -> Option<Arc<T>> {
        if !self.enabled {
            return None;
        }
        let loader = self.loader.as_ref()?;

        self.cell
            .get_or_init(|| async {
                match loader.load().await {
                    Ok(classifier) => {
                        debug!("local classifier loaded");
                        Some(classifier)
                    }
                    Err(e) => {
                        warn!(error = %e, "local classifier failed to load, continuing without it");
                        None
                    }
                }
            })
            .await
            .clone()
    }
}

impl<T: ?Sized + Send + Sync> Default for LazyClassifier<T> {
    fn default() -> Self {
        Self::disabled()
    }
}

impl<T: ?Sized + Send + Sync> fmt::Debug for LazyClassifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyClassifier")
            .field("enabled", &self.enabled)
            .field("has_loader", &self.loader.is_some())
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ModerationAnswer {
    #[serde(default)]
    explicit: bool,
    #[serde(default)]
    confidence: Option<Value>,
}

/// Layered text and image safety checks
pub struct SafetyGate {
    model: Option<Arc<dyn ChatModel>>,
    text_model: String,
    vision_model: String,
    text_classifier: LazyClassifier<dyn TextClassifier>,
    image_classifier: LazyClassifier<dyn ImageClassifier>,
    image_threshold: f32,
}

impl SafetyGate {
    /// Create a gate; without a model the fallback layer is indeterminate
    pub fn new(
        model: Option<Arc<dyn ChatModel>>,
        text_model: impl Into<String>,
        vision_model: impl Into<String>,
    ) -> Self {
        Self {
            model,
            text_model: text_model.into(),
            vision_model: vision_model.into(),
            text_classifier: LazyClassifier::disabled(),
            image_classifier: LazyClassifier::disabled(),
            image_threshold: DEFAULT_IMAGE_EXPLICIT_THRESHOLD,
        }
    }

    /// Use a local text classifier
    pub fn with_text_classifier(mut self, classifier: LazyClassifier<dyn TextClassifier>) -> Self {
        self.text_classifier = classifier;
        self
    }

    /// Use a local image classifier
    pub fn with_image_classifier(
        mut self,
        classifier: LazyClassifier<dyn ImageClassifier>,
    ) -> Self {
        self.image_classifier = classifier;
        self
    }

    /// Set the probability above which a local image prediction rejects
    pub fn with_image_threshold(mut self, threshold: f32) -> Self {
        self.image_threshold = threshold;
        self
    }

    /// Reject text that any layer classifies as explicit
    ///
    /// # Errors
    ///
    /// Returns [`BrandKitError::ContentRejected`] carrying `label` and the
    /// rejecting layer's reason.
    pub async fn check_text(&self, text: &str, label: &str) -> BrandKitResult<()> {
        Self::enforce(self.text_verdict(text).await, label)
    }

    /// Reject a base64 image that any layer classifies as explicit
    ///
    /// # Errors
    ///
    /// Returns [`BrandKitError::ContentRejected`] carrying `label` and the
    /// rejecting layer's reason.
    pub async fn check_image(&self, image_base64: &str, label: &str) -> BrandKitResult<()> {
        Self::enforce(self.image_verdict(image_base64).await, label)
    }

    /// Combined verdict of all text layers
    pub async fn text_verdict(&self, text: &str) -> Verdict {
        if text.is_empty() {
            return Verdict::Allowed;
        }

        let lexical = lexical_verdict(text);
        if !lexical.permits() {
            return lexical;
        }

        let local = self.local_text_verdict(text).await;
        if !local.permits() {
            return local;
        }

        self.model_text_verdict(text).await
    }

    /// Combined verdict of all image layers
    pub async fn image_verdict(&self, image_base64: &str) -> Verdict {
        if image_base64.is_empty() {
            return Verdict::Allowed;
        }

        let local = self.local_image_verdict(image_base64).await;
        if !local.permits() {
            return local;
        }

        self.model_image_verdict(image_base64).await
    }

    fn enforce(verdict: Verdict, label: &str) -> BrandKitResult<()> {
        match verdict {
            Verdict::Rejected { reason } => {
                warn!(label, reason = %reason, "content rejected by safety gate");
                Err(BrandKitError::rejected(label, reason))
            }
            Verdict::Allowed | Verdict::Indeterminate => Ok(()),
        }
    }

    async fn local_text_verdict(&self, text: &str) -> Verdict {
        let Some(classifier) = self.text_classifier.get().await else {
            return Verdict::Indeterminate;
        };

        match classifier.classify(text).await {
            Ok(predictions) => {
                let explicit = predictions
                    .iter()
                    .any(|p| p.label == SEXUAL_EXPLICIT_LABEL && p.matched);
                if explicit {
                    Verdict::rejected("sexual/explicit content detected (client-side)")
                } else {
                    Verdict::Allowed
                }
            }
            Err(e) => {
                debug!(error = %e, "local text classifier failed, verdict indeterminate");
                Verdict::Indeterminate
            }
        }
    }

    async fn local_image_verdict(&self, image_base64: &str) -> Verdict {
        let Some(classifier) = self.image_classifier.get().await else {
            return Verdict::Indeterminate;
        };

        match classifier.classify(image_base64).await {
            Ok(predictions) => {
                let explicit = predictions.iter().any(|p| {
                    EXPLICIT_IMAGE_CLASS.is_match(&p.class_name)
                        && p.probability > self.image_threshold
                });
                if explicit {
                    Verdict::rejected("image likely explicit (client-side)")
                } else {
                    Verdict::Allowed
                }
            }
            Err(e) => {
                debug!(error = %e, "local image classifier failed, verdict indeterminate");
                Verdict::Indeterminate
            }
        }
    }

    async fn model_text_verdict(&self, text: &str) -> Verdict {
        let request = CompletionRequest::new(
            self.text_model.clone(),
            vec![
                ChatMessage::system(TEXT_MODERATION_PROMPT),
                ChatMessage::user(format!(
                    "Classify whether the following text is explicit/adult content. \
Return ONLY JSON.\n\n{text}"
                )),
            ],
        );
        self.ask_model(request).await
    }

    async fn model_image_verdict(&self, image_base64: &str) -> Verdict {
        let request = CompletionRequest::new(
            self.vision_model.clone(),
            vec![
                ChatMessage::system(IMAGE_MODERATION_PROMPT),
                ChatMessage::user_parts(vec![
                    ContentPart::text(
                        "Classify whether the following image contains explicit/adult \
content. Return ONLY JSON.",
                    ),
                    ContentPart::image("image/jpeg", image_base64),
                ]),
            ],
        );
        self.ask_model(request).await
    }

    async fn ask_model(&self, request: CompletionRequest) -> Verdict {
        let Some(model) = &self.model else {
            debug!("no model configured, moderation verdict indeterminate");
            return Verdict::Indeterminate;
        };

        let request = request.with_temperature(0.0).with_max_tokens(50);
        match model.complete(request).await {
            Ok(answer) => parse_moderation_answer(&answer),
            Err(e) => {
                debug!(error = %e, "moderation call failed, verdict indeterminate");
                Verdict::Indeterminate
            }
        }
    }
}

impl fmt::Debug for SafetyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetyGate")
            .field("has_model", &self.model.is_some())
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("text_classifier", &self.text_classifier)
            .field("image_classifier", &self.image_classifier)
            .field("image_threshold", &self.image_threshold)
            .finish()
    }
}

/// Whole-word block-list check
pub fn lexical_verdict(text: &str) -> Verdict {
    if EXPLICIT_WORDS.is_match(text) {
        Verdict::rejected("explicit content detected")
    } else {
        Verdict::Allowed
    }
}

fn parse_moderation_answer(answer: &str) -> Verdict {
    let cleaned = strip_code_fences(answer);
    if cleaned.is_empty() {
        debug!("empty moderation answer, verdict indeterminate");
        return Verdict::Indeterminate;
    }

    match serde_json::from_str::<ModerationAnswer>(&cleaned) {
        Ok(ModerationAnswer {
            explicit: true,
            confidence,
        }) => {
            #[allow(clippy::cast_possible_truncation)]
            let confidence = confidence
                .as_ref()
                .and_then(Value::as_f64)
                .map_or(0, |c| c.round() as i64);
            Verdict::rejected(format!("explicit content detected (confidence {confidence})"))
        }
        Ok(_) => Verdict::Allowed,
        Err(e) => {
            debug!(error = %e, "unparseable moderation answer, verdict indeterminate");
            Verdict::Indeterminate
        }
    }
}

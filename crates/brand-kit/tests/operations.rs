// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the four `BrandKit` operations
//!
//! A wiremock server stands in for the chat-completion API; moderation calls
//! are answered separately from operation calls.

use brand_kit::{
    BrandIdentityRequest, BrandKit, BrandKitConfig, DesignAuditRequest, Language, Operation,
    PromptRequest, TrendsRequest, model::DEFAULT_VISION_MODEL,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, body_string_contains, method, path},
};

use fixtures::*;

/// Brand analysis is normalized and served from cache on repeat
#[tokio::test]
async fn brand_identity_is_normalized_and_cached() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_partial_json(json!({
            "temperature": 0.1,
            "max_tokens": 1024,
            "response_format": { "type": "json_object" }
        })))
        .and(body_string_contains("Apollo outfitters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&format!(
            "```json\n{}\n```",
            brand_analysis_json()
        ))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = BrandIdentityRequest::new("Apollo outfitters: gear for the next frontier");
    let brand = kit.extract_brand_identity(request.clone()).await.unwrap();

    assert_eq!(
        brand.primary_colors,
        vec!["#0B3D91", "#FC3D21", "#FFFFFF", "#1C1C1C", "#A7A9AC"]
    );
    assert_eq!(brand.design_guidelines.len(), 4);
    assert_eq!(
        brand
            .typography
            .as_ref()
            .and_then(|t| t.primary_font.as_deref()),
        Some("Helvetica Neue")
    );
    assert!(brand.spacing.is_none());
    assert_eq!(brand.layout_patterns.as_ref().map(Vec::len), Some(2));

    let cached = kit.extract_brand_identity(request).await.unwrap();
    assert_eq!(cached, brand);

    let stats = kit.cache_stats();
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.cache_hits, 1);
}

/// A different language is a different cache entry
#[tokio::test]
async fn brand_cache_is_keyed_by_language() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);
    mount_answer(&mock_server, &brand_analysis_json(), 2).await;

    let request = BrandIdentityRequest::new("Apollo outfitters");
    kit.extract_brand_identity(request.clone()).await.unwrap();
    kit.extract_brand_identity(request.with_language(Language::Spanish))
        .await
        .unwrap();

    assert_eq!(kit.cache_stats().entry_count, 2);
}

/// Design scores default and feedback is capped
#[tokio::test]
async fn design_analysis_applies_defaults() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);
    mount_clean_moderation(&mock_server).await;

    let answer = json!({
        "score": 71.6,
        "colorConsistency": 88,
        "typographyScale": -4,
        "spacingRhythm": "63",
        "feedback": [
            "Headline contrast is strong",
            "Logo lacks clear space",
            "Accent red overused",
            "Body copy is small",
            "Grid alignment drifts",
            "Imagery fits the voice",
            "Footer is crowded"
        ],
        "recommendations": ["Increase body size to 16px", 42]
    })
    .to_string();

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_partial_json(json!({ "model": DEFAULT_VISION_MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&answer)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let analysis = kit
        .analyze_design(DesignAuditRequest::new("/9j/4AAQSkZJRgABAQ", sample_brand()))
        .await
        .unwrap();

    assert_eq!(analysis.score, 72);
    assert_eq!(analysis.color_consistency, 88);
    assert_eq!(analysis.typography_scale, 0);
    assert_eq!(analysis.spacing_rhythm, 63);
    assert_eq!(analysis.accessibility, 50);
    assert_eq!(analysis.feedback.len(), 5);
    assert_eq!(analysis.feedback[0], "Headline contrast is strong");
    assert_eq!(analysis.recommendations, vec!["Increase body size to 16px"]);
}

/// A design answer flagged by the moderation model is rejected
#[tokio::test]
async fn design_feedback_flagged_by_model_is_rejected() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_string_contains("safety"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"explicit": true, "confidence": 91}"#)),
        )
        .mount(&mock_server)
        .await;
    mount_answer(&mock_server, r#"{"score": 40, "feedback": ["Suggestive pose"]}"#, 1).await;

    let error = kit
        .analyze_design(DesignAuditRequest::new("/9j/4AAQ", sample_brand()))
        .await
        .unwrap_err();

    assert!(error.is_content_rejection());
    assert_eq!(error.operation(), Some(Operation::DesignAnalysis));
    assert_eq!(
        error.to_string(),
        "Design analysis failed: design analysis response rejected: explicit content detected (confidence 91)"
    );
    assert_eq!(kit.cache_stats().entry_count, 0);
}

/// Image screening runs even when the design analysis is already cached
#[tokio::test]
async fn screened_design_is_checked_before_the_cache() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_string_contains("image safety classifier"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"explicit": true, "confidence": 99}"#)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_clean_moderation(&mock_server).await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_partial_json(json!({ "model": DEFAULT_VISION_MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"score": 70}"#)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = DesignAuditRequest::new("/9j/4AAQSkZJRgABAQ", sample_brand());
    let analysis = assert_ok!(kit.analyze_design(request.clone()).await);
    assert_eq!(analysis.score, 70);
    assert_eq!(kit.cache_stats().entry_count, 1);

    let error = assert_err!(kit.analyze_design(request.with_image_screening(true)).await);
    assert!(error.is_content_rejection());
    assert_eq!(
        error.to_string(),
        "Design analysis failed: design image rejected: explicit content detected (confidence 99)"
    );
    assert_eq!(kit.cache_stats().cache_hits, 0);
}

/// Authentication failures are reported once, without retries
#[tokio::test]
async fn unauthorized_is_not_retried() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(provider_error("Invalid API Key")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = kit
        .extract_brand_identity(BrandIdentityRequest::new("Apollo outfitters"))
        .await
        .unwrap_err();

    assert!(error.is_auth_error());
    assert!(!error.is_retryable());
    assert_eq!(
        error.to_string(),
        "Brand analysis failed: API key is invalid or expired. Please check your settings."
    );
}

/// A completion without choices is read as empty output and sent once
#[tokio::test]
async fn empty_choices_are_not_retried() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = kit
        .extract_brand_identity(BrandIdentityRequest::new("Apollo outfitters"))
        .await
        .unwrap_err();

    assert!(error.is_validation_error());
    assert!(!error.is_retryable());
    assert_eq!(
        error.to_string(),
        "Brand analysis failed: Invalid brand analysis: missing or insufficient primary colors"
    );
}

/// An undecodable completion envelope fails after a single request
#[tokio::test]
async fn undecodable_completion_is_not_retried() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>bad gateway</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = kit
        .extract_brand_identity(BrandIdentityRequest::new("Apollo outfitters"))
        .await
        .unwrap_err();

    assert!(!error.is_retryable());
    assert!(
        error
            .to_string()
            .starts_with("Brand analysis failed: invalid completion payload:")
    );
}

/// Server errors are retried until the attempt budget runs out
#[tokio::test]
async fn server_errors_exhaust_attempts() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let error = kit
        .generate_firefly_prompt(PromptRequest::new("Retro futurism", sample_brand()))
        .await
        .unwrap_err();

    assert!(error.is_retryable());
    assert_eq!(
        error.to_string(),
        "Firefly prompt generation failed: Server error. Please try again in a few moments."
    );
}

/// A transient failure followed by success yields the result
#[tokio::test]
async fn recovers_after_rate_limit() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);
    mount_clean_moderation(&mock_server).await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_answer(
        &mock_server,
        "Astronaut silhouette against a coral sunrise, wide shot, grainy film look.",
        1,
    )
    .await;

    let prompt = kit
        .generate_firefly_prompt(
            PromptRequest::new("Retro futurism", sample_brand())
                .with_events(vec!["World Space Week".to_string()]),
        )
        .await
        .unwrap();

    assert!(prompt.starts_with("Astronaut silhouette"));
}

/// Events and the trendy hint are part of the prompt request
#[tokio::test]
async fn prompt_request_carries_events() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);
    mount_clean_moderation(&mock_server).await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_string_contains("Tie it to these events: Diwali, Halloween"))
        .and(body_string_contains("currently popular visual elements"))
        .and(body_partial_json(json!({ "temperature": 0.2, "max_tokens": 200 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Glowing paper lanterns over a midnight skyline, brand navy and coral accents.",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let prompt = kit
        .generate_firefly_prompt(
            PromptRequest::new("Festival lights", sample_brand())
                .with_events(vec!["Diwali".to_string(), "Halloween".to_string()])
                .with_trendy_suggestions(true),
        )
        .await
        .unwrap();

    assert!(prompt.contains("paper lanterns"));
}

/// Trends are parsed after every text passes the safety gate
#[tokio::test]
async fn viral_trends_are_returned() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);
    mount_clean_moderation(&mock_server).await;

    let answer = json!([
        { "id": "y2k-chrome", "name": "Y2K Chrome", "desc": "Liquid metal type and gradients" },
        { "id": "diwali", "name": "Diwali", "desc": "Festival of lights, Nov 1" }
    ])
    .to_string();
    mount_answer(&mock_server, &format!("```json\n{answer}\n```"), 1).await;

    let trends = assert_ok!(
        kit.get_viral_trends(TrendsRequest::new().with_brand(sample_brand()))
            .await
    );

    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0].id, "y2k-chrome");
    assert_eq!(trends[1].name, "Diwali");
}

/// Explicit words in the trend list reject the whole response
#[tokio::test]
async fn explicit_trends_are_rejected() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);
    mount_clean_moderation(&mock_server).await;

    let answer = json!([
        { "id": "soft-focus", "name": "Soft focus", "desc": "Dreamy blur" },
        { "id": "nude-tones", "name": "Nude palettes", "desc": "Skin-tone neutrals" }
    ])
    .to_string();
    mount_answer(&mock_server, &answer, 1).await;

    let error = kit
        .get_viral_trends(TrendsRequest::new())
        .await
        .unwrap_err();

    assert!(error.is_content_rejection());
    assert_eq!(
        error.to_string(),
        "Trend analysis failed: trends response rejected: explicit content detected"
    );
}

/// Entries missing a field fail the whole trend list
#[tokio::test]
async fn incomplete_trend_is_a_validation_error() {
    let mock_server = MockServer::start().await;
    let kit = test_kit(&mock_server);
    mount_clean_moderation(&mock_server).await;
    mount_answer(&mock_server, r#"[{"id": "a", "name": "Bauhaus revival"}]"#, 1).await;

    let error = kit
        .get_viral_trends(TrendsRequest::new())
        .await
        .unwrap_err();

    assert!(error.is_validation_error());
    assert!(
        error
            .to_string()
            .starts_with("Trend analysis failed: malformed model output")
    );
}

/// Without a key nothing is sent and every operation reports the missing key
#[tokio::test]
async fn missing_key_is_reported() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server);
    config.api.api_key = String::new();
    let kit = BrandKit::from_config(&config).unwrap();
    assert!(!kit.is_configured());

    let error = assert_err!(
        kit.analyze_design(DesignAuditRequest::new("/9j/4AAQ", sample_brand()))
            .await
    );
    assert_eq!(
        error.to_string(),
        "Design analysis failed: API key not configured. Set your API key in the configuration."
    );
}

/// Default configuration targets the hosted API
#[test]
fn default_config_targets_hosted_api() {
    let config = BrandKitConfig::default();
    assert_eq!(
        config.api.base_url.as_str(),
        "https://api.groq.com/openai/v1/"
    );
    assert!(!config.api.is_configured());
}

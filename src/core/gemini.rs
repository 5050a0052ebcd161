use crate::core::normalizer::normalize;
use crate::domain::model::{ClassificationPayload, ClassificationRequest, ClassificationResult};
use crate::domain::ports::{Classifier, ConfigProvider};
use crate::utils::error::{ClassifyError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub const CLASSIFICATION_PROMPT: &str = r#"Analyze this image and classify what type of electronic waste (e-waste) it is.

Return a JSON object with the following fields:
{
  "primary": {
    "category": "Category name",
    "confidence": 95,
    "image": "📱",
    "description": "Brief description of the item"
  },
  "alternatives": [
    { "category": "Alternative 1", "confidence": 80 },
    { "category": "Alternative 2", "confidence": 65 }
  ],
  "recycling": {
    "recommendations": "Specific recycling recommendations",
    "environmental_impact": "Brief description of environmental impact"
  }
}

Only return the JSON response."#;

const API_KEY_HEADER: &str = "x-goog-api-key";

// generateContent 請求/回應結構（只描述用得到的欄位）

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Gemini 多模態分類客戶端
///
/// 設定在建構時由呼叫端傳入，金鑰缺少時不報錯，直到 [`GeminiClassifier::classify`]
/// 才回傳設定錯誤（不會發出任何網路請求）。
pub struct GeminiClassifier {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl GeminiClassifier {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self::with_client(client, config))
    }

    pub fn with_client<C: ConfigProvider>(client: Client, config: &C) -> Self {
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.api_base_url().trim_end_matches('/'),
            config.model()
        );

        Self {
            client,
            api_key: config.api_key().map(str::to_string),
            endpoint,
            model: config.model().to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 送出單一請求並回傳正規化後的結果；任何錯誤都轉成 `Failure`
    pub async fn classify(
        &self,
        encoded_image: &str,
        mime_type: &str,
        cancel: &CancellationToken,
    ) -> ClassificationResult {
        match self.try_classify(encoded_image, mime_type, cancel).await {
            Ok(data) => {
                tracing::info!(
                    "✅ Classified as '{}' ({}%)",
                    data.primary.category,
                    data.primary.confidence
                );
                ClassificationResult::Success { data }
            }
            Err(e) => {
                tracing::error!("❌ Gemini classification error: {}", e);
                ClassificationResult::from(e)
            }
        }
    }

    async fn try_classify(
        &self,
        encoded_image: &str,
        mime_type: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassificationPayload> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ClassifyError::config(
                "Gemini API key is not configured. Please set GEMINI_API_KEY.",
            )
        })?;

        if encoded_image.is_empty() || mime_type.is_empty() {
            return Err(ClassifyError::PreconditionError {
                message: "Image data or MIME type is missing.".to_string(),
            });
        }

        if cancel.is_cancelled() {
            return Err(ClassifyError::CancelledError);
        }

        let raw_text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClassifyError::CancelledError),
            text = self.generate(api_key, encoded_image, mime_type) => text?,
        };

        if cancel.is_cancelled() {
            return Err(ClassifyError::CancelledError);
        }

        normalize(&raw_text)
    }

    async fn generate(&self, api_key: &str, encoded_image: &str, mime_type: &str) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: CLASSIFICATION_PROMPT,
                    },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type,
                            data: encoded_image,
                        },
                    },
                ],
            }],
        };

        tracing::debug!(
            "📡 Sending {} ({} base64 chars) to model {}",
            mime_type,
            encoded_image.len(),
            self.model
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("📡 Gemini response status: {}", status);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(ClassifyError::remote(Some(status.as_u16()), message));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("request blocked: {}", r))
            .unwrap_or_else(|| "response contained no candidates".to_string());
        return Err(ClassifyError::remote(None, reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(ClassifyError::remote(
            None,
            format!("response contained no text (finish reason: {})", reason),
        ));
    }

    Ok(text)
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
        cancel: &CancellationToken,
    ) -> ClassificationResult {
        GeminiClassifier::classify(self, &request.encoded_image, &request.mime_type, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FailureKind, RecyclingInfo};
    use httpmock::prelude::*;
    use std::time::Duration;

    const MODEL_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

    struct MockConfig {
        api_key: Option<String>,
        base_url: String,
    }

    impl MockConfig {
        fn new(base_url: String) -> Self {
            Self {
                api_key: Some("test-key".to_string()),
                base_url,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_key(&self) -> Option<&str> {
            self.api_key.as_deref()
        }

        fn api_base_url(&self) -> &str {
            &self.base_url
        }

        fn model(&self) -> &str {
            "gemini-1.5-flash"
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    fn model_reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn test_classify_success_with_fenced_reply() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path(MODEL_PATH)
                .header("x-goog-api-key", "test-key")
                .body_contains("\"inlineData\"")
                .body_contains("\"mimeType\":\"image/png\"")
                .body_contains("\"data\":\"aGVsbG8=\"")
                .body_contains("electronic waste");
            then.status(200).json_body(model_reply(
                "```json\n{\"primary\": {\"category\": \"Mobile Phone\", \"confidence\": 94, \"image\": \"📱\"}, \"alternatives\": [{\"category\": \"Tablet\", \"confidence\": 78}]}\n```",
            ));
        });

        let classifier = GeminiClassifier::new(&MockConfig::new(server.base_url())).unwrap();
        let result = classifier
            .classify("aGVsbG8=", "image/png", &CancellationToken::new())
            .await;

        api_mock.assert();
        let payload = result.payload().expect("success");
        assert_eq!(payload.primary.category, "Mobile Phone");
        assert_eq!(payload.primary.confidence, 94);
        assert_eq!(payload.alternatives.len(), 1);
        assert_eq!(payload.recycling, RecyclingInfo::default());
    }

    #[tokio::test]
    async fn test_reply_split_across_parts_is_joined() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200).json_body(serde_json::json!({
                "candidates": [{
                    "content": {"parts": [
                        {"text": "{\"primary\": {\"category\": \"Keyboard\","},
                        {"text": " \"confidence\": 81}}"}
                    ]}
                }]
            }));
        });

        let classifier = GeminiClassifier::new(&MockConfig::new(server.base_url())).unwrap();
        let result = classifier
            .classify("aGVsbG8=", "image/jpeg", &CancellationToken::new())
            .await;

        api_mock.assert();
        assert_eq!(result.payload().unwrap().primary.category, "Keyboard");
    }

    #[tokio::test]
    async fn test_missing_api_key_makes_no_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200).json_body(model_reply("{}"));
        });

        let mut config = MockConfig::new(server.base_url());
        config.api_key = None;
        let classifier = GeminiClassifier::new(&config).unwrap();
        let result = classifier
            .classify("aGVsbG8=", "image/png", &CancellationToken::new())
            .await;

        api_mock.assert_hits(0);
        match result {
            ClassificationResult::Failure { kind, error } => {
                assert_eq!(kind, FailureKind::Configuration);
                assert!(error.contains("API key is not configured"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_arguments_fail_precondition() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200).json_body(model_reply("{}"));
        });

        let classifier = GeminiClassifier::new(&MockConfig::new(server.base_url())).unwrap();
        let cancel = CancellationToken::new();

        let no_image = classifier.classify("", "image/png", &cancel).await;
        let no_mime = classifier.classify("aGVsbG8=", "", &cancel).await;

        api_mock.assert_hits(0);
        assert_eq!(no_image.failure_kind(), Some(FailureKind::Precondition));
        assert_eq!(no_mime.failure_kind(), Some(FailureKind::Precondition));
    }

    #[tokio::test]
    async fn test_service_error_becomes_failure() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(403).json_body(serde_json::json!({
                "error": {"code": 403, "message": "API key not valid. Please pass a valid API key.", "status": "PERMISSION_DENIED"}
            }));
        });

        let classifier = GeminiClassifier::new(&MockConfig::new(server.base_url())).unwrap();
        let result = classifier
            .classify("aGVsbG8=", "image/png", &CancellationToken::new())
            .await;

        api_mock.assert();
        match result {
            ClassificationResult::Failure { kind, error } => {
                assert_eq!(kind, FailureKind::Remote);
                assert!(error.contains("API key not valid"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_without_body() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(500);
        });

        let classifier = GeminiClassifier::new(&MockConfig::new(server.base_url())).unwrap();
        let result = classifier
            .classify("aGVsbG8=", "image/png", &CancellationToken::new())
            .await;

        api_mock.assert();
        assert_eq!(result.failure_kind(), Some(FailureKind::Remote));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_remote_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200)
                .json_body(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        });

        let classifier = GeminiClassifier::new(&MockConfig::new(server.base_url())).unwrap();
        let result = classifier
            .classify("aGVsbG8=", "image/png", &CancellationToken::new())
            .await;

        match result {
            ClassificationResult::Failure { kind, error } => {
                assert_eq!(kind, FailureKind::Remote);
                assert!(error.contains("SAFETY"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prose_reply_is_parse_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200)
                .json_body(model_reply("Sorry, I cannot help with that image."));
        });

        let classifier = GeminiClassifier::new(&MockConfig::new(server.base_url())).unwrap();
        let result = classifier
            .classify("aGVsbG8=", "image/png", &CancellationToken::new())
            .await;

        assert!(!result.is_success());
        assert_eq!(result.failure_kind(), Some(FailureKind::Parse));
    }

    #[tokio::test]
    async fn test_cancel_during_request() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(model_reply("{}"));
        });

        let classifier = GeminiClassifier::new(&MockConfig::new(server.base_url())).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result = classifier.classify("aGVsbG8=", "image/png", &cancel).await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Cancelled));
    }

    #[tokio::test]
    async fn test_timeout_is_remote_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(model_reply("{}"));
        });

        let config = MockConfig::new(server.base_url());
        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let classifier = GeminiClassifier::with_client(client, &config);
        let result = classifier
            .classify("aGVsbG8=", "image/png", &CancellationToken::new())
            .await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Remote));
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash() {
        let classifier =
            GeminiClassifier::new(&MockConfig::new("https://example.com/".to_string())).unwrap();
        assert_eq!(
            classifier.endpoint(),
            "https://example.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}

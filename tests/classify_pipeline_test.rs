use ewaste_classifier::core::encoder::decode;
use ewaste_classifier::{
    ClassificationPipeline, ClassificationResult, ClassifierConfig, FailureKind,
    GeminiClassifier, ImageAsset, LocalStorage, RecyclingInfo,
};
use httpmock::prelude::*;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const MODEL_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

/// 2KB 的 PNG：檔頭加填充
fn png_bytes() -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.resize(2048, 0xAB);
    data
}

fn write_image(dir: &TempDir, name: &str, data: &[u8]) -> ImageAsset {
    std::fs::write(dir.path().join(name), data).unwrap();
    let mime = if name.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };
    ImageAsset::new(name, mime, data.len() as u64)
}

fn config_for(server: &MockServer, api_key: Option<&str>) -> ClassifierConfig {
    ClassifierConfig {
        api_key: api_key.map(str::to_string),
        api_base_url: server.base_url(),
        ..ClassifierConfig::default()
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
async fn test_end_to_end_png_classification() {
    let temp_dir = TempDir::new().unwrap();
    let data = png_bytes();
    let asset = write_image(&temp_dir, "phone.png", &data);

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path(MODEL_PATH)
            .header("x-goog-api-key", "integration-key")
            .body_contains("\"mimeType\":\"image/png\"");
        then.status(200).json_body(model_reply(
            r#"{"primary":{"category":"Mobile Phone","confidence":94}}"#,
        ));
    });

    let classifier =
        GeminiClassifier::new(&config_for(&server, Some("integration-key"))).unwrap();
    let pipeline = ClassificationPipeline::new(LocalStorage::new(temp_dir.path()), classifier);

    let result = pipeline.run(Some(&asset), &CancellationToken::new()).await;

    api_mock.assert();
    match result {
        ClassificationResult::Success { data } => {
            assert_eq!(data.primary.category, "Mobile Phone");
            assert_eq!(data.primary.confidence, 94);
            assert!(data.alternatives.is_empty());
            assert_eq!(data.recycling, RecyclingInfo::default());
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_request_carries_exact_image_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let data = png_bytes();
    let asset = write_image(&temp_dir, "phone.png", &data);

    let server = MockServer::start();
    let encoded = base64_of(&data);
    let expected_fragment = format!("\"data\":\"{}\"", encoded);
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path(MODEL_PATH)
            .body_contains(expected_fragment.as_str());
        then.status(200).json_body(model_reply("{}"));
    });

    let classifier = GeminiClassifier::new(&config_for(&server, Some("k"))).unwrap();
    let pipeline = ClassificationPipeline::new(LocalStorage::new(temp_dir.path()), classifier);

    let result = pipeline.run(Some(&asset), &CancellationToken::new()).await;

    api_mock.assert();
    assert!(result.is_success());
    assert_eq!(decode(&encoded).unwrap(), data);
}

#[tokio::test]
async fn test_missing_api_key_makes_zero_network_calls() {
    let temp_dir = TempDir::new().unwrap();
    let asset = write_image(&temp_dir, "phone.png", &png_bytes());

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(model_reply("{}"));
    });

    let classifier = GeminiClassifier::new(&config_for(&server, None)).unwrap();
    let pipeline = ClassificationPipeline::new(LocalStorage::new(temp_dir.path()), classifier);

    let result = pipeline.run(Some(&asset), &CancellationToken::new()).await;

    api_mock.assert_hits(0);
    match result {
        ClassificationResult::Failure { kind, error } => {
            assert_eq!(kind, FailureKind::Configuration);
            assert!(error.starts_with("Configuration error"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_file_never_reaches_service() {
    let temp_dir = TempDir::new().unwrap();
    let data = vec![0u8; 4 * 1024 * 1024 + 1];
    let asset = write_image(&temp_dir, "huge.jpg", &data);

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(model_reply("{}"));
    });

    let classifier = GeminiClassifier::new(&config_for(&server, Some("k"))).unwrap();
    let pipeline = ClassificationPipeline::new(LocalStorage::new(temp_dir.path()), classifier);

    let result = pipeline.run(Some(&asset), &CancellationToken::new()).await;

    api_mock.assert_hits(0);
    match result {
        ClassificationResult::Failure { kind, error } => {
            assert_eq!(kind, FailureKind::Validation);
            assert!(error.contains("4MB"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unparseable_reply_is_failure_not_partial_success() {
    let temp_dir = TempDir::new().unwrap();
    let asset = write_image(&temp_dir, "phone.png", &png_bytes());

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(200)
            .json_body(model_reply("This looks like a phone, but I am not sure."));
    });

    let classifier = GeminiClassifier::new(&config_for(&server, Some("k"))).unwrap();
    let pipeline = ClassificationPipeline::new(LocalStorage::new(temp_dir.path()), classifier);

    let result = pipeline.run(Some(&asset), &CancellationToken::new()).await;

    api_mock.assert();
    assert!(result.payload().is_none());
    assert_eq!(result.failure_kind(), Some(FailureKind::Parse));
}

#[tokio::test]
async fn test_service_unavailable_is_remote_failure() {
    let temp_dir = TempDir::new().unwrap();
    let asset = write_image(&temp_dir, "phone.png", &png_bytes());

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path(MODEL_PATH);
        then.status(503).json_body(serde_json::json!({
            "error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}
        }));
    });

    let classifier = GeminiClassifier::new(&config_for(&server, Some("k"))).unwrap();
    let pipeline = ClassificationPipeline::new(LocalStorage::new(temp_dir.path()), classifier);

    let result = pipeline.run(Some(&asset), &CancellationToken::new()).await;

    // 不自動重試
    api_mock.assert_hits(1);
    match result {
        ClassificationResult::Failure { kind, error } => {
            assert_eq!(kind, FailureKind::Remote);
            assert!(error.contains("The model is overloaded."));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

fn base64_of(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

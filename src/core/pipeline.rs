use crate::core::encoder::encode;
use crate::core::validator::validate;
use crate::domain::model::{ClassificationRequest, ClassificationResult, ImageAsset};
use crate::domain::ports::{Classifier, Storage};
use crate::utils::error::ClassifyError;
use tokio_util::sync::CancellationToken;

/// 單次分類流程：驗證 → 編碼 → 遠端分類（含正規化），依序執行
pub struct ClassificationPipeline<S: Storage, C: Classifier> {
    storage: S,
    classifier: C,
}

impl<S: Storage, C: Classifier> ClassificationPipeline<S, C> {
    pub fn new(storage: S, classifier: C) -> Self {
        Self {
            storage,
            classifier,
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// 每個階段的錯誤都轉成 `Failure`，不會往外丟
    pub async fn run(
        &self,
        file: Option<&ImageAsset>,
        cancel: &CancellationToken,
    ) -> ClassificationResult {
        if cancel.is_cancelled() {
            return ClassifyError::CancelledError.into();
        }

        // Validate
        let validation = validate(file);
        let Some(file) = file.filter(|_| validation.valid) else {
            let message = validation
                .error
                .unwrap_or_else(|| "Invalid file".to_string());
            tracing::warn!("⚠️ Rejected upload: {}", message);
            return ClassifyError::validation(message).into();
        };
        tracing::info!("🖼️ Classifying '{}' ({}, {} bytes)", file.name, file.mime_type, file.size);

        // Encode
        let encoded_image = match encode(&self.storage, file, cancel).await {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!("❌ Could not prepare '{}': {}", file.name, e);
                return e.into();
            }
        };

        // Classify
        let request = ClassificationRequest::new(encoded_image, file.mime_type.clone());
        self.classifier.classify(&request, cancel).await
    }
}

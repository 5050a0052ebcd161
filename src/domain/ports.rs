use crate::domain::model::{ClassificationRequest, ClassificationResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 影像內容來源（本機檔案、測試用記憶體等）
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// `None` 表示未設定金鑰
    fn api_key(&self) -> Option<&str>;
    fn api_base_url(&self) -> &str;
    fn model(&self) -> &str;
    fn timeout(&self) -> Duration;
}

/// 遠端分類服務。永遠回傳 [`ClassificationResult`]，不會把錯誤往外丟。
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        request: &ClassificationRequest,
        cancel: &CancellationToken,
    ) -> ClassificationResult;
}

use crate::core::ConfigProvider;
use crate::utils::error::{ClassifyError, Result};
use crate::utils::validation::{validate_model_name, validate_range, validate_url, Validate};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"];
pub const TIMEOUT_VAR: &str = "GEMINI_TIMEOUT_SECONDS";

/// 分類客戶端設定，啟動時建立一次後以參考傳給 [`GeminiClassifier`](crate::core::gemini::GeminiClassifier)
#[derive(Clone)]
pub struct ClassifierConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

// 金鑰不可出現在日誌
impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl ClassifierConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 以任意查詢函式取得變數，方便測試時不動到行程環境
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|name| normalize_api_key(lookup(name)));

        let timeout_seconds = match lookup(TIMEOUT_VAR) {
            Some(raw) => raw.trim().parse().map_err(|_| ClassifyError::InvalidConfigValueError {
                field: TIMEOUT_VAR.to_string(),
                value: raw.clone(),
                reason: "Expected a whole number of seconds".to_string(),
            })?,
            None => DEFAULT_TIMEOUT_SECONDS,
        };

        Ok(Self {
            api_key,
            api_base_url: lookup("GEMINI_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_seconds,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// 空白或未替換的 `${VAR}` 視為未設定
pub fn normalize_api_key(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || (trimmed.starts_with("${") && trimmed.ends_with('}')) {
        return None;
    }
    Some(trimmed.to_string())
}

impl ConfigProvider for ClassifierConfig {
    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Validate for ClassifierConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_base_url", &self.api_base_url)?;
        validate_model_name("model", &self.model)?;
        validate_range("timeout_seconds", self.timeout_seconds, 1, MAX_TIMEOUT_SECONDS)?;

        if !self.has_api_key() {
            // 金鑰缺少在分類時才回報為設定錯誤
            tracing::warn!("⚠️ No Gemini API key configured; classification will fail");
        }

        tracing::debug!("✅ Classifier configuration validation passed");
        Ok(())
    }
}

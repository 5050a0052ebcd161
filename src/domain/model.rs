use serde::{Deserialize, Deserializer, Serialize};

/// 使用者選擇的影像檔案描述（名稱、宣告的 MIME 類型、大小）
///
/// 實際內容透過 [`Storage`](crate::domain::ports::Storage) 讀取，只存活於單次分類流程。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

impl ImageAsset {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub encoded_image: String,
    pub mime_type: String,
}

impl ClassificationRequest {
    pub fn new(encoded_image: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            encoded_image: encoded_image.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub category: String,
    /// 0..=100
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Candidate {
    pub fn unknown_device() -> Self {
        Self {
            category: "Unknown Electronic Device".to_string(),
            confidence: 50,
            image: Some("🔌".to_string()),
            description: Some("Could not properly identify this device.".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecyclingInfo {
    pub recommendations: String,
    pub environmental_impact: String,
}

impl Default for RecyclingInfo {
    fn default() -> Self {
        Self {
            recommendations: "Please take this device to a certified e-waste recycling center."
                .to_string(),
            environmental_impact:
                "Improper disposal can lead to toxic materials leaching into soil and water."
                    .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationPayload {
    pub primary: Candidate,
    pub alternatives: Vec<Candidate>,
    pub recycling: RecyclingInfo,
}

/// 模型回應的寬鬆結構：所有欄位皆可缺，補預設值後才轉成 [`ClassificationPayload`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialPayload {
    #[serde(default)]
    pub primary: Option<PartialCandidate>,
    #[serde(default)]
    pub alternatives: Option<Vec<PartialCandidate>>,
    #[serde(default)]
    pub recycling: Option<PartialRecycling>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialCandidate {
    #[serde(default, deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialRecycling {
    #[serde(default, deserialize_with = "lenient_text")]
    pub recommendations: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub environmental_impact: Option<String>,
}

impl From<PartialCandidate> for Candidate {
    fn from(partial: PartialCandidate) -> Self {
        Self {
            category: partial.category.unwrap_or_default(),
            confidence: clamp_confidence(partial.confidence.unwrap_or(0.0)),
            image: partial.image,
            description: partial.description,
        }
    }
}

impl From<PartialRecycling> for RecyclingInfo {
    fn from(partial: PartialRecycling) -> Self {
        Self {
            recommendations: partial.recommendations.unwrap_or_default(),
            environmental_impact: partial.environmental_impact.unwrap_or_default(),
        }
    }
}

pub fn clamp_confidence(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

// 模型偶爾把信心值寫成字串 ("94") 或加上百分號
fn lenient_confidence<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    })
}

// 建議事項常以字串陣列回傳，以換行串接；其他型別視為缺值
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Array(items)) => {
            let lines: Vec<&str> = items.iter().filter_map(serde_json::Value::as_str).collect();
            if lines.is_empty() {
                None
            } else {
                Some(lines.join("\n"))
            }
        }
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Encoding,
    Configuration,
    Precondition,
    Remote,
    Parse,
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Encoding => "encoding",
            Self::Configuration => "configuration",
            Self::Precondition => "precondition",
            Self::Remote => "remote",
            Self::Parse => "parse",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationResult {
    Success { data: ClassificationPayload },
    Failure { kind: FailureKind, error: String },
}

impl ClassificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn payload(&self) -> Option<&ClassificationPayload> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<crate::utils::error::ClassifyError> for ClassificationResult {
    fn from(error: crate::utils::error::ClassifyError) -> Self {
        Self::Failure {
            kind: error.category(),
            error: error.to_string(),
        }
    }
}

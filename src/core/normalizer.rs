use crate::domain::model::{
    Candidate, ClassificationPayload, PartialPayload, RecyclingInfo,
};
use crate::utils::error::{ClassifyError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// ParseError 附帶的原始文字上限（字元數）
pub const RAW_TEXT_PREVIEW_CHARS: usize = 200;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?i:json)\s*(.*?)\s*```").unwrap());

// 語言標籤只有在後面緊接換行時才略過
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:[A-Za-z0-9_+-]+[ \t]*\r?\n)?(.*?)```").unwrap());

/// 從模型輸出取出 JSON 文字：先找 ```json 區塊，再找任意區塊，都沒有就用整段文字
pub fn extract_json_text(raw: &str) -> &str {
    let extracted = JSON_FENCE
        .captures(raw)
        .or_else(|| ANY_FENCE.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    extracted.trim()
}

/// 解析模型輸出並以欄位群組為單位補上預設值
pub fn normalize(raw: &str) -> Result<ClassificationPayload> {
    let partial = parse_partial(raw)?;
    Ok(fill_defaults(partial))
}

pub fn parse_partial(raw: &str) -> Result<PartialPayload> {
    let text = extract_json_text(raw);

    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        tracing::error!("❌ Model response is not valid JSON ({}): {}", e, preview(raw));
        ClassifyError::ParseError {
            message: e.to_string(),
            raw: preview(text),
        }
    })?;

    if !value.is_object() {
        tracing::error!("❌ Model response is not a JSON object: {}", preview(raw));
        return Err(ClassifyError::ParseError {
            message: "expected a JSON object at the top level".to_string(),
            raw: preview(text),
        });
    }

    serde_json::from_value(value).map_err(|e| {
        tracing::error!("❌ Model response has an unexpected shape ({}): {}", e, preview(raw));
        ClassifyError::ParseError {
            message: e.to_string(),
            raw: preview(text),
        }
    })
}

/// `primary`、`alternatives`、`recycling` 缺少時整組替換；已存在的群組不逐欄修補
pub fn fill_defaults(partial: PartialPayload) -> ClassificationPayload {
    let primary = match partial.primary {
        Some(primary) => Candidate::from(primary),
        None => {
            tracing::debug!("🔧 Response has no primary candidate, using default");
            Candidate::unknown_device()
        }
    };

    let alternatives = partial
        .alternatives
        .unwrap_or_default()
        .into_iter()
        .map(Candidate::from)
        .collect();

    let recycling = match partial.recycling {
        Some(recycling) => RecyclingInfo::from(recycling),
        None => {
            tracing::debug!("🔧 Response has no recycling block, using default");
            RecyclingInfo::default()
        }
    };

    ClassificationPayload {
        primary,
        alternatives,
        recycling,
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(RAW_TEXT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

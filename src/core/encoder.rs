use crate::core::validator::{ensure_valid, MAX_FILE_SIZE};
use crate::domain::model::ImageAsset;
use crate::domain::ports::Storage;
use crate::utils::error::{ClassifyError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use tokio_util::sync::CancellationToken;

const DATA_URL_SCHEME: &[u8] = b"data:";

/// 讀取影像並轉成 base64（不含 `data:` 前綴）
///
/// 先重新驗證檔案，驗證失敗就不讀取。讀取過程可被 `cancel` 中斷。
pub async fn encode<S: Storage>(
    storage: &S,
    file: &ImageAsset,
    cancel: &CancellationToken,
) -> Result<String> {
    ensure_valid(Some(file))?;

    tracing::debug!("📖 Reading image '{}' ({} bytes declared)", file.name, file.size);

    let read = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ClassifyError::CancelledError),
        read = storage.read_file(&file.name) => read,
    };

    let bytes = read.map_err(|e| {
        tracing::warn!("❌ Failed to read image '{}': {}", file.name, e);
        ClassifyError::encoding(format!("Failed to read '{}': {}", file.name, e))
    })?;

    // 宣告的大小不一定可信，以實際讀到的長度再檢查一次
    if bytes.len() as u64 > MAX_FILE_SIZE {
        return Err(ClassifyError::validation(format!(
            "File size exceeds the maximum limit of {}MB",
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }

    if bytes.is_empty() {
        return Err(ClassifyError::encoding(format!(
            "Image '{}' is empty",
            file.name
        )));
    }

    let encoded = if bytes.starts_with(DATA_URL_SCHEME) {
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| ClassifyError::encoding("Data URL is not valid UTF-8 text"))?;
        strip_data_uri_prefix(text)?.to_string()
    } else {
        BASE64_STANDARD.encode(&bytes)
    };

    tracing::debug!(
        "🔐 Encoded '{}' into {} base64 characters",
        file.name,
        encoded.len()
    );
    Ok(encoded)
}

/// 去掉 `data:<mime>;base64,` 前綴，只留下 payload
pub fn strip_data_uri_prefix(text: &str) -> Result<&str> {
    let Some(rest) = text.strip_prefix("data:") else {
        return Ok(text.trim());
    };

    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| ClassifyError::encoding("Missing comma in data URL"))?;

    if !metadata.ends_with(";base64") {
        return Err(ClassifyError::encoding(
            "Only base64 encoded data URLs are supported",
        ));
    }

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ClassifyError::encoding("Data URL carries no payload"));
    }
    decode(payload)?;
    Ok(payload)
}

pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(strip_data_uri_prefix(encoded)?)
        .map_err(|e| ClassifyError::encoding(format!("Invalid base64 payload: {}", e)))
}

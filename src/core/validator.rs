use crate::domain::model::{ImageAsset, ValidationResult};
use crate::utils::error::{ClassifyError, Result};
use std::path::Path;

/// 4 MiB
pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

pub const SUPPORTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/bmp",
];

/// 檢查檔案是否存在、大小與 MIME 類型，依序檢查，第一個失敗即回傳
pub fn validate(file: Option<&ImageAsset>) -> ValidationResult {
    let Some(file) = file else {
        return ValidationResult::invalid("No file provided");
    };

    if file.size > MAX_FILE_SIZE {
        return ValidationResult::invalid(format!(
            "File size exceeds the maximum limit of {}MB",
            MAX_FILE_SIZE / (1024 * 1024)
        ));
    }

    if !SUPPORTED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return ValidationResult::invalid(format!(
            "Unsupported file type. Please upload: {}",
            SUPPORTED_MIME_TYPES.join(", ")
        ));
    }

    ValidationResult::ok()
}

/// [`validate`] 的 `Result` 版本，供流程串接使用
pub fn ensure_valid(file: Option<&ImageAsset>) -> Result<()> {
    let result = validate(file);
    if result.valid {
        return Ok(());
    }
    Err(ClassifyError::validation(
        result.error.unwrap_or_else(|| "Invalid file".to_string()),
    ))
}

/// 由副檔名推測 MIME 類型，只認得支援的影像格式
pub fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" | "jpe" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

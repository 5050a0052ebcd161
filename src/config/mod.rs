pub mod cli;
pub mod settings;
pub mod toml_config;

pub use settings::ClassifierConfig;
pub use toml_config::{OutputFormat, TomlConfig};

#[cfg(feature = "cli")]
use crate::{
    config::{cli::LocalStorage, settings::TIMEOUT_VAR},
    core::validator::guess_mime_type,
    domain::model::ImageAsset,
    utils::error::Result,
};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "ewaste-classify")]
#[command(about = "Identify a piece of electronic waste from a photo")]
pub struct CliConfig {
    /// Image to classify (JPEG, PNG, WebP, GIF or BMP, up to 4MB)
    pub image: PathBuf,

    #[arg(long, help = "Override the MIME type guessed from the file extension")]
    pub mime_type: Option<String>,

    #[arg(long, help = "TOML config file ([classifier] and [output] sections)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Gemini model name")]
    pub model: Option<String>,

    #[arg(long, help = "Request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[arg(long, help = "Also write the JSON report to this file")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn load_file_config(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => TomlConfig::from_file(path),
            None => Ok(TomlConfig::default()),
        }
    }

    /// 優先順序：命令列參數 > 設定檔 > 環境變數 > 預設值
    pub fn classifier_config(&self, file_config: &TomlConfig) -> Result<ClassifierConfig> {
        self.classifier_config_from(file_config, |name: &str| std::env::var(name).ok())
    }

    fn classifier_config_from<F>(
        &self,
        file_config: &TomlConfig,
        lookup: F,
    ) -> Result<ClassifierConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_override = self.timeout.or(file_config.classifier.timeout_seconds);
        // 已有較高優先的逾時設定時，不解析環境變數的逾時值
        let env_config = ClassifierConfig::from_lookup(|name: &str| {
            if name == TIMEOUT_VAR && timeout_override.is_some() {
                None
            } else {
                lookup(name)
            }
        })?;
        let section = &file_config.classifier;
        let from_file = file_config.classifier_config();

        Ok(ClassifierConfig {
            api_key: from_file.api_key.or(env_config.api_key),
            api_base_url: if section.api_base_url.is_some() {
                from_file.api_base_url
            } else {
                env_config.api_base_url
            },
            model: self
                .model
                .clone()
                .or_else(|| section.model.clone())
                .unwrap_or(env_config.model),
            timeout_seconds: timeout_override.unwrap_or(env_config.timeout_seconds),
        })
    }

    pub fn output_format(&self, file_config: &TomlConfig) -> OutputFormat {
        self.format.unwrap_or_else(|| file_config.output_format())
    }

    /// 檔案不存在時回傳 `None`，交給驗證階段回報 "No file provided"
    pub fn image_asset(&self) -> (LocalStorage, Option<ImageAsset>) {
        let base = self
            .image
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        let storage = LocalStorage::new(base);

        let name = match self.image.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => return (storage, None),
        };

        let size = match std::fs::metadata(&self.image) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                tracing::warn!("⚠️ {} is not a regular file", self.image.display());
                return (storage, None);
            }
            Err(e) => {
                tracing::warn!("⚠️ Cannot access {}: {}", self.image.display(), e);
                return (storage, None);
            }
        };

        let mime_type = self
            .mime_type
            .clone()
            .or_else(|| guess_mime_type(&self.image).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        (storage, Some(ImageAsset::new(name, mime_type, size)))
    }
}

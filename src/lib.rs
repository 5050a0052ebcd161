pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::ClassificationReport;
pub use config::{cli::LocalStorage, ClassifierConfig, OutputFormat, TomlConfig};
pub use core::{gemini::GeminiClassifier, pipeline::ClassificationPipeline};
pub use domain::model::{
    Candidate, ClassificationPayload, ClassificationRequest, ClassificationResult, FailureKind,
    ImageAsset, RecyclingInfo, ValidationResult,
};
pub use utils::error::{ClassifyError, Result};

pub mod encoder;
pub mod gemini;
pub mod normalizer;
pub mod pipeline;
pub mod validator;

pub use crate::domain::model::{
    Candidate, ClassificationPayload, ClassificationRequest, ClassificationResult, FailureKind,
    ImageAsset, RecyclingInfo, ValidationResult,
};
pub use crate::domain::ports::{Classifier, ConfigProvider, Storage};
pub use crate::utils::error::Result;

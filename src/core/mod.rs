pub mod keyword_classifier;
pub mod model_classifier;
pub mod orchestrator;
pub mod taxonomy;

pub use crate::domain::model::{Category, ClassificationResult, OcrLine, RawText, Source};
pub use crate::domain::ports::CompletionService;
pub use crate::utils::error::Result;

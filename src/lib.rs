pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::ollama::OllamaClient;
pub use config::ClassifierSettings;
pub use core::{
    keyword_classifier::KeywordClassifier, model_classifier::ModelClassifier,
    orchestrator::Orchestrator, taxonomy::Taxonomy,
};
pub use domain::model::{Category, ClassificationResult, OcrLine, RawText, Source};
pub use utils::error::{ClassifierError, Result};

#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

use crate::adapters::ollama::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL, DEFAULT_TEMPERATURE};
use crate::core::taxonomy::Taxonomy;
use crate::domain::model::{Category, DEFAULT_MIN_LINE_CONFIDENCE};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MODEL_TIMEOUT_MS: u64 = 5000;
pub const MIN_MODEL_TIMEOUT_MS: u64 = 100;
pub const MAX_MODEL_TIMEOUT_MS: u64 = 120_000;

/// 設定檔與命令列合併後的最終設定
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub model_enabled: bool,
    pub model_endpoint: String,
    pub model_name: String,
    pub temperature: f32,
    pub model_timeout: Duration,
    pub min_line_confidence: f64,
    pub extra_keywords: BTreeMap<Category, Vec<String>>,
    pub replace_builtin_keywords: bool,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model_enabled: true,
            model_endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model_name: DEFAULT_OLLAMA_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            model_timeout: Duration::from_millis(DEFAULT_MODEL_TIMEOUT_MS),
            min_line_confidence: DEFAULT_MIN_LINE_CONFIDENCE,
            extra_keywords: BTreeMap::new(),
            replace_builtin_keywords: false,
        }
    }
}

impl ClassifierSettings {
    /// 沒有自訂關鍵字時直接共用內建 taxonomy
    pub fn taxonomy(&self) -> Result<Arc<Taxonomy>> {
        if self.extra_keywords.is_empty() && !self.replace_builtin_keywords {
            return Ok(Taxonomy::builtin());
        }
        Taxonomy::with_keywords(&self.extra_keywords, self.replace_builtin_keywords).map(Arc::new)
    }
}

impl Validate for ClassifierSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_endpoint("model.endpoint", &self.model_endpoint)?;
        validation::require_value("model.name", &self.model_name)?;
        validation::validate_range("model.temperature", self.temperature, 0.0, 2.0)?;
        validation::validate_range(
            "model.timeout_ms",
            self.model_timeout.as_millis() as u64,
            MIN_MODEL_TIMEOUT_MS,
            MAX_MODEL_TIMEOUT_MS,
        )?;
        validation::validate_range("ocr.min_line_confidence", self.min_line_confidence, 0.0, 1.0)?;

        // 關鍵字表本身的檢查（空表、純標點）
        self.taxonomy().map(|_| ())
    }
}

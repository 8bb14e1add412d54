use crate::config::toml_config::TomlConfig;
use crate::config::ClassifierSettings;
use crate::domain::model::{OcrLine, RawText};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::io::Read;
use std::time::Duration;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "receipt-classifier")]
#[command(about = "Classify receipt text into a tax deduction category")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Receipt text to classify
    #[arg(long, conflicts_with_all = ["file", "ocr_json"])]
    pub text: Option<String>,

    /// Plain-text file with the extracted receipt text
    #[arg(long, conflicts_with = "ocr_json")]
    pub file: Option<String>,

    /// JSON export of OCR lines: [{"text": "...", "confidence": 0.9}, ...]
    #[arg(long)]
    pub ocr_json: Option<String>,

    /// Skip the language model and use keyword matching only
    #[arg(long)]
    pub no_model: bool,

    #[arg(long)]
    pub model_endpoint: Option<String>,

    #[arg(long)]
    pub model_name: Option<String>,

    /// Model timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Check that the model server is reachable and exit
    #[arg(long)]
    pub check_model: bool,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 設定檔 → 命令列覆蓋 → 驗證
    pub fn resolve_settings(&self) -> Result<ClassifierSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?.to_settings()?
            }
            None => ClassifierSettings::default(),
        };

        if self.no_model {
            settings.model_enabled = false;
        }
        if let Some(endpoint) = &self.model_endpoint {
            settings.model_endpoint = endpoint.clone();
        }
        if let Some(name) = &self.model_name {
            settings.model_name = name.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.model_timeout = Duration::from_millis(timeout_ms);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// 依序讀取 --text、--file、--ocr-json，都沒有時讀 stdin
    pub fn read_input(&self, min_line_confidence: f64) -> Result<RawText> {
        if let Some(text) = &self.text {
            return Ok(RawText::clean(text));
        }

        if let Some(path) = &self.file {
            let content = std::fs::read_to_string(path)?;
            tracing::debug!("Read {} bytes from {}", content.len(), path);
            return Ok(RawText::clean(&content));
        }

        if let Some(path) = &self.ocr_json {
            let content = std::fs::read_to_string(path)?;
            let lines: Vec<OcrLine> = serde_json::from_str(&content)?;
            let text = RawText::from_ocr_lines(&lines, min_line_confidence);
            tracing::debug!(
                "Read {} OCR lines from {} (kept {} above confidence {})",
                lines.len(),
                path,
                text.as_str().lines().count(),
                min_line_confidence
            );
            return Ok(text);
        }

        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(RawText::clean(&content))
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("config", &self.config),
            ("file", &self.file),
            ("ocr_json", &self.ocr_json),
        ] {
            if let Some(path) = value {
                validation::validate_input_file(field, path)?;
            }
        }
        if let Some(endpoint) = &self.model_endpoint {
            validation::validate_endpoint("model_endpoint", endpoint)?;
        }
        Ok(())
    }
}

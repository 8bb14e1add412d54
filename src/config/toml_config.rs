use crate::config::ClassifierSettings;
use crate::domain::model::Category;
use crate::utils::error::{ClassifierError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub signatures: SignaturesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub name: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    pub min_line_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignaturesConfig {
    pub replace_builtin: Option<bool>,
    pub keywords: Option<BTreeMap<String, Vec<String>>>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClassifierError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ClassifierError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OLLAMA_HOST})，找不到的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    /// 套用到預設設定之上
    pub fn apply_to(&self, settings: &mut ClassifierSettings) -> Result<()> {
        if let Some(enabled) = self.model.enabled {
            settings.model_enabled = enabled;
        }
        if let Some(endpoint) = &self.model.endpoint {
            settings.model_endpoint = endpoint.clone();
        }
        if let Some(name) = &self.model.name {
            settings.model_name = name.clone();
        }
        if let Some(temperature) = self.model.temperature {
            settings.temperature = temperature;
        }
        if let Some(timeout_ms) = self.model.timeout_ms {
            settings.model_timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(min_confidence) = self.ocr.min_line_confidence {
            settings.min_line_confidence = min_confidence;
        }
        if let Some(replace) = self.signatures.replace_builtin {
            settings.replace_builtin_keywords = replace;
        }
        if let Some(keywords) = &self.signatures.keywords {
            settings.extra_keywords = parse_keyword_table(keywords)?;
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Result<ClassifierSettings> {
        let mut settings = ClassifierSettings::default();
        self.apply_to(&mut settings)?;
        Ok(settings)
    }

    pub fn model_enabled(&self) -> bool {
        self.model.enabled.unwrap_or(true)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_settings()?.validate()
    }
}

/// 類別名稱不分大小寫；同一類別出現兩次（"Travel" 與 "travel"）視為錯誤
fn parse_keyword_table(
    table: &BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<Category, Vec<String>>> {
    let mut parsed = BTreeMap::new();
    for (name, keywords) in table {
        let category = name.parse::<Category>().map_err(|message| {
            ClassifierError::ConfigValidationError {
                field: "signatures.keywords".to_string(),
                message,
            }
        })?;
        if parsed.insert(category, keywords.clone()).is_some() {
            return Err(ClassifierError::ConfigValidationError {
                field: "signatures.keywords".to_string(),
                message: format!("category '{}' is listed more than once", category),
            });
        }
    }
    Ok(parsed)
}

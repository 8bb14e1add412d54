use crate::adapters::ollama::OllamaClient;
use crate::config::ClassifierSettings;
use crate::core::keyword_classifier::KeywordClassifier;
use crate::core::model_classifier::ModelClassifier;
use crate::domain::model::{ClassificationResult, Source};
use crate::utils::error::{ClassifierError, Result};
use std::sync::Arc;
use std::time::Instant;

/// 單一請求的狀態；`Fallback` 必定走到 `Done`
enum Step<'a> {
    Start,
    TryModel(&'a ModelClassifier),
    Fallback,
    Done(ClassificationResult),
}

/// 決定每個請求走模型或關鍵字分類，並保證一定回傳結果
#[derive(Debug, Clone)]
pub struct Orchestrator {
    keyword: KeywordClassifier,
    model: Option<ModelClassifier>,
    model_enabled: bool,
}

impl Orchestrator {
    /// 只有關鍵字分類的 orchestrator
    pub fn new(keyword: KeywordClassifier) -> Self {
        Self {
            keyword,
            model: None,
            model_enabled: false,
        }
    }

    pub fn with_model(mut self, model: ModelClassifier) -> Self {
        self.model = Some(model);
        self.model_enabled = true;
        self
    }

    pub fn with_model_enabled(mut self, enabled: bool) -> Self {
        self.model_enabled = enabled;
        self
    }

    /// 啟動時建立一次，之後可在多個 task 間共用
    pub fn from_settings(settings: &ClassifierSettings) -> Result<Self> {
        let keyword = KeywordClassifier::new(settings.taxonomy()?);
        let client = OllamaClient::new(&settings.model_endpoint, &settings.model_name)
            .with_temperature(settings.temperature);
        let model = ModelClassifier::new(Arc::new(client), settings.model_timeout);

        tracing::debug!(
            "Orchestrator ready (model '{}' at {}, enabled: {}, timeout: {:?})",
            settings.model_name,
            settings.model_endpoint,
            settings.model_enabled,
            settings.model_timeout
        );

        Ok(Self::new(keyword)
            .with_model(model)
            .with_model_enabled(settings.model_enabled))
    }

    pub fn model_enabled(&self) -> bool {
        self.model_enabled && self.model.is_some()
    }

    pub fn keyword_classifier(&self) -> &KeywordClassifier {
        &self.keyword
    }

    pub async fn classify(&self, text: &str) -> ClassificationResult {
        self.classify_receipt_text(text, self.model_enabled).await
    }

    /// 永遠回傳結果，模型的任何錯誤都只會讓請求改走關鍵字分類
    pub async fn classify_receipt_text(
        &self,
        text: &str,
        model_enabled: bool,
    ) -> ClassificationResult {
        let started = Instant::now();
        let mut step = Step::Start;

        loop {
            step = match step {
                Step::Start => match &self.model {
                    Some(model) if model_enabled && !text.trim().is_empty() => {
                        Step::TryModel(model)
                    }
                    Some(_) if model_enabled => {
                        tracing::warn!("Input text is empty, skipping language model");
                        Step::Fallback
                    }
                    _ => Step::Fallback,
                },
                Step::TryModel(model) => match self.try_model(model, text).await {
                    Ok(result) => Step::Done(result),
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Model classification failed, using keyword fallback: {}",
                            e
                        );
                        Step::Fallback
                    }
                },
                Step::Fallback => Step::Done(self.keyword.classify(text)),
                Step::Done(result) => {
                    tracing::info!(
                        category = %result.category,
                        confidence = result.confidence,
                        source = ?result.source,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "✅ Receipt classified"
                    );
                    return result;
                }
            };
        }
    }

    // reqwest 的 timeout 之外再包一層，避免 service 實作忽略 timeout
    async fn try_model(&self, model: &ModelClassifier, text: &str) -> Result<ClassificationResult> {
        let timeout = model.timeout();
        let result = tokio::time::timeout(timeout, model.classify(text))
            .await
            .map_err(|_| ClassifierError::ModelTimeout { timeout })??;

        debug_assert_eq!(result.source, Source::Model);
        Ok(result)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(KeywordClassifier::default())
    }
}

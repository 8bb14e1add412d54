use crate::domain::model::{clamp_confidence, Category, ClassificationResult, Source};
use crate::domain::ports::CompletionService;
use crate::utils::error::{ClassifierError, Result};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// 模型沒有給信心值時使用
pub const DEFAULT_MODEL_CONFIDENCE: f64 = 0.75;

const MAX_RATIONALE_CHARS: usize = 200;

/// 沒有 % 符號時，大於等於這個值才當成百分比
const PERCENT_CUTOFF: f64 = 2.0;

const PROMPT_HEADER: &str = "You are an assistant specializing in US tax regulations. \
Classify the receipt text below into exactly one of the listed tax deduction categories.

Instructions:
1. Look for vendor names, item descriptions, and totals.
2. Infer the most likely business purpose of the expense.
3. Choose the single most appropriate category from the list.
4. Reply with the category name exactly as written in the list.
5. Optionally add a line `Confidence: <number between 0 and 1>`
   and a line `Reason: <short explanation>`.

Categories:
";

static CONFIDENCE_PATTERN: OnceLock<Regex> = OnceLock::new();
static RATIONALE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn confidence_pattern() -> &'static Regex {
    CONFIDENCE_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)confidence[^0-9\n]{0,20}([0-9]+(?:\.[0-9]+)?)\s*(%)?")
            .expect("confidence pattern is a valid regex")
    })
}

// 標籤後面一定要接冒號，"Reasoning:"、"Reasonable" 都不算
fn rationale_pattern() -> &'static Regex {
    RATIONALE_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*[*\-]*\s*(?:reason|rationale)\s*\**\s*:\s*\**\s*(.*)$")
            .expect("rationale pattern is a valid regex")
    })
}

/// 透過外部語言模型分類；本身不重試，重試與 fallback 由 Orchestrator 決定
#[derive(Clone)]
pub struct ModelClassifier {
    service: Arc<dyn CompletionService>,
    categories: Vec<Category>,
    timeout: Duration,
}

impl ModelClassifier {
    pub fn new(service: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            service,
            categories: Category::ALL.to_vec(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn model_name(&self) -> &str {
        self.service.model_name()
    }

    /// 只放類別名稱，不放關鍵字表
    pub fn build_prompt(&self, text: &str) -> String {
        let mut prompt = String::from(PROMPT_HEADER);
        for category in &self.categories {
            prompt.push_str("- ");
            prompt.push_str(category.as_str());
            prompt.push('\n');
        }
        prompt.push_str("\nReceipt text:\n'''\n");
        prompt.push_str(text.trim());
        prompt.push_str("\n'''\n\nTax deduction category:");
        prompt
    }

    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let prompt = self.build_prompt(text);

        tracing::debug!(
            "Sending classification prompt to model '{}' ({} chars)",
            self.model_name(),
            prompt.len()
        );

        let response = self
            .service
            .complete(&prompt, self.timeout)
            .await
            .map_err(into_model_error)?;

        tracing::debug!("Raw model response: {:?}", response);

        self.parse_response(&response)
    }

    /// 回應中必須剛好出現一個已知類別名稱
    pub fn parse_response(&self, response: &str) -> Result<ClassificationResult> {
        let (answer, rationale) = split_rationale(response);
        let answer_lower = answer.to_lowercase();

        let found: Vec<Category> = self
            .categories
            .iter()
            .copied()
            .filter(|c| mentions(&answer_lower, &c.as_str().to_lowercase()))
            .collect();

        let category = match found.as_slice() {
            [single] => *single,
            [] => {
                return Err(ClassifierError::ModelParseError {
                    message: format!("no known category in response: {:?}", truncate(response)),
                })
            }
            many => {
                let names: Vec<&str> = many.iter().map(Category::as_str).collect();
                return Err(ClassifierError::ModelParseError {
                    message: format!("ambiguous response mentions {}", names.join(", ")),
                });
            }
        };

        let confidence = parse_confidence(&answer).unwrap_or(DEFAULT_MODEL_CONFIDENCE);
        let result = ClassificationResult::new(category, confidence, Source::Model);

        Ok(match rationale {
            Some(reason) => result.with_rationale(reason),
            None => result,
        })
    }
}

impl std::fmt::Debug for ModelClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClassifier")
            .field("model", &self.service.model_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

// 非模型類的錯誤一律視為模型不可用
fn into_model_error(error: ClassifierError) -> ClassifierError {
    if error.is_model_error() {
        error
    } else {
        ClassifierError::ModelUnavailable {
            message: error.to_string(),
        }
    }
}

/// 取出 Reason/Rationale 行，避免說明文字裡的類別名稱造成歧義
fn split_rationale(response: &str) -> (String, Option<String>) {
    let mut answer = Vec::new();
    let mut rationale = None;

    for line in response.lines() {
        match rationale_pattern().captures(line) {
            Some(caps) if rationale.is_none() => {
                let text = caps.get(1).map_or("", |m| m.as_str()).trim();
                if !text.is_empty() {
                    rationale = Some(text.chars().take(MAX_RATIONALE_CHARS).collect());
                }
            }
            Some(_) => {}
            None => answer.push(line),
        }
    }

    (answer.join("\n"), rationale)
}

fn mentions(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        before.map_or(true, |c| !c.is_alphanumeric())
            && after.map_or(true, |c| !c.is_alphanumeric())
    })
}

fn parse_confidence(answer: &str) -> Option<f64> {
    let caps = confidence_pattern().captures(answer)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let is_percent = caps.get(2).is_some() || value >= PERCENT_CUTOFF;
    let value = if is_percent { value / 100.0 } else { value };
    Some(clamp_confidence(value))
}

fn truncate(response: &str) -> String {
    response.chars().take(MAX_RATIONALE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::taxonomy::Taxonomy;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    enum Reply {
        Text(String),
        Unavailable,
        Timeout,
        Io,
    }

    struct MockService {
        reply: Reply,
        last_prompt: Mutex<Option<String>>,
    }

    impl MockService {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionService for MockService {
        async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
            *self.last_prompt.lock().await = Some(prompt.to_string());
            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Unavailable => Err(ClassifierError::ModelUnavailable {
                    message: "connection refused".to_string(),
                }),
                Reply::Timeout => Err(ClassifierError::ModelTimeout { timeout }),
                Reply::Io => Err(ClassifierError::IoError(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "pipe closed",
                ))),
            }
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    fn classifier_with(reply: Reply) -> (ModelClassifier, Arc<MockService>) {
        let service = Arc::new(MockService::new(reply));
        let classifier = ModelClassifier::new(service.clone(), Duration::from_secs(1));
        (classifier, service)
    }

    fn parser() -> ModelClassifier {
        classifier_with(Reply::Text(String::new())).0
    }

    #[tokio::test]
    async fn test_prompt_lists_category_names_but_not_keywords() {
        let (classifier, service) = classifier_with(Reply::Text("Travel".to_string()));
        classifier.classify("Delta Airlines flight").await.unwrap();

        let prompt = service.last_prompt.lock().await.clone().unwrap();
        for category in Category::ALL {
            assert!(prompt.contains(category.as_str()));
        }
        assert!(prompt.contains("Delta Airlines flight"));
        assert!(!prompt.contains("starbucks"));
        assert!(!prompt.contains("mileage reimbursement"));
        assert!(Taxonomy::builtin()
            .signatures_for(Category::Travel)
            .contains(&"hertz".to_string()));
        assert!(!prompt.contains("hertz"));
    }

    #[tokio::test]
    async fn test_classify_success_uses_model_source() {
        let (classifier, _) = classifier_with(Reply::Text("  travel \n".to_string()));
        let result = classifier.classify("Delta Airlines").await.unwrap();

        assert_eq!(result.category, Category::Travel);
        assert_eq!(result.source, Source::Model);
        assert_eq!(result.confidence, DEFAULT_MODEL_CONFIDENCE);
        assert!(result.rationale.is_none());
    }

    #[tokio::test]
    async fn test_service_errors_pass_through() {
        let (classifier, _) = classifier_with(Reply::Unavailable);
        assert!(matches!(
            classifier.classify("x").await,
            Err(ClassifierError::ModelUnavailable { .. })
        ));

        let (classifier, _) = classifier_with(Reply::Timeout);
        assert!(matches!(
            classifier.classify("x").await,
            Err(ClassifierError::ModelTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_unexpected_service_error_becomes_unavailable() {
        let (classifier, _) = classifier_with(Reply::Io);
        assert!(matches!(
            classifier.classify("x").await,
            Err(ClassifierError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn test_parse_with_confidence_and_reason() {
        let result = parser()
            .parse_response(
                "Tax Deduction Category: Business Meals\n\
                 Confidence: 0.92\n\
                 Reason: coffee shop receipt",
            )
            .unwrap();

        assert_eq!(result.category, Category::BusinessMeals);
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.rationale.as_deref(), Some("coffee shop receipt"));
    }

    #[test]
    fn test_parse_percent_confidence() {
        let result = parser()
            .parse_response("**Office Supplies** (confidence: 85%)")
            .unwrap();
        assert_eq!(result.category, Category::OfficeSupplies);
        assert!((result.confidence - 0.85).abs() < 1e-9);

        let result = parser()
            .parse_response("Utilities, confidence 90")
            .unwrap();
        assert!((result.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_slightly_above_one_is_clamped() {
        let result = parser()
            .parse_response("Travel\nConfidence: 1.5")
            .unwrap();
        assert_eq!(result.confidence, 1.0);

        let result = parser()
            .parse_response("Travel\nConfidence: 1")
            .unwrap();
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_parse_ampersand_category() {
        let result = parser()
            .parse_response("legal & professional services")
            .unwrap();
        assert_eq!(result.category, Category::LegalAndProfessionalServices);
    }

    #[test]
    fn test_parse_without_category_fails() {
        let err = parser().parse_response("I am not sure.").unwrap_err();
        assert!(matches!(err, ClassifierError::ModelParseError { .. }));

        let err = parser().parse_response("").unwrap_err();
        assert!(matches!(err, ClassifierError::ModelParseError { .. }));
    }

    #[test]
    fn test_parse_ambiguous_response_fails() {
        let err = parser()
            .parse_response("Either Travel or Vehicle Expenses")
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ModelParseError { .. }));
    }

    #[test]
    fn test_category_names_are_word_bounded() {
        // "another" 不應被當成 Other
        let result = parser()
            .parse_response("Travel, as another flight")
            .unwrap();
        assert_eq!(result.category, Category::Travel);
    }

    #[test]
    fn test_reason_line_does_not_cause_ambiguity() {
        let result = parser()
            .parse_response("Travel\nReason: airfare, not Vehicle Expenses")
            .unwrap();
        assert_eq!(result.category, Category::Travel);
        assert_eq!(
            result.rationale.as_deref(),
            Some("airfare, not Vehicle Expenses")
        );
    }

    #[test]
    fn test_reasoning_label_keeps_full_rationale() {
        let result = parser()
            .parse_response("Travel\nReasoning: airfare on the receipt")
            .unwrap();
        assert_eq!(result.category, Category::Travel);
        assert_eq!(
            result.rationale.as_deref(),
            Some("airfare on the receipt")
        );
    }

    #[test]
    fn test_markdown_reason_label() {
        let result = parser()
            .parse_response("**Utilities**\n**Reason:** monthly internet bill")
            .unwrap();
        assert_eq!(result.category, Category::Utilities);
        assert_eq!(result.rationale.as_deref(), Some("monthly internet bill"));
    }

    #[test]
    fn test_word_starting_with_reason_is_part_of_answer() {
        let result = parser()
            .parse_response("Reasonable answer: Travel")
            .unwrap();
        assert_eq!(result.category, Category::Travel);
        assert!(result.rationale.is_none());
    }
}

use crate::core::taxonomy::{normalize_text, Taxonomy};
use crate::domain::model::{Category, ClassificationResult, Source};
use std::sync::Arc;

// 信心值公式的參數
const SCORE_HALF_POINT: f64 = 2.0;
const DENSITY_FACTOR: f64 = 4.0;

/// 不超過這個長度的關鍵字（pen、bus、rent）必須是完整 token
const SHORT_KEYWORD_CHARS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category: Category,
    pub score: u32,
    pub matched: Vec<String>,
}

/// 關鍵字分類器：純函式、無副作用，永遠不會失敗
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    taxonomy: Arc<Taxonomy>,
}

impl KeywordClassifier {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// 每個類別的得分，依 taxonomy 順序
    ///
    /// 關鍵字以子字串比對正規化後的文字，複數與 OCR 黏在一起的字也算；
    /// 短關鍵字例外，必須落在 token 邊界上。權重等於片語的字數，
    /// 所以 "rental car" 比單獨的 "car" 分數高。
    pub fn scores(&self, text: &str) -> Vec<CategoryScore> {
        let normalized = normalize_text(text);
        let padded = format!(" {} ", normalized);

        self.taxonomy
            .iter()
            .map(|(category, keywords)| {
                let matched: Vec<String> = keywords
                    .iter()
                    .filter(|keyword| keyword_matches(&normalized, &padded, keyword))
                    .cloned()
                    .collect();
                let score: u32 = matched.iter().map(|k| phrase_weight(k)).sum();

                CategoryScore {
                    category,
                    score,
                    matched,
                }
            })
            .collect()
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        let scores = self.scores(text);

        // 只在嚴格大於時換人，平手保留 taxonomy 中較前面的類別
        let mut best: Option<&CategoryScore> = None;
        for candidate in scores.iter().filter(|s| s.score > 0) {
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }

        let Some(winner) = best else {
            tracing::debug!("No keyword matched; returning unclassified result");
            return ClassificationResult::unclassified();
        };

        let total_score: u32 = scores.iter().map(|s| s.score).sum();
        let total_words = normalize_text(text).split(' ').count();
        let matched_words: u32 = winner.matched.iter().map(|k| phrase_weight(k)).sum();

        let confidence = confidence_for(winner.score, total_score, matched_words, total_words);

        tracing::debug!(
            "Keyword classification: {} (score {}, confidence {:.3})",
            winner.category,
            winner.score,
            confidence
        );

        ClassificationResult::new(winner.category, confidence, Source::Fallback)
            .with_rationale(format!("matched keywords: {}", winner.matched.join(", ")))
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(Taxonomy::builtin())
    }
}

fn keyword_matches(normalized: &str, padded: &str, keyword: &str) -> bool {
    if keyword.chars().count() <= SHORT_KEYWORD_CHARS {
        padded.contains(&format!(" {} ", keyword))
    } else {
        normalized.contains(keyword)
    }
}

fn phrase_weight(keyword: &str) -> u32 {
    keyword.split(' ').count() as u32
}

/// base 隨得分單調遞增並趨近 1；再依文字密度與領先幅度調整
fn confidence_for(score: u32, total_score: u32, matched_words: u32, total_words: usize) -> f64 {
    if score == 0 || total_score == 0 || total_words == 0 {
        return 0.0;
    }

    let score = f64::from(score);
    let base = score / (score + SCORE_HALF_POINT);
    let density = (DENSITY_FACTOR * f64::from(matched_words) / total_words as f64).min(1.0);
    let share = score / f64::from(total_score);

    let value = base * (0.6 + 0.2 * density + 0.2 * share);
    ((value * 1000.0).round() / 1000.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::default()
    }

    #[test]
    fn test_airline_receipt_is_travel() {
        let result = classifier().classify("Delta Airlines flight SEA-JFK $412.50");

        assert_eq!(result.category, Category::Travel);
        assert_eq!(result.source, Source::Fallback);
        assert!(result.confidence > 0.0);
        assert!(result.rationale.unwrap().contains("airlines"));
    }

    #[test]
    fn test_empty_text_is_unclassified() {
        let result = classifier().classify("");
        assert_eq!(result, ClassificationResult::unclassified());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_no_match_is_unclassified() {
        let result = classifier().classify("QTY 2 @ 4.99 SUBTOTAL 9.98");
        assert_eq!(result.category, Category::Other);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.source, Source::Fallback);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let samples = [
            "",
            "Staples printer ink and paper",
            "Shell gas station fuel 12.3 gal",
            "Comcast internet bill / AT&T phone",
            "Uber to airport, then hotel",
            "%%%% ###",
        ];
        let c = classifier();
        for text in samples {
            assert_eq!(c.classify(text), c.classify(text));
        }
    }

    #[test]
    fn test_confidence_bounds() {
        let samples = [
            "car",
            "rental car mileage reimbursement",
            "coffee coffee coffee lunch dinner breakfast pizza deli restaurant cafe",
            "Starbucks #123 Latte $5.25 thank you for visiting come again soon",
            "insurance premium policy indemnity liability insurance",
        ];
        for text in samples {
            let result = classifier().classify(text);
            assert!(
                (0.0..=1.0).contains(&result.confidence),
                "{} -> {}",
                text,
                result.confidence
            );
        }
    }

    #[test]
    fn test_longer_phrases_raise_confidence() {
        let c = classifier();
        let generic = c.classify("car");
        let specific = c.classify("rental car mileage reimbursement");

        assert_eq!(generic.category, Category::VehicleExpenses);
        assert_eq!(specific.category, Category::VehicleExpenses);
        assert!(specific.confidence > generic.confidence);
    }

    #[test]
    fn test_phrase_outweighs_single_word() {
        let scores = classifier().scores("rental car");
        let travel = scores
            .iter()
            .find(|s| s.category == Category::Travel)
            .unwrap();
        let vehicle = scores
            .iter()
            .find(|s| s.category == Category::VehicleExpenses)
            .unwrap();

        assert_eq!(travel.score, 2);
        assert_eq!(vehicle.score, 1);
        assert_eq!(classifier().classify("rental car").category, Category::Travel);
    }

    #[test]
    fn test_short_keywords_need_token_boundaries() {
        // "pen" 不應命中 "expense"，"bus" 不應命中 "business"
        let result = classifier().classify("business expense");
        assert_eq!(result.category, Category::Other);

        // "rent" 不應命中 "current"
        let result = classifier().classify("current balance");
        assert_eq!(result.category, Category::Other);
    }

    #[test]
    fn test_plural_words_still_match() {
        let c = classifier();
        assert_eq!(c.classify("Flights SEA-JFK 412.50").category, Category::Travel);
        assert_eq!(c.classify("HOTELS.COM booking").category, Category::Travel);
        assert_eq!(
            c.classify("Restaurants Inc table 4").category,
            Category::BusinessMeals
        );
    }

    #[test]
    fn test_run_together_ocr_text_matches() {
        let result = classifier().classify("STARBUCKSCOFFEE 5.25");

        assert_eq!(result.category, Category::BusinessMeals);
        assert!(result.confidence > 0.0);
        let rationale = result.rationale.unwrap();
        assert!(rationale.contains("starbucks"));
        assert!(rationale.contains("coffee"));
    }

    #[test]
    fn test_training_is_not_travel() {
        let result = classifier().classify("Safety training seminar");
        assert_eq!(result.category, Category::ProfessionalDevelopment);
    }

    #[test]
    fn test_tie_prefers_earlier_category() {
        // coffee (Business Meals) 與 taxi (Travel) 各一分
        let result = classifier().classify("coffee taxi");
        assert_eq!(result.category, Category::BusinessMeals);

        let reversed = classifier().classify("taxi coffee");
        assert_eq!(reversed.category, Category::BusinessMeals);
    }

    #[test]
    fn test_ambiguous_text_lowers_confidence() {
        let c = classifier();
        let clean = c.classify("hotel");
        let mixed = c.classify("hotel coffee");

        assert_eq!(mixed.category, Category::BusinessMeals);
        assert!(mixed.confidence < clean.confidence);
    }

    #[test]
    fn test_custom_taxonomy_is_used() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Category::Advertising, vec!["yelp ads".to_string()]);
        let taxonomy = Taxonomy::with_keywords(&overrides, false).unwrap();
        let c = KeywordClassifier::new(Arc::new(taxonomy));

        let result = c.classify("YELP ADS monthly invoice");
        assert_eq!(result.category, Category::Advertising);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 報稅扣除類別，順序即 taxonomy 順序（平手時排前面的勝出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    BusinessMeals,
    Travel,
    OfficeSupplies,
    Utilities,
    HomeOffice,
    Advertising,
    ProfessionalDevelopment,
    Insurance,
    LegalAndProfessionalServices,
    VehicleExpenses,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::BusinessMeals,
        Category::Travel,
        Category::OfficeSupplies,
        Category::Utilities,
        Category::HomeOffice,
        Category::Advertising,
        Category::ProfessionalDevelopment,
        Category::Insurance,
        Category::LegalAndProfessionalServices,
        Category::VehicleExpenses,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BusinessMeals => "Business Meals",
            Category::Travel => "Travel",
            Category::OfficeSupplies => "Office Supplies",
            Category::Utilities => "Utilities",
            Category::HomeOffice => "Home Office",
            Category::Advertising => "Advertising",
            Category::ProfessionalDevelopment => "Professional Development",
            Category::Insurance => "Insurance",
            Category::LegalAndProfessionalServices => "Legal & Professional Services",
            Category::VehicleExpenses => "Vehicle Expenses",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub confidence: f64,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ClassificationResult {
    pub fn new(category: Category, confidence: f64, source: Source) -> Self {
        Self {
            category,
            confidence: clamp_confidence(confidence),
            source,
            rationale: None,
        }
    }

    /// 完全無法分類時的結果：{Other, 0.0, Fallback}
    pub fn unclassified() -> Self {
        Self::new(Category::Other, 0.0, Source::Fallback)
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// OCR 引擎輸出的一行文字
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    pub confidence: f64,
}

pub const DEFAULT_MIN_LINE_CONFIDENCE: f64 = 0.5;

/// 從影像擷取出來的收據文字，可能是空字串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawText(String);

impl RawText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// 去除前後空白，並丟掉少於兩個字元的雜訊行
    pub fn clean(text: &str) -> Self {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| line.chars().count() >= 2)
            .collect();
        Self(lines.join("\n"))
    }

    /// 只保留信心值高於門檻的 OCR 行
    pub fn from_ocr_lines(lines: &[OcrLine], min_confidence: f64) -> Self {
        let kept: Vec<&str> = lines
            .iter()
            .filter(|line| line.confidence > min_confidence)
            .map(|line| line.text.as_str())
            .collect();

        Self::clean(&kept.join("\n"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for RawText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for RawText {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl AsRef<str> for RawText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

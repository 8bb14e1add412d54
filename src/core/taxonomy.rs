use crate::domain::model::Category;
use crate::utils::error::{ClassifierError, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, OnceLock};

/// 內建關鍵字表，順序與 `Category::ALL` 相同
const BUILTIN_SIGNATURES: &[(Category, &[&str])] = &[
    (
        Category::BusinessMeals,
        &[
            "restaurant",
            "cafe",
            "coffee",
            "starbucks",
            "mcdonalds",
            "mcdonald's",
            "food",
            "lunch",
            "dinner",
            "breakfast",
            "pizza",
            "deli",
            "bistro",
            "diner",
            "catering",
            "bar & grill",
            "business lunch",
            "client dinner",
        ],
    ),
    (
        Category::Travel,
        &[
            "uber",
            "lyft",
            "taxi",
            "flight",
            "airline",
            "airfare",
            "airport",
            "boarding pass",
            "baggage fee",
            "delta",
            "united airlines",
            "american airlines",
            "southwest",
            "hotel",
            "motel",
            "lodging",
            "airbnb",
            "marriott",
            "hilton",
            "rental car",
            "car rental",
            "hertz",
            "train ticket",
            "railway",
            "amtrak",
            "bus",
        ],
    ),
    (
        Category::OfficeSupplies,
        &[
            "office depot",
            "staples",
            "supplies",
            "office supplies",
            "paper",
            "pen",
            "pens",
            "printer",
            "ink",
            "toner",
            "stapler",
            "notebook",
            "envelopes",
            "postage",
            "usps",
            "software",
            "computer",
            "laptop",
            "keyboard",
        ],
    ),
    (
        Category::Utilities,
        &[
            "internet",
            "broadband",
            "phone",
            "phone bill",
            "wireless",
            "electric",
            "electricity",
            "utility",
            "utilities",
            "water bill",
            "gas bill",
            "natural gas",
            "verizon",
            "at&t",
            "t-mobile",
            "comcast",
            "spectrum",
            "cable",
        ],
    ),
    (
        Category::HomeOffice,
        &[
            "rent",
            "mortgage",
            "home office",
            "workspace",
            "desk",
            "office chair",
            "home repair",
            "property tax",
        ],
    ),
    (
        Category::Advertising,
        &[
            "advertising",
            "marketing",
            "google ads",
            "facebook ads",
            "ad campaign",
            "promotion",
            "billboard",
            "flyers",
            "business cards",
            "sponsored",
            "seo",
        ],
    ),
    (
        Category::ProfessionalDevelopment,
        &[
            "course",
            "conference",
            "book",
            "books",
            "training",
            "seminar",
            "workshop",
            "webinar",
            "certification",
            "tuition",
            "registration fee",
            "udemy",
            "coursera",
        ],
    ),
    (
        Category::Insurance,
        &[
            "insurance",
            "liability insurance",
            "professional indemnity",
            "indemnity",
            "premium",
            "policy",
        ],
    ),
    (
        Category::LegalAndProfessionalServices,
        &[
            "legal",
            "legal fees",
            "lawyer",
            "attorney",
            "law firm",
            "accountant",
            "accounting",
            "cpa",
            "bookkeeping",
            "tax preparation",
            "consultant",
            "consulting",
            "notary",
            "retainer",
        ],
    ),
    (
        Category::VehicleExpenses,
        &[
            "gas",
            "gasoline",
            "fuel",
            "vehicle",
            "auto",
            "car",
            "car wash",
            "oil change",
            "repair",
            "tires",
            "mechanic",
            "parking",
            "toll",
            "mileage",
            "mileage reimbursement",
            "auto insurance",
            "shell",
            "chevron",
            "exxon",
        ],
    ),
    (Category::Other, &[]),
];

static BUILTIN: OnceLock<Arc<Taxonomy>> = OnceLock::new();

/// 小寫、標點換成空白、合併連續空白
pub fn normalize_text(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 類別與其關鍵字簽章，啟動時建立一次，之後唯讀
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    signatures: Vec<(Category, Vec<String>)>,
}

impl Taxonomy {
    /// 全程序共用的內建 taxonomy
    pub fn builtin() -> Arc<Taxonomy> {
        BUILTIN
            .get_or_init(|| {
                let signatures = BUILTIN_SIGNATURES
                    .iter()
                    .map(|(category, keywords)| {
                        (*category, normalize_keywords(keywords.iter().copied()))
                    })
                    .collect();
                Arc::new(Taxonomy { signatures })
            })
            .clone()
    }

    /// 以設定檔的關鍵字擴充（或取代）內建表
    pub fn with_keywords(
        overrides: &BTreeMap<Category, Vec<String>>,
        replace_builtin: bool,
    ) -> Result<Taxonomy> {
        let builtin = Self::builtin();
        let mut signatures = Vec::with_capacity(Category::ALL.len());

        for (category, builtin_keywords) in &builtin.signatures {
            let extra = overrides.get(category).map(Vec::as_slice).unwrap_or(&[]);

            for keyword in extra {
                if normalize_text(keyword).is_empty() {
                    return Err(ClassifierError::ConfigValidationError {
                        field: format!("signatures.keywords.{}", category),
                        message: format!("keyword '{}' has no letters or digits", keyword),
                    });
                }
            }

            let keywords = if replace_builtin && overrides.contains_key(category) {
                normalize_keywords(extra.iter().map(String::as_str))
            } else if replace_builtin {
                Vec::new()
            } else {
                normalize_keywords(
                    builtin_keywords
                        .iter()
                        .map(String::as_str)
                        .chain(extra.iter().map(String::as_str)),
                )
            };

            signatures.push((*category, keywords));
        }

        let taxonomy = Taxonomy { signatures };
        taxonomy.ensure_not_empty()?;
        Ok(taxonomy)
    }

    pub fn all_categories(&self) -> &[Category] {
        &Category::ALL
    }

    pub fn signatures_for(&self, category: Category) -> &[String] {
        self.signatures
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, keywords)| keywords.as_slice())
            .unwrap_or(&[])
    }

    /// 依 taxonomy 順序迭代
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.signatures
            .iter()
            .map(|(category, keywords)| (*category, keywords.as_slice()))
    }

    fn ensure_not_empty(&self) -> Result<()> {
        let has_keywords = self
            .signatures
            .iter()
            .any(|(category, keywords)| *category != Category::Other && !keywords.is_empty());

        if has_keywords {
            Ok(())
        } else {
            Err(ClassifierError::ConfigError {
                message: "keyword taxonomy is empty: no category besides Other has keywords"
                    .to_string(),
            })
        }
    }
}

fn normalize_keywords<'a>(keywords: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .map(normalize_text)
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

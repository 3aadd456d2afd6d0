use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Closed set of transaction categories produced by the upstream
/// classifier. Labels that do not match any known category are kept
/// verbatim in `Unrecognized` and aggregated as generic expenses, so
/// label drift never silently drops rows from the analysis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    ClientReceipt,
    Rent,
    Salary,
    GoodsPurchase,
    HouseholdSupplies,
    Advertising,
    ItServices,
    Other,
    NonDeductible,
    Unrecognized(String),
}

impl Category {
    /// Every known expense category, in presentation order. `Unrecognized`
    /// labels are expenses too but are open-ended and not listed here.
    pub const KNOWN_EXPENSES: [Category; 8] = [
        Category::Rent,
        Category::Salary,
        Category::GoodsPurchase,
        Category::HouseholdSupplies,
        Category::Advertising,
        Category::ItServices,
        Category::Other,
        Category::NonDeductible,
    ];

    pub fn from_label(label: &str) -> Self {
        let key: String = label
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match key.as_str() {
            "client_receipt" => Category::ClientReceipt,
            "rent" => Category::Rent,
            "salary" => Category::Salary,
            "goods_purchase" => Category::GoodsPurchase,
            "household_supplies" => Category::HouseholdSupplies,
            "advertising" => Category::Advertising,
            "it_services" => Category::ItServices,
            "other" => Category::Other,
            "non_deductible" => Category::NonDeductible,
            _ => Category::Unrecognized(label.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Category::ClientReceipt => "client_receipt",
            Category::Rent => "rent",
            Category::Salary => "salary",
            Category::GoodsPurchase => "goods_purchase",
            Category::HouseholdSupplies => "household_supplies",
            Category::Advertising => "advertising",
            Category::ItServices => "it_services",
            Category::Other => "other",
            Category::NonDeductible => "non_deductible",
            Category::Unrecognized(label) => label,
        }
    }

    /// Only client receipts count as income; everything else, including
    /// unrecognized labels, is an expense.
    pub fn is_income(&self) -> bool {
        matches!(self, Category::ClientReceipt)
    }

    pub fn is_expense(&self) -> bool {
        !self.is_income()
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.label().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl JsonSchema for Category {
    fn schema_name() -> String {
        "Category".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

/// Goods-purchase subcategories that qualify as cost of goods sold.
pub const COGS_SUBCATEGORIES: [&str; 2] = ["raw_materials", "components"];

/// A single normalized ledger entry. Materialized once per uploaded
/// snapshot and never mutated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub date: NaiveDate,

    /// Signed amount in currency units; receipts positive, payments
    /// negative by bank convention. Aggregation works on magnitudes.
    pub amount: f64,

    pub category: Category,

    #[serde(default)]
    pub subcategory: Option<String>,

    #[serde(default)]
    pub counterparty: Option<String>,

    #[serde(default)]
    pub purpose: String,
}

impl Transaction {
    pub fn magnitude(&self) -> f64 {
        self.amount.abs()
    }

    /// Goods-purchase rows whose subcategory names a direct input
    /// (raw materials, components) are cost of goods sold.
    pub fn is_cogs(&self) -> bool {
        self.category == Category::GoodsPurchase
            && self
                .subcategory
                .as_deref()
                .map(|sub| {
                    let key: String = sub
                        .trim()
                        .chars()
                        .map(|c| match c {
                            ' ' | '-' => '_',
                            c => c.to_ascii_lowercase(),
                        })
                        .collect();
                    COGS_SUBCATEGORIES.contains(&key.as_str())
                })
                .unwrap_or(false)
    }
}

/// Simplified-taxation regime selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    #[schemars(description = "Tax is 6% of gross income")]
    RevenueBased,

    #[schemars(description = "Tax is 15% of income minus deductible expenses, floored at zero")]
    MarginBased,
}

impl TaxRegime {
    pub fn rate(&self) -> f64 {
        match self {
            TaxRegime::RevenueBased => 0.06,
            TaxRegime::MarginBased => 0.15,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaxRegime::RevenueBased => "revenue_based",
            TaxRegime::MarginBased => "margin_based",
        }
    }
}

impl std::fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw ledger row as handed over by the upload-parsing collaborator,
/// before normalization. Every field is optional text so that a broken
/// row can be counted and skipped instead of failing the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LedgerRow {
    #[schemars(description = "Transaction date, YYYY-MM-DD or an ISO datetime")]
    pub date: Option<String>,

    #[schemars(description = "Signed amount in currency units")]
    pub amount: Option<String>,

    #[schemars(description = "Category label assigned by the classifier")]
    pub category: Option<String>,

    #[serde(default)]
    pub subcategory: Option<String>,

    #[serde(default)]
    pub counterparty: Option<String>,

    #[serde(default)]
    #[schemars(description = "Free-text payment purpose from the bank statement")]
    pub purpose: Option<String>,
}

impl LedgerRow {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LedgerRow)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

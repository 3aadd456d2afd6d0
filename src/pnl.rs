//! Profit-and-loss decomposition of one ledger snapshot.

use crate::schema::{Category, Transaction};
use crate::utils::ratio_pct;
use serde::{Deserialize, Serialize};

/// One line of the rendered waterfall, in presentation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallRow {
    pub label: String,
    pub value: f64,
}

/// Revenue-to-operating-profit decomposition. Margins are percentages
/// of revenue and 0 when revenue is 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlReport {
    pub revenue: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub gross_margin: f64,
    pub operating_expenses: f64,
    pub operating_profit: f64,
    pub operating_margin: f64,
    pub waterfall: Vec<WaterfallRow>,
}

/// Build the P&L waterfall.
///
/// Revenue is the magnitude sum of client receipts. COGS covers
/// goods-purchase rows with a direct-input subcategory. Operating
/// expenses are every expense row except client receipts and the
/// non-deductible category.
pub fn build_pl_report(transactions: &[Transaction]) -> PlReport {
    let revenue: f64 = transactions
        .iter()
        .filter(|tx| tx.category.is_income())
        .map(|tx| tx.magnitude())
        .sum();

    let cogs: f64 = transactions
        .iter()
        .filter(|tx| tx.is_cogs())
        .map(|tx| tx.magnitude())
        .sum();

    let operating_expenses: f64 = transactions
        .iter()
        .filter(|tx| tx.category.is_expense() && tx.category != Category::NonDeductible)
        .map(|tx| tx.magnitude())
        .sum();

    let gross_profit = revenue - cogs;
    let operating_profit = gross_profit - operating_expenses;

    let waterfall = vec![
        WaterfallRow {
            label: "Revenue".to_string(),
            value: revenue,
        },
        WaterfallRow {
            label: "Cost of goods sold".to_string(),
            value: -cogs,
        },
        WaterfallRow {
            label: "Gross profit".to_string(),
            value: gross_profit,
        },
        WaterfallRow {
            label: "Operating expenses".to_string(),
            value: -operating_expenses,
        },
        WaterfallRow {
            label: "Operating profit".to_string(),
            value: operating_profit,
        },
    ];

    PlReport {
        revenue,
        cogs,
        gross_profit,
        gross_margin: ratio_pct(gross_profit, revenue),
        operating_expenses,
        operating_profit,
        operating_margin: ratio_pct(operating_profit, revenue),
        waterfall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(amount: f64, category: Category, subcategory: Option<&str>) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
            amount,
            category,
            subcategory: subcategory.map(str::to_string),
            counterparty: None,
            purpose: String::new(),
        }
    }

    #[test]
    fn test_waterfall_structure() {
        let transactions = vec![
            tx(100_000.0, Category::ClientReceipt, None),
            tx(-20_000.0, Category::GoodsPurchase, Some("raw_materials")),
            tx(-10_000.0, Category::GoodsPurchase, Some("components")),
            tx(-15_000.0, Category::Salary, None),
            tx(-5_000.0, Category::NonDeductible, None),
        ];

        let report = build_pl_report(&transactions);
        assert_eq!(report.revenue, 100_000.0);
        assert_eq!(report.cogs, 30_000.0);
        assert_eq!(report.gross_profit, 70_000.0);
        // COGS rows stay in the opex sum; only receipts and the
        // non-deductible category are excluded.
        assert_eq!(report.operating_expenses, 45_000.0);
        assert_eq!(report.operating_profit, 25_000.0);
        assert!((report.gross_margin - 70.0).abs() < 1e-9);
        assert!((report.operating_margin - 25.0).abs() < 1e-9);

        let labels: Vec<&str> = report.waterfall.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Revenue",
                "Cost of goods sold",
                "Gross profit",
                "Operating expenses",
                "Operating profit"
            ]
        );
    }

    #[test]
    fn test_cogs_reconciliation() {
        let transactions = vec![
            tx(50_000.0, Category::ClientReceipt, None),
            tx(-12_500.0, Category::GoodsPurchase, Some("raw_materials")),
        ];
        let report = build_pl_report(&transactions);
        assert_eq!(report.gross_profit + (report.revenue - report.gross_profit), report.revenue);
        assert_eq!(report.revenue - report.gross_profit, report.cogs);
    }

    #[test]
    fn test_zero_revenue_margins_are_zero() {
        let transactions = vec![tx(-8_000.0, Category::Rent, None)];
        let report = build_pl_report(&transactions);
        assert_eq!(report.revenue, 0.0);
        assert_eq!(report.gross_margin, 0.0);
        assert_eq!(report.operating_margin, 0.0);
        assert!(!report.gross_margin.is_nan());
    }

    #[test]
    fn test_unrecognized_labels_count_as_operating_expense() {
        let transactions = vec![
            tx(10_000.0, Category::ClientReceipt, None),
            tx(-1_000.0, Category::Unrecognized("drone rental".to_string()), None),
        ];
        let report = build_pl_report(&transactions);
        assert_eq!(report.operating_expenses, 1_000.0);
    }
}

//! Analyze a CSV ledger from disk and print the JSON report.
//!
//! Usage: `cargo run --example analyze_ledger -- ledger.csv [revenue_based|margin_based]`
//!
//! Expected columns: date, amount, category, subcategory, counterparty, purpose.

use anyhow::{Context, Result};
use ledger_analytics::{analyze_transactions, normalize_rows, LedgerRow, TaxRegime};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .context("usage: analyze_ledger <ledger.csv> [revenue_based|margin_based]")?;
    let regime = match std::env::args().nth(2).as_deref() {
        Some("margin_based") => TaxRegime::MarginBased,
        _ => TaxRegime::RevenueBased,
    };

    let mut reader =
        csv::Reader::from_path(&path).with_context(|| format!("cannot open {}", path))?;
    let mut rows: Vec<LedgerRow> = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.context("malformed CSV record")?);
    }

    let ledger = normalize_rows(&rows);
    eprintln!(
        "{} rows kept, {} excluded",
        ledger.transactions.len(),
        ledger.excluded
    );

    let report = analyze_transactions(&ledger.transactions, regime, None)?;
    println!("{}", report.to_json()?);
    Ok(())
}

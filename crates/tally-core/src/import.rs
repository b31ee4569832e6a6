//! Transaction import from CSV and JSON files
//!
//! CSV files need a header row with `date`, `merchant` and `amount` columns in
//! any order (case-insensitive). `id` and `description` are optional. Rows
//! without an id get one derived from their content.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Transaction;

/// Supported transaction file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Guess the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(Error::Import(format!(
                "Unsupported file type: {} (expected .csv or .json)",
                path.display()
            ))),
        }
    }
}

/// Read transactions from a `.csv` or `.json` file
pub fn parse_file(path: &Path) -> Result<Vec<Transaction>> {
    let format = FileFormat::from_path(path)?;
    let reader = BufReader::new(File::open(path)?);
    match format {
        FileFormat::Csv => parse_csv(reader),
        FileFormat::Json => parse_json(reader),
    }
}

/// Column positions resolved from the header row
struct Columns {
    id: Option<usize>,
    date: usize,
    merchant: usize,
    amount: usize,
    description: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| Error::Import(format!("Missing required column: {}", name)))
        };

        Ok(Self {
            id: find("id"),
            date: require("date")?,
            merchant: require("merchant")?,
            amount: require("amount")?,
            description: find("description"),
        })
    }
}

/// Parse CSV transactions
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut transactions = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = index + 2;

        let field = |i: usize| record.get(i).unwrap_or("");

        let date = parse_date(field(columns.date))
            .map_err(|e| Error::Import(format!("Row {}: {}", line, e)))?;
        let amount = parse_amount(field(columns.amount))
            .map_err(|e| Error::Import(format!("Row {}: {}", line, e)))?;
        let merchant = field(columns.merchant);
        let description = columns.description.map(field).unwrap_or("");

        let id = match columns.id.map(field).filter(|s| !s.is_empty()) {
            Some(id) => id.to_string(),
            None => derive_id(&date, merchant, amount, index),
        };

        transactions.push(Transaction::new(id, date, merchant, amount).with_description(description));
    }

    debug!(count = transactions.len(), "Parsed CSV transactions");
    Ok(transactions)
}

/// Parse a JSON array of transactions
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let transactions: Vec<Transaction> = serde_json::from_reader(reader)?;

    if let Some(bad) = transactions.iter().find(|t| !t.amount.is_finite()) {
        return Err(Error::Import(format!(
            "Transaction {} has a non-finite amount",
            bad.id
        )));
    }

    debug!(count = transactions.len(), "Parsed JSON transactions");
    Ok(transactions)
}

/// Stable id for rows that don't carry one
fn derive_id(date: &NaiveDate, merchant: &str, amount: f64, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(merchant.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update((index as u64).to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a date in one of the common bank export formats
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%y", // 01/15/24 (before %Y, which would read year 24 AD)
        "%m/%d/%Y", // 01/15/2024
        "%m-%d-%Y", // 01-15-2024
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount, handling currency symbols, commas and `(12.34)` negatives
pub fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    let amount = cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))?;

    if !amount.is_finite() {
        return Err(Error::Import(format!("Amount is not finite: {}", s)));
    }
    Ok(amount)
}

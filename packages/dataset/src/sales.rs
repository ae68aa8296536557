//! Rolling sales parsing and home-sale filtering.
//!
//! Rolling sales exports carry upper-case, space-separated headers that may
//! contain embedded line breaks. Headers are normalized by removing line
//! breaks, replacing whitespace with `_` and lowercasing, so
//! `"GROSS SQUARE FEET"` becomes `gross_square_feet`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::DatasetError;

/// Building class category codes counted as homes (one, two and three
/// family dwellings).
pub const HOME_CATEGORIES: &[&str] = &["01", "02", "03"];

static CATEGORY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2}").unwrap_or_else(|_| unreachable!()));

/// One row of a rolling sales file.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    /// Zip code of the sold property.
    pub zip_code: Option<i64>,
    /// Sale price in dollars.
    pub sale_price: Option<f64>,
    /// Gross square footage.
    pub gross_square_feet: Option<f64>,
    /// Year the building was built.
    pub year_built: Option<i64>,
    /// Building class category, e.g. `"01 ONE FAMILY DWELLINGS"`.
    pub building_class_category: String,
}

impl SaleRecord {
    /// Two-digit building class category code, if the category has one.
    #[must_use]
    pub fn category_code(&self) -> Option<&str> {
        CATEGORY_CODE
            .find(&self.building_class_category)
            .map(|m| m.as_str())
    }

    /// Whether this row is a plausible home sale: a real zip code, a price
    /// between $10k and $500M, between 300 and 100k square feet, built in
    /// 1850 or later, and a one to three family building class.
    #[must_use]
    pub fn is_home_sale(&self) -> bool {
        let (Some(zip), Some(price), Some(sqft), Some(year)) = (
            self.zip_code,
            self.sale_price,
            self.gross_square_feet,
            self.year_built,
        ) else {
            return false;
        };

        zip > 0
            && (1.0e4..=5.0e8).contains(&price)
            && (300.0..1.0e5).contains(&sqft)
            && year >= 1850
            && self
                .category_code()
                .is_some_and(|code| HOME_CATEGORIES.contains(&code))
    }

    /// Sale price divided by gross square footage.
    #[must_use]
    pub fn price_per_sqft(&self) -> Option<f64> {
        let price = self.sale_price?;
        let sqft = self.gross_square_feet.filter(|s| *s > 0.0)?;
        Some(price / sqft)
    }
}

/// Normalizes a sales header: newlines removed, whitespace replaced with
/// `_`, lowercased.
#[must_use]
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// Parses a number as printed in sales exports (`"$1,250,000"`, `" 2,400 "`,
/// `"-"`).
fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '$')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_integer(value: &str) -> Option<i64> {
    crate::parse_int_like(&value.replace(',', ""))
}

/// Parses sales rows from CSV text after skipping `skip_rows` preamble
/// lines.
///
/// # Errors
///
/// Returns [`DatasetError::MissingColumn`] if a required column is absent
/// after header normalization.
pub fn parse_sales(
    text: &str,
    skip_rows: usize,
    origin: &Path,
) -> Result<Vec<SaleRecord>, DatasetError> {
    let body = text
        .split_inclusive('\n')
        .skip(skip_rows)
        .collect::<String>();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|e| DatasetError::csv(origin, e))?
        .iter()
        .map(normalize_header)
        .collect();

    let index = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatasetError::MissingColumn {
                path: origin.display().to_string(),
                column: name.to_string(),
            })
    };
    let zip = index("zip_code")?;
    let price = index("sale_price")?;
    let sqft = index("gross_square_feet")?;
    let year = index("year_built")?;
    let category = index("building_class_category")?;

    let mut sales = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("skipping malformed sales row {row} in {}: {e}", origin.display());
                continue;
            }
        };
        let field = |i: usize| record.get(i).unwrap_or("");
        sales.push(SaleRecord {
            zip_code: parse_integer(field(zip)),
            sale_price: parse_number(field(price)),
            gross_square_feet: parse_number(field(sqft)),
            year_built: parse_integer(field(year)),
            building_class_category: field(category).trim().to_string(),
        });
    }

    Ok(sales)
}

/// Reads a rolling sales CSV.
///
/// # Errors
///
/// Returns an error if the file cannot be read or lacks a required column.
pub fn read_sales(path: &Path, skip_rows: usize) -> Result<Vec<SaleRecord>, DatasetError> {
    let text = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    let sales = parse_sales(&text, skip_rows, path)?;
    log::info!("Read {} sales from {}", sales.len(), path.display());
    Ok(sales)
}

/// Keeps only plausible home sales.
#[must_use]
pub fn filter_home_sales(sales: Vec<SaleRecord>) -> Vec<SaleRecord> {
    let total = sales.len();
    let kept: Vec<SaleRecord> = sales.into_iter().filter(SaleRecord::is_home_sale).collect();
    log::debug!("Kept {} of {total} sales as home sales", kept.len());
    kept
}

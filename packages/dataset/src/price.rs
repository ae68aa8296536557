//! Mean sale price per square foot by modified ZCTA.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::DatasetError;
use crate::modzcta::ModZctaTable;
use crate::sales::{SaleRecord, filter_home_sales, read_sales};

/// Price summary for one modified ZCTA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipPrice {
    /// Modified ZCTA code.
    pub modzcta: i64,
    /// Mean of per-sale `sale_price / gross_square_feet`.
    pub price_per_sqft: f64,
    /// Mean gross square footage.
    pub gross_square_feet: f64,
}

#[derive(Default)]
struct Accumulator {
    price_per_sqft: f64,
    gross_square_feet: f64,
    count: u32,
}

/// Groups home sales by modified ZCTA and averages their price per square
/// foot and size. Sales whose zip code has no modified ZCTA are dropped.
/// Rows come back ordered by modified ZCTA.
#[must_use]
pub fn summarize_sales(sales: &[SaleRecord], table: &ModZctaTable) -> Vec<ZipPrice> {
    let mut groups: BTreeMap<i64, Accumulator> = BTreeMap::new();
    let mut unassigned = 0usize;

    for sale in sales {
        let (Some(ppsf), Some(sqft)) = (sale.price_per_sqft(), sale.gross_square_feet) else {
            continue;
        };
        let Some(modzcta) = sale.zip_code.and_then(|zip| table.assign(zip)) else {
            unassigned += 1;
            continue;
        };
        let acc = groups.entry(modzcta).or_default();
        acc.price_per_sqft += ppsf;
        acc.gross_square_feet += sqft;
        acc.count += 1;
    }

    if unassigned > 0 {
        log::warn!("{unassigned} sales had no matching modified ZCTA");
    }

    groups
        .into_iter()
        .map(|(modzcta, acc)| {
            let n = f64::from(acc.count);
            ZipPrice {
                modzcta,
                price_per_sqft: acc.price_per_sqft / n,
                gross_square_feet: acc.gross_square_feet / n,
            }
        })
        .collect()
}

/// Reads, filters and summarizes each sales file, concatenating the
/// per-file summaries in input order.
///
/// A modified ZCTA that has sales in several files appears once per file.
///
/// # Errors
///
/// Returns an error if any sales file cannot be read.
pub fn price_per_zip(
    files: &[impl AsRef<Path>],
    skip_rows: usize,
    table: &ModZctaTable,
) -> Result<Vec<ZipPrice>, DatasetError> {
    let mut result = Vec::new();
    for file in files {
        let path = file.as_ref();
        let homes = filter_home_sales(read_sales(path, skip_rows)?);
        let summary = summarize_sales(&homes, table);
        log::info!(
            "{}: {} home sales across {} modified ZCTAs",
            path.display(),
            homes.len(),
            summary.len()
        );
        result.extend(summary);
    }
    Ok(result)
}

/// Writes price rows as CSV with a header.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_prices(path: &Path, rows: &[ZipPrice]) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| DatasetError::csv(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| DatasetError::csv(path, e))?;
    }
    writer.flush().map_err(|e| DatasetError::io(path, e))?;
    log::info!("Wrote {} price rows to {}", rows.len(), path.display());
    Ok(())
}

/// Reads price rows written by [`write_prices`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row is malformed.
pub fn read_prices(path: &Path) -> Result<Vec<ZipPrice>, DatasetError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DatasetError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<ZipPrice>, _>>()
        .map_err(|e| DatasetError::csv(path, e))
}

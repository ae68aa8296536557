//! Area-normalized model frame for the external regression step.
//!
//! Joins the per-block table with the price-per-zip table on modified ZCTA
//! and divides every count by block area. A block matches every price row
//! sharing its modified ZCTA, so a zip area summarized from several sales
//! files yields one frame row per file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::DatasetError;
use crate::price::ZipPrice;

/// Columns of the per-block table the frame is built from.
pub const FULL_DATA_COLUMNS: &[&str] = &[
    "bctcb2020",
    "shape_area",
    "modzcta",
    "boroname",
    "perc_no_internet",
    "numGrocery",
    "numRestaurant",
    "numSubway",
    "numCrime",
    "numViolent",
];

/// Predictors checked for collinearity before fitting.
pub const PREDICTORS: &[&str] = &[
    "groc_per_area",
    "rest_per_area",
    "subw_per_area",
    "viol_per_area",
    "percNoInternet",
];

#[derive(Debug, Clone, Deserialize)]
struct FullDataRow {
    bctcb2020: String,
    shape_area: f64,
    modzcta: Option<i64>,
    boroname: String,
    perc_no_internet: Option<f64>,
    #[serde(rename = "numGrocery")]
    num_grocery: u64,
    #[serde(rename = "numRestaurant")]
    num_restaurant: u64,
    #[serde(rename = "numSubway")]
    num_subway: u64,
    #[serde(rename = "numCrime")]
    num_crime: u64,
    #[serde(rename = "numViolent")]
    num_violent: u64,
}

/// One row of the model frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRow {
    pub price_per_sqft: f64,
    pub log_price_per_sqft: f64,
    pub groc_per_area: f64,
    pub rest_per_area: f64,
    pub subw_per_area: f64,
    pub crim_per_area: f64,
    pub viol_per_area: f64,
    #[serde(rename = "percNoInternet")]
    pub perc_no_internet: f64,
    pub bctcb2020: String,
    pub boroname: String,
    pub modzcta: i64,
}

impl ModelRow {
    /// Values of [`PREDICTORS`], in order.
    #[must_use]
    pub const fn predictors(&self) -> [f64; 5] {
        [
            self.groc_per_area,
            self.rest_per_area,
            self.subw_per_area,
            self.viol_per_area,
            self.perc_no_internet,
        ]
    }
}

#[allow(clippy::cast_precision_loss)]
fn build_row(block: &FullDataRow, modzcta: i64, internet: f64, price: &ZipPrice) -> ModelRow {
    let per_area = |count: u64| count as f64 / block.shape_area;
    ModelRow {
        price_per_sqft: price.price_per_sqft,
        log_price_per_sqft: price.price_per_sqft.ln(),
        groc_per_area: per_area(block.num_grocery),
        rest_per_area: per_area(block.num_restaurant),
        subw_per_area: per_area(block.num_subway),
        crim_per_area: per_area(block.num_crime),
        viol_per_area: per_area(block.num_violent),
        perc_no_internet: internet,
        bctcb2020: block.bctcb2020.clone(),
        boroname: block.boroname.clone(),
        modzcta,
    }
}

fn join(blocks: &[FullDataRow], prices: &[ZipPrice]) -> Vec<ModelRow> {
    let mut by_zip: BTreeMap<i64, Vec<&ZipPrice>> = BTreeMap::new();
    for price in prices.iter().filter(|p| p.price_per_sqft > 0.0) {
        by_zip.entry(price.modzcta).or_default().push(price);
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for block in blocks {
        let (Some(modzcta), Some(internet)) = (block.modzcta, block.perc_no_internet) else {
            skipped += 1;
            continue;
        };
        if block.shape_area.is_nan() || block.shape_area <= 0.0 {
            skipped += 1;
            continue;
        }
        if let Some(matches) = by_zip.get(&modzcta) {
            rows.extend(
                matches
                    .iter()
                    .map(|price| build_row(block, modzcta, internet, price)),
            );
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} blocks without a modified ZCTA, internet value or area");
    }
    rows
}

fn read_full_data(path: &Path) -> Result<Vec<FullDataRow>, DatasetError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DatasetError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| DatasetError::csv(path, e))?;
    crate::require_columns(path, headers, FULL_DATA_COLUMNS)?;
    reader
        .deserialize()
        .collect::<Result<Vec<FullDataRow>, _>>()
        .map_err(|e| DatasetError::csv(path, e))
}

/// Builds the model frame from a per-block table file and price rows.
///
/// # Errors
///
/// Returns an error if the per-block table cannot be read or lacks a
/// column the frame needs.
pub fn build_model_frame(
    full_data: &Path,
    prices: &[ZipPrice],
) -> Result<Vec<ModelRow>, DatasetError> {
    let blocks = read_full_data(full_data)?;
    let rows = join(&blocks, prices);
    log::info!(
        "Joined {} blocks with {} price rows into {} model rows",
        blocks.len(),
        prices.len(),
        rows.len()
    );
    Ok(rows)
}

/// Writes the model frame as CSV with a header.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_model_frame(path: &Path, rows: &[ModelRow]) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| DatasetError::csv(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| DatasetError::csv(path, e))?;
    }
    writer.flush().map_err(|e| DatasetError::io(path, e))?;
    log::info!("Wrote {} model rows to {}", rows.len(), path.display());
    Ok(())
}

/// Pearson correlation between every pair of [`PREDICTORS`].
///
/// Entries involving a constant predictor are NaN.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn predictor_correlations(rows: &[ModelRow]) -> Vec<Vec<f64>> {
    let k = PREDICTORS.len();
    let n = rows.len() as f64;
    let values: Vec<[f64; 5]> = rows.iter().map(ModelRow::predictors).collect();

    let mut means = [0.0; 5];
    for v in &values {
        for (m, x) in means.iter_mut().zip(v) {
            *m += x / n;
        }
    }

    (0..k)
        .map(|i| (0..k).map(|j| pearson(&values, &means, i, j)).collect())
        .collect()
}

fn pearson(values: &[[f64; 5]], means: &[f64; 5], i: usize, j: usize) -> f64 {
    let (mut cov, mut var_i, mut var_j) = (0.0, 0.0, 0.0);
    for v in values {
        let di = v[i] - means[i];
        let dj = v[j] - means[j];
        cov += di * dj;
        var_i += di * di;
        var_j += dj * dj;
    }
    cov / (var_i * var_j).sqrt()
}

//! Census block loading and zip-level joins.
//!
//! Blocks come from a `GeoJSON` feature collection. They are then inner
//! joined to the block-to-ZCTA lookup and left joined to internet access
//! by modified ZCTA; blocks missing either value are dropped.

use std::collections::BTreeMap;
use std::path::Path;

use desirability_geography_models::{BOROUGHS, Block};
use desirability_spatial::geometry_to_multipolygon;
use geojson::{Feature, GeoJson};
use serde::Deserialize;
use serde_json::Value;

use crate::{DatasetError, parse_int_like, require_columns};

/// Column in the zip lookup holding the block GEOID.
pub const LOOKUP_BLOCK_COLUMN: &str = "GEOID_TABBLOCK_20";
/// Column in the zip lookup holding the ZCTA.
pub const LOOKUP_ZCTA_COLUMN: &str = "GEOID_ZCTA5_20";
/// Column in the internet table holding the modified ZCTA.
pub const INTERNET_ZIP_COLUMN: &str = "modzcta";
/// Column in the internet table holding the no-access percentage.
pub const INTERNET_VALUE_COLUMN: &str = "No Internet Access (Percentage of Households)";

fn property<'a>(feature: &'a Feature, key: &str) -> Option<&'a Value> {
    feature.properties.as_ref()?.get(key)
}

fn property_string(feature: &Feature, key: &str) -> Option<String> {
    match property(feature, key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn property_f64(feature: &Feature, key: &str) -> Option<f64> {
    let value = match property(feature, key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn property_i64(feature: &Feature, key: &str) -> Option<i64> {
    match property(feature, key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(|f| parse_int_like(&f.to_string()))),
        Value::String(s) => parse_int_like(s),
        _ => None,
    }
}

/// Converts one feature into a [`Block`], or `None` if any required
/// property or the geometry is missing or invalid.
fn feature_to_block(feature: Feature) -> Option<Block> {
    let code = property_string(&feature, "bctcb2020")?;
    let geoid = property_i64(&feature, "geoid")?;
    let borough = property_string(&feature, "boroname")?;
    let area = property_f64(&feature, "shape_area")?;
    let polygon = geometry_to_multipolygon(feature.geometry?)?;

    Some(Block {
        code,
        geoid,
        borough,
        area,
        polygon,
        modzcta: None,
        perc_no_internet: None,
    })
}

/// Parses blocks from `GeoJSON` text. Features that cannot be converted
/// are dropped and counted in the returned tuple.
///
/// # Errors
///
/// Returns an error if the text is not a `GeoJSON` feature collection.
pub fn parse_blocks(text: &str, origin: &Path) -> Result<(Vec<Block>, usize), DatasetError> {
    let geojson: GeoJson = text.parse().map_err(|e| DatasetError::GeoJson {
        path: origin.display().to_string(),
        source: Box::new(e),
    })?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(DatasetError::NotFeatureCollection {
            path: origin.display().to_string(),
        });
    };

    let total = collection.features.len();
    let blocks: Vec<Block> = collection
        .features
        .into_iter()
        .filter_map(feature_to_block)
        .collect();

    let dropped = total - blocks.len();
    Ok((blocks, dropped))
}

/// Loads census blocks from a `GeoJSON` feature collection.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a `GeoJSON`
/// feature collection.
pub fn load_blocks(path: &Path) -> Result<Vec<Block>, DatasetError> {
    let text = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    let (blocks, dropped) = parse_blocks(&text, path)?;

    if dropped > 0 {
        log::warn!(
            "Dropped {dropped} block features with missing properties or non-polygon geometry"
        );
    }
    for borough in blocks
        .iter()
        .map(|b| b.borough.as_str())
        .filter(|b| !BOROUGHS.contains(b))
        .collect::<std::collections::BTreeSet<_>>()
    {
        log::warn!("Unrecognized borough name '{borough}' in block data");
    }

    log::info!("Loaded {} blocks from {}", blocks.len(), path.display());
    Ok(blocks)
}

#[derive(Debug, Deserialize)]
struct ZipLookupRow {
    #[serde(rename = "GEOID_TABBLOCK_20")]
    block_geoid: Option<String>,
    #[serde(rename = "GEOID_ZCTA5_20")]
    zcta: Option<String>,
}

/// Reads the block GEOID to ZCTA lookup. When a GEOID is listed more than
/// once, the first listed ZCTA wins.
///
/// # Errors
///
/// Returns an error if the file cannot be read or lacks a required column.
pub fn load_zip_lookup(path: &Path) -> Result<BTreeMap<i64, i64>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| DatasetError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| DatasetError::csv(path, e))?;
    require_columns(path, headers, &[LOOKUP_BLOCK_COLUMN, LOOKUP_ZCTA_COLUMN])?;

    let mut lookup = BTreeMap::new();
    for result in reader.deserialize::<ZipLookupRow>() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("skipping malformed zip lookup row: {e}");
                continue;
            }
        };
        let (Some(geoid), Some(zcta)) = (
            row.block_geoid.as_deref().and_then(parse_int_like),
            row.zcta.as_deref().and_then(parse_int_like),
        ) else {
            continue;
        };
        lookup.entry(geoid).or_insert(zcta);
    }

    log::info!("Loaded {} block->ZCTA mappings", lookup.len());
    Ok(lookup)
}

/// Reads the internet access table keyed by modified ZCTA. When a zip is
/// listed more than once, the first listed value wins. Records that cannot
/// be read are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or lacks a required column.
pub fn load_internet(path: &Path) -> Result<BTreeMap<i64, f64>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| DatasetError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| DatasetError::csv(path, e))?.clone();
    require_columns(path, &headers, &[INTERNET_ZIP_COLUMN, INTERNET_VALUE_COLUMN])?;

    let zip_idx = headers.iter().position(|h| h.trim() == INTERNET_ZIP_COLUMN);
    let value_idx = headers.iter().position(|h| h.trim() == INTERNET_VALUE_COLUMN);

    let mut table = BTreeMap::new();
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("skipping malformed internet row: {e}");
                continue;
            }
        };
        let zip = zip_idx.and_then(|i| record.get(i)).and_then(parse_int_like);
        let value = value_idx
            .and_then(|i| record.get(i))
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());
        if let (Some(zip), Some(value)) = (zip, value) {
            table.entry(zip).or_insert(value);
        }
    }

    log::info!("Loaded internet access for {} zip areas", table.len());
    Ok(table)
}

/// Attaches a ZCTA to each block by GEOID, dropping blocks with no match.
#[must_use]
pub fn join_zip_lookup(blocks: Vec<Block>, lookup: &BTreeMap<i64, i64>) -> Vec<Block> {
    let before = blocks.len();
    let joined: Vec<Block> = blocks
        .into_iter()
        .filter_map(|mut block| {
            block.modzcta = Some(*lookup.get(&block.geoid)?);
            Some(block)
        })
        .collect();

    if joined.len() < before {
        log::warn!("Dropped {} blocks without a ZCTA", before - joined.len());
    }
    joined
}

/// Attaches the no-internet percentage to each block by ZCTA, dropping
/// blocks with no value.
#[must_use]
pub fn join_internet(blocks: Vec<Block>, internet: &BTreeMap<i64, f64>) -> Vec<Block> {
    let before = blocks.len();
    let joined: Vec<Block> = blocks
        .into_iter()
        .filter_map(|mut block| {
            let zip = block.modzcta?;
            block.perc_no_internet = Some(*internet.get(&zip)?);
            Some(block)
        })
        .collect();

    if joined.len() < before {
        log::warn!(
            "Dropped {} blocks without internet access data",
            before - joined.len()
        );
    }
    joined
}

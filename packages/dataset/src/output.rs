//! Per-block output table writer.

use std::path::{Path, PathBuf};

use desirability_aggregate::AggregationTable;
use desirability_geography_models::{Block, BlockAttributes};
use desirability_source_models::Target;

use crate::DatasetError;

/// Header row for a table with the given target columns.
#[must_use]
pub fn header(table: &AggregationTable) -> Vec<&str> {
    BlockAttributes::COLUMNS
        .iter()
        .copied()
        .chain(table.targets().iter().map(Target::column))
        .collect()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes one row per block: block attributes followed by the target
/// counts, in block order.
///
/// The table is written to a sibling `.tmp` file first and renamed into
/// place once complete.
///
/// # Errors
///
/// Returns [`DatasetError::RowCountMismatch`] if `table` does not have one
/// row per block, or an I/O or CSV error if writing fails.
pub fn write_full_data(
    path: &Path,
    blocks: &[Block],
    table: &AggregationTable,
) -> Result<(), DatasetError> {
    if blocks.len() != table.len() {
        return Err(DatasetError::RowCountMismatch {
            blocks: blocks.len(),
            rows: table.len(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
    }

    let tmp = temp_sibling(path);
    let result = write_rows(&tmp, blocks, table);
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path).map_err(|e| DatasetError::io(path, e))?;

    log::info!("Wrote {} rows to {}", blocks.len(), path.display());
    Ok(())
}

fn write_rows(
    path: &Path,
    blocks: &[Block],
    table: &AggregationTable,
) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| DatasetError::csv(path, e))?;
    writer
        .write_record(header(table))
        .map_err(|e| DatasetError::csv(path, e))?;

    for (block, row) in blocks.iter().zip(table.rows()) {
        let centroid = desirability_spatial::centroid(&block.polygon);
        let mut record = BlockAttributes::new(block, centroid).to_record();
        record.extend(row.iter().map(|(_, count)| count.to_string()));
        writer
            .write_record(&record)
            .map_err(|e| DatasetError::csv(path, e))?;
    }

    writer.flush().map_err(|e| DatasetError::io(path, e))
}

#[cfg(test)]
mod tests {
    use desirability_aggregate::progress::null_progress;
    use desirability_aggregate::{aggregate_exact, run_sequential};
    use desirability_source_models::{PointDetail, SourceDataset, SourceKind, SourcePoint};
    use geo::{LineString, MultiPolygon, Polygon};

    use super::*;

    fn block(code: &str, lon: f64) -> Block {
        let ring = LineString::from(vec![
            (lon, 40.70),
            (lon + 0.002, 40.70),
            (lon + 0.002, 40.702),
            (lon, 40.702),
            (lon, 40.70),
        ]);
        Block {
            code: code.to_string(),
            geoid: 360_470_001_001_000,
            borough: "Brooklyn".to_string(),
            area: 4_000.0,
            polygon: MultiPolygon(vec![Polygon::new(ring, vec![])]),
            modzcta: Some(11_201),
            perc_no_internet: Some(12.5),
        }
    }

    #[test]
    fn writes_header_and_rows_in_block_order() {
        let blocks = vec![block("3000100", -73.99), block("3000200", -73.98)];
        let table = run_sequential(&blocks, &[], &null_progress());
        let path = std::env::temp_dir()
            .join("desirability_output_test")
            .join("fullData.csv");

        write_full_data(&path, &blocks, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "bctcb2020,geoid,boroname,shape_area,modzcta,perc_no_internet,centroid_lat,centroid_lon"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("3000100,"), "{}", lines[1]);
        assert!(lines[2].starts_with("3000200,"), "{}", lines[2]);
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn target_columns_follow_block_attributes() {
        let blocks = vec![block("3000100", -73.99), block("3000200", -73.98)];
        let groceries = SourceDataset::new(
            SourceKind::Grocery,
            vec![SourcePoint {
                id: 0,
                latitude: 40.701,
                longitude: -73.989,
                detail: PointDetail::Grocery,
            }],
        );
        let index = desirability_spatial::BlockIndex::build(&blocks);
        let sources = vec![aggregate_exact(&groceries, &blocks, |p| {
            index.locate(p.latitude, p.longitude)
        })];
        let table = run_sequential(&blocks, &sources, &null_progress());
        let path = std::env::temp_dir()
            .join("desirability_output_targets")
            .join("fullData.csv");

        write_full_data(&path, &blocks, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with(",centroid_lon,numGrocery"), "{}", lines[0]);
        assert!(lines[1].ends_with(",1"), "{}", lines[1]);
        assert!(lines[2].ends_with(",1"), "{}", lines[2]);
    }

    #[test]
    fn mismatched_row_count_writes_nothing() {
        let blocks = vec![block("3000100", -73.99)];
        let table = run_sequential(&[], &[], &null_progress());
        let path = std::env::temp_dir()
            .join("desirability_output_mismatch")
            .join("fullData.csv");
        let _ = std::fs::remove_file(&path);

        let err = write_full_data(&path, &blocks, &table).unwrap_err();
        assert!(
            matches!(err, DatasetError::RowCountMismatch { blocks: 1, rows: 0 }),
            "{err}"
        );
        assert!(!path.exists());
    }

    #[test]
    fn temp_path_is_a_sibling() {
        let tmp = temp_sibling(Path::new("/out/fullData.csv"));
        assert_eq!(tmp, PathBuf::from("/out/fullData.csv.tmp"));
    }
}

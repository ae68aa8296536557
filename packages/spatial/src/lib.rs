#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial primitives for block-level aggregation.
//!
//! Provides the geodesic [`distance`] utility used for catchment checks,
//! polygon centroids, and an in-memory R-tree over census block polygons
//! for exact point-in-block containment lookups.

pub mod distance;
pub mod geometry;

use desirability_geography_models::Block;
use geo::{Contains, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

pub use distance::{GeoDistance, distance};
pub use geometry::{centroid, geometry_to_multipolygon};

/// A block polygon stored in the R-tree with its position in the block list.
struct BlockEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BlockEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree index over block polygons.
///
/// Built once from the loaded block list and then only read. Lookups
/// return positions into that list.
pub struct BlockIndex {
    tree: RTree<BlockEntry>,
}

impl BlockIndex {
    /// Builds the index. Blocks with empty geometry are skipped.
    #[must_use]
    pub fn build(blocks: &[Block]) -> Self {
        let mut skipped = 0usize;
        let entries: Vec<BlockEntry> = blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| {
                let Some(envelope) = geometry::compute_envelope(&block.polygon) else {
                    skipped += 1;
                    return None;
                };
                Some(BlockEntry {
                    index,
                    envelope,
                    polygon: block.polygon.clone(),
                })
            })
            .collect();

        if skipped > 0 {
            log::warn!("Skipped {skipped} blocks with empty geometry while building index");
        }

        let tree = RTree::bulk_load(entries);
        log::info!("Loaded {} blocks into spatial index", tree.size());

        Self { tree }
    }

    /// Number of indexed blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Position of the block containing the point.
    ///
    /// Points on a shared boundary belong to no block. If polygons overlap,
    /// the block listed first wins.
    #[must_use]
    pub fn locate(&self, lat: f64, lon: f64) -> Option<usize> {
        if !distance::is_valid_coordinate((lat, lon)) {
            return None;
        }

        let point = geo::Point::new(lon, lat);
        let query_env = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.index)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Polygon};

    use super::*;

    fn square(min_lon: f64, min_lat: f64, size: f64) -> MultiPolygon<f64> {
        let ring = LineString::from(vec![
            (min_lon, min_lat),
            (min_lon + size, min_lat),
            (min_lon + size, min_lat + size),
            (min_lon, min_lat + size),
            (min_lon, min_lat),
        ]);
        MultiPolygon(vec![Polygon::new(ring, vec![])])
    }

    fn block(code: &str, polygon: MultiPolygon<f64>) -> Block {
        Block {
            code: code.to_string(),
            geoid: 0,
            borough: "Queens".to_string(),
            area: 1.0,
            polygon,
            modzcta: None,
            perc_no_internet: None,
        }
    }

    #[test]
    fn locates_containing_block() {
        let blocks = vec![
            block("a", square(-74.0, 40.0, 0.01)),
            block("b", square(-73.99, 40.0, 0.01)),
        ];
        let index = BlockIndex::build(&blocks);

        assert_eq!(index.len(), 2);
        assert_eq!(index.locate(40.005, -73.995), Some(0));
        assert_eq!(index.locate(40.005, -73.985), Some(1));
        assert_eq!(index.locate(41.0, -73.985), None);
    }

    #[test]
    fn overlap_prefers_first_listed() {
        let blocks = vec![
            block("big", square(-74.0, 40.0, 0.1)),
            block("small", square(-73.99, 40.01, 0.01)),
        ];
        let index = BlockIndex::build(&blocks);
        assert_eq!(index.locate(40.015, -73.985), Some(0));
    }

    #[test]
    fn skips_empty_geometry_and_invalid_points() {
        let blocks = vec![
            block("empty", MultiPolygon(vec![])),
            block("a", square(-74.0, 40.0, 0.01)),
        ];
        let index = BlockIndex::build(&blocks);
        assert_eq!(index.len(), 1);
        assert_eq!(index.locate(40.005, -73.995), Some(1));
        assert_eq!(index.locate(f64::NAN, -73.995), None);
    }
}

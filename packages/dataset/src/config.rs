//! TOML pipeline configuration.
//!
//! ```toml
//! [blocks]
//! geojson = "census_blocks.geojson"
//! zip_lookup = "zcta_to_block.csv"
//! internet = "internet.csv"
//!
//! [sources]
//! crime = "crime_data.csv"
//! grocery = "grocery.csv"
//! restaurant = "restaurant.csv"
//! subway = "subway_stations.csv"
//!
//! [run]
//! workers = 10
//! output = "fullData.csv"
//! ```
//!
//! Relative paths are resolved against the directory holding the config
//! file. Sources may be omitted; only the listed ones are aggregated.

use std::path::{Path, PathBuf};

use desirability_aggregate::DEFAULT_WORKERS;
use desirability_source_models::SourceKind;
use serde::Deserialize;

use crate::DatasetError;

/// Block input files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockInputs {
    /// `GeoJSON` feature collection of census block polygons.
    pub geojson: PathBuf,
    /// CSV mapping block GEOIDs to ZCTAs.
    pub zip_lookup: PathBuf,
    /// CSV of internet access by modified ZCTA.
    pub internet: PathBuf,
}

/// Point-feature source CSVs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceInputs {
    /// Crime incidents.
    pub crime: Option<PathBuf>,
    /// Grocery stores.
    pub grocery: Option<PathBuf>,
    /// Restaurants.
    pub restaurant: Option<PathBuf>,
    /// Subway station entrances.
    pub subway: Option<PathBuf>,
}

impl SourceInputs {
    /// Configured sources in aggregation order.
    #[must_use]
    pub fn configured(&self) -> Vec<(SourceKind, &Path)> {
        SourceKind::ALL
            .iter()
            .filter_map(|kind| {
                let path = match kind {
                    SourceKind::Crime => self.crime.as_deref(),
                    SourceKind::Grocery => self.grocery.as_deref(),
                    SourceKind::Restaurant => self.restaurant.as_deref(),
                    SourceKind::Subway => self.subway.as_deref(),
                };
                path.map(|p| (*kind, p))
            })
            .collect()
    }
}

/// Run settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Number of aggregation workers.
    pub workers: usize,
    /// Output CSV path.
    pub output: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            output: PathBuf::from("fullData.csv"),
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    /// Block inputs.
    pub blocks: BlockInputs,
    /// Source inputs.
    #[serde(default)]
    pub sources: SourceInputs,
    /// Run settings.
    #[serde(default)]
    pub run: RunSettings,
}

impl PipelineConfig {
    /// Parses a config from TOML text, resolving relative paths against
    /// `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Config`] if the TOML is invalid.
    pub fn parse(text: &str, base_dir: &Path, origin: &Path) -> Result<Self, DatasetError> {
        let mut config: Self = toml::from_str(text).map_err(|source| DatasetError::Config {
            path: origin.display().to_string(),
            source,
        })?;
        config.resolve(base_dir);
        Ok(config)
    }

    /// Loads a config file.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Io`] if the file cannot be read or
    /// [`DatasetError::Config`] if it is not valid.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let text = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let config = Self::parse(&text, base_dir, path)?;
        log::info!(
            "Loaded pipeline config from {} ({} sources)",
            path.display(),
            config.sources.configured().len()
        );
        Ok(config)
    }

    fn resolve(&mut self, base_dir: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };

        join(&mut self.blocks.geojson);
        join(&mut self.blocks.zip_lookup);
        join(&mut self.blocks.internet);
        for path in [
            &mut self.sources.crime,
            &mut self.sources.grocery,
            &mut self.sources.restaurant,
            &mut self.sources.subway,
        ]
        .into_iter()
        .flatten()
        {
            join(path);
        }
        join(&mut self.run.output);
    }
}

//! Batch decoding of GINI files.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gini_parser::{decode_product, DecodeOptions, GiniProduct, RasterProductHeader};
use projection::{BoundingBoxProjector, GeostationaryNavigator};
use rayon::prelude::*;
use sat_common::ProjectedRect;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DecoderConfig;

/// Summary statistics over a decoded grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    /// Whether the statistics are over calibrated values or raw counts
    pub calibrated: bool,
}

impl ValueStats {
    fn from_values<I: IntoIterator<Item = f32>>(values: I, calibrated: bool) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v as f64;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| ValueStats {
            min,
            max,
            mean: sum / count as f64,
            calibrated,
        })
    }
}

/// Outcome for one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RasterProductHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ValueStats>,
    /// Product extent in the configured satellite's scan angles (radians)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footprint: Option<ProjectedRect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn failed(path: &Path, error: String) -> Self {
        Self {
            path: path.to_path_buf(),
            header: None,
            stats: None,
            footprint: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Decodes a set of files in parallel with shared settings.
pub struct DecodeJob {
    config: DecoderConfig,
    navigator: Option<GeostationaryNavigator>,
    cancel: CancellationToken,
}

impl DecodeJob {
    pub fn new(config: DecoderConfig, cancel: CancellationToken) -> Result<Self> {
        let navigator = config
            .navigation
            .as_ref()
            .map(|nav| nav.navigator())
            .transpose()?;
        Ok(Self {
            config,
            navigator,
            cancel,
        })
    }

    /// Decode every file. Failures are reported per file.
    pub fn run(&self, files: &[PathBuf]) -> Result<Vec<FileReport>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parallelism)
            .build()
            .context("failed to build decode thread pool")?;

        Ok(pool.install(|| files.par_iter().map(|path| self.decode_file(path)).collect()))
    }

    pub fn decode_file(&self, path: &Path) -> FileReport {
        if self.cancel.is_cancelled() {
            return FileReport::failed(path, "cancelled before decoding".to_string());
        }

        match self.try_decode(path) {
            Ok(report) => report,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "Failed to decode file");
                FileReport::failed(path, format!("{:#}", e))
            }
        }
    }

    fn try_decode(&self, path: &Path) -> Result<FileReport> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let product = decode_product(&mut reader, &DecodeOptions::with_cancel(self.cancel.clone()))?;

        let stats = self.stats(&product);
        let footprint = self.footprint(&product.header)?;
        let header = product.header;

        info!(
            path = %path.display(),
            entity = header.entity_name(),
            sector = header.sector_name(),
            variable = header.variable_name(),
            nx = header.nx(),
            ny = header.ny(),
            time = %header.capture_time(),
            compression = ?header.compression(),
            "Decoded GINI product"
        );

        Ok(FileReport {
            path: path.to_path_buf(),
            header: Some(header),
            stats,
            footprint,
            error: None,
        })
    }

    fn stats(&self, product: &GiniProduct) -> Option<ValueStats> {
        match (&product.values, self.config.calibrate) {
            (Some(values), true) => ValueStats::from_values(values.iter().copied(), true),
            _ => ValueStats::from_values(product.samples.iter().map(|v| v as f32), false),
        }
    }

    fn footprint(&self, header: &RasterProductHeader) -> Result<Option<ProjectedRect>> {
        let (Some(navigator), Some(extent)) = (&self.navigator, header.geographic_extent()) else {
            return Ok(None);
        };
        let rect = BoundingBoxProjector::new(navigator).project(&extent)?;
        if rect.is_none() {
            info!(?extent, "Product lies outside the configured satellite view");
        }
        Ok(rect)
    }
}

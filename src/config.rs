use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Parameters of one classification run, fixed once the run starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Band thickness around each nucleus, in pixels
    pub band_thickness: u8,
    /// Threshold on the mean nucleus-interior intensity of the first channel
    pub first_threshold: f64,
    /// Threshold on the mean band intensity of the second channel
    pub second_threshold: f64,
    /// Minimum nucleus area in pixels²; regions must exceed it
    pub min_area: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            band_thickness: 10,
            first_threshold: 1000.0,
            second_threshold: 2000.0,
            min_area: 200.0,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.first_threshold.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "first threshold must be finite, got {}",
                self.first_threshold
            )));
        }
        if !self.second_threshold.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "second threshold must be finite, got {}",
                self.second_threshold
            )));
        }
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "minimum area must be a finite number >= 0, got {}",
                self.min_area
            )));
        }
        Ok(())
    }

    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| {
            anyhow::anyhow!(
                "Failed to parse config {}: {}",
                path.as_ref().display(),
                e
            )
        })
    }
}

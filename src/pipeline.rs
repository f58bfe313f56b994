use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ThresholdConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::index_set::IndexSet;
use crate::measurement::{
    Classification, Statistic, classify, filter_by_area, measure, measure_bands,
    measure_interiors,
};
use crate::models::{ChannelSet, Region, RegionId};
use crate::report::{AnnotationRequest, report};
use crate::segmentation::Segmenter;
use crate::store::RegionStore;

/// Default bound on the segmentation call
pub const DEFAULT_SEGMENTATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Lifecycle of a classification run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Initialized,
    NucleiLoaded,
    AreaFiltered,
    FirstClassified,
    SecondClassified,
    Compounded,
    Done,
}

/// Size of every set a run produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub detected: usize,
    pub area_filtered: usize,
    pub first_positive: usize,
    pub first_negative: usize,
    pub second_positive: usize,
    pub second_negative: usize,
    pub compound_positive: usize,
    /// Regions left out of the band stage as degenerate
    pub skipped: usize,
}

/// Measurements of one region that passed the area filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionMeasurement {
    pub id: RegionId,
    pub area: u64,
    pub first_mean: f64,
    /// `None` when the region was skipped; `NaN` for an empty band
    pub band_mean: Option<f64>,
}

/// Everything a finished run reports to the caller
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub config: ThresholdConfig,
    pub segmenter: String,
    pub counts: StageCounts,
    pub area_filtered: IndexSet,
    pub first: Classification,
    pub second: Classification,
    pub compound_positive: IndexSet,
    pub skipped: IndexSet,
    pub measurements: Vec<RegionMeasurement>,
    pub annotations: Vec<AnnotationRequest>,
    /// One summary line per stage
    pub log: Vec<String>,
}

impl RunReport {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Classification pipeline orchestrator.
///
/// Owns the region store for one run at a time. A failed run resets to
/// `Idle` and exposes no partial results.
pub struct Pipeline {
    config: ThresholdConfig,
    timeout: Duration,
    state: RunState,
    store: Arc<RegionStore>,
}

impl Pipeline {
    pub fn new(config: ThresholdConfig) -> Self {
        Self {
            config,
            timeout: DEFAULT_SEGMENTATION_TIMEOUT,
            state: RunState::Idle,
            store: Arc::new(RegionStore::new()),
        }
    }

    /// Bound the segmentation call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Regions of the last successful run
    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    /// Drop all regions and return to `Idle`
    pub fn reset(&mut self) {
        self.store = Arc::new(RegionStore::new());
        self.state = RunState::Idle;
    }

    /// Run every stage against `channels`, with nuclei from `segmenter`
    pub async fn run(
        &mut self,
        channels: &ChannelSet,
        segmenter: Arc<dyn Segmenter>,
    ) -> PipelineResult<RunReport> {
        self.reset();
        let start = Instant::now();

        match self.run_stages(channels, segmenter).await {
            Ok(report) => {
                info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "classification finished"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(state = ?self.state, error = %err, "classification aborted");
                self.reset();
                Err(err)
            }
        }
    }

    fn advance(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    async fn run_stages(
        &mut self,
        channels: &ChannelSet,
        segmenter: Arc<dyn Segmenter>,
    ) -> PipelineResult<RunReport> {
        let config = self.config;
        let mut log = Vec::new();

        log.push(format!(
            "Parameters used: thickness={} area={} {} threshold={} {} threshold={}",
            config.band_thickness,
            config.min_area,
            channels.first.name(),
            config.first_threshold,
            channels.second.name(),
            config.second_threshold
        ));
        config.validate()?;
        channels.check_frame()?;
        self.advance(RunState::Initialized);

        let segmenter_name = segmenter.name().to_string();
        let regions = self.segment(channels, segmenter, &segmenter_name).await?;
        Arc::make_mut(&mut self.store).load(regions);
        log.push(format!(
            "Number of objects detected by {}: {}",
            segmenter_name,
            self.store.len()
        ));
        info!(segmenter = %segmenter_name, regions = self.store.len(), "nuclei loaded");
        self.advance(RunState::NucleiLoaded);

        let area_filtered =
            filter_by_area(&self.store.ids(), &self.store, &channels.nuclei, config.min_area)?;
        log.push(format!("Number of cells: {}", area_filtered.len()));
        info!(cells = area_filtered.len(), "area filter finished");
        self.advance(RunState::AreaFiltered);

        // Both stages read only the area-filtered set. Measurement is CPU
        // bound, so it runs on the blocking pool.
        let task = {
            let store = Arc::clone(&self.store);
            let ids = area_filtered.clone();
            let first = channels.first.clone();
            let second = channels.second.clone();
            let thickness = config.band_thickness;
            tokio::task::spawn_blocking(move || {
                rayon::join(
                    || measure_interiors(&ids, &store, &first),
                    || measure_bands(&ids, &store, &second, thickness),
                )
            })
        };
        let (first_means, bands) = match task.await {
            Ok(results) => results,
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        };
        let first_means = first_means?;
        let bands = bands?;

        let first = classify(&area_filtered, &first_means, config.first_threshold);
        log.push(format!(
            "Number of {}+ cells: {}",
            channels.first.name(),
            first.positive.len()
        ));
        log.push(format!(
            "Number of {}- cells: {}",
            channels.first.name(),
            first.negative.len()
        ));
        self.advance(RunState::FirstClassified);

        let band_ids = area_filtered.difference(&bands.skipped);
        let second = classify(&band_ids, &bands.values, config.second_threshold);
        let empty_bands = bands.values.values().filter(|v| v.is_nan()).count();
        if empty_bands > 0 {
            warn!(empty_bands, "bands without pixels classified negative");
        }
        log.push(format!(
            "Number of {}+ cells: {}",
            channels.second.name(),
            second.positive.len()
        ));
        log.push(format!(
            "Number of {}- cells: {}",
            channels.second.name(),
            second.negative.len()
        ));
        self.advance(RunState::SecondClassified);

        let compound_positive = second.positive.intersection(&first.positive);
        self.advance(RunState::Compounded);

        let summary = report(&self.store, &first.positive, &second.positive)?;
        log.push(format!(
            "Number of {}+ AND {}+ cells: {}",
            channels.first.name(),
            channels.second.name(),
            summary.compound_positive
        ));
        log.push(format!("Number of skipped regions: {}", bands.skipped.len()));

        let counts = StageCounts {
            detected: self.store.len(),
            area_filtered: area_filtered.len(),
            first_positive: first.positive.len(),
            first_negative: first.negative.len(),
            second_positive: second.positive.len(),
            second_negative: second.negative.len(),
            compound_positive: compound_positive.len(),
            skipped: bands.skipped.len(),
        };
        info!(
            cells = counts.area_filtered,
            first_positive = counts.first_positive,
            second_positive = counts.second_positive,
            compound_positive = counts.compound_positive,
            skipped = counts.skipped,
            "classification counts"
        );

        let measurements = area_filtered
            .iter()
            .map(|id| {
                let region = self.store.get(id)?;
                Ok(RegionMeasurement {
                    id,
                    area: measure(region, &channels.nuclei, Statistic::Area)? as u64,
                    first_mean: first_means.get(&id).copied().unwrap_or(f64::NAN),
                    band_mean: bands.values.get(&id).copied(),
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        self.advance(RunState::Done);

        Ok(RunReport {
            config,
            segmenter: segmenter_name,
            counts,
            area_filtered,
            first,
            second,
            compound_positive,
            skipped: bands.skipped,
            measurements,
            annotations: summary.annotations,
            log,
        })
    }

    /// Call the collaborator on a blocking worker, bounded by the timeout
    async fn segment(
        &self,
        channels: &ChannelSet,
        segmenter: Arc<dyn Segmenter>,
        name: &str,
    ) -> PipelineResult<Vec<Region>> {
        let nuclei = channels.nuclei.clone();
        let task = tokio::task::spawn_blocking(move || segmenter.segment(&nuclei));

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(PipelineError::SegmentationUnavailable(format!(
                "{} timed out after {:?}",
                name, self.timeout
            ))),
            Ok(Err(join_err)) => Err(PipelineError::SegmentationUnavailable(format!(
                "{} worker failed: {}",
                name, join_err
            ))),
            Ok(Ok(Err(err))) => Err(PipelineError::SegmentationUnavailable(format!(
                "{}: {:#}",
                name, err
            ))),
            Ok(Ok(Ok(regions))) => Ok(regions),
        }
    }
}

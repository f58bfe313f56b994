pub mod area;
pub mod band;
pub mod sampler;
pub mod threshold;

pub use area::filter_by_area;
pub use band::make_band;
pub use sampler::{Footprint, Statistic, measure};
pub use threshold::{Classification, Measurements, classify};

use rayon::prelude::*;
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};
use crate::index_set::IndexSet;
use crate::models::{Channel, RegionId};
use crate::store::RegionStore;

/// Band measurements plus the regions whose band could not be built
#[derive(Debug, Clone, Default)]
pub struct BandMeasurements {
    pub values: Measurements,
    pub skipped: IndexSet,
}

/// Mean of `channel` over each region interior
pub fn measure_interiors(
    ids: &IndexSet,
    store: &RegionStore,
    channel: &Channel,
) -> PipelineResult<Measurements> {
    let values = ids
        .as_slice()
        .par_iter()
        .map(|&id| {
            let mean = measure(store.get(id)?, channel, Statistic::Mean)?;
            Ok((id, mean))
        })
        .collect::<PipelineResult<Vec<(RegionId, f64)>>>()?;
    Ok(values.into_iter().collect())
}

/// Mean of `channel` over each region's band.
///
/// A degenerate region is recorded in `skipped` and the batch continues;
/// any other error aborts.
pub fn measure_bands(
    ids: &IndexSet,
    store: &RegionStore,
    channel: &Channel,
    thickness: u8,
) -> PipelineResult<BandMeasurements> {
    let outcomes = ids
        .as_slice()
        .par_iter()
        .map(|&id| {
            let band = match make_band(store.get(id)?, thickness) {
                Ok(band) => band,
                Err(PipelineError::DegenerateRegion(_)) => return Ok((id, None)),
                Err(err) => return Err(err),
            };
            Ok((id, Some(measure(&band, channel, Statistic::Mean)?)))
        })
        .collect::<PipelineResult<Vec<(RegionId, Option<f64>)>>>()?;

    let mut result = BandMeasurements::default();
    for (id, mean) in outcomes {
        match mean {
            Some(mean) => {
                result.values.insert(id, mean);
            }
            None => {
                warn!(region = %id, "degenerate region skipped during band measurement");
                result.skipped.insert(id);
            }
        }
    }
    Ok(result)
}

use tracing::debug;

use crate::error::PipelineResult;
use crate::index_set::IndexSet;
use crate::measurement::sampler::{Statistic, measure};
use crate::models::Channel;
use crate::store::RegionStore;

/// Keep the ids whose region area is strictly greater than `min_area`.
/// Output order follows `ids`.
pub fn filter_by_area(
    ids: &IndexSet,
    store: &RegionStore,
    channel: &Channel,
    min_area: f64,
) -> PipelineResult<IndexSet> {
    let mut kept = IndexSet::new();
    for id in ids {
        let area = measure(store.get(id)?, channel, Statistic::Area)?;
        if area > min_area {
            kept.insert(id);
        }
    }

    debug!(
        candidates = ids.len(),
        kept = kept.len(),
        min_area,
        "area filter applied"
    );
    Ok(kept)
}

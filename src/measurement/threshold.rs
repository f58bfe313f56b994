use std::collections::HashMap;

use serde::Serialize;

use crate::index_set::IndexSet;
use crate::models::RegionId;

/// Per-region statistic values
pub type Measurements = HashMap<RegionId, f64>;

/// Positive/negative partition of an index set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub positive: IndexSet,
    pub negative: IndexSet,
}

/// Partition `ids` by `value > threshold`.
///
/// Order follows `ids`. A missing or `NaN` value never exceeds the
/// threshold and lands in `negative`.
pub fn classify(ids: &IndexSet, measurements: &Measurements, threshold: f64) -> Classification {
    let mut result = Classification::default();
    for id in ids {
        match measurements.get(&id) {
            Some(&value) if value > threshold => result.positive.insert(id),
            _ => result.negative.insert(id),
        };
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict_and_ordered() {
        let ids: IndexSet = [4, 2, 7, 1].into_iter().map(RegionId).collect();
        let measurements: Measurements = [
            (RegionId(4), 2500.0),
            (RegionId(2), 2000.0),
            (RegionId(7), 2000.5),
            (RegionId(1), f64::NAN),
        ]
        .into_iter()
        .collect();

        let result = classify(&ids, &measurements, 2000.0);
        assert_eq!(result.positive.as_slice(), &[RegionId(4), RegionId(7)]);
        assert_eq!(result.negative.as_slice(), &[RegionId(2), RegionId(1)]);
    }
}

use std::collections::HashMap;

use crate::error::{PipelineError, PipelineResult};
use crate::index_set::IndexSet;
use crate::models::{Region, RegionId};

/// Holds the candidate regions of the current run, in detection order
#[derive(Debug, Clone, Default)]
pub struct RegionStore {
    regions: Vec<Region>,
    positions: HashMap<RegionId, usize>,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current regions. A repeated id keeps its first occurrence.
    pub fn load(&mut self, regions: Vec<Region>) {
        self.reset();
        for region in regions {
            if self.positions.contains_key(&region.id()) {
                continue;
            }
            self.positions.insert(region.id(), self.regions.len());
            self.regions.push(region);
        }
    }

    pub fn get(&self, id: RegionId) -> PipelineResult<&Region> {
        self.positions
            .get(&id)
            .map(|&pos| &self.regions[pos])
            .ok_or(PipelineError::NotFound(id))
    }

    pub fn reset(&mut self) {
        self.regions.clear();
        self.positions.clear();
    }

    /// Every loaded id, in insertion order
    pub fn ids(&self) -> IndexSet {
        self.regions.iter().map(Region::id).collect()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_reset_is_not_found() {
        let mut store = RegionStore::new();
        store.load(vec![Region::from_pixels(RegionId(4), &[(0, 0)])]);
        assert_eq!(store.get(RegionId(4)).unwrap().area(), 1);

        store.reset();
        assert!(matches!(
            store.get(RegionId(4)),
            Err(PipelineError::NotFound(RegionId(4)))
        ));
    }

    #[test]
    fn test_load_replaces_previous_regions() {
        let mut store = RegionStore::new();
        store.load(vec![Region::from_pixels(RegionId(1), &[(0, 0)])]);
        store.load(vec![
            Region::from_pixels(RegionId(3), &[(1, 1)]),
            Region::from_pixels(RegionId(2), &[(2, 2)]),
        ]);
        assert!(store.get(RegionId(1)).is_err());
        assert_eq!(store.ids().as_slice(), &[RegionId(3), RegionId(2)]);
    }
}

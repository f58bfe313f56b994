mod common;

use common::*;
use nucleiband::measurement::make_band;
use proptest::prelude::*;

const CELL: u32 = 40;
const GRID: u32 = 4;

/// One square nucleus per grid cell, with its own interior and band levels
#[derive(Debug, Clone)]
struct Nucleus {
    side: u32,
    interior: u16,
    band: u16,
}

fn nucleus() -> impl Strategy<Value = Nucleus> {
    (1u32..20, 0u16..4000, 0u16..4000).prop_map(|(side, interior, band)| Nucleus {
        side,
        interior,
        band,
    })
}

fn origin(i: usize) -> (u32, u32) {
    let i = i as u32;
    ((i % GRID) * CELL + 10, (i / GRID) * CELL + 10)
}

fn build(nuclei: &[Nucleus]) -> (Vec<Region>, ChannelSet) {
    let size = CELL * GRID;
    let regions: Vec<Region> = nuclei
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let (x, y) = origin(i);
            rect_region(i as u32, x, y, n.side, n.side)
        })
        .collect();

    let cell_of = |x: u32, y: u32| -> Option<(usize, bool)> {
        let i = ((y / CELL) * GRID + x / CELL) as usize;
        let n = nuclei.get(i)?;
        let (ox, oy) = origin(i);
        let inside = (ox..ox + n.side).contains(&x) && (oy..oy + n.side).contains(&y);
        Some((i, inside))
    };

    let first = channel_from_fn("first", size, size, |x, y| match cell_of(x, y) {
        Some((i, true)) => nuclei[i].interior,
        _ => 0,
    });
    let second = channel_from_fn("second", size, size, |x, y| match cell_of(x, y) {
        Some((i, false)) => nuclei[i].band,
        _ => 0,
    });
    let channels = channel_set(uniform_channel("nuclei", size, size, 1), first, second);
    (regions, channels)
}

fn run(config: ThresholdConfig, nuclei: &[Nucleus]) -> nucleiband::RunReport {
    let (regions, channels) = build(nuclei);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let mut pipeline = Pipeline::new(config);
    runtime
        .block_on(pipeline.run(&channels, FixedSegmenter::new(regions)))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_sets_are_consistent(
        nuclei in prop::collection::vec(nucleus(), 0..16),
        thickness in 0u8..8,
        first_threshold in 0.0f64..4000.0,
        second_threshold in 0.0f64..4000.0,
        min_area in 0.0f64..200.0,
    ) {
        let config = ThresholdConfig {
            band_thickness: thickness,
            first_threshold,
            second_threshold,
            min_area,
        };
        let report = run(config, &nuclei);
        let all: IndexSet = (0..nuclei.len() as u32).map(RegionId).collect();

        prop_assert!(report.area_filtered.len() <= nuclei.len());
        prop_assert!(report.area_filtered.is_subset(&all));
        for id in &report.area_filtered {
            let side = nuclei[id.0 as usize].side as f64;
            prop_assert!(side * side > min_area);
        }

        for stage in [&report.first, &report.second] {
            prop_assert!(stage.positive.intersection(&stage.negative).is_empty());
            let mut union = stage.positive.clone();
            for id in &stage.negative {
                union.insert(id);
            }
            prop_assert_eq!(union.len(), report.area_filtered.len());
            prop_assert!(union.is_subset(&report.area_filtered));
        }

        let expected = report.second.positive.intersection(&report.first.positive);
        prop_assert_eq!(&report.compound_positive, &expected);
        prop_assert_eq!(
            &expected.intersection(&report.first.positive),
            &report.compound_positive
        );
        prop_assert!(report.compound_positive.is_subset(&report.area_filtered));
    }

    #[test]
    fn prop_band_is_deterministic_and_disjoint(
        side in 1u32..15,
        thickness in 0u8..10,
    ) {
        let region = rect_region(0, 20, 20, side, side);
        let a = make_band(&region, thickness).unwrap();
        let b = make_band(&region, thickness).unwrap();
        prop_assert_eq!(&a, &b);
        for (x, y) in region.mask().pixels() {
            prop_assert!(!a.mask().contains(x, y));
        }
    }
}

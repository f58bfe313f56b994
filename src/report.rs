use image::{GrayImage, Rgb, RgbImage, imageops};
use imageproc::distance_transform::Norm;
use imageproc::morphology::erode;
use serde::Serialize;

use crate::error::PipelineResult;
use crate::index_set::IndexSet;
use crate::models::{Channel, RegionId};
use crate::store::RegionStore;

/// Visual class of an annotated region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationClass {
    /// Positive in both stages
    CompoundPositive,
    /// Positive by band intensity only
    SecondPositiveOnly,
    /// Positive by nucleus intensity, annotated in the second pass
    FirstPositive,
}

/// Stroke, fill and width of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnotationStyle {
    pub stroke: [u8; 3],
    pub fill: Option<[u8; 3]>,
    pub width: u32,
}

const RED: [u8; 3] = [255, 0, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const ORANGE: [u8; 3] = [255, 200, 0];
const YELLOW: [u8; 3] = [255, 255, 0];

impl AnnotationClass {
    pub fn style(self) -> AnnotationStyle {
        match self {
            AnnotationClass::CompoundPositive => AnnotationStyle {
                stroke: ORANGE,
                fill: Some(YELLOW),
                width: 2,
            },
            AnnotationClass::SecondPositiveOnly => AnnotationStyle {
                stroke: GREEN,
                fill: None,
                width: 2,
            },
            AnnotationClass::FirstPositive => AnnotationStyle {
                stroke: RED,
                fill: Some(RED),
                width: 1,
            },
        }
    }
}

/// One request to the rendering surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRequest {
    pub region_id: RegionId,
    pub class: AnnotationClass,
    pub style: AnnotationStyle,
}

impl AnnotationRequest {
    fn new(region_id: RegionId, class: AnnotationClass) -> Self {
        Self {
            region_id,
            class,
            style: class.style(),
        }
    }
}

/// Annotations plus the final positive counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub annotations: Vec<AnnotationRequest>,
    pub compound_positive: usize,
    pub first_positive: usize,
    pub second_positive: usize,
}

/// Derive annotation requests from the two positive sets.
///
/// The second-channel pass runs first: each id becomes compound-positive if
/// it is also first-positive, second-positive-only otherwise. The first
/// pass then annotates the first-positive ids not yet annotated. Every id
/// must be present in `store`.
pub fn report(
    store: &RegionStore,
    first_positive: &IndexSet,
    second_positive: &IndexSet,
) -> PipelineResult<Report> {
    let mut annotated = IndexSet::new();
    let mut annotations = Vec::with_capacity(first_positive.len() + second_positive.len());
    let mut compound = 0;

    for id in second_positive {
        store.get(id)?;
        let class = if first_positive.contains(id) {
            compound += 1;
            AnnotationClass::CompoundPositive
        } else {
            AnnotationClass::SecondPositiveOnly
        };
        annotations.push(AnnotationRequest::new(id, class));
        annotated.insert(id);
    }

    for id in first_positive {
        store.get(id)?;
        if annotated.insert(id) {
            annotations.push(AnnotationRequest::new(id, AnnotationClass::FirstPositive));
        }
    }

    Ok(Report {
        annotations,
        compound_positive: compound,
        first_positive: first_positive.len(),
        second_positive: second_positive.len(),
    })
}

/// Paint annotations over a contrast-stretched copy of `base`
pub fn render_overlay(
    store: &RegionStore,
    annotations: &[AnnotationRequest],
    base: &Channel,
) -> PipelineResult<RgbImage> {
    let image = base.image();
    let (w, h) = image.dimensions();
    let max = image.pixels().map(|p| p[0]).max().unwrap_or(0).max(1) as u32;
    let mut canvas = RgbImage::from_fn(w, h, |x, y| {
        let v = (image.get_pixel(x, y)[0] as u32 * 255 / max) as u8;
        Rgb([v, v, v])
    });

    for request in annotations {
        let mask = store.get(request.region_id)?.mask();
        let style = request.style;

        // Outline: mask pixels within `width` of the outside
        let pad = style.width;
        let mut padded = GrayImage::new(mask.width() + 2 * pad, mask.height() + 2 * pad);
        imageops::replace(&mut padded, &mask.mask, pad as i64, pad as i64);
        let inner = erode(&padded, Norm::LInf, style.width.min(255) as u8);

        for (x, y) in mask.pixels() {
            if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
                continue;
            }
            let interior =
                inner.get_pixel((x - mask.x) as u32 + pad, (y - mask.y) as u32 + pad)[0] != 0;
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            if !interior {
                *pixel = Rgb(style.stroke);
            } else if let Some(fill) = style.fill {
                *pixel = blend(*pixel, fill);
            }
        }
    }

    Ok(canvas)
}

fn blend(under: Rgb<u8>, over: [u8; 3]) -> Rgb<u8> {
    let mix = |a: u8, b: u8| ((a as u16 + b as u16) / 2) as u8;
    Rgb([
        mix(under[0], over[0]),
        mix(under[1], over[1]),
        mix(under[2], over[2]),
    ])
}

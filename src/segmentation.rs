use std::collections::BTreeMap;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::models::{Channel, Region, RegionId};

/// Label image: 0 is background, every other value one object
pub type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// External nucleus segmentation. Implementations may block; the pipeline
/// runs them on a worker under a timeout.
pub trait Segmenter: Send + Sync {
    /// Detect nuclei in `channel`. Region ids must be unique.
    fn segment(&self, channel: &Channel) -> anyhow::Result<Vec<Region>>;

    /// Human-readable name for this collaborator (used in logs)
    fn name(&self) -> &str;
}

/// Group labelled pixels into regions, ids assigned 0.. in label order.
/// Objects for which `exclude` returns true (given `min_x, min_y, max_x, max_y`)
/// are dropped before ids are assigned.
fn regions_from_labels(
    labels: &LabelImage,
    exclude: impl Fn(u32, u32, u32, u32) -> bool,
) -> Vec<Region> {
    let mut objects: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        if label[0] == 0 {
            continue; // Skip background
        }
        objects.entry(label[0]).or_default().push((x, y));
    }

    objects
        .into_values()
        .filter(|pixels| {
            let min_x = pixels.iter().map(|p| p.0).min().unwrap_or(0);
            let min_y = pixels.iter().map(|p| p.1).min().unwrap_or(0);
            let max_x = pixels.iter().map(|p| p.0).max().unwrap_or(0);
            let max_y = pixels.iter().map(|p| p.1).max().unwrap_or(0);
            !exclude(min_x, min_y, max_x, max_y)
        })
        .enumerate()
        .map(|(i, pixels)| Region::from_pixels(RegionId(i as u32), &pixels))
        .collect()
}

/// Reads nuclei from a pre-computed label image, e.g. the label output of
/// a StarDist run
pub struct LabelImageSegmenter {
    labels: LabelImage,
}

impl LabelImageSegmenter {
    pub fn new(labels: LabelImage) -> Self {
        Self { labels }
    }

    /// Accepts 8-bit, 16-bit or 32-bit float label images
    pub fn from_image(img: &DynamicImage) -> Self {
        let labels = match img {
            DynamicImage::ImageLuma8(gray) => {
                LabelImage::from_fn(gray.width(), gray.height(), |x, y| {
                    Luma([gray.get_pixel(x, y)[0] as u32])
                })
            }
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                let gray = img.to_luma32f();
                LabelImage::from_fn(gray.width(), gray.height(), |x, y| {
                    Luma([gray.get_pixel(x, y)[0].max(0.0).round() as u32])
                })
            }
            other => {
                let gray = other.to_luma16();
                LabelImage::from_fn(gray.width(), gray.height(), |x, y| {
                    Luma([gray.get_pixel(x, y)[0] as u32])
                })
            }
        };
        Self::new(labels)
    }
}

impl Segmenter for LabelImageSegmenter {
    fn segment(&self, channel: &Channel) -> anyhow::Result<Vec<Region>> {
        if self.labels.dimensions() != channel.dimensions() {
            anyhow::bail!(
                "label image is {:?} but channel {} is {:?}",
                self.labels.dimensions(),
                channel.name(),
                channel.dimensions()
            );
        }
        Ok(regions_from_labels(&self.labels, |_, _, _, _| false))
    }

    fn name(&self) -> &str {
        "Label Image"
    }
}

/// Intensity threshold plus connected components, a stand-in when no
/// neural segmentation output is available
pub struct ThresholdSegmenter {
    /// Raw intensity level; Otsu's level on the rescaled channel when `None`
    pub level: Option<u16>,
    /// Drop objects within this many pixels of the image border
    pub exclude_boundary: u32,
}

impl Default for ThresholdSegmenter {
    fn default() -> Self {
        Self {
            level: None,
            exclude_boundary: 2,
        }
    }
}

impl ThresholdSegmenter {
    fn binarize(&self, channel: &Channel) -> GrayImage {
        let image = channel.image();
        let (w, h) = image.dimensions();

        let (source, level) = match self.level {
            Some(level) => (
                GrayImage::from_fn(w, h, |x, y| {
                    Luma([if image.get_pixel(x, y)[0] > level { 255 } else { 0 }])
                }),
                0u8,
            ),
            None => {
                let max = image.pixels().map(|p| p[0]).max().unwrap_or(0).max(1) as u32;
                let scaled = GrayImage::from_fn(w, h, |x, y| {
                    Luma([(image.get_pixel(x, y)[0] as u32 * 255 / max) as u8])
                });
                let level = otsu_level(&scaled);
                (scaled, level)
            }
        };

        GrayImage::from_fn(w, h, |x, y| {
            if source.get_pixel(x, y)[0] > level {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}

impl Segmenter for ThresholdSegmenter {
    fn segment(&self, channel: &Channel) -> anyhow::Result<Vec<Region>> {
        let binary = self.binarize(channel);
        let labels = connected_components(&binary, Connectivity::Eight, Luma([0]));
        let (w, h) = channel.dimensions();
        let margin = self.exclude_boundary;

        Ok(regions_from_labels(&labels, |min_x, min_y, max_x, max_y| {
            margin > 0
                && (min_x < margin
                    || min_y < margin
                    || max_x + margin >= w
                    || max_y + margin >= h)
        }))
    }

    fn name(&self) -> &str {
        "Threshold"
    }
}

use std::fmt;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, GrayImage, ImageBuffer, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// 16-bit single channel intensity image
pub type ChannelImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Stable region identifier, assigned once at detection time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u32);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binary mask placed in image coordinates.
/// `(x, y)` is the image position of the mask's top-left pixel and may be
/// negative for bands that grow past the image edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMask {
    pub x: i64,
    pub y: i64,
    pub mask: GrayImage,
}

impl PixelMask {
    pub fn new(x: i64, y: i64, mask: GrayImage) -> Self {
        Self { x, y, mask }
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.pixels().all(|p| p[0] == 0)
    }

    /// Number of covered pixels
    pub fn pixel_count(&self) -> u64 {
        self.mask.pixels().filter(|p| p[0] != 0).count() as u64
    }

    /// Covered pixels in image coordinates, row-major
    pub fn pixels(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.mask
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] != 0)
            .map(move |(px, py, _)| (self.x + px as i64, self.y + py as i64))
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        let (lx, ly) = (x - self.x, y - self.y);
        if lx < 0 || ly < 0 || lx >= self.width() as i64 || ly >= self.height() as i64 {
            return false;
        }
        self.mask.get_pixel(lx as u32, ly as u32)[0] != 0
    }
}

/// A nucleus boundary produced by segmentation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    id: RegionId,
    mask: PixelMask,
}

impl Region {
    pub fn new(id: RegionId, mask: PixelMask) -> Self {
        Self { id, mask }
    }

    /// Build a region from a list of covered image pixels
    pub fn from_pixels(id: RegionId, pixels: &[(u32, u32)]) -> Self {
        let Some(&(first_x, first_y)) = pixels.first() else {
            return Self::new(id, PixelMask::new(0, 0, GrayImage::new(0, 0)));
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first_x, first_y, first_x, first_y);
        for &(x, y) in pixels {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let mut mask = GrayImage::new(max_x - min_x + 1, max_y - min_y + 1);
        for &(x, y) in pixels {
            mask.put_pixel(x - min_x, y - min_y, Luma([255]));
        }
        Self::new(id, PixelMask::new(min_x as i64, min_y as i64, mask))
    }

    /// Rasterise a closed polygon (the boundary form StarDist reports).
    /// A repeated closing vertex is accepted.
    pub fn from_polygon(id: RegionId, vertices: &[(i32, i32)]) -> PipelineResult<Self> {
        let mut points: Vec<Point<i32>> = vertices.iter().map(|&(x, y)| Point::new(x, y)).collect();
        points.dedup();
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return Err(PipelineError::DegenerateRegion(id));
        }

        let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
        let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
        let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);

        let local: Vec<Point<i32>> = points
            .iter()
            .map(|p| Point::new(p.x - min_x, p.y - min_y))
            .collect();
        let mut mask = GrayImage::new((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32);
        draw_polygon_mut(&mut mask, &local, Luma([255]));

        Ok(Self::new(id, PixelMask::new(min_x as i64, min_y as i64, mask)))
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn mask(&self) -> &PixelMask {
        &self.mask
    }

    pub fn area(&self) -> u64 {
        self.mask.pixel_count()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Centroid of covered pixels, `None` for an empty region
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let (mut sx, mut sy, mut n) = (0.0, 0.0, 0u64);
        for (x, y) in self.mask.pixels() {
            sx += x as f64;
            sy += y as f64;
            n += 1;
        }
        (n > 0).then(|| (sx / n as f64, sy / n as f64))
    }
}

/// Annulus around a region. Addressed only through its parent's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    parent: RegionId,
    thickness: u8,
    mask: PixelMask,
}

impl Band {
    pub(crate) fn new(parent: RegionId, thickness: u8, mask: PixelMask) -> Self {
        Self {
            parent,
            thickness,
            mask,
        }
    }

    pub fn parent(&self) -> RegionId {
        self.parent
    }

    pub fn thickness(&self) -> u8 {
        self.thickness
    }

    pub fn mask(&self) -> &PixelMask {
        &self.mask
    }
}

/// Named read-only intensity image. Cloning shares the pixel buffer.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    image: Arc<ChannelImage>,
}

impl Channel {
    pub fn new(name: impl Into<String>, image: ChannelImage) -> Self {
        Self {
            name: name.into(),
            image: Arc::new(image),
        }
    }

    /// Single channel from a decoded image. 8-bit and 16-bit grayscale keep
    /// their raw values, anything else is converted to 16-bit luma.
    pub fn from_dynamic(name: impl Into<String>, img: &DynamicImage) -> Self {
        let image = match img {
            DynamicImage::ImageLuma8(gray) => {
                ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
                    Luma([gray.get_pixel(x, y)[0] as u16])
                })
            }
            DynamicImage::ImageLuma16(gray) => gray.clone(),
            other => other.to_luma16(),
        };
        Self::new(name, image)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &ChannelImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Intensity at an image position, `None` outside the frame
    pub fn get(&self, x: i64, y: i64) -> Option<u16> {
        let (w, h) = self.dimensions();
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            return None;
        }
        Some(self.image.get_pixel(x as u32, y as u32)[0])
    }
}

/// Split a composite image into its channels, named `C1`, `C2`, ...
/// Raw 8-bit and 16-bit values are kept without rescaling.
pub fn split_channels(img: &DynamicImage) -> Vec<Channel> {
    let (w, h) = img.dimensions();
    let planes: Vec<ChannelImage> = match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => {
            return vec![Channel::from_dynamic("C1", img)];
        }
        DynamicImage::ImageRgb8(rgb) => (0..3)
            .map(|c| ImageBuffer::from_fn(w, h, |x, y| Luma([rgb.get_pixel(x, y)[c] as u16])))
            .collect(),
        DynamicImage::ImageRgba8(rgba) => (0..3)
            .map(|c| ImageBuffer::from_fn(w, h, |x, y| Luma([rgba.get_pixel(x, y)[c] as u16])))
            .collect(),
        DynamicImage::ImageRgba16(rgba) => (0..3)
            .map(|c| ImageBuffer::from_fn(w, h, |x, y| Luma([rgba.get_pixel(x, y)[c]])))
            .collect(),
        other => {
            let rgb = other.to_rgb16();
            (0..3)
                .map(|c| ImageBuffer::from_fn(w, h, |x, y| Luma([rgb.get_pixel(x, y)[c]])))
                .collect()
        }
    };

    planes
        .into_iter()
        .enumerate()
        .map(|(i, plane)| Channel::new(format!("C{}", i + 1), plane))
        .collect()
}

/// The three channels one run reads
#[derive(Debug, Clone)]
pub struct ChannelSet {
    /// Nucleus marker, handed to the segmentation collaborator
    pub nuclei: Channel,
    /// Measured over the nucleus interior
    pub first: Channel,
    /// Measured over the peri-nuclear band
    pub second: Channel,
}

impl ChannelSet {
    /// Every channel must have the nucleus channel's dimensions
    pub fn check_frame(&self) -> PipelineResult<()> {
        let expected = self.nuclei.dimensions();
        for channel in [&self.first, &self.second] {
            if channel.dimensions() != expected {
                return Err(PipelineError::FrameMismatch {
                    channel: channel.name().to_string(),
                    expected,
                    actual: channel.dimensions(),
                });
            }
        }
        Ok(())
    }
}

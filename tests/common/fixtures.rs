#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use image::Luma;
use nucleiband::{Channel, ChannelImage, ChannelSet, Region, RegionId, Segmenter};

/// Pixels of an axis-aligned `w`x`h` rectangle at `(x0, y0)`
pub fn rect_pixels(x0: u32, y0: u32, w: u32, h: u32) -> Vec<(u32, u32)> {
    (y0..y0 + h)
        .flat_map(|y| (x0..x0 + w).map(move |x| (x, y)))
        .collect()
}

pub fn rect_region(id: u32, x0: u32, y0: u32, w: u32, h: u32) -> Region {
    Region::from_pixels(RegionId(id), &rect_pixels(x0, y0, w, h))
}

pub fn uniform_channel(name: &str, width: u32, height: u32, value: u16) -> Channel {
    Channel::new(name, ChannelImage::from_pixel(width, height, Luma([value])))
}

pub fn channel_from_fn(
    name: &str,
    width: u32,
    height: u32,
    f: impl Fn(u32, u32) -> u16,
) -> Channel {
    Channel::new(name, ChannelImage::from_fn(width, height, |x, y| Luma([f(x, y)])))
}

pub fn channel_set(nuclei: Channel, first: Channel, second: Channel) -> ChannelSet {
    ChannelSet {
        nuclei,
        first,
        second,
    }
}

/// Returns a fixed list of regions
pub struct FixedSegmenter {
    pub regions: Vec<Region>,
    pub called: AtomicBool,
}

impl FixedSegmenter {
    pub fn new(regions: Vec<Region>) -> Arc<Self> {
        Arc::new(Self {
            regions,
            called: AtomicBool::new(false),
        })
    }

    pub fn was_called(&self) -> bool {
        self.called.load(Ordering::SeqCst)
    }
}

impl Segmenter for FixedSegmenter {
    fn segment(&self, _channel: &Channel) -> anyhow::Result<Vec<Region>> {
        self.called.store(true, Ordering::SeqCst);
        Ok(self.regions.clone())
    }

    fn name(&self) -> &str {
        "Fixed"
    }
}

/// Blocks longer than any test timeout
pub struct SlowSegmenter {
    pub delay: Duration,
}

impl Segmenter for SlowSegmenter {
    fn segment(&self, _channel: &Channel) -> anyhow::Result<Vec<Region>> {
        std::thread::sleep(self.delay);
        Ok(vec![])
    }

    fn name(&self) -> &str {
        "Slow"
    }
}

/// Always unreachable
pub struct FailingSegmenter;

impl Segmenter for FailingSegmenter {
    fn segment(&self, _channel: &Channel) -> anyhow::Result<Vec<Region>> {
        anyhow::bail!("model server unreachable")
    }

    fn name(&self) -> &str {
        "Failing"
    }
}

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Band, Channel, Region};

/// Statistic read out over a footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    /// Pixel count; the channel only confirms the coordinate frame
    Area,
    /// Arithmetic mean intensity, `NaN` over an empty footprint
    Mean,
}

/// Area a statistic is computed over
#[derive(Debug, Clone, Copy)]
pub enum Footprint<'a> {
    Region(&'a Region),
    Band(&'a Band),
}

impl<'a> From<&'a Region> for Footprint<'a> {
    fn from(region: &'a Region) -> Self {
        Footprint::Region(region)
    }
}

impl<'a> From<&'a Band> for Footprint<'a> {
    fn from(band: &'a Band) -> Self {
        Footprint::Band(band)
    }
}

/// Compute `statistic` of `channel` over `footprint`.
///
/// Region pixels must all lie inside the channel, otherwise the frames
/// disagree and `OutOfBounds` is returned. Band pixels past the image edge
/// are clipped, since a band legitimately grows beyond a nucleus touching
/// the border.
pub fn measure<'a>(
    footprint: impl Into<Footprint<'a>>,
    channel: &Channel,
    statistic: Statistic,
) -> PipelineResult<f64> {
    let (width, height) = channel.dimensions();
    let (mask, clip) = match footprint.into() {
        Footprint::Region(region) => (region.mask(), false),
        Footprint::Band(band) => (band.mask(), true),
    };

    let mut sum = 0u64;
    let mut count = 0u64;
    for (x, y) in mask.pixels() {
        match channel.get(x, y) {
            Some(value) => {
                sum += value as u64;
                count += 1;
            }
            None if clip => {}
            None => {
                return Err(PipelineError::OutOfBounds {
                    x,
                    y,
                    width,
                    height,
                });
            }
        }
    }

    Ok(match statistic {
        Statistic::Area => count as f64,
        Statistic::Mean if count == 0 => f64::NAN,
        Statistic::Mean => sum as f64 / count as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelImage, PixelMask, RegionId};
    use image::{GrayImage, Luma};

    fn gradient_channel() -> Channel {
        Channel::new("ramp", ChannelImage::from_fn(4, 4, |x, _| Luma([x as u16 * 100])))
    }

    #[test]
    fn test_mean_is_exact() {
        let region = Region::from_pixels(RegionId(1), &[(0, 0), (1, 0), (3, 2)]);
        let mean = measure(&region, &gradient_channel(), Statistic::Mean).unwrap();
        assert_eq!(mean, 400.0 / 3.0);
        assert_eq!(measure(&region, &gradient_channel(), Statistic::Area).unwrap(), 3.0);
    }

    #[test]
    fn test_region_outside_frame_is_out_of_bounds() {
        let region = Region::from_pixels(RegionId(1), &[(3, 3), (4, 3)]);
        let err = measure(&region, &gradient_channel(), Statistic::Area).unwrap_err();
        assert!(matches!(err, PipelineError::OutOfBounds { x: 4, y: 3, .. }));
    }

    #[test]
    fn test_band_is_clipped_to_frame() {
        let band = Band::new(
            RegionId(1),
            1,
            PixelMask::new(-1, 0, GrayImage::from_pixel(3, 1, Luma([255]))),
        );
        let channel = gradient_channel();
        assert_eq!(measure(&band, &channel, Statistic::Area).unwrap(), 2.0);
        assert_eq!(measure(&band, &channel, Statistic::Mean).unwrap(), 50.0);
    }

    #[test]
    fn test_mean_of_empty_band_is_nan() {
        let band = Band::new(RegionId(1), 0, PixelMask::new(0, 0, GrayImage::new(2, 2)));
        assert!(measure(&band, &gradient_channel(), Statistic::Mean).unwrap().is_nan());
    }
}

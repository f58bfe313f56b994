use image::{GrayImage, Luma, imageops};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Band, PixelMask, Region};

/// Build the band of pixels within `thickness` (Euclidean) outside `region`.
///
/// The band follows the nucleus contour rather than a fixed-radius disk and
/// never includes the region's own interior. `thickness == 0` gives an empty
/// band.
pub fn make_band(region: &Region, thickness: u8) -> PipelineResult<Band> {
    if region.is_empty() {
        return Err(PipelineError::DegenerateRegion(region.id()));
    }

    let src = region.mask();
    if thickness == 0 {
        let empty = GrayImage::new(src.width(), src.height());
        return Ok(Band::new(region.id(), 0, PixelMask::new(src.x, src.y, empty)));
    }

    let pad = thickness as u32;
    let mut padded = GrayImage::new(src.width() + 2 * pad, src.height() + 2 * pad);
    imageops::replace(&mut padded, &src.mask, pad as i64, pad as i64);

    let mut band = dilate(&padded, Norm::L2, thickness);
    for (x, y, p) in padded.enumerate_pixels() {
        if p[0] != 0 {
            band.put_pixel(x, y, Luma([0]));
        }
    }

    Ok(Band::new(
        region.id(),
        thickness,
        PixelMask::new(src.x - pad as i64, src.y - pad as i64, band),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionId;

    fn square(id: u32, x0: u32, y0: u32, side: u32) -> Region {
        let pixels: Vec<(u32, u32)> = (y0..y0 + side)
            .flat_map(|y| (x0..x0 + side).map(move |x| (x, y)))
            .collect();
        Region::from_pixels(RegionId(id), &pixels)
    }

    #[test]
    fn test_band_excludes_interior() {
        let region = square(1, 10, 10, 5);
        let band = make_band(&region, 2).unwrap();
        assert_eq!(band.parent(), RegionId(1));
        for (x, y) in region.mask().pixels() {
            assert!(!band.mask().contains(x, y));
        }
        assert!(band.mask().contains(8, 12));
        assert!(band.mask().contains(16, 12));
        assert!(!band.mask().contains(7, 12));
    }

    #[test]
    fn test_band_width_is_euclidean() {
        let band = make_band(&square(1, 10, 10, 5), 3).unwrap();
        // Diagonal corner at distance sqrt(8) is inside, sqrt(18) is not.
        assert!(band.mask().contains(8, 8));
        assert!(!band.mask().contains(7, 7));
    }

    #[test]
    fn test_band_is_deterministic() {
        let region = Region::from_pixels(RegionId(3), &[(4, 4), (5, 4), (5, 5), (6, 6)]);
        assert_eq!(make_band(&region, 4).unwrap(), make_band(&region, 4).unwrap());
    }

    #[test]
    fn test_zero_thickness_is_empty() {
        let band = make_band(&square(1, 0, 0, 3), 0).unwrap();
        assert!(band.mask().is_empty());
    }

    #[test]
    fn test_empty_region_is_degenerate() {
        let region = Region::from_pixels(RegionId(9), &[]);
        assert!(matches!(
            make_band(&region, 2),
            Err(PipelineError::DegenerateRegion(RegionId(9)))
        ));
    }
}

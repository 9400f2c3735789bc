//! Resampling toward the reference frame the cascade thresholds were tuned on.

use image::imageops::{self, FilterType};
use image::GrayImage;
use log::debug;

use crate::error::FaceFindError;
use crate::integral::PixelBuffer;

/// The frame the reference detector scans at.
pub const REFERENCE_FRAME: (u32, u32) = (320, 240);

/// Factor by which the image is divided before scanning.
///
/// The axis is chosen by comparing how far each dimension is from the
/// frame, not by which one needs more shrinking; results must match the
/// reference detector, so this stays as is.
///
/// Images smaller than the frame get a ratio below 1 and are enlarged.
/// Extreme aspect ratios grow a lot: a 10×5000 strip is scanned at
/// 320×160000. Use [`scaled_size`] to check the scan size up front, or turn
/// pre-scaling off with `FaceFinder::resample(false)`.
pub fn prescale_ratio(width: u32, height: u32, frame: (u32, u32)) -> f64 {
    let diff_width = f64::from(frame.0) - f64::from(width);
    let diff_height = f64::from(frame.1) - f64::from(height);
    if diff_width > diff_height {
        f64::from(width) / f64::from(frame.0)
    } else {
        f64::from(height) / f64::from(frame.1)
    }
}

/// Size of the buffer after dividing by `ratio`, at least 1×1.
pub fn scaled_size(width: u32, height: u32, ratio: f64) -> (u32, u32) {
    let scale = |v: u32| ((f64::from(v) / ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Resample `buffer` by `ratio`, or `None` when the size would not change.
pub(crate) fn resample(
    buffer: &PixelBuffer<'_>,
    ratio: f64,
) -> Result<Option<GrayImage>, FaceFindError> {
    let (width, height) = scaled_size(buffer.width(), buffer.height(), ratio);
    if (width, height) == (buffer.width(), buffer.height()) {
        return Ok(None);
    }
    if ratio < 1.0 {
        debug!(
            "prescale enlarges {}x{} to {width}x{height}",
            buffer.width(),
            buffer.height()
        );
    }
    let source = GrayImage::from_raw(buffer.width(), buffer.height(), buffer.data().to_vec()).ok_or(
        FaceFindError::BufferSizeMismatch {
            expected: buffer.width() as usize * buffer.height() as usize,
            actual: buffer.data().len(),
        },
    )?;
    Ok(Some(imageops::resize(&source, width, height, FilterType::Triangle)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_sized_image_is_unchanged() {
        assert_eq!(prescale_ratio(320, 240, REFERENCE_FRAME), 1.0);
    }

    #[test]
    fn large_landscape_uses_height() {
        // diff_width = -320, diff_height = -240: width is not the larger diff.
        assert_eq!(prescale_ratio(640, 480, REFERENCE_FRAME), 2.0);
        assert_eq!(scaled_size(640, 480, 2.0), (320, 240));
    }

    #[test]
    fn axis_choice_follows_frame_distance() {
        // 1000x300: diff_width = -680, diff_height = -60, so height wins
        // even though width needs far more shrinking.
        let ratio = prescale_ratio(1000, 300, REFERENCE_FRAME);
        assert_eq!(ratio, 1.25);
        assert_eq!(scaled_size(1000, 300, ratio), (800, 240));
    }

    #[test]
    fn small_images_are_enlarged() {
        // 100x200: diff_width = 220 > diff_height = 40.
        let ratio = prescale_ratio(100, 200, REFERENCE_FRAME);
        assert_eq!(ratio, 100.0 / 320.0);
        assert_eq!(scaled_size(100, 200, ratio), (320, 640));
    }

    #[test]
    fn resample_skips_identity() {
        let data = vec![5u8; 32 * 24];
        let buffer = PixelBuffer::new(&data, 32, 24).unwrap();
        assert!(resample(&buffer, 1.0).unwrap().is_none());
    }

    #[test]
    fn resample_keeps_flat_images_flat() {
        let data = vec![200u8; 64 * 48];
        let buffer = PixelBuffer::new(&data, 64, 48).unwrap();
        let resized = resample(&buffer, 2.0).unwrap().unwrap();
        assert_eq!(resized.dimensions(), (32, 24));
        assert!(resized.as_raw().iter().all(|v| *v == 200));
    }

    #[test]
    fn narrow_strips_grow_along_the_long_axis() {
        // 10x5000: diff_width = 310 > diff_height = -4760.
        let ratio = prescale_ratio(10, 5000, REFERENCE_FRAME);
        assert_eq!(ratio, 10.0 / 320.0);
        assert_eq!(scaled_size(10, 5000, ratio), (320, 160_000));
    }
}

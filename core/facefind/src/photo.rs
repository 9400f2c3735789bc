use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageEncoder, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::error::FaceFindError;
use crate::face_detector::{FaceDetector, FaceRegion};
use crate::integral::PixelBuffer;

/// Outline color used by [`FacePhoto::overlay`] when none is given.
pub const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// A decoded photo plus its grayscale rendition, ready for detection,
/// cropping and overlay drawing.
///
/// Detection results are returned, never stored: crop and overlay take the
/// region explicitly.
#[derive(Debug, Clone)]
pub struct FacePhoto {
    image: DynamicImage,
    gray: GrayImage,
}

impl FacePhoto {
    /// Decode JPEG, PNG or WebP bytes.
    pub fn new(input: &[u8]) -> Result<Self, FaceFindError> {
        Self::from_image(decode_image(input)?)
    }

    /// Wrap an already decoded image.
    pub fn from_image(image: DynamicImage) -> Result<Self, FaceFindError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FaceFindError::ZeroDimensions);
        }
        let gray = to_gray(&image);
        Ok(Self { image, gray })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The grayscale samples the detectors see.
    pub fn gray(&self) -> Result<PixelBuffer<'_>, FaceFindError> {
        PixelBuffer::new(self.gray.as_raw(), self.gray.width(), self.gray.height())
    }

    /// Run `detector` on the grayscale rendition.
    pub fn find_face(
        &self,
        detector: &dyn FaceDetector,
    ) -> Result<Option<FaceRegion>, FaceFindError> {
        detector.find_face(&self.gray()?)
    }

    /// Cut the square `region` out of the photo, clamped to the image bounds.
    pub fn crop(&self, region: &FaceRegion) -> Result<RgbImage, FaceFindError> {
        let (x, y, side) = region.pixel_bounds();
        if x >= self.width() || y >= self.height() {
            return Err(FaceFindError::ZeroDimensions);
        }
        let width = side.min(self.width() - x);
        let height = side.min(self.height() - y);
        if width == 0 || height == 0 {
            return Err(FaceFindError::ZeroDimensions);
        }
        Ok(self.image.crop_imm(x, y, width, height).to_rgb8())
    }

    /// [`Self::crop`] encoded as JPEG.
    pub fn crop_jpeg(&self, region: &FaceRegion, quality: u8) -> Result<Vec<u8>, FaceFindError> {
        encode_jpeg(&self.crop(region)?, quality)
    }

    /// A copy of the photo with a one-pixel outline drawn around `region`.
    ///
    /// The outline covers columns `x..=x + w` and rows `y..=y + w`; parts
    /// outside the image are clipped.
    pub fn overlay(&self, region: &FaceRegion, color: Rgb<u8>) -> RgbImage {
        let mut canvas = self.image.to_rgb8();
        let (x, y, side) = region.pixel_bounds();
        let rect = Rect::at(x as i32, y as i32).of_size(side + 1, side + 1);
        draw_hollow_rect_mut(&mut canvas, rect, color);
        canvas
    }

    /// [`Self::overlay`] in [`OVERLAY_COLOR`], encoded as JPEG.
    pub fn overlay_jpeg(&self, region: &FaceRegion, quality: u8) -> Result<Vec<u8>, FaceFindError> {
        encode_jpeg(&self.overlay(region, OVERLAY_COLOR), quality)
    }
}

/// Decode input bytes into a `DynamicImage`.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, FaceFindError> {
    image::load_from_memory(input).map_err(|e| FaceFindError::DecodeError(e.to_string()))
}

/// Grayscale with the reference weights `0.2989 R + 0.587 G + 0.114 B`,
/// truncated. Alpha is ignored.
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (src, dst) in rgb.pixels().zip(gray.pixels_mut()) {
        let [r, g, b] = src.0;
        let luma = 0.2989 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
        dst.0[0] = luma as u8;
    }
    gray
}

/// Encode an RGB image as JPEG at `quality` (1–100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, FaceFindError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| FaceFindError::EncodeError(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_rgb(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ]);
        }
        img
    }

    fn photo(width: u32, height: u32) -> FacePhoto {
        FacePhoto::from_image(DynamicImage::ImageRgb8(make_test_rgb(width, height))).unwrap()
    }

    #[test]
    fn gray_uses_reference_weights() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([255, 255, 255]));
        let gray = to_gray(&DynamicImage::ImageRgb8(img));
        // 76.2195, 149.685 and 254.9745, truncated.
        assert_eq!(gray.as_raw().as_slice(), &[76u8, 149, 254]);
    }

    #[test]
    fn crop_is_square_inside_bounds() {
        let photo = photo(120, 90);
        let region = FaceRegion {
            x: 10.0,
            y: 20.0,
            w: 40.0,
        };
        let face = photo.crop(&region).unwrap();
        let expected = *make_test_rgb(120, 90).get_pixel(10, 20);
        assert_eq!(face.dimensions(), (40, 40));
        assert_eq!(*face.get_pixel(0, 0), expected);
    }

    #[test]
    fn crop_is_clamped_at_the_edges() {
        let photo = photo(50, 40);
        let region = FaceRegion {
            x: 30.0,
            y: 25.0,
            w: 30.0,
        };
        assert_eq!(photo.crop(&region).unwrap().dimensions(), (20, 15));
    }

    #[test]
    fn crop_outside_the_image_fails() {
        let photo = photo(50, 40);
        let region = FaceRegion {
            x: 60.0,
            y: 0.0,
            w: 10.0,
        };
        assert!(matches!(photo.crop(&region), Err(FaceFindError::ZeroDimensions)));
    }

    #[test]
    fn overlay_draws_outline_only() {
        let photo = FacePhoto::from_image(DynamicImage::ImageRgb8(RgbImage::new(30, 30))).unwrap();
        let region = FaceRegion {
            x: 5.0,
            y: 5.0,
            w: 10.0,
        };
        let canvas = photo.overlay(&region, OVERLAY_COLOR);
        assert_eq!(canvas.get_pixel(5, 5), &OVERLAY_COLOR);
        assert_eq!(canvas.get_pixel(15, 15), &OVERLAY_COLOR);
        assert_eq!(canvas.get_pixel(15, 10), &OVERLAY_COLOR);
        assert_eq!(canvas.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(16, 16), &Rgb([0, 0, 0]));
    }

    #[test]
    fn jpeg_output_has_magic_bytes() {
        let photo = photo(64, 48);
        let region = FaceRegion {
            x: 0.0,
            y: 0.0,
            w: 32.0,
        };
        for data in [
            photo.crop_jpeg(&region, 80).unwrap(),
            photo.overlay_jpeg(&region, 80).unwrap(),
        ] {
            assert_eq!(data[0], 0xFF);
            assert_eq!(data[1], 0xD8);
        }
    }

    #[test]
    fn invalid_input_returns_error() {
        assert!(matches!(
            FacePhoto::new(b"not an image"),
            Err(FaceFindError::DecodeError(_))
        ));
    }
}

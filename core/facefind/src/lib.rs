//! Single-face detection with a Viola-Jones style cascade.
//!
//! The engine builds summed-area tables of a grayscale buffer, scans square
//! windows from the largest scale down, and returns the first window the
//! pretrained cascade accepts.
//!
//! # Example
//!
//! ```no_run
//! use facefind::{CascadeModel, FaceFinder, FacePhoto};
//!
//! let model = CascadeModel::load(&std::fs::read("detection.json").unwrap()).unwrap();
//! let finder = FaceFinder::new(model);
//!
//! let photo = FacePhoto::new(&std::fs::read("photo.jpg").unwrap()).unwrap();
//! match photo.find_face(&finder).unwrap() {
//!     Some(face) => println!("face at ({}, {}) size {}", face.x, face.y, face.w),
//!     None => println!("no face found"),
//! }
//! ```
#![warn(missing_docs)]

/// Cascade model types and loaders.
pub mod cascade;
mod error;
mod evaluate;
mod face_detector;
mod integral;
mod photo;
/// Pre-scaling toward the reference frame.
pub mod prescale;
/// Window enumeration and the greedy search.
pub mod search;

use std::sync::Arc;
use std::time::Instant;

use log::debug;

pub use cascade::{CascadeModel, FeatureRect, Node, Stage, Tree, WINDOW_SIZE};
/// Error type returned by facefind operations.
pub use error::FaceFindError;
pub use evaluate::{CascadeEvaluator, EvalStats};
pub use face_detector::{FaceDetector, FaceRegion};
pub use integral::{IntegralImage, PixelBuffer};
pub use photo::{encode_jpeg, to_gray, FacePhoto, OVERLAY_COLOR};
pub use prescale::REFERENCE_FRAME;
pub use search::{ScanOptions, SearchOutcome, SlidingWindowSearch, Window};

/// Result of one detection call, with the details behind the region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// The face in the caller's coordinates, or `None` when no window passed.
    pub region: Option<FaceRegion>,
    /// The accepted window in scan (possibly resampled) coordinates.
    pub window: Option<Window>,
    /// Factor mapping scan coordinates back to the caller's coordinates.
    pub ratio: f64,
    /// Dimensions of the buffer that was actually scanned.
    pub scanned_size: (u32, u32),
    /// Number of windows evaluated before the search stopped.
    pub windows_evaluated: usize,
}

/// Builder-style face finder around a shared [`CascadeModel`].
///
/// Defaults reproduce the reference detector: inputs are pre-scaled toward
/// 320×240, scales shrink by 1.2 and positions advance by at least 2 pixels.
/// The model is held behind an `Arc`, so clones are cheap and a finder can
/// be shared between threads.
#[derive(Debug, Clone)]
pub struct FaceFinder {
    model: Arc<CascadeModel>,
    reference_frame: (u32, u32),
    resample: bool,
    scan: ScanOptions,
}

impl FaceFinder {
    /// Create a finder with reference defaults.
    pub fn new(model: impl Into<Arc<CascadeModel>>) -> Self {
        Self {
            model: model.into(),
            reference_frame: REFERENCE_FRAME,
            resample: true,
            scan: ScanOptions::default(),
        }
    }

    /// Load a persisted model (see [`CascadeModel::load`]) and wrap it.
    pub fn from_model_bytes(bytes: &[u8]) -> Result<Self, FaceFindError> {
        Ok(Self::new(CascadeModel::load(bytes)?))
    }

    /// The model in use.
    pub fn model(&self) -> &CascadeModel {
        &self.model
    }

    /// Set the frame inputs are pre-scaled toward (default: 320×240).
    pub fn reference_frame(mut self, width: u32, height: u32) -> Self {
        self.reference_frame = (width, height);
        self
    }

    /// Enable or disable pre-scaling (default: enabled).
    ///
    /// When disabled the buffer is scanned at its own size and regions are
    /// reported unscaled.
    pub fn resample(mut self, enable: bool) -> Self {
        self.resample = enable;
        self
    }

    /// Set the divisor between consecutive scan scales (default: 1.2).
    pub fn scale_factor(mut self, factor: f64) -> Self {
        self.scan.scale_factor = factor;
        self
    }

    /// Set the minimum position stride (default: 2).
    pub fn min_step(mut self, step: u32) -> Self {
        self.scan.min_step = step;
        self
    }

    /// Replace all scan options at once.
    pub fn scan_options(mut self, options: ScanOptions) -> Self {
        self.scan = options;
        self
    }

    /// Locate the first face in `buffer`; `Ok(None)` when there is none.
    pub fn detect(&self, buffer: &PixelBuffer<'_>) -> Result<Option<FaceRegion>, FaceFindError> {
        Ok(self.detect_detailed(buffer)?.region)
    }

    /// Decode image bytes (JPEG, PNG or WebP) and detect on their grayscale.
    pub fn detect_image(&self, input: &[u8]) -> Result<Option<FaceRegion>, FaceFindError> {
        FacePhoto::new(input)?.find_face(self)
    }

    /// Like [`Self::detect`], also reporting the scan details.
    pub fn detect_detailed(&self, buffer: &PixelBuffer<'_>) -> Result<Detection, FaceFindError> {
        self.validate()?;

        let ratio = if self.resample {
            prescale::prescale_ratio(buffer.width(), buffer.height(), self.reference_frame)
        } else {
            1.0
        };
        let resampled = prescale::resample(buffer, ratio)?;
        let integral = match &resampled {
            Some(image) => IntegralImage::new(&PixelBuffer::new(
                image.as_raw(),
                image.width(),
                image.height(),
            )?),
            None => IntegralImage::new(buffer),
        };
        debug!(
            "prescale: {}x{} ratio={ratio:.4} scanned at {}x{}",
            buffer.width(),
            buffer.height(),
            integral.width(),
            integral.height()
        );

        let started = Instant::now();
        let outcome = SlidingWindowSearch::new(&self.model, self.scan)?.run(&integral);
        let region = outcome
            .window
            .map(|window| FaceRegion::from_window(&window).scaled(ratio));

        match &outcome.window {
            Some(window) => debug!(
                "face at ({}, {}) side {} scale {:.4} after {} windows in {:?}",
                window.x,
                window.y,
                window.side,
                window.scale,
                outcome.windows_evaluated,
                started.elapsed()
            ),
            None => debug!(
                "no face after {} windows in {:?}",
                outcome.windows_evaluated,
                started.elapsed()
            ),
        }

        Ok(Detection {
            region,
            window: outcome.window,
            ratio,
            scanned_size: (integral.width(), integral.height()),
            windows_evaluated: outcome.windows_evaluated,
        })
    }

    fn validate(&self) -> Result<(), FaceFindError> {
        self.scan.validate()?;
        let (width, height) = self.reference_frame;
        if self.resample && (width == 0 || height == 0) {
            return Err(FaceFindError::InvalidReferenceFrame { width, height });
        }
        Ok(())
    }
}

impl FaceDetector for FaceFinder {
    fn find_face(&self, buffer: &PixelBuffer<'_>) -> Result<Option<FaceRegion>, FaceFindError> {
        self.detect(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCEPT_ALL: &str = "[[[[[[0.0, 1.0, 1.0, -1, -1], []]]], -1.0]]";

    fn finder() -> FaceFinder {
        FaceFinder::from_model_bytes(ACCEPT_ALL.as_bytes()).unwrap()
    }

    #[test]
    fn builder_defaults_match_reference() {
        let finder = finder();
        assert_eq!(finder.reference_frame, (320, 240));
        assert!(finder.resample);
        assert_eq!(finder.scan, ScanOptions::default());
    }

    #[test]
    fn result_is_mapped_back_by_ratio() {
        let data = vec![50u8; 640 * 480];
        let buffer = PixelBuffer::new(&data, 640, 480).unwrap();
        let detection = finder().detect_detailed(&buffer).unwrap();

        assert_eq!(detection.ratio, 2.0);
        assert_eq!(detection.scanned_size, (320, 240));
        // 240 / 20 = 12 gives side 240, which does not fit; the next scale does.
        let window = detection.window.unwrap();
        assert_eq!((window.x, window.y, window.side), (0, 0, 200));
        assert_eq!(
            detection.region,
            Some(FaceRegion {
                x: 0.0,
                y: 0.0,
                w: 400.0
            })
        );
    }

    #[test]
    fn disabled_resampling_reports_scan_coordinates() {
        let data = vec![50u8; 100 * 80];
        let buffer = PixelBuffer::new(&data, 100, 80).unwrap();
        let detection = finder().resample(false).detect_detailed(&buffer).unwrap();
        assert_eq!(detection.ratio, 1.0);
        assert_eq!(detection.scanned_size, (100, 80));
        assert_eq!(
            detection.region,
            Some(FaceRegion {
                x: 0.0,
                y: 0.0,
                w: 67.0
            })
        );
    }

    #[test]
    fn scale_factor_must_exceed_one() {
        let data = vec![0u8; 40 * 40];
        let buffer = PixelBuffer::new(&data, 40, 40).unwrap();
        for factor in [1.0, 0.5, f64::NAN] {
            assert!(matches!(
                finder().scale_factor(factor).detect(&buffer),
                Err(FaceFindError::InvalidScaleFactor(_))
            ));
        }
    }

    #[test]
    fn empty_reference_frame_is_rejected() {
        let data = vec![0u8; 40 * 40];
        let buffer = PixelBuffer::new(&data, 40, 40).unwrap();
        assert!(matches!(
            finder().reference_frame(0, 240).detect(&buffer),
            Err(FaceFindError::InvalidReferenceFrame { width: 0, height: 240 })
        ));
    }

    #[test]
    fn finder_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FaceFinder>();
    }
}

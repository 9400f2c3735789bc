use serde::{Deserialize, Serialize};

use crate::error::FaceFindError;
use crate::integral::PixelBuffer;
use crate::search::Window;

/// Square face region in the caller's pixel coordinates (width = height = `w`).
///
/// Coordinates are fractional when the image was pre-scaled before the search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Side length.
    pub w: f64,
}

impl FaceRegion {
    /// The region covered by a scan window, in scan coordinates.
    pub fn from_window(window: &Window) -> Self {
        Self {
            x: f64::from(window.x),
            y: f64::from(window.y),
            w: f64::from(window.side),
        }
    }

    /// Multiply every coordinate by `ratio`.
    pub fn scaled(self, ratio: f64) -> Self {
        Self {
            x: self.x * ratio,
            y: self.y * ratio,
            w: self.w * ratio,
        }
    }

    /// Rounded `(x, y, side)` in whole pixels, negatives clamped to zero.
    pub fn pixel_bounds(&self) -> (u32, u32, u32) {
        let px = |v: f64| v.round().max(0.0) as u32;
        (px(self.x), px(self.y), px(self.w))
    }

    /// `{"x":..,"y":..,"w":..}`.
    pub fn to_json(&self) -> Result<String, FaceFindError> {
        serde_json::to_string(self).map_err(|e| FaceFindError::EncodeError(e.to_string()))
    }
}

/// Anything that can locate one face in a grayscale buffer.
///
/// [`crate::FaceFinder`] is the built-in implementation; the trait lets
/// [`crate::FacePhoto`] work with other engines and with test doubles.
pub trait FaceDetector: Send + Sync {
    /// Locate at most one face. `Ok(None)` means no face was found.
    fn find_face(&self, buffer: &PixelBuffer<'_>) -> Result<Option<FaceRegion>, FaceFindError>;
}

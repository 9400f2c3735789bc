//! Greedy big-to-small sliding-window search.
//!
//! Windows are visited from the largest scale down, top-to-bottom then
//! left-to-right within a scale; the first window the cascade accepts is
//! the result.

use log::trace;
use serde::Deserialize;

use crate::cascade::{CascadeModel, WINDOW_SIZE};
use crate::error::FaceFindError;
use crate::evaluate::{CascadeEvaluator, EvalStats};
use crate::integral::IntegralImage;

/// A candidate square: top-left corner, scale, and side `round(20 · scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Left edge in integral-image coordinates.
    pub x: u32,
    /// Top edge in integral-image coordinates.
    pub y: u32,
    /// Feature scale relative to the native window.
    pub scale: f64,
    /// Side length in pixels.
    pub side: u32,
}

impl Window {
    /// The window at `(x, y)` whose side matches `scale`.
    pub fn new(x: u32, y: u32, scale: f64) -> Self {
        Self {
            x,
            y,
            scale,
            side: side_for_scale(scale),
        }
    }
}

/// Side of the window at `scale`: `round(20 · scale)`, 0 for non-finite or
/// negative scales.
pub fn side_for_scale(scale: f64) -> u32 {
    (f64::from(WINDOW_SIZE) * scale).round() as u32
}

/// Scan-space knobs. Defaults reproduce the reference detector.
///
/// Deserializes from camel-case keys (`scaleFactor`, `minStep`) with every
/// field optional, the way host bindings pass options.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanOptions {
    /// Each scale is the previous one divided by this factor.
    pub scale_factor: f64,
    /// Lower bound on the position stride in pixels.
    pub min_step: u32,
}

impl ScanOptions {
    /// Fails with [`FaceFindError::InvalidScaleFactor`] unless the scale
    /// factor is greater than 1.
    pub fn validate(&self) -> Result<(), FaceFindError> {
        // Written so NaN fails too.
        if !(self.scale_factor > 1.0) {
            return Err(FaceFindError::InvalidScaleFactor(self.scale_factor));
        }
        Ok(())
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            scale_factor: 1.2,
            min_step: 2,
        }
    }
}

/// Scales from `min(width, height) / 20` down, while greater than 1.
///
/// Empty unless `scale_factor` is greater than 1.
pub fn scales(width: u32, height: u32, scale_factor: f64) -> impl Iterator<Item = f64> {
    let start = f64::from(width.min(height)) / f64::from(WINDOW_SIZE);
    let update = 1.0 / scale_factor;
    let first = (scale_factor > 1.0).then_some(start);
    std::iter::successors(first, move |scale| Some(scale * update))
        .take_while(|scale| *scale > 1.0)
}

/// Every window of an image of the given size, in scan order.
pub fn windows(width: u32, height: u32, options: ScanOptions) -> impl Iterator<Item = Window> {
    scales(width, height, options.scale_factor).flat_map(move |scale| {
        let side = side_for_scale(scale);
        let step = scale.max(f64::from(options.min_step)).round() as usize;
        // Positions stop one pixel short so scaled rectangles can round outward.
        let end_x = width.saturating_sub(side.saturating_add(1));
        let end_y = height.saturating_sub(side.saturating_add(1));
        trace!("scan level: scale={scale:.4} side={side} step={step} end=({end_x},{end_y})");
        (0..end_y).step_by(step).flat_map(move |y| {
            (0..end_x)
                .step_by(step)
                .map(move |x| Window::new(x, y, scale))
        })
    })
}

/// Outcome of one search over an integral image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    /// The first accepted window, if any.
    pub window: Option<Window>,
    /// Number of windows handed to the evaluator.
    pub windows_evaluated: usize,
    /// Cascade work summed over all evaluated windows.
    pub stats: EvalStats,
}

/// Drives the evaluator over [`windows`] and stops at the first acceptance.
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindowSearch<'m> {
    model: &'m CascadeModel,
    options: ScanOptions,
}

impl<'m> SlidingWindowSearch<'m> {
    /// Search with `model` using the given scan options.
    pub fn new(model: &'m CascadeModel, options: ScanOptions) -> Result<Self, FaceFindError> {
        options.validate()?;
        Ok(Self { model, options })
    }

    /// Find the first window of `integral` the cascade accepts.
    pub fn run(&self, integral: &IntegralImage) -> SearchOutcome {
        let evaluator = CascadeEvaluator::new(self.model, integral);
        let mut stats = EvalStats::default();
        let mut windows_evaluated = 0;

        let window = windows(integral.width(), integral.height(), self.options).find(|window| {
            windows_evaluated += 1;
            evaluator.evaluate_counted(window, &mut stats)
        });

        SearchOutcome {
            window,
            windows_evaluated,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{Node, Stage, Tree};
    use crate::integral::PixelBuffer;

    fn accept_all() -> CascadeModel {
        CascadeModel::from_decoded(vec![Stage {
            trees: vec![Tree {
                nodes: vec![Node {
                    threshold: 0.0,
                    left_value: 1.0,
                    right_value: 1.0,
                    left_child: None,
                    right_child: None,
                    rects: vec![],
                }],
            }],
            threshold: -1.0,
        }])
        .unwrap()
    }

    #[test]
    fn scales_shrink_by_factor_until_one() {
        let levels: Vec<f64> = scales(100, 60, 1.2).collect();
        assert!((levels[0] - 3.0).abs() < 1e-12);
        assert!((levels[1] - 2.5).abs() < 1e-12);
        assert!(levels.iter().all(|s| *s > 1.0));
        let last = *levels.last().unwrap();
        assert!(last / 1.2 <= 1.0);
        assert!(levels.windows(2).all(|pair| pair[1] < pair[0]));
    }

    #[test]
    fn small_images_have_no_scales() {
        assert_eq!(scales(20, 400, 1.2).count(), 0);
        assert_eq!(windows(15, 15, ScanOptions::default()).count(), 0);
    }

    #[test]
    fn windows_follow_scan_order() {
        let all: Vec<Window> = windows(100, 80, ScanOptions::default()).collect();
        // Scale 4 gives side 80, which leaves no room at height 80.
        let first = all[0];
        assert_eq!((first.x, first.y, first.side), (0, 0, 67));
        let step = 3;
        assert_eq!((all[1].x, all[1].y), (step, 0));

        for pair in all.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.scale == b.scale {
                assert!(b.y > a.y || (b.y == a.y && b.x > a.x));
            } else {
                assert!(b.scale < a.scale);
            }
        }
    }

    #[test]
    fn step_has_a_floor() {
        let all: Vec<Window> = windows(40, 40, ScanOptions::default()).collect();
        // Scale 40/20/1.2 ≈ 1.67 rounds to a stride of 2.
        assert!(all.len() > 1);
        assert_eq!(all[0].side, 33);
        assert_eq!(all[1].x, 2);
    }

    #[test]
    fn first_hit_is_largest_top_left_window() {
        let model = accept_all();
        let data = vec![90u8; 100 * 80];
        let ii = IntegralImage::new(&PixelBuffer::new(&data, 100, 80).unwrap());
        let outcome = SlidingWindowSearch::new(&model, ScanOptions::default())
            .unwrap()
            .run(&ii);

        let window = outcome.window.unwrap();
        assert_eq!((window.x, window.y, window.side), (0, 0, 67));
        assert_eq!(outcome.windows_evaluated, 1);
    }

    #[test]
    fn exhaustion_counts_every_window() {
        let model = CascadeModel::from_decoded(vec![Stage {
            trees: vec![Tree {
                nodes: vec![Node {
                    threshold: 0.0,
                    left_value: -1.0,
                    right_value: -1.0,
                    left_child: None,
                    right_child: None,
                    rects: vec![],
                }],
            }],
            threshold: 0.0,
        }])
        .unwrap();
        let data = vec![0u8; 64 * 48];
        let ii = IntegralImage::new(&PixelBuffer::new(&data, 64, 48).unwrap());
        let outcome = SlidingWindowSearch::new(&model, ScanOptions::default())
            .unwrap()
            .run(&ii);

        assert!(outcome.window.is_none());
        assert_eq!(
            outcome.windows_evaluated,
            windows(64, 48, ScanOptions::default()).count()
        );
        assert_eq!(outcome.stats.stages, outcome.windows_evaluated);
    }

    #[test]
    fn scale_factor_must_exceed_one() {
        assert_eq!(scales(100, 100, 1.0).count(), 0);
        assert_eq!(scales(100, 100, f64::NAN).count(), 0);

        let options = ScanOptions {
            scale_factor: 1.0,
            ..ScanOptions::default()
        };
        assert_eq!(windows(100, 100, options).count(), 0);
        assert!(matches!(
            SlidingWindowSearch::new(&accept_all(), options),
            Err(FaceFindError::InvalidScaleFactor(_))
        ));
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let options: ScanOptions = serde_json::from_str(r#"{"minStep": 4}"#).unwrap();
        assert_eq!(options.min_step, 4);
        assert_eq!(options.scale_factor, 1.2);
    }
}

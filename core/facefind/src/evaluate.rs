use crate::cascade::{CascadeModel, Node, Tree};
use crate::integral::IntegralImage;
use crate::search::{side_for_scale, Window};

/// Work done while evaluating windows, for instrumentation and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvalStats {
    /// Stages whose trees were evaluated.
    pub stages: usize,
    /// Trees walked.
    pub trees: usize,
    /// Nodes visited across all trees.
    pub nodes: usize,
}

/// Accepts or rejects single windows against a cascade.
///
/// Borrows the model and the integral tables; evaluation has no side
/// effects beyond the optional [`EvalStats`] counters.
#[derive(Debug, Clone, Copy)]
pub struct CascadeEvaluator<'m, 'i> {
    model: &'m CascadeModel,
    integral: &'i IntegralImage,
}

impl<'m, 'i> CascadeEvaluator<'m, 'i> {
    /// Pair a model with the integral tables of one image.
    pub fn new(model: &'m CascadeModel, integral: &'i IntegralImage) -> Self {
        Self { model, integral }
    }

    /// Run the full cascade on `window`.
    pub fn evaluate(&self, window: &Window) -> bool {
        self.evaluate_counted(window, &mut EvalStats::default())
    }

    /// Like [`Self::evaluate`], adding the work done to `stats`.
    ///
    /// Windows that do not leave one spare pixel column and row inside the
    /// image, or whose `side` is not `round(20 · scale)`, are rejected
    /// without evaluating any stage.
    pub fn evaluate_counted(&self, window: &Window, stats: &mut EvalStats) -> bool {
        if !self.fits(window) {
            return false;
        }
        let (x, y, side) = (window.x as usize, window.y as usize, window.side as usize);
        let inv_area = 1.0 / (side * side) as f64;

        let mean = self.integral.rect_sum(x, y, side, side) as f64 * inv_area;
        let variance =
            self.integral.rect_square_sum(x, y, side, side) as f64 * inv_area - mean * mean;
        // Low-contrast windows keep a floor of 1 so thresholds never collapse.
        let vnorm = if variance > 1.0 { variance.sqrt() } else { 1.0 };

        for stage in self.model.stages() {
            stats.stages += 1;
            let mut stage_sum = 0.0;
            for tree in &stage.trees {
                stats.trees += 1;
                stage_sum += self.tree_vote(tree, window, inv_area, vnorm, stats);
            }
            if stage_sum < stage.threshold {
                return false;
            }
        }
        true
    }

    fn fits(&self, window: &Window) -> bool {
        let reach = u64::from(window.side) + 1;
        window.side > 0
            && window.side == side_for_scale(window.scale)
            && u64::from(window.x) + reach <= u64::from(self.integral.width())
            && u64::from(window.y) + reach <= u64::from(self.integral.height())
    }

    fn tree_vote(
        &self,
        tree: &Tree,
        window: &Window,
        inv_area: f64,
        vnorm: f64,
        stats: &mut EvalStats,
    ) -> f64 {
        let mut node = &tree.nodes[0];
        loop {
            stats.nodes += 1;
            let response = self.feature_response(node, window) * inv_area;
            let (child, vote) = if response >= node.threshold * vnorm {
                (node.right_child, node.right_value)
            } else {
                (node.left_child, node.left_value)
            };
            match child {
                Some(idx) => node = &tree.nodes[idx],
                None => return vote,
            }
        }
    }

    /// Weighted sum of the node's rectangles, scaled and placed on the window.
    fn feature_response(&self, node: &Node, window: &Window) -> f64 {
        let (ox, oy, scale) = (f64::from(window.x), f64::from(window.y), window.scale);
        node.rects
            .iter()
            .map(|r| {
                let rx = (r.x * scale + ox).round() as usize;
                let ry = (r.y * scale + oy).round() as usize;
                let rw = (r.width * scale).round() as usize;
                let rh = (r.height * scale).round() as usize;
                self.integral.rect_sum(rx, ry, rw, rh) as f64 * r.weight
            })
            .sum()
    }
}

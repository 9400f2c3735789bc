//! The pretrained cascade: stages of decision-tree forests over Haar-like
//! rectangle features.
//!
//! A model is validated once on construction and is immutable afterwards,
//! so it can be shared read-only between any number of searches.

mod json;
mod php;

use log::debug;

use crate::error::FaceFindError;

/// Side length of the square window the cascade was trained on, in pixels.
pub const WINDOW_SIZE: u32 = 20;

/// A weighted Haar-like rectangle, relative to the window origin at scale 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRect {
    /// Horizontal offset from the window origin.
    pub x: f64,
    /// Vertical offset from the window origin.
    pub y: f64,
    /// Rectangle width.
    pub width: f64,
    /// Rectangle height.
    pub height: f64,
    /// Multiplier applied to the rectangle's intensity sum.
    pub weight: f64,
}

/// One decision node of a tree.
///
/// A child of `None` means the branch ends here and the tree votes the
/// matching leaf value.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Feature threshold, scaled by the window's normalized variance at evaluation time.
    pub threshold: f64,
    /// Vote when the decision goes left and `left_child` is `None`.
    pub left_value: f64,
    /// Vote when the decision goes right and `right_child` is `None`.
    pub right_value: f64,
    /// Index of the left child within the tree's node array.
    pub left_child: Option<usize>,
    /// Index of the right child within the tree's node array.
    pub right_child: Option<usize>,
    /// Rectangles summed to form the node's feature response.
    pub rects: Vec<FeatureRect>,
}

/// A binary decision tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    /// Nodes addressed by index.
    pub nodes: Vec<Node>,
}

/// A forest of trees and the sum its votes must reach.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Trees evaluated in order.
    pub trees: Vec<Tree>,
    /// Acceptance threshold for the summed tree votes.
    pub threshold: f64,
}

/// A validated, immutable cascade of stages.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeModel {
    stages: Vec<Stage>,
}

impl CascadeModel {
    /// Parse a persisted model.
    ///
    /// Accepts the JSON nested-array layout and the PHP `serialize()` dump
    /// used by existing pretrained `detection.dat` files; the format is
    /// picked from the leading bytes.
    pub fn load(bytes: &[u8]) -> Result<Self, FaceFindError> {
        let stages = if php::looks_serialized(bytes) {
            let value = php::parse(bytes)?;
            json::stages_from_value(value)?
        } else {
            json::stages_from_slice(bytes)?
        };
        Self::from_decoded(stages)
    }

    /// Validate already-structured stages.
    pub fn from_decoded(stages: Vec<Stage>) -> Result<Self, FaceFindError> {
        validate(&stages)?;
        let model = Self { stages };
        debug!(
            "loaded cascade: {} stages, {} trees, {} nodes",
            model.stages.len(),
            model.tree_count(),
            model.node_count()
        );
        Ok(model)
    }

    /// Render the model in the JSON nested-array layout accepted by [`Self::load`].
    pub fn to_json(&self) -> Result<String, FaceFindError> {
        json::stages_to_string(&self.stages)
    }

    /// The stages in evaluation order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Total number of trees across all stages.
    pub fn tree_count(&self) -> usize {
        self.stages.iter().map(|s| s.trees.len()).sum()
    }

    /// Total number of nodes across all trees.
    pub fn node_count(&self) -> usize {
        self.stages
            .iter()
            .flat_map(|s| &s.trees)
            .map(|t| t.nodes.len())
            .sum()
    }
}

/// Checks that evaluation can never index outside a tree, loop, or read
/// outside the integral tables.
///
/// Children must point forward in the node array, which rules out cycles.
/// Rectangles must stay inside the native window; the scan leaves one spare
/// pixel column and row for the rounding of scaled rectangles.
fn validate(stages: &[Stage]) -> Result<(), FaceFindError> {
    if stages.is_empty() {
        return Err(FaceFindError::EmptyModel);
    }
    let window = f64::from(WINDOW_SIZE);

    for (stage_idx, stage) in stages.iter().enumerate() {
        for (tree_idx, tree) in stage.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(FaceFindError::EmptyTree {
                    stage: stage_idx,
                    tree: tree_idx,
                });
            }
            for (node_idx, node) in tree.nodes.iter().enumerate() {
                for child in [node.left_child, node.right_child].into_iter().flatten() {
                    if child >= tree.nodes.len() {
                        return Err(FaceFindError::ChildIndexOutOfBounds {
                            stage: stage_idx,
                            tree: tree_idx,
                            node: node_idx,
                            index: child as i64,
                        });
                    }
                    if child <= node_idx {
                        return Err(FaceFindError::BackwardChild {
                            stage: stage_idx,
                            tree: tree_idx,
                            node: node_idx,
                            index: child,
                        });
                    }
                }
                for (rect_idx, rect) in node.rects.iter().enumerate() {
                    let inside = [rect.x, rect.y, rect.width, rect.height]
                        .iter()
                        .all(|v| v.is_finite() && *v >= 0.0)
                        && rect.weight.is_finite()
                        && rect.x + rect.width <= window
                        && rect.y + rect.height <= window;
                    if !inside {
                        return Err(FaceFindError::RectOutOfWindow {
                            stage: stage_idx,
                            tree: tree_idx,
                            node: node_idx,
                            rect: rect_idx,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceFindError {
    #[error("failed to parse cascade model: {0}")]
    ModelParse(String),

    #[error("cascade model has no stages")]
    EmptyModel,

    #[error("tree {tree} of stage {stage} has no nodes")]
    EmptyTree { stage: usize, tree: usize },

    #[error("node {node} of tree {tree} in stage {stage} references child {index} outside the tree")]
    ChildIndexOutOfBounds {
        stage: usize,
        tree: usize,
        node: usize,
        index: i64,
    },

    #[error("node {node} of tree {tree} in stage {stage} references child {index} that does not follow it")]
    BackwardChild {
        stage: usize,
        tree: usize,
        node: usize,
        index: usize,
    },

    #[error("rectangle {rect} of node {node} (tree {tree}, stage {stage}) lies outside the feature window")]
    RectOutOfWindow {
        stage: usize,
        tree: usize,
        node: usize,
        rect: usize,
    },

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("pixel buffer holds {actual} samples, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("scale factor must be greater than 1.0, got {0}")]
    InvalidScaleFactor(f64),

    #[error("reference frame must be non-empty, got {width}x{height}")]
    InvalidReferenceFrame { width: u32, height: u32 },

    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("failed to encode image: {0}")]
    EncodeError(String),
}

//! The nested-array layout shared by the JSON and PHP model files:
//! `stage = [trees, threshold]`, `tree = [node, ...]`,
//! `node = [[threshold, left, right, left_idx, right_idx], [rect, ...]]`,
//! `rect = [x, y, width, height, weight]`.

use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{FeatureRect, Node, Stage, Tree};
use crate::error::FaceFindError;

/// Child index marking "no child, vote the leaf value".
const LEAF: i64 = -1;

#[derive(Serialize, Deserialize)]
struct WireStage(Vec<Vec<WireNode>>, f64);

#[derive(Serialize, Deserialize)]
struct WireNode(WireSplit, Vec<WireRect>);

/// Child indices are numbers of either kind: `-1.0` and `d:-1;` are as
/// valid as `-1`.
#[derive(Serialize, Deserialize)]
struct WireSplit(f64, f64, f64, Number, Number);

#[derive(Serialize, Deserialize)]
struct WireRect(f64, f64, f64, f64, f64);

pub(super) fn stages_from_slice(bytes: &[u8]) -> Result<Vec<Stage>, FaceFindError> {
    let wire: Vec<WireStage> =
        serde_json::from_slice(bytes).map_err(|e| FaceFindError::ModelParse(e.to_string()))?;
    convert(wire)
}

pub(super) fn stages_from_value(value: serde_json::Value) -> Result<Vec<Stage>, FaceFindError> {
    let wire: Vec<WireStage> =
        serde_json::from_value(value).map_err(|e| FaceFindError::ModelParse(e.to_string()))?;
    convert(wire)
}

pub(super) fn stages_to_string(stages: &[Stage]) -> Result<String, FaceFindError> {
    let wire: Vec<WireStage> = stages
        .iter()
        .map(|stage| {
            let trees = stage
                .trees
                .iter()
                .map(|tree| tree.nodes.iter().map(node_to_wire).collect())
                .collect();
            WireStage(trees, stage.threshold)
        })
        .collect();
    serde_json::to_string(&wire).map_err(|e| FaceFindError::EncodeError(e.to_string()))
}

fn node_to_wire(node: &Node) -> WireNode {
    let index = |child: Option<usize>| Number::from(child.map_or(LEAF, |i| i as i64));
    WireNode(
        WireSplit(
            node.threshold,
            node.left_value,
            node.right_value,
            index(node.left_child),
            index(node.right_child),
        ),
        node.rects
            .iter()
            .map(|r| WireRect(r.x, r.y, r.width, r.height, r.weight))
            .collect(),
    )
}

fn convert(wire: Vec<WireStage>) -> Result<Vec<Stage>, FaceFindError> {
    wire.into_iter()
        .enumerate()
        .map(|(stage_idx, WireStage(trees, threshold))| {
            let trees = trees
                .into_iter()
                .enumerate()
                .map(|(tree_idx, nodes)| {
                    let nodes = nodes
                        .into_iter()
                        .enumerate()
                        .map(|(node_idx, node)| {
                            convert_node(node).map_err(|bad| match bad {
                                BadChild::Negative(index) => {
                                    FaceFindError::ChildIndexOutOfBounds {
                                        stage: stage_idx,
                                        tree: tree_idx,
                                        node: node_idx,
                                        index,
                                    }
                                }
                                BadChild::NotInteger(value) => FaceFindError::ModelParse(format!(
                                    "child index {value} of node {node_idx} (tree {tree_idx}, \
                                     stage {stage_idx}) is not an integer"
                                )),
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Tree { nodes })
                })
                .collect::<Result<Vec<_>, FaceFindError>>()?;
            Ok(Stage { trees, threshold })
        })
        .collect()
}

enum BadChild {
    Negative(i64),
    NotInteger(Number),
}

fn child_index(idx: &Number) -> Result<Option<usize>, BadChild> {
    let whole = match idx.as_i64() {
        Some(i) => i,
        None => match idx.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 2f64.powi(53) => f as i64,
            _ => return Err(BadChild::NotInteger(idx.clone())),
        },
    };
    match whole {
        LEAF => Ok(None),
        i if i >= 0 => Ok(Some(i as usize)),
        i => Err(BadChild::Negative(i)),
    }
}

fn convert_node(WireNode(split, rects): WireNode) -> Result<Node, BadChild> {
    let WireSplit(threshold, left_value, right_value, left_idx, right_idx) = split;
    Ok(Node {
        threshold,
        left_value,
        right_value,
        left_child: child_index(&left_idx)?,
        right_child: child_index(&right_idx)?,
        rects: rects
            .into_iter()
            .map(|WireRect(x, y, width, height, weight)| FeatureRect {
                x,
                y,
                width,
                height,
                weight,
            })
            .collect(),
    })
}

//! Forest diffing between the authority's scene and a peer's scene.
//!
//! The walk is cumulative: every divergence in the whole forest is
//! reported in one pass, and a parent mismatch never suppresses the
//! comparison of its children.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scene::SceneNode;

/// How nodes of one level are paired across the two sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Zip siblings by position in the dump. Matches the emitters'
    /// deterministic ordering; a reordering on one side shows up as
    /// (possibly spurious) node mismatches.
    #[default]
    Positional,
    /// Pair siblings by `uuid`, tolerating reorderings; nodes whose
    /// uuid exists on only one side are reported individually.
    ByUuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MismatchKind {
    /// Paired nodes differ in an attribute or in child count.
    Node,
    /// A level holds a different number of siblings on each side.
    ForestLength,
    /// Authority node whose uuid has no counterpart on the peer side.
    MissingNode,
    /// Peer node whose uuid has no counterpart on the authority side.
    UnexpectedNode,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchKind::Node => write!(f, "node mismatch"),
            MismatchKind::ForestLength => write!(f, "sibling count mismatch"),
            MismatchKind::MissingNode => write!(f, "missing node"),
            MismatchKind::UnexpectedNode => write!(f, "unexpected node"),
        }
    }
}

/// A single point of divergence between the two forests.
///
/// For `Node` mismatches `expected`/`actual` carry both nodes' full
/// attribute dumps; for length mismatches they carry the two counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMismatch {
    pub kind: MismatchKind,
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for SceneMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] at {}:", self.kind, self.path)?;
        writeln!(f, "{}", self.expected)?;
        writeln!(f, "---------- vs ----------")?;
        write!(f, "{}", self.actual)
    }
}

/// Shallow node equality: attributes plus declared child count.
///
/// Deep equality is not implied; child pairs are compared in their own
/// right as the walk continues.
fn nodes_equal(a: &SceneNode, b: &SceneNode) -> bool {
    a.name == b.name
        && a.position == b.position
        && a.rotation == b.rotation
        && a.uuid == b.uuid
        && a.children.len() == b.children.len()
}

fn node_path(level: &str, index: usize) -> String {
    if level.is_empty() {
        format!("object[{index}]")
    } else {
        format!("{level}.child[{index}]")
    }
}

fn level_path(level: &str) -> &str {
    if level.is_empty() { "(root)" } else { level }
}

/// Compare two forests positionally (the default strategy).
pub fn diff_forests(expected: &[SceneNode], actual: &[SceneNode]) -> Vec<SceneMismatch> {
    diff_forests_with(expected, actual, MatchStrategy::Positional)
}

/// Compare two forests, pairing siblings per `strategy`.
///
/// Iterates over an explicit level queue instead of recursing, so the
/// call stack is independent of scene depth.
pub fn diff_forests_with(
    expected: &[SceneNode],
    actual: &[SceneNode],
    strategy: MatchStrategy,
) -> Vec<SceneMismatch> {
    let mut mismatches = Vec::new();
    let mut levels: VecDeque<(&[SceneNode], &[SceneNode], String)> = VecDeque::new();
    levels.push_back((expected, actual, String::new()));

    while let Some((exp, act, level)) = levels.pop_front() {
        match strategy {
            MatchStrategy::Positional => {
                diff_level_positional(exp, act, &level, &mut mismatches, &mut levels);
            }
            MatchStrategy::ByUuid => {
                diff_level_by_uuid(exp, act, &level, &mut mismatches, &mut levels);
            }
        }
    }

    mismatches
}

fn diff_level_positional<'a>(
    exp: &'a [SceneNode],
    act: &'a [SceneNode],
    level: &str,
    mismatches: &mut Vec<SceneMismatch>,
    levels: &mut VecDeque<(&'a [SceneNode], &'a [SceneNode], String)>,
) {
    // A length difference is its own finding, never a silent truncation.
    if exp.len() != act.len() {
        mismatches.push(SceneMismatch {
            kind: MismatchKind::ForestLength,
            path: level_path(level).to_string(),
            expected: format!("{} objects", exp.len()),
            actual: format!("{} objects", act.len()),
        });
    }

    for (index, (e, a)) in exp.iter().zip(act.iter()).enumerate() {
        let path = node_path(level, index);
        if !nodes_equal(e, a) {
            mismatches.push(SceneMismatch {
                kind: MismatchKind::Node,
                path: path.clone(),
                expected: e.to_string(),
                actual: a.to_string(),
            });
        }
        // Children are compared regardless of the parent verdict.
        levels.push_back((&e.children, &a.children, path));
    }
}

fn diff_level_by_uuid<'a>(
    exp: &'a [SceneNode],
    act: &'a [SceneNode],
    level: &str,
    mismatches: &mut Vec<SceneMismatch>,
    levels: &mut VecDeque<(&'a [SceneNode], &'a [SceneNode], String)>,
) {
    let mut used = vec![false; act.len()];

    for (index, e) in exp.iter().enumerate() {
        let path = node_path(level, index);
        let partner = act
            .iter()
            .enumerate()
            .find(|(j, a)| !used[*j] && a.uuid == e.uuid);

        match partner {
            Some((j, a)) => {
                used[j] = true;
                if !nodes_equal(e, a) {
                    mismatches.push(SceneMismatch {
                        kind: MismatchKind::Node,
                        path: path.clone(),
                        expected: e.to_string(),
                        actual: a.to_string(),
                    });
                }
                levels.push_back((&e.children, &a.children, path));
            }
            None => mismatches.push(SceneMismatch {
                kind: MismatchKind::MissingNode,
                path,
                expected: e.to_string(),
                actual: "<absent>".to_string(),
            }),
        }
    }

    for (j, a) in act.iter().enumerate() {
        if !used[j] {
            mismatches.push(SceneMismatch {
                kind: MismatchKind::UnexpectedNode,
                path: node_path(level, j),
                expected: "<absent>".to_string(),
                actual: a.to_string(),
            });
        }
    }
}

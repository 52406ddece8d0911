//! Scene graph snapshots reconstructed from dump text.
//!
//! A dump encodes an ordered forest of objects. Each object is a
//! `--GameObject:` header followed by labeled attribute lines, a
//! `Children: <n>` count, and a child block indented by one 4-space
//! unit per nesting level.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header line that opens one object in a dump.
pub const OBJECT_HEADER: &str = "--GameObject:";
/// Label of the child-count line that closes an object's attributes.
pub const CHILDREN_LABEL: &str = "Children:";
/// Characters of indentation per nesting level.
pub const INDENT_UNIT: usize = 4;

/// One object in a dumped scene forest.
///
/// `position`, `rotation` and `uuid` are kept as the raw formatted
/// strings the process printed; comparison is textual, never numeric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub position: String,
    pub rotation: String,
    pub uuid: String,
    pub children: Vec<SceneNode>,
}

impl fmt::Display for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Position: {}", self.position)?;
        writeln!(f, "Rotation: {}", self.rotation)?;
        writeln!(f, "UUID: {}", self.uuid)?;
        write!(f, "{} {}", CHILDREN_LABEL, self.children.len())
    }
}

/// Structural violation of the dump grammar.
///
/// Fatal for the offending dump: a partially parsed forest would
/// silently desynchronize from its peer counterpart downstream.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("attribute line has no colon: {line:?}")]
    MalformedAttribute { line: String },
    #[error("object {name:?} has no 'Children:' line")]
    MissingChildCount { name: String },
    #[error("object {name:?} has unparseable child count {value:?}")]
    InvalidChildCount { name: String, value: String },
    #[error("object {name:?} declares {declared} children but {found} were found")]
    ChildCountMismatch {
        name: String,
        declared: usize,
        found: usize,
    },
}

/// An object whose attributes are parsed but whose child block is
/// still raw (already de-indented) text.
struct RawObject {
    node: SceneNode,
    declared: usize,
    child_text: String,
}

/// Split one nesting level into per-object chunks.
///
/// Only column-0 headers open a chunk; nested headers are indented and
/// stay inside the current object's child block. Text before the first
/// header (e.g. the tail of the begin-marker line) is ignored.
fn split_objects(text: &str) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    for line in text.lines() {
        if line.starts_with(OBJECT_HEADER) {
            chunks.push(String::new());
        }
        if let Some(chunk) = chunks.last_mut() {
            chunk.push_str(line);
            chunk.push('\n');
        }
    }
    chunks
}

/// Parse one chunk's header, attributes and child count, and strip one
/// indentation unit off the remaining child block.
fn parse_object_head(chunk: &str) -> Result<RawObject, ParseError> {
    let mut node = SceneNode::default();
    let mut declared: Option<usize> = None;

    let mut lines = chunk.lines();
    // First line is the object header itself.
    lines.next();

    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix(CHILDREN_LABEL) {
            let value = rest.trim();
            let count = value
                .parse()
                .map_err(|_| ParseError::InvalidChildCount {
                    name: node.name.clone(),
                    value: value.to_string(),
                })?;
            declared = Some(count);
            break;
        }
        let Some((label, value)) = trimmed.split_once(':') else {
            return Err(ParseError::MalformedAttribute {
                line: line.to_string(),
            });
        };
        match label.trim() {
            "Name" => node.name = value.trim().to_string(),
            "Position" => node.position = value.trim().to_string(),
            "Rotation" => node.rotation = value.trim().to_string(),
            "UUID" => node.uuid = value.trim().to_string(),
            // Emitters interleave component lines (e.g. "NetworkObject:",
            // "PrefabHash: ...") that the checker does not track.
            _ => {}
        }
    }

    let Some(declared) = declared else {
        return Err(ParseError::MissingChildCount { name: node.name });
    };

    let mut child_text = String::new();
    for line in lines {
        child_text.push_str(line.get(INDENT_UNIT..).unwrap_or(""));
        child_text.push('\n');
    }

    Ok(RawObject {
        node,
        declared,
        child_text,
    })
}

/// Reconstruct the ordered forest encoded by one dump payload.
///
/// Nesting is resolved iteratively over an explicit frame stack, so
/// logical depth is bounded only by input size and corrupted input can
/// never exhaust the call stack.
pub fn parse_dump(text: &str) -> Result<Vec<SceneNode>, ParseError> {
    struct Frame {
        node: SceneNode,
        declared: usize,
        todo: VecDeque<String>,
        done: Vec<SceneNode>,
    }

    let mut roots: Vec<SceneNode> = Vec::new();
    let mut root_todo: VecDeque<String> = split_objects(text).into();
    let mut frames: Vec<Frame> = Vec::new();

    loop {
        let chunk = match frames.last_mut() {
            Some(frame) => frame.todo.pop_front(),
            None => root_todo.pop_front(),
        };

        match chunk {
            // Open the next sibling at the deepest unfinished level.
            Some(chunk) => {
                let raw = parse_object_head(&chunk)?;
                frames.push(Frame {
                    node: raw.node,
                    declared: raw.declared,
                    todo: split_objects(&raw.child_text).into(),
                    done: Vec::new(),
                });
            }
            // Level exhausted: close its owner and hand it upward.
            None => match frames.pop() {
                Some(mut frame) => {
                    if frame.declared != frame.done.len() {
                        return Err(ParseError::ChildCountMismatch {
                            name: frame.node.name,
                            declared: frame.declared,
                            found: frame.done.len(),
                        });
                    }
                    frame.node.children = frame.done;
                    match frames.last_mut() {
                        Some(parent) => parent.done.push(frame.node),
                        None => roots.push(frame.node),
                    }
                }
                None => return Ok(roots),
            },
        }
    }
}

/// Render a forest back into the dump payload grammar.
///
/// Inverse of [`parse_dump`] for well-formed forests; used by embedders
/// that emit dumps and by round-trip tests.
pub fn write_dump(forest: &[SceneNode]) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&SceneNode, usize)> =
        forest.iter().rev().map(|node| (node, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        let pad = " ".repeat(depth * INDENT_UNIT);
        out.push_str(&format!("{pad}{OBJECT_HEADER}\n"));
        out.push_str(&format!("{pad}Name: {}\n", node.name));
        out.push_str(&format!("{pad}Position: {}\n", node.position));
        out.push_str(&format!("{pad}Rotation: {}\n", node.rotation));
        out.push_str(&format!("{pad}UUID: {}\n", node.uuid));
        out.push_str(&format!("{pad}{CHILDREN_LABEL} {}\n", node.children.len()));
        for child in node.children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }
    out
}

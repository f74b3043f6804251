//! CFG vertices: write-once successor slots while building, plain data
//! once frozen.
//!
//! Generation creates a vertex as soon as its payload node is known, but
//! its outgoing edges usually depend on fragments lowered later. Pending
//! vertices therefore hold their successors in [`OnceCell`]s: each slot is
//! connected exactly once, and a second `connect` is an error.
//!
//! [`VertexTable::freeze`] projects the reachable part of the table into a
//! [`CfgFragment`] of [`Vertex`] values whose edges are plain labels. This
//! is the only place where "every slot is filled" is checked.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CfgError, Result};
use crate::node::Node;

/// Opaque vertex label, unique within one function's fragment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Label(u32);

impl Label {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

enum Successors {
    Unconditional {
        next: OnceCell<Label>,
    },
    Conditional {
        on_true: OnceCell<Label>,
        on_false: OnceCell<Label>,
    },
    Final,
}

struct PendingVertex {
    node: Node,
    successors: Successors,
}

/// Per-function table of vertices under construction.
#[derive(Default)]
pub struct VertexTable {
    vertices: Vec<PendingVertex>,
}

impl VertexTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "vertex counts never exceed u32"
    )]
    fn add(&mut self, node: Node, successors: Successors) -> Label {
        let label = Label::new(self.vertices.len() as u32);
        tracing::trace!(%label, %node, "add vertex");
        self.vertices.push(PendingVertex { node, successors });
        label
    }

    /// Vertex with one successor, connected later through [`Self::connect`].
    pub fn add_unconditional(&mut self, node: Node) -> Label {
        self.add(
            node,
            Successors::Unconditional {
                next: OnceCell::new(),
            },
        )
    }

    /// Two-way branch on the truth of `node`.
    pub fn add_conditional(&mut self, node: Node) -> Label {
        self.add(
            node,
            Successors::Conditional {
                on_true: OnceCell::new(),
                on_false: OnceCell::new(),
            },
        )
    }

    pub fn add_final(&mut self, node: Node) -> Label {
        self.add(node, Successors::Final)
    }

    fn slots(&self, vertex: Label) -> Result<&Successors> {
        self.vertices
            .get(vertex.index())
            .map(|v| &v.successors)
            .ok_or(CfgError::UnknownVertex { label: vertex })
    }

    fn fill(cell: &OnceCell<Label>, vertex: Label, to: Label) -> Result<()> {
        cell.set(to)
            .map_err(|_| CfgError::AlreadyConnected { vertex })
    }

    /// Set the successor of an unconditional vertex.
    pub fn connect(&self, vertex: Label, to: Label) -> Result<()> {
        match self.slots(vertex)? {
            Successors::Unconditional { next } => Self::fill(next, vertex, to),
            _ => Err(CfgError::WrongVertexKind { label: vertex }),
        }
    }

    /// Set the taken edge of a conditional vertex.
    pub fn connect_true(&self, vertex: Label, to: Label) -> Result<()> {
        match self.slots(vertex)? {
            Successors::Conditional { on_true, .. } => Self::fill(on_true, vertex, to),
            _ => Err(CfgError::WrongVertexKind { label: vertex }),
        }
    }

    /// Set the fall-through edge of a conditional vertex.
    pub fn connect_false(&self, vertex: Label, to: Label) -> Result<()> {
        match self.slots(vertex)? {
            Successors::Conditional { on_false, .. } => Self::fill(on_false, vertex, to),
            _ => Err(CfgError::WrongVertexKind { label: vertex }),
        }
    }

    /// Freeze every vertex reachable from `entry`.
    ///
    /// Unreachable vertices are dropped. Fails if a reachable vertex still
    /// has an unconnected successor slot.
    pub fn freeze(&self, entry: Label) -> Result<CfgFragment> {
        let read = |cell: &OnceCell<Label>, vertex| {
            cell.get()
                .copied()
                .ok_or(CfgError::UnconnectedSuccessor { vertex })
        };

        let mut vertices = BTreeMap::new();
        let mut stack = vec![entry];
        while let Some(label) = stack.pop() {
            if vertices.contains_key(&label) {
                continue;
            }
            let pending = self
                .vertices
                .get(label.index())
                .ok_or(CfgError::UnknownVertex { label })?;
            let node = pending.node.clone();
            let vertex = match &pending.successors {
                Successors::Unconditional { next } => {
                    let next = read(next, label)?;
                    stack.push(next);
                    Vertex::Jump { node, next }
                }
                Successors::Conditional { on_true, on_false } => {
                    let (on_true, on_false) = (read(on_true, label)?, read(on_false, label)?);
                    stack.push(on_false);
                    stack.push(on_true);
                    Vertex::Conditional {
                        node,
                        on_true,
                        on_false,
                    }
                }
                Successors::Final => Vertex::Final { node },
            };
            vertices.insert(label, vertex);
        }

        let dropped = self.vertices.len() - vertices.len();
        if dropped > 0 {
            tracing::trace!(dropped, "dropped unreachable vertices");
        }
        Ok(CfgFragment { entry, vertices })
    }
}

/// A frozen vertex.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Vertex {
    Jump {
        node: Node,
        next: Label,
    },
    /// Branch to `on_true` if `node` evaluates to true, else `on_false`.
    Conditional {
        node: Node,
        on_true: Label,
        on_false: Label,
    },
    Final {
        node: Node,
    },
}

impl Vertex {
    pub fn node(&self) -> &Node {
        match self {
            Self::Jump { node, .. } | Self::Conditional { node, .. } | Self::Final { node } => {
                node
            }
        }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jump { node, next } => write!(f, "{node} -> {next}"),
            Self::Conditional {
                node,
                on_true,
                on_false,
            } => write!(f, "if {node} then {on_true} else {on_false}"),
            Self::Final { node } => write!(f, "{node}"),
        }
    }
}

/// The finished CFG of one function.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct CfgFragment {
    pub entry: Label,
    pub vertices: BTreeMap<Label, Vertex>,
}

impl CfgFragment {
    pub fn vertex(&self, label: Label) -> Option<&Vertex> {
        self.vertices.get(&label)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl fmt::Display for CfgFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "entry {}", self.entry)?;
        for (label, vertex) in &self.vertices {
            writeln!(f, "{label}: {vertex}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

//! Graph queries over frozen fragments.
//!
//! Downstream passes (instruction selection, liveness) walk fragments in
//! these orders; the textual edge list is the debugging dump used by tests.

use std::collections::BTreeMap;
use std::fmt::Write;

use rustc_hash::FxHashSet;
use smallvec::{smallvec, SmallVec};

use crate::vertex::{CfgFragment, Label, Vertex};

/// Successor labels of a vertex: taken edge first for conditionals.
pub fn successors(vertex: &Vertex) -> SmallVec<[Label; 2]> {
    match vertex {
        Vertex::Jump { next, .. } => smallvec![*next],
        Vertex::Conditional {
            on_true, on_false, ..
        } => smallvec![*on_true, *on_false],
        Vertex::Final { .. } => SmallVec::new(),
    }
}

/// Distinct predecessors of every vertex, in label order.
pub fn predecessors(fragment: &CfgFragment) -> BTreeMap<Label, Vec<Label>> {
    let mut preds: BTreeMap<Label, Vec<Label>> =
        fragment.vertices.keys().map(|&l| (l, Vec::new())).collect();

    for (&label, vertex) in &fragment.vertices {
        let mut seen = FxHashSet::default();
        for succ in successors(vertex) {
            if seen.insert(succ) {
                if let Some(list) = preds.get_mut(&succ) {
                    list.push(label);
                }
            }
        }
    }

    preds
}

/// Postorder from the entry vertex. Reverse it for a topological-ish
/// visiting order that sees loop headers before their bodies.
pub fn postorder(fragment: &CfgFragment) -> Vec<Label> {
    let mut visited = FxHashSet::default();
    let mut order = Vec::with_capacity(fragment.len());

    // (label, children_pushed)
    let mut stack: Vec<(Label, bool)> = vec![(fragment.entry, false)];

    while let Some((label, children_done)) = stack.last_mut() {
        let label = *label;
        if *children_done {
            order.push(label);
            stack.pop();
            continue;
        }
        *children_done = true;

        if !visited.insert(label) {
            stack.pop();
            continue;
        }
        let Some(vertex) = fragment.vertex(label) else {
            stack.pop();
            continue;
        };

        // Reversed so the taken edge is explored first.
        for succ in successors(vertex).into_iter().rev() {
            if !visited.contains(&succ) {
                stack.push((succ, false));
            }
        }
    }

    order
}

/// One `from -> to` line per edge, in label order.
pub fn edge_list(fragment: &CfgFragment) -> String {
    let mut out = String::new();
    for (label, vertex) in &fragment.vertices {
        for succ in successors(vertex) {
            let _ = writeln!(out, "{label} -> {succ}");
        }
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

//! Partial lowering results and the per-call evaluation parameters.

use crate::layout::Layout;
use crate::vertex::Label;

/// Result of lowering one expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubCfg {
    /// No vertex was created; `access` can be substituted directly
    /// wherever the value is needed.
    Immediate(Layout),
    /// A wired fragment. `exit` is an unconditional vertex whose successor
    /// is still unconnected; `access` is valid once `exit` has run.
    Extracted {
        entry: Label,
        exit: Label,
        access: Layout,
    },
    /// Control never falls through the fragment (`return`, `break`, or a
    /// composite whose every path does). Nothing sequenced after it runs.
    Diverging { entry: Label },
}

impl SubCfg {
    pub fn entry(&self) -> Option<Label> {
        match self {
            Self::Immediate(_) => None,
            Self::Extracted { entry, .. } | Self::Diverging { entry } => Some(*entry),
        }
    }

    pub fn is_diverging(&self) -> bool {
        matches!(self, Self::Diverging { .. })
    }
}

/// What the caller needs from a lowering.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EvalMode {
    /// Produce the value.
    Value,
    /// Produce only side effects; the access is discarded.
    SideEffect,
    /// End by jumping to `on_true` or `on_false`. `join` is the common
    /// vertex both targets eventually reach; it is owned by the caller.
    Conditional {
        on_true: Label,
        on_false: Label,
        join: Label,
    },
}

impl EvalMode {
    /// `Conditional` with the branch targets exchanged.
    pub fn negated(self) -> Self {
        match self {
            Self::Conditional {
                on_true,
                on_false,
                join,
            } => Self::Conditional {
                on_true: on_false,
                on_false: on_true,
                join,
            },
            other => other,
        }
    }
}

/// Ambient state of a recursive lowering, rebound on entering a loop.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
    /// Exit vertex of the innermost enclosing loop.
    pub loop_exit: Option<Label>,
}

impl Context {
    pub fn in_loop(self, exit: Label) -> Self {
        Self {
            loop_exit: Some(exit),
        }
    }
}

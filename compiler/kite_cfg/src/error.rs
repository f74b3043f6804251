//! Errors raised by CFG generation.
//!
//! Generation runs on programs that already passed resolution and type
//! checking, so every variant here is an internal invariant violation, not
//! a user diagnostic. A failure aborts the whole function: no partial
//! fragment is ever returned.

use kite_ir::{ExprId, FunctionId, VarId};

use crate::vertex::Label;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CfgError {
    #[error("unresolved variable use {expr}")]
    UnresolvedVariable { expr: ExprId },

    #[error("unresolved callee of call {expr}")]
    UnresolvedFunction { expr: ExprId },

    #[error("no function handler for {function}")]
    MissingHandler { function: FunctionId },

    #[error("no static type recorded for {expr}")]
    MissingType { expr: ExprId },

    #[error("{kind} {expr} cannot be used as a conditional")]
    NotConditional { expr: ExprId, kind: &'static str },

    #[error("break {expr} outside of a loop")]
    BreakOutsideLoop { expr: ExprId },

    #[error("assignment target {expr} is not a variable")]
    InvalidAssignmentTarget { expr: ExprId },

    #[error("layout shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    #[error("aggregate layout used where a single slot is required")]
    NotScalar,

    #[error("unknown field `{field}`")]
    UnknownField { field: String },

    #[error("successor of vertex {vertex} is already connected")]
    AlreadyConnected { vertex: Label },

    #[error("reachable vertex {vertex} has an unconnected successor")]
    UnconnectedSuccessor { vertex: Label },

    #[error("vertex {label} does not exist")]
    UnknownVertex { label: Label },

    #[error("vertex {label} has no successor slot of the requested kind")]
    WrongVertexKind { label: Label },

    #[error("calling convention supports {available} result slots, {slots} required")]
    UnsupportedLayout { slots: usize, available: usize },

    #[error("variable {var} is not accessible from {function}")]
    VariableNotAccessible { var: VarId, function: FunctionId },
}

pub type Result<T, E = CfgError> = std::result::Result<T, E>;

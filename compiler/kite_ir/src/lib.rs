//! Front-end data model for the Kite compiler.
//!
//! This crate provides the read-only inputs of CFG generation:
//!
//! - **AST** ([`ExprArena`], [`ExprKind`], [`Program`]): a typed,
//!   name-resolved expression tree stored in a flat arena.
//! - **Types** ([`Type`], [`TypeTable`]): structural static types and the
//!   per-expression type lookup.
//! - **Name resolution** ([`NameResolution`]): variable uses to
//!   declarations, calls to functions.
//! - **Use analysis** ([`UseAnalysis`], [`UseFlags`]): per-scope read/write
//!   facts, including which variables are captured by nested functions.
//!
//! Parsing, resolution and type checking live upstream. [`ProgramBuilder`]
//! constructs a [`CompilationUnit`] directly, with resolution and types
//! recorded as each expression is created.

pub mod ast;
mod builder;
mod ids;
mod resolve;
mod types;
mod uses;

pub use ast::{
    AssignOp, BinaryOp, ExprArena, ExprKind, FunctionDecl, Literal, Program, UnaryOp, Variable,
};
pub use builder::ProgramBuilder;
pub use ids::{ExprId, FunctionId, VarId};
pub use resolve::NameResolution;
pub use types::{StructType, Type, TypeTable};
pub use uses::{UseAnalysis, UseFlags};

/// Everything CFG generation consumes for one program.
#[derive(Clone, Debug)]
pub struct CompilationUnit {
    pub program: Program,
    pub names: NameResolution,
    pub types: TypeTable,
    pub uses: UseAnalysis,
}

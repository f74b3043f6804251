//! Typed, name-resolved abstract syntax tree.
//!
//! Expressions live in a flat [`ExprArena`] and reference each other by
//! [`ExprId`]. The expression vocabulary is a closed sum type so that every
//! consumer (use analysis, side-effect analysis, CFG generation) handles each
//! kind through an exhaustive `match`.
//!
//! Resolution facts (which declaration a use refers to) and static types are
//! not stored in the tree; they live in [`NameResolution`](crate::NameResolution)
//! and [`TypeTable`](crate::TypeTable).

mod operators;

use smallvec::SmallVec;

pub use operators::{AssignOp, BinaryOp, UnaryOp};

use crate::ids::{ExprId, FunctionId, VarId};
use crate::types::Type;

/// Literal constants.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Int(i64),
    Bool(bool),
}

/// One expression node.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ExprKind {
    /// `(e1; e2; ...; en)`: the value of the last element.
    Block(Vec<ExprId>),
    /// Nested function declaration used as an expression.
    Function(FunctionId),
    /// `let x = init`.
    Let { var: VarId, init: ExprId },
    /// `()` written as an empty expression.
    Empty,
    Literal(Literal),
    /// A variable use. The name is kept for dumps only; the declaration is
    /// found through name resolution.
    Var(String),
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `target op= value`. `target` is a [`ExprKind::Var`].
    Assign {
        op: AssignOp,
        target: ExprId,
        value: ExprId,
    },
    If {
        cond: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
    },
    While {
        cond: ExprId,
        body: ExprId,
    },
    Return(Option<ExprId>),
    Break,
    /// Direct call. The callee is found through name resolution.
    Call { callee: String, args: Vec<ExprId> },
    /// Struct literal; fields are evaluated in source order.
    Struct(Vec<(String, ExprId)>),
    Field { receiver: ExprId, field: String },
}

impl ExprKind {
    /// Short name of the variant, for diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Block(_) => "block",
            Self::Function(_) => "function declaration",
            Self::Let { .. } => "variable declaration",
            Self::Empty => "empty expression",
            Self::Literal(_) => "literal",
            Self::Var(_) => "variable use",
            Self::Unary { .. } => "unary operator",
            Self::Binary { .. } => "binary operator",
            Self::Assign { .. } => "assignment",
            Self::If { .. } => "if",
            Self::While { .. } => "while",
            Self::Return(_) => "return",
            Self::Break => "break",
            Self::Call { .. } => "call",
            Self::Struct(_) => "struct literal",
            Self::Field { .. } => "field access",
        }
    }

    /// Direct sub-expressions in evaluation order.
    ///
    /// A nested [`ExprKind::Function`] has no children here: its body is a
    /// separate scope, reached through [`Program::function`].
    pub fn children(&self) -> SmallVec<[ExprId; 4]> {
        let mut out = SmallVec::new();
        match self {
            Self::Block(items) => out.extend(items.iter().copied()),
            Self::Let { init, .. } => out.push(*init),
            Self::Unary { operand, .. } => out.push(*operand),
            Self::Binary { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            Self::Assign { target, value, .. } => {
                out.push(*target);
                out.push(*value);
            }
            Self::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.push(*cond);
                out.push(*then_branch);
                out.extend(*else_branch);
            }
            Self::While { cond, body } => {
                out.push(*cond);
                out.push(*body);
            }
            Self::Return(value) => out.extend(*value),
            Self::Call { args, .. } => out.extend(args.iter().copied()),
            Self::Struct(fields) => out.extend(fields.iter().map(|(_, id)| *id)),
            Self::Field { receiver, .. } => out.push(*receiver),
            Self::Function(_) | Self::Empty | Self::Literal(_) | Self::Var(_) | Self::Break => {}
        }
        out
    }
}

/// Flat storage for expressions.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct ExprArena {
    exprs: Vec<ExprKind>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an expression and return its id.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "expression indices never exceed u32"
    )]
    pub fn push(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId::new(self.exprs.len() as u32);
        self.exprs.push(kind);
        id
    }

    /// Get an expression by id.
    ///
    /// # Panics
    /// If `id` was not minted by this arena.
    #[inline]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id.index()]
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

/// A declared variable: a function parameter or a `let` binding.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub name: String,
    pub ty: Type,
    /// The function whose frame owns the variable.
    pub owner: FunctionId,
}

/// A function declaration (top-level or nested).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionDecl {
    pub name: String,
    /// Lexically enclosing function, `None` at top level.
    pub parent: Option<FunctionId>,
    pub params: Vec<VarId>,
    pub return_type: Type,
    pub body: ExprId,
}

/// A whole program: the expression arena plus its declarations.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    pub arena: ExprArena,
    pub variables: Vec<Variable>,
    pub functions: Vec<FunctionDecl>,
}

impl Program {
    #[inline]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        self.arena.kind(id)
    }

    #[inline]
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    #[inline]
    pub fn function(&self, id: FunctionId) -> &FunctionDecl {
        &self.functions[id.index()]
    }

    /// All function ids in declaration order (parents before children).
    #[expect(
        clippy::cast_possible_truncation,
        reason = "function indices never exceed u32"
    )]
    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> {
        (0..self.functions.len()).map(|i| FunctionId::new(i as u32))
    }

    /// Nesting depth of a function: 0 for top-level declarations.
    pub fn depth(&self, id: FunctionId) -> usize {
        let mut depth = 0;
        let mut current = self.function(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.function(parent).parent;
        }
        depth
    }
}

#[cfg(test)]
mod tests;

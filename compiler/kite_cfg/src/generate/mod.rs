//! CFG generation.
//!
//! [`Generator`] lowers one function body into a [`CfgFragment`]. Lowering
//! is a recursive walk over the expression tree; every call receives an
//! [`EvalMode`] saying what the caller needs (the value, only the side
//! effects, or a two-way branch) and returns a [`SubCfg`]: an immediate
//! access with no vertices, a wired fragment whose exit the caller
//! connects, or a fragment control never falls out of.
//!
//! # Module layout
//!
//! - `control_flow`: blocks, `if`, `while`, `return`, `break`
//! - `assign`: declarations and (compound) assignments
//! - `operators`: unary and binary operators, short-circuit logic
//! - `calls`: calls through the callee's [`FunctionHandler`]
//! - `aggregates`: struct literals and field access
//!
//! The helpers in this module are the only places that connect fragment
//! exits, so the write-once discipline of successor slots stays in one
//! spot.

mod aggregates;
mod assign;
mod calls;
mod control_flow;
mod operators;

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use kite_ir::{
    CompilationUnit, ExprId, ExprKind, FunctionId, Literal, NameResolution, Program, Type,
    TypeTable, VarId,
};

use crate::effects::SideEffectAnalyzer;
use crate::error::{CfgError, Result};
use crate::handler::{FunctionHandler, HandlerMap};
use crate::layout::Layout;
use crate::node::{Constant, Node, Register};
use crate::stack::ensure_sufficient_stack;
use crate::subcfg::{Context, EvalMode, SubCfg};
use crate::vertex::{CfgFragment, Label, VertexTable};

/// Finished fragments of a whole program, in function-id order.
pub type ProgramCfg = BTreeMap<FunctionId, CfgFragment>;

/// Per-function generation state.
pub struct Generator<'a> {
    program: &'a Program,
    names: &'a NameResolution,
    types: &'a TypeTable,
    function: FunctionId,
    handlers: &'a HandlerMap,
    handler: &'a dyn FunctionHandler,
    vertices: VertexTable,
    effects: SideEffectAnalyzer<'a>,
    next_register: u32,
}

impl<'a> Generator<'a> {
    pub fn new(
        unit: &'a CompilationUnit,
        handlers: &'a HandlerMap,
        function: FunctionId,
    ) -> Result<Self> {
        let handler = handlers
            .get(&function)
            .ok_or(CfgError::MissingHandler { function })?;
        Ok(Self {
            program: &unit.program,
            names: &unit.names,
            types: &unit.types,
            function,
            handlers,
            handler: handler.as_ref(),
            vertices: VertexTable::new(),
            effects: SideEffectAnalyzer::new(&unit.program, &unit.names, &unit.uses),
            next_register: handler.reserved_registers(),
        })
    }

    /// Lower the function body and freeze the result.
    ///
    /// A body that falls through stores its value into the return layout
    /// and ends in one shared `Final(Return)` vertex.
    pub fn run(mut self) -> Result<CfgFragment> {
        let program = self.program;
        let decl = program.function(self.function);
        let body = self.generate(decl.body, EvalMode::Value, Context::default())?;

        let mut entry = match body {
            SubCfg::Diverging { entry } => entry,
            SubCfg::Immediate(access) => self.store_result(None, access)?,
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => self.store_result(Some((entry, exit)), access)?,
        };

        let prologue = self.handler.generate_prologue()?;
        if !prologue.is_empty() {
            let start = self.vertices.add_unconditional(Node::sequence(prologue));
            self.vertices.connect(start, entry)?;
            entry = start;
        }

        let fragment = self.vertices.freeze(entry)?;
        debug!(
            function = %decl.name,
            vertices = fragment.len(),
            registers = self.next_register,
            "generated function"
        );
        Ok(fragment)
    }

    /// Store the body's value into the return layout, then return.
    fn store_result(&mut self, prefix: Option<(Label, Label)>, access: Layout) -> Result<Label> {
        let ret = self.handler.return_layout()?;
        let node = self.assignment_node(&ret, access)?;
        let store = self.vertices.add_unconditional(node);
        let exit_vertex = self.vertices.add_final(Node::Return);
        self.vertices.connect(store, exit_vertex)?;
        match prefix {
            Some((entry, exit)) => {
                self.vertices.connect(exit, store)?;
                Ok(entry)
            }
            None => Ok(store),
        }
    }

    /// Lower `id` under `mode`.
    ///
    /// Under `SideEffect` mode an expression without side effects is
    /// dropped here, before any kind-specific lowering runs.
    pub(crate) fn generate(&mut self, id: ExprId, mode: EvalMode, ctx: Context) -> Result<SubCfg> {
        if mode == EvalMode::SideEffect && !self.effects.has_side_effects(id) {
            return Ok(SubCfg::Immediate(Layout::no_op()));
        }
        ensure_sufficient_stack(|| self.dispatch(id, mode, ctx))
    }

    fn dispatch(&mut self, id: ExprId, mode: EvalMode, ctx: Context) -> Result<SubCfg> {
        let program = self.program;
        match program.kind(id) {
            ExprKind::Block(items) => self.generate_block(id, items, mode, ctx),
            // A nested declaration is lowered on its own, not at its site.
            ExprKind::Function(_) | ExprKind::Empty => self.unit_or_noop(id, mode),
            ExprKind::Let { var, init } => self.generate_let(id, *var, *init, mode, ctx),
            ExprKind::Literal(literal) => self.generate_literal(id, *literal, mode),
            ExprKind::Var(_) => self.generate_variable(id, mode),
            ExprKind::Unary { op, operand } => self.generate_unary(id, *op, *operand, mode, ctx),
            ExprKind::Binary { op, lhs, rhs } => {
                self.generate_binary(id, *op, *lhs, *rhs, mode, ctx)
            }
            ExprKind::Assign { op, target, value } => {
                self.generate_assign(id, *op, *target, *value, mode, ctx)
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.generate_if(id, *cond, *then_branch, *else_branch, mode, ctx),
            ExprKind::While { cond, body } => self.generate_while(id, *cond, *body, mode, ctx),
            ExprKind::Return(value) => self.generate_return(*value, ctx),
            ExprKind::Break => self.generate_break(id, ctx),
            ExprKind::Call { args, .. } => self.generate_call(id, args, mode, ctx),
            ExprKind::Struct(fields) => self.generate_struct(id, fields, mode, ctx),
            ExprKind::Field { receiver, field } => {
                self.generate_field(id, *receiver, field, mode, ctx)
            }
        }
    }

    // Leaves

    fn generate_literal(&mut self, id: ExprId, literal: Literal, mode: EvalMode) -> Result<SubCfg> {
        let node = match literal {
            Literal::Int(n) => Node::int(n),
            Literal::Bool(b) => Node::boolean(b),
        };
        match mode {
            EvalMode::Value => Ok(SubCfg::Immediate(Layout::scalar(node))),
            EvalMode::SideEffect => Ok(SubCfg::Immediate(Layout::no_op())),
            EvalMode::Conditional { .. } => match literal {
                Literal::Bool(_) => self.branch_on(id, SubCfg::Immediate(Layout::scalar(node)), mode),
                Literal::Int(_) => Err(self.not_conditional(id)),
            },
        }
    }

    fn generate_variable(&mut self, id: ExprId, mode: EvalMode) -> Result<SubCfg> {
        let var = self.resolve_variable(id)?;
        let access = self.variable_access(var)?;
        match mode {
            EvalMode::Value => Ok(SubCfg::Immediate(access)),
            EvalMode::SideEffect => Ok(SubCfg::Immediate(Layout::no_op())),
            EvalMode::Conditional { .. } => self.branch_on(id, SubCfg::Immediate(access), mode),
        }
    }

    // Lookups

    fn resolve_variable(&self, id: ExprId) -> Result<VarId> {
        self.names
            .variable(id)
            .ok_or(CfgError::UnresolvedVariable { expr: id })
    }

    fn variable_access(&self, var: VarId) -> Result<Layout> {
        self.handler.generate_variable_access(var)
    }

    fn expr_type(&self, id: ExprId) -> Result<&'a Type> {
        let types: &'a TypeTable = self.types;
        types.get(id).ok_or(CfgError::MissingType { expr: id })
    }

    /// Value of a boolean literal, for folding constant conditions.
    fn constant_condition(&self, id: ExprId) -> Option<bool> {
        match self.program.kind(id) {
            ExprKind::Literal(Literal::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn not_conditional(&self, id: ExprId) -> CfgError {
        CfgError::NotConditional {
            expr: id,
            kind: self.program.kind(id).name(),
        }
    }

    /// The result of an expression that produces nothing: `()` as a value,
    /// a no-op as an effect, and never a branch condition.
    fn unit_or_noop(&self, id: ExprId, mode: EvalMode) -> Result<SubCfg> {
        match mode {
            EvalMode::Value => Ok(SubCfg::Immediate(Layout::unit())),
            EvalMode::SideEffect => Ok(SubCfg::Immediate(Layout::no_op())),
            EvalMode::Conditional { .. } => Err(self.not_conditional(id)),
        }
    }

    /// Access of a value-free result under `mode`.
    fn discarded(mode: EvalMode) -> Layout {
        match mode {
            EvalMode::Value => Layout::unit(),
            EvalMode::SideEffect | EvalMode::Conditional { .. } => Layout::no_op(),
        }
    }

    // Storage

    fn fresh_register(&mut self) -> Node {
        let n = self.next_register;
        self.next_register += 1;
        Node::virtual_register(n)
    }

    fn fresh_layout(&mut self, ty: &Type) -> Layout {
        Layout::build(ty, &mut || self.fresh_register())
    }

    /// Fresh registers in the shape of `layout`.
    fn fresh_like(&mut self, layout: &Layout) -> Layout {
        layout.clone().map(&mut |_| self.fresh_register())
    }

    /// Registers minted by this generator are written only by the
    /// expression that created them.
    fn is_temporary(&self, layout: &Layout) -> bool {
        let reserved = self.handler.reserved_registers();
        layout.flatten().iter().all(|slot| {
            matches!(slot, Node::Register(Register::Virtual(n)) if *n >= reserved)
        })
    }

    // Composition

    /// Run `first` to completion, then `second`; the result is `second`'s.
    ///
    /// `first`'s access is dropped: callers pass fragments whose effects
    /// already live in vertices.
    fn merge(&mut self, first: SubCfg, second: SubCfg) -> Result<SubCfg> {
        let (entry, exit) = match first {
            SubCfg::Immediate(_) => return Ok(second),
            SubCfg::Diverging { .. } => return Ok(first),
            SubCfg::Extracted { entry, exit, .. } => (entry, exit),
        };
        match second {
            SubCfg::Immediate(access) => Ok(SubCfg::Extracted {
                entry,
                exit,
                access,
            }),
            SubCfg::Extracted {
                entry: next,
                exit: last,
                access,
            } => {
                self.vertices.connect(exit, next)?;
                Ok(SubCfg::Extracted {
                    entry,
                    exit: last,
                    access,
                })
            }
            SubCfg::Diverging { entry: next } => {
                self.vertices.connect(exit, next)?;
                Ok(SubCfg::Diverging { entry })
            }
        }
    }

    /// [`Self::merge`] onto an optional prefix.
    fn chain(&mut self, prefix: Option<SubCfg>, next: SubCfg) -> Result<SubCfg> {
        match prefix {
            Some(prefix) => self.merge(prefix, next),
            None => Ok(next),
        }
    }

    /// Move any effect still pending in the access into a vertex and drop
    /// the access.
    fn extract_effect(&mut self, sub: SubCfg) -> Result<SubCfg> {
        let effect = |access: &Layout| {
            Node::sequence(
                access
                    .flatten()
                    .into_iter()
                    .filter(|node| node.has_effect())
                    .cloned(),
            )
        };
        match sub {
            SubCfg::Immediate(access) => {
                let node = effect(&access);
                if node.is_no_op() {
                    return Ok(SubCfg::Immediate(Layout::no_op()));
                }
                let v = self.vertices.add_unconditional(node);
                Ok(SubCfg::Extracted {
                    entry: v,
                    exit: v,
                    access: Layout::no_op(),
                })
            }
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => {
                let node = effect(&access);
                if node.is_no_op() {
                    return Ok(SubCfg::Extracted {
                        entry,
                        exit,
                        access: Layout::no_op(),
                    });
                }
                let v = self.vertices.add_unconditional(node);
                self.vertices.connect(exit, v)?;
                Ok(SubCfg::Extracted {
                    entry,
                    exit: v,
                    access: Layout::no_op(),
                })
            }
            diverging @ SubCfg::Diverging { .. } => Ok(diverging),
        }
    }

    /// Force the value into a vertex and fresh registers, so later
    /// fragments cannot change it.
    fn materialize(&mut self, sub: SubCfg) -> Result<SubCfg> {
        if let SubCfg::Extracted { access, .. } = &sub {
            if self.is_temporary(access) {
                return Ok(sub);
            }
        }
        match sub {
            SubCfg::Immediate(access) => {
                let fresh = self.fresh_like(&access);
                let node = self.assignment_node(&fresh, access)?;
                let v = self.vertices.add_unconditional(node);
                Ok(SubCfg::Extracted {
                    entry: v,
                    exit: v,
                    access: fresh,
                })
            }
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => {
                let fresh = self.fresh_like(&access);
                let node = self.assignment_node(&fresh, access)?;
                let v = self.vertices.add_unconditional(node);
                self.vertices.connect(exit, v)?;
                Ok(SubCfg::Extracted {
                    entry,
                    exit: v,
                    access: fresh,
                })
            }
            diverging @ SubCfg::Diverging { .. } => Ok(diverging),
        }
    }

    /// Append a vertex storing the fragment's value into `dest`.
    fn extend_with_assignment(&mut self, sub: SubCfg, dest: &Layout) -> Result<SubCfg> {
        match sub {
            SubCfg::Immediate(access) => {
                let node = self.assignment_node(dest, access)?;
                let v = self.vertices.add_unconditional(node);
                Ok(SubCfg::Extracted {
                    entry: v,
                    exit: v,
                    access: dest.clone(),
                })
            }
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => {
                let node = self.assignment_node(dest, access)?;
                let v = self.vertices.add_unconditional(node);
                self.vertices.connect(exit, v)?;
                Ok(SubCfg::Extracted {
                    entry,
                    exit: v,
                    access: dest.clone(),
                })
            }
            diverging @ SubCfg::Diverging { .. } => Ok(diverging),
        }
    }

    /// End a value fragment in a two-way branch on its (boolean) access.
    ///
    /// The result's exit is the caller's join. A constant condition jumps
    /// straight to the chosen target without a vertex.
    fn branch_on(&mut self, id: ExprId, sub: SubCfg, mode: EvalMode) -> Result<SubCfg> {
        let EvalMode::Conditional {
            on_true,
            on_false,
            join,
        } = mode
        else {
            return Err(self.not_conditional(id));
        };
        let (prefix, access) = match sub {
            SubCfg::Immediate(access) => (None, access),
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => (Some((entry, exit)), access),
            diverging @ SubCfg::Diverging { .. } => return Ok(diverging),
        };

        let entry = match (prefix, access.into_scalar()?) {
            (None, Node::Constant(Constant::Bool(b))) => {
                if b {
                    on_true
                } else {
                    on_false
                }
            }
            (prefix, node) => {
                let test = self.vertices.add_conditional(node);
                self.vertices.connect_true(test, on_true)?;
                self.vertices.connect_false(test, on_false)?;
                match prefix {
                    Some((entry, exit)) => {
                        self.vertices.connect(exit, test)?;
                        entry
                    }
                    None => test,
                }
            }
        };
        Ok(SubCfg::Extracted {
            entry,
            exit: join,
            access: Layout::no_op(),
        })
    }

    /// Entry of a conditional-mode result.
    fn conditional_entry(&self, id: ExprId, sub: &SubCfg) -> Result<Label> {
        sub.entry().ok_or_else(|| self.not_conditional(id))
    }
}

/// Generate the fragment of one function.
pub fn generate_function(
    unit: &CompilationUnit,
    handlers: &HandlerMap,
    function: FunctionId,
) -> Result<CfgFragment> {
    Generator::new(unit, handlers, function)?.run()
}

/// Generate every function of `unit`, in declaration order.
pub fn generate_program(unit: &CompilationUnit, handlers: &HandlerMap) -> Result<ProgramCfg> {
    unit.program
        .function_ids()
        .map(|function| generate_function(unit, handlers, function).map(|cfg| (function, cfg)))
        .collect()
}

/// [`generate_program`] with functions spread across the rayon pool.
///
/// Functions share no mutable state during generation, so the result is
/// identical to the sequential one.
pub fn generate_program_parallel(
    unit: &CompilationUnit,
    handlers: &HandlerMap,
) -> Result<ProgramCfg> {
    let functions: Vec<FunctionId> = unit.program.function_ids().collect();
    functions
        .into_par_iter()
        .map(|function| generate_function(unit, handlers, function).map(|cfg| (function, cfg)))
        .collect()
}

// Tests

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

//! Per-scope variable use analysis.
//!
//! Records, for every function scope, which variables it reads and writes.
//! A use from a nested function is additionally recorded in the owning
//! function's scope as a `NESTED_*` flag; such variables are *captured* and
//! must live in memory reachable through the static link.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::ast::{ExprKind, Program};
use crate::ids::{ExprId, FunctionId, VarId};
use crate::resolve::NameResolution;

bitflags! {
    /// How a scope uses one variable.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct UseFlags: u8 {
        /// Read by the scope itself.
        const READ = 1 << 0;
        /// Written by the scope itself (declarations count as writes).
        const WRITE = 1 << 1;
        /// Read by a function nested inside the owning scope.
        const NESTED_READ = 1 << 2;
        /// Written by a function nested inside the owning scope.
        const NESTED_WRITE = 1 << 3;
    }
}

impl UseFlags {
    /// Any access from a nested function.
    pub const NESTED: Self = Self::NESTED_READ.union(Self::NESTED_WRITE);
}

#[derive(Clone, Default, Debug)]
pub struct UseAnalysis {
    scopes: FxHashMap<FunctionId, FxHashMap<VarId, UseFlags>>,
}

impl UseAnalysis {
    /// Analyze every function of `program`.
    pub fn compute(program: &Program, names: &NameResolution) -> Self {
        let mut analysis = Self::default();
        for function in program.function_ids() {
            let decl = program.function(function);
            for &param in &decl.params {
                analysis.record(program, function, param, UseFlags::WRITE);
            }
            let mut stack = vec![decl.body];
            while let Some(id) = stack.pop() {
                analysis.visit(program, names, function, id, &mut stack);
            }
        }
        analysis
    }

    fn visit(
        &mut self,
        program: &Program,
        names: &NameResolution,
        scope: FunctionId,
        id: ExprId,
        stack: &mut Vec<ExprId>,
    ) {
        let kind = program.kind(id);
        match kind {
            ExprKind::Let { var, init } => {
                self.record(program, scope, *var, UseFlags::WRITE);
                stack.push(*init);
            }
            ExprKind::Var(_) => {
                if let Some(var) = names.variable(id) {
                    self.record(program, scope, var, UseFlags::READ);
                }
            }
            // The target of a plain `=` is written but not read.
            ExprKind::Assign { op, target, value } => {
                if let Some(var) = names.variable(*target) {
                    let flags = if op.arithmetic().is_some() {
                        UseFlags::READ | UseFlags::WRITE
                    } else {
                        UseFlags::WRITE
                    };
                    self.record(program, scope, var, flags);
                }
                stack.push(*value);
            }
            _ => stack.extend(kind.children()),
        }
    }

    /// Record `flags` for `var` in `scope`, and the nested counterpart in
    /// the owning scope when the two differ.
    fn record(&mut self, program: &Program, scope: FunctionId, var: VarId, flags: UseFlags) {
        *self
            .scopes
            .entry(scope)
            .or_default()
            .entry(var)
            .or_default() |= flags;

        let owner = program.variable(var).owner;
        if owner != scope {
            let mut nested = UseFlags::empty();
            if flags.contains(UseFlags::READ) {
                nested |= UseFlags::NESTED_READ;
            }
            if flags.contains(UseFlags::WRITE) {
                nested |= UseFlags::NESTED_WRITE;
            }
            *self
                .scopes
                .entry(owner)
                .or_default()
                .entry(var)
                .or_default() |= nested;
        }
    }

    /// How `scope` uses `var` (empty if never mentioned).
    pub fn flags(&self, scope: FunctionId, var: VarId) -> UseFlags {
        self.scopes
            .get(&scope)
            .and_then(|vars| vars.get(&var))
            .copied()
            .unwrap_or_default()
    }

    /// Whether a nested function reads or writes `var`.
    pub fn is_captured(&self, program: &Program, var: VarId) -> bool {
        self.flags(program.variable(var).owner, var)
            .intersects(UseFlags::NESTED)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

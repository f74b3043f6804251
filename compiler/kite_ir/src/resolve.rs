//! Name resolution results.
//!
//! Maps each variable use to its declaration and each call to the function
//! it invokes. Resolution is computed upstream; consumers treat a missing
//! entry as an internal compiler error.

use rustc_hash::FxHashMap;

use crate::ids::{ExprId, FunctionId, VarId};

#[derive(Clone, Default, Debug)]
pub struct NameResolution {
    variables: FxHashMap<ExprId, VarId>,
    callees: FxHashMap<ExprId, FunctionId>,
}

impl NameResolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the variable use `expr` refers to `var`.
    pub fn bind_variable(&mut self, expr: ExprId, var: VarId) {
        self.variables.insert(expr, var);
    }

    /// Record that the call `expr` invokes `function`.
    pub fn bind_callee(&mut self, expr: ExprId, function: FunctionId) {
        self.callees.insert(expr, function);
    }

    pub fn variable(&self, expr: ExprId) -> Option<VarId> {
        self.variables.get(&expr).copied()
    }

    pub fn callee(&self, expr: ExprId) -> Option<FunctionId> {
        self.callees.get(&expr).copied()
    }
}

//! Calls.
//!
//! Arguments are lowered left to right. An argument whose value a later
//! argument could change (or whose effect a later one could observe) is
//! copied into fresh registers before the later argument runs.

use kite_ir::ExprId;

use crate::error::{CfgError, Result};
use crate::layout::Layout;
use crate::node::Node;
use crate::subcfg::{Context, EvalMode, SubCfg};

use super::Generator;

impl Generator<'_> {
    pub(super) fn generate_call(
        &mut self,
        id: ExprId,
        args: &[ExprId],
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        let callee = self
            .names
            .callee(id)
            .ok_or(CfgError::UnresolvedFunction { expr: id })?;
        let handlers = self.handlers;
        let callee_handler = handlers
            .get(&callee)
            .ok_or(CfgError::MissingHandler { function: callee })?;

        let mut prefix: Option<SubCfg> = None;
        let mut accesses = Vec::with_capacity(args.len());
        for (i, &arg) in args.iter().enumerate() {
            let sub = self.generate(arg, EvalMode::Value, ctx)?;
            let overwritten = args[i + 1..]
                .iter()
                .any(|&later| self.effects.has_clashing_side_effects(arg, later));
            let sub = if overwritten {
                self.materialize(sub)?
            } else {
                sub
            };
            let access = match sub {
                SubCfg::Immediate(access) => access,
                SubCfg::Extracted {
                    entry,
                    exit,
                    access,
                } => {
                    let step = SubCfg::Extracted {
                        entry,
                        exit,
                        access: Layout::no_op(),
                    };
                    prefix = Some(self.chain(prefix, step)?);
                    access
                }
                diverging @ SubCfg::Diverging { .. } => return self.chain(prefix, diverging),
            };
            accesses.push(access);
        }

        let result = match mode {
            EvalMode::SideEffect => None,
            EvalMode::Value | EvalMode::Conditional { .. } => {
                Some(self.fresh_layout(self.expr_type(id)?))
            }
        };
        let nodes = callee_handler.generate_call(self.handler, &accesses, result.as_ref())?;
        let v = self.vertices.add_unconditional(Node::sequence(nodes));
        tracing::trace!(call = %id, callee = callee_handler.label(), vertex = %v, "lowered call");

        let call = SubCfg::Extracted {
            entry: v,
            exit: v,
            access: result.unwrap_or_else(Layout::no_op),
        };
        let sub = self.chain(prefix, call)?;
        match mode {
            EvalMode::Conditional { .. } => self.branch_on(id, sub, mode),
            EvalMode::Value | EvalMode::SideEffect => Ok(sub),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

//! Blocks, conditionals, loops and non-local exits.
//!
//! Constant conditions are folded while lowering: the dead arm of
//! `if true`/`if false` is never visited, and `while false` produces
//! nothing. Code sequenced after a `return` or `break` in a block is
//! dropped without generating it.

use kite_ir::ExprId;

use crate::error::{CfgError, Result};
use crate::layout::Layout;
use crate::node::Node;
use crate::subcfg::{Context, EvalMode, SubCfg};

use super::Generator;

impl Generator<'_> {
    pub(super) fn generate_block(
        &mut self,
        id: ExprId,
        items: &[ExprId],
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        let Some((&last, init)) = items.split_last() else {
            return self.unit_or_noop(id, mode);
        };

        let mut prefix: Option<SubCfg> = None;
        for &item in init {
            if !self.effects.has_side_effects(item) {
                continue;
            }
            let sub = self.generate(item, EvalMode::SideEffect, ctx)?;
            let sub = self.extract_effect(sub)?;
            let sub = self.chain(prefix, sub)?;
            if sub.is_diverging() {
                tracing::trace!(block = %id, "dropping code after non-local exit");
                return Ok(sub);
            }
            prefix = Some(sub);
        }

        let last = self.generate(last, mode, ctx)?;
        self.chain(prefix, last)
    }

    pub(super) fn generate_if(
        &mut self,
        id: ExprId,
        cond: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        if let Some(taken) = self.constant_condition(cond) {
            return match (taken, else_branch) {
                (true, _) => self.generate(then_branch, mode, ctx),
                (false, Some(else_branch)) => self.generate(else_branch, mode, ctx),
                (false, None) => self.unit_or_noop(id, mode),
            };
        }

        match (mode, else_branch) {
            (EvalMode::Conditional { .. }, None) => Err(self.not_conditional(id)),
            (EvalMode::Conditional { join, .. }, Some(else_branch)) => {
                // Both arms end at the caller's targets.
                let then_sub = self.generate(then_branch, mode, ctx)?;
                let else_sub = self.generate(else_branch, mode, ctx)?;
                let on_true = self.conditional_entry(then_branch, &then_sub)?;
                let on_false = self.conditional_entry(else_branch, &else_sub)?;
                self.generate(
                    cond,
                    EvalMode::Conditional {
                        on_true,
                        on_false,
                        join,
                    },
                    ctx,
                )
            }
            (EvalMode::Value, Some(else_branch)) => {
                let dest = self.fresh_layout(self.expr_type(id)?);
                let then_sub = self.generate(then_branch, EvalMode::Value, ctx)?;
                let then_sub = self.extend_with_assignment(then_sub, &dest)?;
                let else_sub = self.generate(else_branch, EvalMode::Value, ctx)?;
                let else_sub = self.extend_with_assignment(else_sub, &dest)?;
                self.join_arms(cond, then_sub, else_sub, dest, ctx)
            }
            // Without an else the value is `()`: only the effects matter.
            (EvalMode::Value | EvalMode::SideEffect, else_branch) => {
                let then_sub = self.generate(then_branch, EvalMode::SideEffect, ctx)?;
                let then_sub = self.extract_effect(then_sub)?;
                let else_sub = match else_branch {
                    Some(else_branch) => {
                        let sub = self.generate(else_branch, EvalMode::SideEffect, ctx)?;
                        self.extract_effect(sub)?
                    }
                    None => SubCfg::Immediate(Layout::no_op()),
                };
                self.join_arms(cond, then_sub, else_sub, Self::discarded(mode), ctx)
            }
        }
    }

    /// Lower the test of an `if` between two finished arms.
    ///
    /// When exactly one arm falls through, its exit is the join; when both
    /// do, a fresh no-op join collects them. Arms without vertices branch
    /// straight to the join.
    fn join_arms(
        &mut self,
        cond: ExprId,
        then_sub: SubCfg,
        else_sub: SubCfg,
        access: Layout,
        ctx: Context,
    ) -> Result<SubCfg> {
        let exit_of = |sub: &SubCfg| match sub {
            SubCfg::Extracted { exit, .. } => Some(*exit),
            SubCfg::Immediate(_) | SubCfg::Diverging { .. } => None,
        };

        let fallthrough = match (&then_sub, &else_sub) {
            (SubCfg::Diverging { .. }, SubCfg::Extracted { exit, .. })
            | (SubCfg::Extracted { exit, .. }, SubCfg::Diverging { .. }) => Some(*exit),
            _ => None,
        };
        let join = match fallthrough {
            Some(exit) => exit,
            None => {
                let join = self.vertices.add_unconditional(Node::NoOp);
                for exit in [exit_of(&then_sub), exit_of(&else_sub)].into_iter().flatten() {
                    self.vertices.connect(exit, join)?;
                }
                join
            }
        };

        let on_true = then_sub.entry().unwrap_or(join);
        let on_false = else_sub.entry().unwrap_or(join);
        let test = self.generate(
            cond,
            EvalMode::Conditional {
                on_true,
                on_false,
                join,
            },
            ctx,
        )?;

        match test {
            SubCfg::Diverging { .. } => Ok(test),
            _ if then_sub.is_diverging() && else_sub.is_diverging() => {
                let entry = self.conditional_entry(cond, &test)?;
                Ok(SubCfg::Diverging { entry })
            }
            _ => Ok(SubCfg::Extracted {
                entry: self.conditional_entry(cond, &test)?,
                exit: join,
                access,
            }),
        }
    }

    pub(super) fn generate_while(
        &mut self,
        id: ExprId,
        cond: ExprId,
        body: ExprId,
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        if matches!(mode, EvalMode::Conditional { .. }) {
            return Err(self.not_conditional(id));
        }
        let always = match self.constant_condition(cond) {
            Some(false) => return self.unit_or_noop(id, mode),
            Some(true) => true,
            None => false,
        };

        let loop_exit = self.vertices.add_unconditional(Node::NoOp);
        let inner = ctx.in_loop(loop_exit);
        let body_sub = self.generate(body, EvalMode::SideEffect, inner)?;
        let body_sub = match self.extract_effect(body_sub)? {
            // An empty body still needs a vertex to loop through.
            SubCfg::Immediate(_) => {
                let v = self.vertices.add_unconditional(Node::NoOp);
                SubCfg::Extracted {
                    entry: v,
                    exit: v,
                    access: Layout::no_op(),
                }
            }
            sub => sub,
        };
        let access = Self::discarded(mode);

        if always {
            let entry = match body_sub {
                SubCfg::Extracted { entry, exit, .. } => {
                    self.vertices.connect(exit, entry)?;
                    entry
                }
                SubCfg::Diverging { entry } => entry,
                SubCfg::Immediate(_) => loop_exit,
            };
            return Ok(SubCfg::Extracted {
                entry,
                exit: loop_exit,
                access,
            });
        }

        let on_true = body_sub.entry().unwrap_or(loop_exit);
        let test = self.generate(
            cond,
            EvalMode::Conditional {
                on_true,
                on_false: loop_exit,
                join: loop_exit,
            },
            ctx,
        )?;
        let test_entry = match test {
            SubCfg::Diverging { .. } => return Ok(test),
            ref test => self.conditional_entry(cond, test)?,
        };
        if let SubCfg::Extracted { exit, .. } = body_sub {
            self.vertices.connect(exit, test_entry)?;
        }
        Ok(SubCfg::Extracted {
            entry: test_entry,
            exit: loop_exit,
            access,
        })
    }

    /// `return e`: store into the return layout and leave, in one final
    /// vertex.
    pub(super) fn generate_return(&mut self, value: Option<ExprId>, ctx: Context) -> Result<SubCfg> {
        let (prefix, access) = match value {
            None => (None, Layout::unit()),
            Some(value) => match self.generate(value, EvalMode::Value, ctx)? {
                SubCfg::Immediate(access) => (None, access),
                SubCfg::Extracted {
                    entry,
                    exit,
                    access,
                } => (Some((entry, exit)), access),
                diverging @ SubCfg::Diverging { .. } => return Ok(diverging),
            },
        };

        let ret = self.handler.return_layout()?;
        let store = self.assignment_node(&ret, access)?;
        let exit = self.vertices.add_final(Node::sequence([store, Node::Return]));
        let entry = match prefix {
            Some((entry, last)) => {
                self.vertices.connect(last, exit)?;
                entry
            }
            None => exit,
        };
        Ok(SubCfg::Diverging { entry })
    }

    pub(super) fn generate_break(&mut self, id: ExprId, ctx: Context) -> Result<SubCfg> {
        let loop_exit = ctx
            .loop_exit
            .ok_or(CfgError::BreakOutsideLoop { expr: id })?;
        Ok(SubCfg::Diverging { entry: loop_exit })
    }
}

//! Unary and binary operators.
//!
//! `&&` and `||` only evaluate their right operand when it can matter.
//! With a pure right operand that is unobservable, so they are emitted as
//! plain binary nodes; with an effectful one they become branches.

use kite_ir::{BinaryOp, ExprId, UnaryOp};

use crate::error::Result;
use crate::layout::Layout;
use crate::node::Node;
use crate::subcfg::{Context, EvalMode, SubCfg};

use super::Generator;

impl Generator<'_> {
    pub(super) fn generate_unary(
        &mut self,
        id: ExprId,
        op: UnaryOp,
        operand: ExprId,
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        match mode {
            EvalMode::Value => {
                let sub = self.generate(operand, EvalMode::Value, ctx)?;
                let (span, access) = match sub {
                    SubCfg::Immediate(access) => (None, access),
                    SubCfg::Extracted {
                        entry,
                        exit,
                        access,
                    } => (Some((entry, exit)), access),
                    diverging @ SubCfg::Diverging { .. } => return Ok(diverging),
                };
                let access = Layout::scalar(Node::unary(op, access.into_scalar()?));
                Ok(match span {
                    Some((entry, exit)) => SubCfg::Extracted {
                        entry,
                        exit,
                        access,
                    },
                    None => SubCfg::Immediate(access),
                })
            }
            EvalMode::SideEffect => self.generate(operand, mode, ctx),
            EvalMode::Conditional { .. } => match op {
                UnaryOp::Not => self.generate(operand, mode.negated(), ctx),
                UnaryOp::Neg => Err(self.not_conditional(id)),
            },
        }
    }

    pub(super) fn generate_binary(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        match mode {
            EvalMode::Value => self.binary_value(id, op, lhs, rhs, ctx),
            EvalMode::SideEffect => self.binary_effect(op, lhs, rhs, ctx),
            EvalMode::Conditional { .. } => self.binary_conditional(id, op, lhs, rhs, mode, ctx),
        }
    }

    fn binary_value(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        ctx: Context,
    ) -> Result<SubCfg> {
        if op.is_short_circuit() && self.effects.has_side_effects(rhs) {
            // Branch into one of two stores of the result.
            let dest = self.fresh_register();
            let on_true = self
                .vertices
                .add_unconditional(Node::assign(dest.clone(), Node::boolean(true)));
            let on_false = self
                .vertices
                .add_unconditional(Node::assign(dest.clone(), Node::boolean(false)));
            let join = self.vertices.add_unconditional(Node::NoOp);
            self.vertices.connect(on_true, join)?;
            self.vertices.connect(on_false, join)?;
            let mode = EvalMode::Conditional {
                on_true,
                on_false,
                join,
            };
            let test = self.binary_conditional(id, op, lhs, rhs, mode, ctx)?;
            if test.is_diverging() {
                return Ok(test);
            }
            return Ok(SubCfg::Extracted {
                entry: self.conditional_entry(id, &test)?,
                exit: join,
                access: Layout::scalar(dest),
            });
        }

        let first = self.generate(lhs, EvalMode::Value, ctx)?;
        let first = if self.effects.has_clashing_side_effects(lhs, rhs) {
            self.materialize(first)?
        } else {
            first
        };
        let second = self.generate(rhs, EvalMode::Value, ctx)?;
        self.combine_binary(op, first, second)
    }

    fn binary_effect(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        ctx: Context,
    ) -> Result<SubCfg> {
        if op.is_short_circuit() && self.effects.has_side_effects(rhs) {
            return self.short_circuit_effect(op, lhs, rhs, ctx);
        }

        let first = self.generate(lhs, EvalMode::SideEffect, ctx)?;
        let second = self.generate(rhs, EvalMode::SideEffect, ctx)?;
        if let (SubCfg::Immediate(a), SubCfg::Immediate(b)) = (&first, &second) {
            let effects = a.flatten().into_iter().chain(b.flatten()).cloned();
            return Ok(SubCfg::Immediate(Layout::scalar(Node::sequence(effects))));
        }
        let first = self.extract_effect(first)?;
        let second = self.extract_effect(second)?;
        self.merge(first, second)
    }

    /// `a && b` or `a || b` for its effects: only `a` is tested, and the
    /// branch that needs `b` runs its effects before the join.
    fn short_circuit_effect(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        ctx: Context,
    ) -> Result<SubCfg> {
        // The value of `a` for which `b` still runs.
        let runs_rhs = matches!(op, BinaryOp::And);
        if let Some(value) = self.constant_condition(lhs) {
            if value != runs_rhs {
                return Ok(SubCfg::Immediate(Layout::no_op()));
            }
            let second = self.generate(rhs, EvalMode::SideEffect, ctx)?;
            return self.extract_effect(second);
        }

        let join = self.vertices.add_unconditional(Node::NoOp);
        let second = self.generate(rhs, EvalMode::SideEffect, ctx)?;
        let target = match self.extract_effect(second)? {
            SubCfg::Extracted { entry, exit, .. } => {
                self.vertices.connect(exit, join)?;
                entry
            }
            SubCfg::Diverging { entry } => entry,
            SubCfg::Immediate(_) => join,
        };
        let mode = if runs_rhs {
            EvalMode::Conditional {
                on_true: target,
                on_false: join,
                join,
            }
        } else {
            EvalMode::Conditional {
                on_true: join,
                on_false: target,
                join,
            }
        };
        let test = self.generate(lhs, mode, ctx)?;
        if test.is_diverging() {
            return Ok(test);
        }
        Ok(SubCfg::Extracted {
            entry: self.conditional_entry(lhs, &test)?,
            exit: join,
            access: Layout::no_op(),
        })
    }

    fn binary_conditional(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        let EvalMode::Conditional {
            on_true,
            on_false,
            join,
        } = mode
        else {
            return Err(self.not_conditional(id));
        };
        let constant_lhs = self.constant_condition(lhs);
        let shortcut = |target| SubCfg::Extracted {
            entry: target,
            exit: join,
            access: Layout::no_op(),
        };

        match op {
            BinaryOp::And => match constant_lhs {
                Some(true) => self.generate(rhs, mode, ctx),
                Some(false) => Ok(shortcut(on_false)),
                None => {
                    let second = self.generate(rhs, mode, ctx)?;
                    let on_true = self.conditional_entry(rhs, &second)?;
                    let mode = EvalMode::Conditional {
                        on_true,
                        on_false,
                        join,
                    };
                    self.generate(lhs, mode, ctx)
                }
            },
            BinaryOp::Or => match constant_lhs {
                Some(true) => Ok(shortcut(on_true)),
                Some(false) => self.generate(rhs, mode, ctx),
                None => {
                    let second = self.generate(rhs, mode, ctx)?;
                    let on_false = self.conditional_entry(rhs, &second)?;
                    let mode = EvalMode::Conditional {
                        on_true,
                        on_false,
                        join,
                    };
                    self.generate(lhs, mode, ctx)
                }
            },
            _ if op.is_comparison() => {
                let value = self.binary_value(id, op, lhs, rhs, ctx)?;
                self.branch_on(id, value, mode)
            }
            _ => Err(self.not_conditional(id)),
        }
    }

    /// Combine two lowered operands, `first` running before `second`.
    pub(super) fn combine_binary(
        &mut self,
        op: BinaryOp,
        first: SubCfg,
        second: SubCfg,
    ) -> Result<SubCfg> {
        let (first_span, lhs) = match first {
            SubCfg::Immediate(access) => (None, access),
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => (Some((entry, exit)), access),
            diverging @ SubCfg::Diverging { .. } => return Ok(diverging),
        };
        let (second_span, rhs) = match second {
            SubCfg::Immediate(access) => (None, access),
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => (Some((entry, exit)), access),
            diverging @ SubCfg::Diverging { .. } => {
                let first = match first_span {
                    Some((entry, exit)) => SubCfg::Extracted {
                        entry,
                        exit,
                        access: lhs,
                    },
                    None => SubCfg::Immediate(lhs),
                };
                let first = self.extract_effect(first)?;
                return self.merge(first, diverging);
            }
        };

        let access = Layout::scalar(Node::binary(op, lhs.into_scalar()?, rhs.into_scalar()?));
        let span = match (first_span, second_span) {
            (None, None) => None,
            (Some(span), None) | (None, Some(span)) => Some(span),
            (Some((entry, middle)), Some((next, exit))) => {
                self.vertices.connect(middle, next)?;
                Some((entry, exit))
            }
        };
        Ok(match span {
            Some((entry, exit)) => SubCfg::Extracted {
                entry,
                exit,
                access,
            },
            None => SubCfg::Immediate(access),
        })
    }
}

#[cfg(test)]
mod tests;

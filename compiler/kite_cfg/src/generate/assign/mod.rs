//! Declarations and assignments.

use kite_ir::{AssignOp, ExprId, ExprKind, VarId};

use crate::error::{CfgError, Result};
use crate::layout::Layout;
use crate::node::Node;
use crate::subcfg::{Context, EvalMode, SubCfg};

use super::Generator;

impl Generator<'_> {
    pub(super) fn generate_let(
        &mut self,
        id: ExprId,
        var: VarId,
        init: ExprId,
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        if matches!(mode, EvalMode::Conditional { .. }) {
            return Err(self.not_conditional(id));
        }
        let dest = self.variable_access(var)?;
        let value = self.generate(init, EvalMode::Value, ctx)?;
        self.assign_value(id, &dest, value, mode, false)
    }

    pub(super) fn generate_assign(
        &mut self,
        id: ExprId,
        op: AssignOp,
        target: ExprId,
        value: ExprId,
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        if !matches!(self.program.kind(target), ExprKind::Var(_)) {
            return Err(CfgError::InvalidAssignmentTarget { expr: target });
        }
        let var = self.resolve_variable(target)?;
        let dest = self.variable_access(var)?;

        let value = match op.arithmetic() {
            None => self.generate(value, EvalMode::Value, ctx)?,
            Some(arithmetic) => {
                // `x op= e` reads `x` before `e` runs.
                let current = if self.effects.has_clashing_side_effects(target, value) {
                    self.materialize(SubCfg::Immediate(dest.clone()))?
                } else {
                    SubCfg::Immediate(dest.clone())
                };
                let rhs = self.generate(value, EvalMode::Value, ctx)?;
                self.combine_binary(arithmetic, current, rhs)?
            }
        };
        self.assign_value(id, &dest, value, mode, true)
    }

    /// Store a lowered value into `dest`.
    ///
    /// With `propagate` the assignment's own value is `dest` (an
    /// assignment expression); otherwise it is `()` (a declaration).
    fn assign_value(
        &mut self,
        id: ExprId,
        dest: &Layout,
        value: SubCfg,
        mode: EvalMode,
        propagate: bool,
    ) -> Result<SubCfg> {
        let (span, access) = match value {
            SubCfg::Immediate(access) => (None, access),
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => (Some((entry, exit)), access),
            diverging @ SubCfg::Diverging { .. } => return Ok(diverging),
        };
        let store = self.assignment_node(dest, access)?;

        // A single store with nothing before it stays inline.
        if span.is_none() && dest.as_scalar().is_some() {
            match mode {
                EvalMode::SideEffect => return Ok(SubCfg::Immediate(Layout::scalar(store))),
                EvalMode::Value if propagate => {
                    return Ok(SubCfg::Immediate(Layout::scalar(store)));
                }
                EvalMode::Value | EvalMode::Conditional { .. } => {}
            }
        }

        let v = self.vertices.add_unconditional(store);
        let entry = match span {
            Some((entry, exit)) => {
                self.vertices.connect(exit, v)?;
                entry
            }
            None => v,
        };
        if let EvalMode::Conditional { .. } = mode {
            let stored = SubCfg::Extracted {
                entry,
                exit: v,
                access: dest.clone(),
            };
            return self.branch_on(id, stored, mode);
        }
        let access = if propagate {
            dest.clone()
        } else {
            Self::discarded(mode)
        };
        Ok(SubCfg::Extracted {
            entry,
            exit: v,
            access,
        })
    }

    /// Copy `src` into `dest` slot by slot.
    ///
    /// Slots are paired in flatten order. If a later source reads a
    /// destination written earlier in the same copy, every slot goes
    /// through a fresh register first.
    pub(super) fn assignment_node(&mut self, dest: &Layout, src: Layout) -> Result<Node> {
        if !dest.same_shape(&src) {
            return Err(CfgError::ShapeMismatch {
                expected: dest.shape(),
                found: src.shape(),
            });
        }
        if let Layout::Scalar(dst) = dest {
            return Ok(Node::assign(dst.clone(), src.into_scalar()?));
        }

        let dst: Vec<Node> = dest.flatten().into_iter().cloned().collect();
        let src: Vec<Node> = src.flatten().into_iter().cloned().collect();
        let overlaps = src
            .iter()
            .enumerate()
            .any(|(i, slot)| dst[..i].iter().any(|written| slot.contains(written)));
        if !overlaps {
            return Ok(Node::sequence(
                dst.into_iter().zip(src).map(|(d, s)| Node::assign(d, s)),
            ));
        }

        let temps: Vec<Node> = src.iter().map(|_| self.fresh_register()).collect();
        let mut copies: Vec<Node> = temps
            .iter()
            .cloned()
            .zip(src)
            .map(|(t, s)| Node::assign(t, s))
            .collect();
        copies.extend(dst.into_iter().zip(temps).map(|(d, t)| Node::assign(d, t)));
        Ok(Node::sequence(copies))
    }
}

//! Struct literals and field access.

use kite_ir::ExprId;

use crate::error::Result;
use crate::layout::Layout;
use crate::subcfg::{Context, EvalMode, SubCfg};

use super::Generator;

impl Generator<'_> {
    pub(super) fn generate_struct(
        &mut self,
        id: ExprId,
        fields: &[(String, ExprId)],
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        match mode {
            EvalMode::Conditional { .. } => Err(self.not_conditional(id)),
            EvalMode::SideEffect => {
                let mut sub = SubCfg::Immediate(Layout::no_op());
                for &(_, value) in fields {
                    let next = self.generate(value, EvalMode::SideEffect, ctx)?;
                    let next = self.extract_effect(next)?;
                    sub = self.merge(sub, next)?;
                    if sub.is_diverging() {
                        break;
                    }
                }
                Ok(sub)
            }
            EvalMode::Value => {
                // Once any field has effects, every field is pinned in
                // evaluation order.
                let pin = fields
                    .iter()
                    .any(|&(_, value)| self.effects.has_side_effects(value));
                let mut prefix: Option<SubCfg> = None;
                let mut layouts = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    let sub = self.generate(*value, EvalMode::Value, ctx)?;
                    let sub = if pin { self.materialize(sub)? } else { sub };
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
                        diverging @ SubCfg::Diverging { .. } => {
                            return self.chain(prefix, diverging);
                        }
                    };
                    layouts.push((name.as_str(), access));
                }
                let value = SubCfg::Immediate(Layout::aggregate(layouts));
                self.chain(prefix, value)
            }
        }
    }

    pub(super) fn generate_field(
        &mut self,
        id: ExprId,
        receiver: ExprId,
        field: &str,
        mode: EvalMode,
        ctx: Context,
    ) -> Result<SubCfg> {
        if mode == EvalMode::SideEffect {
            return self.generate(receiver, mode, ctx);
        }
        let whole = self.generate(receiver, EvalMode::Value, ctx)?;
        // Stores into the other fields must still happen.
        let whole = if self.effects.has_side_effects(receiver) {
            self.materialize(whole)?
        } else {
            whole
        };
        let projected = match whole {
            SubCfg::Immediate(access) => SubCfg::Immediate(access.field(field)?.clone()),
            SubCfg::Extracted {
                entry,
                exit,
                access,
            } => SubCfg::Extracted {
                entry,
                exit,
                access: access.field(field)?.clone(),
            },
            diverging @ SubCfg::Diverging { .. } => return Ok(diverging),
        };
        match mode {
            EvalMode::Conditional { .. } => self.branch_on(id, projected, mode),
            EvalMode::Value | EvalMode::SideEffect => Ok(projected),
        }
    }
}

#[cfg(test)]
mod tests;

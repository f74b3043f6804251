//! Side-effect analysis.
//!
//! Answers two questions for the generator: does an expression have any
//! side effect at all (if not, side-effect-only lowering can drop it), and
//! may two expressions observably interfere (if so, the left one must be
//! fully evaluated before the right one starts).
//!
//! The analysis is conservative. Anything it cannot see through, such as
//! calls or an unresolved use, is treated as clashing; a false positive only
//! costs a forced sequencing, a false negative would reorder observable
//! effects.

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};

use kite_ir::{ExprId, ExprKind, NameResolution, Program, UseAnalysis, VarId};

use crate::stack::ensure_sufficient_stack;

bitflags! {
    /// Effects that are not attributed to a particular variable.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct EffectFlags: u8 {
        /// Contains a call (or something the analysis cannot see into).
        const OPAQUE = 1 << 0;
        /// Contains `return` or `break`.
        const CONTROL = 1 << 1;
        /// Contains a loop, which may not terminate.
        const LOOPS = 1 << 2;
    }
}

/// Summary of what evaluating an expression may do.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effects {
    pub reads: FxHashSet<VarId>,
    pub writes: FxHashSet<VarId>,
    pub flags: EffectFlags,
}

impl Effects {
    /// Reads alone are not side effects.
    pub fn has_side_effects(&self) -> bool {
        !self.writes.is_empty() || !self.flags.is_empty()
    }

    fn absorb(&mut self, other: &Effects) {
        self.reads.extend(&other.reads);
        self.writes.extend(&other.writes);
        self.flags |= other.flags;
    }

    fn touches(&self, var: VarId) -> bool {
        self.reads.contains(&var) || self.writes.contains(&var)
    }
}

/// Memoizing analyzer over one program.
pub struct SideEffectAnalyzer<'a> {
    program: &'a Program,
    names: &'a NameResolution,
    uses: &'a UseAnalysis,
    cache: FxHashMap<ExprId, Effects>,
}

impl<'a> SideEffectAnalyzer<'a> {
    pub fn new(program: &'a Program, names: &'a NameResolution, uses: &'a UseAnalysis) -> Self {
        Self {
            program,
            names,
            uses,
            cache: FxHashMap::default(),
        }
    }

    pub fn effects(&mut self, id: ExprId) -> &Effects {
        if !self.cache.contains_key(&id) {
            let effects = ensure_sufficient_stack(|| self.compute(id));
            self.cache.insert(id, effects);
        }
        &self.cache[&id]
    }

    pub fn has_side_effects(&mut self, id: ExprId) -> bool {
        self.effects(id).has_side_effects()
    }

    /// Whether evaluating `first` then `second` may differ observably from
    /// any other interleaving of the two.
    pub fn has_clashing_side_effects(&mut self, first: ExprId, second: ExprId) -> bool {
        self.effects(first);
        self.effects(second);
        let (a, b) = (&self.cache[&first], &self.cache[&second]);

        if a.flags.contains(EffectFlags::CONTROL) || b.flags.contains(EffectFlags::CONTROL) {
            return true;
        }
        if self.opaque_clash(a, b) || self.opaque_clash(b, a) {
            return true;
        }
        if (a.flags.contains(EffectFlags::LOOPS) && b.has_side_effects())
            || (b.flags.contains(EffectFlags::LOOPS) && a.has_side_effects())
        {
            return true;
        }
        a.writes.iter().any(|&v| b.touches(v)) || b.writes.iter().any(|&v| a.reads.contains(&v))
    }

    /// A call clashes with other calls, loops, and with any access to a
    /// variable a nested function could observe.
    fn opaque_clash(&self, call: &Effects, other: &Effects) -> bool {
        if !call.flags.contains(EffectFlags::OPAQUE) {
            return false;
        }
        other
            .flags
            .intersects(EffectFlags::OPAQUE | EffectFlags::LOOPS)
            || other
                .reads
                .iter()
                .chain(&other.writes)
                .any(|&v| self.uses.is_captured(self.program, v))
    }

    fn compute(&mut self, id: ExprId) -> Effects {
        let program = self.program;
        let mut out = Effects::default();
        let kind = program.kind(id);
        match kind {
            // Declaring a nested function runs nothing.
            ExprKind::Function(_) => return out,
            ExprKind::Var(_) => match self.names.variable(id) {
                Some(var) => {
                    out.reads.insert(var);
                }
                None => out.flags |= EffectFlags::OPAQUE,
            },
            ExprKind::Let { var, .. } => {
                out.writes.insert(*var);
            }
            ExprKind::Assign { op, target, value } => {
                match self.names.variable(*target) {
                    Some(var) => {
                        out.writes.insert(var);
                        if op.arithmetic().is_some() {
                            out.reads.insert(var);
                        }
                    }
                    None => out.flags |= EffectFlags::OPAQUE,
                }
                let value = self.effects(*value);
                out.absorb(value);
                return out;
            }
            ExprKind::Call { .. } => out.flags |= EffectFlags::OPAQUE,
            ExprKind::Return(_) | ExprKind::Break => out.flags |= EffectFlags::CONTROL,
            ExprKind::While { .. } => out.flags |= EffectFlags::LOOPS,
            ExprKind::Block(_)
            | ExprKind::Empty
            | ExprKind::Literal(_)
            | ExprKind::Unary { .. }
            | ExprKind::Binary { .. }
            | ExprKind::If { .. }
            | ExprKind::Struct(_)
            | ExprKind::Field { .. } => {}
        }
        for child in kind.children() {
            let effects = self.effects(child);
            out.absorb(effects);
        }
        out
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

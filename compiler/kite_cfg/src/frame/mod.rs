//! Reference stack-frame calling convention.
//!
//! An x86-64-flavoured convention for [`FunctionHandler`]:
//!
//! - Locals that no nested function touches live in virtual registers,
//!   numbered from 0 in declaration order.
//! - Captured locals live in the frame, addressed off `rbp`. Frame slot 0
//!   (`rbp - 8`) holds the static link, the frame pointer of the lexically
//!   enclosing function, which callers pass in `r10`.
//! - The first six argument slots travel in `rdi rsi rdx rcx r8 r9`; the
//!   rest are pushed right to left, padded so `rsp` stays 16-byte aligned,
//!   and popped by the caller after the call.
//! - Results come back in `rax rdx rcx rsi rdi r8 r9 r10 r11`.
//!
//! Aggregates occupy one slot per basic field, in layout flatten order.

use rustc_hash::FxHashMap;

use kite_ir::{BinaryOp, CompilationUnit, FunctionId, Type, VarId};

use crate::error::{CfgError, Result};
use crate::handler::{FunctionHandler, HandlerMap};
use crate::layout::Layout;
use crate::node::{Node, PhysicalRegister};

pub const ARGUMENT_REGISTERS: [PhysicalRegister; 6] = [
    PhysicalRegister::Rdi,
    PhysicalRegister::Rsi,
    PhysicalRegister::Rdx,
    PhysicalRegister::Rcx,
    PhysicalRegister::R8,
    PhysicalRegister::R9,
];

pub const RETURN_REGISTERS: [PhysicalRegister; 9] = [
    PhysicalRegister::Rax,
    PhysicalRegister::Rdx,
    PhysicalRegister::Rcx,
    PhysicalRegister::Rsi,
    PhysicalRegister::Rdi,
    PhysicalRegister::R8,
    PhysicalRegister::R9,
    PhysicalRegister::R10,
    PhysicalRegister::R11,
];

pub const STATIC_LINK_REGISTER: PhysicalRegister = PhysicalRegister::R10;

/// Bytes per storage slot.
pub const SLOT_SIZE: i64 = 8;

pub const STACK_ALIGNMENT: i64 = 16;

/// Offset of the first stack-passed argument from the callee's `rbp`
/// (saved `rbp` plus return address).
const INCOMING_STACK_OFFSET: i64 = 2 * SLOT_SIZE;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SlotHome {
    Register(u32),
    /// `offset` bytes below the frame pointer of the function at `depth`.
    Frame { depth: usize, offset: i64 },
}

#[derive(Clone, Debug)]
struct Home {
    ty: Type,
    slots: Vec<SlotHome>,
}

/// [`FunctionHandler`] of the reference convention.
#[derive(Debug)]
pub struct StackFrameHandler {
    function: FunctionId,
    label: String,
    depth: usize,
    params: Vec<VarId>,
    return_type: Type,
    /// Own variables plus frame-resident variables of enclosing functions.
    homes: FxHashMap<VarId, Home>,
    registers: u32,
    frame_slots: i64,
}

impl StackFrameHandler {
    /// Create handlers for every function of `unit`, keyed for the
    /// generator.
    pub fn build_all(unit: &CompilationUnit) -> HandlerMap {
        Self::build(unit)
            .into_iter()
            .map(|handler| {
                let boxed: Box<dyn FunctionHandler> = Box::new(handler);
                (boxed.function(), boxed)
            })
            .collect()
    }

    /// Create handlers for every function of `unit`, in function-id order.
    ///
    /// Enclosing functions must be declared before the functions nested in
    /// them, which [`kite_ir::ProgramBuilder`] guarantees.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "variable indices never exceed u32"
    )]
    pub fn build(unit: &CompilationUnit) -> Vec<StackFrameHandler> {
        let program = &unit.program;
        let mut built: Vec<StackFrameHandler> = Vec::with_capacity(program.functions.len());

        for function in program.function_ids() {
            let decl = program.function(function);
            let parent = decl.parent.and_then(|p| built.get(p.index()));
            let depth = program.depth(function);

            let label = match parent {
                Some(parent) => format!("{}.{}", parent.label, decl.name),
                None => decl.name.clone(),
            };
            let mut homes: FxHashMap<VarId, Home> = parent
                .map(|parent| {
                    parent
                        .homes
                        .iter()
                        .filter(|(_, home)| {
                            home.slots
                                .iter()
                                .all(|slot| matches!(slot, SlotHome::Frame { .. }))
                        })
                        .map(|(&var, home)| (var, home.clone()))
                        .collect()
                })
                .unwrap_or_default();

            let mut registers = 0;
            // Slot 0 is the static link.
            let mut frame_slots = 1;
            let owned = program
                .variables
                .iter()
                .enumerate()
                .filter(|(_, var)| var.owner == function);
            for (index, variable) in owned {
                let var = VarId::new(index as u32);
                let captured = unit.uses.is_captured(program, var);
                let slots = (0..variable.ty.slot_count())
                    .map(|_| {
                        if captured {
                            frame_slots += 1;
                            SlotHome::Frame {
                                depth,
                                offset: frame_slots * SLOT_SIZE,
                            }
                        } else {
                            registers += 1;
                            SlotHome::Register(registers - 1)
                        }
                    })
                    .collect();
                homes.insert(
                    var,
                    Home {
                        ty: variable.ty.clone(),
                        slots,
                    },
                );
            }

            tracing::trace!(%label, depth, registers, frame_slots, "built frame handler");
            built.push(StackFrameHandler {
                function,
                label,
                depth,
                params: decl.params.clone(),
                return_type: decl.return_type.clone(),
                homes,
                registers,
                frame_slots,
            });
        }

        built
    }

    /// Frame size in bytes, rounded up to the stack alignment.
    pub fn frame_size(&self) -> i64 {
        let bytes = self.frame_slots * SLOT_SIZE;
        (bytes + STACK_ALIGNMENT - 1) / STACK_ALIGNMENT * STACK_ALIGNMENT
    }

    fn slot_node(&self, slot: SlotHome) -> Node {
        match slot {
            SlotHome::Register(n) => Node::virtual_register(n),
            SlotHome::Frame { depth, offset } => {
                let fp = self.generate_frame_pointer(self.depth.saturating_sub(depth));
                Node::memory(Node::binary(BinaryOp::Sub, fp, Node::int(offset)))
            }
        }
    }
}

fn adjust_rsp(op: BinaryOp, bytes: i64) -> Node {
    let rsp = Node::physical(PhysicalRegister::Rsp);
    Node::assign(rsp.clone(), Node::binary(op, rsp, Node::int(bytes)))
}

impl FunctionHandler for StackFrameHandler {
    fn function(&self) -> FunctionId {
        self.function
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn generate_variable_access(&self, var: VarId) -> Result<Layout> {
        let home = self.homes.get(&var).ok_or(CfgError::VariableNotAccessible {
            var,
            function: self.function,
        })?;
        let mut slots = home.slots.iter();
        Ok(Layout::build(&home.ty, &mut || {
            slots.next().map_or(Node::NoOp, |&slot| self.slot_node(slot))
        }))
    }

    fn generate_frame_pointer(&self, levels: usize) -> Node {
        let mut fp = Node::physical(PhysicalRegister::Rbp);
        for _ in 0..levels {
            fp = Node::memory(Node::binary(BinaryOp::Sub, fp, Node::int(SLOT_SIZE)));
        }
        fp
    }

    fn generate_call(
        &self,
        caller: &dyn FunctionHandler,
        args: &[Layout],
        result: Option<&Layout>,
    ) -> Result<Vec<Node>> {
        let slots: Vec<&Node> = args.iter().flat_map(Layout::flatten).collect();
        let (in_registers, on_stack) = slots.split_at(slots.len().min(ARGUMENT_REGISTERS.len()));
        let mut nodes = Vec::with_capacity(slots.len() * 2 + 4);

        let mut pushed: i64 = 0;
        if on_stack.len() % 2 == 1 {
            nodes.push(adjust_rsp(BinaryOp::Sub, SLOT_SIZE));
            pushed += 1;
        }
        for &slot in on_stack.iter().rev() {
            nodes.push(adjust_rsp(BinaryOp::Sub, SLOT_SIZE));
            nodes.push(Node::assign(
                Node::memory(Node::physical(PhysicalRegister::Rsp)),
                slot.clone(),
            ));
            pushed += 1;
        }
        for (&reg, &slot) in ARGUMENT_REGISTERS.iter().zip(in_registers) {
            nodes.push(Node::assign(Node::physical(reg), slot.clone()));
        }

        if self.depth > 0 {
            let levels = (caller.depth() + 1).saturating_sub(self.depth);
            nodes.push(Node::assign(
                Node::physical(STATIC_LINK_REGISTER),
                caller.generate_frame_pointer(levels),
            ));
        }

        nodes.push(Node::call(self.label.as_str()));
        if pushed > 0 {
            nodes.push(adjust_rsp(BinaryOp::Add, pushed * SLOT_SIZE));
        }

        if let Some(result) = result {
            let slots = result.flatten();
            if slots.len() > RETURN_REGISTERS.len() {
                return Err(CfgError::UnsupportedLayout {
                    slots: slots.len(),
                    available: RETURN_REGISTERS.len(),
                });
            }
            for (slot, &reg) in slots.into_iter().zip(&RETURN_REGISTERS) {
                nodes.push(Node::assign(slot.clone(), Node::physical(reg)));
            }
        }

        Ok(nodes)
    }

    #[expect(
        clippy::cast_possible_wrap,
        reason = "argument slot counts are far below i64::MAX"
    )]
    fn generate_prologue(&self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        if self.depth > 0 {
            let link = Node::memory(Node::binary(
                BinaryOp::Sub,
                Node::physical(PhysicalRegister::Rbp),
                Node::int(SLOT_SIZE),
            ));
            nodes.push(Node::assign(link, Node::physical(STATIC_LINK_REGISTER)));
        }

        let mut slots = Vec::new();
        for &param in &self.params {
            let layout = self.generate_variable_access(param)?;
            slots.extend(layout.flatten().into_iter().cloned());
        }
        for (index, slot) in slots.into_iter().enumerate() {
            let source = match ARGUMENT_REGISTERS.get(index) {
                Some(&reg) => Node::physical(reg),
                None => {
                    let stack_index = (index - ARGUMENT_REGISTERS.len()) as i64;
                    Node::memory(Node::binary(
                        BinaryOp::Add,
                        Node::physical(PhysicalRegister::Rbp),
                        Node::int(INCOMING_STACK_OFFSET + stack_index * SLOT_SIZE),
                    ))
                }
            };
            nodes.push(Node::assign(slot, source));
        }
        Ok(nodes)
    }

    fn return_layout(&self) -> Result<Layout> {
        let slots = self.return_type.slot_count();
        if slots > RETURN_REGISTERS.len() {
            return Err(CfgError::UnsupportedLayout {
                slots,
                available: RETURN_REGISTERS.len(),
            });
        }
        let mut registers = RETURN_REGISTERS.iter();
        Ok(Layout::build(&self.return_type, &mut || {
            registers.next().map_or(Node::NoOp, |&reg| Node::physical(reg))
        }))
    }

    fn reserved_registers(&self) -> u32 {
        self.registers
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

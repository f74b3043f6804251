//! Low-level operation trees carried by CFG vertices.
//!
//! A [`Node`] is a small expression tree over registers, memory and
//! constants. Instruction selection later pattern-matches these trees, so
//! generation keeps them as deep as evaluation order allows instead of
//! splitting every operation into its own vertex.
//!
//! Control transfer is not part of the node vocabulary: jumps and two-way
//! branches are expressed by the kind of vertex a node is attached to, and
//! only the function exit is a node ([`Node::Return`]).

use std::fmt;

use kite_ir::{BinaryOp, UnaryOp};

/// Machine registers of the reference x86-64 convention.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum PhysicalRegister {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl PhysicalRegister {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rax => "rax",
            Self::Rbx => "rbx",
            Self::Rcx => "rcx",
            Self::Rdx => "rdx",
            Self::Rsi => "rsi",
            Self::Rdi => "rdi",
            Self::Rbp => "rbp",
            Self::Rsp => "rsp",
            Self::R8 => "r8",
            Self::R9 => "r9",
            Self::R10 => "r10",
            Self::R11 => "r11",
            Self::R12 => "r12",
            Self::R13 => "r13",
            Self::R14 => "r14",
            Self::R15 => "r15",
        }
    }
}

/// A register operand: either a fresh virtual register minted during
/// generation, or a fixed machine register.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Register {
    Virtual(u32),
    Physical(PhysicalRegister),
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Virtual(n) => write!(f, "v{n}"),
            Self::Physical(reg) => f.write_str(reg.name()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Constant {
    Int(i64),
    Bool(bool),
    Unit,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    /// Does nothing; the placeholder access of side-effect-only lowering.
    NoOp,
    Constant(Constant),
    Register(Register),
    /// Memory cell at the address computed by the inner node.
    Memory(Box<Node>),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    /// Store `src` into `dst`; evaluates to the stored value.
    Assignment {
        dst: Box<Node>,
        src: Box<Node>,
    },
    /// Transfer to a function label; arguments and results travel through
    /// the registers and stack slots set up by surrounding nodes.
    Call {
        target: String,
    },
    /// Evaluate nodes in order.
    Sequence(Vec<Node>),
    /// Leave the current function.
    Return,
}

impl Node {
    pub fn int(value: i64) -> Self {
        Self::Constant(Constant::Int(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::Constant(Constant::Bool(value))
    }

    pub fn unit() -> Self {
        Self::Constant(Constant::Unit)
    }

    pub fn virtual_register(n: u32) -> Self {
        Self::Register(Register::Virtual(n))
    }

    pub fn physical(reg: PhysicalRegister) -> Self {
        Self::Register(Register::Physical(reg))
    }

    pub fn memory(address: Node) -> Self {
        Self::Memory(Box::new(address))
    }

    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn assign(dst: Node, src: Node) -> Self {
        Self::Assignment {
            dst: Box::new(dst),
            src: Box::new(src),
        }
    }

    pub fn call(target: impl Into<String>) -> Self {
        Self::Call {
            target: target.into(),
        }
    }

    /// Build a sequence, dropping `NoOp`s and splicing nested sequences.
    /// Collapses to the single element, or to `NoOp` when empty.
    pub fn sequence(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut flat = Vec::new();
        for node in nodes {
            match node {
                Self::NoOp => {}
                Self::Sequence(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::NoOp,
            1 => flat.pop().unwrap_or(Self::NoOp),
            _ => Self::Sequence(flat),
        }
    }

    pub fn is_no_op(&self) -> bool {
        matches!(self, Self::NoOp)
    }

    /// Whether evaluating this tree writes storage or transfers control.
    pub fn has_effect(&self) -> bool {
        match self {
            Self::Assignment { .. } | Self::Call { .. } | Self::Return => true,
            Self::Memory(inner) | Self::Unary { operand: inner, .. } => inner.has_effect(),
            Self::Binary { lhs, rhs, .. } => lhs.has_effect() || rhs.has_effect(),
            Self::Sequence(nodes) => nodes.iter().any(Node::has_effect),
            Self::NoOp | Self::Constant(_) | Self::Register(_) => false,
        }
    }

    /// Whether `needle` occurs anywhere in this tree (including the root).
    pub fn contains(&self, needle: &Node) -> bool {
        if self == needle {
            return true;
        }
        match self {
            Self::Memory(inner) | Self::Unary { operand: inner, .. } => inner.contains(needle),
            Self::Binary { lhs, rhs, .. } => lhs.contains(needle) || rhs.contains(needle),
            Self::Assignment { dst, src } => dst.contains(needle) || src.contains(needle),
            Self::Sequence(nodes) => nodes.iter().any(|n| n.contains(needle)),
            Self::NoOp | Self::Constant(_) | Self::Register(_) | Self::Call { .. } | Self::Return => {
                false
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => f.write_str("nop"),
            Self::Constant(Constant::Int(n)) => write!(f, "{n}"),
            Self::Constant(Constant::Bool(b)) => write!(f, "{b}"),
            Self::Constant(Constant::Unit) => f.write_str("()"),
            Self::Register(reg) => write!(f, "{reg}"),
            Self::Memory(address) => write!(f, "[{address}]"),
            Self::Unary { op, operand } => write!(f, "{}{operand}", op.as_symbol()),
            Self::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.as_symbol()),
            Self::Assignment { dst, src } => write!(f, "{dst} <- {src}"),
            Self::Call { target } => write!(f, "call {target}"),
            Self::Sequence(nodes) => {
                f.write_str("{")?;
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{node}")?;
                }
                f.write_str("}")
            }
            Self::Return => f.write_str("ret"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sequence_drops_no_ops_and_collapses() {
        assert_eq!(Node::sequence([Node::NoOp, Node::NoOp]), Node::NoOp);
        assert_eq!(Node::sequence([Node::NoOp, Node::Return]), Node::Return);
        assert_eq!(
            Node::sequence([
                Node::Sequence(vec![Node::int(1), Node::int(2)]),
                Node::NoOp,
                Node::Return,
            ]),
            Node::Sequence(vec![Node::int(1), Node::int(2), Node::Return])
        );
    }

    #[test]
    fn contains_searches_subtrees() {
        let x = Node::virtual_register(0);
        let tree = Node::binary(
            BinaryOp::Add,
            Node::int(1),
            Node::memory(Node::binary(BinaryOp::Sub, x.clone(), Node::int(8))),
        );
        assert!(tree.contains(&x));
        assert!(!tree.contains(&Node::virtual_register(1)));
    }

    #[test]
    fn effects_are_found_in_subtrees() {
        let store = Node::assign(Node::virtual_register(0), Node::int(2));
        assert!(Node::binary(BinaryOp::Add, Node::int(1), store).has_effect());
        assert!(!Node::unary(UnaryOp::Neg, Node::virtual_register(0)).has_effect());
        assert!(Node::call("g").has_effect());
    }

    #[test]
    fn display_is_readable() {
        let node = Node::assign(
            Node::physical(PhysicalRegister::Rax),
            Node::binary(BinaryOp::Add, Node::int(1), Node::virtual_register(3)),
        );
        assert_eq!(node.to_string(), "rax <- (1 + v3)");
        assert_eq!(
            Node::sequence([Node::call("f"), Node::Return]).to_string(),
            "{call f; ret}"
        );
    }
}

//! Physical shapes of source-level values.
//!
//! A [`Layout`] is either one storage slot or a named-field aggregate of
//! layouts. Aggregates keep their fields in a `BTreeMap`, so the slot order
//! produced by [`Layout::flatten`] is depth-first and sorted by field name
//! no matter in which order fields were written. Calling conventions and
//! multi-slot assignment both rely on that order to pair slots by position.

use std::collections::BTreeMap;
use std::fmt;

use kite_ir::Type;

use crate::error::{CfgError, Result};
use crate::node::Node;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    Scalar(Node),
    Aggregate(BTreeMap<String, Layout>),
}

impl Layout {
    pub fn scalar(node: Node) -> Self {
        Self::Scalar(node)
    }

    /// Placeholder access of side-effect-only lowering.
    pub fn no_op() -> Self {
        Self::Scalar(Node::NoOp)
    }

    pub fn unit() -> Self {
        Self::Scalar(Node::unit())
    }

    pub fn aggregate<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Layout)>,
        S: Into<String>,
    {
        Self::Aggregate(fields.into_iter().map(|(n, l)| (n.into(), l)).collect())
    }

    /// Build a layout of shape `ty`, drawing one slot per basic field from
    /// `slot` in flatten order.
    pub fn build(ty: &Type, slot: &mut impl FnMut() -> Node) -> Self {
        match ty {
            Type::Struct(st) => Self::Aggregate(
                st.fields
                    .iter()
                    .map(|(name, field)| (name.clone(), Self::build(field, slot)))
                    .collect(),
            ),
            Type::Unit | Type::Bool | Type::Int => Self::Scalar(slot()),
        }
    }

    /// Slots in canonical order: depth-first, fields sorted by name.
    pub fn flatten(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a Node>) {
        match self {
            Self::Scalar(node) => out.push(node),
            Self::Aggregate(fields) => {
                for layout in fields.values() {
                    layout.flatten_into(out);
                }
            }
        }
    }

    pub fn slot_count(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Aggregate(fields) => fields.values().map(Layout::slot_count).sum(),
        }
    }

    /// Whether this layout can hold a value of type `ty`.
    pub fn matches_type(&self, ty: &Type) -> bool {
        match (self, ty) {
            (Self::Scalar(_), ty) => ty.is_basic(),
            (Self::Aggregate(fields), Type::Struct(st)) => {
                fields.len() == st.fields.len()
                    && fields.iter().all(|(name, layout)| {
                        st.field(name).is_some_and(|field| layout.matches_type(field))
                    })
            }
            (Self::Aggregate(_), _) => false,
        }
    }

    /// Same shape: both scalar, or aggregates with the same field names
    /// whose fields have the same shape.
    pub fn same_shape(&self, other: &Layout) -> bool {
        match (self, other) {
            (Self::Scalar(_), Self::Scalar(_)) => true,
            (Self::Aggregate(a), Self::Aggregate(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((na, la), (nb, lb))| na == nb && la.same_shape(lb))
            }
            _ => false,
        }
    }

    pub fn field(&self, name: &str) -> Result<&Layout> {
        match self {
            Self::Aggregate(fields) => fields.get(name).ok_or_else(|| CfgError::UnknownField {
                field: name.to_owned(),
            }),
            Self::Scalar(_) => Err(CfgError::UnknownField {
                field: name.to_owned(),
            }),
        }
    }

    pub fn as_scalar(&self) -> Option<&Node> {
        match self {
            Self::Scalar(node) => Some(node),
            Self::Aggregate(_) => None,
        }
    }

    pub fn into_scalar(self) -> Result<Node> {
        match self {
            Self::Scalar(node) => Ok(node),
            Self::Aggregate(_) => Err(CfgError::NotScalar),
        }
    }

    /// Apply `f` to every slot, keeping the shape.
    pub fn map(self, f: &mut impl FnMut(Node) -> Node) -> Self {
        match self {
            Self::Scalar(node) => Self::Scalar(f(node)),
            Self::Aggregate(fields) => Self::Aggregate(
                fields
                    .into_iter()
                    .map(|(name, layout)| (name, layout.map(f)))
                    .collect(),
            ),
        }
    }

    /// Shape description for diagnostics, e.g. `{a: _, b: {c: _}}`.
    pub fn shape(&self) -> String {
        match self {
            Self::Scalar(_) => "_".to_owned(),
            Self::Aggregate(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|(name, layout)| format!("{name}: {}", layout.shape()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(node) => write!(f, "{node}"),
            Self::Aggregate(fields) => {
                f.write_str("{")?;
                for (i, (name, layout)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {layout}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// Tests

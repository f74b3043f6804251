//! Static types, as computed by the (upstream) type checker.
//!
//! Types are structural: two struct types are the same type iff they have
//! the same field names with the same field types. Field order carries no
//! meaning, so fields are stored sorted by name.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::ids::ExprId;

/// A static type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    Unit,
    Bool,
    Int,
    Struct(StructType),
}

impl Type {
    /// Basic (non-structural) types occupy exactly one storage slot.
    pub fn is_basic(&self) -> bool {
        !matches!(self, Self::Struct(_))
    }

    /// Build a struct type from `(name, type)` pairs in any order.
    pub fn structure<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        Self::Struct(StructType {
            fields: fields.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        })
    }

    /// Number of storage slots a value of this type occupies.
    pub fn slot_count(&self) -> usize {
        match self {
            Self::Unit | Self::Bool | Self::Int => 1,
            Self::Struct(st) => st.fields.values().map(Type::slot_count).sum(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("unit"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Struct(st) => {
                f.write_str("{")?;
                for (i, (name, ty)) in st.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Field set of a structural type, sorted by field name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct StructType {
    pub fields: BTreeMap<String, Type>,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&Type> {
        self.fields.get(name)
    }
}

/// Static type of every expression.
#[derive(Clone, Default, Debug)]
pub struct TypeTable {
    types: FxHashMap<ExprId, Type>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, expr: ExprId, ty: Type) {
        self.types.insert(expr, ty);
    }

    pub fn get(&self, expr: ExprId) -> Option<&Type> {
        self.types.get(&expr)
    }
}

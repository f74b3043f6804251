//! Index newtypes for front-end entities.
//!
//! Every id is a dense `u32` index into the arena that owns the entity
//! ([`ExprArena`](crate::ExprArena) for expressions, [`Program`](crate::Program)
//! for variables and functions). Ids are only meaningful together with the
//! program that minted them.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw `u32` value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Get the index as `usize` (for indexing into `Vec`s).
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Expression id within an [`ExprArena`](crate::ExprArena).
    ExprId,
    "e"
);

define_id!(
    /// Variable declaration id (parameters and `let` bindings alike).
    VarId,
    "var"
);

define_id!(
    /// Function declaration id. Nested functions get their own id.
    FunctionId,
    "fn"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_raw_and_index() {
        let id = ExprId::new(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(ExprId::new(3).to_string(), "e3");
        assert_eq!(VarId::new(0).to_string(), "var0");
        assert_eq!(FunctionId::new(12).to_string(), "fn12");
    }
}

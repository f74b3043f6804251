//! Control flow graph generation for Kite.
//!
//! This crate lowers the typed, name-resolved trees of [`kite_ir`] into
//! per-function control flow graphs of low-level [`Node`] trees, ready
//! for instruction selection and register allocation.
//!
//! # Architecture
//!
//! - [`Layout`]: the storage shape of a value (one slot, or named fields)
//! - [`VertexTable`]: vertices under construction, with write-once
//!   successor slots, frozen into an immutable [`CfgFragment`]
//! - [`SideEffectAnalyzer`]: decides which sub-expressions must keep their
//!   source order
//! - [`Generator`]: the recursive lowering, driven by [`EvalMode`]
//! - [`FunctionHandler`]: calling convention and variable storage, with
//!   [`StackFrameHandler`] as the reference implementation
//!
//! # Usage
//!
//! ```ignore
//! let handlers = StackFrameHandler::build_all(&unit);
//! let cfg = generate_program(&unit, &handlers)?;
//! ```

#[cfg(feature = "cache")]
pub mod cache;
mod effects;
mod error;
mod frame;
mod generate;
pub mod graph;
mod handler;
mod layout;
mod node;
mod stack;
mod subcfg;
#[cfg(test)]
mod test_helpers;
mod vertex;

use std::sync::Once;

pub use effects::{EffectFlags, Effects, SideEffectAnalyzer};
pub use error::{CfgError, Result};
pub use frame::{
    StackFrameHandler, ARGUMENT_REGISTERS, RETURN_REGISTERS, SLOT_SIZE, STACK_ALIGNMENT,
    STATIC_LINK_REGISTER,
};
pub use generate::{
    generate_function, generate_program, generate_program_parallel, Generator, ProgramCfg,
};
pub use handler::{FunctionHandler, HandlerMap};
pub use layout::Layout;
pub use node::{Constant, Node, PhysicalRegister, Register};
pub use subcfg::{Context, EvalMode, SubCfg};
pub use vertex::{CfgFragment, Label, Vertex, VertexTable};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for generator diagnostics.
///
/// Reads `RUST_LOG` for filtering, e.g. `RUST_LOG=kite_cfg=trace`. Does
/// nothing when `RUST_LOG` is unset; safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

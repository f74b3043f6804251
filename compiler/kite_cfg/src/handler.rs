//! The per-function calling-convention and storage collaborator.

use rustc_hash::FxHashMap;

use kite_ir::{FunctionId, VarId};

use crate::error::Result;
use crate::layout::Layout;
use crate::node::Node;

/// Storage and calling convention of one function.
///
/// The generator never inspects convention details: it asks the current
/// function's handler where variables live and hands the callee's handler
/// ordered argument accesses plus an optional result destination.
pub trait FunctionHandler: Send + Sync {
    fn function(&self) -> FunctionId;

    /// Symbol the function is called through.
    fn label(&self) -> &str;

    /// Static nesting depth: 0 for top-level functions.
    fn depth(&self) -> usize;

    /// Storage of `var` as seen from this function, walking static links
    /// for variables of enclosing functions.
    fn generate_variable_access(&self, var: VarId) -> Result<Layout>;

    /// Frame pointer of the function `levels` static levels out from this
    /// one (`0` is this function's own frame).
    fn generate_frame_pointer(&self, levels: usize) -> Node;

    /// Full call sequence for calling this function from `caller`:
    /// argument moves, stack adjustment, static link, the call itself and
    /// result extraction into `result`.
    fn generate_call(
        &self,
        caller: &dyn FunctionHandler,
        args: &[Layout],
        result: Option<&Layout>,
    ) -> Result<Vec<Node>>;

    /// Moves from incoming argument locations into parameter storage.
    fn generate_prologue(&self) -> Result<Vec<Node>>;

    /// Where the function leaves its result.
    fn return_layout(&self) -> Result<Layout>;

    /// Virtual registers `0..n` are taken by variables; fresh registers
    /// start at `n`.
    fn reserved_registers(&self) -> u32;
}

pub type HandlerMap = FxHashMap<FunctionId, Box<dyn FunctionHandler>>;

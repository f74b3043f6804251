//! Shared fixtures for generator tests.

use kite_ir::{CompilationUnit, ExprId, FunctionId, ProgramBuilder, Type, VarId};

use crate::error::Result;
use crate::frame::StackFrameHandler;
use crate::generate::generate_function;
use crate::vertex::CfgFragment;

/// Generate `function` with stack-frame handlers for the whole unit.
pub(crate) fn lower(unit: &CompilationUnit, function: FunctionId) -> Result<CfgFragment> {
    let handlers = StackFrameHandler::build_all(unit);
    generate_function(unit, &handlers, function)
}

/// Build and generate a single top-level function `f`.
pub(crate) fn lower_fn<F>(params: &[(&str, Type)], return_type: Type, body: F) -> Result<CfgFragment>
where
    F: FnOnce(&mut ProgramBuilder, &[VarId]) -> ExprId,
{
    let mut b = ProgramBuilder::new();
    let f = b.function("f", params, return_type, body);
    lower(&b.finish(), f)
}

/// [`lower_fn`] without parameters.
pub(crate) fn lower_body<F>(return_type: Type, body: F) -> Result<CfgFragment>
where
    F: FnOnce(&mut ProgramBuilder) -> ExprId,
{
    lower_fn(&[], return_type, |b, _| body(b))
}

/// Dump of a generated fragment, or the error it failed with.
pub(crate) fn dump(result: Result<CfgFragment>) -> String {
    match result {
        Ok(fragment) => fragment.to_string(),
        Err(err) => format!("error: {err}"),
    }
}

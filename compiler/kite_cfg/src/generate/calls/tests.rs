use pretty_assertions::assert_eq;

use kite_ir::{FunctionId, ProgramBuilder, Type};

use crate::error::CfgError;
use crate::frame::StackFrameHandler;
use crate::generate::generate_function;
use crate::test_helpers::{dump, lower};

/// `g(x, y) => x`, `h() => 1` and `p() => true`, plus `f` built by `body`.
fn with_callees<F>(return_type: Type, body: F) -> (kite_ir::CompilationUnit, FunctionId)
where
    F: FnOnce(&mut ProgramBuilder, [FunctionId; 3]) -> kite_ir::ExprId,
{
    let mut b = ProgramBuilder::new();
    let g = b.function(
        "g",
        &[("x", Type::Int), ("y", Type::Int)],
        Type::Int,
        |b, params| b.var(params[0]),
    );
    let h = b.function("h", &[], Type::Int, |b, _| b.int(1));
    let p = b.function("p", &[], Type::Bool, |b, _| b.boolean(true));
    let f = b.function("f", &[], return_type, |b, _| body(b, [g, h, p]));
    (b.finish(), f)
}

// ── Arguments and results ───────────────────────────────

#[test]
fn constant_arguments_go_straight_to_registers() {
    let (unit, f) = with_callees(Type::Int, |b, [g, _, _]| {
        let one = b.int(1);
        let two = b.int(2);
        b.call(g, vec![one, two])
    });
    assert_eq!(
        dump(lower(&unit, f)),
        "entry L0\n\
         L0: {rdi <- 1; rsi <- 2; call g; v0 <- rax} -> L1\n\
         L1: rax <- v0 -> L2\n\
         L2: ret\n"
    );
}

#[test]
fn opaque_arguments_run_in_order() {
    let (unit, f) = with_callees(Type::Int, |b, [g, h, _]| {
        let first = b.call(h, vec![]);
        let second = b.call(h, vec![]);
        b.call(g, vec![first, second])
    });
    assert_eq!(
        dump(lower(&unit, f)),
        "entry L0\n\
         L0: {call h; v0 <- rax} -> L1\n\
         L1: {call h; v1 <- rax} -> L2\n\
         L2: {rdi <- v0; rsi <- v1; call g; v2 <- rax} -> L3\n\
         L3: rax <- v2 -> L4\n\
         L4: ret\n"
    );
}

#[test]
fn discarded_result_is_not_read() {
    let (unit, f) = with_callees(Type::Unit, |b, [_, h, _]| {
        let call = b.call(h, vec![]);
        let done = b.empty();
        b.block(vec![call, done])
    });
    assert_eq!(
        dump(lower(&unit, f)),
        "entry L0\nL0: call h -> L1\nL1: rax <- () -> L2\nL2: ret\n"
    );
}

#[test]
fn call_as_condition() {
    let (unit, f) = with_callees(Type::Int, |b, [_, _, p]| {
        let cond = b.call(p, vec![]);
        let one = b.int(1);
        let two = b.int(2);
        b.if_(cond, one, Some(two))
    });
    assert_eq!(
        dump(lower(&unit, f)),
        "entry L3\n\
         L0: v0 <- 1 -> L2\n\
         L1: v0 <- 2 -> L2\n\
         L2: nop -> L5\n\
         L3: {call p; v1 <- rax} -> L4\n\
         L4: if v1 then L0 else L1\n\
         L5: rax <- v0 -> L6\n\
         L6: ret\n"
    );
}

// ── Nested callees ──────────────────────────────────────

fn nested_call() -> (kite_ir::CompilationUnit, FunctionId, FunctionId) {
    let mut b = ProgramBuilder::new();
    let mut inner = None;
    let f = b.function("f", &[], Type::Int, |b, _| {
        let g = b.function("g", &[], Type::Int, |b, _| b.int(1));
        inner = Some(g);
        let decl = b.fn_decl(g);
        let call = b.call(g, vec![]);
        b.block(vec![decl, call])
    });
    (b.finish(), f, inner.unwrap())
}

#[test]
fn nested_callee_receives_static_link() {
    let (unit, f, _) = nested_call();
    assert_eq!(
        dump(lower(&unit, f)),
        "entry L0\n\
         L0: {r10 <- rbp; call f.g; v0 <- rax} -> L1\n\
         L1: rax <- v0 -> L2\n\
         L2: ret\n"
    );
}

#[test]
fn callee_without_handler_is_reported() {
    let (unit, f, g) = nested_call();
    let mut handlers = StackFrameHandler::build_all(&unit);
    handlers.remove(&g);
    assert_eq!(
        generate_function(&unit, &handlers, f),
        Err(CfgError::MissingHandler { function: g })
    );
}

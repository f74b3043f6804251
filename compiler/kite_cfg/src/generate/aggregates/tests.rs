use pretty_assertions::assert_eq;

use kite_ir::{ProgramBuilder, Type};

use crate::error::CfgError;
use crate::test_helpers::{dump, lower, lower_body};

fn pair() -> Type {
    Type::structure([("a", Type::Int), ("b", Type::Int)])
}

// ── Struct literals ─────────────────────────────────────

#[test]
fn struct_result_fills_return_registers_in_field_order() {
    let ty = Type::structure([("a", Type::Int), ("b", Type::Bool)]);
    let cfg = lower_body(ty, |b| {
        let yes = b.boolean(true);
        let one = b.int(1);
        b.struct_(vec![("b", yes), ("a", one)])
    });
    assert_eq!(
        dump(cfg),
        "entry L0\nL0: {rax <- 1; rdx <- true} -> L1\nL1: ret\n"
    );
}

#[test]
fn effectful_field_pins_every_field() {
    let mut b = ProgramBuilder::new();
    let h = b.function("h", &[], Type::Int, |b, _| b.int(1));
    let f = b.function("f", &[], pair(), |b, _| {
        let call = b.call(h, vec![]);
        let two = b.int(2);
        b.struct_(vec![("a", call), ("b", two)])
    });
    assert_eq!(
        dump(lower(&b.finish(), f)),
        "entry L0\n\
         L0: {call h; v0 <- rax} -> L1\n\
         L1: v1 <- 2 -> L2\n\
         L2: {rax <- v0; rdx <- v1} -> L3\n\
         L3: ret\n"
    );
}

#[test]
fn struct_is_not_a_condition() {
    let cfg = lower_body(Type::Int, |b| {
        let yes = b.boolean(true);
        let cond = b.struct_(vec![("a", yes)]);
        let one = b.int(1);
        let two = b.int(2);
        b.if_(cond, one, Some(two))
    });
    assert!(matches!(
        cfg,
        Err(CfgError::NotConditional {
            kind: "struct literal",
            ..
        })
    ));
}

// ── Field access ────────────────────────────────────────

#[test]
fn field_projects_the_variable_layout() {
    let cfg = lower_body(Type::Int, |b| {
        let one = b.int(1);
        let two = b.int(2);
        let init = b.struct_(vec![("a", one), ("b", two)]);
        let (p, decl) = b.let_("p", pair(), init);
        let read = b.var(p);
        let field = b.field(read, "b");
        b.block(vec![decl, field])
    });
    assert_eq!(
        dump(cfg),
        "entry L0\n\
         L0: {v0 <- 1; v1 <- 2} -> L1\n\
         L1: rax <- v1 -> L2\n\
         L2: ret\n"
    );
}

#[test]
fn boolean_field_as_condition() {
    let cfg = lower_body(Type::Int, |b| {
        let yes = b.boolean(true);
        let init = b.struct_(vec![("ok", yes)]);
        let ty = Type::structure([("ok", Type::Bool)]);
        let (s, decl) = b.let_("s", ty, init);
        let read = b.var(s);
        let cond = b.field(read, "ok");
        let one = b.int(1);
        let two = b.int(2);
        let choice = b.if_(cond, one, Some(two));
        b.block(vec![decl, choice])
    });
    assert_eq!(
        dump(cfg),
        "entry L0\n\
         L0: v0 <- true -> L4\n\
         L1: v1 <- 1 -> L3\n\
         L2: v1 <- 2 -> L3\n\
         L3: nop -> L5\n\
         L4: if v0 then L1 else L2\n\
         L5: rax <- v1 -> L6\n\
         L6: ret\n"
    );
}

#[test]
fn unknown_field_is_reported() {
    let cfg = lower_body(Type::Int, |b| {
        let one = b.int(1);
        let init = b.struct_(vec![("a", one)]);
        let ty = Type::structure([("a", Type::Int)]);
        let (p, decl) = b.let_("p", ty, init);
        let read = b.var(p);
        let field = b.field(read, "c");
        b.block(vec![decl, field])
    });
    assert_eq!(
        cfg,
        Err(CfgError::UnknownField {
            field: "c".to_owned()
        })
    );
}

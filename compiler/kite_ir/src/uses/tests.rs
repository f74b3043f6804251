use pretty_assertions::assert_eq;

use crate::{AssignOp, ProgramBuilder, Type};

use super::UseFlags;

// ── Local uses ──────────────────────────────────────────

#[test]
fn locals_record_reads_and_writes() {
    // f(a) => (let x = a; x += 1; x)
    let mut b = ProgramBuilder::new();
    let mut x = None;
    let f = b.function("f", &[("a", Type::Int)], Type::Int, |b, params| {
        let a = b.var(params[0]);
        let (xv, decl) = b.let_("x", Type::Int, a);
        let one = b.int(1);
        let inc = b.assign_op(AssignOp::Add, xv, one);
        let read = b.var(xv);
        x = Some(xv);
        b.block(vec![decl, inc, read])
    });
    let unit = b.finish();
    let x = x.unwrap();
    let a = unit.program.function(f).params[0];

    assert_eq!(
        unit.uses.flags(f, x),
        UseFlags::READ | UseFlags::WRITE
    );
    assert_eq!(unit.uses.flags(f, a), UseFlags::READ | UseFlags::WRITE);
    assert!(!unit.uses.is_captured(&unit.program, x));
}

#[test]
fn plain_assignment_target_is_not_read() {
    // f() => (let x = 0; x = 1)
    let mut b = ProgramBuilder::new();
    let mut x = None;
    let f = b.function("f", &[], Type::Int, |b, _| {
        let zero = b.int(0);
        let (xv, decl) = b.let_("x", Type::Int, zero);
        let one = b.int(1);
        let set = b.assign(xv, one);
        x = Some(xv);
        b.block(vec![decl, set])
    });
    let unit = b.finish();
    assert_eq!(unit.uses.flags(f, x.unwrap()), UseFlags::WRITE);
}

// ── Nested functions ────────────────────────────────────

#[test]
fn nested_write_marks_variable_captured() {
    // f() => (let x = 0; fn g() => (x = 1); x)
    let mut b = ProgramBuilder::new();
    let mut ids = None;
    let f = b.function("f", &[], Type::Int, |b, _| {
        let zero = b.int(0);
        let (x, decl) = b.let_("x", Type::Int, zero);
        let g = b.function("g", &[], Type::Int, |b, _| {
            let one = b.int(1);
            b.assign(x, one)
        });
        let g_decl = b.fn_decl(g);
        let read = b.var(x);
        ids = Some((x, g));
        b.block(vec![decl, g_decl, read])
    });
    let unit = b.finish();
    let (x, g) = ids.unwrap();

    assert_eq!(unit.uses.flags(g, x), UseFlags::WRITE);
    assert_eq!(
        unit.uses.flags(f, x),
        UseFlags::READ | UseFlags::WRITE | UseFlags::NESTED_WRITE
    );
    assert!(unit.uses.is_captured(&unit.program, x));
}

#[test]
fn unmentioned_variable_has_empty_flags() {
    let mut b = ProgramBuilder::new();
    let mut x = None;
    let f = b.function("f", &[], Type::Unit, |b, _| {
        x = Some(b.declare("x", Type::Int));
        b.empty()
    });
    let g = b.function("g", &[], Type::Unit, |b, _| b.empty());
    let unit = b.finish();
    assert_eq!(unit.uses.flags(g, x.unwrap()), UseFlags::empty());
    assert_eq!(unit.uses.flags(f, x.unwrap()), UseFlags::empty());
}

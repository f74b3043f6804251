use pretty_assertions::assert_eq;

use kite_ir::{BinaryOp, Type, UnaryOp};

use crate::error::CfgError;
use crate::test_helpers::{dump, lower_body, lower_fn};

const TWO_BOOLS: &[(&str, Type)] = &[("a", Type::Bool), ("b", Type::Bool)];

// ── Pure operators ──────────────────────────────────────

#[test]
fn pure_arithmetic_stays_in_one_node() {
    let cfg = lower_body(Type::Int, |b| {
        let one = b.int(1);
        let two = b.int(2);
        b.binary(BinaryOp::Add, one, two)
    });
    assert_eq!(dump(cfg), "entry L0\nL0: rax <- (1 + 2) -> L1\nL1: ret\n");
}

#[test]
fn pure_short_circuit_is_a_plain_node() {
    let cfg = lower_fn(TWO_BOOLS, Type::Bool, |b, params| {
        let a = b.var(params[0]);
        let rhs = b.var(params[1]);
        b.binary(BinaryOp::Or, a, rhs)
    });
    assert_eq!(
        dump(cfg),
        "entry L2\n\
         L0: rax <- (v0 || v1) -> L1\n\
         L1: ret\n\
         L2: {v0 <- rdi; v1 <- rsi} -> L0\n"
    );
}

#[test]
fn negation_wraps_the_operand() {
    let cfg = lower_fn(&[("a", Type::Int)], Type::Int, |b, params| {
        let a = b.var(params[0]);
        b.unary(UnaryOp::Neg, a)
    });
    assert_eq!(
        dump(cfg),
        "entry L2\nL0: rax <- -v0 -> L1\nL1: ret\nL2: v0 <- rdi -> L0\n"
    );
}

// ── Effects ─────────────────────────────────────────────

#[test]
fn effect_only_operands_become_one_sequence() {
    // (a = 1) + (a = 2); ()
    let cfg = lower_fn(&[("a", Type::Int)], Type::Unit, |b, params| {
        let one = b.int(1);
        let first = b.assign(params[0], one);
        let two = b.int(2);
        let second = b.assign(params[0], two);
        let sum = b.binary(BinaryOp::Add, first, second);
        let done = b.empty();
        b.block(vec![sum, done])
    });
    assert_eq!(
        dump(cfg),
        "entry L3\n\
         L0: {v0 <- 1; v0 <- 2} -> L1\n\
         L1: rax <- () -> L2\n\
         L2: ret\n\
         L3: v0 <- rdi -> L0\n"
    );
}

#[test]
fn effectful_short_circuit_value_branches() {
    // a && (b = false)
    let cfg = lower_fn(TWO_BOOLS, Type::Bool, |b, params| {
        let a = b.var(params[0]);
        let no = b.boolean(false);
        let store = b.assign(params[1], no);
        b.binary(BinaryOp::And, a, store)
    });
    assert_eq!(
        dump(cfg),
        "entry L8\n\
         L0: v2 <- true -> L2\n\
         L1: v2 <- false -> L2\n\
         L2: nop -> L6\n\
         L3: v1 <- false -> L4\n\
         L4: if v1 then L0 else L1\n\
         L5: if v0 then L3 else L1\n\
         L6: rax <- v2 -> L7\n\
         L7: ret\n\
         L8: {v0 <- rdi; v1 <- rsi} -> L5\n"
    );
}

/// `a op (b = false); ()`
fn short_circuit_statement(op: BinaryOp) -> String {
    dump(lower_fn(TWO_BOOLS, Type::Unit, |b, params| {
        let a = b.var(params[0]);
        let no = b.boolean(false);
        let store = b.assign(params[1], no);
        let test = b.binary(op, a, store);
        let done = b.empty();
        b.block(vec![test, done])
    }))
}

#[test]
fn effectful_short_circuit_statement_tests_only_the_left_operand() {
    assert_eq!(
        short_circuit_statement(BinaryOp::And),
        "entry L5\n\
         L0: nop -> L3\n\
         L1: v1 <- false -> L0\n\
         L2: if v0 then L1 else L0\n\
         L3: rax <- () -> L4\n\
         L4: ret\n\
         L5: {v0 <- rdi; v1 <- rsi} -> L2\n"
    );
    assert_eq!(
        short_circuit_statement(BinaryOp::Or),
        "entry L5\n\
         L0: nop -> L3\n\
         L1: v1 <- false -> L0\n\
         L2: if v0 then L0 else L1\n\
         L3: rax <- () -> L4\n\
         L4: ret\n\
         L5: {v0 <- rdi; v1 <- rsi} -> L2\n"
    );
}

#[test]
fn constant_short_circuit_statement_folds() {
    // false && (x = true); x
    let cfg = lower_fn(&[("x", Type::Bool)], Type::Bool, |b, params| {
        let no = b.boolean(false);
        let yes = b.boolean(true);
        let store = b.assign(params[0], yes);
        let test = b.binary(BinaryOp::And, no, store);
        let read = b.var(params[0]);
        b.block(vec![test, read])
    });
    assert_eq!(
        dump(cfg),
        "entry L2\nL0: rax <- v0 -> L1\nL1: ret\nL2: v0 <- rdi -> L0\n"
    );
}

// ── Conditions ──────────────────────────────────────────

#[test]
fn or_condition_tests_operands_in_order() {
    let cfg = lower_fn(TWO_BOOLS, Type::Int, |b, params| {
        let a = b.var(params[0]);
        let rhs = b.var(params[1]);
        let cond = b.binary(BinaryOp::Or, a, rhs);
        let one = b.int(1);
        let two = b.int(2);
        b.if_(cond, one, Some(two))
    });
    assert_eq!(
        dump(cfg),
        "entry L7\n\
         L0: v2 <- 1 -> L2\n\
         L1: v2 <- 2 -> L2\n\
         L2: nop -> L5\n\
         L3: if v1 then L0 else L1\n\
         L4: if v0 then L0 else L3\n\
         L5: rax <- v2 -> L6\n\
         L6: ret\n\
         L7: {v0 <- rdi; v1 <- rsi} -> L4\n"
    );
}

#[test]
fn not_swaps_branch_targets() {
    let cfg = lower_fn(&[("a", Type::Bool)], Type::Int, |b, params| {
        let a = b.var(params[0]);
        let cond = b.unary(UnaryOp::Not, a);
        let one = b.int(1);
        let two = b.int(2);
        b.if_(cond, one, Some(two))
    });
    assert_eq!(
        dump(cfg),
        "entry L6\n\
         L0: v1 <- 1 -> L2\n\
         L1: v1 <- 2 -> L2\n\
         L2: nop -> L4\n\
         L3: if v0 then L1 else L0\n\
         L4: rax <- v1 -> L5\n\
         L5: ret\n\
         L6: v0 <- rdi -> L3\n"
    );
}

#[test]
fn arithmetic_is_not_a_condition() {
    let cfg = lower_body(Type::Int, |b| {
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        let yes = b.int(3);
        let no = b.int(4);
        b.if_(sum, yes, Some(no))
    });
    assert!(matches!(
        cfg,
        Err(CfgError::NotConditional {
            kind: "binary operator",
            ..
        })
    ));
}

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn arena_ids_are_dense() {
    let mut arena = ExprArena::new();
    assert!(arena.is_empty());
    let a = arena.push(ExprKind::Empty);
    let b = arena.push(ExprKind::Literal(Literal::Int(1)));
    assert_eq!(a, ExprId::new(0));
    assert_eq!(b, ExprId::new(1));
    assert_eq!(arena.len(), 2);
    assert_eq!(arena.kind(b), &ExprKind::Literal(Literal::Int(1)));
}

#[test]
fn children_follow_evaluation_order() {
    let e = ExprId::new;
    let kind = ExprKind::If {
        cond: e(0),
        then_branch: e(1),
        else_branch: Some(e(2)),
    };
    assert_eq!(kind.children().as_slice(), &[e(0), e(1), e(2)]);

    let call = ExprKind::Call {
        callee: "g".to_owned(),
        args: vec![e(4), e(3)],
    };
    assert_eq!(call.children().as_slice(), &[e(4), e(3)]);

    let assign = ExprKind::Assign {
        op: AssignOp::Add,
        target: e(5),
        value: e(6),
    };
    assert_eq!(assign.children().as_slice(), &[e(5), e(6)]);
}

#[test]
fn nested_function_has_no_children() {
    assert!(ExprKind::Function(FunctionId::new(1)).children().is_empty());
    assert!(ExprKind::Return(None).children().is_empty());
}

#[test]
fn depth_counts_enclosing_functions() {
    let body = ExprId::new(0);
    let decl = |name: &str, parent| FunctionDecl {
        name: name.to_owned(),
        parent,
        params: vec![],
        return_type: Type::Unit,
        body,
    };
    let program = Program {
        arena: ExprArena::new(),
        variables: vec![],
        functions: vec![
            decl("f", None),
            decl("g", Some(FunctionId::new(0))),
            decl("h", Some(FunctionId::new(1))),
        ],
    };
    let depths: Vec<usize> = program.function_ids().map(|f| program.depth(f)).collect();
    assert_eq!(depths, vec![0, 1, 2]);
}

#[test]
fn operator_classification() {
    assert!(BinaryOp::Mod.is_arithmetic());
    assert!(BinaryOp::LtEq.is_comparison());
    assert!(BinaryOp::Or.is_short_circuit());
    assert!(!BinaryOp::Eq.is_short_circuit());
    assert_eq!(AssignOp::Mul.arithmetic(), Some(BinaryOp::Mul));
    assert_eq!(AssignOp::Assign.arithmetic(), None);
    assert_eq!(UnaryOp::Not.as_symbol(), "!");
}

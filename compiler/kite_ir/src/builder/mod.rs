//! Programmatic construction of resolved, typed programs.
//!
//! [`ProgramBuilder`] stands in for the parser, resolver and type checker:
//! every expression it creates is recorded together with its resolution
//! facts and static type, so [`ProgramBuilder::finish`] yields a complete
//! [`CompilationUnit`] without any further analysis pass except use
//! analysis, which is computed from the finished program.

use crate::ast::{
    AssignOp, BinaryOp, ExprKind, FunctionDecl, Literal, Program, UnaryOp, Variable,
};
use crate::ids::{ExprId, FunctionId, VarId};
use crate::resolve::NameResolution;
use crate::types::{Type, TypeTable};
use crate::uses::UseAnalysis;
use crate::CompilationUnit;

#[derive(Default)]
pub struct ProgramBuilder {
    program: Program,
    /// Declarations are reserved before their bodies are built so that
    /// recursive and nested calls can refer to them.
    pending: Vec<Option<FunctionDecl>>,
    /// Name and return type of every reserved declaration.
    signatures: Vec<(String, Type)>,
    names: NameResolution,
    types: TypeTable,
    current: Option<FunctionId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a function. Declared inside another function's body, it
    /// becomes a nested function of that function.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "function indices never exceed u32"
    )]
    pub fn function<F>(
        &mut self,
        name: &str,
        params: &[(&str, Type)],
        return_type: Type,
        body: F,
    ) -> FunctionId
    where
        F: FnOnce(&mut Self, &[VarId]) -> ExprId,
    {
        let id = FunctionId::new(self.pending.len() as u32);
        self.pending.push(None);
        self.signatures.push((name.to_owned(), return_type.clone()));

        let parent = self.current.replace(id);
        let params: Vec<VarId> = params
            .iter()
            .map(|(name, ty)| self.declare(name, ty.clone()))
            .collect();
        let body = body(self, &params);
        self.current = parent;

        self.pending[id.index()] = Some(FunctionDecl {
            name: name.to_owned(),
            parent,
            params,
            return_type,
            body,
        });
        id
    }

    /// Declare a variable owned by the function currently being built.
    ///
    /// # Panics
    /// Outside of a [`ProgramBuilder::function`] body.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "variable indices never exceed u32"
    )]
    pub fn declare(&mut self, name: &str, ty: Type) -> VarId {
        let Some(owner) = self.current else {
            panic!("variable `{name}` declared outside of a function");
        };
        let id = VarId::new(self.program.variables.len() as u32);
        self.program.variables.push(Variable {
            name: name.to_owned(),
            ty,
            owner,
        });
        id
    }

    pub fn variable_type(&self, var: VarId) -> &Type {
        &self.program.variable(var).ty
    }

    fn push(&mut self, kind: ExprKind, ty: Option<Type>) -> ExprId {
        let id = self.program.arena.push(kind);
        if let Some(ty) = ty {
            self.types.insert(id, ty);
        }
        id
    }

    fn type_of(&self, expr: ExprId) -> Option<Type> {
        self.types.get(expr).cloned()
    }

    // Leaves

    pub fn int(&mut self, value: i64) -> ExprId {
        self.push(ExprKind::Literal(Literal::Int(value)), Some(Type::Int))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.push(ExprKind::Literal(Literal::Bool(value)), Some(Type::Bool))
    }

    pub fn empty(&mut self) -> ExprId {
        self.push(ExprKind::Empty, Some(Type::Unit))
    }

    pub fn var(&mut self, var: VarId) -> ExprId {
        let decl = self.program.variable(var);
        let (name, ty) = (decl.name.clone(), decl.ty.clone());
        let id = self.push(ExprKind::Var(name), Some(ty));
        self.names.bind_variable(id, var);
        id
    }

    pub fn brk(&mut self) -> ExprId {
        self.push(ExprKind::Break, Some(Type::Unit))
    }

    // Declarations

    /// `let name = init`, returning the declared variable and the
    /// declaration expression.
    pub fn let_(&mut self, name: &str, ty: Type, init: ExprId) -> (VarId, ExprId) {
        let var = self.declare(name, ty);
        let id = self.push(ExprKind::Let { var, init }, Some(Type::Unit));
        (var, id)
    }

    /// Place a nested function declaration in expression position.
    pub fn fn_decl(&mut self, function: FunctionId) -> ExprId {
        self.push(ExprKind::Function(function), Some(Type::Unit))
    }

    // Operators

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        let ty = match op {
            UnaryOp::Neg => Type::Int,
            UnaryOp::Not => Type::Bool,
        };
        self.push(ExprKind::Unary { op, operand }, Some(ty))
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let ty = if op.is_arithmetic() {
            Type::Int
        } else {
            Type::Bool
        };
        self.push(ExprKind::Binary { op, lhs, rhs }, Some(ty))
    }

    pub fn assign(&mut self, var: VarId, value: ExprId) -> ExprId {
        self.assign_op(AssignOp::Assign, var, value)
    }

    pub fn assign_op(&mut self, op: AssignOp, var: VarId, value: ExprId) -> ExprId {
        let target = self.var(var);
        let ty = self.variable_type(var).clone();
        self.push(ExprKind::Assign { op, target, value }, Some(ty))
    }

    // Control flow

    pub fn block(&mut self, items: Vec<ExprId>) -> ExprId {
        let ty = match items.last() {
            Some(&last) => self.type_of(last),
            None => Some(Type::Unit),
        };
        self.push(ExprKind::Block(items), ty)
    }

    pub fn if_(&mut self, cond: ExprId, then_branch: ExprId, else_branch: Option<ExprId>) -> ExprId {
        let ty = match else_branch {
            Some(_) => self.type_of(then_branch),
            None => Some(Type::Unit),
        };
        self.push(
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            },
            ty,
        )
    }

    pub fn while_(&mut self, cond: ExprId, body: ExprId) -> ExprId {
        self.push(ExprKind::While { cond, body }, Some(Type::Unit))
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> ExprId {
        self.push(ExprKind::Return(value), Some(Type::Unit))
    }

    pub fn call(&mut self, function: FunctionId, args: Vec<ExprId>) -> ExprId {
        let (callee, ty) = self.signatures[function.index()].clone();
        let id = self.push(ExprKind::Call { callee, args }, Some(ty));
        self.names.bind_callee(id, function);
        id
    }

    // Aggregates

    pub fn struct_(&mut self, fields: Vec<(&str, ExprId)>) -> ExprId {
        let ty = fields
            .iter()
            .map(|&(name, value)| self.type_of(value).map(|ty| (name, ty)))
            .collect::<Option<Vec<_>>>()
            .map(Type::structure);
        let fields = fields
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect();
        self.push(ExprKind::Struct(fields), ty)
    }

    pub fn field(&mut self, receiver: ExprId, field: &str) -> ExprId {
        let ty = match self.types.get(receiver) {
            Some(Type::Struct(st)) => st.field(field).cloned(),
            _ => None,
        };
        self.push(
            ExprKind::Field {
                receiver,
                field: field.to_owned(),
            },
            ty,
        )
    }

    /// Finish construction and run use analysis.
    ///
    /// # Panics
    /// If called while a function body is still being built.
    pub fn finish(mut self) -> CompilationUnit {
        assert!(
            self.current.is_none(),
            "finish() called inside a function body"
        );
        self.program.functions = self.pending.into_iter().flatten().collect();
        let uses = UseAnalysis::compute(&self.program, &self.names);
        CompilationUnit {
            program: self.program,
            names: self.names,
            types: self.types,
            uses,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

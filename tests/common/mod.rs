//! Shared fixtures: expression builders and symbol helpers standing in
//! for the parser and scope-builder collaborators.

use luatype::*;
use std::rc::Rc;

pub fn r(start: u32, end: u32) -> Range {
    Range::new(start, end)
}

pub fn name(n: &str, at: u32) -> ExprRef {
    Ref::new(Expr::Name {
        name: n.to_string(),
        range: r(at, at + n.len() as u32),
    })
}

pub fn string_lit(v: &str, at: u32) -> ExprRef {
    Ref::new(Expr::String {
        value: v.to_string(),
        range: r(at, at + v.len() as u32 + 2),
    })
}

pub fn number_lit(at: u32) -> ExprRef {
    Ref::new(Expr::Number {
        value: 1.0,
        range: r(at, at + 1),
    })
}

pub fn bool_lit(v: bool, at: u32) -> ExprRef {
    Ref::new(Expr::Bool {
        value: v,
        range: r(at, at + 4),
    })
}

pub fn nil_lit(at: u32) -> ExprRef {
    Ref::new(Expr::Nil { range: r(at, at + 3) })
}

pub fn unary(op: UnaryOp, expr: ExprRef, at: u32) -> ExprRef {
    Ref::new(Expr::Unary {
        op,
        expr,
        range: r(at, at + 10),
    })
}

pub fn binary(op: BinOp, lhs: ExprRef, rhs: ExprRef, at: u32) -> ExprRef {
    Ref::new(Expr::Binary {
        op,
        lhs,
        rhs,
        range: r(at, at + 10),
    })
}

pub fn logical(op: LogicalOp, lhs: ExprRef, rhs: ExprRef, at: u32) -> ExprRef {
    Ref::new(Expr::Logical {
        op,
        lhs,
        rhs,
        range: r(at, at + 10),
    })
}

pub fn member(base: ExprRef, field: &str, at: u32) -> ExprRef {
    let start = base.range().start;
    Ref::new(Expr::Member {
        base,
        field: field.to_string(),
        field_range: r(at, at + field.len() as u32),
        range: r(start, at + field.len() as u32),
    })
}

pub fn call(base: ExprRef, args: Vec<ExprRef>, at: u32) -> ExprRef {
    Ref::new(Expr::Call {
        base,
        args,
        range: r(at, at + 10),
    })
}

pub fn table(fields: Vec<(&str, ExprRef)>, at: u32) -> ExprRef {
    let fields = fields
        .into_iter()
        .enumerate()
        .map(|(i, (k, v))| TableField::Named {
            key: k.to_string(),
            key_range: r(at + 1 + i as u32, at + 1 + i as u32 + k.len() as u32),
            value: v,
        })
        .collect();
    Ref::new(Expr::Table {
        fields,
        range: r(at, at + 20),
    })
}

pub fn lazy(scope: &Rc<Scope>, node: &ExprRef, name: &str) -> LuaType {
    lazy_at(scope, node, name, 0)
}

pub fn lazy_at(scope: &Rc<Scope>, node: &ExprRef, name: &str, index: usize) -> LuaType {
    LuaType::Lazy(Rc::new(LazyValue::new(scope, node.clone(), name, index)))
}

/// Declare a local symbol in `scope` the way the scope builder would.
pub fn local_sym(scope: &Rc<Scope>, name: &str, at: u32, kind: SymbolKind, ty: LuaType) -> Symbol {
    let symbol = Symbol::new(
        name,
        r(at, at + name.len() as u32),
        scope.range(),
        true,
        scope.uri(),
        kind,
        ty,
    );
    scope.declare(symbol.clone());
    symbol
}

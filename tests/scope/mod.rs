use crate::common::*;

use anyhow::Result;
use luatype::*;
use std::rc::Rc;

#[test]
fn inner_declarations_shadow_outer() -> Result<()> {
    let engine = Engine::new();
    let scope = Scope::new_root("test.lua", r(0, 1000));

    let _outer = local_sym(&scope, "x", 5, SymbolKind::Variable, LuaType::Number);
    let inner = scope.child(r(100, 500));
    let shadow = Symbol::new(
        "x",
        r(110, 111),
        inner.range(),
        true,
        inner.uri(),
        SymbolKind::Variable,
        LuaType::String,
    );
    inner.declare(shadow);

    // inside the inner scope the shadowing declaration wins
    let inside = name("x", 200);
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &inside, "v")),
        LuaType::String
    ));

    // past the inner scope the outer declaration is back in view
    let outside = name("x", 600);
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &outside, "v")),
        LuaType::Number
    ));
    Ok(())
}

#[test]
fn identifiers_fall_back_to_globals() -> Result<()> {
    let mut engine = Engine::new();
    let scope = Scope::new_root("test.lua", r(0, 1000));

    engine.set_global(Symbol::new(
        "VERSION",
        r(0, 7),
        r(0, 0),
        false,
        "<global>",
        SymbolKind::Variable,
        LuaType::String,
    ));

    let expr = name("VERSION", 100);
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &expr, "v")),
        LuaType::String
    ));
    Ok(())
}

#[test]
fn search_respects_predicate() -> Result<()> {
    let scope = Scope::new_root("test.lua", r(0, 1000));
    let f = local_sym(
        &scope,
        "f",
        0,
        SymbolKind::Function,
        LuaType::Function(Rc::new(FunctionType::new(vec![], vec![]))),
    );
    let v = local_sym(&scope, "f", 10, SymbolKind::Variable, LuaType::Number);

    // without a predicate the nearest declaration wins
    let nearest = scope.search("f", r(50, 51), None).unwrap();
    assert!(nearest.same(&v));

    let pred = |s: &Symbol| s.kind() == SymbolKind::Function;
    let filtered = scope.search("f", r(50, 51), Some(&pred)).unwrap();
    assert!(filtered.same(&f));
    Ok(())
}

#[test]
fn dropped_context_degrades_to_any() -> Result<()> {
    let engine = Engine::new();
    let expr = name("x", 10);
    let orphan = {
        let scope = Scope::new_root("gone.lua", r(0, 1000));
        lazy(&scope, &expr, "x")
        // scope tree dropped here
    };
    assert!(engine.deduce_type(&orphan).is_any());
    Ok(())
}

use crate::common::*;

use anyhow::Result;
use luatype::*;
use std::rc::Rc;

fn module_symbol(uri: &str, ret: Option<LuaType>) -> Symbol {
    let module = ModuleType::new(uri);
    if let Some(ty) = ret {
        module.set_return(Symbol::new(
            "return",
            r(0, 1),
            r(0, 100),
            true,
            uri,
            SymbolKind::Variable,
            ty,
        ));
    }
    Symbol::new(
        "module",
        r(0, 0),
        r(0, 100),
        false,
        uri,
        SymbolKind::Module,
        LuaType::Module(Rc::new(module)),
    )
}

#[test]
fn require_resolves_loaded_package() -> Result<()> {
    let mut engine = Engine::new();
    let scope = Scope::new_root("src/app.lua", r(0, 1000));

    engine.add_package(
        "bar",
        "src/foo/bar.lua",
        module_symbol("src/foo/bar.lua", Some(LuaType::Number)),
    );

    let req = call(name("require", 10), vec![string_lit("foo.bar", 18)], 10);
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &req, "m")),
        LuaType::Number
    ));
    Ok(())
}

#[test]
fn require_takes_first_match_in_iteration_order() -> Result<()> {
    let mut engine = Engine::new();
    let scope = Scope::new_root("src/app.lua", r(0, 1000));

    engine.add_package(
        "bar",
        "z/foo/bar.lua",
        module_symbol("z/foo/bar.lua", Some(LuaType::String)),
    );
    engine.add_package(
        "bar",
        "a/foo/bar.lua",
        module_symbol("a/foo/bar.lua", Some(LuaType::Number)),
    );

    // both uris contain foo/bar; the lexicographically first wins
    let req = call(name("require", 10), vec![string_lit("foo.bar", 18)], 10);
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &req, "m")),
        LuaType::Number
    ));
    Ok(())
}

#[test]
fn require_falls_back_to_global_symbol() -> Result<()> {
    let mut engine = Engine::new();
    let scope = Scope::new_root("src/app.lua", r(0, 1000));

    // a package registered under the short-name, but at a uri that does
    // not contain the required path
    engine.add_package(
        "bar",
        "elsewhere/other.lua",
        module_symbol("elsewhere/other.lua", Some(LuaType::String)),
    );
    engine.set_global(Symbol::new(
        "bar",
        r(0, 3),
        r(0, 0),
        false,
        "<global>",
        SymbolKind::Table,
        LuaType::Table(Rc::new(TableType::new())),
    ));

    let req = call(name("require", 10), vec![string_lit("foo.bar", 18)], 10);
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &req, "m")),
        LuaType::Table(_)
    ));
    Ok(())
}

#[test]
fn require_without_any_resolution_is_any() -> Result<()> {
    let engine = Engine::new();
    let scope = Scope::new_root("src/app.lua", r(0, 1000));

    let req = call(name("require", 10), vec![string_lit("zzz.qqq", 18)], 10);
    assert!(engine.deduce_type(&lazy(&scope, &req, "m")).is_any());

    // non-literal paths are not modeled
    let dynamic = call(name("require", 40), vec![name("path", 48)], 40);
    assert!(engine.deduce_type(&lazy(&scope, &dynamic, "m")).is_any());
    Ok(())
}

#[test]
fn invalidate_removes_document_until_reregistered() -> Result<()> {
    let mut engine = Engine::new();
    let scope = Scope::new_root("src/app.lua", r(0, 1000));
    let req = call(name("require", 10), vec![string_lit("foo.bar", 18)], 10);

    engine.add_package(
        "bar",
        "src/foo/bar.lua",
        module_symbol("src/foo/bar.lua", Some(LuaType::Number)),
    );
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &req, "m")),
        LuaType::Number
    ));

    engine.invalidate_document("src/foo/bar.lua");
    assert!(engine.deduce_type(&lazy(&scope, &req, "m")).is_any());
    assert!(engine.document("src/foo/bar.lua").is_none());

    engine.add_package(
        "bar",
        "src/foo/bar.lua",
        module_symbol("src/foo/bar.lua", Some(LuaType::Number)),
    );
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &req, "m")),
        LuaType::Number
    ));
    Ok(())
}

#[test]
fn find_def_searches_module_entries() -> Result<()> {
    let mut engine = Engine::new();
    let uri = "src/io2.lua";

    let module = ModuleType::new(uri);
    let open = Symbol::new(
        "open",
        r(10, 14),
        r(0, 100),
        false,
        uri,
        SymbolKind::Function,
        LuaType::Function(Rc::new(FunctionType::new(vec![Param::new("path")], vec![]))),
    );
    module.set("open", open.clone());
    let module_sym = Symbol::new(
        "io2",
        r(0, 0),
        r(0, 100),
        false,
        uri,
        SymbolKind::Module,
        LuaType::Module(Rc::new(module)),
    );
    engine.add_package("io2", uri, module_sym);

    let found = engine.find_def("open", uri, r(500, 504)).unwrap();
    assert!(found.same(&open));

    assert!(engine.find_def("close", uri, r(500, 505)).is_none());
    assert!(engine.find_def("open", "unknown.lua", r(500, 504)).is_none());
    Ok(())
}

#[test]
fn module_members_resolve_through_entries() -> Result<()> {
    let engine = Engine::new();
    let scope = Scope::new_root("src/app.lua", r(0, 1000));

    let module = ModuleType::new("src/conf.lua");
    module.set(
        "level",
        Symbol::new(
            "level",
            r(5, 10),
            r(0, 100),
            false,
            "src/conf.lua",
            SymbolKind::Property,
            LuaType::Number,
        ),
    );
    let _conf = local_sym(
        &scope,
        "conf",
        0,
        SymbolKind::Module,
        LuaType::Module(Rc::new(module)),
    );

    let expr = member(name("conf", 20), "level", 25);
    assert!(matches!(
        engine.deduce_type(&lazy(&scope, &expr, "v")),
        LuaType::Number
    ));
    Ok(())
}

#[test]
fn symbol_lazily_aliasing_module_upgrades_kind() -> Result<()> {
    let mut engine = Engine::new();
    let scope = Scope::new_root("src/app.lua", r(0, 1000));

    engine.add_package(
        "json",
        "vendor/json.lua",
        module_symbol("vendor/json.lua", None),
    );
    engine.set_global(Symbol::new(
        "json",
        r(0, 4),
        r(0, 0),
        false,
        "<global>",
        SymbolKind::Variable,
        engine.document("vendor/json.lua").unwrap().ty(),
    ));

    let alias = name("json", 30);
    let j = local_sym(&scope, "j", 25, SymbolKind::Variable, lazy(&scope, &alias, "j"));
    assert!(matches!(engine.type_of(Some(&j)), LuaType::Module(_)));
    assert_eq!(j.kind(), SymbolKind::Module);
    Ok(())
}

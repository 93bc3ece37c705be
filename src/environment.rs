//! Per-workspace registries.
//!
//! The original tool kept these as process-wide mutable globals; here they
//! are an explicit object owned by the engine. Lifecycle contract: a
//! document is (re)registered by the loader before any deduction queries
//! against it, and queries are read-only — there is no fine-grained
//! locking, rebuild invalidates.

use crate::ast::Range;
use crate::symbols::{Symbol, SymbolKind};
use crate::types::{FunctionType, LuaType, Param};

use std::collections::BTreeMap;
use std::rc::Rc;

pub struct Environment {
    /// Forward/alias type names, resolved independent of lexical scope.
    named_types: BTreeMap<String, Symbol>,
    /// Module short-name -> document uri -> module symbol.
    packages: BTreeMap<String, BTreeMap<String, Symbol>>,
    /// Document uri -> module symbol.
    documents: BTreeMap<String, Symbol>,
    /// The global scope.
    globals: BTreeMap<String, Symbol>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// An environment preloaded with the stdlib globals the engine
    /// special-cases (`require`, `setmetatable`).
    pub fn new() -> Self {
        let mut env = Self {
            named_types: BTreeMap::new(),
            packages: BTreeMap::new(),
            documents: BTreeMap::new(),
            globals: BTreeMap::new(),
        };
        for (name, params) in [("require", vec!["modname"]), ("setmetatable", vec!["table", "metatable"])] {
            let ftype = FunctionType::new(params.into_iter().map(Param::new).collect(), vec![]);
            env.set_global(Symbol::new(
                name,
                Range::new(0, 0),
                Range::new(0, u32::MAX),
                false,
                "<stdlib>",
                SymbolKind::Function,
                LuaType::Function(Rc::new(ftype)),
            ));
        }
        env
    }

    pub fn register_named_type(&mut self, symbol: Symbol) {
        self.named_types.insert(symbol.name().to_string(), symbol);
    }

    pub fn named_type(&self, name: &str) -> Option<Symbol> {
        self.named_types.get(name).cloned()
    }

    /// Register an analyzed document under its module short-name. The
    /// symbol's type is expected to be (or deduce to) a module.
    pub fn add_package(&mut self, name: impl Into<String>, uri: impl Into<String>, symbol: Symbol) {
        let uri = uri.into();
        self.packages
            .entry(name.into())
            .or_default()
            .insert(uri.clone(), symbol.clone());
        self.documents.insert(uri, symbol);
    }

    /// Documents registered under a module short-name, keyed by uri.
    /// Iteration order is the deterministic first-match order of
    /// `require` resolution.
    pub fn packages_of(&self, name: &str) -> Option<&BTreeMap<String, Symbol>> {
        self.packages.get(name)
    }

    pub fn document(&self, uri: &str) -> Option<Symbol> {
        self.documents.get(uri).cloned()
    }

    /// Drop a document ahead of re-analysis.
    pub fn invalidate(&mut self, uri: &str) {
        self.documents.remove(uri);
        self.packages.retain(|_, docs| {
            docs.remove(uri);
            !docs.is_empty()
        });
    }

    pub fn set_global(&mut self, symbol: Symbol) {
        self.globals.insert(symbol.name().to_string(), symbol);
    }

    pub fn global(&self, name: &str) -> Option<Symbol> {
        self.globals.get(name).cloned()
    }
}

use crate::ast::Range;
use crate::environment::Environment;
use crate::interpreter::Deducer;
use crate::symbols::Symbol;
use crate::types::LuaType;

use log::{debug, info};

/// The deduction engine: registries plus the public query surface.
///
/// All three queries are total over their documented inputs — malformed
/// input yields `any` or `None`, never an error. Analysis per document
/// must be serialized by the caller: one in-flight deduction pass per
/// document at a time, and registration fully preceding queries. Queries
/// against different documents touch disjoint node graphs and are safe.
pub struct Engine {
    env: Environment,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Register an analyzed document under its module short-name.
    pub fn add_package(
        &mut self,
        name: impl Into<String>,
        uri: impl Into<String>,
        symbol: Symbol,
    ) {
        let name = name.into();
        let uri = uri.into();
        info!("registered package '{name}' from {uri}");
        self.env.add_package(name, uri, symbol);
    }

    /// Drop a document ahead of re-analysis.
    pub fn invalidate_document(&mut self, uri: &str) {
        self.env.invalidate(uri);
    }

    pub fn set_global(&mut self, symbol: Symbol) {
        self.env.set_global(symbol);
    }

    pub fn register_named_type(&mut self, symbol: Symbol) {
        self.env.register_named_type(symbol);
    }

    pub fn global(&self, name: &str) -> Option<Symbol> {
        self.env.global(name)
    }

    pub fn document(&self, uri: &str) -> Option<Symbol> {
        self.env.document(uri)
    }

    /// Resolved type of `symbol`; `any` for `None` and for anything the
    /// engine cannot deduce.
    pub fn type_of(&self, symbol: Option<&Symbol>) -> LuaType {
        Deducer::new(&self.env).type_of(symbol)
    }

    /// Resolve a possibly lazy type. Failures coerce to `any` here, at
    /// the public boundary, and nowhere else.
    pub fn deduce_type(&self, ty: &LuaType) -> LuaType {
        match Deducer::new(&self.env).deduce(ty) {
            Ok(Some(ty)) => ty,
            Ok(None) => LuaType::Any,
            Err(err) => {
                debug!("deduction failed: {err}");
                LuaType::Any
            }
        }
    }

    /// Definition of `name` visible at `range` in document `uri`.
    pub fn find_def(&self, name: &str, uri: &str, range: Range) -> Option<Symbol> {
        Deducer::new(&self.env).find_def(name, uri, range)
    }
}

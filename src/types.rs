//! The deduced type model.
//!
//! [`LuaType`] is a closed tagged variant; capability checks are pure
//! discriminant tests. `Any` is the universal fallback and the terminal
//! value of failed deduction. Tables and modules are shared through `Rc`
//! so that metatable attachment is a genuine aliasing mutation observed by
//! every holder.

use crate::ast::{ExprRef, Range};
use crate::scope::Scope;
use crate::symbols::Symbol;

use core::fmt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use anyhow::{anyhow, Result};
use serde::{Serialize, Serializer};

#[derive(Clone)]
pub enum LuaType {
    Any,
    Boolean,
    Number,
    String,
    Function(Rc<FunctionType>),
    Table(Rc<TableType>),
    Module(Rc<ModuleType>),
    /// A deferred computation; resolved on demand by the engine.
    Lazy(Rc<LazyValue>),
}

impl LuaType {
    /// Merge preorder: higher rank wins. `Lazy` never reaches ranking in a
    /// deduced result and counts as the fallback rank.
    pub const fn rank(&self) -> u8 {
        match self {
            LuaType::Any | LuaType::Lazy(_) => 0,
            LuaType::Boolean | LuaType::Number | LuaType::String => 1,
            LuaType::Function(_) => 2,
            LuaType::Table(_) => 3,
            LuaType::Module(_) => 4,
        }
    }

    pub const fn is_any(&self) -> bool {
        matches!(self, LuaType::Any)
    }

    pub const fn is_lazy(&self) -> bool {
        matches!(self, LuaType::Lazy(_))
    }

    pub const fn is_function(&self) -> bool {
        matches!(self, LuaType::Function(_))
    }

    pub const fn is_table(&self) -> bool {
        matches!(self, LuaType::Table(_))
    }

    pub const fn is_module(&self) -> bool {
        matches!(self, LuaType::Module(_))
    }

    pub fn as_function(&self) -> Result<&Rc<FunctionType>> {
        match self {
            LuaType::Function(f) => Ok(f),
            _ => Err(anyhow!("not a function")),
        }
    }

    pub fn as_table(&self) -> Result<&Rc<TableType>> {
        match self {
            LuaType::Table(t) => Ok(t),
            _ => Err(anyhow!("not a table")),
        }
    }

    pub fn as_module(&self) -> Result<&Rc<ModuleType>> {
        match self {
            LuaType::Module(m) => Ok(m),
            _ => Err(anyhow!("not a module")),
        }
    }

    pub fn as_lazy(&self) -> Result<&Rc<LazyValue>> {
        match self {
            LuaType::Lazy(l) => Ok(l),
            _ => Err(anyhow!("not a lazy value")),
        }
    }
}

impl fmt::Display for LuaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaType::Any => f.write_str("any"),
            LuaType::Boolean => f.write_str("boolean"),
            LuaType::Number => f.write_str("number"),
            LuaType::String => f.write_str("string"),
            LuaType::Function(ft) => {
                f.write_str("function(")?;
                for (i, p) in ft.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&p.name)?;
                }
                f.write_str(")")
            }
            LuaType::Table(_) => f.write_str("table"),
            LuaType::Module(m) => write!(f, "module('{}')", m.uri),
            LuaType::Lazy(l) => write!(f, "<lazy {}>", l.name),
        }
    }
}

// Debug prints the shallow shape only; tables and metatables may form
// reference cycles.
impl fmt::Debug for LuaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// Serialized as the compact display form for diagnostics; the graph
// behind tables and modules may be cyclic.
impl Serialize for LuaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A deduced or declared function shape.
///
/// Return slots are full symbols: the inherit rule needs slot identity and
/// locality at call sites. When the function's last action delegates to
/// another call, the last declared slot holds that call's first value and
/// `tail_call` references the delegated call for the slots beyond it.
pub struct FunctionType {
    pub params: Vec<Param>,
    pub returns: Vec<Symbol>,
    pub tail_call: Option<LuaType>,
}

impl FunctionType {
    pub fn new(params: Vec<Param>, returns: Vec<Symbol>) -> Self {
        Self {
            params,
            returns,
            tail_call: None,
        }
    }

    pub fn with_tail_call(mut self, tail: LuaType) -> Self {
        self.tail_call = Some(tail);
        self
    }
}

impl fmt::Debug for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionType")
            .field("params", &self.params)
            .field("returns", &self.returns.len())
            .field("tail_call", &self.tail_call.is_some())
            .finish()
    }
}

/// A table: named entries plus an optional metatable reference.
///
/// The metatable is an aliased symbol, not a copy — lookups that miss
/// `entries` fall back through `metatable.entries.__index` recursively
/// (prototype-chain semantics), and `setmetatable` mutates the shared
/// cell in place.
pub struct TableType {
    entries: RefCell<BTreeMap<String, Symbol>>,
    metatable: RefCell<Option<Symbol>>,
}

impl Default for TableType {
    fn default() -> Self {
        Self::new()
    }
}

impl TableType {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
            metatable: RefCell::new(None),
        }
    }

    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, symbol: Symbol) {
        self.entries.borrow_mut().insert(name.into(), symbol);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn metatable(&self) -> Option<Symbol> {
        self.metatable.borrow().clone()
    }

    pub fn set_metatable(&self, meta: Symbol) {
        *self.metatable.borrow_mut() = Some(meta);
    }
}

impl fmt::Debug for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableType")
            .field("entries", &self.entry_names())
            .field("metatable", &self.metatable.borrow().is_some())
            .finish()
    }
}

/// An analyzed document's exported namespace. `ret` is the symbol the
/// document returns — what a successful `require` evaluates to.
pub struct ModuleType {
    pub uri: Rc<str>,
    entries: RefCell<BTreeMap<String, Symbol>>,
    ret: RefCell<Option<Symbol>>,
}

impl ModuleType {
    pub fn new(uri: impl Into<Rc<str>>) -> Self {
        Self {
            uri: uri.into(),
            entries: RefCell::new(BTreeMap::new()),
            ret: RefCell::new(None),
        }
    }

    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, symbol: Symbol) {
        self.entries.borrow_mut().insert(name.into(), symbol);
    }

    pub fn return_symbol(&self) -> Option<Symbol> {
        self.ret.borrow().clone()
    }

    pub fn set_return(&self, symbol: Symbol) {
        *self.ret.borrow_mut() = Some(symbol);
    }
}

impl fmt::Debug for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleType")
            .field("uri", &self.uri)
            .field("entries", &self.entries.borrow().keys().collect::<Vec<_>>())
            .field("ret", &self.ret.borrow().is_some())
            .finish()
    }
}

/// A deferred type computation: the AST node whose evaluation yields the
/// type, the lexical context in which to resolve free names, a binding
/// name for diagnostics, and the return slot to select from a multi-return
/// call.
///
/// Purely a forwarding reference — it owns neither the scope nor the
/// document. A dropped context deduces to no result.
pub struct LazyValue {
    pub context: Weak<Scope>,
    pub node: ExprRef,
    pub name: String,
    pub index: usize,
}

impl LazyValue {
    pub fn new(
        context: &Rc<Scope>,
        node: ExprRef,
        name: impl Into<String>,
        index: usize,
    ) -> Self {
        Self {
            context: Rc::downgrade(context),
            node,
            name: name.into(),
            index,
        }
    }

    /// A fresh lazy over `node` in the same context, selecting slot 0.
    pub(crate) fn forward(&self, node: &ExprRef, name: impl Into<String>) -> Self {
        Self {
            context: self.context.clone(),
            node: node.clone(),
            name: name.into(),
            index: 0,
        }
    }

    /// The same computation re-based onto another return slot.
    pub(crate) fn rebased(&self, index: usize) -> Self {
        Self {
            context: self.context.clone(),
            node: self.node.clone(),
            name: self.name.clone(),
            index,
        }
    }

    pub fn range(&self) -> Range {
        self.node.range()
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("name", &self.name)
            .field("index", &self.index)
            .finish()
    }
}

//! Named bindings produced by scope construction and refined by deduction.

use crate::ast::Range;
use crate::types::LuaType;

use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Variable,
    Parameter,
    Property,
    Function,
    Class,
    Module,
    Table,
}

struct SymbolInner {
    name: Rc<str>,
    /// Declaration site.
    range: Range,
    /// Extent of the owning scope.
    scope_range: Range,
    is_local: bool,
    uri: Rc<str>,
    kind: Cell<SymbolKind>,
    ty: RefCell<LuaType>,
}

/// A named binding. Cheap to clone; shared between scopes, tables and
/// return slots. The stored type starts out lazy wherever the declaration
/// cannot be typed syntactically and is overwritten in place when
/// deduction succeeds. Symbols live as long as the owning document's
/// analysis pass; they are never destroyed individually.
#[derive(Clone)]
pub struct Symbol {
    inner: Rc<SymbolInner>,
}

impl Symbol {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<Rc<str>>,
        range: Range,
        scope_range: Range,
        is_local: bool,
        uri: impl Into<Rc<str>>,
        kind: SymbolKind,
        ty: LuaType,
    ) -> Self {
        Self {
            inner: Rc::new(SymbolInner {
                name: name.into(),
                range,
                scope_range,
                is_local,
                uri: uri.into(),
                kind: Cell::new(kind),
                ty: RefCell::new(ty),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn range(&self) -> Range {
        self.inner.range
    }

    pub fn scope_range(&self) -> Range {
        self.inner.scope_range
    }

    pub fn is_local(&self) -> bool {
        self.inner.is_local
    }

    pub fn uri(&self) -> Rc<str> {
        self.inner.uri.clone()
    }

    pub fn kind(&self) -> SymbolKind {
        self.inner.kind.get()
    }

    pub fn set_kind(&self, kind: SymbolKind) {
        self.inner.kind.set(kind);
    }

    /// The stored type, which may still be lazy.
    pub fn ty(&self) -> LuaType {
        self.inner.ty.borrow().clone()
    }

    pub fn set_ty(&self, ty: LuaType) {
        *self.inner.ty.borrow_mut() = ty;
    }

    /// Identity comparison; symbols have no structural equality.
    pub fn same(&self, other: &Symbol) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind.get())
            .field("type", &self.inner.ty.borrow().to_string())
            .finish()
    }
}

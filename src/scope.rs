//! Lexical scope chain and the scope-search primitive.
//!
//! The scope builder collaborator constructs one tree per document; the
//! engine only searches it. A scope additionally carries a transient
//! `func_argt` overlay mapping parameter names to deduced argument types,
//! installed only for the duration of one call-return deduction.

use crate::ast::Range;
use crate::symbols::Symbol;
use crate::types::LuaType;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub struct Scope {
    range: Range,
    uri: Rc<str>,
    parent: RefCell<Weak<Scope>>,
    /// Children ordered by `range.start`; innermost lookup binary-searches
    /// this ordering.
    children: RefCell<Vec<Rc<Scope>>>,
    /// Declaration order.
    symbols: RefCell<Vec<Symbol>>,
    func_argt: RefCell<Option<Vec<(String, LuaType)>>>,
}

impl Scope {
    pub fn new_root(uri: impl Into<Rc<str>>, range: Range) -> Rc<Scope> {
        Rc::new(Scope {
            range,
            uri: uri.into(),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            symbols: RefCell::new(Vec::new()),
            func_argt: RefCell::new(None),
        })
    }

    /// Create a child scope covering `range` and link it into the tree.
    pub fn child(self: &Rc<Scope>, range: Range) -> Rc<Scope> {
        let child = Rc::new(Scope {
            range,
            uri: self.uri.clone(),
            parent: RefCell::new(Rc::downgrade(self)),
            children: RefCell::new(Vec::new()),
            symbols: RefCell::new(Vec::new()),
            func_argt: RefCell::new(None),
        });
        let mut children = self.children.borrow_mut();
        let at = children.partition_point(|c| c.range.start <= range.start);
        children.insert(at, child.clone());
        child
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn uri(&self) -> Rc<str> {
        self.uri.clone()
    }

    pub fn declare(&self, symbol: Symbol) {
        self.symbols.borrow_mut().push(symbol);
    }

    /// Index of the innermost child whose range could cover `pos`:
    /// the partition point of the children ordered by start offset.
    pub fn innermost_child_index(&self, pos: u32) -> usize {
        self.children
            .borrow()
            .partition_point(|c| c.range.start <= pos)
    }

    /// Innermost scope in this subtree covering `range`.
    pub fn innermost(self: &Rc<Scope>, range: Range) -> Rc<Scope> {
        let mut cur = self.clone();
        loop {
            let next = {
                let children = cur.children.borrow();
                let idx = cur.innermost_child_index(range.start);
                idx.checked_sub(1)
                    .and_then(|i| children.get(i))
                    .filter(|c| c.range.contains(range.start))
                    .cloned()
            };
            match next {
                Some(c) => cur = c,
                None => return cur,
            }
        }
    }

    /// Nearest enclosing declaration of `name` visible at `range`,
    /// optionally filtered by `predicate`. Local declarations after
    /// `range.start` are invisible.
    pub fn search(
        self: &Rc<Scope>,
        name: &str,
        range: Range,
        predicate: Option<&dyn Fn(&Symbol) -> bool>,
    ) -> Option<Symbol> {
        let mut cur = Some(self.innermost(range));
        while let Some(scope) = cur {
            let found = {
                let symbols = scope.symbols.borrow();
                symbols
                    .iter()
                    .rev()
                    .find(|&s| {
                        s.name() == name
                            && (!s.is_local() || s.range().start <= range.start)
                            && predicate.map_or(true, |p| p(s))
                    })
                    .cloned()
            };
            if found.is_some() {
                return found;
            }
            cur = scope.parent.borrow().upgrade();
        }
        None
    }

    /// Install the call-argument overlay for one call-return deduction.
    pub fn install_arg_types(&self, overlay: Vec<(String, LuaType)>) {
        *self.func_argt.borrow_mut() = Some(overlay);
    }

    pub fn remove_arg_types(&self) {
        *self.func_argt.borrow_mut() = None;
    }

    pub fn has_arg_types(&self) -> bool {
        self.func_argt.borrow().is_some()
    }

    /// Deduced argument type bound to a parameter name, if an overlay is
    /// active. Later bindings shadow earlier ones.
    pub fn arg_type(&self, name: &str) -> Option<LuaType> {
        self.func_argt
            .borrow()
            .as_ref()
            .and_then(|overlay| {
                overlay
                    .iter()
                    .rev()
                    .find(|(n, _)| n == name)
                    .map(|(_, t)| t.clone())
            })
    }
}

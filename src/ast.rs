//! Expression AST consumed from the parser.
//!
//! The parser collaborator produces these nodes; the engine only reads
//! them. Nodes are shared through [`Ref`], whose equality and ordering are
//! pointer identity — the re-entrancy guard keys its in-progress set on
//! node identity, not node contents.

use core::{cmp, fmt, ops::Deref};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn contains(&self, pos: u32) -> bool {
        self.start <= pos && pos < self.end
    }
}

#[cfg_attr(feature = "ast", derive(serde::Serialize))]
pub struct NodeRef<T> {
    #[cfg_attr(feature = "ast", serde(flatten))]
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> cmp::Ord for NodeRef<T> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        Rc::as_ptr(&self.r).cmp(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::PartialOrd for NodeRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `#t`
    Len,
    /// `-x`
    Neg,
    /// `not x`
    Not,
    /// `~x` (Lua 5.3; not modeled)
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// `..`
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // Lua 5.3 operators the engine does not model.
    IDiv,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

/// A field of a table constructor. Only `Named` fields participate in
/// deduction; keyed and positional fields are not modeled.
#[derive(Debug)]
#[cfg_attr(feature = "ast", derive(serde::Serialize))]
pub enum TableField {
    /// `name = expr`
    Named {
        key: String,
        key_range: Range,
        value: Ref<Expr>,
    },
    /// `[expr] = expr`
    Keyed { key: Ref<Expr>, value: Ref<Expr> },
    /// array-style positional value
    Item { value: Ref<Expr> },
}

#[derive(Debug)]
#[cfg_attr(feature = "ast", derive(serde::Serialize))]
pub enum Expr {
    Nil {
        range: Range,
    },

    Bool {
        value: bool,
        range: Range,
    },

    Number {
        value: f64,
        range: Range,
    },

    String {
        value: String,
        range: Range,
    },

    /// `...` inside a variadic function; `name` is the bound parameter name.
    Vararg {
        name: String,
        range: Range,
    },

    Name {
        name: String,
        range: Range,
    },

    /// Reference to a registered named type, resolved independent of
    /// lexical scope (forward/alias type names).
    NamedRef {
        name: String,
        range: Range,
    },

    Unary {
        op: UnaryOp,
        expr: Ref<Expr>,
        range: Range,
    },

    Binary {
        op: BinOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
        range: Range,
    },

    Logical {
        op: LogicalOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
        range: Range,
    },

    Table {
        fields: Vec<TableField>,
        range: Range,
    },

    /// `base.field`; chains nest through `base`.
    Member {
        base: Ref<Expr>,
        field: String,
        field_range: Range,
        range: Range,
    },

    Call {
        base: Ref<Expr>,
        args: Vec<Ref<Expr>>,
        range: Range,
    },

    /// `f"s"` sugar for `f("s")`.
    StringCall {
        base: Ref<Expr>,
        arg: Ref<Expr>,
        range: Range,
    },

    /// Standalone `setmetatable(base, meta)` statement, synthesized by the
    /// scope builder.
    SetMetatable {
        base: Ref<Expr>,
        meta: Option<Ref<Expr>>,
        range: Range,
    },
}

impl Expr {
    pub const fn range(&self) -> Range {
        match *self {
            Self::Nil { range }
            | Self::Bool { range, .. }
            | Self::Number { range, .. }
            | Self::String { range, .. }
            | Self::Vararg { range, .. }
            | Self::Name { range, .. }
            | Self::NamedRef { range, .. }
            | Self::Unary { range, .. }
            | Self::Binary { range, .. }
            | Self::Logical { range, .. }
            | Self::Table { range, .. }
            | Self::Member { range, .. }
            | Self::Call { range, .. }
            | Self::StringCall { range, .. }
            | Self::SetMetatable { range, .. } => range,
        }
    }

    /// The callee name of a bare (non-member) call target.
    pub fn bare_name(&self) -> Option<&str> {
        match self {
            Self::Name { name, .. } => Some(name),
            _ => None,
        }
    }
}

pub type ExprRef = Ref<Expr>;

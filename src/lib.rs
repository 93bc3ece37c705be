// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod engine;
mod environment;
mod error;
mod interpreter;
mod scope;
mod symbols;
mod types;
mod utils;

pub use ast::{
    BinOp, Expr, ExprRef, LogicalOp, NodeRef, Range, Ref, TableField, UnaryOp,
};
pub use engine::Engine;
pub use environment::Environment;
pub use error::DeduceError;
pub use scope::Scope;
pub use symbols::{Symbol, SymbolKind};
pub use types::{FunctionType, LazyValue, LuaType, ModuleType, Param, TableType};

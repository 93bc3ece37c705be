//! The AST interpreter behind `type_of`/`deduce_type`.
//!
//! One [`Deducer`] is created per public query. It carries the set of
//! nodes currently being evaluated; re-entering a node terminates that
//! branch with no result instead of recursing, which is the only thing
//! standing between a reference cycle and unbounded recursion. The set is
//! keyed on node identity (`Ref` orders by pointer), lives in the pass and
//! never touches the shared AST, so independent passes cannot cross-talk.
//!
//! Every step returns `Result<Option<LuaType>, _>`: `Ok(None)` is "no
//! result" (cycle, unresolvable reference, unmodeled construct), `Err` is
//! an internal failure. Both are coerced to `any` at the engine boundary.

use crate::ast::{BinOp, Expr, ExprRef, LogicalOp, Range, TableField, UnaryOp};
use crate::environment::Environment;
use crate::error::DeduceError;
use crate::scope::Scope;
use crate::symbols::{Symbol, SymbolKind};
use crate::types::{FunctionType, LazyValue, LuaType, TableType};
use crate::utils;

use std::collections::BTreeSet;
use std::rc::Rc;

use log::debug;

pub(crate) type Deduction = Result<Option<LuaType>, DeduceError>;

pub(crate) struct Deducer<'a> {
    env: &'a Environment,
    in_progress: BTreeSet<ExprRef>,
}

impl<'a> Deducer<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self {
            env,
            in_progress: BTreeSet::new(),
        }
    }

    /// Resolved type of `symbol`, `any` at worst. Successful deductions
    /// are written back onto the symbol so repeat queries are cheap; `any`
    /// is never cached, leaving room for a later, better-informed attempt.
    pub fn type_of(&mut self, symbol: Option<&Symbol>) -> LuaType {
        let Some(symbol) = symbol else {
            return LuaType::Any;
        };

        let stored = symbol.ty();
        let was_lazy = stored.is_lazy();
        let ty = match self.deduce(&stored) {
            Ok(Some(ty)) => ty,
            Ok(None) => LuaType::Any,
            Err(err) => {
                debug!("deduction of '{}' failed: {err}", symbol.name());
                LuaType::Any
            }
        };

        if was_lazy {
            match &ty {
                LuaType::Module(_) => symbol.set_kind(SymbolKind::Module),
                LuaType::Table(_) => symbol.set_kind(SymbolKind::Class),
                LuaType::Function(_) => symbol.set_kind(SymbolKind::Function),
                _ => {}
            }
        }

        // An untyped parameter stays open for call-site refinement.
        if symbol.kind() == SymbolKind::Parameter && ty.is_any() {
            return ty;
        }

        if !ty.is_any() {
            symbol.set_ty(ty.clone());
        }
        ty
    }

    /// Resolve a possibly lazy type: resolved types pass through, lazies
    /// are interpreted until a resolved type is reached or the walk runs
    /// dry.
    pub fn deduce(&mut self, ty: &LuaType) -> Deduction {
        let LuaType::Lazy(lazy) = ty else {
            return Ok(Some(ty.clone()));
        };
        let node = lazy.node.clone();
        match self.parse_ast_node(&node, lazy)? {
            Some(next) => self.deduce(&next),
            None => Ok(None),
        }
    }

    /// Definition of `name` visible at `range` in document `uri`.
    pub fn find_def(&mut self, name: &str, uri: &str, range: Range) -> Option<Symbol> {
        let module = self.env.document(uri)?;
        let module_ty = self.type_of(Some(&module));
        let module_ty = module_ty.as_module().ok()?.clone();
        let symbol = module_ty.get(name)?;
        if !symbol.is_local() || symbol.range().start <= range.start {
            Some(symbol)
        } else {
            None
        }
    }

    fn parse_ast_node(&mut self, node: &ExprRef, lz: &LazyValue) -> Deduction {
        if !self.in_progress.insert(node.clone()) {
            debug!("{}", DeduceError::CycleDetected(lz.name.clone()));
            return Ok(None);
        }
        let result = self.dispatch(node, lz);
        self.in_progress.remove(node);
        result
    }

    fn dispatch(&mut self, node: &ExprRef, lz: &LazyValue) -> Deduction {
        match node.as_ref() {
            // A nil literal is absence of information, not an error.
            Expr::Nil { .. } => Ok(Some(LuaType::Any)),
            Expr::Bool { .. } => Ok(Some(LuaType::Boolean)),
            Expr::Number { .. } => Ok(Some(LuaType::Number)),
            Expr::String { .. } => Ok(Some(LuaType::String)),
            Expr::NamedRef { name, .. } => Ok(self.env.named_type(name).map(|s| s.ty())),
            Expr::Name { name, range } => self.parse_identifier(name, *range, lz),
            Expr::Vararg { name, range } => self.parse_identifier(name, *range, lz),
            Expr::Unary { op, .. } => match op {
                UnaryOp::Len | UnaryOp::Neg => Ok(Some(LuaType::Number)),
                UnaryOp::Not => Ok(Some(LuaType::Boolean)),
                UnaryOp::BitNot => {
                    debug!("{}", DeduceError::UnsupportedConstruct("unary operator"));
                    Ok(None)
                }
            },
            Expr::Binary { op, .. } => Ok(binary_type(*op)),
            Expr::Logical { op, lhs, rhs, .. } => match op {
                // `a and b` takes the branch that determines the value
                // when the left operand is truthy.
                LogicalOp::And => self.parse_ast_node(rhs, lz),
                LogicalOp::Or => {
                    let left = LuaType::Lazy(Rc::new(lz.forward(lhs, lz.name.clone())));
                    let right = LuaType::Lazy(Rc::new(lz.forward(rhs, lz.name.clone())));
                    self.merge(&left, &right)
                }
            },
            Expr::Table { fields, .. } => self.parse_table_constructor(node, fields, lz),
            Expr::Member { .. } => self.parse_member_expression(node, lz),
            Expr::Call { base, args, .. } => self.parse_call_expression(base, args, lz),
            Expr::StringCall { base, arg, .. } => {
                self.parse_call_expression(base, std::slice::from_ref(arg), lz)
            }
            Expr::SetMetatable { base, meta, .. } => {
                self.parse_set_metatable_node(base, meta.as_ref(), lz)
            }
        }
    }

    fn parse_identifier(&mut self, name: &str, range: Range, lz: &LazyValue) -> Deduction {
        let scope = upgrade(lz)?;

        // A call-argument overlay refines identifiers, but never to `any`.
        if let Some(ty) = scope.arg_type(name) {
            if !ty.is_any() {
                return Ok(Some(ty));
            }
        }

        let symbol = scope
            .search(name, range, None)
            .or_else(|| self.env.global(name));
        match symbol {
            Some(symbol) => Ok(Some(self.type_of(Some(&symbol)))),
            None => Ok(None),
        }
    }

    /// Table constructor: string-keyed fields become entries, each typed
    /// eagerly from its value expression. Array-style and `[k] = v` fields
    /// are not modeled.
    fn parse_table_constructor(
        &mut self,
        node: &ExprRef,
        fields: &[TableField],
        lz: &LazyValue,
    ) -> Deduction {
        let scope = upgrade(lz)?;
        let table = TableType::new();
        for field in fields {
            let TableField::Named {
                key,
                key_range,
                value,
            } = field
            else {
                continue;
            };
            let ty = self.parse_ast_node(value, lz)?.unwrap_or(LuaType::Any);
            let entry = Symbol::new(
                key.as_str(),
                *key_range,
                node.range(),
                true,
                scope.uri(),
                SymbolKind::Property,
                ty,
            );
            table.set(key.clone(), entry);
        }
        Ok(Some(LuaType::Table(Rc::new(table))))
    }

    /// Walk a `name(.name)*` chain: the head resolves through scope search
    /// (globals as fallback), each subsequent segment through the current
    /// definition's table or module entries. A function definition with
    /// declared returns stands for its first return value.
    fn parse_member_expression(&mut self, node: &ExprRef, lz: &LazyValue) -> Deduction {
        let Some(names) = utils::base_names(node) else {
            return Ok(None);
        };
        let scope = upgrade(lz)?;

        let head = names[0].0.as_str();
        let pred = |s: &Symbol| s.name() == head;
        let mut def = match scope
            .search(head, node.range(), Some(&pred))
            .or_else(|| self.env.global(head))
        {
            Some(symbol) => symbol,
            None => {
                debug!("{}", DeduceError::UnresolvableReference(head.to_string()));
                return Ok(None);
            }
        };

        for (name, _) in &names[1..] {
            let mut ty = self.type_of(Some(&def));
            let first_return = match &ty {
                LuaType::Function(f) => f.returns.first().cloned(),
                _ => None,
            };
            if let Some(first) = first_return {
                def = first;
                ty = self.type_of(Some(&def));
            }
            def = match &ty {
                LuaType::Table(table) => match self.search_table_entry(table.clone(), name) {
                    Some(entry) => entry,
                    None => return Ok(None),
                },
                LuaType::Module(module) => match module.get(name) {
                    Some(entry) => entry,
                    None => return Ok(None),
                },
                _ => return Ok(None),
            };
        }

        Ok(Some(self.type_of(Some(&def))))
    }

    /// Entry lookup with prototype-chain fallback: a miss in the table's
    /// own entries follows `metatable.entries.__index`, recursively,
    /// bounded by a visited set.
    fn search_table_entry(&mut self, table: Rc<TableType>, name: &str) -> Option<Symbol> {
        let mut visited: Vec<*const TableType> = vec![];
        let mut cur = table;
        loop {
            if visited.contains(&Rc::as_ptr(&cur)) {
                debug!(
                    "{}",
                    DeduceError::CycleDetected(format!("metatable chain of '{name}'"))
                );
                return None;
            }
            visited.push(Rc::as_ptr(&cur));

            if let Some(found) = cur.get(name) {
                return Some(found);
            }
            let meta = cur.metatable()?;
            let meta_ty = self.type_of(Some(&meta));
            let meta_table = match &meta_ty {
                LuaType::Table(t) => t.clone(),
                _ => return None,
            };
            let index = meta_table.get("__index")?;
            let index_ty = self.type_of(Some(&index));
            cur = match &index_ty {
                LuaType::Table(t) => t.clone(),
                _ => return None,
            };
        }
    }

    fn parse_call_expression(&mut self, base: &ExprRef, args: &[ExprRef], lz: &LazyValue) -> Deduction {
        let Some(callee) = self.parse_member_expression(base, lz)? else {
            return Ok(None);
        };
        let LuaType::Function(ftype) = callee else {
            return Ok(None);
        };

        let fname = base.bare_name();
        if fname == Some("require") {
            return self.parse_require(args);
        }
        if fname == Some("setmetatable") {
            return self.parse_set_metatable_call(args, lz);
        }

        let Some(slot) = ftype.returns.get(lz.index) else {
            return self.unwrap_tail_call(&ftype, lz);
        };
        let slot_ty = slot.ty();

        if !slot_ty.is_lazy() {
            if slot_ty.is_table() && slot.is_local() {
                return Ok(Some(Self::inherit_from(slot)));
            }
            return Ok(Some(slot_ty));
        }

        // Deduce actual argument types so the declared return expression
        // can be refined by them; the overlay lives on the return lazy's
        // context only for this one deduction.
        let mut overlay = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(ftype.params.iter()) {
            let ty = self.parse_ast_node(arg, lz)?.unwrap_or(LuaType::Any);
            overlay.push((param.name.clone(), ty));
        }

        let ret_scope = slot_ty.as_lazy().ok().and_then(|l| l.context.upgrade());
        if let Some(scope) = &ret_scope {
            scope.install_arg_types(overlay);
        }
        let ret = self.deduce(&slot_ty);
        if let Some(scope) = &ret_scope {
            scope.remove_arg_types();
        }
        let ret = ret?.unwrap_or(LuaType::Any);

        if ret.is_table() && slot.is_local() {
            return Ok(Some(Self::inherit_from(slot)));
        }
        Ok(Some(ret))
    }

    /// When a call's declared slots don't cover the requested index, the
    /// function's last declared slot holds the tail call's first value, so
    /// caller slot `len-1+k` maps to slot `k` of the tail target.
    fn unwrap_tail_call(&mut self, ftype: &FunctionType, lz: &LazyValue) -> Deduction {
        let Some(tail) = &ftype.tail_call else {
            return Ok(Some(LuaType::Any));
        };
        match tail {
            LuaType::Lazy(t) => {
                let index = (lz.index + 1).saturating_sub(ftype.returns.len());
                let rebased = LuaType::Lazy(Rc::new(t.rebased(index)));
                self.deduce(&rebased)
            }
            other => {
                let tail = other.clone();
                self.deduce(&tail)
            }
        }
    }

    /// A fresh table that transparently falls back to the declared return
    /// table: its metatable exposes one entry, `__index`, aliasing the
    /// return-slot symbol. Call-site additions never reach the original.
    fn inherit_from(slot: &Symbol) -> LuaType {
        let meta_table = TableType::new();
        meta_table.set("__index", slot.clone());
        let meta = Symbol::new(
            "__metatable",
            slot.range(),
            slot.scope_range(),
            true,
            slot.uri(),
            SymbolKind::Table,
            LuaType::Table(Rc::new(meta_table)),
        );
        let table = TableType::new();
        table.set_metatable(meta);
        LuaType::Table(Rc::new(table))
    }

    /// Best-effort `require`: first registered document whose identifier
    /// contains the short path wins; otherwise the module short-name is
    /// tried as a global.
    fn parse_require(&mut self, args: &[ExprRef]) -> Deduction {
        let Some(first) = args.first() else {
            return Ok(None);
        };
        let Expr::String { value: path, .. } = first.as_ref() else {
            debug!(
                "{}",
                DeduceError::UnsupportedConstruct("non-literal require path")
            );
            return Ok(None);
        };
        let Some(name) = utils::module_name(path) else {
            return Ok(None);
        };
        let short = utils::short_path(path);

        if let Some(docs) = self.env.packages_of(name) {
            for (uri, module) in docs {
                if uri.contains(&short) {
                    debug!("require('{path}') resolved to {uri}");
                    let ret = module
                        .ty()
                        .as_module()
                        .ok()
                        .and_then(|m| m.return_symbol());
                    return Ok(ret.map(|s| s.ty()));
                }
            }
        }

        Ok(self.env.global(name).map(|s| s.ty()))
    }

    /// `setmetatable` reached through call-return inference. Only
    /// meaningful while a call-argument overlay is active; the standalone
    /// node form owns the statement position.
    fn parse_set_metatable_call(&mut self, args: &[ExprRef], lz: &LazyValue) -> Deduction {
        let scope = upgrade(lz)?;
        if !scope.has_arg_types() {
            return Ok(None);
        }
        let Some(base_node) = args.first() else {
            return Ok(None);
        };
        let base = self.deduce(&LuaType::Lazy(Rc::new(lz.forward(base_node, lz.name.clone()))))?;
        let Some(LuaType::Table(base)) = base else {
            return Ok(None);
        };
        if let Some(meta_node) = args.get(1) {
            let meta = self.deduce(&LuaType::Lazy(Rc::new(lz.forward(meta_node, "__mt"))))?;
            if let Some(LuaType::Table(meta_table)) = meta {
                attach_metatable(&base, meta_table, meta_node.range(), &scope);
            }
        }
        Ok(Some(LuaType::Table(base)))
    }

    /// Standalone `setmetatable(base, meta)` statement.
    fn parse_set_metatable_node(
        &mut self,
        base: &ExprRef,
        meta: Option<&ExprRef>,
        lz: &LazyValue,
    ) -> Deduction {
        let scope = upgrade(lz)?;
        let base_ty = self.deduce(&LuaType::Lazy(Rc::new(lz.forward(base, lz.name.clone()))))?;
        let Some(LuaType::Table(table)) = base_ty else {
            return Ok(None);
        };
        if let Some(meta_node) = meta {
            let meta_ty = self.deduce(&LuaType::Lazy(Rc::new(lz.forward(meta_node, "__mt"))))?;
            if let Some(LuaType::Table(meta_table)) = meta_ty {
                attach_metatable(&table, meta_table, meta_node.range(), &scope);
            }
        }
        Ok(Some(LuaType::Table(table)))
    }

    /// The strictly higher rank wins; ties break toward the left operand.
    fn merge(&mut self, left: &LuaType, right: &LuaType) -> Deduction {
        let lt = self.deduce(left)?.unwrap_or(LuaType::Any);
        let rt = self.deduce(right)?.unwrap_or(LuaType::Any);
        Ok(Some(if rt.rank() > lt.rank() { rt } else { lt }))
    }
}

fn upgrade(lz: &LazyValue) -> Result<Rc<Scope>, DeduceError> {
    lz.context.upgrade().ok_or_else(|| {
        DeduceError::Internal(format!("deduction context of '{}' dropped", lz.name))
    })
}

fn attach_metatable(base: &Rc<TableType>, meta: Rc<TableType>, range: Range, scope: &Rc<Scope>) {
    let meta_sym = Symbol::new(
        "__mt",
        range,
        range,
        true,
        scope.uri(),
        SymbolKind::Table,
        LuaType::Table(meta),
    );
    base.set_metatable(meta_sym);
}

// Operator overloading is not modeled.
const fn binary_type(op: BinOp) -> Option<LuaType> {
    match op {
        BinOp::Concat => Some(LuaType::String),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            Some(LuaType::Boolean)
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod | BinOp::Pow => {
            Some(LuaType::Number)
        }
        _ => None,
    }
}

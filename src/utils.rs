use crate::ast::{Expr, Range};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Trailing word-sequence of a module path: the segment after the
    /// last delimiter, keeping interior dashes ("a.b-c" -> "b-c").
    static ref MODULE_NAME: Regex = Regex::new(r"\w+(-\w+)*$").expect("valid regex");
}

/// Flatten a member-access chain into its path of identifiers, leftmost
/// first. Returns `None` for anything that is not a simple
/// `name(.name)*` chain (e.g. an intervening call).
pub(crate) fn base_names(expr: &Expr) -> Option<Vec<(String, Range)>> {
    let mut comps = vec![];
    let mut cur = Some(expr);
    while let Some(e) = cur {
        match e {
            Expr::Member {
                base,
                field,
                field_range,
                ..
            } => {
                comps.push((field.clone(), *field_range));
                cur = Some(base.as_ref());
            }
            Expr::Name { name, range } => {
                comps.push((name.clone(), *range));
                cur = None;
            }
            _ => return None,
        }
    }
    comps.reverse();
    Some(comps)
}

/// Module short-name of a `require` path literal.
pub(crate) fn module_name(path: &str) -> Option<&str> {
    MODULE_NAME.find(path).map(|m| m.as_str())
}

/// The path literal with dots replaced by path separators, for matching
/// against document identifiers.
pub(crate) fn short_path(path: &str) -> String {
    path.replace('.', "/")
}

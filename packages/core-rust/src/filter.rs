//! Optional-filter elision.
//!
//! A template phrases every optional filter as a trailing equality test,
//! `column = :name`. When the caller leaves `name` empty (or omits it), that
//! test is rewritten to `column = 1=1` and `name` is dropped from the bind
//! map. Present values are always bound and never written into the SQL text.

use crate::placeholder;
use crate::types::{BindMap, ParamMap};

/// Replacement for an absent placeholder.
pub const TAUTOLOGY: &str = "1=1";

/// The full text an elided comparison leaves behind after its left operand.
pub const ELIDED_COMPARISON: &str = "= 1=1";

/// A template with absent filters elided, ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub binds: BindMap,
}

/// Applies the elision rule to `template` for the given filters.
///
/// A filter is present when its value is non-empty. Every placeholder in the
/// template that is not present has each `= :name` occurrence replaced with
/// `= 1=1`; other phrasings of the same placeholder are left alone. The
/// returned bind map holds exactly the present filters, values unchanged.
#[must_use]
pub fn build(template: &str, filters: &ParamMap) -> BuiltQuery {
    let binds: BindMap = filters
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let sql = placeholder::rewrite(template, |p, before| {
        (!binds.contains_key(p.name) && before.ends_with("= ")).then(|| TAUTOLOGY.to_string())
    });

    let elided = placeholder::names(template)
        .into_iter()
        .filter(|name| !binds.contains_key(*name))
        .count();
    tracing::debug!(present = binds.len(), elided, "built filtered query");

    BuiltQuery { sql, binds }
}

/// Replaces every elided comparison (`= 1=1`) outside literals and comments
/// with `replacement`, which takes over the whole `= 1=1` text.
///
/// Backends whose grammar rejects `column = 1=1` use this to substitute a
/// postfix predicate that is always true for the same left operand. Matches
/// directly after another comparison character (`<= 1=1`) or followed by
/// more of a number (`= 1=10`) are left alone.
#[must_use]
pub fn replace_elided(sql: &str, replacement: &str) -> String {
    let bytes = sql.as_bytes();
    let needle = ELIDED_COMPARISON.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(next) = placeholder::skip_non_code(bytes, i) {
            i = next;
            continue;
        }
        let after = i + needle.len();
        let matches = bytes[i..].starts_with(needle)
            && !(i > 0 && matches!(bytes[i - 1], b'<' | b'>' | b'!' | b'='))
            && !bytes
                .get(after)
                .is_some_and(|&b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.'));
        if matches {
            out.push_str(&sql[cursor..i]);
            out.push_str(replacement);
            cursor = after;
            i = after;
        } else {
            i += 1;
        }
    }

    out.push_str(&sql[cursor..]);
    out
}

//! Named placeholder scanning for SQL templates.
//!
//! Templates use `:name` placeholders. The scanner is lexical only: it skips
//! single-quoted literals, double-quoted identifiers, `--` and `/* */`
//! comments and `::` casts, so `'HH24:MI:SS'` or `x::int` never yield
//! placeholders. It is not a SQL parser.

use std::ops::Range;

use crate::error::MissingBind;
use crate::types::BindMap;

/// One `:name` occurrence in a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Name without the leading colon.
    pub name: &'a str,
    /// Byte range covering the colon and the name.
    pub span: Range<usize>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// If a quoted literal, quoted identifier or comment starts at `i`, returns
/// the index just past it (clamped to `bytes.len()`).
#[must_use]
pub fn skip_non_code(bytes: &[u8], i: usize) -> Option<usize> {
    let end = match bytes[i] {
        quote @ (b'\'' | b'"') => {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j] != quote {
                j += 1;
            }
            j + 1
        }
        b'-' if bytes.get(i + 1) == Some(&b'-') => {
            let mut j = i;
            while j < bytes.len() && bytes[j] != b'\n' {
                j += 1;
            }
            j
        }
        b'/' if bytes.get(i + 1) == Some(&b'*') => {
            let mut j = i + 2;
            while j + 1 < bytes.len() && !(bytes[j] == b'*' && bytes[j + 1] == b'/') {
                j += 1;
            }
            j + 2
        }
        _ => return None,
    };
    Some(end.min(bytes.len()))
}

/// Returns every placeholder occurrence in `sql`, in text order.
#[must_use]
pub fn scan(sql: &str) -> Vec<Placeholder<'_>> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if let Some(next) = skip_non_code(bytes, i) {
            i = next;
            continue;
        }
        match bytes[i] {
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            b':' if bytes.get(i + 1).copied().is_some_and(is_ident_start) => {
                let start = i;
                i += 1;
                while i < bytes.len() && is_ident_continue(bytes[i]) {
                    i += 1;
                }
                found.push(Placeholder {
                    name: &sql[start + 1..i],
                    span: start..i,
                });
            }
            _ => i += 1,
        }
    }

    found
}

/// Distinct placeholder names in first-seen order.
#[must_use]
pub fn names(sql: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for p in scan(sql) {
        if !out.contains(&p.name) {
            out.push(p.name);
        }
    }
    out
}

/// Replaces each placeholder for which `replace` returns `Some` and leaves
/// the rest of the text untouched.
pub fn rewrite<F>(sql: &str, mut replace: F) -> String
where
    F: FnMut(&Placeholder<'_>, &str) -> Option<String>,
{
    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;
    for p in scan(sql) {
        if let Some(replacement) = replace(&p, &sql[..p.span.start]) {
            out.push_str(&sql[cursor..p.span.start]);
            out.push_str(&replacement);
            cursor = p.span.end;
        }
    }
    out.push_str(&sql[cursor..]);
    out
}

/// SQL text with positional (`$1`, `$2`, ...) placeholders and the values
/// to bind in position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalSql {
    pub sql: String,
    pub values: Vec<String>,
}

/// Rewrites named placeholders to `$n` for drivers without named binds.
///
/// Repeated names share one position. Binds not referenced by the text are
/// ignored.
///
/// # Errors
///
/// Returns [`MissingBind`] when the text references a name with no value.
pub fn to_positional(sql: &str, binds: &BindMap) -> Result<PositionalSql, MissingBind> {
    to_positional_with(sql, binds, |idx| format!("${}", idx + 1))
}

/// Like [`to_positional`], but `render` produces the text for the
/// zero-based position, e.g. to wrap `$n` in a cast.
///
/// # Errors
///
/// Returns [`MissingBind`] when the text references a name with no value.
pub fn to_positional_with<F>(
    sql: &str,
    binds: &BindMap,
    mut render: F,
) -> Result<PositionalSql, MissingBind>
where
    F: FnMut(usize) -> String,
{
    let order = names(sql);
    let mut values = Vec::with_capacity(order.len());
    for name in &order {
        let value = binds.get(*name).ok_or_else(|| MissingBind {
            name: (*name).to_string(),
        })?;
        values.push(value.clone());
    }

    let sql = rewrite(sql, |p, _| {
        order.iter().position(|n| *n == p.name).map(&mut render)
    });

    Ok(PositionalSql { sql, values })
}

/// Whether `value` is a plain (optionally schema-qualified) SQL identifier.
///
/// Used for every name spliced into statement text that is not a bind:
/// target tables, row id columns and role names.
#[must_use]
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|part| {
            let bytes = part.as_bytes();
            !bytes.is_empty()
                && is_ident_start(bytes[0])
                && bytes[1..]
                    .iter()
                    .all(|&b| is_ident_continue(b) || b == b'$' || b == b'#')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_finds_names_and_spans() {
        let sql = "SELECT * FROM t WHERE a = :p AND b = :q_2";
        let found = scan(sql);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "p");
        assert_eq!(&sql[found[0].span.clone()], ":p");
        assert_eq!(found[1].name, "q_2");
    }

    #[test]
    fn scan_skips_literals_comments_and_casts() {
        let sql = "SELECT x::int, TO_TIMESTAMP(:v, 'DD/MM/YYYY HH24:MI:SS') \
                   FROM \"t:odd\" -- :ignored\n WHERE y = :w /* :nope */";
        assert_eq!(names(sql), vec!["v", "w"]);
    }

    #[test]
    fn scan_ignores_numeric_and_trailing_colons() {
        assert!(scan("SELECT :1, a: FROM t WHERE b = :").is_empty());
    }

    #[test]
    fn names_are_distinct_in_first_seen_order() {
        let sql = "a = :b OR c = :a OR d = :b";
        assert_eq!(names(sql), vec!["b", "a"]);
    }

    #[test]
    fn positional_rewrite_reuses_indices() {
        let mut binds = BindMap::new();
        binds.insert("id".into(), "7".into());
        binds.insert("name".into(), "x".into());
        binds.insert("unused".into(), "z".into());

        let out = to_positional("a = :name AND b = :id OR c = :name", &binds).unwrap();
        assert_eq!(out.sql, "a = $1 AND b = $2 OR c = $1");
        assert_eq!(out.values, vec!["x".to_string(), "7".to_string()]);
    }

    #[test]
    fn positional_rewrite_with_custom_render() {
        let mut binds = BindMap::new();
        binds.insert("id".into(), "7".into());
        binds.insert("name".into(), "x".into());

        let out = to_positional_with("a = :id AND b = :name AND c = :id", &binds, |idx| {
            if idx == 0 {
                "CAST($1 AS INT4)".to_string()
            } else {
                format!("${}", idx + 1)
            }
        })
        .unwrap();
        assert_eq!(
            out.sql,
            "a = CAST($1 AS INT4) AND b = $2 AND c = CAST($1 AS INT4)"
        );
        assert_eq!(out.values, vec!["7".to_string(), "x".to_string()]);
    }

    #[test]
    fn skip_non_code_clamps_unterminated_spans() {
        let sql = b"a = 'open";
        assert_eq!(skip_non_code(sql, 4), Some(sql.len()));
        assert_eq!(skip_non_code(b"/* x", 0), Some(4));
        assert_eq!(skip_non_code(b"x", 0), None);
    }

    #[test]
    fn positional_rewrite_reports_missing_bind() {
        let err = to_positional("a = :gone", &BindMap::new()).unwrap_err();
        assert_eq!(err.name, "gone");
    }

    #[test]
    fn identifier_check() {
        assert!(is_identifier("ro_viagens"));
        assert!(is_identifier("app.ro_viagens"));
        assert!(is_identifier("ROLE$ADMIN"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("t; DROP TABLE x"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("a..b"));
        assert!(!is_identifier("\"quoted\""));
    }
}

//! Update compilation against a definition's column whitelist.
//!
//! [`compile_update`] turns the caller's column -> value map into SET
//! fragments using the definition's [`UpdateRules`]; [`UpdateStatement`]
//! joins them into the single per-row UPDATE text.

use crate::definition::{UpdateRules, VALUE_MARKER};
use crate::error::ValidationError;
use crate::placeholder;
use crate::types::{BindMap, ParamMap};

/// Bind name carrying the row identifier on each per-row execution.
pub const ROW_ID_BIND: &str = "p_rowid";

/// Prefix of the per-column value binds (`update_val_0`, `update_val_1`, ...).
pub const UPDATE_BIND_PREFIX: &str = "update_val_";

/// Whitelisted SET fragments and their value binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUpdate {
    /// One fragment per accepted column, in caller order.
    pub set_clauses: Vec<String>,
    /// `update_val_<i>` -> caller value.
    pub binds: BindMap,
    /// Requested columns that are not in the whitelist.
    pub skipped: Vec<String>,
}

/// Compiles the requested column updates against `rules`.
///
/// Columns are visited in caller order. A whitelisted column at position `i`
/// gets the bind `update_val_<i>` substituted for the rule's `:val_name`
/// marker. A column missing from `rules` is skipped and logged at warn level.
///
/// # Errors
///
/// - [`ValidationError::MalformedRule`] if a used rule does not contain
///   exactly one `:val_name` marker.
/// - [`ValidationError::NoValidColumns`] if no fragment was produced.
pub fn compile_update(
    rules: &UpdateRules,
    requested: &ParamMap,
) -> Result<CompiledUpdate, ValidationError> {
    let mut compiled = CompiledUpdate {
        set_clauses: Vec::new(),
        binds: BindMap::new(),
        skipped: Vec::new(),
    };

    for (i, (column, value)) in requested.iter().enumerate() {
        let Some(rule) = rules.get(column) else {
            tracing::warn!(
                column = %column,
                "ignoring update for column outside update_rules"
            );
            compiled.skipped.push(column.clone());
            continue;
        };

        let markers = placeholder::scan(rule)
            .iter()
            .filter(|p| p.name == VALUE_MARKER)
            .count();
        if markers != 1 {
            return Err(ValidationError::MalformedRule {
                column: column.clone(),
            });
        }

        let bind_name = format!("{UPDATE_BIND_PREFIX}{i}");
        let fragment = placeholder::rewrite(rule, |p, _| {
            (p.name == VALUE_MARKER).then(|| format!(":{bind_name}"))
        });

        compiled.set_clauses.push(fragment);
        compiled.binds.insert(bind_name, value.clone());
    }

    if compiled.set_clauses.is_empty() {
        return Err(ValidationError::NoValidColumns);
    }
    Ok(compiled)
}

/// The per-row UPDATE statement for one compiled update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatement {
    pub sql: String,
    pub binds: BindMap,
}

impl UpdateStatement {
    /// Builds `UPDATE <table> SET <c1>, <c2> WHERE <row_id_column> = :p_rowid`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidIdentifier`] if `table` or
    /// `row_id_column` is not a plain SQL identifier.
    pub fn new(
        table: &str,
        row_id_column: &str,
        compiled: CompiledUpdate,
    ) -> Result<Self, ValidationError> {
        for name in [table, row_id_column] {
            if !placeholder::is_identifier(name) {
                return Err(ValidationError::InvalidIdentifier {
                    value: name.to_string(),
                });
            }
        }

        let sql = format!(
            "UPDATE {table} SET {} WHERE {row_id_column} = :{ROW_ID_BIND}",
            compiled.set_clauses.join(", ")
        );
        Ok(Self {
            sql,
            binds: compiled.binds,
        })
    }

    /// Value binds plus `p_rowid` for one row.
    #[must_use]
    pub fn binds_for(&self, row_id: &str) -> BindMap {
        let mut binds = self.binds.clone();
        binds.insert(ROW_ID_BIND.to_string(), row_id.to_string());
        binds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn non_whitelisted_column_is_skipped() {
        let rules = map(&[("A", "A = :val_name")]);
        let compiled = compile_update(&rules, &map(&[("A", "1"), ("B", "2")])).unwrap();

        assert_eq!(compiled.set_clauses, vec!["A = :update_val_0".to_string()]);
        assert_eq!(compiled.binds.len(), 1);
        assert_eq!(compiled.binds["update_val_0"], "1");
        assert_eq!(compiled.skipped, vec!["B".to_string()]);
        assert!(compiled.set_clauses.iter().all(|c| !c.contains('B')));
        assert!(compiled.binds.values().all(|v| v != "2"));
    }

    #[test]
    fn nothing_whitelisted_fails() {
        let rules = map(&[("A", "A = :val_name")]);
        let err = compile_update(&rules, &map(&[("B", "2")])).unwrap_err();
        assert_eq!(err, ValidationError::NoValidColumns);

        let err = compile_update(&rules, &ParamMap::new()).unwrap_err();
        assert_eq!(err, ValidationError::NoValidColumns);
    }

    #[test]
    fn formatting_rule_wraps_bind() {
        let rules = map(&[(
            "END_AT",
            "END_AT = TO_TIMESTAMP(:val_name, 'DD/MM/YYYY HH24:MI:SS')",
        )]);
        let compiled = compile_update(&rules, &map(&[("END_AT", "01/02/2024 10:00:00")])).unwrap();
        assert_eq!(
            compiled.set_clauses[0],
            "END_AT = TO_TIMESTAMP(:update_val_0, 'DD/MM/YYYY HH24:MI:SS')"
        );
    }

    #[test]
    fn bind_suffix_follows_request_position() {
        let rules = map(&[("A", "A = :val_name"), ("C", "C = :val_name")]);
        let compiled =
            compile_update(&rules, &map(&[("C", "3"), ("B", "2"), ("A", "1")])).unwrap();
        assert_eq!(
            compiled.set_clauses,
            vec!["C = :update_val_0".to_string(), "A = :update_val_2".to_string()]
        );
        assert_eq!(compiled.binds["update_val_2"], "1");
    }

    #[test]
    fn rule_without_single_marker_is_rejected() {
        let rules = map(&[("A", "A = 5"), ("B", "B = :val_name + :val_name")]);
        assert_eq!(
            compile_update(&rules, &map(&[("A", "1")])).unwrap_err(),
            ValidationError::MalformedRule { column: "A".into() }
        );
        assert_eq!(
            compile_update(&rules, &map(&[("B", "1")])).unwrap_err(),
            ValidationError::MalformedRule { column: "B".into() }
        );
    }

    #[test]
    fn statement_text_and_row_binds() {
        let rules = map(&[("X", "X = :val_name")]);
        let compiled = compile_update(&rules, &map(&[("X", "5")])).unwrap();
        let stmt = UpdateStatement::new("t", "rowid", compiled).unwrap();

        assert_eq!(stmt.sql, "UPDATE t SET X = :update_val_0 WHERE rowid = :p_rowid");
        let binds = stmt.binds_for("AAA");
        assert_eq!(binds["update_val_0"], "5");
        assert_eq!(binds["p_rowid"], "AAA");
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn multiple_clauses_are_comma_joined() {
        let rules = map(&[("A", "A = :val_name"), ("B", "B = :val_name")]);
        let compiled = compile_update(&rules, &map(&[("A", "1"), ("B", "2")])).unwrap();
        let stmt = UpdateStatement::new("app.t", "id", compiled).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE app.t SET A = :update_val_0, B = :update_val_1 WHERE id = :p_rowid"
        );
    }

    #[test]
    fn statement_rejects_unsafe_table() {
        let rules = map(&[("A", "A = :val_name")]);
        let compiled = compile_update(&rules, &map(&[("A", "1")])).unwrap();
        let err = UpdateStatement::new("t; DELETE FROM t", "rowid", compiled).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidIdentifier { .. }));
    }
}

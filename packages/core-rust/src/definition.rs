//! Catalog record types.
//!
//! A [`QueryDefinition`] is one named, parameterized query plus the whitelist
//! of columns that may be written back to its target table. Definitions are
//! stored as a JSON array; keys this crate does not model are preserved in
//! [`QueryDefinition::extra`] so a rewrite of the catalog never drops
//! front-end metadata.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Allowed column -> SET-fragment template.
///
/// Each template contains exactly one [`VALUE_MARKER`]. The map is both the
/// update whitelist and the per-column formatting rule (e.g. wrapping the raw
/// value in a timestamp cast).
pub type UpdateRules = IndexMap<String, String>;

/// Placeholder that marks where the caller's value goes in an update rule.
pub const VALUE_MARKER: &str = "val_name";

/// Row identity column used when a definition does not name one.
pub const DEFAULT_ROW_ID_COLUMN: &str = "rowid";

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Unique key within the catalog.
    pub id: String,
    /// Display name.
    pub name: String,
    /// SQL template with `:name` placeholders. The first selected column is
    /// the opaque row identifier.
    pub sql: String,
    /// The only table updates derived from this query may touch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    /// Column matched against row identifiers in the update predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id_column: Option<String>,
    /// Column whitelist and SET-fragment templates.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub update_rules: UpdateRules,
    /// Keys not modelled here (parameter labels, descriptions, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl QueryDefinition {
    /// Creates a read-only definition with no update rules.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sql: sql.into(),
            target_table: None,
            row_id_column: None,
            update_rules: UpdateRules::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Makes the definition updatable against `table` with the given rules.
    #[must_use]
    pub fn with_updates<I, K, V>(mut self, table: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.target_table = Some(table.into());
        self.update_rules = rules
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Column used in the `WHERE <column> = :p_rowid` update predicate.
    #[must_use]
    pub fn row_id_column(&self) -> &str {
        self.row_id_column
            .as_deref()
            .unwrap_or(DEFAULT_ROW_ID_COLUMN)
    }

    /// Whether this definition may be used to drive updates at all.
    #[must_use]
    pub fn permits_updates(&self) -> bool {
        self.target_table.is_some() && !self.update_rules.is_empty()
    }

    /// The `{id, name}` projection shown in catalog listings.
    #[must_use]
    pub fn listing(&self) -> QueryListing {
        QueryListing {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Catalog listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryListing {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_definition() {
        let raw = r#"{"id":"q1","name":"Trips","sql":"SELECT a.rowid FROM t a"}"#;
        let def: QueryDefinition = serde_json::from_str(raw).unwrap();
        assert_eq!(def.id, "q1");
        assert!(def.target_table.is_none());
        assert!(def.update_rules.is_empty());
        assert!(!def.permits_updates());
        assert_eq!(def.row_id_column(), "rowid");
    }

    #[test]
    fn unknown_keys_survive_roundtrip() {
        let raw = r#"{
            "id": "q1",
            "name": "Trips",
            "sql": "SELECT 1",
            "params": [{"bind": "p", "label": "Date", "required": true}],
            "description": "daily trips"
        }"#;
        let def: QueryDefinition = serde_json::from_str(raw).unwrap();
        assert!(def.extra.contains_key("params"));

        let back = serde_json::to_value(&def).unwrap();
        assert_eq!(back["description"], "daily trips");
        assert_eq!(back["params"][0]["label"], "Date");
        assert!(back.get("target_table").is_none());
    }

    #[test]
    fn update_rules_keep_catalog_order() {
        let raw = r#"{
            "id": "q1", "name": "n", "sql": "s", "target_table": "t",
            "update_rules": {"B": "B = :val_name", "A": "A = :val_name"}
        }"#;
        let def: QueryDefinition = serde_json::from_str(raw).unwrap();
        let keys: Vec<&str> = def.update_rules.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["B", "A"]);
        assert!(def.permits_updates());
    }

    #[test]
    fn with_updates_sets_table_and_rules() {
        let def = QueryDefinition::new("q", "n", "SELECT 1")
            .with_updates("t", [("X", "X = :val_name")]);
        assert_eq!(def.target_table.as_deref(), Some("t"));
        assert_eq!(def.update_rules["X"], "X = :val_name");
        assert_eq!(def.listing(), QueryListing { id: "q".into(), name: "n".into() });
    }
}

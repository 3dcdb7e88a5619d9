//! OVSDB wire protocol types.
//!
//! A small subset of RFC 7047: the `insert` and `mutate` operations,
//! the equality condition, and the table-update shape shared by the
//! initial monitor reply and subsequent `update` notifications.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// The database all provisioning transactions run against.
pub const DATABASE: &str = "Open_vSwitch";

/// Table names used by provisioning.
pub mod table {
    /// Switch-level aggregation entity, owns a set of port references.
    pub const BRIDGE: &str = "Bridge";
    /// Port entity, owns a set of interface references.
    pub const PORT: &str = "Port";
    /// Interface entity carrying the device name and type tag.
    pub const INTERFACE: &str = "Interface";
}

/// A single operation within a transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    /// Insert a row, optionally naming it so later operations in the
    /// same transaction can reference it before a real UUID exists.
    Insert {
        /// Target table.
        table: String,
        /// Column values for the new row.
        row: Map<String, Value>,
        /// Temporary intra-transaction name for the inserted row.
        #[serde(rename = "uuid-name", skip_serializing_if = "Option::is_none")]
        uuid_name: Option<String>,
    },
    /// Apply mutations to every row matching the conditions.
    Mutate {
        /// Target table.
        table: String,
        /// Row selection; all conditions must hold.
        #[serde(rename = "where")]
        conditions: Vec<Condition>,
        /// Mutations applied to each matched row.
        mutations: Vec<Mutation>,
    },
}

/// A `[column, function, value]` condition triple.
#[derive(Debug, Clone, Serialize)]
pub struct Condition(pub String, pub Function, pub Value);

impl Condition {
    /// Condition matching rows whose `column` equals `value`.
    pub fn equals(column: &str, value: Value) -> Self {
        Self(column.to_string(), Function::Equals, value)
    }
}

/// Condition functions.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum Function {
    /// Column value equals the operand.
    #[serde(rename = "==")]
    Equals,
}

/// A `[column, mutator, value]` mutation triple.
#[derive(Debug, Clone, Serialize)]
pub struct Mutation(pub String, pub Mutator, pub Value);

impl Mutation {
    /// Mutation inserting `value` into the set held by `column`.
    pub fn insert(column: &str, value: Value) -> Self {
        Self(column.to_string(), Mutator::Insert, value)
    }
}

/// Mutators.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutator {
    /// Add elements to a set-valued column.
    Insert,
}

/// Reference to a row inserted earlier in the same transaction.
#[must_use]
pub fn named_uuid(name: &str) -> Value {
    json!(["named-uuid", name])
}

/// An OVSDB set literal.
#[must_use]
pub fn set(values: Vec<Value>) -> Value {
    json!(["set", values])
}

/// A row UUID as the database encodes it: `["uuid", "<id>"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidRef(pub String);

impl<'de> Deserialize<'de> for UuidRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (tag, id): (String, String) = Deserialize::deserialize(deserializer)?;
        if tag != "uuid" {
            return Err(serde::de::Error::custom(format!(
                "expected a [\"uuid\", ...] pair, got tag {tag:?}"
            )));
        }
        Ok(Self(id))
    }
}

/// Per-operation entry in a transaction reply.
///
/// The database reports success and failure operation by operation; a
/// reply may also carry trailing entries beyond the submitted
/// operations when the transaction as a whole was rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperationResult {
    /// Assigned row id, present for successful inserts.
    pub uuid: Option<UuidRef>,
    /// Rows affected, present for mutates and updates.
    pub count: Option<u64>,
    /// The database's error tag; empty or absent means success.
    pub error: Option<String>,
    /// Free-form diagnostic detail accompanying `error`.
    pub details: Option<String>,
}

impl OperationResult {
    /// Whether this entry reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// The `old`/`new` pair for one row within an update batch.
///
/// An absent or empty `new` value signifies deletion; anything else is
/// an insert-or-replace of the row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RowUpdate {
    /// Prior column values, present for modifications and deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Map<String, Value>>,
    /// New column values, absent for deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Map<String, Value>>,
}

/// A batch of row changes: table name -> row id -> old/new pair.
///
/// Both the initial monitor reply and every `update` notification use
/// this shape.
pub type TableUpdates = HashMap<String, HashMap<String, RowUpdate>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_wire_shape() {
        let mut row = Map::new();
        row.insert("name".to_string(), json!("veth1a2b3c4"));
        row.insert("type".to_string(), json!("internal"));
        let op = Operation::Insert {
            table: table::INTERFACE.to_string(),
            row,
            uuid_name: Some("intf".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({
                "op": "insert",
                "table": "Interface",
                "row": {"name": "veth1a2b3c4", "type": "internal"},
                "uuid-name": "intf",
            })
        );
    }

    #[test]
    fn mutate_wire_shape() {
        let op = Operation::Mutate {
            table: table::BRIDGE.to_string(),
            conditions: vec![Condition::equals("name", json!("br0"))],
            mutations: vec![Mutation::insert("ports", set(vec![named_uuid("port")]))],
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({
                "op": "mutate",
                "table": "Bridge",
                "where": [["name", "==", "br0"]],
                "mutations": [["ports", "insert", ["set", [["named-uuid", "port"]]]]],
            })
        );
    }

    #[test]
    fn operation_result_variants() {
        let ok: OperationResult =
            serde_json::from_value(json!({"uuid": ["uuid", "7a3c"]})).unwrap();
        assert_eq!(ok.uuid, Some(UuidRef("7a3c".to_string())));
        assert!(!ok.is_error());

        let counted: OperationResult = serde_json::from_value(json!({"count": 1})).unwrap();
        assert_eq!(counted.count, Some(1));

        let failed: OperationResult = serde_json::from_value(
            json!({"error": "constraint violation", "details": "duplicate name"}),
        )
        .unwrap();
        assert!(failed.is_error());
        assert_eq!(failed.details.as_deref(), Some("duplicate name"));

        let empty_error: OperationResult = serde_json::from_value(json!({"error": ""})).unwrap();
        assert!(!empty_error.is_error());
    }

    #[test]
    fn uuid_ref_rejects_wrong_tag() {
        let result = serde_json::from_value::<UuidRef>(json!(["named-uuid", "x"]));
        assert!(result.is_err());
    }

    #[test]
    fn row_update_deletion_shape() {
        let update: RowUpdate =
            serde_json::from_value(json!({"old": {"name": "veth0"}})).unwrap();
        assert!(update.new.is_none());
        assert!(update.old.is_some());
    }
}

//! Transactional creation of internal switch ports.

use serde_json::json;

use vport_common::{VportError, VportResult, generate_device_name};

use crate::protocol::{Condition, Mutation, Operation, OperationResult, named_uuid, set, table};
use crate::session::Session;

/// Temporary reference names linking the operations of one transaction.
const INTERFACE_REF: &str = "intf";
const PORT_REF: &str = "port";

/// Index of the bridge mutation within the submitted batch.
const MUTATE_INDEX: usize = 2;

/// Create an internal port on `bridge`, named from `prefix` plus a
/// random suffix, in a single atomic transaction.
///
/// The transaction inserts an Interface row and a Port row referencing
/// it, then mutates the Bridge row to include the new port. The name is
/// not checked against remote state beforehand; a collision surfaces as
/// a transaction error.
///
/// # Errors
///
/// Returns [`VportError::TransactionFailed`] if any operation in the
/// reply reports an error or the bridge mutation affected no rows. In
/// either case the candidate port must not be considered usable, even
/// if individual inserts reported success.
pub async fn create_internal_port(
    session: &Session,
    prefix: &str,
    bridge: &str,
) -> VportResult<String> {
    let name = generate_device_name(prefix)?;

    let interface_row = json!({"name": name, "type": "internal"});
    let port_row = json!({"name": name, "interfaces": named_uuid(INTERFACE_REF)});

    let operations = vec![
        Operation::Insert {
            table: table::INTERFACE.to_string(),
            row: interface_row.as_object().cloned().unwrap_or_default(),
            uuid_name: Some(INTERFACE_REF.to_string()),
        },
        Operation::Insert {
            table: table::PORT.to_string(),
            row: port_row.as_object().cloned().unwrap_or_default(),
            uuid_name: Some(PORT_REF.to_string()),
        },
        Operation::Mutate {
            table: table::BRIDGE.to_string(),
            conditions: vec![Condition::equals("name", json!(bridge))],
            mutations: vec![Mutation::insert("ports", set(vec![named_uuid(PORT_REF)]))],
        },
    ];
    let submitted = operations.len();

    let results = session.transact(operations).await?;
    validate_reply(&results, submitted, bridge)?;

    tracing::info!(port = %name, bridge, "Internal port created");
    Ok(name)
}

/// Check a transaction reply for overall success.
///
/// The reply must carry at least one entry per submitted operation, no
/// entry anywhere may report an error, and the bridge mutation must
/// have matched at least one row. A mutate whose condition matched
/// nothing is reported by the database as a success with `count` 0,
/// which would leave the new port attached to no bridge.
fn validate_reply(
    results: &[OperationResult],
    submitted: usize,
    bridge: &str,
) -> VportResult<()> {
    if results.len() < submitted {
        return Err(VportError::TransactionFailed {
            error: format!(
                "reply carries {} results for {} operations",
                results.len(),
                submitted
            ),
            details: None,
        });
    }

    for result in results {
        if result.is_error() {
            return Err(VportError::TransactionFailed {
                error: result.error.clone().unwrap_or_default(),
                details: result.details.clone(),
            });
        }
    }

    match results[MUTATE_INDEX].count {
        Some(count) if count >= 1 => Ok(()),
        _ => Err(VportError::TransactionFailed {
            error: "bridge mutation affected no rows".to_string(),
            details: Some(format!("no bridge named '{bridge}'")),
        }),
    }
}

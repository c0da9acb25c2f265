// Audit trail
// Every provisioning run and ledger mutation appends one entry, written in
// the same transaction as the change it records.

use crate::db::parse_timestamp;
use crate::error::CoreResult;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    EventProvisioned,
    SelectionsSaved,
    SelectionsConfirmed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::EventProvisioned => "event_provisioned",
            AuditAction::SelectionsSaved => "selections_saved",
            AuditAction::SelectionsConfirmed => "selections_confirmed",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditEntry {
    pub entry_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action: action.as_str().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn record_audit_entry(conn: &Connection, entry: &AuditEntry) -> CoreResult<()> {
    let data_json = entry.data.to_string();

    conn.execute(
        "INSERT INTO audit_log (
            entry_id, timestamp, action, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.entry_id,
            entry.timestamp.to_rfc3339(),
            entry.action,
            entry.entity_type,
            entry.entity_id,
            data_json,
            entry.actor,
        ],
    )?;

    Ok(())
}

/// Entries for one entity, oldest first
pub fn audit_entries_for(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> CoreResult<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, timestamp, action, entity_type, entity_id, data, actor
         FROM audit_log
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id",
    )?;

    let entries = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(AuditEntry {
                entry_id: row.get(0)?,
                timestamp: parse_timestamp(1, &timestamp_str)?,
                action: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;

    #[test]
    fn test_audit_log_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let entry = AuditEntry::new(
            AuditAction::SelectionsSaved,
            "event",
            "7",
            serde_json::json!({"selected": [1, 2]}),
            "account:100",
        );
        record_audit_entry(&conn, &entry).unwrap();

        let entries = audit_entries_for(&conn, "event", "7").unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "selections_saved");
        assert_eq!(entries[0].actor, "account:100");
        assert_eq!(entries[0].data["selected"][1], 2);
        assert!(audit_entries_for(&conn, "event", "8").unwrap().is_empty());
    }
}

// Selection Entity - a donor's tracked participation in one event
//
// Exactly one row per (donor, event). The row points at the binding of the
// fundraiser who owns the donor. Rows are never deleted.

use super::donor::{donor_from_row, Donor, DONOR_COLUMNS};
use super::ids::{DonorId, EventFundraiserId, EventId, SelectionId};
use crate::error::CoreResult;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SELECTION STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionState {
    /// Assigned to the event, not yet picked by the fundraiser
    Pending,

    /// Picked by the fundraiser, awaiting confirmation
    Selected,

    /// Confirmed for the event
    Confirmed,
}

impl SelectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionState::Pending => "pending",
            SelectionState::Selected => "selected",
            SelectionState::Confirmed => "confirmed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(SelectionState::Pending),
            "selected" => Some(SelectionState::Selected),
            "confirmed" => Some(SelectionState::Confirmed),
            _ => None,
        }
    }
}

impl fmt::Display for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for SelectionState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SelectionState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        SelectionState::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("unknown selection state '{}'", raw).into()))
    }
}

// ============================================================================
// SELECTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub id: SelectionId,
    pub donor_id: DonorId,
    pub event_id: EventId,
    pub event_fundraiser_id: EventFundraiserId,
    pub state: SelectionState,
}

/// A donor together with its selection state, as a fundraiser sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonorSelection {
    #[serde(flatten)]
    pub donor: Donor,
    pub state: SelectionState,
}

const SELECTION_COLUMNS: &str = "s.id, s.donor_id, s.event_id, s.event_fundraiser_id, s.state";

fn selection_from_row(row: &Row<'_>) -> rusqlite::Result<Selection> {
    Ok(Selection {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        event_id: row.get(2)?,
        event_fundraiser_id: row.get(3)?,
        state: row.get(4)?,
    })
}

// ============================================================================
// REPOSITORY (reads only; writes go through the ledger)
// ============================================================================

pub fn find_selection(
    conn: &Connection,
    donor_id: DonorId,
    event_id: EventId,
) -> CoreResult<Option<Selection>> {
    let sql = format!(
        "SELECT {} FROM selections s WHERE s.donor_id = ?1 AND s.event_id = ?2",
        SELECTION_COLUMNS
    );
    let selection = conn
        .query_row(&sql, rusqlite::params![donor_id, event_id], selection_from_row)
        .optional()?;
    Ok(selection)
}

pub fn selections_for_event(conn: &Connection, event_id: EventId) -> CoreResult<Vec<Selection>> {
    let sql = format!(
        "SELECT {} FROM selections s WHERE s.event_id = ?1 ORDER BY s.donor_id",
        SELECTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let selections = stmt
        .query_map([event_id], selection_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(selections)
}

pub fn selections_for_binding(
    conn: &Connection,
    binding: EventFundraiserId,
) -> CoreResult<Vec<Selection>> {
    let sql = format!(
        "SELECT {} FROM selections s WHERE s.event_fundraiser_id = ?1 ORDER BY s.donor_id",
        SELECTION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let selections = stmt
        .query_map([binding], selection_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(selections)
}

/// Donors held under one binding, joined with their state
pub fn donors_for_binding(
    conn: &Connection,
    binding: EventFundraiserId,
) -> CoreResult<Vec<DonorSelection>> {
    let sql = format!(
        "SELECT {}, s.state FROM selections s
         JOIN donors d ON d.id = s.donor_id
         WHERE s.event_fundraiser_id = ?1
         ORDER BY d.id",
        DONOR_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([binding], |row| {
            Ok(DonorSelection {
                donor: donor_from_row(row)?,
                state: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_text_roundtrip() {
        for state in [
            SelectionState::Pending,
            SelectionState::Selected,
            SelectionState::Confirmed,
        ] {
            assert_eq!(SelectionState::parse(state.as_str()), Some(state));
        }
        assert_eq!(SelectionState::parse("rejected"), None);
    }

    #[test]
    fn test_unknown_state_in_storage_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        let result: rusqlite::Result<SelectionState> =
            conn.query_row("SELECT 'archived'", [], |row| row.get(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SelectionState::Confirmed).unwrap(),
            "\"confirmed\""
        );
    }
}

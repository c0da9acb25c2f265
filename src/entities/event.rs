// Event Entity - a fundraising occasion
//
// Created once by provisioning and never updated afterwards.

use super::fundraiser::{fundraiser_from_row, Fundraiser, FUNDRAISER_COLUMNS};
use super::ids::{EventId, FundraiserId};
use crate::db::parse_timestamp;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,

    /// Free-text venue; last comma-separated segment is the city
    pub location: String,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// Target number of donors to select
    pub expected_selection: u32,

    pub organizer_id: FundraiserId,
}

/// Everything needed to create an event, before it has an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub expected_selection: u32,
    pub organizer_id: FundraiserId,
}

impl EventDraft {
    /// Reject drafts that cannot describe a real event
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("event name is empty"));
        }
        if self.end_time < self.start_time {
            return Err(CoreError::validation(format!(
                "event ends ({}) before it starts ({})",
                self.end_time.to_rfc3339(),
                self.start_time.to_rfc3339()
            )));
        }
        Ok(())
    }
}

pub(crate) const EVENT_COLUMNS: &str =
    "e.id, e.name, e.location, e.start_time, e.end_time, e.expected_selection, e.organizer_id";

/// Number of columns in EVENT_COLUMNS, for queries that select more after them
pub(crate) const EVENT_COLUMN_COUNT: usize = 7;

pub(crate) fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let start_raw: String = row.get(3)?;
    let end_raw: String = row.get(4)?;

    Ok(Event {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        start_time: parse_timestamp(3, &start_raw)?,
        end_time: parse_timestamp(4, &end_raw)?,
        expected_selection: row.get(5)?,
        organizer_id: row.get(6)?,
    })
}

// ============================================================================
// REPOSITORY
// ============================================================================

pub fn insert_event(conn: &Connection, draft: &EventDraft) -> CoreResult<EventId> {
    conn.execute(
        "INSERT INTO events (
            name, location, start_time, end_time, expected_selection, organizer_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            draft.name,
            draft.location,
            draft.start_time.to_rfc3339(),
            draft.end_time.to_rfc3339(),
            draft.expected_selection,
            draft.organizer_id,
        ],
    )?;
    Ok(EventId(conn.last_insert_rowid()))
}

pub fn find_event_by_id(conn: &Connection, id: EventId) -> CoreResult<Option<Event>> {
    let sql = format!("SELECT {} FROM events e WHERE e.id = ?1", EVENT_COLUMNS);
    let event = conn.query_row(&sql, [id], event_from_row).optional()?;
    Ok(event)
}

pub fn list_events(conn: &Connection) -> CoreResult<Vec<Event>> {
    let sql = format!(
        "SELECT {} FROM events e ORDER BY e.start_time, e.id",
        EVENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map([], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

/// Fundraisers bound to an event, in binding order
pub fn assigned_fundraisers(conn: &Connection, event_id: EventId) -> CoreResult<Vec<Fundraiser>> {
    let sql = format!(
        "SELECT {} FROM event_fundraisers ef
         JOIN fundraisers f ON f.id = ef.fundraiser_id
         WHERE ef.event_id = ?1
         ORDER BY ef.id",
        FUNDRAISER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let fundraisers = stmt
        .query_map([event_id], fundraiser_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fundraisers)
}

/// Events a fundraiser is bound to, earliest first
pub fn bound_events(
    conn: &Connection,
    fundraiser_id: FundraiserId,
) -> CoreResult<Vec<Event>> {
    let sql = format!(
        "SELECT {} FROM event_fundraisers ef
         JOIN events e ON e.id = ef.event_id
         WHERE ef.fundraiser_id = ?1
         ORDER BY e.start_time, e.id",
        EVENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map([fundraiser_id], event_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

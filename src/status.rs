// Event Status Aggregator
//
// An event is finished when every fundraiser bound to it has at least one
// confirmed selection under its binding; otherwise it is waiting. An event
// with no bindings counts as finished.

use crate::entities::event::{event_from_row, EVENT_COLUMNS, EVENT_COLUMN_COUNT};
use crate::entities::{Event, EventId};
use crate::error::CoreResult;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

/// One event with its confirmation counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStatus {
    #[serde(flatten)]
    pub event: Event,

    /// Distinct fundraisers bound to the event
    pub total_fundraisers: u32,

    /// Bound fundraisers with at least one confirmed selection
    pub fundraisers_with_confirmed: u32,
}

impl EventStatus {
    pub fn is_finished(&self) -> bool {
        self.fundraisers_with_confirmed == self.total_fundraisers
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStatusBreakdown {
    pub finished: Vec<EventStatus>,
    pub waiting: Vec<EventStatus>,
}

impl EventStatusBreakdown {
    pub fn finished_ids(&self) -> Vec<EventId> {
        self.finished.iter().map(|s| s.event.id).collect()
    }

    pub fn waiting_ids(&self) -> Vec<EventId> {
        self.waiting.iter().map(|s| s.event.id).collect()
    }
}

/// Classify every event as finished or waiting from one read snapshot.
pub fn compute_event_status(conn: &mut Connection) -> CoreResult<EventStatusBreakdown> {
    // A read transaction pins one snapshot; a confirm committing meanwhile
    // is either fully visible or not at all.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

    let sql = format!(
        "WITH bound AS (
            SELECT
                ef.event_id,
                ef.fundraiser_id,
                EXISTS (
                    SELECT 1 FROM selections s
                    WHERE s.event_fundraiser_id = ef.id
                      AND s.state = 'confirmed'
                ) AS has_confirmed
            FROM event_fundraisers ef
        )
        SELECT
            {},
            COUNT(DISTINCT b.fundraiser_id) AS total_fundraisers,
            COUNT(DISTINCT CASE WHEN b.has_confirmed THEN b.fundraiser_id END)
                AS fundraisers_with_confirmed
        FROM events e
        LEFT JOIN bound b ON b.event_id = e.id
        GROUP BY e.id
        ORDER BY e.start_time, e.id",
        EVENT_COLUMNS
    );

    let statuses = {
        let mut stmt = tx.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EventStatus {
                    event: event_from_row(row)?,
                    total_fundraisers: row.get(EVENT_COLUMN_COUNT)?,
                    fundraisers_with_confirmed: row.get(EVENT_COLUMN_COUNT + 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    tx.commit()?;

    let (finished, waiting): (Vec<_>, Vec<_>) =
        statuses.into_iter().partition(EventStatus::is_finished);

    debug!(
        finished = finished.len(),
        waiting = waiting.len(),
        "Computed event status"
    );

    Ok(EventStatusBreakdown { finished, waiting })
}

// Event-Fundraiser Binder
// Insert-or-fetch of the (event, fundraiser) binding

use crate::entities::{EventFundraiserId, EventId, FundraiserId};
use crate::error::CoreResult;
use rusqlite::{params, Connection, OptionalExtension};

/// Return the binding for (event, fundraiser), creating it on first use.
///
/// Relies on UNIQUE(event_id, fundraiser_id): the insert is a no-op when the
/// row exists, so two provisioning runs racing on the same pair both end up
/// with the single row.
pub fn ensure_binding(
    conn: &Connection,
    event_id: EventId,
    fundraiser_id: FundraiserId,
) -> CoreResult<EventFundraiserId> {
    conn.execute(
        "INSERT INTO event_fundraisers (event_id, fundraiser_id) VALUES (?1, ?2)
         ON CONFLICT (event_id, fundraiser_id) DO NOTHING",
        params![event_id, fundraiser_id],
    )?;

    let id = conn.query_row(
        "SELECT id FROM event_fundraisers WHERE event_id = ?1 AND fundraiser_id = ?2",
        params![event_id, fundraiser_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Existing binding for (event, fundraiser), without creating one
pub fn find_binding(
    conn: &Connection,
    event_id: EventId,
    fundraiser_id: FundraiserId,
) -> CoreResult<Option<EventFundraiserId>> {
    let id = conn
        .query_row(
            "SELECT id FROM event_fundraisers WHERE event_id = ?1 AND fundraiser_id = ?2",
            params![event_id, fundraiser_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_connection, count_rows, open_database, setup_database, Table};
    use crate::entities::insert_event;
    use crate::fixtures::{draft, seed, seeded_connection, ALICE, BRUNO};
    use rusqlite::TransactionBehavior;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_ensure_binding_is_idempotent() {
        let conn = seeded_connection();
        let event = insert_event(&conn, &draft("Gala", "Vancouver", 0)).unwrap();

        let first = ensure_binding(&conn, event, ALICE).unwrap();
        let second = ensure_binding(&conn, event, ALICE).unwrap();
        let other = ensure_binding(&conn, event, BRUNO).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(count_rows(&conn, Table::EventFundraisers).unwrap(), 2);
        assert_eq!(find_binding(&conn, event, ALICE).unwrap(), Some(first));
    }

    #[test]
    fn test_concurrent_ensure_binding_creates_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.db");
        let timeout = Duration::from_secs(5);

        let event = {
            let conn = open_database(&path, timeout).unwrap();
            setup_database(&conn).unwrap();
            seed(&conn);
            insert_event(&conn, &draft("Gala", "Vancouver", 0)).unwrap()
        };

        let workers = 4;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut conn = rusqlite::Connection::open(&path).unwrap();
                    configure_connection(&conn, timeout).unwrap();
                    barrier.wait();

                    let tx = conn
                        .transaction_with_behavior(TransactionBehavior::Immediate)
                        .unwrap();
                    let id = ensure_binding(&tx, event, ALICE).unwrap();
                    tx.commit().unwrap();
                    id
                })
            })
            .collect();

        let ids: Vec<EventFundraiserId> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));

        let conn = open_database(&path, timeout).unwrap();
        assert_eq!(count_rows(&conn, Table::EventFundraisers).unwrap(), 1);
    }
}

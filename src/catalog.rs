// Event Catalog
//
// Read views that join an event with its organizer and the fundraisers
// bound to it. Each call reads from one snapshot.

use crate::entities::{
    assigned_fundraisers, bound_events, find_event_by_id, find_fundraiser_by_id, AccountId, Event,
    EventId, Fundraiser,
};
use crate::error::{CoreError, CoreResult};
use crate::resolver::resolve_fundraiser_for_account;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventWithRelations {
    #[serde(flatten)]
    pub event: Event,
    pub organizer: Fundraiser,

    /// Bound fundraisers, in binding order
    pub assigned_fundraisers: Vec<Fundraiser>,
}

fn attach_relations(conn: &Connection, event: Event) -> CoreResult<EventWithRelations> {
    let organizer = find_fundraiser_by_id(conn, event.organizer_id)?.ok_or_else(|| {
        CoreError::not_found(format!(
            "organizer {} of event {}",
            event.organizer_id, event.id
        ))
    })?;
    let assigned = assigned_fundraisers(conn, event.id)?;

    Ok(EventWithRelations {
        event,
        organizer,
        assigned_fundraisers: assigned,
    })
}

/// One event with its organizer and bound fundraisers
pub fn event_with_relations(
    conn: &mut Connection,
    event_id: EventId,
) -> CoreResult<EventWithRelations> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

    let event = find_event_by_id(&tx, event_id)?
        .ok_or_else(|| CoreError::not_found(format!("event {}", event_id)))?;
    let view = attach_relations(&tx, event)?;

    tx.commit()?;
    Ok(view)
}

/// Every event the signed-in fundraiser is bound to, earliest first
pub fn events_for_fundraiser(
    conn: &mut Connection,
    account: Option<AccountId>,
) -> CoreResult<Vec<EventWithRelations>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

    let fundraiser_id = resolve_fundraiser_for_account(&tx, account)?;
    let views = bound_events(&tx, fundraiser_id)?
        .into_iter()
        .map(|event| attach_relations(&tx, event))
        .collect::<CoreResult<Vec<_>>>()?;

    tx.commit()?;

    debug!(fundraiser_id = %fundraiser_id, events = views.len(), "Listed fundraiser events");
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{insert_event, FundraiserId};
    use crate::error::ErrorKind;
    use crate::fixtures::{
        draft, provision_vancouver_event, seeded_connection, ALICE, ALICE_ACCOUNT, BRUNO,
        BRUNO_ACCOUNT, CARMEN, CARMEN_ACCOUNT,
    };
    use crate::provisioning::create_event;
    use chrono::Duration;

    fn ids(fundraisers: &[Fundraiser]) -> Vec<FundraiserId> {
        fundraisers.iter().map(|f| f.id).collect()
    }

    #[test]
    fn test_event_with_relations() {
        let mut conn = seeded_connection();
        let event = provision_vancouver_event(&mut conn);

        let view = event_with_relations(&mut conn, event).unwrap();

        assert_eq!(view.event.id, event);
        assert_eq!(view.organizer.id, ALICE);
        assert_eq!(ids(&view.assigned_fundraisers), vec![ALICE, BRUNO]);
    }

    #[test]
    fn test_event_with_relations_missing_event() {
        let mut conn = seeded_connection();

        let err = event_with_relations(&mut conn, EventId(404)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_event_with_relations_missing_organizer() {
        let mut conn = seeded_connection();
        conn.pragma_update(None, "foreign_keys", false).unwrap();

        let mut orphaned = draft("Lost Gala", "Vancouver", 0);
        orphaned.organizer_id = FundraiserId(999);
        let event = insert_event(&conn, &orphaned).unwrap();

        let err = event_with_relations(&mut conn, event).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_events_for_fundraiser_lists_bound_events_only() {
        let mut conn = seeded_connection();

        let mut later = draft("Autumn Gala", "Vancouver", 1);
        later.start_time = later.start_time + Duration::days(90);
        later.end_time = later.end_time + Duration::days(90);
        let autumn = create_event(&mut conn, &later).unwrap();
        let spring = provision_vancouver_event(&mut conn);
        let burnaby = create_event(&mut conn, &draft("Burnaby Brunch", "Burnaby", 1)).unwrap();

        let bruno: Vec<EventId> = events_for_fundraiser(&mut conn, Some(BRUNO_ACCOUNT))
            .unwrap()
            .iter()
            .map(|v| v.event.id)
            .collect();
        // The autumn event only picked Alice's top donor
        assert_eq!(bruno, vec![spring]);

        let alice = events_for_fundraiser(&mut conn, Some(ALICE_ACCOUNT)).unwrap();
        let alice_ids: Vec<EventId> = alice.iter().map(|v| v.event.id).collect();
        assert_eq!(alice_ids, vec![spring, autumn]);
        assert_eq!(ids(&alice[0].assigned_fundraisers), vec![ALICE, BRUNO]);

        let carmen = events_for_fundraiser(&mut conn, Some(CARMEN_ACCOUNT)).unwrap();
        assert_eq!(carmen.len(), 1);
        assert_eq!(carmen[0].event.id, burnaby);
        assert_eq!(ids(&carmen[0].assigned_fundraisers), vec![CARMEN]);
        assert_eq!(carmen[0].organizer.id, ALICE);
    }

    #[test]
    fn test_events_for_fundraiser_requires_account() {
        let mut conn = seeded_connection();
        provision_vancouver_event(&mut conn);

        let missing = events_for_fundraiser(&mut conn, None).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Authentication);

        let unknown = events_for_fundraiser(&mut conn, Some(AccountId(9999))).unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::Authentication);
    }
}

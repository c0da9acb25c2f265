// Event Provisioning
//
// One transaction from event row to pending selections:
//   1. insert event          4. select donor pool
//   2. re-read event         5. per donor: resolve owner → bind → pending row
//   3. derive city           6. audit + commit
//
// Donors are handled strictly in order because donors sharing a fundraiser
// share a binding. Any failure drops the transaction, which rolls back.

use crate::audit::{record_audit_entry, AuditAction, AuditEntry};
use crate::binder::ensure_binding;
use crate::entities::{find_event_by_id, find_fundraiser_by_id, insert_event, EventDraft, EventId};
use crate::error::{CoreError, CoreResult};
use crate::ledger::create_pending;
use crate::resolver::resolve_fundraiser_for_donor;
use crate::selector::{city_from_location, select_donor_pool};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Create an event and provision its donor pool, bindings and pending selections.
pub fn create_event(conn: &mut Connection, draft: &EventDraft) -> CoreResult<EventId> {
    draft.validate()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if find_fundraiser_by_id(&tx, draft.organizer_id)?.is_none() {
        return Err(CoreError::not_found(format!("organizer {}", draft.organizer_id)));
    }

    let event_id = insert_event(&tx, draft)?;

    // Read back what storage actually kept
    let event = find_event_by_id(&tx, event_id)?
        .ok_or_else(|| CoreError::not_found(format!("event {} after insert", event_id)))?;

    let city = city_from_location(&event.location);
    let donor_ids = select_donor_pool(&tx, &city, event.expected_selection)?;

    let mut fundraisers = BTreeSet::new();
    for donor_id in &donor_ids {
        let fundraiser_id = resolve_fundraiser_for_donor(&tx, *donor_id)?;
        let binding = ensure_binding(&tx, event_id, fundraiser_id)?;
        create_pending(&tx, *donor_id, event_id, binding)?;

        fundraisers.insert(fundraiser_id);
        debug!(
            event_id = %event_id,
            donor_id = %donor_id,
            fundraiser_id = %fundraiser_id,
            binding = %binding,
            "Assigned donor"
        );
    }

    record_audit_entry(
        &tx,
        &AuditEntry::new(
            AuditAction::EventProvisioned,
            "event",
            &event_id.to_string(),
            serde_json::json!({
                "city": city,
                "expected_selection": event.expected_selection,
                "donors": donor_ids,
                "fundraisers": fundraisers,
            }),
            &format!("fundraiser:{}", event.organizer_id),
        ),
    )?;

    tx.commit()?;

    info!(
        event_id = %event_id,
        city = %city,
        donors = donor_ids.len(),
        fundraisers = fundraisers.len(),
        "Provisioned event"
    );

    Ok(event_id)
}

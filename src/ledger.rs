// Selection Ledger - per-donor, per-event state machine
//
//   pending ──save──▶ selected ──confirm──▶ confirmed
//      ▲                 │
//      └──save (omit)────┘
//
// Rows are never deleted and confirmed never moves backwards. Bulk
// operations are scoped to the acting fundraiser's own binding and run in a
// single IMMEDIATE transaction: one bad donor id aborts the whole call.

use crate::audit::{record_audit_entry, AuditAction, AuditEntry};
use crate::binder::find_binding;
use crate::entities::{
    donors_for_binding, find_event_by_id, selections_for_binding,
    AccountId, DonorId, DonorSelection, EventFundraiserId, EventId, FundraiserId, SelectionId,
    SelectionState,
};
use crate::error::{is_unique_violation, CoreError, CoreResult};
use crate::resolver::resolve_fundraiser_for_account;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use tracing::{info, warn};

// ============================================================================
// CONFIRM POLICY
// ============================================================================

/// Which states `confirm_selections` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmPolicy {
    /// Only selected (or already confirmed) rows may be confirmed
    #[default]
    RequireSelected,

    /// Pending rows may jump straight to confirmed
    Lenient,
}

impl ConfirmPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmPolicy::RequireSelected => "require-selected",
            ConfirmPolicy::Lenient => "lenient",
        }
    }
}

impl FromStr for ConfirmPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "require-selected" => Ok(ConfirmPolicy::RequireSelected),
            "lenient" => Ok(ConfirmPolicy::Lenient),
            other => Err(format!(
                "unknown confirm policy '{}' (expected 'require-selected' or 'lenient')",
                other
            )),
        }
    }
}

// ============================================================================
// TRANSITIONS
// ============================================================================

/// Next state of a row under replace-the-set save semantics
pub fn save_transition(current: SelectionState, in_set: bool) -> SelectionState {
    match (current, in_set) {
        (SelectionState::Pending, true) => SelectionState::Selected,
        (SelectionState::Selected, false) => SelectionState::Pending,
        (state, _) => state,
    }
}

/// Next state of a row named in a confirm call, or None if the policy forbids it
pub fn confirm_transition(current: SelectionState, policy: ConfirmPolicy) -> Option<SelectionState> {
    match (current, policy) {
        (SelectionState::Pending, ConfirmPolicy::RequireSelected) => None,
        _ => Some(SelectionState::Confirmed),
    }
}

/// Check that a donor-id collection is a well-formed set
pub fn parse_donor_id_set(donor_ids: &[DonorId]) -> CoreResult<BTreeSet<DonorId>> {
    let mut set = BTreeSet::new();

    for id in donor_ids {
        if id.get() <= 0 {
            return Err(CoreError::validation(format!("invalid donor id {}", id)));
        }
        if !set.insert(*id) {
            return Err(CoreError::validation(format!("donor id {} appears more than once", id)));
        }
    }

    Ok(set)
}

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub newly_selected: Vec<DonorId>,
    pub reverted_to_pending: Vec<DonorId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfirmOutcome {
    pub newly_confirmed: Vec<DonorId>,
    pub already_confirmed: Vec<DonorId>,
}

// ============================================================================
// CREATE
// ============================================================================

/// Create the pending Selection for (donor, event) under `binding`.
///
/// The binding must belong to `event_id` and its fundraiser must own the
/// donor. A second row for the same (donor, event) is a `Conflict`.
pub fn create_pending(
    conn: &Connection,
    donor_id: DonorId,
    event_id: EventId,
    binding: EventFundraiserId,
) -> CoreResult<SelectionId> {
    let refs: Option<(EventId, FundraiserId, Option<FundraiserId>)> = conn
        .query_row(
            "SELECT ef.event_id, ef.fundraiser_id, d.fundraiser_id
             FROM event_fundraisers ef, donors d
             WHERE ef.id = ?1 AND d.id = ?2",
            params![binding, donor_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let (bound_event, bound_fundraiser, owner) = refs.ok_or_else(|| {
        CoreError::not_found(format!("binding {} or donor {}", binding, donor_id))
    })?;

    if bound_event != event_id {
        return Err(CoreError::validation(format!(
            "binding {} belongs to event {}, not {}",
            binding, bound_event, event_id
        )));
    }
    if owner != Some(bound_fundraiser) {
        return Err(CoreError::validation(format!(
            "donor {} is not owned by fundraiser {}",
            donor_id, bound_fundraiser
        )));
    }

    let inserted = conn.execute(
        "INSERT INTO selections (donor_id, event_id, event_fundraiser_id, state)
         VALUES (?1, ?2, ?3, ?4)",
        params![donor_id, event_id, binding, SelectionState::Pending],
    );

    match inserted {
        Ok(_) => Ok(SelectionId(conn.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => Err(CoreError::Conflict(format!(
            "donor {} already has a selection for event {}",
            donor_id, event_id
        ))),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// The fundraiser acting on an event, and the binding their writes are confined to
struct ActingScope {
    fundraiser_id: FundraiserId,
    binding: EventFundraiserId,
}

fn require_account(account: Option<AccountId>) -> CoreResult<AccountId> {
    account.ok_or_else(|| CoreError::Authentication("no account id on request".to_string()))
}

fn resolve_scope(conn: &Connection, event_id: EventId, account: AccountId) -> CoreResult<ActingScope> {
    let fundraiser_id = resolve_fundraiser_for_account(conn, Some(account))?;

    if find_event_by_id(conn, event_id)?.is_none() {
        return Err(CoreError::not_found(format!("event {}", event_id)));
    }

    let binding = find_binding(conn, event_id, fundraiser_id)?.ok_or_else(|| {
        CoreError::not_found(format!(
            "fundraiser {} is not assigned to event {}",
            fundraiser_id, event_id
        ))
    })?;

    Ok(ActingScope { fundraiser_id, binding })
}

/// Current state of every row under the binding, failing on donors outside it
fn states_in_scope(
    conn: &Connection,
    scope: &ActingScope,
    event_id: EventId,
    requested: &BTreeSet<DonorId>,
) -> CoreResult<HashMap<DonorId, SelectionState>> {
    let states: HashMap<DonorId, SelectionState> = selections_for_binding(conn, scope.binding)?
        .into_iter()
        .map(|s| (s.donor_id, s.state))
        .collect();

    if let Some(missing) = requested.iter().find(|id| !states.contains_key(*id)) {
        return Err(CoreError::not_found(format!(
            "donor {} has no selection for event {} under fundraiser {}",
            missing, event_id, scope.fundraiser_id
        )));
    }

    Ok(states)
}

fn write_state(
    conn: &Connection,
    binding: EventFundraiserId,
    donor_id: DonorId,
    state: SelectionState,
) -> CoreResult<()> {
    conn.execute(
        "UPDATE selections SET state = ?1, updated_at = CURRENT_TIMESTAMP
         WHERE event_fundraiser_id = ?2 AND donor_id = ?3",
        params![state, binding, donor_id],
    )?;
    Ok(())
}

pub struct SelectionLedger {
    confirm_policy: ConfirmPolicy,
}

impl SelectionLedger {
    pub fn new(confirm_policy: ConfirmPolicy) -> Self {
        SelectionLedger { confirm_policy }
    }

    pub fn confirm_policy(&self) -> ConfirmPolicy {
        self.confirm_policy
    }

    /// Replace the acting fundraiser's selected set for an event.
    ///
    /// Supplied pending donors become selected. Donors that were selected
    /// and are not supplied go back to pending. Confirmed rows are left alone.
    pub fn save_selections(
        &self,
        conn: &mut Connection,
        event_id: EventId,
        donor_ids: &[DonorId],
        account: Option<AccountId>,
    ) -> CoreResult<SaveOutcome> {
        let account = require_account(account)?;
        let requested = parse_donor_id_set(donor_ids)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let scope = resolve_scope(&tx, event_id, account)?;
        let states = states_in_scope(&tx, &scope, event_id, &requested).inspect_err(|e| {
            warn!(event_id = %event_id, account = %account, error = %e, "Rejected selection save");
        })?;

        let mut outcome = SaveOutcome::default();
        let mut donors: Vec<_> = states.into_iter().collect();
        donors.sort_by_key(|(donor_id, _)| *donor_id);

        for (donor_id, current) in donors {
            let next = save_transition(current, requested.contains(&donor_id));
            if next == current {
                continue;
            }

            write_state(&tx, scope.binding, donor_id, next)?;
            match next {
                SelectionState::Selected => outcome.newly_selected.push(donor_id),
                _ => outcome.reverted_to_pending.push(donor_id),
            }
        }

        record_audit_entry(
            &tx,
            &AuditEntry::new(
                AuditAction::SelectionsSaved,
                "event",
                &event_id.to_string(),
                serde_json::json!({
                    "fundraiser_id": scope.fundraiser_id,
                    "requested": requested,
                    "newly_selected": outcome.newly_selected,
                    "reverted_to_pending": outcome.reverted_to_pending,
                }),
                &format!("account:{}", account),
            ),
        )?;

        tx.commit()?;

        info!(
            event_id = %event_id,
            fundraiser_id = %scope.fundraiser_id,
            selected = outcome.newly_selected.len(),
            reverted = outcome.reverted_to_pending.len(),
            "Saved selections"
        );

        Ok(outcome)
    }

    /// Move the supplied donors to confirmed.
    ///
    /// Under `RequireSelected` a pending donor in the set rejects the whole call.
    pub fn confirm_selections(
        &self,
        conn: &mut Connection,
        event_id: EventId,
        donor_ids: &[DonorId],
        account: Option<AccountId>,
    ) -> CoreResult<ConfirmOutcome> {
        let account = require_account(account)?;
        let requested = parse_donor_id_set(donor_ids)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let scope = resolve_scope(&tx, event_id, account)?;
        let states = states_in_scope(&tx, &scope, event_id, &requested).inspect_err(|e| {
            warn!(event_id = %event_id, account = %account, error = %e, "Rejected selection confirm");
        })?;

        let mut outcome = ConfirmOutcome::default();

        for donor_id in &requested {
            // states_in_scope has already rejected ids outside the binding
            let current = states[donor_id];
            if current == SelectionState::Confirmed {
                outcome.already_confirmed.push(*donor_id);
                continue;
            }

            if confirm_transition(current, self.confirm_policy).is_none() {
                warn!(
                    event_id = %event_id,
                    donor_id = %donor_id,
                    policy = self.confirm_policy.as_str(),
                    "Rejected confirmation of unselected donor"
                );
                return Err(CoreError::validation(format!(
                    "donor {} is {} and must be selected before confirming",
                    donor_id, current
                )));
            }

            outcome.newly_confirmed.push(*donor_id);
        }

        for donor_id in &outcome.newly_confirmed {
            write_state(&tx, scope.binding, *donor_id, SelectionState::Confirmed)?;
        }

        record_audit_entry(
            &tx,
            &AuditEntry::new(
                AuditAction::SelectionsConfirmed,
                "event",
                &event_id.to_string(),
                serde_json::json!({
                    "fundraiser_id": scope.fundraiser_id,
                    "policy": self.confirm_policy.as_str(),
                    "newly_confirmed": outcome.newly_confirmed,
                    "already_confirmed": outcome.already_confirmed,
                }),
                &format!("account:{}", account),
            ),
        )?;

        tx.commit()?;

        info!(
            event_id = %event_id,
            fundraiser_id = %scope.fundraiser_id,
            confirmed = outcome.newly_confirmed.len(),
            "Confirmed selections"
        );

        Ok(outcome)
    }

    /// Donors the acting fundraiser holds for an event, with their state
    pub fn list_fundraiser_selections(
        &self,
        conn: &Connection,
        event_id: EventId,
        account: Option<AccountId>,
    ) -> CoreResult<Vec<DonorSelection>> {
        let account = require_account(account)?;
        let scope = resolve_scope(conn, event_id, account)?;
        donors_for_binding(conn, scope.binding)
    }
}

impl Default for SelectionLedger {
    fn default() -> Self {
        Self::new(ConfirmPolicy::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================

// Entity Models
//
// Each entity has:
// - A typed INTEGER identity
// - A plain data struct mirroring its table
// - Repository functions over a rusqlite Connection

pub mod ids;
pub mod fundraiser;
pub mod donor;
pub mod event;
pub mod selection;

pub use ids::{AccountId, DonorId, EventFundraiserId, EventId, FundraiserId, SelectionId};
pub use fundraiser::{
    Fundraiser, insert_fundraiser, find_fundraiser_by_id,
    find_fundraiser_owning_donor, find_fundraiser_by_account_id,
};
pub use donor::{Donor, insert_donor, find_donor_by_id, find_donors_by_city};
pub use event::{
    Event, EventDraft, insert_event, find_event_by_id, list_events, assigned_fundraisers,
    bound_events,
};
pub use selection::{
    Selection, SelectionState, DonorSelection,
    find_selection, selections_for_event, selections_for_binding, donors_for_binding,
};

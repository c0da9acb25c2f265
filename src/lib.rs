// Donor Engagement - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod error;
pub mod config;
pub mod db;
pub mod audit;
pub mod entities;
pub mod selector;   // Donor Pool Selector
pub mod resolver;   // Fundraiser Resolver
pub mod binder;     // Event-Fundraiser Binder
pub mod ledger;     // Selection Ledger (state machine)
pub mod provisioning; // Event Provisioning Orchestrator
pub mod status;     // Event Status Aggregator
pub mod catalog;    // Event views with organizer and bound fundraisers

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use error::{CoreError, CoreResult, ErrorKind};
pub use config::Config;
pub use db::{
    open_database, configure_connection, setup_database,
    load_fundraisers_csv, load_donors_csv, import_population,
    count_rows, Table,
};
pub use audit::{AuditAction, AuditEntry, record_audit_entry, audit_entries_for};
pub use entities::{
    AccountId, DonorId, EventFundraiserId, EventId, FundraiserId, SelectionId,
    Donor, Fundraiser, Event, EventDraft, list_events, Selection, SelectionState, DonorSelection,
};
pub use selector::{city_from_location, rank_donor_pool, select_donor_pool};
pub use resolver::{resolve_fundraiser_for_account, resolve_fundraiser_for_donor};
pub use binder::{ensure_binding, find_binding};
pub use ledger::{
    ConfirmPolicy, SelectionLedger, SaveOutcome, ConfirmOutcome,
    create_pending, parse_donor_id_set,
};
pub use provisioning::create_event;
pub use status::{EventStatus, EventStatusBreakdown, compute_event_status};
pub use catalog::{EventWithRelations, event_with_relations, events_for_fundraiser};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

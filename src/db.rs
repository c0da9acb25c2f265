use crate::entities::{insert_donor, insert_fundraiser, Donor, Fundraiser};
use crate::error::CoreResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open (or create) the database file and apply connection settings.
///
/// Foreign keys are enforced and writers wait up to `busy_timeout` for the
/// write lock instead of failing immediately.
pub fn open_database(path: &Path, busy_timeout: Duration) -> CoreResult<Connection> {
    let conn = Connection::open(path)?;
    configure_connection(&conn, busy_timeout)?;
    Ok(conn)
}

/// Apply per-connection pragmas. Needed on every connection, including in-memory ones.
pub fn configure_connection(conn: &Connection, busy_timeout: Duration) -> CoreResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

pub fn setup_database(conn: &Connection) -> CoreResult<()> {
    // Enable WAL mode so the status snapshot never blocks writers.
    // In-memory databases answer "memory" and keep going.
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", true)?;

    // ==========================================================================
    // Fundraisers
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS fundraisers (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            account_id INTEGER UNIQUE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Donors (city is derived from location at insert time)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS donors (
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            location TEXT NOT NULL,
            city TEXT NOT NULL COLLATE NOCASE,
            communication_preference TEXT NOT NULL,
            total_donations REAL NOT NULL DEFAULT 0,
            fundraiser_id INTEGER REFERENCES fundraisers(id),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            location TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            expected_selection INTEGER NOT NULL CHECK (expected_selection >= 0),
            organizer_id INTEGER NOT NULL REFERENCES fundraisers(id),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Event <-> Fundraiser bindings (one per pair)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS event_fundraisers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            fundraiser_id INTEGER NOT NULL REFERENCES fundraisers(id),
            UNIQUE (event_id, fundraiser_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Selections (one per donor per event)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS selections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            donor_id INTEGER NOT NULL REFERENCES donors(id),
            event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            event_fundraiser_id INTEGER NOT NULL REFERENCES event_fundraisers(id),
            state TEXT NOT NULL DEFAULT 'pending'
                CHECK (state IN ('pending', 'selected', 'confirmed')),
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (donor_id, event_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Audit log
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            action TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_donors_city ON donors(city)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_donors_fundraiser ON donors(fundraiser_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_selections_binding ON selections(event_fundraiser_id, state)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Parse an RFC 3339 column value, reporting failures as a column conversion error
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ============================================================================
// POPULATION IMPORT (fundraisers + donors from CSV)
// ============================================================================

pub fn load_fundraisers_csv(csv_path: &Path) -> Result<Vec<Fundraiser>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open fundraisers CSV")?;

    let mut fundraisers = Vec::new();
    for result in rdr.deserialize() {
        let fundraiser: Fundraiser = result.context("Failed to deserialize fundraiser")?;
        fundraisers.push(fundraiser);
    }

    Ok(fundraisers)
}

pub fn load_donors_csv(csv_path: &Path) -> Result<Vec<Donor>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open donors CSV")?;

    let mut donors = Vec::new();
    for result in rdr.deserialize() {
        let donor: Donor = result.context("Failed to deserialize donor")?;
        donors.push(donor);
    }

    Ok(donors)
}

/// Insert fundraisers then donors in one transaction.
///
/// Fundraisers go first so donor ownership references resolve.
pub fn import_population(
    conn: &mut Connection,
    fundraisers: &[Fundraiser],
    donors: &[Donor],
) -> CoreResult<(usize, usize)> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    for fundraiser in fundraisers {
        insert_fundraiser(&tx, fundraiser)?;
    }
    for donor in donors {
        insert_donor(&tx, donor)?;
    }

    tx.commit()?;

    info!(
        fundraisers = fundraisers.len(),
        donors = donors.len(),
        "Imported donor population"
    );
    Ok((fundraisers.len(), donors.len()))
}

pub fn count_rows(conn: &Connection, table: Table) -> CoreResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count)
}

/// Tables whose size is worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Fundraisers,
    Donors,
    Events,
    EventFundraisers,
    Selections,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Fundraisers => "fundraisers",
            Table::Donors => "donors",
            Table::Events => "events",
            Table::EventFundraisers => "event_fundraisers",
            Table::Selections => "selections",
        }
    }
}

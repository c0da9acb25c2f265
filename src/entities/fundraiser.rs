// Fundraiser Entity - the staff member responsible for a set of donors
//
// A fundraiser organizes events, owns donors, and is bound to events
// through event_fundraisers. account_id links the row to a login identity.

use super::ids::{AccountId, DonorId, FundraiserId};
use crate::error::CoreResult;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundraiser {
    pub id: FundraiserId,
    pub name: String,

    /// Login identity (None for fundraisers that never sign in)
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

impl Fundraiser {
    pub fn new(id: FundraiserId, name: &str, account_id: Option<AccountId>) -> Self {
        Fundraiser {
            id,
            name: name.to_string(),
            account_id,
        }
    }
}

pub(crate) const FUNDRAISER_COLUMNS: &str = "f.id, f.name, f.account_id";

pub(crate) fn fundraiser_from_row(row: &Row<'_>) -> rusqlite::Result<Fundraiser> {
    Ok(Fundraiser {
        id: row.get(0)?,
        name: row.get(1)?,
        account_id: row.get(2)?,
    })
}

// ============================================================================
// REPOSITORY
// ============================================================================

pub fn insert_fundraiser(conn: &Connection, fundraiser: &Fundraiser) -> CoreResult<FundraiserId> {
    conn.execute(
        "INSERT INTO fundraisers (id, name, account_id) VALUES (?1, ?2, ?3)",
        params![fundraiser.id, fundraiser.name, fundraiser.account_id],
    )?;
    Ok(fundraiser.id)
}

pub fn find_fundraiser_by_id(conn: &Connection, id: FundraiserId) -> CoreResult<Option<Fundraiser>> {
    let sql = format!("SELECT {} FROM fundraisers f WHERE f.id = ?1", FUNDRAISER_COLUMNS);
    let fundraiser = conn
        .query_row(&sql, [id], fundraiser_from_row)
        .optional()?;
    Ok(fundraiser)
}

/// Owner of a donor; None when the donor is missing or unowned
pub fn find_fundraiser_owning_donor(
    conn: &Connection,
    donor_id: DonorId,
) -> CoreResult<Option<FundraiserId>> {
    let owner: Option<Option<FundraiserId>> = conn
        .query_row(
            "SELECT fundraiser_id FROM donors WHERE id = ?1",
            [donor_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(owner.flatten())
}

pub fn find_fundraiser_by_account_id(
    conn: &Connection,
    account_id: AccountId,
) -> CoreResult<Option<FundraiserId>> {
    let id = conn
        .query_row(
            "SELECT id FROM fundraisers WHERE account_id = ?1",
            [account_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

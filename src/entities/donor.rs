// Donor Entity - read-only input to donor pool selection
//
// The city column is derived from location when the donor is stored, using
// the same rule events use, so pool selection is a plain indexed lookup.

use super::ids::{DonorId, FundraiserId};
use crate::error::CoreResult;
use crate::selector::city_from_location;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub id: DonorId,
    pub first_name: String,
    pub last_name: String,

    /// Free-text address; last comma-separated segment is the city
    pub location: String,

    /// Derived from location, filled in on read
    #[serde(default)]
    pub city: String,

    /// How the donor prefers to be contacted (email, phone, mail, ...)
    pub communication_preference: String,

    /// Lifetime donation total
    pub total_donations: f64,

    /// Owning fundraiser; None is a data-integrity fault
    #[serde(default)]
    pub fundraiser_id: Option<FundraiserId>,
}

impl Donor {
    pub fn new(
        id: DonorId,
        first_name: &str,
        last_name: &str,
        location: &str,
        communication_preference: &str,
        total_donations: f64,
        fundraiser_id: Option<FundraiserId>,
    ) -> Self {
        Donor {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            location: location.to_string(),
            city: city_from_location(location),
            communication_preference: communication_preference.to_string(),
            total_donations,
            fundraiser_id,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

pub(crate) const DONOR_COLUMNS: &str = "d.id, d.first_name, d.last_name, d.location, d.city, \
     d.communication_preference, d.total_donations, d.fundraiser_id";

pub(crate) fn donor_from_row(row: &Row<'_>) -> rusqlite::Result<Donor> {
    Ok(Donor {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        location: row.get(3)?,
        city: row.get(4)?,
        communication_preference: row.get(5)?,
        total_donations: row.get(6)?,
        fundraiser_id: row.get(7)?,
    })
}

// ============================================================================
// REPOSITORY
// ============================================================================

pub fn insert_donor(conn: &Connection, donor: &Donor) -> CoreResult<DonorId> {
    conn.execute(
        "INSERT INTO donors (
            id, first_name, last_name, location, city,
            communication_preference, total_donations, fundraiser_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            donor.id,
            donor.first_name,
            donor.last_name,
            donor.location,
            city_from_location(&donor.location),
            donor.communication_preference,
            donor.total_donations,
            donor.fundraiser_id,
        ],
    )?;
    Ok(donor.id)
}

pub fn find_donor_by_id(conn: &Connection, id: DonorId) -> CoreResult<Option<Donor>> {
    let sql = format!("SELECT {} FROM donors d WHERE d.id = ?1", DONOR_COLUMNS);
    let donor = conn.query_row(&sql, [id], donor_from_row).optional()?;
    Ok(donor)
}

/// Donors whose derived city equals `city`, case-insensitively, in id order
pub fn find_donors_by_city(conn: &Connection, city: &str) -> CoreResult<Vec<Donor>> {
    let sql = format!(
        "SELECT {} FROM donors d WHERE d.city = ?1 ORDER BY d.id",
        DONOR_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let donors = stmt
        .query_map([city], donor_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(donors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{seeded_connection, ALICE};

    #[test]
    fn test_find_donor_by_id() {
        let conn = seeded_connection();

        let donor = find_donor_by_id(&conn, DonorId(1)).unwrap().unwrap();
        assert_eq!(donor.full_name(), "Ana Lee");
        assert_eq!(donor.city, "Vancouver");
        assert_eq!(donor.fundraiser_id, Some(ALICE));

        assert!(find_donor_by_id(&conn, DonorId(999)).unwrap().is_none());
    }

    #[test]
    fn test_find_donors_by_city_ignores_case() {
        let conn = seeded_connection();

        let ids: Vec<DonorId> = find_donors_by_city(&conn, "VANCOUVER")
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();

        assert_eq!(ids, vec![DonorId(1), DonorId(2), DonorId(3), DonorId(4)]);
        assert!(find_donors_by_city(&conn, "Toronto").unwrap().is_empty());
    }
}

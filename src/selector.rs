// Donor Pool Selector
// Picks the donors invited to an event from the event's city

use crate::entities::{find_donors_by_city, Donor, DonorId};
use crate::error::CoreResult;
use rusqlite::Connection;
use tracing::debug;

/// Derive the city from a free-text location.
///
/// Splits on commas, trims each segment and keeps the last non-empty one.
///
/// Example: "Hotel Georgia, 801 W Georgia St, Vancouver" → "Vancouver"
pub fn city_from_location(location: &str) -> String {
    location
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

/// Order candidates and keep the first `desired_count`.
///
/// Highest lifetime donations first; equal totals fall back to ascending
/// donor id so the same data always yields the same pool.
pub fn rank_donor_pool(mut candidates: Vec<Donor>, desired_count: usize) -> Vec<DonorId> {
    candidates.sort_by(|a, b| {
        b.total_donations
            .total_cmp(&a.total_donations)
            .then(a.id.cmp(&b.id))
    });

    candidates
        .into_iter()
        .take(desired_count)
        .map(|donor| donor.id)
        .collect()
}

/// Select up to `desired_count` donors living in `city` (case-insensitive).
pub fn select_donor_pool(
    conn: &Connection,
    city: &str,
    desired_count: u32,
) -> CoreResult<Vec<DonorId>> {
    if city.is_empty() || desired_count == 0 {
        return Ok(Vec::new());
    }

    let candidates = find_donors_by_city(conn, city)?;
    let available = candidates.len();
    let pool = rank_donor_pool(candidates, desired_count as usize);

    debug!(
        city,
        desired_count,
        available,
        selected = pool.len(),
        "Selected donor pool"
    );

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seeded_connection;

    #[test]
    fn test_city_from_location() {
        assert_eq!(
            city_from_location("Hotel Georgia, 801 W Georgia St, Vancouver"),
            "Vancouver"
        );
        assert_eq!(city_from_location("  Burnaby  "), "Burnaby");
        assert_eq!(city_from_location("12 Main St, Vancouver, "), "Vancouver");
        assert_eq!(city_from_location(""), "");
        assert_eq!(city_from_location(" , ,"), "");
    }

    #[test]
    fn test_pool_ranks_by_donations_then_id() {
        let conn = seeded_connection();

        // Donors 1 and 2 tie on totals; the lower id wins the tie
        let pool = select_donor_pool(&conn, "Vancouver", 3).unwrap();
        assert_eq!(pool, vec![DonorId(1), DonorId(2), DonorId(3)]);
    }

    #[test]
    fn test_pool_is_capped_by_available_donors() {
        let conn = seeded_connection();

        let pool = select_donor_pool(&conn, "vancouver", 50).unwrap();
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn test_pool_is_reproducible() {
        let conn = seeded_connection();

        let first = select_donor_pool(&conn, "Vancouver", 2).unwrap();
        let second = select_donor_pool(&conn, "Vancouver", 2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_inputs_select_nobody() {
        let conn = seeded_connection();

        assert!(select_donor_pool(&conn, "", 5).unwrap().is_empty());
        assert!(select_donor_pool(&conn, "Vancouver", 0).unwrap().is_empty());
        assert!(select_donor_pool(&conn, "Atlantis", 5).unwrap().is_empty());
    }
}

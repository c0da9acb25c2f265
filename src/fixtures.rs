// Shared test data
//
//   Fundraisers: Alice (1, account 100), Bruno (2, account 200), Carmen (3, account 300)
//   Donors:      1 Ana  Vancouver 5000 Alice   4 Dev  Vancouver  800 Bruno
//                2 Ben  vancouver 5000 Alice   5 Eve  Burnaby   9000 Carmen
//                3 Cleo Vancouver 1200 Bruno   6 Finn Richmond   400 (no owner)

use crate::db::setup_database;
use crate::entities::{
    find_selection, insert_donor, insert_fundraiser, AccountId, Donor, DonorId, EventDraft, EventId,
    Fundraiser, FundraiserId, SelectionState,
};
use crate::provisioning::create_event;
use chrono::{TimeZone, Utc};
use rusqlite::Connection;

pub const ALICE: FundraiserId = FundraiserId(1);
pub const BRUNO: FundraiserId = FundraiserId(2);
pub const CARMEN: FundraiserId = FundraiserId(3);

pub const ALICE_ACCOUNT: AccountId = AccountId(100);
pub const BRUNO_ACCOUNT: AccountId = AccountId(200);
pub const CARMEN_ACCOUNT: AccountId = AccountId(300);

pub const ORPHAN_DONOR: DonorId = DonorId(6);

pub fn seed(conn: &Connection) {
    for fundraiser in [
        Fundraiser::new(ALICE, "Alice Park", Some(ALICE_ACCOUNT)),
        Fundraiser::new(BRUNO, "Bruno Diaz", Some(BRUNO_ACCOUNT)),
        Fundraiser::new(CARMEN, "Carmen Oduya", Some(CARMEN_ACCOUNT)),
    ] {
        insert_fundraiser(conn, &fundraiser).unwrap();
    }

    for donor in [
        Donor::new(DonorId(1), "Ana", "Lee", "12 Main St, Vancouver", "email", 5000.0, Some(ALICE)),
        Donor::new(DonorId(2), "Ben", "Cho", "88 Pine St, vancouver ", "phone", 5000.0, Some(ALICE)),
        Donor::new(DonorId(3), "Cleo", "Ray", "7 Birch Ave, Vancouver", "email", 1200.0, Some(BRUNO)),
        Donor::new(DonorId(4), "Dev", "Shah", "Vancouver", "mail", 800.0, Some(BRUNO)),
        Donor::new(DonorId(5), "Eve", "Moss", "3 Oak Rd, Burnaby", "email", 9000.0, Some(CARMEN)),
        Donor::new(ORPHAN_DONOR, "Finn", "Wu", "1 Elm St, Richmond", "phone", 400.0, None),
    ] {
        insert_donor(conn, &donor).unwrap();
    }
}

pub fn seeded_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    setup_database(&conn).unwrap();
    seed(&conn);
    conn
}

/// Draft organized by Alice, starting 2025-06-01 18:00 UTC for three hours
pub fn draft(name: &str, location: &str, expected_selection: u32) -> EventDraft {
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap();
    EventDraft {
        name: name.to_string(),
        location: location.to_string(),
        start_time: start,
        end_time: start + chrono::Duration::hours(3),
        expected_selection,
        organizer_id: ALICE,
    }
}

/// Vancouver event over all four Vancouver donors: Alice holds 1, 2 and Bruno holds 3, 4
pub fn provision_vancouver_event(conn: &mut Connection) -> EventId {
    create_event(conn, &draft("Spring Gala", "Hotel Georgia, Vancouver", 4)).unwrap()
}

pub fn state_of(conn: &Connection, event: EventId, donor: DonorId) -> SelectionState {
    find_selection(conn, donor, event).unwrap().unwrap().state
}

// Fundraiser Resolver
// Maps a donor, or a signed-in account, to the fundraiser behind it

use crate::entities::{
    find_fundraiser_by_account_id, find_fundraiser_owning_donor, AccountId, DonorId, FundraiserId,
};
use crate::error::{CoreError, CoreResult};
use rusqlite::Connection;

/// Owning fundraiser of `donor_id`.
///
/// Every donor is expected to have exactly one owner. A missing owner is a
/// data-integrity fault and comes back as `NotFound`, never as a skip.
pub fn resolve_fundraiser_for_donor(conn: &Connection, donor_id: DonorId) -> CoreResult<FundraiserId> {
    find_fundraiser_owning_donor(conn, donor_id)?
        .ok_or_else(|| CoreError::not_found(format!("no fundraiser owns donor {}", donor_id)))
}

/// Fundraiser acting for `account`. A missing or unknown account is `Authentication`.
pub fn resolve_fundraiser_for_account(
    conn: &Connection,
    account: Option<AccountId>,
) -> CoreResult<FundraiserId> {
    let account =
        account.ok_or_else(|| CoreError::Authentication("no account id on request".to_string()))?;

    find_fundraiser_by_account_id(conn, account)?.ok_or_else(|| {
        CoreError::Authentication(format!("account {} is not a fundraiser", account))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::{seeded_connection, ALICE, BRUNO, BRUNO_ACCOUNT, ORPHAN_DONOR};

    #[test]
    fn test_resolves_owner() {
        let conn = seeded_connection();
        assert_eq!(resolve_fundraiser_for_donor(&conn, DonorId(1)).unwrap(), ALICE);
    }

    #[test]
    fn test_unowned_donor_is_not_found() {
        let conn = seeded_connection();

        let err = resolve_fundraiser_for_donor(&conn, ORPHAN_DONOR).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = resolve_fundraiser_for_donor(&conn, DonorId(12345)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_resolves_account() {
        let conn = seeded_connection();
        assert_eq!(resolve_fundraiser_for_account(&conn, Some(BRUNO_ACCOUNT)).unwrap(), BRUNO);

        let missing = resolve_fundraiser_for_account(&conn, None).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Authentication);

        let unknown = resolve_fundraiser_for_account(&conn, Some(AccountId(9999))).unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::Authentication);
    }
}

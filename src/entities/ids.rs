// Typed identifiers
//
// Every table uses an INTEGER primary key. Wrapping each one in its own type
// keeps a DonorId from ever being passed where an EventId was expected.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                $name(raw)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map($name)
            }
        }
    };
}

typed_id!(
    /// Identity of a row in `events`
    EventId
);
typed_id!(
    /// Identity of a row in `fundraisers`
    FundraiserId
);
typed_id!(
    /// Identity of a row in `donors`
    DonorId
);
typed_id!(
    /// Identity of a row in `event_fundraisers`
    EventFundraiserId
);
typed_id!(
    /// Identity of a row in `selections`
    SelectionId
);
typed_id!(
    /// Login identity supplied by the authentication collaborator
    AccountId
);

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_id_roundtrips_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let back: DonorId = conn
            .query_row("SELECT ?1", [DonorId(17)], |row| row.get(0))
            .unwrap();
        assert_eq!(back, DonorId(17));
    }

    #[test]
    fn test_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&EventId(5)).unwrap();
        assert_eq!(json, "5");
        let parsed: Vec<DonorId> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(parsed, vec![DonorId(1), DonorId(2)]);
    }
}

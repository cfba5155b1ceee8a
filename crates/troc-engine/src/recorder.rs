//! Turns a match candidate into exactly one persisted [`Match`].
//!
//! Look first, insert second, and if the insert loses a race against a
//! concurrent confirm of the same pair, read back the winner.  The unique
//! index on the unordered item pair is what makes the race safe.

use troc_shared::{clock, ItemId, ItemPair, Match, MatchId, UserId};
use troc_store::{Database, StoreError};
use tracing::{debug, info};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmed {
    pub record: Match,
    /// `true` only for the call that actually inserted the row.
    pub created: bool,
}

/// Return the Match for this item pair, creating it if none exists.
///
/// Symmetric in its arguments: confirming (a, b) and then (b, a) yields the
/// same row.
pub fn confirm(
    db: &Database,
    user_a: UserId,
    user_b: UserId,
    item_a: ItemId,
    item_b: ItemId,
) -> Result<Confirmed> {
    if let Some(existing) = db.find_match(user_a, user_b, item_a, item_b)? {
        debug!(match_id = %existing.id, "match already recorded");
        return Ok(Confirmed {
            record: existing,
            created: false,
        });
    }

    let record = Match {
        id: MatchId::new(),
        user_a,
        user_b,
        item_a,
        item_b,
        created_at: clock::now(),
    };

    match db.insert_match(&record) {
        Ok(()) => {
            info!(match_id = %record.id, %user_a, %user_b, "match recorded");
            Ok(Confirmed {
                record,
                created: true,
            })
        }
        Err(StoreError::Conflict) => {
            debug!(%item_a, %item_b, "lost match insert race, reading back");
            let existing = db
                .find_match_by_pair(ItemPair::new(item_a, item_b))?
                .ok_or(StoreError::Conflict)?;
            Ok(Confirmed {
                record: existing,
                created: false,
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{db, listed};

    #[test]
    fn confirm_is_idempotent_and_symmetric() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let camera = listed(&db, alice, "Camera");
        let guitar = listed(&db, bob, "Guitar");

        let first = confirm(&db, alice, bob, camera.id, guitar.id).unwrap();
        assert!(first.created);

        let again = confirm(&db, alice, bob, camera.id, guitar.id).unwrap();
        assert!(!again.created);
        assert_eq!(again.record, first.record);

        let mirrored = confirm(&db, bob, alice, guitar.id, camera.id).unwrap();
        assert!(!mirrored.created);
        assert_eq!(mirrored.record.id, first.record.id);

        assert_eq!(db.count_matches().unwrap(), 1);
    }

    #[test]
    fn conflicting_insert_reads_back_existing_row() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let camera = listed(&db, alice, "Camera");
        let guitar = listed(&db, bob, "Guitar");

        // Simulate the other writer winning between our lookup and insert
        // by recording the pair under a third identity the lookup misses.
        let winner = Match {
            id: MatchId::new(),
            user_a: bob,
            user_b: UserId::new(),
            item_a: guitar.id,
            item_b: camera.id,
            created_at: clock::now(),
        };
        db.insert_match(&winner).unwrap();

        let confirmed = confirm(&db, alice, bob, camera.id, guitar.id).unwrap();
        assert!(!confirmed.created);
        assert_eq!(confirmed.record.id, winner.id);
    }
}

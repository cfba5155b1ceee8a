//! Accepts like / unlike requests and hands accepted likes to the detector.

use troc_shared::{clock, ItemId, Like, UserId};
use troc_store::Database;
use tracing::{debug, info};

use crate::detector::{self, MatchCandidate};
use crate::error::{EngineError, Entity, Result, ValidationReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    /// `false` when the identical like already existed.
    pub inserted: bool,
    pub candidate: Option<MatchCandidate>,
}

/// Validate and record a like, then look for a reciprocal one.
///
/// A repeated like is accepted as a no-op insert.  Detection still runs so
/// the caller sees the same match outcome as the first time; everything
/// downstream is idempotent.
pub fn record_like(
    db: &Database,
    user: UserId,
    item_id: ItemId,
    context_item_id: Option<ItemId>,
) -> Result<Registered> {
    let item = db
        .get_item(item_id)
        .map_err(EngineError::missing(Entity::Item, item_id.0))?;

    if item.owner_id == user {
        return Err(EngineError::Validation(ValidationReason::SelfLike));
    }
    if !item.is_visible {
        return Err(EngineError::Validation(ValidationReason::ItemHidden));
    }
    if !item.is_available {
        return Err(EngineError::Validation(ValidationReason::ItemUnavailable));
    }

    if let Some(ctx) = context_item_id {
        let context = db
            .get_item(ctx)
            .map_err(EngineError::missing(Entity::Item, ctx.0))?;
        if context.owner_id != user {
            return Err(EngineError::Validation(ValidationReason::ContextNotOwned));
        }
    }

    let inserted = db.insert_like(&Like {
        user_id: user,
        item_id,
        context_item_id,
        created_at: clock::now(),
    })?;

    if inserted {
        info!(%user, item = %item_id, context = ?context_item_id, "like recorded");
    } else {
        debug!(%user, item = %item_id, "duplicate like ignored");
    }

    let candidate = detector::detect(db, user, item_id, context_item_id)?;
    Ok(Registered {
        inserted,
        candidate,
    })
}

/// Remove a like.  Removing a like that does not exist is not an error.
///
/// Existing matches and conversations are left untouched.
pub fn remove_like(
    db: &Database,
    user: UserId,
    item_id: ItemId,
    context_item_id: Option<ItemId>,
) -> Result<bool> {
    let removed = db.delete_like(user, item_id, context_item_id)?;
    debug!(%user, item = %item_id, removed, "unlike");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{db, listed};

    #[test]
    fn rejects_self_like_and_unlisted_items() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let camera = listed(&db, alice, "Camera");
        let guitar = listed(&db, bob, "Guitar");

        assert!(matches!(
            record_like(&db, alice, camera.id, None),
            Err(EngineError::Validation(ValidationReason::SelfLike))
        ));

        db.set_item_flags(guitar.id, false, true).unwrap();
        assert!(matches!(
            record_like(&db, alice, guitar.id, None),
            Err(EngineError::Validation(ValidationReason::ItemUnavailable))
        ));

        db.set_item_flags(guitar.id, true, false).unwrap();
        assert!(matches!(
            record_like(&db, alice, guitar.id, None),
            Err(EngineError::Validation(ValidationReason::ItemHidden))
        ));

        assert!(db.list_likes_by_user(alice).unwrap().is_empty());
    }

    #[test]
    fn context_must_belong_to_the_liker() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let guitar = listed(&db, bob, "Guitar");
        let drums = listed(&db, bob, "Drums");

        assert!(matches!(
            record_like(&db, alice, guitar.id, Some(drums.id)),
            Err(EngineError::Validation(ValidationReason::ContextNotOwned))
        ));
    }

    #[test]
    fn duplicate_like_is_a_quiet_success() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let guitar = listed(&db, bob, "Guitar");

        let first = record_like(&db, alice, guitar.id, None).unwrap();
        assert!(first.inserted);
        assert_eq!(first.candidate, None);

        let second = record_like(&db, alice, guitar.id, None).unwrap();
        assert!(!second.inserted);
        assert_eq!(db.list_likes_by_user(alice).unwrap().len(), 1);
    }

    #[test]
    fn remove_like_tolerates_missing_rows() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let guitar = listed(&db, bob, "Guitar");

        record_like(&db, alice, guitar.id, None).unwrap();
        assert!(remove_like(&db, alice, guitar.id, None).unwrap());
        assert!(!remove_like(&db, alice, guitar.id, None).unwrap());
    }
}

//! Reciprocal-interest lookup.
//!
//! Read-only: the detector never writes.  Whatever it finds is only a
//! candidate until the [`recorder`](crate::recorder) confirms it.

use troc_shared::{ItemId, UserId};
use troc_store::Database;
use tracing::debug;

use crate::error::{EngineError, Entity, Result};

/// Two items whose owners like each other's item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    pub other_user_id: UserId,
    pub other_user_item_id: ItemId,
    pub my_item_id: ItemId,
}

/// Look for a like from the owner of `liked_item_id` on one of
/// `current_user`'s items.
///
/// With a `context_item_id` the search is restricted to that single item.
/// Without one, every item `current_user` still has listed is eligible and
/// the oldest one the other side liked wins.  Hidden or unavailable items
/// never match.  Returns `None` for a self-like.
pub fn detect(
    db: &Database,
    current_user: UserId,
    liked_item_id: ItemId,
    context_item_id: Option<ItemId>,
) -> Result<Option<MatchCandidate>> {
    let liked = db
        .get_item(liked_item_id)
        .map_err(EngineError::missing(Entity::Item, liked_item_id.0))?;
    let other_user = liked.owner_id;
    if other_user == current_user {
        return Ok(None);
    }

    let chosen = match context_item_id {
        Some(ctx) => match db.find_item(ctx)? {
            Some(item) if item.is_listed() && db.has_liked(other_user, ctx)? => Some(ctx),
            _ => None,
        },
        None => db.first_listed_item_liked_by(other_user, current_user)?,
    };

    debug!(
        user = %current_user,
        item = %liked_item_id,
        found = chosen.is_some(),
        "reciprocal like lookup"
    );

    Ok(chosen.map(|my_item_id| MatchCandidate {
        other_user_id: other_user,
        other_user_item_id: liked_item_id,
        my_item_id,
    }))
}

#[cfg(test)]
mod tests {
    use troc_shared::{clock, Like};

    use super::*;
    use crate::test_util::{db, listed};

    fn like(db: &Database, user: UserId, item: ItemId, ctx: Option<ItemId>) {
        db.insert_like(&Like {
            user_id: user,
            item_id: item,
            context_item_id: ctx,
            created_at: clock::now(),
        })
        .unwrap();
    }

    #[test]
    fn finds_reciprocal_like_from_any_owned_item() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let _lamp = listed(&db, alice, "Lamp");
        let camera = listed(&db, alice, "Camera");
        let guitar = listed(&db, bob, "Guitar");

        assert_eq!(detect(&db, alice, guitar.id, None).unwrap(), None);

        like(&db, bob, camera.id, None);
        let found = detect(&db, alice, guitar.id, None).unwrap().unwrap();
        assert_eq!(
            found,
            MatchCandidate {
                other_user_id: bob,
                other_user_item_id: guitar.id,
                my_item_id: camera.id,
            }
        );
    }

    #[test]
    fn oldest_item_wins_when_several_were_liked() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let first = listed(&db, alice, "First");
        let second = listed(&db, alice, "Second");
        let guitar = listed(&db, bob, "Guitar");
        like(&db, bob, second.id, None);
        like(&db, bob, first.id, None);

        let found = detect(&db, alice, guitar.id, None).unwrap().unwrap();
        assert_eq!(found.my_item_id, first.id);
    }

    #[test]
    fn context_restricts_the_pool() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let camera = listed(&db, alice, "Camera");
        let bike = listed(&db, alice, "Bike");
        let guitar = listed(&db, bob, "Guitar");
        like(&db, bob, camera.id, None);

        assert_eq!(detect(&db, alice, guitar.id, Some(bike.id)).unwrap(), None);
        let found = detect(&db, alice, guitar.id, Some(camera.id)).unwrap().unwrap();
        assert_eq!(found.my_item_id, camera.id);
    }

    #[test]
    fn withdrawn_items_are_not_offered() {
        let db = db();
        let (alice, bob) = (UserId::new(), UserId::new());
        let lamp = listed(&db, alice, "Lamp");
        let camera = listed(&db, alice, "Camera");
        let guitar = listed(&db, bob, "Guitar");
        like(&db, bob, lamp.id, None);
        db.set_item_flags(lamp.id, true, false).unwrap();

        assert_eq!(detect(&db, alice, guitar.id, None).unwrap(), None);
        assert_eq!(detect(&db, alice, guitar.id, Some(lamp.id)).unwrap(), None);

        like(&db, bob, camera.id, None);
        let found = detect(&db, alice, guitar.id, None).unwrap().unwrap();
        assert_eq!(found.my_item_id, camera.id);

        db.set_item_flags(camera.id, false, true).unwrap();
        assert_eq!(detect(&db, alice, guitar.id, None).unwrap(), None);
    }

    #[test]
    fn self_like_never_matches() {
        let db = db();
        let alice = UserId::new();
        let camera = listed(&db, alice, "Camera");
        like(&db, alice, camera.id, None);
        assert_eq!(detect(&db, alice, camera.id, None).unwrap(), None);
    }

    #[test]
    fn unknown_item_is_not_found() {
        let db = db();
        let missing = ItemId::new();
        assert!(matches!(
            detect(&db, UserId::new(), missing, None),
            Err(EngineError::NotFound(Entity::Item, id)) if id == missing.0
        ));
    }
}

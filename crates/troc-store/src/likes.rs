//! Like edges.  A like is never updated in place: it is inserted, or deleted
//! on unlike.

use rusqlite::{params, OptionalExtension};
use troc_shared::{ItemId, Like, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::sql::{fmt_ts, parse_col, parse_opt_col, parse_ts};

impl Database {
    /// Record a like.  Returns `false` when the same (user, item, context)
    /// triple was already present; the unique index swallows the duplicate.
    pub fn insert_like(&self, like: &Like) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO likes (user_id, item_id, context_item_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                like.user_id.to_string(),
                like.item_id.to_string(),
                like.context_item_id.map(|c| c.to_string()),
                fmt_ts(&like.created_at),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Delete the like for exactly this (user, item, context) triple.
    /// Returns `true` if a row was removed.
    pub fn delete_like(
        &self,
        user: UserId,
        item: ItemId,
        context_item: Option<ItemId>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM likes
             WHERE user_id = ?1 AND item_id = ?2
               AND IFNULL(context_item_id, '') = IFNULL(?3, '')",
            params![
                user.to_string(),
                item.to_string(),
                context_item.map(|c| c.to_string()),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Every like recorded by `user`, oldest first.
    pub fn list_likes_by_user(&self, user: UserId) -> Result<Vec<Like>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, item_id, context_item_id, created_at
             FROM likes
             WHERE user_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![user.to_string()], row_to_like)?;

        let mut likes = Vec::new();
        for row in rows {
            likes.push(row?);
        }
        Ok(likes)
    }

    /// Whether `user` has liked `item` in any context.
    pub fn has_liked(&self, user: UserId, item: ItemId) -> Result<bool> {
        Ok(self.conn().query_row(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE user_id = ?1 AND item_id = ?2)",
            params![user.to_string(), item.to_string()],
            |row| row.get(0),
        )?)
    }

    /// The oldest available, visible item of `owner` that `liker` has
    /// liked in any context.
    pub fn first_listed_item_liked_by(
        &self,
        liker: UserId,
        owner: UserId,
    ) -> Result<Option<ItemId>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT i.id FROM items i
                 WHERE i.owner_id = ?2 AND i.is_available = 1 AND i.is_visible = 1
                   AND i.id IN (SELECT item_id FROM likes WHERE user_id = ?1)
                 ORDER BY i.created_at ASC, i.rowid ASC
                 LIMIT 1",
                params![liker.to_string(), owner.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|id| parse_col(0, &id)).transpose()?)
    }
}

fn row_to_like(row: &rusqlite::Row<'_>) -> rusqlite::Result<Like> {
    let user_str: String = row.get(0)?;
    let item_str: String = row.get(1)?;
    let context_str: Option<String> = row.get(2)?;
    let created_str: String = row.get(3)?;

    Ok(Like {
        user_id: parse_col(0, &user_str)?,
        item_id: parse_col(1, &item_str)?,
        context_item_id: parse_opt_col(2, context_str)?,
        created_at: parse_ts(3, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::seed_item;

    fn like(user: UserId, item: ItemId, context: Option<ItemId>) -> Like {
        Like {
            user_id: user,
            item_id: item,
            context_item_id: context,
            created_at: troc_shared::clock::now(),
        }
    }

    #[test]
    fn duplicate_like_is_ignored() {
        let db = Database::open_in_memory().unwrap();
        let alice = UserId::new();
        let guitar = seed_item(&db, UserId::new(), "Guitar");

        assert!(db.insert_like(&like(alice, guitar.id, None)).unwrap());
        assert!(!db.insert_like(&like(alice, guitar.id, None)).unwrap());
        assert_eq!(db.list_likes_by_user(alice).unwrap().len(), 1);
    }

    #[test]
    fn same_item_in_different_contexts_is_a_set() {
        let db = Database::open_in_memory().unwrap();
        let alice = UserId::new();
        let camera = seed_item(&db, alice, "Camera");
        let lens = seed_item(&db, alice, "Lens");
        let guitar = seed_item(&db, UserId::new(), "Guitar");

        assert!(db.insert_like(&like(alice, guitar.id, Some(camera.id))).unwrap());
        assert!(db.insert_like(&like(alice, guitar.id, Some(lens.id))).unwrap());
        assert!(db.insert_like(&like(alice, guitar.id, None)).unwrap());
        assert!(!db.insert_like(&like(alice, guitar.id, Some(lens.id))).unwrap());

        assert_eq!(db.list_likes_by_user(alice).unwrap().len(), 3);
    }

    #[test]
    fn delete_only_touches_matching_context() {
        let db = Database::open_in_memory().unwrap();
        let alice = UserId::new();
        let camera = seed_item(&db, alice, "Camera");
        let guitar = seed_item(&db, UserId::new(), "Guitar");

        db.insert_like(&like(alice, guitar.id, Some(camera.id))).unwrap();
        db.insert_like(&like(alice, guitar.id, None)).unwrap();

        assert!(db.delete_like(alice, guitar.id, None).unwrap());
        assert!(!db.delete_like(alice, guitar.id, None).unwrap());

        let left = db.list_likes_by_user(alice).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].context_item_id, Some(camera.id));
    }

    #[test]
    fn has_liked_ignores_context() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = (UserId::new(), UserId::new());
        let camera = seed_item(&db, alice, "Camera");
        let guitar = seed_item(&db, bob, "Guitar");

        assert!(!db.has_liked(bob, camera.id).unwrap());
        db.insert_like(&like(bob, camera.id, Some(guitar.id))).unwrap();
        assert!(db.has_liked(bob, camera.id).unwrap());
        assert!(!db.has_liked(alice, camera.id).unwrap());
    }

    #[test]
    fn first_liked_item_skips_withdrawn_ones() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = (UserId::new(), UserId::new());
        let lamp = seed_item(&db, alice, "Lamp");
        let sofa = seed_item(&db, alice, "Sofa");
        let camera = seed_item(&db, alice, "Camera");
        let guitar = seed_item(&db, bob, "Guitar");

        assert_eq!(db.first_listed_item_liked_by(bob, alice).unwrap(), None);

        db.insert_like(&like(bob, camera.id, None)).unwrap();
        db.insert_like(&like(bob, sofa.id, Some(guitar.id))).unwrap();
        db.insert_like(&like(bob, lamp.id, None)).unwrap();
        assert_eq!(db.first_listed_item_liked_by(bob, alice).unwrap(), Some(lamp.id));

        db.set_item_flags(lamp.id, true, false).unwrap();
        db.set_item_flags(sofa.id, false, true).unwrap();
        assert_eq!(db.first_listed_item_liked_by(bob, alice).unwrap(), Some(camera.id));
        assert_eq!(db.first_listed_item_liked_by(alice, bob).unwrap(), None);
    }

    #[test]
    fn first_liked_item_scales_past_the_variable_limit() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = (UserId::new(), UserId::new());

        let tx = db.conn().unchecked_transaction().unwrap();
        for n in 0..33_000 {
            seed_item(&db, alice, &format!("Item {n}"));
        }
        tx.commit().unwrap();
        let wanted = seed_item(&db, alice, "Camera");
        db.insert_like(&like(bob, wanted.id, None)).unwrap();

        assert_eq!(db.first_listed_item_liked_by(bob, alice).unwrap(), Some(wanted.id));
    }
}

//! Confirmed matches.  Append-only: rows are inserted once and never updated
//! or deleted.

use rusqlite::{params, OptionalExtension};
use troc_shared::{ItemId, ItemPair, Match, MatchId, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::sql::{fmt_ts, parse_col, parse_ts};

const MATCH_COLUMNS: &str = "id, user_a, user_b, item_a, item_b, created_at";

impl Database {
    /// Insert a match.  A second row for the same unordered item pair fails
    /// with [`StoreError::Conflict`](crate::StoreError::Conflict).
    pub fn insert_match(&self, m: &Match) -> Result<()> {
        let pair = m.pair();
        self.conn().execute(
            "INSERT INTO matches (id, user_a, user_b, item_a, item_b, pair_lo, pair_hi, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                m.id.to_string(),
                m.user_a.to_string(),
                m.user_b.to_string(),
                m.item_a.to_string(),
                m.item_b.to_string(),
                pair.lo.to_string(),
                pair.hi.to_string(),
                fmt_ts(&m.created_at),
            ],
        )?;
        Ok(())
    }

    /// Look a match up under both orderings of the two (user, item) sides.
    pub fn find_match(
        &self,
        user_a: UserId,
        user_b: UserId,
        item_a: ItemId,
        item_b: ItemId,
    ) -> Result<Option<Match>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {MATCH_COLUMNS} FROM matches
                     WHERE (user_a = ?1 AND user_b = ?2 AND item_a = ?3 AND item_b = ?4)
                        OR (user_a = ?2 AND user_b = ?1 AND item_a = ?4 AND item_b = ?3)
                     LIMIT 1"
                ),
                params![
                    user_a.to_string(),
                    user_b.to_string(),
                    item_a.to_string(),
                    item_b.to_string(),
                ],
                row_to_match,
            )
            .optional()?)
    }

    /// Look a match up by its normalized item pair alone.
    pub fn find_match_by_pair(&self, pair: ItemPair) -> Result<Option<Match>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE pair_lo = ?1 AND pair_hi = ?2"),
                params![pair.lo.to_string(), pair.hi.to_string()],
                row_to_match,
            )
            .optional()?)
    }

    pub fn get_match(&self, id: MatchId) -> Result<Match> {
        Ok(self.conn().query_row(
            &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1"),
            params![id.to_string()],
            row_to_match,
        )?)
    }

    /// Matches `user` takes part in, newest first.
    pub fn list_matches_for_user(&self, user: UserId) -> Result<Vec<Match>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE user_a = ?1 OR user_b = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user.to_string()], row_to_match)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn count_matches(&self) -> Result<u64> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?)
    }
}

fn row_to_match(row: &rusqlite::Row<'_>) -> rusqlite::Result<Match> {
    let id_str: String = row.get(0)?;
    let user_a: String = row.get(1)?;
    let user_b: String = row.get(2)?;
    let item_a: String = row.get(3)?;
    let item_b: String = row.get(4)?;
    let created_str: String = row.get(5)?;

    Ok(Match {
        id: parse_col(0, &id_str)?,
        user_a: parse_col(1, &user_a)?,
        user_b: parse_col(2, &user_b)?,
        item_a: parse_col(3, &item_a)?,
        item_b: parse_col(4, &item_b)?,
        created_at: parse_ts(5, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::test_util::seed_item;

    fn new_match(user_a: UserId, user_b: UserId, item_a: ItemId, item_b: ItemId) -> Match {
        Match {
            id: MatchId::new(),
            user_a,
            user_b,
            item_a,
            item_b,
            created_at: troc_shared::clock::now(),
        }
    }

    #[test]
    fn reverse_insert_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = (UserId::new(), UserId::new());
        let camera = seed_item(&db, alice, "Camera");
        let guitar = seed_item(&db, bob, "Guitar");

        db.insert_match(&new_match(alice, bob, camera.id, guitar.id))
            .unwrap();
        let err = db
            .insert_match(&new_match(bob, alice, guitar.id, camera.id))
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict));
        assert_eq!(db.count_matches().unwrap(), 1);
    }

    #[test]
    fn find_under_either_ordering() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = (UserId::new(), UserId::new());
        let camera = seed_item(&db, alice, "Camera");
        let guitar = seed_item(&db, bob, "Guitar");
        let m = new_match(alice, bob, camera.id, guitar.id);
        db.insert_match(&m).unwrap();

        let forward = db.find_match(alice, bob, camera.id, guitar.id).unwrap();
        let reverse = db.find_match(bob, alice, guitar.id, camera.id).unwrap();
        assert_eq!(forward.as_ref().map(|f| f.id), Some(m.id));
        assert_eq!(reverse.map(|r| r.id), Some(m.id));

        // Mismatched sides are not the same match.
        assert!(db.find_match(alice, bob, guitar.id, camera.id).unwrap().is_none());
        assert_eq!(
            db.find_match_by_pair(ItemPair::new(guitar.id, camera.id))
                .unwrap()
                .map(|p| p.id),
            Some(m.id)
        );
    }

    #[test]
    fn listing_for_either_side() {
        let db = Database::open_in_memory().unwrap();
        let (alice, bob) = (UserId::new(), UserId::new());
        let camera = seed_item(&db, alice, "Camera");
        let guitar = seed_item(&db, bob, "Guitar");
        let m = new_match(alice, bob, camera.id, guitar.id);
        db.insert_match(&m).unwrap();

        assert_eq!(db.list_matches_for_user(alice).unwrap(), vec![m.clone()]);
        assert_eq!(db.list_matches_for_user(bob).unwrap(), vec![m.clone()]);
        assert!(db.list_matches_for_user(UserId::new()).unwrap().is_empty());
        assert_eq!(db.get_match(m.id).unwrap(), m);
    }
}

//! Trade conversations.
//!
//! Every status change is a conditional `UPDATE` whose `WHERE` clause encodes
//! the state-machine guard.  The returned `bool` tells the caller whether the
//! transition happened, which makes each step safe to repeat and safe under
//! concurrent callers: a row can only be moved out of an open state once.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use troc_shared::{Conversation, ConversationId, ItemPair, Message, Party, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::messages::insert_message_row;
use crate::sql::{fmt_ts, parse_col, parse_opt_ts, parse_ts};

const CONVERSATION_COLUMNS: &str = "id, requester_id, owner_id, requester_item_id, owner_item_id, \
                                    status, requester_accepted, owner_accepted, completed_at, \
                                    created_at, updated_at";

/// Statuses a conversation can still leave.
const OPEN: &str = "('pending', 'accepted')";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a conversation.  A second non-rejected conversation for the
    /// same unordered item pair fails with
    /// [`StoreError::Conflict`](crate::StoreError::Conflict).
    pub fn insert_conversation(&self, conv: &Conversation) -> Result<()> {
        insert_row(self.conn(), conv)
    }

    /// Insert a conversation together with its first message.  Either both
    /// rows are committed or neither is.
    pub fn insert_conversation_with_message(
        &self,
        conv: &Conversation,
        first: &Message,
    ) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        insert_row(&tx, conv)?;
        insert_message_row(&tx, first)?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        Ok(self.conn().query_row(
            &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
            params![id.to_string()],
            row_to_conversation,
        )?)
    }

    /// The non-rejected conversation over this item pair, if any.
    pub fn find_active_conversation(&self, pair: ItemPair) -> Result<Option<Conversation>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE pair_lo = ?1 AND pair_hi = ?2 AND status != 'rejected'"
                ),
                params![pair.lo.to_string(), pair.hi.to_string()],
                row_to_conversation,
            )
            .optional()?)
    }

    /// The most recently opened conversation over this item pair, whatever
    /// its status.
    pub fn find_latest_conversation(&self, pair: ItemPair) -> Result<Option<Conversation>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE pair_lo = ?1 AND pair_hi = ?2
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![pair.lo.to_string(), pair.hi.to_string()],
                row_to_conversation,
            )
            .optional()?)
    }

    /// Conversations `user` is a party to, most recently updated first.
    pub fn list_conversations_for_user(&self, user: UserId) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE requester_id = ?1 OR owner_id = ?1
             ORDER BY updated_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user.to_string()], row_to_conversation)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Conversations of `user` changed strictly after `since`.
    pub fn list_conversations_updated_since(
        &self,
        user: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE (requester_id = ?1 OR owner_id = ?1) AND updated_at > ?2
             ORDER BY updated_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user.to_string(), fmt_ts(&since)], row_to_conversation)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Open conversations where both parties signed off but the status has
    /// not been promoted yet.
    pub fn list_awaiting_reconcile(&self) -> Result<Vec<ConversationId>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT id FROM conversations
             WHERE status IN {OPEN} AND requester_accepted = 1 AND owner_accepted = 1
             ORDER BY updated_at ASC"
        ))?;
        let rows = stmt.query_map([], |row| {
            let raw: String = row.get(0)?;
            parse_col::<ConversationId>(0, &raw)
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Set one party's acceptance flag.  Only open conversations change;
    /// returns `false` for terminal or unknown ones.
    pub fn set_acceptance_flag(
        &self,
        id: ConversationId,
        party: Party,
        accepted: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let column = match party {
            Party::Requester => "requester_accepted",
            Party::Owner => "owner_accepted",
        };
        let affected = self.conn().execute(
            &format!(
                "UPDATE conversations SET {column} = ?2, updated_at = ?3
                 WHERE id = ?1 AND status IN {OPEN}"
            ),
            params![id.to_string(), accepted, fmt_ts(&now)],
        )?;
        Ok(affected > 0)
    }

    /// Promote an open conversation with both flags set to `completed`.
    pub fn complete_if_both_accepted(&self, id: ConversationId, now: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            &format!(
                "UPDATE conversations
                 SET status = 'completed', completed_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND status IN {OPEN}
                   AND requester_accepted = 1 AND owner_accepted = 1"
            ),
            params![id.to_string(), fmt_ts(&now)],
        )?;
        Ok(affected > 0)
    }

    /// Mark an open conversation `completed` regardless of the flags.
    pub fn force_complete(&self, id: ConversationId, now: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            &format!(
                "UPDATE conversations
                 SET status = 'completed', completed_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND status IN {OPEN}"
            ),
            params![id.to_string(), fmt_ts(&now)],
        )?;
        Ok(affected > 0)
    }

    /// Reject an open conversation and clear both acceptance flags.
    pub fn reject_conversation(&self, id: ConversationId, now: DateTime<Utc>) -> Result<bool> {
        let affected = self.conn().execute(
            &format!(
                "UPDATE conversations
                 SET status = 'rejected', requester_accepted = 0, owner_accepted = 0,
                     updated_at = ?2
                 WHERE id = ?1 AND status IN {OPEN}"
            ),
            params![id.to_string(), fmt_ts(&now)],
        )?;
        Ok(affected > 0)
    }

    /// Bump `updated_at`, e.g. when a message is posted, so pollers see it.
    pub fn touch_conversation(&self, id: ConversationId, now: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
            params![id.to_string(), fmt_ts(&now)],
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_row(conn: &Connection, conv: &Conversation) -> Result<()> {
    let pair = conv.pair();
    conn.execute(
        "INSERT INTO conversations (id, requester_id, owner_id, requester_item_id, owner_item_id,
                                    status, requester_accepted, owner_accepted, completed_at,
                                    pair_lo, pair_hi, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            conv.id.to_string(),
            conv.requester_id.to_string(),
            conv.owner_id.to_string(),
            conv.requester_item_id.to_string(),
            conv.owner_item_id.to_string(),
            conv.status.as_str(),
            conv.requester_accepted,
            conv.owner_accepted,
            conv.completed_at.as_ref().map(fmt_ts),
            pair.lo.to_string(),
            pair.hi.to_string(),
            fmt_ts(&conv.created_at),
            fmt_ts(&conv.updated_at),
        ],
    )?;
    Ok(())
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = row.get(0)?;
    let requester_str: String = row.get(1)?;
    let owner_str: String = row.get(2)?;
    let requester_item_str: String = row.get(3)?;
    let owner_item_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let completed_str: Option<String> = row.get(8)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    Ok(Conversation {
        id: parse_col(0, &id_str)?,
        requester_id: parse_col(1, &requester_str)?,
        owner_id: parse_col(2, &owner_str)?,
        requester_item_id: parse_col(3, &requester_item_str)?,
        owner_item_id: parse_col(4, &owner_item_str)?,
        status: parse_col(5, &status_str)?,
        requester_accepted: row.get(6)?,
        owner_accepted: row.get(7)?,
        completed_at: parse_opt_ts(8, completed_str)?,
        created_at: parse_ts(9, &created_str)?,
        updated_at: parse_ts(10, &updated_str)?,
    })
}

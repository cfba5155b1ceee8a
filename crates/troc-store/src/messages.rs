use rusqlite::{params, Connection};
use troc_shared::{ConversationId, Message};

use crate::database::Database;
use crate::error::Result;
use crate::sql::{fmt_ts, parse_col, parse_ts};

impl Database {
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        insert_message_row(self.conn(), message)
    }

    /// Messages of a conversation in the order they were posted.
    pub fn list_messages_for_conversation(
        &self,
        conversation_id: ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, conversation_id, sender_id, content, attachment_urls, created_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(
            params![conversation_id.to_string(), limit, offset],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

pub(crate) fn insert_message_row(conn: &Connection, message: &Message) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, conversation_id, sender_id, content, attachment_urls, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            message.id.to_string(),
            message.conversation_id.to_string(),
            message.sender_id.to_string(),
            message.text,
            serde_json::to_string(&message.attachment_urls)?,
            fmt_ts(&message.created_at),
        ],
    )?;
    Ok(())
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let conversation_str: String = row.get(1)?;
    let sender_str: String = row.get(2)?;
    let attachments_json: String = row.get(4)?;
    let created_str: String = row.get(5)?;

    let attachment_urls: Vec<String> = serde_json::from_str(&attachments_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        id: parse_col(0, &id_str)?,
        conversation_id: parse_col(1, &conversation_str)?,
        sender_id: parse_col(2, &sender_str)?,
        text: row.get(3)?,
        attachment_urls,
        created_at: parse_ts(5, &created_str)?,
    })
}

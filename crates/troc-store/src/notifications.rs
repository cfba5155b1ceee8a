use rusqlite::params;
use troc_shared::{Notification, NotificationId, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::sql::{fmt_ts, parse_col, parse_opt_col, parse_ts};

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, title, body, related_id, is_read, created_at";

impl Database {
    pub fn insert_notification(&self, n: &Notification) -> Result<()> {
        self.conn().execute(
            "INSERT INTO notifications (id, recipient_id, kind, title, body, related_id, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                n.id.to_string(),
                n.recipient_id.to_string(),
                n.kind.as_str(),
                n.title,
                n.body,
                n.related_id.map(|r| r.to_string()),
                n.is_read,
                fmt_ts(&n.created_at),
            ],
        )?;
        Ok(())
    }

    /// Notifications addressed to `recipient`, newest first.
    pub fn list_notifications_for_user(&self, recipient: UserId) -> Result<Vec<Notification>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE recipient_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![recipient.to_string()], row_to_notification)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub fn count_unread_notifications(&self, recipient: UserId) -> Result<u64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
            params![recipient.to_string()],
            |row| row.get(0),
        )?)
    }

    /// Mark a notification read.  Scoped to the recipient so nobody else can
    /// flip it; returns `false` when no such notification belongs to them.
    pub fn mark_notification_read(&self, id: NotificationId, recipient: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
            params![id.to_string(), recipient.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn get_notification(&self, id: NotificationId) -> Result<Notification> {
        Ok(self.conn().query_row(
            &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
            params![id.to_string()],
            row_to_notification,
        )?)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let id_str: String = row.get(0)?;
    let recipient_str: String = row.get(1)?;
    let kind_str: String = row.get(2)?;
    let related_str: Option<String> = row.get(5)?;
    let created_str: String = row.get(7)?;

    Ok(Notification {
        id: parse_col(0, &id_str)?,
        recipient_id: parse_col(1, &recipient_str)?,
        kind: parse_col(2, &kind_str)?,
        title: row.get(3)?,
        body: row.get(4)?,
        related_id: parse_opt_col(5, related_str)?,
        is_read: row.get(6)?,
        created_at: parse_ts(7, &created_str)?,
    })
}

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- "conversations changed since" polling
CREATE INDEX IF NOT EXISTS idx_conversations_updated
    ON conversations(updated_at);

-- reconcile sweep: open conversations both parties signed off on
CREATE INDEX IF NOT EXISTS idx_conversations_reconcile
    ON conversations(status)
    WHERE requester_accepted = 1 AND owner_accepted = 1;

CREATE INDEX IF NOT EXISTS idx_notifications_unread
    ON notifications(recipient_id)
    WHERE is_read = 0;
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `items`, `likes`, `matches`,
//! `conversations`, `messages` and `notifications`.
//!
//! `pair_lo` / `pair_hi` hold the two item ids of a match or conversation in
//! sorted order; the unique indexes on them make "one row per unordered item
//! pair" a storage-level guarantee.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Items
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS items (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    owner_id     TEXT NOT NULL,               -- user UUID from the auth provider
    name         TEXT NOT NULL,
    category     TEXT,
    condition    TEXT,
    price_range  TEXT,
    is_available INTEGER NOT NULL DEFAULT 1,  -- boolean 0/1
    is_visible   INTEGER NOT NULL DEFAULT 1,  -- boolean 0/1
    created_at   TEXT NOT NULL                -- RFC-3339, microseconds, UTC
);

CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id, created_at);

-- ----------------------------------------------------------------
-- Likes
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS likes (
    user_id         TEXT NOT NULL,
    item_id         TEXT NOT NULL,            -- FK -> items(id)
    context_item_id TEXT,                     -- nullable FK -> items(id)
    created_at      TEXT NOT NULL,

    FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE,
    FOREIGN KEY (context_item_id) REFERENCES items(id) ON DELETE CASCADE
);

-- NULL contexts compare equal here, unlike in a plain UNIQUE column list.
CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_unique
    ON likes(user_id, item_id, IFNULL(context_item_id, ''));

CREATE INDEX IF NOT EXISTS idx_likes_item ON likes(item_id, user_id);

-- ----------------------------------------------------------------
-- Matches
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS matches (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    user_a     TEXT NOT NULL,
    user_b     TEXT NOT NULL,
    item_a     TEXT NOT NULL,                 -- owned by user_a
    item_b     TEXT NOT NULL,                 -- owned by user_b
    pair_lo    TEXT NOT NULL,
    pair_hi    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (item_a) REFERENCES items(id),
    FOREIGN KEY (item_b) REFERENCES items(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_matches_pair ON matches(pair_lo, pair_hi);
CREATE INDEX IF NOT EXISTS idx_matches_user_a ON matches(user_a);
CREATE INDEX IF NOT EXISTS idx_matches_user_b ON matches(user_b);

-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id                 TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    requester_id       TEXT NOT NULL,
    owner_id           TEXT NOT NULL,
    requester_item_id  TEXT NOT NULL,
    owner_item_id      TEXT NOT NULL,
    status             TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'accepted', 'rejected', 'completed')),
    requester_accepted INTEGER NOT NULL DEFAULT 0,
    owner_accepted     INTEGER NOT NULL DEFAULT 0,
    completed_at       TEXT,
    pair_lo            TEXT NOT NULL,
    pair_hi            TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,

    FOREIGN KEY (requester_item_id) REFERENCES items(id),
    FOREIGN KEY (owner_item_id) REFERENCES items(id)
);

-- At most one non-rejected conversation per item pair.
CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_active_pair
    ON conversations(pair_lo, pair_hi)
    WHERE status != 'rejected';

CREATE INDEX IF NOT EXISTS idx_conversations_requester ON conversations(requester_id);
CREATE INDEX IF NOT EXISTS idx_conversations_owner ON conversations(owner_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    conversation_id TEXT NOT NULL,               -- FK -> conversations(id)
    sender_id       TEXT NOT NULL,
    content         TEXT NOT NULL,
    attachment_urls TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    created_at      TEXT NOT NULL,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation_id, created_at);

-- ----------------------------------------------------------------
-- Notifications
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id           TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    recipient_id TEXT NOT NULL,
    kind         TEXT NOT NULL,                  -- e.g. 'match', 'trade_accepted'
    title        TEXT NOT NULL,
    body         TEXT NOT NULL,
    related_id   TEXT,                           -- match or conversation UUID
    is_read      INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_recipient
    ON notifications(recipient_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

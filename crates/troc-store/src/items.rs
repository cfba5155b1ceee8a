//! CRUD operations for [`Item`] records.
//!
//! Items are edited by the listing flow; the matching engine only reads them.

use rusqlite::{params, OptionalExtension};
use troc_shared::{Item, ItemId, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::sql::{fmt_ts, parse_col, parse_ts};

const ITEM_COLUMNS: &str = "id, owner_id, name, category, condition, price_range, \
                            is_available, is_visible, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new item.
    pub fn insert_item(&self, item: &Item) -> Result<()> {
        self.conn().execute(
            "INSERT INTO items (id, owner_id, name, category, condition, price_range,
                                is_available, is_visible, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.id.to_string(),
                item.owner_id.to_string(),
                item.name,
                item.category,
                item.condition,
                item.price_range,
                item.is_available,
                item.is_visible,
                fmt_ts(&item.created_at),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single item by id.
    pub fn get_item(&self, id: ItemId) -> Result<Item> {
        Ok(self.conn().query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
            params![id.to_string()],
            row_to_item,
        )?)
    }

    pub fn find_item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
                params![id.to_string()],
                row_to_item,
            )
            .optional()?)
    }

    /// All items owned by `owner`, oldest first.
    ///
    /// The order is stable (creation time, then insertion order) because the
    /// match detector's tie-break relies on it.
    pub fn list_items_for_owner(&self, owner: UserId) -> Result<Vec<Item>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE owner_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;

        let rows = stmt.query_map(params![owner.to_string()], row_to_item)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update the availability and visibility flags.  Returns `true` if the
    /// item exists.
    pub fn set_item_flags(&self, id: ItemId, is_available: bool, is_visible: bool) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE items SET is_available = ?2, is_visible = ?3 WHERE id = ?1",
            params![id.to_string(), is_available, is_visible],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to an [`Item`].
fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let id_str: String = row.get(0)?;
    let owner_str: String = row.get(1)?;
    let created_str: String = row.get(8)?;

    Ok(Item {
        id: parse_col(0, &id_str)?,
        owner_id: parse_col(1, &owner_str)?,
        name: row.get(2)?,
        category: row.get(3)?,
        condition: row.get(4)?,
        price_range: row.get(5)?,
        is_available: row.get(6)?,
        is_visible: row.get(7)?,
        created_at: parse_ts(8, &created_str)?,
    })
}

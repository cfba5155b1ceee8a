use troc_shared::{clock, Item, ItemId, UserId};
use troc_store::Database;

pub(crate) fn db() -> Database {
    Database::open_in_memory().unwrap()
}

/// Insert an available, visible item for `owner`.
pub(crate) fn listed(db: &Database, owner: UserId, name: &str) -> Item {
    let item = Item {
        id: ItemId::new(),
        owner_id: owner,
        name: name.to_string(),
        category: None,
        condition: None,
        price_range: None,
        is_available: true,
        is_visible: true,
        created_at: clock::now(),
    };
    db.insert_item(&item).unwrap();
    item
}

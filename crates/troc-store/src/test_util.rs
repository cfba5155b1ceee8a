use troc_shared::clock;
use troc_shared::{Item, ItemId, UserId};

use crate::database::Database;

pub(crate) fn item(owner: UserId, name: &str) -> Item {
    Item {
        id: ItemId::new(),
        owner_id: owner,
        name: name.to_string(),
        category: None,
        condition: None,
        price_range: None,
        is_available: true,
        is_visible: true,
        created_at: clock::now(),
    }
}

pub(crate) fn seed_item(db: &Database, owner: UserId, name: &str) -> Item {
    let item = item(owner, name);
    db.insert_item(&item).unwrap();
    item
}

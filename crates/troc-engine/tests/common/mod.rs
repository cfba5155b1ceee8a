#![allow(dead_code)]

use troc_engine::{Marketplace, Session};
use troc_shared::protocol::NewItemRequest;
use troc_shared::{Item, UserId};
use troc_store::Database;

pub fn as_user(db: &Database, user: UserId) -> Marketplace<'_> {
    Marketplace::new(db, &Session::new(user))
}

pub fn list_item(db: &Database, owner: UserId, name: &str) -> Item {
    as_user(db, owner)
        .create_item(NewItemRequest {
            name: name.to_string(),
            category: None,
            condition: None,
            price_range: None,
        })
        .unwrap()
}

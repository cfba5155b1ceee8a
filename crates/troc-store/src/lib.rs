//! # troc-store
//!
//! Persistent store for the Troc marketplace, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  Pair deduplication for matches and conversations is enforced by
//! unique indexes, so concurrent writers surface [`StoreError::Conflict`]
//! instead of creating duplicates.

pub mod conversations;
pub mod database;
pub mod items;
pub mod likes;
pub mod matches;
pub mod messages;
pub mod migrations;
pub mod notifications;

mod error;
mod sql;

#[cfg(test)]
mod test_util;

pub use database::Database;
pub use error::{Result, StoreError};

//! # troc-client
//!
//! Async HTTP client for the Troc server, plus [`LikeBoard`], the local
//! optimistic projection of the user's likes that UIs render from.

pub mod api;
pub mod board;
pub mod error;

pub use api::ApiClient;
pub use board::{LikeBoard, LikeKey, Pending};
pub use error::{ClientError, Result};

//! # troc-shared
//!
//! Types shared by every Troc crate: identifier newtypes, the persisted
//! domain models and the JSON bodies of the HTTP API.

pub mod clock;
pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod types;

pub use error::UnknownVariant;
pub use models::*;
pub use types::*;

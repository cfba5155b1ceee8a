//! # troc-engine
//!
//! Mutual-match detection and trade-conversation lifecycle.
//!
//! The flow for a single like is:
//!
//! 1. [`registrar`] validates and records the like,
//! 2. [`detector`] looks for a reciprocal like in the liker's item pool,
//! 3. [`recorder`] turns a candidate into exactly one [`Match`] row,
//! 4. [`orchestrator`] opens (or reuses) the trade conversation,
//! 5. [`notifier`] tells both parties, best-effort.
//!
//! There is no in-process locking.  Every step is a re-check-then-act over
//! the store, and the store's unique indexes settle races between
//! concurrent callers.  [`Marketplace`] ties the steps together behind one
//! method per client-facing operation.
//!
//! [`Match`]: troc_shared::Match

pub mod detector;
pub mod error;
pub mod marketplace;
pub mod notifier;
pub mod orchestrator;
pub mod recorder;
pub mod registrar;
pub mod session;

#[cfg(test)]
mod test_util;

pub use error::{EngineError, Entity, Result, ValidationReason};
pub use marketplace::{reconcile_sweep, Marketplace};
pub use session::{Session, SessionProvider};

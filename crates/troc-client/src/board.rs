//! Optimistic like state.
//!
//! A tap on "like" flips the heart immediately; the request runs in the
//! background and its result either confirms the flip or rolls it back.
//! The server stays authoritative: a failed request restores exactly the
//! state the board had before, and a successful one can add a match the
//! board did not know about.
//!
//! Overlapping requests on the same key are resolved by generation: only
//! the settle of the most recent `begin_*` may roll back.

use std::collections::HashMap;

use troc_shared::protocol::LikeOutcome;
use troc_shared::{ConversationId, ItemId};
use tracing::debug;

use crate::api::ApiClient;
use crate::error::Result;

/// A like is identified by the liked item and the optional context item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LikeKey {
    pub item_id: ItemId,
    pub context_item_id: Option<ItemId>,
}

impl LikeKey {
    pub fn new(item_id: ItemId, context_item_id: Option<ItemId>) -> Self {
        Self {
            item_id,
            context_item_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    liked: bool,
    generation: u64,
}

/// Ticket for one in-flight optimistic change.
#[derive(Debug)]
#[must_use = "an optimistic change must be settled"]
pub struct Pending {
    key: LikeKey,
    previous: bool,
    generation: u64,
}

impl Pending {
    pub fn key(&self) -> LikeKey {
        self.key
    }
}

#[derive(Debug, Default)]
pub struct LikeBoard {
    entries: HashMap<LikeKey, Entry>,
    /// Items that matched, and the conversation the match opened.
    matches: HashMap<ItemId, ConversationId>,
}

impl LikeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_liked(&self, key: &LikeKey) -> bool {
        self.entries.get(key).map(|e| e.liked).unwrap_or(false)
    }

    pub fn conversation_for(&self, item_id: ItemId) -> Option<ConversationId> {
        self.matches.get(&item_id).copied()
    }

    pub fn begin_like(&mut self, key: LikeKey) -> Pending {
        self.begin(key, true)
    }

    pub fn begin_unlike(&mut self, key: LikeKey) -> Pending {
        self.begin(key, false)
    }

    fn begin(&mut self, key: LikeKey, liked: bool) -> Pending {
        let entry = self.entries.entry(key).or_default();
        let previous = entry.liked;
        entry.liked = liked;
        entry.generation += 1;
        Pending {
            key,
            previous,
            generation: entry.generation,
        }
    }

    /// Resolve an optimistic change with the server's answer and hand the
    /// answer back unchanged.
    pub fn settle<T>(&mut self, pending: Pending, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            match self.entries.get_mut(&pending.key) {
                Some(entry) if entry.generation == pending.generation => {
                    debug!(item = %pending.key.item_id, error = %e, "rolling back optimistic like");
                    entry.liked = pending.previous;
                }
                _ => debug!(item = %pending.key.item_id, "stale failure ignored"),
            }
        }
        result
    }

    /// Fold a like outcome into the board: remember the conversation when
    /// the like produced a match.
    pub fn observe(&mut self, key: LikeKey, outcome: &LikeOutcome) {
        if let (true, Some(conversation)) = (outcome.matched, outcome.conversation_id) {
            self.matches.insert(key.item_id, conversation);
        }
    }

    /// Like through `client`, optimistically.
    pub async fn like(&mut self, client: &ApiClient, key: LikeKey) -> Result<LikeOutcome> {
        let pending = self.begin_like(key);
        let result = client.like(key.item_id, key.context_item_id).await;
        let outcome = self.settle(pending, result)?;
        self.observe(key, &outcome);
        Ok(outcome)
    }

    /// Unlike through `client`, optimistically.  A match already recorded
    /// stays on the board; the server keeps it too.
    pub async fn unlike(&mut self, client: &ApiClient, key: LikeKey) -> Result<()> {
        let pending = self.begin_unlike(key);
        let result = client.unlike(key.item_id, key.context_item_id).await;
        self.settle(pending, result)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use troc_shared::protocol::MatchInfo;
    use troc_shared::{MatchId, UserId};

    use super::*;
    use crate::error::ClientError;

    fn failure<T>() -> Result<T> {
        Err(ClientError::Api {
            status: 422,
            message: "Invalid request: item is no longer available".into(),
            code: Some("item_unavailable".into()),
        })
    }

    #[test]
    fn like_is_visible_before_the_server_answers() {
        let mut board = LikeBoard::new();
        let key = LikeKey::new(ItemId::new(), None);

        let pending = board.begin_like(key);
        assert!(board.is_liked(&key));

        board.settle(pending, Ok(())).unwrap();
        assert!(board.is_liked(&key));
    }

    #[test]
    fn failed_like_rolls_back() {
        let mut board = LikeBoard::new();
        let key = LikeKey::new(ItemId::new(), None);

        let pending = board.begin_like(key);
        let err = board.settle(pending, failure::<()>()).unwrap_err();
        assert_eq!(err.code(), Some("item_unavailable"));
        assert!(!board.is_liked(&key));
    }

    #[test]
    fn failed_unlike_restores_the_like() {
        let mut board = LikeBoard::new();
        let key = LikeKey::new(ItemId::new(), None);
        let pending = board.begin_like(key);
        board.settle(pending, Ok(())).unwrap();

        let pending = board.begin_unlike(key);
        assert!(!board.is_liked(&key));
        assert!(board.settle(pending, failure::<()>()).is_err());
        assert!(board.is_liked(&key));
    }

    #[test]
    fn stale_failure_does_not_clobber_newer_change() {
        let mut board = LikeBoard::new();
        let key = LikeKey::new(ItemId::new(), None);

        let first = board.begin_like(key);
        let second = board.begin_unlike(key);

        // The older like fails after the unlike was issued.
        assert!(board.settle(first, failure::<()>()).is_err());
        assert!(!board.is_liked(&key));

        board.settle(second, Ok(())).unwrap();
        assert!(!board.is_liked(&key));
    }

    #[test]
    fn contexts_are_tracked_separately() {
        let mut board = LikeBoard::new();
        let item = ItemId::new();
        let plain = LikeKey::new(item, None);
        let scoped = LikeKey::new(item, Some(ItemId::new()));

        let pending = board.begin_like(scoped);
        board.settle(pending, Ok(())).unwrap();
        assert!(board.is_liked(&scoped));
        assert!(!board.is_liked(&plain));
    }

    #[test]
    fn matched_outcome_records_conversation() {
        let mut board = LikeBoard::new();
        let key = LikeKey::new(ItemId::new(), None);
        let conversation = ConversationId::new();
        let outcome = LikeOutcome {
            matched: true,
            match_info: Some(MatchInfo {
                match_id: MatchId::new(),
                other_user_id: UserId::new(),
                other_user_item_id: key.item_id,
                my_item_id: ItemId::new(),
            }),
            conversation_id: Some(conversation),
        };

        board.observe(key, &LikeOutcome::unmatched());
        assert_eq!(board.conversation_for(key.item_id), None);

        board.observe(key, &outcome);
        assert_eq!(board.conversation_for(key.item_id), Some(conversation));
    }
}

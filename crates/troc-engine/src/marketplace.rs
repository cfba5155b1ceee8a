//! One method per client-facing operation, bound to the caller's session.

use chrono::{DateTime, Utc};
use troc_shared::protocol::{
    LikeOutcome, MatchInfo, NewItemRequest, ProposeTradeResponse, StatusResponse, UnlikeOutcome,
};
use troc_shared::{
    clock, Conversation, ConversationId, Item, ItemId, Match, Message, Notification,
    NotificationId, UserId,
};
use troc_store::Database;
use tracing::{info, warn};

use crate::error::{EngineError, Entity, Result, ValidationReason};
use crate::orchestrator;
use crate::session::{require_user, Session, SessionProvider};
use crate::{notifier, recorder, registrar};

/// The engine as seen by one caller.
///
/// Cheap to build per request: it borrows the store and copies the
/// session.  Every method refuses to run without a signed-in user.
pub struct Marketplace<'a> {
    db: &'a Database,
    session: Option<Session>,
}

impl<'a> Marketplace<'a> {
    pub fn new(db: &'a Database, sessions: &impl SessionProvider) -> Self {
        Self {
            db,
            session: sessions.current_session(),
        }
    }

    fn user(&self) -> Result<UserId> {
        require_user(&self.session)
    }

    /// Load a conversation and make sure the caller is one of its parties.
    fn party_conversation(&self, user: UserId, id: ConversationId) -> Result<Conversation> {
        let conversation = orchestrator::load(self.db, id)?;
        if conversation.party_of(user).is_none() {
            return Err(EngineError::Forbidden("not a party to this conversation"));
        }
        Ok(conversation)
    }

    fn item_name(&self, id: ItemId) -> String {
        match self.db.find_item(id) {
            Ok(Some(item)) => item.name,
            _ => "item".to_string(),
        }
    }

    fn status(&self, id: ConversationId) -> Result<StatusResponse> {
        let conversation = orchestrator::load(self.db, id)?;
        Ok(StatusResponse {
            conversation_id: conversation.id,
            status: conversation.status,
        })
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    pub fn create_item(&self, req: NewItemRequest) -> Result<Item> {
        let owner = self.user()?;
        let name = req.name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation(ValidationReason::EmptyName));
        }
        let item = Item {
            id: ItemId::new(),
            owner_id: owner,
            name: name.to_string(),
            category: req.category,
            condition: req.condition,
            price_range: req.price_range,
            is_available: true,
            is_visible: true,
            created_at: clock::now(),
        };
        self.db.insert_item(&item)?;
        info!(item = %item.id, %owner, "item listed");
        Ok(item)
    }

    pub fn list_items(&self) -> Result<Vec<Item>> {
        let owner = self.user()?;
        Ok(self.db.list_items_for_owner(owner)?)
    }

    /// Toggle availability and visibility of one of the caller's items.
    pub fn set_item_flags(&self, id: ItemId, is_available: bool, is_visible: bool) -> Result<Item> {
        let owner = self.user()?;
        let item = self
            .db
            .get_item(id)
            .map_err(EngineError::missing(Entity::Item, id.0))?;
        if item.owner_id != owner {
            return Err(EngineError::Forbidden("not your item"));
        }
        self.db.set_item_flags(id, is_available, is_visible)?;
        Ok(Item {
            is_available,
            is_visible,
            ..item
        })
    }

    // ------------------------------------------------------------------
    // Likes and matches
    // ------------------------------------------------------------------

    /// Like an item.  If this completes a reciprocal pair, the match is
    /// recorded, both users are notified and a conversation is opened, all
    /// before returning.  Liking again after that reports the same match
    /// and its conversation without reopening anything.
    pub fn like(&self, item_id: ItemId, context_item_id: Option<ItemId>) -> Result<LikeOutcome> {
        let user = self.user()?;
        let registered = registrar::record_like(self.db, user, item_id, context_item_id)?;
        let Some(candidate) = registered.candidate else {
            return Ok(LikeOutcome::unmatched());
        };

        let confirmed = recorder::confirm(
            self.db,
            user,
            candidate.other_user_id,
            candidate.my_item_id,
            candidate.other_user_item_id,
        )?;
        if confirmed.created {
            let mine = self.item_name(candidate.my_item_id);
            let theirs = self.item_name(candidate.other_user_item_id);
            let match_id = confirmed.record.id;
            notifier::notify_match(self.db, user, &mine, &theirs, match_id);
            notifier::notify_match(self.db, candidate.other_user_id, &theirs, &mine, match_id);
        }

        let conversation = orchestrator::conversation_for_match(
            self.db,
            &confirmed.record,
            confirmed.created,
            user,
        )?;

        Ok(LikeOutcome {
            matched: true,
            match_info: Some(MatchInfo {
                match_id: confirmed.record.id,
                other_user_id: candidate.other_user_id,
                other_user_item_id: candidate.other_user_item_id,
                my_item_id: candidate.my_item_id,
            }),
            conversation_id: Some(conversation.id),
        })
    }

    pub fn unlike(&self, item_id: ItemId, context_item_id: Option<ItemId>) -> Result<UnlikeOutcome> {
        let user = self.user()?;
        registrar::remove_like(self.db, user, item_id, context_item_id)?;
        Ok(UnlikeOutcome { ok: true })
    }

    pub fn list_matches(&self) -> Result<Vec<Match>> {
        let user = self.user()?;
        Ok(self.db.list_matches_for_user(user)?)
    }

    // ------------------------------------------------------------------
    // Trades
    // ------------------------------------------------------------------

    /// Propose `my_item_id` in exchange for `their_item_id`.  Proposing the
    /// same pair again returns the conversation already open for it.
    pub fn propose_trade(
        &self,
        their_item_id: ItemId,
        my_item_id: ItemId,
    ) -> Result<ProposeTradeResponse> {
        let user = self.user()?;
        let theirs = self
            .db
            .find_item(their_item_id)?
            .ok_or(EngineError::Validation(ValidationReason::MissingItem))?;

        let opened =
            orchestrator::propose(self.db, user, theirs.owner_id, my_item_id, their_item_id)?;
        if opened.created {
            let mine = self.item_name(my_item_id);
            notifier::notify_trade_proposed(
                self.db,
                theirs.owner_id,
                &mine,
                &theirs.name,
                opened.conversation.id,
            );
        }
        Ok(ProposeTradeResponse {
            conversation_id: opened.conversation.id,
        })
    }

    /// Record the caller's acceptance and complete the trade right away if
    /// the other side has already accepted.
    pub fn set_acceptance(&self, id: ConversationId, accepted: bool) -> Result<StatusResponse> {
        let user = self.user()?;
        let conversation = self.party_conversation(user, id)?;
        let party = conversation
            .party_of(user)
            .ok_or(EngineError::Forbidden("not a party to this conversation"))?;

        let written = orchestrator::set_acceptance(self.db, id, party, accepted)?;
        if written && accepted {
            if let Some(other) = conversation.counterparty_of(user) {
                notifier::notify_trade_accepted(self.db, other, id);
            }
        }
        if orchestrator::reconcile(self.db, id)? {
            notifier::notify_trade_completed(self.db, conversation.requester_id, id);
            notifier::notify_trade_completed(self.db, conversation.owner_id, id);
        }
        self.status(id)
    }

    pub fn reject_trade(&self, id: ConversationId) -> Result<StatusResponse> {
        let user = self.user()?;
        let conversation = self.party_conversation(user, id)?;
        if orchestrator::reject(self.db, id)? {
            if let Some(other) = conversation.counterparty_of(user) {
                notifier::notify_trade_rejected(self.db, other, id);
            }
        }
        self.status(id)
    }

    pub fn complete_trade(&self, id: ConversationId) -> Result<StatusResponse> {
        let user = self.user()?;
        let conversation = self.party_conversation(user, id)?;
        if orchestrator::complete(self.db, id)? {
            notifier::notify_trade_completed(self.db, conversation.requester_id, id);
            notifier::notify_trade_completed(self.db, conversation.owner_id, id);
        }
        self.status(id)
    }

    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        let user = self.user()?;
        self.party_conversation(user, id)
    }

    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let user = self.user()?;
        Ok(self.db.list_conversations_for_user(user)?)
    }

    /// Conversations touched after `since`, for polling clients.
    pub fn list_conversations_since(&self, since: DateTime<Utc>) -> Result<Vec<Conversation>> {
        let user = self.user()?;
        Ok(self.db.list_conversations_updated_since(user, since)?)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    pub fn send_message(
        &self,
        id: ConversationId,
        text: String,
        attachment_urls: Vec<String>,
    ) -> Result<Message> {
        let user = self.user()?;
        let conversation = self.party_conversation(user, id)?;
        let message =
            orchestrator::send_message(self.db, &conversation, user, text, attachment_urls)?;
        if let Some(other) = conversation.counterparty_of(user) {
            notifier::notify_new_message(self.db, other, id, &message.text);
        }
        Ok(message)
    }

    pub fn list_messages(
        &self,
        id: ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let user = self.user()?;
        let conversation = self.party_conversation(user, id)?;
        orchestrator::list_messages(self.db, &conversation, limit, offset)
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn list_notifications(&self) -> Result<Vec<Notification>> {
        let user = self.user()?;
        Ok(self.db.list_notifications_for_user(user)?)
    }

    pub fn unread_count(&self) -> Result<u64> {
        let user = self.user()?;
        Ok(self.db.count_unread_notifications(user)?)
    }

    pub fn mark_read(&self, id: NotificationId) -> Result<()> {
        let user = self.user()?;
        if self.db.mark_notification_read(id, user)? {
            Ok(())
        } else {
            Err(EngineError::NotFound(Entity::Notification, id.0))
        }
    }
}

/// Promote every conversation whose parties both accepted, notifying them.
/// Used by the periodic background sweep; needs no session.
pub fn reconcile_sweep(db: &Database) -> Result<usize> {
    let completed = orchestrator::reconcile_all(db)?;
    for id in &completed {
        match orchestrator::load(db, *id) {
            Ok(conversation) => {
                notifier::notify_trade_completed(db, conversation.requester_id, *id);
                notifier::notify_trade_completed(db, conversation.owner_id, *id);
            }
            Err(e) => warn!(conversation = %id, error = %e, "completed conversation vanished"),
        }
    }
    Ok(completed.len())
}

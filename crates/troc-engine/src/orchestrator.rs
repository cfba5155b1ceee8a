//! Trade conversation lifecycle.
//!
//! ```text
//! pending ──(both accepted, reconcile)──▶ completed
//!    │                                        ▲
//!    ├──────────(complete)────────────────────┘
//!    └──(reject)──▶ rejected
//! ```
//!
//! `rejected` and `completed` are terminal.  The `accepted` status exists in
//! the data model but nothing produces it; it is treated like `pending`.
//! Acceptance flags are recorded independently and promotion to
//! `completed` only ever happens through [`reconcile`].

use troc_shared::constants::{MAX_ATTACHMENTS, MAX_MESSAGE_LEN, OPENING_LINE};
use troc_shared::{
    clock, Conversation, ConversationId, ConversationStatus, Item, ItemId, ItemPair, Match,
    Message, MessageId, Party, UserId,
};
use troc_store::{Database, StoreError};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Entity, Result, ValidationReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub conversation: Conversation,
    /// `false` when an existing non-rejected conversation was reused.
    pub created: bool,
}

pub fn load(db: &Database, id: ConversationId) -> Result<Conversation> {
    db.get_conversation(id)
        .map_err(EngineError::missing(Entity::Conversation, id.0))
}

fn load_item(db: &Database, id: ItemId) -> Result<Item> {
    db.find_item(id)?
        .ok_or(EngineError::Validation(ValidationReason::MissingItem))
}

/// Open a conversation proposing `requester_item_id` for `owner_item_id`,
/// or return the open one that already covers this item pair.
pub fn propose(
    db: &Database,
    requester: UserId,
    owner: UserId,
    requester_item_id: ItemId,
    owner_item_id: ItemId,
) -> Result<Opened> {
    open_conversation(db, requester, owner, requester_item_id, owner_item_id, false)
}

fn open_conversation(
    db: &Database,
    requester: UserId,
    owner: UserId,
    requester_item_id: ItemId,
    owner_item_id: ItemId,
    greet: bool,
) -> Result<Opened> {
    if requester == owner {
        return Err(EngineError::Validation(ValidationReason::SelfTrade));
    }
    let requester_item = load_item(db, requester_item_id)?;
    let owner_item = load_item(db, owner_item_id)?;
    if requester_item.owner_id != requester || owner_item.owner_id != owner {
        return Err(EngineError::Validation(ValidationReason::ItemNotOwned));
    }

    let pair = ItemPair::new(requester_item_id, owner_item_id);
    if let Some(existing) = db.find_active_conversation(pair)? {
        debug!(conversation = %existing.id, "reusing open conversation");
        return Ok(Opened {
            conversation: existing,
            created: false,
        });
    }

    let now = clock::now();
    let conversation = Conversation {
        id: ConversationId::new(),
        requester_id: requester,
        owner_id: owner,
        requester_item_id,
        owner_item_id,
        status: ConversationStatus::Pending,
        requester_accepted: false,
        owner_accepted: false,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };

    let inserted = if greet {
        let greeting = Message {
            id: MessageId::new(),
            conversation_id: conversation.id,
            sender_id: requester,
            text: opening_message(&requester_item.name, &owner_item.name),
            attachment_urls: Vec::new(),
            created_at: now,
        };
        db.insert_conversation_with_message(&conversation, &greeting)
    } else {
        db.insert_conversation(&conversation)
    };

    match inserted {
        Ok(()) => {
            info!(
                conversation = %conversation.id,
                %requester,
                %owner,
                greet,
                "conversation opened"
            );
            Ok(Opened {
                conversation,
                created: true,
            })
        }
        Err(StoreError::Conflict) => {
            debug!("lost conversation insert race, reading back");
            let existing = db
                .find_active_conversation(pair)?
                .ok_or(StoreError::Conflict)?;
            Ok(Opened {
                conversation: existing,
                created: false,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Open the conversation that follows a confirmed match, with `requester`
/// as the side whose like completed it.
///
/// A freshly created conversation carries an opening message from the
/// requester naming both items, committed in the same transaction.
pub fn open_from_match(db: &Database, record: &Match, requester: UserId) -> Result<Opened> {
    let (my_item_id, owner, their_item_id) = record
        .side_of(requester)
        .ok_or(EngineError::Forbidden("not a party to this match"))?;
    open_conversation(db, requester, owner, my_item_id, their_item_id, true)
}

/// The conversation a match leads to.
///
/// Only the like that recorded the match (`newly_matched`) opens one.  Any
/// later like on the same pair gets the pair's latest conversation as it
/// stands, so a rejected trade stays rejected.  A pair that has no
/// conversation at all, because the like that recorded the match failed
/// before opening it, gets one now.
pub fn conversation_for_match(
    db: &Database,
    record: &Match,
    newly_matched: bool,
    requester: UserId,
) -> Result<Conversation> {
    if !newly_matched {
        if let Some(existing) = db.find_latest_conversation(record.pair())? {
            debug!(
                conversation = %existing.id,
                status = existing.status.as_str(),
                "match already has a conversation"
            );
            return Ok(existing);
        }
    }
    Ok(open_from_match(db, record, requester)?.conversation)
}

pub fn opening_message(my_item: &str, their_item: &str) -> String {
    format!("Hi! {OPENING_LINE} my {my_item} for your {their_item}.")
}

/// Record one party's acceptance.
///
/// Returns `true` if the flag was written.  Terminal conversations are left
/// alone and yield `false`.
pub fn set_acceptance(
    db: &Database,
    id: ConversationId,
    party: Party,
    accepted: bool,
) -> Result<bool> {
    let conversation = load(db, id)?;
    if conversation.status.is_terminal() {
        debug!(conversation = %id, status = conversation.status.as_str(), "acceptance ignored");
        return Ok(false);
    }
    let written = db.set_acceptance_flag(id, party, accepted, clock::now())?;
    debug!(conversation = %id, ?party, accepted, written, "acceptance recorded");
    Ok(written)
}

/// Promote the conversation to `completed` if both parties have accepted.
///
/// Safe to call any number of times; returns `true` only for the call
/// that performed the transition.
pub fn reconcile(db: &Database, id: ConversationId) -> Result<bool> {
    let completed = db.complete_if_both_accepted(id, clock::now())?;
    if completed {
        info!(conversation = %id, "trade completed by mutual acceptance");
    }
    Ok(completed)
}

/// Reconcile every conversation waiting on promotion.  Returns the ones
/// that this sweep completed.
pub fn reconcile_all(db: &Database) -> Result<Vec<ConversationId>> {
    let mut completed = Vec::new();
    for id in db.list_awaiting_reconcile()? {
        match reconcile(db, id) {
            Ok(true) => completed.push(id),
            Ok(false) => {}
            Err(e) => warn!(conversation = %id, error = %e, "reconcile failed"),
        }
    }
    Ok(completed)
}

/// Reject an open conversation.  Rejecting twice, or rejecting a completed
/// trade, changes nothing and returns `false`.
pub fn reject(db: &Database, id: ConversationId) -> Result<bool> {
    load(db, id)?;
    let rejected = db.reject_conversation(id, clock::now())?;
    if rejected {
        info!(conversation = %id, "trade rejected");
    }
    Ok(rejected)
}

/// Mark an open conversation completed without waiting for both flags.
///
/// Completing a rejected conversation is refused; completing an already
/// completed one is a no-op returning `false`.
pub fn complete(db: &Database, id: ConversationId) -> Result<bool> {
    let conversation = load(db, id)?;
    match conversation.status {
        ConversationStatus::Rejected => {
            Err(EngineError::Validation(ValidationReason::ConversationClosed))
        }
        ConversationStatus::Completed => Ok(false),
        ConversationStatus::Pending | ConversationStatus::Accepted => {
            let completed = db.force_complete(id, clock::now())?;
            if completed {
                info!(conversation = %id, "trade marked completed");
            }
            Ok(completed)
        }
    }
}

/// Post a message from `sender`, who must already be known to be a party.
pub fn send_message(
    db: &Database,
    conversation: &Conversation,
    sender: UserId,
    text: String,
    attachment_urls: Vec<String>,
) -> Result<Message> {
    if conversation.status == ConversationStatus::Rejected {
        return Err(EngineError::Validation(ValidationReason::ConversationClosed));
    }
    if text.trim().is_empty() && attachment_urls.is_empty() {
        return Err(EngineError::Validation(ValidationReason::EmptyMessage));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(EngineError::Validation(ValidationReason::MessageTooLong));
    }
    if attachment_urls.len() > MAX_ATTACHMENTS {
        return Err(EngineError::Validation(ValidationReason::TooManyAttachments));
    }

    let message = Message {
        id: MessageId::new(),
        conversation_id: conversation.id,
        sender_id: sender,
        text,
        attachment_urls,
        created_at: clock::now(),
    };
    db.insert_message(&message)?;
    db.touch_conversation(conversation.id, message.created_at)?;
    debug!(conversation = %conversation.id, message = %message.id, "message posted");
    Ok(message)
}

/// A page of a conversation's messages, oldest first.
pub fn list_messages(
    db: &Database,
    conversation: &Conversation,
    limit: u32,
    offset: u32,
) -> Result<Vec<Message>> {
    Ok(db.list_messages_for_conversation(conversation.id, limit, offset)?)
}

use std::fmt;

use thiserror::Error;
use troc_store::StoreError;
use uuid::Uuid;

/// Why a request was refused before touching any state.
///
/// [`ValidationReason::code`] is stable and is what clients branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    SelfLike,
    ItemUnavailable,
    ItemHidden,
    ContextNotOwned,
    MissingItem,
    SelfTrade,
    ItemNotOwned,
    EmptyName,
    EmptyMessage,
    MessageTooLong,
    TooManyAttachments,
    ConversationClosed,
}

impl ValidationReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SelfLike => "self_like",
            Self::ItemUnavailable => "item_unavailable",
            Self::ItemHidden => "item_hidden",
            Self::ContextNotOwned => "context_not_owned",
            Self::MissingItem => "missing_item",
            Self::SelfTrade => "self_trade",
            Self::ItemNotOwned => "item_not_owned",
            Self::EmptyName => "empty_name",
            Self::EmptyMessage => "empty_message",
            Self::MessageTooLong => "message_too_long",
            Self::TooManyAttachments => "too_many_attachments",
            Self::ConversationClosed => "conversation_closed",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::SelfLike => "you cannot like your own item",
            Self::ItemUnavailable => "item is no longer available",
            Self::ItemHidden => "item is not visible",
            Self::ContextNotOwned => "context item must be one of your own items",
            Self::MissingItem => "one of the items does not exist",
            Self::SelfTrade => "you cannot trade with yourself",
            Self::ItemNotOwned => "item does not belong to that user",
            Self::EmptyName => "item name is empty",
            Self::EmptyMessage => "message is empty",
            Self::MessageTooLong => "message is too long",
            Self::TooManyAttachments => "too many attachments",
            Self::ConversationClosed => "conversation is closed",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Item,
    Match,
    Conversation,
    Notification,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Item => "Item",
            Entity::Match => "Match",
            Entity::Conversation => "Conversation",
            Entity::Notification => "Notification",
        })
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// No active session.
    #[error("Not signed in")]
    Unauthenticated,

    /// Signed in, but not allowed to act on this resource.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Invalid request: {0}")]
    Validation(ValidationReason),

    #[error("{0} not found: {1}")]
    NotFound(Entity, Uuid),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Map a store lookup miss to a typed not-found error.
    pub(crate) fn missing(entity: Entity, id: Uuid) -> impl FnOnce(StoreError) -> EngineError {
        move |e| match e {
            StoreError::NotFound => EngineError::NotFound(entity, id),
            other => EngineError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

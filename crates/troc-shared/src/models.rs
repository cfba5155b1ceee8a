//! Domain models persisted by the store and handed to clients as JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownVariant;
use crate::types::{ConversationId, ItemId, ItemPair, MatchId, MessageId, NotificationId, UserId};

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// An offer listing, owned exclusively by the user who created it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub owner_id: UserId,
    /// Display name shown in listings and in the opening trade message.
    pub name: String,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub price_range: Option<String>,
    /// `false` once the item has been traded away or withdrawn.
    pub is_available: bool,
    /// `false` hides the item from other users.
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Whether another user may currently express interest in this item.
    pub fn is_listed(&self) -> bool {
        self.is_available && self.is_visible
    }
}

// ---------------------------------------------------------------------------
// Like
// ---------------------------------------------------------------------------

/// A directed interest edge from a user to an item.
///
/// `context_item_id` names which of the liker's own items the like is scoped
/// to. The same (user, item) pair may appear once per context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Like {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub context_item_id: Option<ItemId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// Confirmed reciprocal interest between two users' items.
///
/// `user_a` owns `item_a` and `user_b` owns `item_b`. Which side is "a" only
/// reflects whose like completed the match; lookups are direction-independent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Match {
    pub id: MatchId,
    pub user_a: UserId,
    pub user_b: UserId,
    pub item_a: ItemId,
    pub item_b: ItemId,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn pair(&self) -> ItemPair {
        ItemPair::new(self.item_a, self.item_b)
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.user_a == user || self.user_b == user
    }

    /// `(my_item, other_user, their_item)` from `user`'s point of view.
    pub fn side_of(&self, user: UserId) -> Option<(ItemId, UserId, ItemId)> {
        if user == self.user_a {
            Some((self.item_a, self.user_b, self.item_b))
        } else if user == self.user_b {
            Some((self.item_b, self.user_a, self.item_a))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Terminal states are sticky: nothing moves a conversation out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

impl FromStr for ConversationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownVariant::new("conversation status", other)),
        }
    }
}

/// One of the two sides of a trade conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Requester,
    Owner,
}

/// A negotiation session over exactly one item-for-item proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub requester_id: UserId,
    pub owner_id: UserId,
    pub requester_item_id: ItemId,
    pub owner_item_id: ItemId,
    pub status: ConversationStatus,
    pub requester_accepted: bool,
    pub owner_accepted: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn pair(&self) -> ItemPair {
        ItemPair::new(self.requester_item_id, self.owner_item_id)
    }

    pub fn party_of(&self, user: UserId) -> Option<Party> {
        if user == self.requester_id {
            Some(Party::Requester)
        } else if user == self.owner_id {
            Some(Party::Owner)
        } else {
            None
        }
    }

    pub fn user_of(&self, party: Party) -> UserId {
        match party {
            Party::Requester => self.requester_id,
            Party::Owner => self.owner_id,
        }
    }

    pub fn counterparty_of(&self, user: UserId) -> Option<UserId> {
        match self.party_of(user)? {
            Party::Requester => Some(self.owner_id),
            Party::Owner => Some(self.requester_id),
        }
    }

    pub fn both_accepted(&self) -> bool {
        self.requester_accepted && self.owner_accepted
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A chat line inside a conversation. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub text: String,
    pub attachment_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Match,
    TradeProposed,
    TradeAccepted,
    TradeRejected,
    TradeCompleted,
    NewMessage,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::TradeProposed => "trade_proposed",
            Self::TradeAccepted => "trade_accepted",
            Self::TradeRejected => "trade_rejected",
            Self::TradeCompleted => "trade_completed",
            Self::NewMessage => "new_message",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" => Ok(Self::Match),
            "trade_proposed" => Ok(Self::TradeProposed),
            "trade_accepted" => Ok(Self::TradeAccepted),
            "trade_rejected" => Ok(Self::TradeRejected),
            "trade_completed" => Ok(Self::TradeCompleted),
            "new_message" => Ok(Self::NewMessage),
            other => Err(UnknownVariant::new("notification kind", other)),
        }
    }
}

/// One-way informational record addressed to a single user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Match or conversation the notification points at.
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        let now = Utc::now();
        Conversation {
            id: ConversationId::new(),
            requester_id: UserId::new(),
            owner_id: UserId::new(),
            requester_item_id: ItemId::new(),
            owner_item_id: ItemId::new(),
            status: ConversationStatus::Pending,
            requester_accepted: false,
            owner_accepted: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_tags_round_trip_through_strings() {
        for status in [
            ConversationStatus::Pending,
            ConversationStatus::Accepted,
            ConversationStatus::Rejected,
            ConversationStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<ConversationStatus>(), Ok(status));
        }
        assert!("archived".parse::<ConversationStatus>().is_err());
    }

    #[test]
    fn only_rejected_and_completed_are_terminal() {
        assert!(!ConversationStatus::Pending.is_terminal());
        assert!(!ConversationStatus::Accepted.is_terminal());
        assert!(ConversationStatus::Rejected.is_terminal());
        assert!(ConversationStatus::Completed.is_terminal());
    }

    #[test]
    fn conversation_parties() {
        let conv = conversation();
        let stranger = UserId::new();

        assert_eq!(conv.party_of(conv.requester_id), Some(Party::Requester));
        assert_eq!(conv.party_of(conv.owner_id), Some(Party::Owner));
        assert_eq!(conv.party_of(stranger), None);
        assert_eq!(conv.counterparty_of(conv.owner_id), Some(conv.requester_id));
        assert_eq!(conv.counterparty_of(stranger), None);
    }

    #[test]
    fn match_sides_are_symmetric() {
        let m = Match {
            id: MatchId::new(),
            user_a: UserId::new(),
            user_b: UserId::new(),
            item_a: ItemId::new(),
            item_b: ItemId::new(),
            created_at: Utc::now(),
        };

        assert_eq!(m.side_of(m.user_a), Some((m.item_a, m.user_b, m.item_b)));
        assert_eq!(m.side_of(m.user_b), Some((m.item_b, m.user_a, m.item_a)));
        assert_eq!(m.side_of(UserId::new()), None);
    }

    #[test]
    fn notification_kind_serializes_as_tag() {
        let json = serde_json::to_string(&NotificationKind::TradeAccepted).unwrap();
        assert_eq!(json, "\"trade_accepted\"");
        assert_eq!(
            "trade_accepted".parse::<NotificationKind>(),
            Ok(NotificationKind::TradeAccepted)
        );
    }
}

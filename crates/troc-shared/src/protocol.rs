//! Request and response bodies exchanged between the client and the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ConversationStatus;
use crate::types::{ConversationId, ItemId, MatchId, UserId};

/// Express (or withdraw) interest in an item, optionally scoped to one of
/// the caller's own items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeRequest {
    pub item_id: ItemId,
    #[serde(default)]
    pub context_item_id: Option<ItemId>,
}

/// Result of a like. The client branches on `matched`, e.g. to navigate to
/// the new conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeOutcome {
    pub matched: bool,
    pub match_info: Option<MatchInfo>,
    pub conversation_id: Option<ConversationId>,
}

impl LikeOutcome {
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            match_info: None,
            conversation_id: None,
        }
    }
}

/// A confirmed match, from the caller's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchInfo {
    pub match_id: MatchId,
    pub other_user_id: UserId,
    pub other_user_item_id: ItemId,
    pub my_item_id: ItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlikeOutcome {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposeTradeRequest {
    pub their_item_id: ItemId,
    pub my_item_id: ItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposeTradeResponse {
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcceptanceRequest {
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub conversation_id: ConversationId,
    pub status: ConversationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub text: String,
    #[serde(default)]
    pub attachment_urls: Vec<String>,
}

/// Minimal listing payload; richer item editing lives outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewItemRequest {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,
}

/// Withdraw, hide or relist one of the caller's items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemFlagsRequest {
    pub is_available: bool,
    pub is_visible: bool,
}

/// Polling filter for the conversation list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationsQuery {
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueSessionRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileResponse {
    pub completed: usize,
}

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    /// Stable reason code for validation failures (e.g. `self_like`).
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_request_context_is_optional() {
        let id = ItemId::new();
        let req: LikeRequest =
            serde_json::from_str(&format!(r#"{{"item_id":"{}"}}"#, id)).unwrap();
        assert_eq!(req.item_id, id);
        assert_eq!(req.context_item_id, None);
    }

    #[test]
    fn status_response_uses_snake_case_status() {
        let resp = StatusResponse {
            conversation_id: ConversationId::new(),
            status: ConversationStatus::Completed,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["status"], "completed");
    }
}

//! One async method per server endpoint.

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use troc_shared::protocol::{
    AcceptanceRequest, ConversationsQuery, ErrorBody, ItemFlagsRequest, LikeOutcome,
    LikeRequest, NewItemRequest, ProposeTradeRequest, ProposeTradeResponse, SendMessageRequest,
    StatusResponse, UnlikeOutcome,
};
use troc_shared::{
    Conversation, ConversationId, Item, ItemId, Match, Message, Notification, NotificationId,
};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub reconcile_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach the bearer token issued for the signed-in user.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let text = resp.text().await.unwrap_or_default();
        let (message, code) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (body.error, body.code),
            Err(_) => (text, None),
        };
        debug!(status = status.as_u16(), %message, "request rejected");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
            code,
        })
    }

    pub async fn server_info(&self) -> Result<ServerInfo> {
        self.send(self.request(Method::GET, "/info")).await
    }

    // ─── Items ───

    pub async fn create_item(&self, req: &NewItemRequest) -> Result<Item> {
        self.send(self.request(Method::POST, "/items").json(req)).await
    }

    pub async fn list_items(&self) -> Result<Vec<Item>> {
        self.send(self.request(Method::GET, "/items")).await
    }

    pub async fn set_item_flags(
        &self,
        id: ItemId,
        is_available: bool,
        is_visible: bool,
    ) -> Result<Item> {
        let path = format!("/items/{id}/flags");
        let body = ItemFlagsRequest {
            is_available,
            is_visible,
        };
        self.send(self.request(Method::POST, &path).json(&body)).await
    }

    // ─── Likes ───

    pub async fn like(
        &self,
        item_id: ItemId,
        context_item_id: Option<ItemId>,
    ) -> Result<LikeOutcome> {
        let body = LikeRequest {
            item_id,
            context_item_id,
        };
        self.send(self.request(Method::POST, "/likes").json(&body)).await
    }

    pub async fn unlike(
        &self,
        item_id: ItemId,
        context_item_id: Option<ItemId>,
    ) -> Result<UnlikeOutcome> {
        let body = LikeRequest {
            item_id,
            context_item_id,
        };
        self.send(self.request(Method::DELETE, "/likes").json(&body)).await
    }

    pub async fn list_matches(&self) -> Result<Vec<Match>> {
        self.send(self.request(Method::GET, "/matches")).await
    }

    // ─── Trades ───

    pub async fn propose_trade(
        &self,
        their_item_id: ItemId,
        my_item_id: ItemId,
    ) -> Result<ProposeTradeResponse> {
        let body = ProposeTradeRequest {
            their_item_id,
            my_item_id,
        };
        self.send(self.request(Method::POST, "/trades").json(&body)).await
    }

    pub async fn set_acceptance(
        &self,
        id: ConversationId,
        accepted: bool,
    ) -> Result<StatusResponse> {
        let path = format!("/trades/{id}/acceptance");
        self.send(
            self.request(Method::POST, &path)
                .json(&AcceptanceRequest { accepted }),
        )
        .await
    }

    pub async fn reject_trade(&self, id: ConversationId) -> Result<StatusResponse> {
        self.send(self.request(Method::POST, &format!("/trades/{id}/reject")))
            .await
    }

    pub async fn complete_trade(&self, id: ConversationId) -> Result<StatusResponse> {
        self.send(self.request(Method::POST, &format!("/trades/{id}/complete")))
            .await
    }

    // ─── Conversations ───

    /// All of the user's conversations, or only those updated after `since`
    /// when polling.
    pub async fn list_conversations(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Conversation>> {
        let query = ConversationsQuery { since };
        self.send(self.request(Method::GET, "/conversations").query(&query))
            .await
    }

    pub async fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        self.send(self.request(Method::GET, &format!("/conversations/{id}")))
            .await
    }

    pub async fn list_messages(
        &self,
        id: ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let path = format!("/conversations/{id}/messages");
        self.send(
            self.request(Method::GET, &path)
                .query(&[("limit", limit), ("offset", offset)]),
        )
        .await
    }

    pub async fn send_message(
        &self,
        id: ConversationId,
        text: impl Into<String>,
        attachment_urls: Vec<String>,
    ) -> Result<Message> {
        let path = format!("/conversations/{id}/messages");
        let body = SendMessageRequest {
            text: text.into(),
            attachment_urls,
        };
        self.send(self.request(Method::POST, &path).json(&body)).await
    }

    // ─── Notifications ───

    pub async fn list_notifications(&self) -> Result<Vec<Notification>> {
        self.send(self.request(Method::GET, "/notifications")).await
    }

    pub async fn mark_read(&self, id: NotificationId) -> Result<()> {
        let path = format!("/notifications/{id}/read");
        let _: serde_json::Value = self.send(self.request(Method::POST, &path)).await?;
        Ok(())
    }
}

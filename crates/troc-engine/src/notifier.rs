//! Best-effort notification writes.
//!
//! Every function here swallows its own failure: a notification that could
//! not be stored is logged and dropped, and never undoes the match, trade
//! or message that triggered it.

use troc_shared::{
    clock, ConversationId, MatchId, Notification, NotificationId, NotificationKind, UserId,
};
use troc_store::Database;
use tracing::{debug, warn};
use uuid::Uuid;

const PREVIEW_CHARS: usize = 80;

fn emit(
    db: &Database,
    recipient: UserId,
    kind: NotificationKind,
    title: &str,
    body: String,
    related_id: Uuid,
) {
    let notification = Notification {
        id: NotificationId::new(),
        recipient_id: recipient,
        kind,
        title: title.to_string(),
        body,
        related_id: Some(related_id),
        is_read: false,
        created_at: clock::now(),
    };
    match db.insert_notification(&notification) {
        Ok(()) => debug!(%recipient, kind = kind.as_str(), "notification stored"),
        Err(e) => warn!(
            %recipient,
            kind = kind.as_str(),
            error = %e,
            "failed to store notification"
        ),
    }
}

pub fn notify_match(
    db: &Database,
    recipient: UserId,
    my_item_name: &str,
    their_item_name: &str,
    match_id: MatchId,
) {
    emit(
        db,
        recipient,
        NotificationKind::Match,
        "It's a match!",
        format!("Your {my_item_name} and their {their_item_name} are a match. Start trading!"),
        match_id.0,
    );
}

pub fn notify_trade_proposed(
    db: &Database,
    owner: UserId,
    offered_item_name: &str,
    wanted_item_name: &str,
    conversation_id: ConversationId,
) {
    emit(
        db,
        owner,
        NotificationKind::TradeProposed,
        "New trade proposal",
        format!("Someone offers their {offered_item_name} for your {wanted_item_name}."),
        conversation_id.0,
    );
}

pub fn notify_trade_accepted(db: &Database, recipient: UserId, conversation_id: ConversationId) {
    emit(
        db,
        recipient,
        NotificationKind::TradeAccepted,
        "Trade accepted",
        "The other side accepted the trade.".to_string(),
        conversation_id.0,
    );
}

pub fn notify_trade_rejected(db: &Database, recipient: UserId, conversation_id: ConversationId) {
    emit(
        db,
        recipient,
        NotificationKind::TradeRejected,
        "Trade declined",
        "The other side declined the trade.".to_string(),
        conversation_id.0,
    );
}

pub fn notify_trade_completed(db: &Database, recipient: UserId, conversation_id: ConversationId) {
    emit(
        db,
        recipient,
        NotificationKind::TradeCompleted,
        "Trade completed",
        "Your trade is complete.".to_string(),
        conversation_id.0,
    );
}

pub fn notify_new_message(
    db: &Database,
    recipient: UserId,
    conversation_id: ConversationId,
    text: &str,
) {
    emit(
        db,
        recipient,
        NotificationKind::NewMessage,
        "New message",
        preview(text),
        conversation_id.0,
    );
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MarketplaceConfig;
use crate::error::{EngineError, Result};
use crate::identity::UserId;
use crate::message::{ChatMessage, MessageId};
use crate::order::{Order, OrderStatus};

/// A message a participant wants to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outgoing {
    pub id: MessageId,
    pub body: String,
    #[serde(default)]
    pub photo: Option<String>,
}

/// When the post-completion window ends. `None` unless the order is completed.
pub fn closes_at(order: &Order, config: &MarketplaceConfig) -> Option<DateTime<Utc>> {
    match order.status {
        OrderStatus::Completed => order.completed_at.map(|at| at + config.chat_window()),
        _ => None,
    }
}

/// Whether buyer and seller may message each other right now.
///
/// Open while pending or accepted, and for a fixed window after completion.
/// Rejected, cancelled, and overdue pending orders are closed.
pub fn is_open(order: &Order, now: DateTime<Utc>, config: &MarketplaceConfig) -> bool {
    match order.status_at(now) {
        OrderStatus::Pending | OrderStatus::Accepted => true,
        OrderStatus::Completed => closes_at(order, config).is_some_and(|end| now < end),
        OrderStatus::Rejected | OrderStatus::Cancelled => false,
    }
}

/// Build the record for a message `sender` sends on `order`.
///
/// Fails without producing a record when the window is closed.
pub fn compose(
    order: &Order,
    sender: &UserId,
    outgoing: Outgoing,
    now: DateTime<Utc>,
    config: &MarketplaceConfig,
) -> Result<ChatMessage> {
    let receiver = order
        .counterparty(sender)
        .cloned()
        .ok_or_else(|| EngineError::NotAParticipant {
            user: sender.clone(),
        })?;

    if !is_open(order, now, config) {
        return Err(EngineError::WindowClosed {
            order_id: order.id.clone(),
            closed_at: closed_since(order, config),
        });
    }

    if outgoing.body.trim().is_empty() && outgoing.photo.is_none() {
        return Err(EngineError::EmptyMessage);
    }

    Ok(ChatMessage {
        id: outgoing.id,
        order_id: order.id.clone(),
        sender: sender.clone(),
        receiver,
        body: outgoing.body,
        photo: outgoing.photo,
        timestamp: now,
        read: false,
    })
}

/// Best known moment the window closed, for error detail.
fn closed_since(order: &Order, config: &MarketplaceConfig) -> Option<DateTime<Utc>> {
    match order.status {
        OrderStatus::Completed => closes_at(order, config),
        OrderStatus::Rejected => order.rejected_at,
        OrderStatus::Cancelled => order.cancellation.map(|c| c.at),
        OrderStatus::Pending => order.expires_at,
        OrderStatus::Accepted => None,
    }
}

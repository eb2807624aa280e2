//! Outbound events.
//!
//! Delivery (e-mail, queues) is someone else's job; the engine only hands
//! events to a [`NotificationSink`] after the change they describe is
//! committed.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tradepost_core::{Email, OrderId, UserId};

/// Something worth telling the outside world about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A basket was placed as a new order.
    NewOrder { user_id: UserId, order_id: OrderId },
    /// An account was registered and awaits confirmation.
    AccountRegistered {
        user_id: UserId,
        email: Email,
        token: String,
    },
}

/// Receiver of [`Notification`]s.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// Logs every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn notify(&self, notification: Notification) {
        match &notification {
            Notification::NewOrder { user_id, order_id } => {
                tracing::info!(%user_id, %order_id, "New order placed");
            }
            Notification::AccountRegistered { user_id, email, .. } => {
                tracing::info!(%user_id, %email, "Account registered, confirmation pending");
            }
        }
    }
}

/// Records events in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<RwLock<Vec<Notification>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<Notification> {
        self.events.read().clone()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn notify(&self, notification: Notification) {
        self.events.write().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let first = Notification::NewOrder {
            user_id: UserId::new(1),
            order_id: OrderId::new(10),
        };
        let second = Notification::NewOrder {
            user_id: UserId::new(1),
            order_id: OrderId::new(11),
        };
        sink.notify(first.clone()).await;
        sink.notify(second.clone()).await;
        assert_eq!(sink.events(), vec![first, second]);
        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_shape() {
        let json = serde_json::to_value(Notification::NewOrder {
            user_id: UserId::new(1),
            order_id: OrderId::new(2),
        });
        assert_eq!(
            json.ok(),
            Some(serde_json::json!({"event": "new_order", "user_id": 1, "order_id": 2}))
        );
    }
}

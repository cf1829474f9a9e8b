//! Conversation room management for live-message fanout
//!
//! Manages per-conversation "rooms" of live viewers. Accepted messages are
//! pushed to every session subscribed to the conversation at publish time;
//! there is no backlog or replay, and nothing here survives a restart
//! (missed pushes are recoverable through the REST read path).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use chatline_shared::MessageDirection;
use serde::Serialize;
use time::OffsetDateTime;

/// The payload pushed to live viewers for each accepted message
#[derive(Debug, Clone, Serialize)]
pub struct MessagePush {
    pub id: Uuid,
    pub direction: MessageDirection,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Sending half of one live-viewer session
#[derive(Debug)]
struct Subscriber {
    id: Uuid,
    sender: mpsc::UnboundedSender<MessagePush>,
}

/// Handle returned by `subscribe`
///
/// Holds the receiving half of the session channel. Dropping the handle
/// alone does not remove the registry entry; callers unsubscribe with the
/// `(conversation_id, id)` pair when the session ends.
#[derive(Debug)]
pub struct Subscription {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub receiver: mpsc::UnboundedReceiver<MessagePush>,
}

/// Manages conversation rooms for broadcasting accepted messages
pub struct FanoutBroker {
    /// Map of conversation_id -> list of subscribed sessions
    rooms: Arc<RwLock<HashMap<Uuid, Vec<Subscriber>>>>,
}

impl FanoutBroker {
    /// Create a new broker
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a session on a conversation room
    pub async fn subscribe(&self, conversation_id: Uuid) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            sender: tx,
        };
        let subscription_id = subscriber.id;

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(conversation_id)
            .or_insert_with(Vec::new)
            .push(subscriber);

        let count = rooms.get(&conversation_id).map(|v| v.len()).unwrap_or(0);
        tracing::debug!(
            conversation_id = %conversation_id,
            subscription_id = %subscription_id,
            room_size = count,
            "Session joined conversation room"
        );

        Subscription {
            id: subscription_id,
            conversation_id,
            receiver: rx,
        }
    }

    /// Remove a session from a conversation room
    ///
    /// Safe to call multiple times; no-op if the session is already gone.
    pub async fn unsubscribe(&self, conversation_id: &Uuid, subscription_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(subscribers) = rooms.get_mut(conversation_id) {
            subscribers.retain(|s| s.id != *subscription_id);

            // Clean up empty rooms
            if subscribers.is_empty() {
                rooms.remove(conversation_id);
                tracing::debug!(
                    conversation_id = %conversation_id,
                    "Removed empty conversation room"
                );
            } else {
                tracing::debug!(
                    conversation_id = %conversation_id,
                    subscription_id = %subscription_id,
                    room_size = subscribers.len(),
                    "Session left conversation room"
                );
            }
        }
    }

    /// Broadcast an accepted message to all sessions in a conversation room
    ///
    /// Per-subscriber send failures are logged and dropped; a closed session
    /// never blocks or fails delivery to the rest of the room.
    pub async fn publish(&self, conversation_id: &Uuid, push: MessagePush) {
        let rooms = self.rooms.read().await;
        if let Some(subscribers) = rooms.get(conversation_id) {
            let mut success_count = 0;
            let mut failed_count = 0;

            for subscriber in subscribers {
                match subscriber.sender.send(push.clone()) {
                    Ok(()) => success_count += 1,
                    Err(_) => {
                        failed_count += 1;
                        tracing::warn!(
                            subscription_id = %subscriber.id,
                            "Failed to push message to session (likely closed)"
                        );
                    }
                }
            }

            tracing::debug!(
                conversation_id = %conversation_id,
                message_id = %push.id,
                recipients = success_count,
                failed = failed_count,
                "Broadcast message to conversation room"
            );
        } else {
            tracing::debug!(
                conversation_id = %conversation_id,
                message_id = %push.id,
                "No room for conversation - no live viewers"
            );
        }
    }

    /// Number of sessions subscribed to a conversation
    pub async fn room_size(&self, conversation_id: &Uuid) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(conversation_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Number of conversations with at least one live viewer
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }

    /// Total number of live sessions across all rooms
    pub async fn session_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.values().map(Vec::len).sum()
    }
}

impl Default for FanoutBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(content: &str) -> MessagePush {
        MessagePush {
            id: Uuid::new_v4(),
            direction: MessageDirection::Received,
            content: content.to_string(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe() {
        let broker = FanoutBroker::new();
        let conversation_id = Uuid::new_v4();

        assert_eq!(broker.room_size(&conversation_id).await, 0);

        let sub = broker.subscribe(conversation_id).await;
        assert_eq!(broker.room_size(&conversation_id).await, 1);

        broker.unsubscribe(&conversation_id, &sub.id).await;
        assert_eq!(broker.room_size(&conversation_id).await, 0);
        assert_eq!(broker.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_twice_is_noop() {
        let broker = FanoutBroker::new();
        let conversation_id = Uuid::new_v4();

        let sub = broker.subscribe(conversation_id).await;
        broker.unsubscribe(&conversation_id, &sub.id).await;
        broker.unsubscribe(&conversation_id, &sub.id).await;
        assert_eq!(broker.room_size(&conversation_id).await, 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let broker = FanoutBroker::new();
        let conversation_id = Uuid::new_v4();

        let mut sub1 = broker.subscribe(conversation_id).await;
        let mut sub2 = broker.subscribe(conversation_id).await;

        broker.publish(&conversation_id, push("hello")).await;

        assert_eq!(sub1.receiver.try_recv().unwrap().content, "hello");
        assert_eq!(sub2.receiver.try_recv().unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_publish() {
        let broker = FanoutBroker::new();
        let conversation_id = Uuid::new_v4();

        broker.publish(&conversation_id, push("before")).await;

        let mut sub = broker.subscribe(conversation_id).await;
        assert!(sub.receiver.try_recv().is_err());

        broker.publish(&conversation_id, push("after")).await;
        assert_eq!(sub.receiver.try_recv().unwrap().content, "after");
    }

    #[tokio::test]
    async fn test_closed_subscriber_does_not_block_others() {
        let broker = FanoutBroker::new();
        let conversation_id = Uuid::new_v4();

        let sub1 = broker.subscribe(conversation_id).await;
        let mut sub2 = broker.subscribe(conversation_id).await;

        // First session hangs up without unsubscribing
        drop(sub1.receiver);

        broker.publish(&conversation_id, push("still delivered")).await;
        assert_eq!(sub2.receiver.try_recv().unwrap().content, "still delivered");
    }

    #[tokio::test]
    async fn test_rooms_are_isolated_per_conversation() {
        let broker = FanoutBroker::new();
        let conversation_a = Uuid::new_v4();
        let conversation_b = Uuid::new_v4();

        let mut sub_a = broker.subscribe(conversation_a).await;
        let mut sub_b = broker.subscribe(conversation_b).await;

        broker.publish(&conversation_a, push("for a")).await;

        assert_eq!(sub_a.receiver.try_recv().unwrap().content, "for a");
        assert!(sub_b.receiver.try_recv().is_err());
        assert_eq!(broker.session_count().await, 2);
    }
}

use crate::common::redis_pool::RedisPool;
use crate::models::conversations::ConversationId;
use crate::models::participants::Participant;
use crate::models::realtime::{RealtimeTarget, RelayEnvelope, ServerEvent};
use hashbrown::{HashMap, HashSet};
use redis::AsyncCommands;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// redis pub/sub channel every api instance listens on for cross-instance fan-out
pub const RELAY_CHANNEL: &str = "marketplace:realtime";

pub type ConnectionId = Uuid;

struct Subscriber {
    participant: Participant,
    sender: mpsc::Sender<String>,
    conversations: HashSet<ConversationId>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, Subscriber>,
    conversations: HashMap<ConversationId, HashSet<ConnectionId>>,
}

/// Receiving half handed to a freshly connected client.
pub struct Subscription {
    pub connection_id: ConnectionId,
    pub receiver: mpsc::Receiver<String>,
}

/// Publish/subscribe hub for connected realtime clients.
///
/// Created once at start-up and shared through the application state.
/// Delivery is best effort: a client whose outbound queue is full or closed
/// simply misses the event and catches up through the http api.
#[derive(Clone)]
pub struct RealtimeChannel {
    registry: Arc<RwLock<Registry>>,
    relay: Option<RedisPool>,
    buffer_size: usize,
}

impl RealtimeChannel {
    /// Publishes straight to the subscribers of this process.
    pub fn local(buffer_size: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            relay: None,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Publishes through redis so that every instance running the relay
    /// listener delivers to its own subscribers.
    pub fn relayed(relay: RedisPool, buffer_size: usize) -> Self {
        Self {
            relay: Some(relay),
            ..Self::local(buffer_size)
        }
    }

    pub async fn connect(&self, participant: Participant) -> Subscription {
        let connection_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.buffer_size);
        let subscriber = Subscriber {
            participant,
            sender,
            conversations: HashSet::new(),
        };
        let mut registry = self.registry.write().await;
        registry.connections.insert(connection_id, subscriber);
        Subscription {
            connection_id,
            receiver,
        }
    }

    pub async fn disconnect(&self, connection_id: ConnectionId) {
        let mut registry = self.registry.write().await;
        let Some(subscriber) = registry.connections.remove(&connection_id) else {
            return;
        };
        for conversation_id in subscriber.conversations {
            remove_member(&mut registry, &conversation_id, connection_id);
        }
    }

    /// Returns `false` when the connection is unknown. Joining twice is a no-op.
    pub async fn join(&self, connection_id: ConnectionId, conversation_id: ConversationId) -> bool {
        let mut registry = self.registry.write().await;
        let Some(subscriber) = registry.connections.get_mut(&connection_id) else {
            return false;
        };
        subscriber.conversations.insert(conversation_id.clone());
        registry
            .conversations
            .entry(conversation_id)
            .or_default()
            .insert(connection_id);
        true
    }

    pub async fn leave(&self, connection_id: ConnectionId, conversation_id: &ConversationId) {
        let mut registry = self.registry.write().await;
        if let Some(subscriber) = registry.connections.get_mut(&connection_id) {
            subscriber.conversations.remove(conversation_id);
        }
        remove_member(&mut registry, conversation_id, connection_id);
    }

    pub async fn publish(&self, target: RealtimeTarget, event: ServerEvent) -> anyhow::Result<()> {
        let envelope = RelayEnvelope { target, event };
        match &self.relay {
            Some(relay) => {
                let payload = serde_json::to_string(&envelope)?;
                let mut redis = relay.get().await?;
                let _: () = redis.publish(RELAY_CHANNEL, payload).await?;
            }
            None => {
                self.deliver(&envelope).await?;
            }
        }
        Ok(())
    }

    /// Sends an event directly to one connection, bypassing channel membership.
    pub async fn send_to(
        &self,
        connection_id: ConnectionId,
        event: &ServerEvent,
    ) -> anyhow::Result<bool> {
        let payload = serde_json::to_string(event)?;
        let registry = self.registry.read().await;
        Ok(registry
            .connections
            .get(&connection_id)
            .is_some_and(|subscriber| offer(connection_id, subscriber, payload)))
    }

    /// Fans an envelope out to the matching subscribers of this process.
    /// Returns how many connections accepted the event.
    pub async fn deliver(&self, envelope: &RelayEnvelope) -> anyhow::Result<usize> {
        let payload = serde_json::to_string(&envelope.event)?;
        let registry = self.registry.read().await;
        let delivered = match &envelope.target {
            RealtimeTarget::Global => registry
                .connections
                .iter()
                .filter(|(connection_id, subscriber)| {
                    offer(**connection_id, subscriber, payload.clone())
                })
                .count(),
            RealtimeTarget::Conversation(conversation_id) => registry
                .conversations
                .get(conversation_id)
                .into_iter()
                .flatten()
                .filter_map(|connection_id| {
                    registry
                        .connections
                        .get(connection_id)
                        .map(|subscriber| (*connection_id, subscriber))
                })
                .filter(|(connection_id, subscriber)| {
                    offer(*connection_id, subscriber, payload.clone())
                })
                .count(),
        };
        Ok(delivered)
    }

    pub async fn subscriber_count(&self, conversation_id: &ConversationId) -> usize {
        let registry = self.registry.read().await;
        registry
            .conversations
            .get(conversation_id)
            .map_or(0, HashSet::len)
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }
}

fn offer(connection_id: ConnectionId, subscriber: &Subscriber, payload: String) -> bool {
    match subscriber.sender.try_send(payload) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(
                %connection_id,
                participant_id = %subscriber.participant.id,
                "Dropping realtime event for slow connection"
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(%connection_id, "Dropping realtime event for closed connection");
            false
        }
    }
}

fn remove_member(
    registry: &mut Registry,
    conversation_id: &ConversationId,
    connection_id: ConnectionId,
) {
    if let Some(members) = registry.conversations.get_mut(conversation_id) {
        members.remove(&connection_id);
        if members.is_empty() {
            registry.conversations.remove(conversation_id);
        }
    }
}

//! Best-effort event fan-out to a tenant's live sessions.
//!
//! Each tenant gets a broadcast channel that websocket sessions subscribe
//! to.  Publishing after a state change is fire-and-forget: no
//! acknowledgement, no replay, no buffering for offline tenants.  A publish
//! with nobody subscribed is simply dropped.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use waflow_shared::events::RelayEvent;

/// Per-channel buffer; a session lagging further than this loses events
/// rather than blocking the publisher.
const CHANNEL_CAPACITY: usize = 64;

/// Fan-out registry keyed by tenant id.
#[derive(Clone, Default)]
pub struct EventRelay {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<RelayEvent>>>>,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a live session to a tenant's events, creating the channel
    /// on first use.
    pub async fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<RelayEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Push an event to whoever is subscribed right now.  Never blocks and
    /// never fails the calling operation.
    pub async fn publish(&self, user_id: Uuid, event: RelayEvent) {
        let channels = self.channels.read().await;
        let Some(sender) = channels.get(&user_id) else {
            debug!(user = %user_id, "no live session, event dropped");
            return;
        };
        // Err here only means zero receivers; best-effort, so ignore it.
        let delivered = sender.send(event).unwrap_or(0);
        debug!(user = %user_id, sessions = delivered, "event published");
    }

    /// Number of live sessions currently subscribed for a tenant.
    pub async fn session_count(&self, user_id: Uuid) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(&user_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Evict channels with no remaining subscribers.
    pub async fn purge_idle(&self) {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        let removed = before - channels.len();
        if removed > 0 {
            debug!(removed, "purged idle relay channels");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let relay = EventRelay::new();
        let user = Uuid::new_v4();

        let mut rx = relay.subscribe(user).await;
        relay
            .publish(user, RelayEvent::deleted("bot1".into()))
            .await;

        let event = rx.recv().await.unwrap();
        match event {
            RelayEvent::InstanceDeleted { instance_name, .. } => {
                assert_eq!(instance_name, "bot1")
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscriber_is_dropped() {
        let relay = EventRelay::new();
        // Must not panic or block.
        relay
            .publish(Uuid::new_v4(), RelayEvent::deleted("bot1".into()))
            .await;
    }

    #[tokio::test]
    async fn events_are_tenant_scoped() {
        let relay = EventRelay::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut alice_rx = relay.subscribe(alice).await;
        let mut bob_rx = relay.subscribe(bob).await;

        relay
            .publish(alice, RelayEvent::deleted("alice-bot".into()))
            .await;

        assert!(alice_rx.recv().await.is_ok());
        assert!(matches!(
            bob_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn purge_removes_idle_channels() {
        let relay = EventRelay::new();
        let user = Uuid::new_v4();

        let rx = relay.subscribe(user).await;
        assert_eq!(relay.session_count(user).await, 1);

        drop(rx);
        relay.purge_idle().await;
        assert_eq!(relay.session_count(user).await, 0);
    }
}

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ws::{Action, Resource, SubscriptionHub};

/// A committed mutation, ready for fan-out. `payload` is the full serialized
/// state of the affected entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub resource: Resource,
    pub action: Action,
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(resource: Resource, action: Action, payload: serde_json::Value) -> Self {
        Self {
            resource,
            action,
            payload,
        }
    }
}

/// Sending half handed to every mutating service. Services emit events only
/// after their transaction commits; a full or closed channel is logged and
/// dropped, never surfaced to the caller.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel and forwards each event to the subscription hub.
///
/// Running this on its own task keeps fan-out outside every transaction
/// boundary while preserving per-resource commit order (the channel is FIFO
/// and publishes are never batched).
pub async fn process_events(mut rx: mpsc::Receiver<Event>, hub: Arc<SubscriptionHub>) {
    info!("Starting event fan-out loop");

    while let Some(event) = rx.recv().await {
        debug!(
            resource = event.resource.as_str(),
            action = event.action.as_str(),
            "Forwarding committed event to subscribers"
        );
        hub.publish(event.resource, event.action, event.payload);
    }

    warn!("Event fan-out loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc as tokio_mpsc;

    #[tokio::test]
    async fn events_flow_through_to_subscribers_in_order() {
        let hub = Arc::new(SubscriptionHub::new());
        let (conn_tx, mut conn_rx) = tokio_mpsc::unbounded_channel();
        let conn = hub.register(conn_tx);
        hub.subscribe(conn, "inventory");

        let (tx, rx) = tokio_mpsc::channel(16);
        let sender = EventSender::new(tx);
        let worker = tokio::spawn(process_events(rx, hub.clone()));

        for i in 1..=3 {
            sender
                .send(Event::new(
                    Resource::Inventory,
                    Action::Update,
                    json!({"seq": i}),
                ))
                .await
                .expect("send");
        }
        drop(sender);
        worker.await.expect("fan-out loop exits when channel closes");

        for i in 1..=3 {
            let raw = conn_rx.try_recv().expect("delivery");
            let msg: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(msg["data"]["seq"], i);
        }
    }
}

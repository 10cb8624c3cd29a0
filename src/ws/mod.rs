//! Live update fan-out over WebSocket.
//!
//! A process-wide [`SubscriptionHub`] tracks which connections are subscribed
//! to which resource categories. Mutating services never talk to the hub
//! directly; they emit events through the mpsc channel in [`crate::events`]
//! after their transaction commits, and the fan-out task forwards each event
//! here. Delivery is best-effort: a slow or gone subscriber never fails the
//! mutation that triggered the publish.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;

/// Resource categories clients can subscribe to. The set is fixed; a
/// subscribe request naming anything else gets an error reply and no
/// registry change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Inventory,
    Experiments,
    Tests,
    Users,
    Locations,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Inventory,
        Resource::Experiments,
        Resource::Tests,
        Resource::Users,
        Resource::Locations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Inventory => "inventory",
            Resource::Experiments => "experiments",
            Resource::Tests => "tests",
            Resource::Users => "users",
            Resource::Locations => "locations",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inventory" => Some(Resource::Inventory),
            "experiments" => Some(Resource::Experiments),
            "tests" => Some(Resource::Tests),
            "users" => Some(Resource::Users),
            "locations" => Some(Resource::Locations),
            _ => None,
        }
    }
}

/// Action tag carried on every update push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

pub type ConnId = Uuid;

/// Concurrency-safe registry of subscriber connections per resource.
///
/// Constructed once per process and injected wherever it is needed; tests
/// build private instances.
#[derive(Debug, Default)]
pub struct SubscriptionHub {
    subscribers: DashMap<Resource, HashSet<ConnId>>,
    connections: DashMap<ConnId, mpsc::UnboundedSender<String>>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        let subscribers = DashMap::new();
        for resource in Resource::ALL {
            subscribers.insert(resource, HashSet::new());
        }
        Self {
            subscribers,
            connections: DashMap::new(),
        }
    }

    /// Registers a connection's outbound channel and returns its identifier.
    pub fn register(&self, sender: mpsc::UnboundedSender<String>) -> ConnId {
        let conn_id = Uuid::new_v4();
        self.connections.insert(conn_id, sender);
        debug!(conn_id = %conn_id, "WebSocket connection registered");
        conn_id
    }

    /// Adds the connection to a resource's subscriber set.
    ///
    /// Returns the resolved resource, or `None` for a name outside the fixed
    /// set (the caller replies with a subscription error; nothing changes).
    pub fn subscribe(&self, conn_id: ConnId, resource: &str) -> Option<Resource> {
        let resource = Resource::from_str(resource)?;
        self.subscribers
            .entry(resource)
            .or_default()
            .insert(conn_id);
        debug!(conn_id = %conn_id, resource = resource.as_str(), "Client subscribed");
        Some(resource)
    }

    /// Removes the connection from every resource set and drops its channel.
    /// Invoked on disconnect.
    pub fn unsubscribe_all(&self, conn_id: ConnId) {
        for mut entry in self.subscribers.iter_mut() {
            entry.value_mut().remove(&conn_id);
        }
        self.connections.remove(&conn_id);
        debug!(conn_id = %conn_id, "WebSocket connection removed from all resources");
    }

    /// Sends a message to a single connection, best-effort.
    pub fn send_to(&self, conn_id: ConnId, message: String) {
        if let Some(sender) = self.connections.get(&conn_id) {
            if sender.send(message).is_err() {
                debug!(conn_id = %conn_id, "Dropping message for closed connection");
            }
        }
    }

    /// Delivers `{action, resource, data}` to every current subscriber of
    /// the resource. Zero subscribers is a no-op; a failed send to one
    /// subscriber never prevents delivery to the rest.
    pub fn publish(&self, resource: Resource, action: Action, data: serde_json::Value) {
        let targets: Vec<ConnId> = match self.subscribers.get(&resource) {
            Some(set) if !set.is_empty() => set.iter().copied().collect(),
            _ => return,
        };

        let message = json!({
            "type": format!("{}_updated", resource.as_str()),
            "action": action.as_str(),
            "resource": resource.as_str(),
            "data": data,
        })
        .to_string();

        let mut delivered = 0usize;
        for conn_id in targets {
            if let Some(sender) = self.connections.get(&conn_id) {
                if sender.send(message.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }

        debug!(
            resource = resource.as_str(),
            action = action.as_str(),
            delivered,
            "Published update to subscribers"
        );
    }

    pub fn subscriber_count(&self, resource: Resource) -> usize {
        self.subscribers
            .get(&resource)
            .map(|set| set.len())
            .unwrap_or(0)
    }
}

/// Inbound client message on the WebSocket channel.
#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    kind: String,
    resource: Option<String>,
}

/// Upgrades the connection and runs it against the shared hub.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<SubscriptionHub>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = hub.register(tx);

    info!(conn_id = %conn_id, "WebSocket client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(Message::Text(message)).await.is_err() {
                break;
            }
        }
    });

    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => handle_client_message(conn_id, &text, &recv_hub),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unsubscribe_all(conn_id);
    info!(conn_id = %conn_id, "WebSocket client disconnected");
}

fn handle_client_message(conn_id: ConnId, text: &str, hub: &SubscriptionHub) {
    let parsed: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "Unparseable WebSocket message");
            hub.send_to(
                conn_id,
                json!({"type": "subscription_error", "message": "Malformed message"}).to_string(),
            );
            return;
        }
    };

    match parsed.kind.as_str() {
        "subscribe" => {
            let requested = parsed.resource.unwrap_or_default();
            match hub.subscribe(conn_id, &requested) {
                Some(resource) => hub.send_to(
                    conn_id,
                    json!({"type": "subscription_success", "resource": resource.as_str()})
                        .to_string(),
                ),
                None => hub.send_to(
                    conn_id,
                    json!({"type": "subscription_error", "message": "Invalid resource"})
                        .to_string(),
                ),
            }
        }
        other => {
            debug!(conn_id = %conn_id, kind = other, "Ignoring unknown message type");
        }
    }
}

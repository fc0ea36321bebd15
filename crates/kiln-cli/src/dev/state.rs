//! Live-reload client registry.
//!
//! Each Server-Sent-Events connection registers a bounded sender; build
//! events are broadcast to all of them as JSON.

use crate::dev::DevEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffered events per client before a slow client is dropped.
const CLIENT_BUFFER: usize = 100;

/// Connected SSE clients keyed by id.
pub type ClientRegistry = RwLock<HashMap<usize, mpsc::Sender<String>>>;

/// Shared development server state.
#[derive(Default)]
pub struct DevServerState {
    clients: ClientRegistry,
    next_client_id: AtomicUsize,
}

impl DevServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new SSE client and return its id and event receiver.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Send an event to every connected client, dropping closed or full ones.
    pub fn broadcast(&self, event: &DevEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize dev event: {}", e);
                return;
            }
        };

        // Collect first; the write lock is taken only for removals
        let failed: Vec<usize> = self
            .clients
            .read()
            .iter()
            .filter(|(_, tx)| tx.try_send(json.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();

        for id in failed {
            tracing::debug!("Dropping reload client {}", id);
            self.unregister_client(id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

pub type SharedState = Arc<DevServerState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_registration() {
        let state = DevServerState::new();

        let (id1, _rx1) = state.register_client();
        let (id2, _rx2) = state.register_client();

        assert_eq!(state.client_count(), 2);
        assert_ne!(id1, id2);

        state.unregister_client(id1);
        assert_eq!(state.client_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_clients() {
        let state = DevServerState::new();
        let (_id, mut rx) = state.register_client();

        state.broadcast(&DevEvent::BuildCompleted { duration_ms: 42 });

        let message = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["type"], "BuildCompleted");
        assert_eq!(value["duration_ms"], 42);
    }

    #[tokio::test]
    async fn test_broadcast_drops_closed_clients() {
        let state = DevServerState::new();
        let (_id, rx) = state.register_client();
        drop(rx);

        state.broadcast(&DevEvent::BuildStarted);
        assert_eq!(state.client_count(), 0);
    }
}

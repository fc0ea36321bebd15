//! Development server.
//!
//! - Initial build, then debounced rebuilds on source changes
//! - Live reload via Server-Sent Events and an injected client script
//! - Static serving of the output directory with history fallback
//! - Backend proxy and, with SSR, the render gateway in front of static files

pub mod adapter;
pub mod config;
pub mod proxy;
pub mod server;
pub mod state;
pub mod watcher;

pub use adapter::{DevHandle, DevServerAdapter};
pub use config::{find_available_port, DevOptions, ProxyRule};
pub use server::{dev_router, SSE_PATH};
pub use state::{DevServerState, SharedState};
pub use watcher::{FileChange, FileWatcher};

use serde::{Deserialize, Serialize};

/// Events pushed to reload clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevEvent {
    BuildStarted,

    BuildCompleted { duration_ms: u64 },

    BuildFailed { error: String },

    ClientConnected { id: usize },
}

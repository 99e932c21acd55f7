use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use plotline_mcp::McpService;

pub struct AppState {
    pub service: McpService,
    /// Domain names mounted in this instance, for the health surface.
    pub domains: Vec<&'static str>,
    pub sessions: SseSessions,
}

/// Open SSE sessions, keyed by session id. Each entry is the sender half
/// of the channel feeding that client's event stream.
#[derive(Default)]
pub struct SseSessions {
    senders: Arc<Mutex<HashMap<String, mpsc::Sender<String>>>>,
    counter: AtomicU64,
}

impl SseSessions {
    /// Register a new session, returning its id and the receiving half.
    ///
    /// The entry is removed again once the receiver is dropped, so a
    /// client that disconnects without ever posting does not leave a
    /// dangling sender in the map.
    pub async fn open(&self) -> (String, mpsc::Receiver<String>) {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = format!("{:x}-{:x}", chrono::Utc::now().timestamp_micros(), n);
        let (tx, rx) = mpsc::channel(32);
        self.senders.lock().await.insert(id.clone(), tx.clone());

        let senders = self.senders.clone();
        let reap_id = id.clone();
        tokio::spawn(async move {
            tx.closed().await;
            if senders.lock().await.remove(&reap_id).is_some() {
                tracing::info!(session = %reap_id, "SSE session closed");
            }
        });

        (id, rx)
    }

    pub async fn sender(&self, id: &str) -> Option<mpsc::Sender<String>> {
        self.senders.lock().await.get(id).cloned()
    }

    pub async fn close(&self, id: &str) {
        self.senders.lock().await.remove(id);
    }
}

pub type SharedState = Arc<AppState>;

//! Backend-restart detection.
//!
//! The backend accumulates ephemeral in-memory state (active track
//! sessions, RSSI histories); a restart invalidates it while the client
//! cache would happily keep showing stale geometry. On every connect the
//! controller fetches the server's session token and asks the monitor for a
//! verdict; a changed token demands one silent full reset. The monitor is
//! the single reset authority; no other component decides to reset.

use crate::client::{ClientError, ConsoleClient};
use crate::store::{KvStore, StoreError};

/// What a freshly observed session token means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuityVerdict {
    /// No token was stored yet; nothing to invalidate.
    FirstContact,
    /// Same backend incarnation; cache stays valid.
    Unchanged,
    /// Backend restarted; every derived cache must be reset.
    Restarted,
}

/// Compares session tokens across connects and persists the latest one.
pub struct ContinuityMonitor {
    store: KvStore,
}

impl ContinuityMonitor {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Judge a token observed on connect/reconnect and persist it.
    ///
    /// The token is always stored afterwards, so observing the same restart
    /// twice yields exactly one `Restarted`.
    pub fn observe(&mut self, token: &str) -> Result<ContinuityVerdict, StoreError> {
        let verdict = match self.store.session_token() {
            None => ContinuityVerdict::FirstContact,
            Some(stored) if stored == token => ContinuityVerdict::Unchanged,
            Some(stored) => {
                tracing::warn!(
                    "Backend restart detected: session token {} -> {}",
                    stored,
                    token
                );
                ContinuityVerdict::Restarted
            }
        };

        if verdict != ContinuityVerdict::Unchanged {
            self.store.set_session_token(token)?;
        }
        Ok(verdict)
    }

    pub fn stored_token(&self) -> Option<&str> {
        self.store.session_token()
    }
}

/// Reset the server-side history datasets after a restart was detected.
///
/// The three sub-resets are independent and failure-tolerant: one
/// unreachable endpoint must not block the others, so every error is logged
/// and swallowed.
pub async fn reset_server_datasets(client: &ConsoleClient) {
    let results: [(&str, Result<(), ClientError>); 3] = [
        ("geolocation history", client.reset_all_geo().await),
        ("trail history", client.reset_system_trail().await),
        ("heatmap history", client.reset_breadcrumbs().await),
    ];

    for (name, result) in results {
        match result {
            Ok(()) => tracing::debug!("Reset {}", name),
            Err(e) => tracing::warn!("Failed to reset {}: {}", name, e),
        }
    }
}

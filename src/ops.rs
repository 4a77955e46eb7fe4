//! In-flight operation bookkeeping.
//!
//! Scans, name lookups and geo-tracking requests each register here so the
//! UI can show what is running and offer cancellation. Elapsed time is
//! always derived from the stored start instant at display time; the start
//! instant itself is written exactly once.

use crate::types::BdAddress;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("Unknown operation: {0}")]
    Unknown(String),
    #[error("Operation {0} is not cancellable")]
    NotCancellable(String),
}

/// What kind of work an operation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Scan,
    NameLookup,
    GeoTrack,
    Query,
}

/// One tracked in-flight operation.
#[derive(Debug)]
pub struct OperationRecord {
    pub id: String,
    pub kind: OpKind,
    pub label: String,
    pub device: Option<BdAddress>,
    started: Instant,
    pub cancellable: bool,
    token: Option<CancellationToken>,
}

/// Display-time view with derived elapsed time.
#[derive(Debug, Clone)]
pub struct OperationView {
    pub id: String,
    pub kind: OpKind,
    pub label: String,
    pub device: Option<BdAddress>,
    pub elapsed: Duration,
    pub cancellable: bool,
}

/// Active-operation set, keyed by opaque id.
pub struct OperationTracker {
    active: HashMap<String, OperationRecord>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self {
            active: HashMap::new(),
        }
    }

    /// Idempotent upsert: re-adding an existing id refreshes its label but
    /// never resets the captured start time.
    pub fn add(
        &mut self,
        id: impl Into<String>,
        kind: OpKind,
        label: impl Into<String>,
        device: Option<BdAddress>,
        token: Option<CancellationToken>,
    ) {
        let id = id.into();
        let label = label.into();

        if let Some(existing) = self.active.get_mut(&id) {
            existing.label = label;
            return;
        }

        self.active.insert(
            id.clone(),
            OperationRecord {
                id,
                kind,
                label,
                device,
                started: Instant::now(),
                cancellable: token.is_some(),
                token,
            },
        );
    }

    /// Remove a finished operation; no-op for unknown ids.
    pub fn remove(&mut self, id: &str) {
        self.active.remove(id);
    }

    /// Cancel via the stored token and remove optimistically.
    ///
    /// Returns the removed record so the caller can issue the matching
    /// server-side stop request for the cancelled work.
    pub fn cancel(&mut self, id: &str) -> Result<OperationRecord, OpError> {
        let Some(rec) = self.active.remove(id) else {
            return Err(OpError::Unknown(id.to_string()));
        };

        let Some(token) = &rec.token else {
            // A failed cancel leaves the entry in place.
            let id = rec.id.clone();
            self.active.insert(id.clone(), rec);
            return Err(OpError::NotCancellable(id));
        };
        token.cancel();
        tracing::info!("Cancelled operation {}", id);
        Ok(rec)
    }

    /// Snapshot every active operation with display-only elapsed time.
    pub fn tick(&self) -> Vec<OperationView> {
        let now = Instant::now();
        let mut views: Vec<OperationView> = self
            .active
            .values()
            .map(|rec| OperationView {
                id: rec.id.clone(),
                kind: rec.kind,
                label: rec.label.clone(),
                device: rec.device.clone(),
                elapsed: now.duration_since(rec.started),
                cancellable: rec.cancellable,
            })
            .collect();
        views.sort_by(|a, b| b.elapsed.cmp(&a.elapsed));
        views
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drop every entry, e.g. on a reconnect-triggered reset.
    pub fn clear(&mut self) {
        self.active.clear();
    }
}

impl Default for OperationTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_remove_leaves_empty() {
        let mut ops = OperationTracker::new();
        ops.add("scan-1", OpKind::Scan, "Scanning", None, None);
        assert_eq!(ops.len(), 1);
        ops.remove("scan-1");
        assert!(ops.is_empty());
        // Removing again is a no-op.
        ops.remove("scan-1");
        assert!(ops.is_empty());
    }

    #[test]
    fn test_add_is_idempotent_on_start_time() {
        let mut ops = OperationTracker::new();
        ops.add("scan-1", OpKind::Scan, "Scanning", None, None);
        let first = ops.tick()[0].elapsed;

        std::thread::sleep(Duration::from_millis(20));
        ops.add("scan-1", OpKind::Scan, "Still scanning", None, None);

        let views = ops.tick();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].label, "Still scanning");
        // Start time survived the re-add: elapsed kept growing.
        assert!(views[0].elapsed >= first);
        assert!(views[0].elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn test_elapsed_monotonic_across_ticks() {
        let mut ops = OperationTracker::new();
        ops.add("q-1", OpKind::Query, "Query", None, None);
        let e1 = ops.tick()[0].elapsed;
        let e2 = ops.tick()[0].elapsed;
        assert!(e2 >= e1);
    }

    #[test]
    fn test_cancel_delegates_to_token() {
        let mut ops = OperationTracker::new();
        let token = CancellationToken::new();
        ops.add(
            "track-1",
            OpKind::GeoTrack,
            "Tracking AA:BB:CC:DD:EE:01",
            None,
            Some(token.clone()),
        );

        let rec = ops.cancel("track-1").unwrap();
        assert!(token.is_cancelled());
        assert_eq!(rec.kind, OpKind::GeoTrack);
        assert!(ops.is_empty());
    }

    #[test]
    fn test_cancel_errors() {
        let mut ops = OperationTracker::new();
        assert!(matches!(ops.cancel("nope"), Err(OpError::Unknown(_))));

        ops.add("scan-1", OpKind::Scan, "Scanning", None, None);
        assert!(matches!(
            ops.cancel("scan-1"),
            Err(OpError::NotCancellable(_))
        ));
        // A failed cancel leaves the entry in place.
        assert_eq!(ops.len(), 1);
    }
}

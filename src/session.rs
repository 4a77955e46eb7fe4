//! Per-device geo-tracking session state.
//!
//! Local state runs optimistically ahead of the server (`StartRequested` /
//! `StopRequested`) and is periodically reconciled against the
//! authoritative active-session list. There is deliberately no client-side
//! timeout on pending states: a request whose confirmation is lost stays
//! pending until the next reconciliation repairs it.

use crate::types::BdAddress;
use std::collections::HashMap;

/// Track-session lifecycle for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Idle,
    StartRequested,
    Active,
    StopRequested,
}

/// Which request the caller should issue after a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAction {
    IssueStart,
    IssueStop,
}

/// Outcome of a reconciliation pass against the server list.
#[derive(Debug, Default, PartialEq)]
pub struct Reconciliation {
    /// Sessions the server knew about that we did not: now `Active`. The
    /// presentation layer uses this to restore pinned device panels.
    pub adopted: Vec<BdAddress>,
    /// Sessions we believed in that the server has dropped: now `Idle`.
    pub cleared: Vec<BdAddress>,
}

/// Session map for active geo tracking.
pub struct TrackSessionManager {
    sessions: HashMap<BdAddress, TrackState>,
}

impl TrackSessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Current state; devices without a session are `Idle`.
    pub fn state(&self, addr: &BdAddress) -> TrackState {
        self.sessions.get(addr).copied().unwrap_or(TrackState::Idle)
    }

    pub fn is_tracking(&self, addr: &BdAddress) -> bool {
        self.state(addr) == TrackState::Active
    }

    /// Addresses currently in the `Active` state.
    pub fn active(&self) -> Vec<BdAddress> {
        self.sessions
            .iter()
            .filter(|(_, s)| **s == TrackState::Active)
            .map(|(a, _)| a.clone())
            .collect()
    }

    /// Flip tracking for a device.
    ///
    /// `Active` or `StartRequested` moves toward a stop; anything else
    /// moves toward a start. Returns the request the caller must issue, or
    /// `None` when the identical request is already pending (client-side
    /// dedup of double-fired actions).
    pub fn toggle(&mut self, addr: &BdAddress) -> Option<TrackAction> {
        match self.state(addr) {
            TrackState::Active | TrackState::StartRequested => self.request_stop(addr),
            TrackState::Idle | TrackState::StopRequested => self.request_start(addr),
        }
    }

    /// Move toward `StartRequested`; `None` if a start is already pending.
    pub fn request_start(&mut self, addr: &BdAddress) -> Option<TrackAction> {
        if self.state(addr) == TrackState::StartRequested {
            tracing::debug!("Start already pending for {}", addr);
            return None;
        }
        self.sessions.insert(addr.clone(), TrackState::StartRequested);
        Some(TrackAction::IssueStart)
    }

    /// Move toward `StopRequested`; `None` if a stop is already pending.
    pub fn request_stop(&mut self, addr: &BdAddress) -> Option<TrackAction> {
        if self.state(addr) == TrackState::StopRequested {
            tracing::debug!("Stop already pending for {}", addr);
            return None;
        }
        self.sessions.insert(addr.clone(), TrackState::StopRequested);
        Some(TrackAction::IssueStop)
    }

    /// Server confirmed a session started.
    pub fn confirm_started(&mut self, addr: &BdAddress) {
        self.sessions.insert(addr.clone(), TrackState::Active);
    }

    /// Server confirmed a session stopped.
    pub fn confirm_stopped(&mut self, addr: &BdAddress) {
        self.sessions.remove(addr);
    }

    /// Make local membership equal to the authoritative server list.
    ///
    /// Remote-only sessions are adopted as `Active`; local sessions (in any
    /// state) missing remotely are cleared to `Idle`. This is also what
    /// eventually un-sticks a lost `StartRequested`/`StopRequested`.
    pub fn reconcile(&mut self, remote_active: &[BdAddress]) -> Reconciliation {
        let mut outcome = Reconciliation::default();

        // Drop anything the server no longer claims.
        let stale: Vec<BdAddress> = self
            .sessions
            .keys()
            .filter(|a| !remote_active.contains(a))
            .cloned()
            .collect();
        for addr in stale {
            self.sessions.remove(&addr);
            outcome.cleared.push(addr);
        }

        // Adopt and confirm everything the server does claim.
        for addr in remote_active {
            let prev = self.state(addr);
            self.sessions.insert(addr.clone(), TrackState::Active);
            if prev != TrackState::Active {
                outcome.adopted.push(addr.clone());
            }
        }

        if !outcome.adopted.is_empty() || !outcome.cleared.is_empty() {
            tracing::info!(
                "Track sessions reconciled: {} adopted, {} cleared",
                outcome.adopted.len(),
                outcome.cleared.len()
            );
        }
        outcome
    }

    /// Drop every session, e.g. on a backend restart.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for TrackSessionManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Client session controller.
//!
//! [`ClientSession`] owns every piece of client state (registry, overlay
//! engine, operation tracker, track sessions, continuity monitor) and is
//! the single task that mutates them, so no locking is needed anywhere in
//! the core. Push messages, the 1 s operation tick and the periodic device
//! poll are multiplexed in [`ClientSession::run`].

use crate::client::{ClientError, ConsoleClient};
use crate::continuity::{self, ContinuityMonitor, ContinuityVerdict};
use crate::ops::{OpKind, OperationTracker, OperationView};
use crate::overlay::{DfSummary, HeatSample, OverlayEngine};
use crate::protocol::PushMessage;
use crate::registry::{DeviceFilter, DeviceRegistry, SortDir, SortKey};
use crate::session::{TrackAction, TrackSessionManager};
use crate::store::StoreError;
use crate::types::{BdAddress, DevicePatch, LatLon, LogEntry, LogLevel};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Bound on the retained in-UI log feed.
const LOG_FEED_CAPACITY: usize = 200;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Counters for the session event loop.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub messages: AtomicU64,
    pub snapshots: AtomicU64,
    pub gps_fixes: AtomicU64,
    pub resets: AtomicU64,
    pub errors: AtomicU64,
}

impl SessionStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages: self.messages.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
            gps_fixes: self.gps_fixes.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub messages: u64,
    pub snapshots: u64,
    pub gps_fixes: u64,
    pub resets: u64,
    pub errors: u64,
}

/// Timing configuration for the session loop.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between bulk device polls and track reconciliations.
    pub poll_interval: Duration,
    /// Cadence of the operation elapsed-time tick.
    pub op_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            op_tick: Duration::from_secs(1),
        }
    }
}

/// The client session: owner of all state and sole reset authority host.
pub struct ClientSession {
    client: ConsoleClient,
    registry: DeviceRegistry,
    overlay: OverlayEngine,
    ops: OperationTracker,
    tracks: TrackSessionManager,
    monitor: ContinuityMonitor,
    config: SessionConfig,
    stats: Arc<SessionStats>,
    log_feed: VecDeque<LogEntry>,
}

impl ClientSession {
    pub fn new(client: ConsoleClient, monitor: ContinuityMonitor, config: SessionConfig) -> Self {
        Self {
            client,
            registry: DeviceRegistry::new(),
            overlay: OverlayEngine::new(),
            ops: OperationTracker::new(),
            tracks: TrackSessionManager::new(),
            monitor,
            config,
            stats: Arc::new(SessionStats::default()),
            log_feed: VecDeque::with_capacity(LOG_FEED_CAPACITY),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn overlay(&self) -> &OverlayEngine {
        &self.overlay
    }

    pub fn tracks(&self) -> &TrackSessionManager {
        &self.tracks
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    pub fn log_feed(&self) -> impl Iterator<Item = &LogEntry> {
        self.log_feed.iter()
    }

    /// Current operation views with derived elapsed time.
    pub fn operations(&self) -> Vec<OperationView> {
        self.ops.tick()
    }

    /// Establish consistency with the server: compare the session token,
    /// reset if the backend restarted, then pull the authoritative state.
    ///
    /// Called on startup and again whenever the push channel reconnects.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        let config = self.client.fetch_config().await?;

        if self.monitor.observe(&config.session_token)? == ContinuityVerdict::Restarted {
            self.full_reset().await;
        }

        self.poll_snapshot().await;
        self.reconcile_tracks().await;
        self.seed_heatmap().await;
        Ok(())
    }

    /// Silent full reset after a detected backend restart.
    ///
    /// Clears every local cache, then fires the independent server-side
    /// dataset resets; each of those failures is logged and ignored.
    async fn full_reset(&mut self) {
        tracing::info!("Running silent full reset");
        self.registry.clear();
        self.overlay.clear();
        self.tracks.clear();
        self.ops.clear();
        continuity::reset_server_datasets(&self.client).await;
        self.stats.resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Dispatch one push-channel message.
    pub async fn handle_message(&mut self, msg: PushMessage) {
        self.stats.messages.fetch_add(1, Ordering::Relaxed);

        match msg {
            PushMessage::DeviceUpdate(patch) | PushMessage::DeviceInfo(patch) => {
                self.apply_and_overlay(patch);
            }
            PushMessage::DeviceList { devices } => {
                self.registry.apply_bulk_snapshot(devices).await;
                self.rebuild_overlays();
                self.stats.snapshots.fetch_add(1, Ordering::Relaxed);
            }
            PushMessage::DevicesCleared => {
                self.registry.clear();
                self.overlay.clear_device_overlays();
            }
            PushMessage::GpsUpdate { lat, lon } => {
                if self.overlay.record_own_position(LatLon::new(lat, lon)) {
                    self.stats.gps_fixes.fetch_add(1, Ordering::Relaxed);
                }
            }
            PushMessage::LogUpdate(entry) => {
                self.push_log(entry);
            }
            PushMessage::TargetAlert { addr, message } => {
                tracing::info!("Target alert for {}: {}", addr, message);
                let mut patch = DevicePatch::for_addr(addr);
                patch.is_target = Some(true);
                self.apply_and_overlay(patch);
            }
            PushMessage::NameResult { addr, name, error } => {
                self.ops.remove(&format!("name:{}", addr));
                match name {
                    Some(name) => {
                        let mut patch = DevicePatch::for_addr(addr);
                        patch.name = Some(name);
                        self.apply_and_overlay(patch);
                    }
                    None => {
                        tracing::debug!(
                            "Name lookup for {} failed: {}",
                            addr,
                            error.as_deref().unwrap_or("no result")
                        );
                    }
                }
            }
            PushMessage::GeoPing {
                addr,
                lat,
                lon,
                rssi,
                timestamp_ms,
                trend,
                bearing,
                confidence,
            } => {
                let mut patch = DevicePatch::for_addr(addr.clone());
                patch.rssi = Some(rssi);
                self.apply_and_overlay(patch);

                // Direction-finder values are computed server-side and
                // relayed as-is.
                if let Some(trend) = trend {
                    self.overlay.set_df_summary(
                        addr.clone(),
                        DfSummary {
                            trend,
                            bearing_deg: bearing,
                            confidence: confidence.unwrap_or(0.0),
                        },
                    );
                }

                // Heatmap is fed from target breadcrumbs only.
                if self.registry.get(&addr).is_some_and(|r| r.is_target) {
                    self.overlay.add_heat_sample(HeatSample {
                        addr,
                        position: LatLon::new(lat, lon),
                        rssi,
                        timestamp_ms,
                    });
                }
            }
            PushMessage::DataCleared { dataset } => match dataset.as_str() {
                "trail" => self.overlay.clear_trail(),
                "breadcrumbs" | "heatmap" => self.overlay.clear_heat(),
                "geo" => self.overlay.clear_device_overlays(),
                other => tracing::debug!("Ignoring clear of unknown dataset {:?}", other),
            },
            PushMessage::ServerRestart => {
                tracing::warn!("Server announced restart, re-establishing consistency");
                if let Err(e) = self.connect().await {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::error!("Reconnect after restart failed: {}", e);
                }
            }
        }
    }

    /// Flip geo tracking for a device, issuing the corresponding request.
    ///
    /// A toggle that would duplicate an identical pending request is a
    /// no-op. An HTTP failure leaves the session in its pending state; the
    /// next reconciliation repairs it.
    pub async fn toggle_track(&mut self, addr: &BdAddress) {
        let Some(action) = self.tracks.toggle(addr) else {
            return;
        };

        let op_id = format!("track:{}", addr);

        match action {
            TrackAction::IssueStart => {
                self.ops.add(
                    &op_id,
                    OpKind::GeoTrack,
                    format!("Tracking {}", addr),
                    Some(addr.clone()),
                    Some(CancellationToken::new()),
                );
                match self.client.track_start(addr).await {
                    Ok(()) => self.tracks.confirm_started(addr),
                    Err(e) => {
                        self.stats.errors.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("Track start for {} failed: {}", addr, e);
                    }
                }
            }
            TrackAction::IssueStop => {
                match self.client.track_stop(addr).await {
                    Ok(()) => self.tracks.confirm_stopped(addr),
                    Err(e) => {
                        self.stats.errors.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("Track stop for {} failed: {}", addr, e);
                    }
                }
                self.ops.remove(&op_id);
            }
        }
    }

    /// Start a device scan, surfacing it in the operation tracker.
    pub async fn start_scan(&mut self) {
        match self.client.start_scan().await {
            Ok(()) => {
                self.ops.add(
                    "scan",
                    OpKind::Scan,
                    "Scanning for devices",
                    None,
                    Some(CancellationToken::new()),
                );
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Scan start failed: {}", e);
            }
        }
    }

    /// Stop the device scan.
    pub async fn stop_scan(&mut self) {
        if let Err(e) = self.client.stop_scan().await {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Scan stop failed: {}", e);
        }
        self.ops.remove("scan");
    }

    /// Reset the server-side geolocation history of one device and drop
    /// its local overlays; the next position estimate rebuilds them.
    pub async fn reset_device_geo(&mut self, addr: &BdAddress) {
        self.overlay.remove_device(addr);
        if let Err(e) = self.client.reset_device_geo(addr).await {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Geo reset for {} failed: {}", addr, e);
        }
    }

    /// Cancel an in-flight operation by id.
    ///
    /// Beyond signalling the stored token, the work itself is stopped:
    /// cancelling a scan issues the scan-stop request, cancelling a track
    /// moves the session toward `StopRequested` and issues the track-stop
    /// request. A failed stop request is repaired by the next
    /// reconciliation, like any other lost confirmation.
    pub async fn cancel_operation(&mut self, id: &str) {
        let rec = match self.ops.cancel(id) {
            Ok(rec) => rec,
            Err(e) => {
                tracing::warn!("Cancel failed: {}", e);
                return;
            }
        };

        match rec.kind {
            OpKind::Scan => {
                if let Err(e) = self.client.stop_scan().await {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Scan stop after cancel failed: {}", e);
                }
            }
            OpKind::GeoTrack => {
                if let Some(addr) = rec.device {
                    self.tracks.request_stop(&addr);
                    match self.client.track_stop(&addr).await {
                        Ok(()) => self.tracks.confirm_stopped(&addr),
                        Err(e) => {
                            self.stats.errors.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!("Track stop after cancel for {} failed: {}", addr, e);
                        }
                    }
                }
            }
            OpKind::NameLookup | OpKind::Query => {}
        }
    }

    /// Devices for the table view: targets first, strongest signal next.
    pub fn device_table(&self) -> Vec<crate::types::DeviceRecord> {
        self.registry
            .query(&DeviceFilter::default(), SortKey::Rssi, SortDir::Descending)
    }

    /// Run the event loop until the push channel closes.
    pub async fn run(&mut self, mut push_rx: mpsc::Receiver<PushMessage>) {
        let mut op_tick = tokio::time::interval(self.config.op_tick);
        let mut poll = tokio::time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                msg = push_rx.recv() => {
                    match msg {
                        Some(msg) => self.handle_message(msg).await,
                        None => {
                            tracing::info!("Push channel closed, stopping session loop");
                            break;
                        }
                    }
                }
                _ = op_tick.tick() => {
                    let views = self.ops.tick();
                    if !views.is_empty() {
                        tracing::trace!("{} operations in flight", views.len());
                    }
                }
                _ = poll.tick() => {
                    self.poll_snapshot().await;
                    self.reconcile_tracks().await;
                }
            }
        }
    }

    fn apply_and_overlay(&mut self, patch: DevicePatch) {
        let addr = patch.addr.clone();
        self.registry.apply_patch(patch);
        if let Some(addr) = addr {
            if let Some(rec) = self.registry.get(&addr) {
                let rec = rec.clone();
                self.overlay.update_device(&rec);
            }
        }
    }

    fn rebuild_overlays(&mut self) {
        let located = self.registry.query(
            &DeviceFilter {
                located_only: true,
                ..Default::default()
            },
            SortKey::LastSeen,
            SortDir::Descending,
        );
        for rec in &located {
            self.overlay.update_device(rec);
        }
    }

    async fn poll_snapshot(&mut self) {
        match self.client.fetch_devices().await {
            Ok(devices) => {
                self.registry.apply_bulk_snapshot(devices).await;
                self.rebuild_overlays();
                self.stats.snapshots.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Device poll failed: {}", e);
            }
        }
    }

    async fn reconcile_tracks(&mut self) {
        match self.client.fetch_active_tracks().await {
            Ok(remote) => {
                let outcome = self.tracks.reconcile(&remote);
                for addr in &outcome.cleared {
                    self.ops.remove(&format!("track:{}", addr));
                }
                for addr in &outcome.adopted {
                    self.ops.add(
                        format!("track:{}", addr),
                        OpKind::GeoTrack,
                        format!("Tracking {}", addr),
                        Some(addr.clone()),
                        Some(CancellationToken::new()),
                    );
                }
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Track reconciliation failed: {}", e);
            }
        }
    }

    async fn seed_heatmap(&mut self) {
        match self.client.fetch_breadcrumbs().await {
            Ok(points) => {
                for p in points {
                    self.overlay.add_heat_sample(HeatSample {
                        addr: p.bd_address,
                        position: LatLon::new(p.lat, p.lon),
                        rssi: p.rssi,
                        timestamp_ms: p.timestamp_ms,
                    });
                }
            }
            Err(e) => {
                // Heatmap seeding is cosmetic; live pings will refill it.
                tracing::debug!("Breadcrumb seed failed: {}", e);
            }
        }
    }

    fn push_log(&mut self, entry: LogEntry) {
        match entry.level {
            LogLevel::Error => tracing::error!("[server] {}", entry.message),
            LogLevel::Warning => tracing::warn!("[server] {}", entry.message),
            LogLevel::Info => tracing::info!("[server] {}", entry.message),
            LogLevel::Debug => tracing::debug!("[server] {}", entry.message),
        }
        if self.log_feed.len() == LOG_FEED_CAPACITY {
            self.log_feed.pop_front();
        }
        self.log_feed.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::session::TrackState;
    use crate::store::KvStore;
    use crate::types::LogLevel;
    use tempfile::tempdir;

    fn session(dir: &std::path::Path) -> ClientSession {
        // Points at a closed port; tests below never await a request.
        let client = ConsoleClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
        let monitor = ContinuityMonitor::new(KvStore::open(dir.join("state.json")).unwrap());
        ClientSession::new(client, monitor, SessionConfig::default())
    }

    fn addr(n: u8) -> BdAddress {
        BdAddress::parse(&format!("AA:BB:CC:DD:EE:{:02X}", n)).unwrap()
    }

    fn ping(n: u8, lat: f64, lon: f64, rssi: i16, timestamp_ms: u64) -> PushMessage {
        PushMessage::GeoPing {
            addr: addr(n),
            lat,
            lon,
            rssi,
            timestamp_ms,
            trend: None,
            bearing: None,
            confidence: None,
        }
    }

    #[tokio::test]
    async fn test_device_update_builds_overlay() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        let mut patch = DevicePatch::for_addr(addr(1));
        patch.rssi = Some(-55);
        patch.lat = Some(40.0);
        patch.lon = Some(-74.0);
        patch.accuracy_m = Some(30.0);
        session.handle_message(PushMessage::DeviceUpdate(patch)).await;

        assert_eq!(session.registry().len(), 1);
        let overlay = session.overlay().cep(&addr(1)).unwrap();
        assert_eq!(overlay.ring.len(), 65);
        assert!((overlay.radius_m - 30.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_bulk_snapshot_end_to_end() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        let mut patch = DevicePatch::for_addr(addr(1));
        patch.rssi = Some(-55);
        patch.lat = Some(40.0);
        patch.lon = Some(-74.0);
        patch.accuracy_m = Some(30.0);
        session
            .handle_message(PushMessage::DeviceList {
                devices: vec![patch],
            })
            .await;

        assert_eq!(session.registry().len(), 1);

        // Ring vertices average out at the requested radius.
        let overlay = session.overlay().cep(&addr(1)).unwrap();
        let center = LatLon::new(40.0, -74.0);
        let mean: f64 = overlay.ring[..64]
            .iter()
            .map(|v| crate::geo::distance_m(center, *v))
            .sum::<f64>()
            / 64.0;
        assert!((mean - 30.0).abs() < 1.5, "mean radius {}", mean);
    }

    #[tokio::test]
    async fn test_devices_cleared_keeps_trail() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        session
            .handle_message(PushMessage::GpsUpdate {
                lat: 40.0,
                lon: -74.0,
            })
            .await;

        let mut patch = DevicePatch::for_addr(addr(1));
        patch.lat = Some(40.0);
        patch.lon = Some(-74.0);
        patch.accuracy_m = Some(20.0);
        session.handle_message(PushMessage::DeviceUpdate(patch)).await;

        session.handle_message(PushMessage::DevicesCleared).await;

        assert!(session.registry().is_empty());
        assert!(session.overlay().cep(&addr(1)).is_none());
        assert_eq!(session.overlay().trail_len(), 1);
    }

    #[tokio::test]
    async fn test_geo_ping_feeds_heatmap_for_targets_only() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        // Non-target ping: registry updated, no heat.
        session.handle_message(ping(1, 40.0, -74.0, -60, 1)).await;
        assert!(session.overlay().heat_features(None).is_empty());
        assert_eq!(session.registry().get(&addr(1)).unwrap().rssi, Some(-60));

        // Promote to target; pings now land in the heatmap.
        session
            .handle_message(PushMessage::TargetAlert {
                addr: addr(1),
                message: "sighted".into(),
            })
            .await;
        session.handle_message(ping(1, 40.0001, -74.0, -58, 2)).await;
        assert_eq!(session.overlay().heat_features(None).len(), 1);
    }

    #[tokio::test]
    async fn test_geo_ping_relays_df_summary() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        session
            .handle_message(PushMessage::GeoPing {
                addr: addr(1),
                lat: 40.0,
                lon: -74.0,
                rssi: -60,
                timestamp_ms: 1,
                trend: Some(0.4),
                bearing: Some(210.0),
                confidence: Some(0.7),
            })
            .await;

        let df = session.overlay().df_summary(&addr(1)).unwrap();
        assert_eq!(df.bearing_deg, Some(210.0));
        assert!((df.trend - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_log_feed_bounded_relay() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        session
            .handle_message(PushMessage::LogUpdate(LogEntry {
                level: LogLevel::Info,
                message: "scan started".into(),
                timestamp_ms: 1,
            }))
            .await;

        let feed: Vec<_> = session.log_feed().collect();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].message, "scan started");
    }

    #[tokio::test]
    async fn test_name_result_merges_and_clears_op() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        session.ops.add(
            format!("name:{}", addr(1)),
            OpKind::NameLookup,
            "Name lookup",
            Some(addr(1)),
            None,
        );

        session
            .handle_message(PushMessage::NameResult {
                addr: addr(1),
                name: Some("Headset".into()),
                error: None,
            })
            .await;

        assert!(session.ops.is_empty());
        assert_eq!(
            session.registry().get(&addr(1)).unwrap().name.as_deref(),
            Some("Headset")
        );
    }

    #[tokio::test]
    async fn test_cancel_track_requests_stop() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        let op_id = format!("track:{}", addr(1));

        // Active session with its operation entry, as after a confirmed
        // start.
        session.tracks.confirm_started(&addr(1));
        session.ops.add(
            &op_id,
            OpKind::GeoTrack,
            format!("Tracking {}", addr(1)),
            Some(addr(1)),
            Some(CancellationToken::new()),
        );

        session.cancel_operation(&op_id).await;

        // Operation gone and the session moved off Active: the stop request
        // went out (and failed against the closed port), leaving a pending
        // stop that reconciliation resolves instead of re-adopting.
        assert!(session.ops.is_empty());
        assert_eq!(session.tracks.state(&addr(1)), TrackState::StopRequested);
        assert_eq!(session.stats.snapshot().errors, 1);

        let outcome = session.tracks.reconcile(&[]);
        assert_eq!(outcome.cleared, vec![addr(1)]);
        assert_eq!(session.tracks.state(&addr(1)), TrackState::Idle);
    }

    #[tokio::test]
    async fn test_cancel_scan_issues_stop_request() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        session.ops.add(
            "scan",
            OpKind::Scan,
            "Scanning for devices",
            None,
            Some(CancellationToken::new()),
        );

        session.cancel_operation("scan").await;

        assert!(session.ops.is_empty());
        // The scan-stop request was attempted against the closed port.
        assert_eq!(session.stats.snapshot().errors, 1);
    }

    #[tokio::test]
    async fn test_reset_device_geo_drops_overlay() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        let mut patch = DevicePatch::for_addr(addr(1));
        patch.lat = Some(40.0);
        patch.lon = Some(-74.0);
        patch.accuracy_m = Some(30.0);
        session.handle_message(PushMessage::DeviceUpdate(patch)).await;
        assert!(session.overlay().cep(&addr(1)).is_some());

        session.reset_device_geo(&addr(1)).await;
        assert!(session.overlay().cep(&addr(1)).is_none());
    }

    #[tokio::test]
    async fn test_data_cleared_is_selective() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());

        session
            .handle_message(PushMessage::GpsUpdate {
                lat: 40.0,
                lon: -74.0,
            })
            .await;
        session
            .handle_message(PushMessage::TargetAlert {
                addr: addr(1),
                message: String::new(),
            })
            .await;
        session.handle_message(ping(1, 40.0, -74.0, -60, 1)).await;

        session
            .handle_message(PushMessage::DataCleared {
                dataset: "heatmap".into(),
            })
            .await;
        assert!(session.overlay().heat_features(None).is_empty());
        assert_eq!(session.overlay().trail_len(), 1);

        session
            .handle_message(PushMessage::DataCleared {
                dataset: "trail".into(),
            })
            .await;
        assert_eq!(session.overlay().trail_len(), 0);
    }
}

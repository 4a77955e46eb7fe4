//! Geospatial overlay engine.
//!
//! Consumes the registry and the pure geo math to maintain everything the
//! map surface draws: per-device CEP rings, the heatmap feature set, the
//! system's own trail, and relayed direction-finder summaries. All derived
//! state here is rebuilt from inputs and is cleared wholesale on a backend
//! restart; the engine never resets itself.

use crate::geo;
use crate::types::{BdAddress, DeviceRecord, LatLon};
use std::collections::{HashMap, VecDeque};

/// Trail points closer together than this are discarded.
pub const MIN_TRAIL_SPACING_M: f64 = 2.0;

/// Trail length bound; oldest point evicted first.
pub const MAX_TRAIL_POINTS: usize = 500;

/// Heat sample bound, matching the server's breadcrumb window.
pub const MAX_HEAT_SAMPLES: usize = 1000;

/// Closed CEP ring for one device, ready for a polygon overlay.
#[derive(Debug, Clone)]
pub struct CepOverlay {
    pub center: LatLon,
    pub radius_m: f64,
    pub ring: Vec<LatLon>,
    /// Fill color keyed to the device's last RSSI, if known.
    pub color: Option<[u8; 3]>,
}

/// One raw breadcrumb: an RSSI sample taken at a known system position.
#[derive(Debug, Clone)]
pub struct HeatSample {
    pub addr: BdAddress,
    pub position: LatLon,
    pub rssi: i16,
    pub timestamp_ms: u64,
}

/// Weighted point handed to the heatmap layer.
#[derive(Debug, Clone, Copy)]
pub struct HeatFeature {
    pub position: LatLon,
    /// Normalized weight in [0, 1].
    pub weight: f64,
}

/// Direction-finder output computed server-side and relayed verbatim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DfSummary {
    /// Signal trend: positive strengthening, negative weakening.
    pub trend: f64,
    pub bearing_deg: Option<f64>,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

/// Derived-geometry state for the map surface.
pub struct OverlayEngine {
    trail: VecDeque<LatLon>,
    ceps: HashMap<BdAddress, CepOverlay>,
    heat: VecDeque<HeatSample>,
    df: HashMap<BdAddress, DfSummary>,
}

impl OverlayEngine {
    pub fn new() -> Self {
        Self {
            trail: VecDeque::with_capacity(MAX_TRAIL_POINTS),
            ceps: HashMap::new(),
            heat: VecDeque::with_capacity(MAX_HEAT_SAMPLES),
            df: HashMap::new(),
        }
    }

    /// Feed a new system GPS fix into the trail.
    ///
    /// Accepted only if plausible and at least [`MIN_TRAIL_SPACING_M`] from
    /// the last stored point; returns whether the point was kept.
    pub fn record_own_position(&mut self, p: LatLon) -> bool {
        if !geo::is_plausible(p) {
            tracing::debug!("Ignoring implausible GPS fix: {:?}", p);
            return false;
        }
        if let Some(last) = self.trail.back() {
            if geo::distance_m(*last, p) < MIN_TRAIL_SPACING_M {
                return false;
            }
        }
        if self.trail.len() == MAX_TRAIL_POINTS {
            self.trail.pop_front();
        }
        self.trail.push_back(p);
        true
    }

    /// The trail as an ordered polyline, oldest first.
    pub fn trail(&self) -> impl Iterator<Item = &LatLon> {
        self.trail.iter()
    }

    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    /// Rebuild the CEP overlay for a device from its current record.
    ///
    /// A record without a plausible position and accuracy silently drops
    /// the overlay rather than drawing garbage.
    pub fn update_device(&mut self, rec: &DeviceRecord) {
        let overlay = match (rec.position, rec.accuracy_m) {
            (Some(center), Some(radius_m))
                if geo::is_plausible(center) && radius_m.is_finite() && radius_m > 0.0 =>
            {
                Some(CepOverlay {
                    center,
                    radius_m,
                    ring: geo::cep_ring(center, radius_m),
                    color: rec.rssi.map(geo::rssi_color),
                })
            }
            _ => None,
        };

        match overlay {
            Some(o) => {
                self.ceps.insert(rec.addr.clone(), o);
            }
            None => {
                self.ceps.remove(&rec.addr);
            }
        }
    }

    pub fn remove_device(&mut self, addr: &BdAddress) {
        self.ceps.remove(addr);
        self.df.remove(addr);
    }

    pub fn cep(&self, addr: &BdAddress) -> Option<&CepOverlay> {
        self.ceps.get(addr)
    }

    pub fn ceps(&self) -> impl Iterator<Item = (&BdAddress, &CepOverlay)> {
        self.ceps.iter()
    }

    /// Record a breadcrumb sample for the heatmap.
    pub fn add_heat_sample(&mut self, sample: HeatSample) {
        if !geo::is_plausible(sample.position) {
            tracing::debug!("Ignoring implausible heat sample for {}", sample.addr);
            return;
        }
        if self.heat.len() == MAX_HEAT_SAMPLES {
            self.heat.pop_front();
        }
        self.heat.push_back(sample);
    }

    /// Weighted features for the heatmap layer, optionally restricted to
    /// one device.
    pub fn heat_features(&self, only: Option<&BdAddress>) -> Vec<HeatFeature> {
        self.heat
            .iter()
            .filter(|s| only.is_none_or(|addr| &s.addr == addr))
            .map(|s| HeatFeature {
                position: s.position,
                weight: geo::heat_weight(s.rssi),
            })
            .collect()
    }

    pub fn set_df_summary(&mut self, addr: BdAddress, summary: DfSummary) {
        self.df.insert(addr, summary);
    }

    pub fn df_summary(&self, addr: &BdAddress) -> Option<&DfSummary> {
        self.df.get(addr)
    }

    /// Drop per-device overlays (CEP rings, DF summaries) but keep the
    /// trail and heat samples; used when only the device table was cleared.
    pub fn clear_device_overlays(&mut self) {
        self.ceps.clear();
        self.df.clear();
    }

    /// Drop the own-position trail only.
    pub fn clear_trail(&mut self) {
        self.trail.clear();
    }

    /// Drop the heatmap samples only.
    pub fn clear_heat(&mut self) {
        self.heat.clear();
    }

    /// Drop every derived overlay: trail, CEP rings, heat samples, DF
    /// summaries. Called only by the reset authority.
    pub fn clear(&mut self) {
        self.trail.clear();
        self.ceps.clear();
        self.heat.clear();
        self.df.clear();
    }
}

impl Default for OverlayEngine {
    fn default() -> Self {
        Self::new()
    }
}

//! Canonical device cache.
//!
//! One [`DeviceRecord`] per BD address, merged field-by-field from partial
//! updates and bulk snapshots. The registry never resets itself; only the
//! continuity monitor (via the controller) clears it.

use crate::types::{BdAddress, DevicePatch, DeviceRecord};
use std::collections::HashMap;
use tokio::sync::watch;

/// Records merged synchronously per chunk during a bulk snapshot before
/// yielding back to the event loop.
pub const SNAPSHOT_CHUNK: usize = 50;

/// Sort key for [`DeviceRegistry::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    LastSeen,
    Name,
    Rssi,
    Address,
    PacketCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Ascending,
    #[default]
    Descending,
}

/// Filter predicate for [`DeviceRegistry::query`].
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    /// Only devices flagged as targets.
    pub targets_only: bool,
    /// Only devices with an estimated position.
    pub located_only: bool,
    /// Case-insensitive substring match on address, name or manufacturer.
    pub text: Option<String>,
}

impl DeviceFilter {
    fn matches(&self, rec: &DeviceRecord) -> bool {
        if self.targets_only && !rec.is_target {
            return false;
        }
        if self.located_only && rec.position.is_none() {
            return false;
        }
        if let Some(text) = &self.text {
            let needle = text.to_ascii_lowercase();
            let hit = rec.addr.as_str().to_ascii_lowercase().contains(&needle)
                || rec
                    .name
                    .as_deref()
                    .is_some_and(|n| n.to_ascii_lowercase().contains(&needle))
                || rec
                    .manufacturer
                    .as_deref()
                    .is_some_and(|m| m.to_ascii_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Canonical device cache with per-field last-write-wins merge.
pub struct DeviceRegistry {
    devices: HashMap<BdAddress, DeviceRecord>,
    generation: watch::Sender<u64>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            devices: HashMap::new(),
            generation,
        }
    }

    /// Subscribe to change notifications (a bumped generation counter).
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, addr: &BdAddress) -> Option<&DeviceRecord> {
        self.devices.get(addr)
    }

    /// Merge one partial update; creates the record if absent.
    ///
    /// A patch without an address is malformed input: it is logged and
    /// dropped, never inserted.
    pub fn apply_patch(&mut self, patch: DevicePatch) {
        let Some(addr) = patch.addr.clone() else {
            tracing::warn!("Dropping device patch without address");
            return;
        };

        let rec = self
            .devices
            .entry(addr.clone())
            .or_insert_with(|| DeviceRecord::new(addr));
        Self::merge(rec, &patch);
        self.bump();
    }

    /// Ingest a full snapshot without starving the event loop: merge in
    /// chunks of [`SNAPSHOT_CHUNK`] and yield between chunks.
    pub async fn apply_bulk_snapshot(&mut self, patches: Vec<DevicePatch>) {
        let total = patches.len();
        let mut merged = 0usize;

        for chunk in patches.chunks(SNAPSHOT_CHUNK) {
            for patch in chunk {
                let Some(addr) = patch.addr.clone() else {
                    tracing::warn!("Dropping snapshot entry without address");
                    continue;
                };
                let rec = self
                    .devices
                    .entry(addr.clone())
                    .or_insert_with(|| DeviceRecord::new(addr));
                Self::merge(rec, patch);
                merged += 1;
            }
            self.bump();
            tokio::task::yield_now().await;
        }

        tracing::debug!("Snapshot merged: {}/{} records", merged, total);
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.devices.clear();
        self.bump();
    }

    /// Devices matching `filter`, targets first, then ordered by `key`.
    ///
    /// Absent numeric fields sort worse than any present value; strings
    /// compare case-insensitively.
    pub fn query(&self, filter: &DeviceFilter, key: SortKey, dir: SortDir) -> Vec<DeviceRecord> {
        let mut out: Vec<DeviceRecord> = self
            .devices
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        out.sort_by(|a, b| {
            // Targets always lead regardless of sort direction.
            b.is_target
                .cmp(&a.is_target)
                .then_with(|| {
                    let ord = Self::compare_by_key(a, b, key);
                    match dir {
                        SortDir::Ascending => ord,
                        SortDir::Descending => ord.reverse(),
                    }
                })
                .then_with(|| a.addr.cmp(&b.addr))
        });
        out
    }

    fn compare_by_key(a: &DeviceRecord, b: &DeviceRecord, key: SortKey) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        match key {
            SortKey::LastSeen => a.last_seen_ms.cmp(&b.last_seen_ms),
            SortKey::PacketCount => a.packet_count.cmp(&b.packet_count),
            SortKey::Address => a.addr.cmp(&b.addr),
            // None is a sentinel worse than any real RSSI.
            SortKey::Rssi => match (a.rssi, b.rssi) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            },
            SortKey::Name => {
                let an = a.name.as_deref().map(str::to_ascii_lowercase);
                let bn = b.name.as_deref().map(str::to_ascii_lowercase);
                match (an, bn) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Greater,
                    (None, Some(_)) => Ordering::Less,
                    (None, None) => Ordering::Equal,
                }
            }
        }
    }

    fn merge(rec: &mut DeviceRecord, patch: &DevicePatch) {
        if let Some(name) = &patch.name {
            rec.name = Some(name.clone());
        }
        if let Some(class) = patch.class {
            rec.class = class;
        }
        if let Some(rssi) = patch.rssi {
            rec.rssi = Some(rssi);
        }
        if let Some(manufacturer) = &patch.manufacturer {
            rec.manufacturer = Some(manufacturer.clone());
        }
        if let Some(pos) = patch.position() {
            rec.position = Some(pos);
        }
        if let Some(acc) = patch.accuracy_m {
            rec.accuracy_m = Some(acc);
        }
        if let Some(ts) = patch.last_seen_ms {
            rec.last_seen_ms = ts;
        }
        if let Some(target) = patch.is_target {
            rec.is_target = target;
        }
        if let Some(count) = patch.packet_count {
            rec.packet_count = count;
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

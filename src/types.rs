//! Core data types for the surveillance-console client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("Invalid BD address: {0:?}")]
    Invalid(String),
}

/// Canonical Bluetooth device address: six colon-separated hex octets,
/// normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BdAddress(String);

impl BdAddress {
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let octets: Vec<&str> = s.split(':').collect();
        if octets.len() != 6 {
            return Err(AddressError::Invalid(s.to_string()));
        }
        for octet in &octets {
            if octet.len() != 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(AddressError::Invalid(s.to_string()));
            }
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BdAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BdAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BdAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<BdAddress> for String {
    fn from(addr: BdAddress) -> Self {
        addr.0
    }
}

/// Radio technology of a detected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Classic,
    Ble,
    #[default]
    Unknown,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => f.write_str("classic"),
            Self::Ble => f.write_str("ble"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Canonical state of one detected device.
///
/// One record per address; every field a push event can carry is merged
/// individually (last-write-wins per field, never per record).
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRecord {
    pub addr: BdAddress,
    pub name: Option<String>,
    pub class: DeviceClass,
    /// Latest signal strength in dBm.
    pub rssi: Option<i16>,
    pub manufacturer: Option<String>,
    /// Server-estimated emitter position.
    pub position: Option<LatLon>,
    /// Estimated accuracy radius (CEP) in meters.
    pub accuracy_m: Option<f64>,
    /// Unix milliseconds of the last event referencing this device.
    pub last_seen_ms: u64,
    pub is_target: bool,
    pub packet_count: u64,
}

impl DeviceRecord {
    pub fn new(addr: BdAddress) -> Self {
        Self {
            addr,
            name: None,
            class: DeviceClass::Unknown,
            rssi: None,
            manufacturer: None,
            position: None,
            accuracy_m: None,
            last_seen_ms: 0,
            is_target: false,
            packet_count: 0,
        }
    }
}

/// Partial device update: every field optional except the address.
///
/// Wire names match the console API (`bd_address`, `emitter_lat`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicePatch {
    #[serde(rename = "bd_address")]
    pub addr: Option<BdAddress>,
    #[serde(rename = "device_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "device_type", skip_serializing_if = "Option::is_none")]
    pub class: Option<DeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(rename = "emitter_lat", skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(rename = "emitter_lon", skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(rename = "emitter_accuracy", skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    #[serde(rename = "last_seen", skip_serializing_if = "Option::is_none")]
    pub last_seen_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_target: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_count: Option<u64>,
}

impl DevicePatch {
    /// Patch carrying only an address, as a base for builders and tests.
    pub fn for_addr(addr: BdAddress) -> Self {
        Self {
            addr: Some(addr),
            ..Default::default()
        }
    }

    /// Emitter position, present only when both axes were supplied.
    pub fn position(&self) -> Option<LatLon> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)),
            _ => None,
        }
    }
}

/// Severity of a log-feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// One entry of the in-UI log feed, relayed verbatim to the presentation
/// layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub timestamp_ms: u64,
}

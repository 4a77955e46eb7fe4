//! Typed push-channel messages.
//!
//! The transport (websocket, SSE, a test harness) is out of scope; whatever
//! carries the bytes hands each frame to [`parse_message`] and feeds the
//! result into the controller. Message kinds and field names mirror the
//! console server's event vocabulary.

use crate::types::{BdAddress, DevicePatch, LatLon, LogEntry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Message missing device address")]
    MissingAddress,
}

/// One message from the server push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Partial update for a single device.
    DeviceUpdate(DevicePatch),
    /// Bulk snapshot of every device the server knows.
    DeviceList { devices: Vec<DevicePatch> },
    /// Server dropped its device table.
    DevicesCleared,
    /// New system GPS fix.
    GpsUpdate { lat: f64, lon: f64 },
    /// Log-feed entry for the UI.
    LogUpdate(LogEntry),
    /// A watched target was sighted.
    TargetAlert {
        #[serde(rename = "bd_address")]
        addr: BdAddress,
        #[serde(default)]
        message: String,
    },
    /// Response to a device-info query.
    DeviceInfo(DevicePatch),
    /// Result of an async name lookup.
    NameResult {
        #[serde(rename = "bd_address")]
        addr: BdAddress,
        name: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    /// RSSI/ranging sample taken at a known system position.
    ///
    /// May carry the server-computed direction-finder summary; the client
    /// relays those values and never derives its own bearing from RSSI.
    GeoPing {
        #[serde(rename = "bd_address")]
        addr: BdAddress,
        lat: f64,
        lon: f64,
        rssi: i16,
        #[serde(default)]
        timestamp_ms: u64,
        #[serde(default)]
        trend: Option<f64>,
        #[serde(default)]
        bearing: Option<f64>,
        #[serde(default)]
        confidence: Option<f64>,
    },
    /// Server-side dataset was cleared out-of-band.
    DataCleared { dataset: String },
    /// Backend announced it is restarting.
    ServerRestart,
}

impl PushMessage {
    /// Sample position of a geo-ping, if this is one.
    pub fn ping_position(&self) -> Option<LatLon> {
        match self {
            Self::GeoPing { lat, lon, .. } => Some(LatLon::new(*lat, *lon)),
            _ => None,
        }
    }
}

/// Parse one push-channel frame.
pub fn parse_message(raw: &str) -> Result<PushMessage, ParseError> {
    let msg: PushMessage = serde_json::from_str(raw)?;

    // Single-device payloads are useless without an address; reject them
    // here so the registry never sees an anonymous patch.
    match &msg {
        PushMessage::DeviceUpdate(patch) | PushMessage::DeviceInfo(patch)
            if patch.addr.is_none() =>
        {
            Err(ParseError::MissingAddress)
        }
        _ => Ok(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_update() {
        let raw = r#"{"type":"device_update","bd_address":"AA:BB:CC:DD:EE:01","rssi":-55,"emitter_lat":40.0,"emitter_lon":-74.0,"emitter_accuracy":30.0}"#;
        match parse_message(raw).unwrap() {
            PushMessage::DeviceUpdate(patch) => {
                assert_eq!(patch.rssi, Some(-55));
                assert_eq!(patch.accuracy_m, Some(30.0));
                assert!(patch.position().is_some());
            }
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_anonymous_update() {
        let raw = r#"{"type":"device_update","rssi":-55}"#;
        assert!(matches!(
            parse_message(raw),
            Err(ParseError::MissingAddress)
        ));
    }

    #[test]
    fn test_parse_device_list() {
        let raw = r#"{"type":"device_list","devices":[{"bd_address":"AA:BB:CC:DD:EE:01"},{"bd_address":"AA:BB:CC:DD:EE:02"}]}"#;
        match parse_message(raw).unwrap() {
            PushMessage::DeviceList { devices } => assert_eq!(devices.len(), 2),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_parse_geo_ping_and_restart() {
        let raw = r#"{"type":"geo_ping","bd_address":"AA:BB:CC:DD:EE:01","lat":40.0,"lon":-74.0,"rssi":-60}"#;
        let msg = parse_message(raw).unwrap();
        assert_eq!(msg.ping_position(), Some(LatLon::new(40.0, -74.0)));

        assert!(matches!(
            parse_message(r#"{"type":"server_restart"}"#).unwrap(),
            PushMessage::ServerRestart
        ));
    }

    #[test]
    fn test_parse_bad_json() {
        assert!(matches!(
            parse_message("not json"),
            Err(ParseError::Json(_))
        ));
    }
}

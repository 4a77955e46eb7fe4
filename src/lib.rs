//! Client-side core of a Bluetooth/location surveillance console.
//!
//! This library keeps a coherent local view of the world the console
//! server reports: detected radio devices, the system's own GPS position,
//! in-flight operations and per-device geo-tracking sessions, plus the
//! derived geometry (CEP rings, heatmap weights, trail) the map surface
//! draws.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Push channel │──▶│  Controller  │◀──│  HTTP client │
//! │  (messages)  │   │(ClientSession)│  │  (requests)  │
//! └──────────────┘   └──────┬───────┘   └──────────────┘
//!                           │ dispatch
//!        ┌───────────┬──────┴─────┬────────────┐
//!        ▼           ▼            ▼            ▼
//!   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────┐
//!   │Registry │ │ Overlay │ │ Op       │ │ Track    │
//!   │(devices)│ │ engine  │ │ tracker  │ │ sessions │
//!   └─────────┘ └─────────┘ └──────────┘ └──────────┘
//! ```
//!
//! The continuity monitor compares the backend's session token on every
//! connect; a changed token means the backend restarted, and the
//! controller runs a silent full reset so the client never shows geometry
//! derived from a dead process's state.
//!
//! # Example
//!
//! ```no_run
//! use nearsight::{
//!     client::{ClientConfig, ConsoleClient},
//!     continuity::ContinuityMonitor,
//!     controller::{ClientSession, SessionConfig},
//!     store::KvStore,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ConsoleClient::new(ClientConfig::new("http://127.0.0.1:8080"))?;
//!     let monitor = ContinuityMonitor::new(KvStore::open("nearsight.json")?);
//!     let mut session = ClientSession::new(client, monitor, SessionConfig::default());
//!
//!     session.connect().await?;
//!
//!     // Whatever transport carries the push channel feeds this sender.
//!     let (_push_tx, push_rx) = mpsc::channel(256);
//!     session.run(push_rx).await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod continuity;
pub mod controller;
pub mod geo;
pub mod ops;
pub mod overlay;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod store;
pub mod types;

pub use client::{ClientConfig, ConsoleClient};
pub use continuity::{ContinuityMonitor, ContinuityVerdict};
pub use controller::{ClientSession, SessionConfig};
pub use overlay::OverlayEngine;
pub use protocol::{parse_message, PushMessage};
pub use registry::DeviceRegistry;
pub use session::TrackSessionManager;
pub use store::KvStore;
pub use types::{BdAddress, DevicePatch, DeviceRecord, LatLon};

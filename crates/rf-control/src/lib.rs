//! RF Control Service
//!
//! This crate connects RPC requests to the device registry:
//!
//! - **RequestHandler**: resolves devices and applies Configure / GetStatus /
//!   GetInfo (plus Reconnect, Identify, ListDevices), always producing a
//!   well-formed response with failures reported in-band
//! - **Server**: JSON-lines over TCP; each connection is served by its own
//!   task and request handling runs on a bounded pool of blocking workers
//! - **Client**: async client with typed methods for every operation
//!
//! # Architecture
//!
//! ```text
//! client --(frame)--> server task --(permit)--> blocking worker
//!                                                 └─ RequestHandler
//!                                                      └─ DeviceRegistry
//!                                                           └─ RfDevice
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rf_control::RequestHandler;
//! use rf_device::{DeviceRegistry, SimulatorConfig};
//! use rf_protocol::ConfigureRequest;
//!
//! let registry = Arc::new(DeviceRegistry::simulated(SimulatorConfig {
//!     failure_rate: 0.0,
//!     handshake_delay_ms: 0,
//!     ..Default::default()
//! }));
//! let handler = RequestHandler::new(registry);
//!
//! let response = handler.handle_configure(
//!     &ConfigureRequest::new("usrp0").with_frequency(2.4e9).with_gain(20.0),
//! );
//! assert!(response.success);
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod server;

pub use client::RfControlClient;
pub use config::ServerConfig;
pub use error::ControlError;
pub use handler::RequestHandler;
pub use server::{serve_connection, RfControlServer};

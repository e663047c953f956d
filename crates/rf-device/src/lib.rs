//! RF Device Library
//!
//! This crate models the radios behind the RF control service:
//!
//! - **Validation**: pure range/enumeration checks against a device's specs
//! - **RfDevice**: per-device state machine (Disconnected/Connected) holding
//!   the current frequency, gain, bandwidth, antenna and temperature
//! - **RfBackend**: the hardware capability a device drives; the bundled
//!   [`SimulatedBackend`] stands in for a USRP-class radio with seedable
//!   randomness
//! - **DeviceRegistry**: the only owner of devices, creating exactly one
//!   instance per id even when first accessed from many threads at once
//!
//! # Example
//!
//! ```rust
//! use rf_device::{DeviceRegistry, SimulatorConfig};
//!
//! let registry = DeviceRegistry::simulated(SimulatorConfig {
//!     failure_rate: 0.0,
//!     handshake_delay_ms: 0,
//!     ..Default::default()
//! });
//!
//! let device = registry.get_or_create("usrp0").unwrap();
//! device.set_frequency(2.4e9).unwrap();
//! device.set_antenna("TX/RX").unwrap();
//!
//! let status = device.status().unwrap();
//! assert_eq!(status.frequency, 2.4e9);
//! assert_eq!(status.antenna, "TX/RX");
//! ```

pub mod backend;
pub mod device;
pub mod error;
pub mod registry;
pub mod validation;

pub use backend::{
    BackendFactory, RfBackend, Setting, SimulatedBackend, SimulatorConfig, SimulatorFactory,
    MAX_TEMPERATURE_DRIFT,
};
pub use device::{ConnectionState, DeviceSpecs, RfDevice, StatusSnapshot};
pub use error::{BackendError, ConfigError, DeviceError};
pub use registry::DeviceRegistry;
pub use validation::{validate_antenna, validate_frequency, validate_gain};

//! RF device state machine
//!
//! A device is either `Disconnected` (initial) or `Connected`. The only
//! transition is a successful handshake via [`RfDevice::connect`]; every
//! setter is rejected while disconnected. All mutable state sits behind one
//! per-device mutex so a status read never observes a half-applied change.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use rf_protocol::{format_bandwidth, format_frequency, DeviceInfo, StatusResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::backend::{RfBackend, Setting};
use crate::error::DeviceError;
use crate::validation::{validate_antenna, validate_frequency, validate_gain};

/// Default center frequency (2.4 GHz)
pub const DEFAULT_FREQUENCY_HZ: f64 = 2.4e9;
/// Default gain
pub const DEFAULT_GAIN_DB: f64 = 0.0;
/// Default bandwidth (20 MHz)
pub const DEFAULT_BANDWIDTH_HZ: f64 = 20e6;
/// Default antenna port
pub const DEFAULT_ANTENNA: &str = "RX2";
/// Temperature at power-on, in degrees Celsius
pub const AMBIENT_TEMPERATURE_C: f64 = 25.0;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Immutable hardware identity and capability ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpecs {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    /// Lowest tunable frequency in Hz
    pub min_frequency: f64,
    /// Highest tunable frequency in Hz
    pub max_frequency: f64,
    /// Lowest gain in dB
    pub min_gain: f64,
    /// Highest gain in dB
    pub max_gain: f64,
}

impl DeviceSpecs {
    /// Specs of an Ettus Research USRP B200
    pub fn usrp_b200(serial_number: impl Into<String>) -> Self {
        Self {
            manufacturer: "Ettus Research".to_string(),
            model: "USRP B200".to_string(),
            serial_number: serial_number.into(),
            firmware_version: "4.1.0".to_string(),
            min_frequency: 70e6,
            max_frequency: 6e9,
            min_gain: -20.0,
            max_gain: 76.0,
        }
    }

    /// Instrument identification string (`*IDN?` format)
    pub fn idn(&self) -> String {
        format!(
            "{},{},{},{}",
            self.manufacturer, self.model, self.serial_number, self.firmware_version
        )
    }

    /// Convert to the wire representation for `device_id`
    pub fn to_info(&self, device_id: &str) -> DeviceInfo {
        DeviceInfo {
            device_id: device_id.to_string(),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            serial_number: self.serial_number.clone(),
            firmware_version: self.firmware_version.clone(),
            min_frequency: self.min_frequency,
            max_frequency: self.max_frequency,
            min_gain: self.min_gain,
            max_gain: self.max_gain,
        }
    }
}

/// Point-in-time copy of a device's mutable state
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub device_id: String,
    pub connection_state: ConnectionState,
    /// Frequency in Hz
    pub frequency: f64,
    /// Gain in dB
    pub gain: f64,
    /// Bandwidth in Hz
    pub bandwidth: f64,
    pub antenna: String,
    /// Degrees Celsius
    pub temperature: f64,
}

impl StatusSnapshot {
    pub fn is_connected(&self) -> bool {
        self.connection_state.is_connected()
    }

    /// Convert to the wire representation with the given status message
    pub fn into_response(self, status_message: impl Into<String>) -> StatusResponse {
        StatusResponse {
            connected: self.is_connected(),
            device_id: self.device_id,
            current_frequency: self.frequency,
            current_gain: self.gain,
            current_bandwidth: self.bandwidth,
            current_antenna: self.antenna,
            temperature: self.temperature,
            status_message: status_message.into(),
        }
    }

    /// Get a summary of current state
    pub fn summary(&self) -> String {
        format!(
            "{} - {} {} dB {} {} {:.1}°C{}",
            self.device_id,
            format_frequency(self.frequency),
            self.gain,
            format_bandwidth(self.bandwidth),
            self.antenna,
            self.temperature,
            if self.is_connected() { "" } else { " [DISCONNECTED]" }
        )
    }
}

struct DeviceState {
    connection: ConnectionState,
    frequency: f64,
    gain: f64,
    bandwidth: f64,
    antenna: String,
    temperature: f64,
    backend: Box<dyn RfBackend>,
}

impl DeviceState {
    fn ensure_connected(&self, device_id: &str) -> Result<(), DeviceError> {
        if self.connection.is_connected() {
            Ok(())
        } else {
            Err(DeviceError::Disconnected(device_id.to_string()))
        }
    }
}

/// One physical or simulated radio
///
/// Devices are created by the [`DeviceRegistry`](crate::DeviceRegistry),
/// which guarantees a single instance per id.
pub struct RfDevice {
    id: String,
    specs: DeviceSpecs,
    state: Mutex<DeviceState>,
}

impl fmt::Debug for RfDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RfDevice")
            .field("id", &self.id)
            .field("specs", &self.specs)
            .finish_non_exhaustive()
    }
}

impl RfDevice {
    /// Create a disconnected device, reading its specs from the backend
    pub(crate) fn new(id: impl Into<String>, mut backend: Box<dyn RfBackend>) -> Self {
        let specs = backend.specs();
        Self {
            id: id.into(),
            specs,
            state: Mutex::new(DeviceState {
                connection: ConnectionState::Disconnected,
                frequency: DEFAULT_FREQUENCY_HZ,
                gain: DEFAULT_GAIN_DB,
                bandwidth: DEFAULT_BANDWIDTH_HZ,
                antenna: DEFAULT_ANTENNA.to_string(),
                temperature: AMBIENT_TEMPERATURE_C,
                backend,
            }),
        }
    }

    /// Get the device's identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the device's fixed specs
    pub fn specs(&self) -> &DeviceSpecs {
        &self.specs
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeviceState>, DeviceError> {
        self.state.lock().map_err(|_| {
            error!("State lock poisoned for device {}", self.id);
            DeviceError::Internal(format!("device {} state is unavailable", self.id))
        })
    }

    /// Perform the hardware handshake
    ///
    /// Returns true if the device is connected afterwards. A device that is
    /// already connected returns true without a new handshake; a failed
    /// handshake leaves it disconnected.
    pub fn connect(&self) -> bool {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(_) => return false,
        };

        if state.connection.is_connected() {
            return true;
        }

        info!("Connecting to RF device {}", self.id);
        match state.backend.open(&self.id) {
            Ok(()) => {
                state.connection = ConnectionState::Connected;
                info!("Successfully connected to {}", self.id);
                true
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", self.id, e);
                false
            }
        }
    }

    /// Retry the handshake on a device left disconnected
    pub fn reconnect(&self) -> bool {
        info!("Reconnect requested for {}", self.id);
        self.connect()
    }

    /// Check whether the handshake has succeeded
    pub fn is_connected(&self) -> bool {
        self.lock()
            .map(|state| state.connection.is_connected())
            .unwrap_or(false)
    }

    /// Tune to `hz`
    ///
    /// A retune nudges the simulated temperature by the backend's thermal
    /// drift.
    pub fn set_frequency(&self, hz: f64) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        state.ensure_connected(&self.id)?;

        if !validate_frequency(&self.specs, hz) {
            warn!("Frequency {} out of range for {}", format_frequency(hz), self.id);
            return Err(DeviceError::FrequencyOutOfRange {
                hz,
                min: self.specs.min_frequency,
                max: self.specs.max_frequency,
            });
        }

        // Every backend call happens before any state field changes
        state.backend.apply(&Setting::Frequency(hz))?;
        let drift = state.backend.thermal_drift();
        state.frequency = hz;
        state.temperature += drift;

        info!("Set frequency of {} to {}", self.id, format_frequency(hz));
        Ok(())
    }

    /// Set the gain to `db`
    pub fn set_gain(&self, db: f64) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        state.ensure_connected(&self.id)?;

        if !validate_gain(&self.specs, db) {
            warn!("Gain {} dB out of range for {}", db, self.id);
            return Err(DeviceError::GainOutOfRange {
                db,
                min: self.specs.min_gain,
                max: self.specs.max_gain,
            });
        }

        state.backend.apply(&Setting::Gain(db))?;
        state.gain = db;

        info!("Set gain of {} to {} dB", self.id, db);
        Ok(())
    }

    /// Set the bandwidth to `hz`
    ///
    /// The device imposes no bandwidth limit of its own.
    pub fn set_bandwidth(&self, hz: f64) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        state.ensure_connected(&self.id)?;

        state.backend.apply(&Setting::Bandwidth(hz))?;
        state.bandwidth = hz;

        info!("Set bandwidth of {} to {}", self.id, format_bandwidth(hz));
        Ok(())
    }

    /// Select an antenna port
    pub fn set_antenna(&self, name: &str) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        state.ensure_connected(&self.id)?;

        if !validate_antenna(name) {
            warn!("Invalid antenna {:?} for {}", name, self.id);
            return Err(DeviceError::InvalidAntenna(name.to_string()));
        }

        state.backend.apply(&Setting::Antenna(name.to_string()))?;
        state.antenna = name.to_string();

        info!("Set antenna of {} to {}", self.id, name);
        Ok(())
    }

    /// Take a consistent snapshot of the current state
    pub fn status(&self) -> Result<StatusSnapshot, DeviceError> {
        let state = self.lock()?;
        Ok(StatusSnapshot {
            device_id: self.id.clone(),
            connection_state: state.connection,
            frequency: state.frequency,
            gain: state.gain,
            bandwidth: state.bandwidth,
            antenna: state.antenna.clone(),
            temperature: state.temperature,
        })
    }

    /// Static device information
    pub fn info(&self) -> DeviceInfo {
        self.specs.to_info(&self.id)
    }

    /// Identification string, or `"DISCONNECTED"` before a handshake
    pub fn identify(&self) -> Result<String, DeviceError> {
        let state = self.lock()?;
        if state.connection.is_connected() {
            Ok(self.specs.idn())
        } else {
            Ok("DISCONNECTED".to_string())
        }
    }
}

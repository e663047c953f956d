//! Request and response messages
//!
//! Every operation the service exposes has a request variant in [`Request`]
//! and a matching body in [`Response`]. On the wire each is wrapped in a
//! frame carrying a caller-chosen id so responses can be matched to requests.

use serde::{Deserialize, Serialize};

/// Request to change one or more RF parameters on a device
///
/// Each parameter is optional. An absent field means "leave unchanged"; a
/// present value, including zero, is always applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigureRequest {
    /// Target device
    pub device_id: String,
    /// Center frequency in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    /// Gain in dB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
    /// Bandwidth in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<f64>,
    /// Antenna port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antenna: Option<String>,
}

impl ConfigureRequest {
    /// Create a request that changes nothing on `device_id`
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    /// Request a frequency change
    pub fn with_frequency(mut self, hz: f64) -> Self {
        self.frequency = Some(hz);
        self
    }

    /// Request a gain change
    pub fn with_gain(mut self, db: f64) -> Self {
        self.gain = Some(db);
        self
    }

    /// Request a bandwidth change
    pub fn with_bandwidth(mut self, hz: f64) -> Self {
        self.bandwidth = Some(hz);
        self
    }

    /// Request an antenna change
    pub fn with_antenna(mut self, antenna: impl Into<String>) -> Self {
        self.antenna = Some(antenna.into());
        self
    }

    /// True if no parameter is requested
    pub fn is_empty(&self) -> bool {
        self.frequency.is_none()
            && self.gain.is_none()
            && self.bandwidth.is_none()
            && self.antenna.is_none()
    }
}

/// Request addressed to a single device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRequest {
    /// Target device
    pub device_id: String,
}

impl DeviceRequest {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }
}

/// Live status of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub device_id: String,
    /// Whether the hardware handshake has succeeded
    pub connected: bool,
    /// Current frequency in Hz
    pub current_frequency: f64,
    /// Current gain in dB
    pub current_gain: f64,
    /// Current bandwidth in Hz
    pub current_bandwidth: f64,
    /// Selected antenna port
    pub current_antenna: String,
    /// Device temperature in degrees Celsius
    pub temperature: f64,
    /// Human-readable summary
    pub status_message: String,
}

impl StatusResponse {
    /// A status for a device that could not be reached
    pub fn unavailable(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            connected: false,
            current_frequency: 0.0,
            current_gain: 0.0,
            current_bandwidth: 0.0,
            current_antenna: String::new(),
            temperature: 0.0,
            status_message: message.into(),
        }
    }
}

/// Result of a configure request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigureResponse {
    /// True if every requested change was applied
    pub success: bool,
    /// One message per attempted change, joined with `"; "`
    pub message: String,
    /// Device status after the request; absent only on internal failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusResponse>,
    /// Unix timestamp in seconds
    pub timestamp: u64,
}

/// Static device information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
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

impl DeviceInfo {
    /// Placeholder returned when device information could not be read
    pub fn unknown(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            manufacturer: "Unknown".to_string(),
            model: "Error".to_string(),
            serial_number: "N/A".to_string(),
            firmware_version: "N/A".to_string(),
            min_frequency: 0.0,
            max_frequency: 0.0,
            min_gain: 0.0,
            max_gain: 0.0,
        }
    }
}

/// Instrument identification string (`*IDN?` style)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub device_id: String,
    pub idn: String,
}

/// Devices currently known to the service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub device_ids: Vec<String>,
}

/// Operations a client can invoke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    /// Change RF parameters
    Configure(ConfigureRequest),
    /// Read live status
    GetStatus(DeviceRequest),
    /// Read static device information
    GetInfo(DeviceRequest),
    /// Retry the hardware handshake
    Reconnect(DeviceRequest),
    /// Read the instrument identification string
    Identify(DeviceRequest),
    /// List known device ids
    ListDevices,
}

impl Request {
    /// Name of the operation, for logging
    pub fn method(&self) -> &'static str {
        match self {
            Request::Configure(_) => "configure",
            Request::GetStatus(_) => "get_status",
            Request::GetInfo(_) => "get_info",
            Request::Reconnect(_) => "reconnect",
            Request::Identify(_) => "identify",
            Request::ListDevices => "list_devices",
        }
    }

    /// Device the request targets, if any
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Request::Configure(req) => Some(&req.device_id),
            Request::GetStatus(req)
            | Request::GetInfo(req)
            | Request::Reconnect(req)
            | Request::Identify(req) => Some(&req.device_id),
            Request::ListDevices => None,
        }
    }
}

/// Response bodies, one per request kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Response {
    Configure(ConfigureResponse),
    Status(StatusResponse),
    Info(DeviceInfo),
    Identify(IdentifyResponse),
    DeviceList(DeviceListResponse),
}

/// A request on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Caller-chosen id echoed in the response
    pub id: u64,
    pub request: Request,
}

impl RequestFrame {
    pub fn new(id: u64, request: Request) -> Self {
        Self { id, request }
    }
}

/// A response on the wire
///
/// Exactly one of `result` or `error` is set. `error` is only used for
/// frames the server could not decode; failures inside a handled request are
/// reported in the `result` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Id of the request, or `None` if it could not be determined
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Response>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseFrame {
    /// A successfully handled request
    pub fn result(id: u64, response: Response) -> Self {
        Self {
            id: Some(id),
            result: Some(response),
            error: None,
        }
    }

    /// A frame that could not be handled
    pub fn error(id: Option<u64>, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }
}

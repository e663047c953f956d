//! Request handling
//!
//! Translates RPC operations into registry lookups and device calls. Every
//! operation returns a well-formed response: validation and connection
//! failures are reported in the response body, and unexpected faults
//! (poisoned locks, panicking drivers) are caught here and turned into
//! failure responses instead of tearing down the request.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rf_device::{DeviceError, DeviceRegistry, StatusSnapshot};
use rf_protocol::{
    format_bandwidth, ConfigureRequest, ConfigureResponse, DeviceInfo, DeviceListResponse,
    IdentifyResponse, Request, Response, StatusResponse,
};
use tracing::{debug, error, info};

/// Status message for a successful configure or a connected device
pub const STATUS_OPERATIONAL: &str = "Device operational";
/// Status message after a configure with at least one failed change
pub const STATUS_CONFIG_ERROR: &str = "Configuration error";
/// Status message for a device whose handshake has not succeeded
pub const STATUS_DISCONNECTED: &str = "Device disconnected";
/// Configure message when no parameter was requested
pub const NO_CHANGES: &str = "No changes requested";

/// Maps RPC operations onto the device registry
#[derive(Debug, Clone)]
pub struct RequestHandler {
    registry: Arc<DeviceRegistry>,
}

impl RequestHandler {
    /// Create a handler serving devices from `registry`
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Get the registry this handler serves
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Dispatch any request to its handler
    pub fn handle(&self, request: &Request) -> Response {
        match request {
            Request::Configure(req) => Response::Configure(self.handle_configure(req)),
            Request::GetStatus(req) => Response::Status(self.handle_get_status(&req.device_id)),
            Request::GetInfo(req) => Response::Info(self.handle_get_info(&req.device_id)),
            Request::Reconnect(req) => Response::Status(self.handle_reconnect(&req.device_id)),
            Request::Identify(req) => Response::Identify(self.handle_identify(&req.device_id)),
            Request::ListDevices => Response::DeviceList(self.handle_list_devices()),
        }
    }

    /// Apply each requested parameter and report the outcome
    ///
    /// Parameters are applied in the order frequency, gain, bandwidth,
    /// antenna. A failed change does not stop the remaining ones.
    pub fn handle_configure(&self, request: &ConfigureRequest) -> ConfigureResponse {
        info!("Configure called for device {}", request.device_id);

        guarded("configure", &request.device_id, || self.configure(request)).unwrap_or_else(
            |fault| ConfigureResponse {
                success: false,
                message: format!("Internal error: {}", fault),
                status: None,
                timestamp: unix_timestamp(),
            },
        )
    }

    fn configure(&self, request: &ConfigureRequest) -> Result<ConfigureResponse, DeviceError> {
        let device = self.registry.get_or_create(&request.device_id)?;
        let mut outcome = ConfigureOutcome::new();

        if let Some(hz) = request.frequency {
            outcome.record("frequency", device.set_frequency(hz), || {
                format!("Frequency set to {:.3} GHz", hz / 1e9)
            })?;
        }

        if let Some(db) = request.gain {
            outcome.record("gain", device.set_gain(db), || {
                format!("Gain set to {} dB", db)
            })?;
        }

        if let Some(hz) = request.bandwidth {
            outcome.record("bandwidth", device.set_bandwidth(hz), || {
                format!("Bandwidth set to {}", format_bandwidth(hz))
            })?;
        }

        if let Some(antenna) = &request.antenna {
            outcome.record("antenna", device.set_antenna(antenna), || {
                format!("Antenna set to {}", antenna)
            })?;
        }

        let snapshot = device.status()?;
        debug!("Configure result: {}", snapshot.summary());

        let status_message = if outcome.success {
            STATUS_OPERATIONAL
        } else {
            STATUS_CONFIG_ERROR
        };

        Ok(ConfigureResponse {
            success: outcome.success,
            message: outcome.message(),
            status: Some(snapshot.into_response(status_message)),
            timestamp: unix_timestamp(),
        })
    }

    /// Read the live status of a device, creating it if needed
    pub fn handle_get_status(&self, device_id: &str) -> StatusResponse {
        info!("GetStatus called for device {}", device_id);

        guarded("get_status", device_id, || {
            let device = self.registry.get_or_create(device_id)?;
            Ok(connection_status(device.status()?))
        })
        .unwrap_or_else(|fault| StatusResponse::unavailable(device_id, format!("Error: {}", fault)))
    }

    /// Read static device information, creating the device if needed
    pub fn handle_get_info(&self, device_id: &str) -> DeviceInfo {
        info!("GetInfo called for device {}", device_id);

        guarded("get_info", device_id, || {
            Ok(self.registry.get_or_create(device_id)?.info())
        })
        .unwrap_or_else(|_| DeviceInfo::unknown(device_id))
    }

    /// Retry the handshake of a device and report its status
    pub fn handle_reconnect(&self, device_id: &str) -> StatusResponse {
        info!("Reconnect called for device {}", device_id);

        guarded("reconnect", device_id, || {
            let device = self.registry.get_or_create(device_id)?;
            device.reconnect();
            Ok(connection_status(device.status()?))
        })
        .unwrap_or_else(|fault| StatusResponse::unavailable(device_id, format!("Error: {}", fault)))
    }

    /// Read the instrument identification string
    pub fn handle_identify(&self, device_id: &str) -> IdentifyResponse {
        info!("Identify called for device {}", device_id);

        let idn = guarded("identify", device_id, || {
            self.registry.get_or_create(device_id)?.identify()
        })
        .unwrap_or_else(|fault| format!("Error: {}", fault));

        IdentifyResponse {
            device_id: device_id.to_string(),
            idn,
        }
    }

    /// List the ids of all registered devices
    pub fn handle_list_devices(&self) -> DeviceListResponse {
        DeviceListResponse {
            device_ids: self.registry.device_ids(),
        }
    }
}

/// Accumulates per-field results of a configure request
struct ConfigureOutcome {
    success: bool,
    messages: Vec<String>,
}

impl ConfigureOutcome {
    fn new() -> Self {
        Self {
            success: true,
            messages: Vec::new(),
        }
    }

    /// Record one setter result; internal faults abort the request
    fn record(
        &mut self,
        field: &str,
        result: Result<(), DeviceError>,
        applied: impl FnOnce() -> String,
    ) -> Result<(), DeviceError> {
        match result {
            Ok(()) => self.messages.push(applied()),
            Err(e) if e.is_internal() => return Err(e),
            Err(e) => {
                self.success = false;
                self.messages.push(format!("Failed to set {}: {}", field, e));
            }
        }
        Ok(())
    }

    fn message(&self) -> String {
        if self.messages.is_empty() {
            NO_CHANGES.to_string()
        } else {
            self.messages.join("; ")
        }
    }
}

fn connection_status(snapshot: StatusSnapshot) -> StatusResponse {
    let message = if snapshot.is_connected() {
        STATUS_OPERATIONAL
    } else {
        STATUS_DISCONNECTED
    };
    snapshot.into_response(message)
}

/// Run `f`, converting errors and panics into a fault description
fn guarded<T>(
    operation: &str,
    device_id: &str,
    f: impl FnOnce() -> Result<T, DeviceError>,
) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!("Error in {} for {}: {}", operation, device_id, e);
            Err(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Panic in {} for {}: {}", operation, device_id, message);
            Err(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_device::SimulatorConfig;

    fn handler(failure_rate: f64) -> RequestHandler {
        let registry = DeviceRegistry::simulated(SimulatorConfig {
            failure_rate,
            handshake_delay_ms: 0,
            seed: Some(1),
            ..Default::default()
        });
        RequestHandler::new(Arc::new(registry))
    }

    #[test]
    fn test_configure_all_fields() {
        let handler = handler(0.0);
        let response = handler.handle_configure(
            &ConfigureRequest::new("usrp0")
                .with_frequency(2.4e9)
                .with_gain(20.0)
                .with_bandwidth(10e6)
                .with_antenna("TX/RX"),
        );

        assert!(response.success);
        assert_eq!(
            response.message,
            "Frequency set to 2.400 GHz; Gain set to 20 dB; Bandwidth set to 10.0 MHz; Antenna set to TX/RX"
        );
        let status = response.status.unwrap();
        assert_eq!(status.status_message, STATUS_OPERATIONAL);
        assert_eq!(status.current_frequency, 2.4e9);
        assert_eq!(status.current_gain, 20.0);
        assert_eq!(status.current_bandwidth, 10e6);
        assert_eq!(status.current_antenna, "TX/RX");
        assert!(response.timestamp > 0);
    }

    #[test]
    fn test_empty_configure_succeeds_unchanged() {
        let handler = handler(0.0);
        let before = handler.handle_get_status("usrp0");
        let response = handler.handle_configure(&ConfigureRequest::new("usrp0"));

        assert!(response.success);
        assert_eq!(response.message, NO_CHANGES);
        let status = response.status.unwrap();
        assert_eq!(status.current_frequency, before.current_frequency);
        assert_eq!(status.current_gain, before.current_gain);
        assert_eq!(status.current_bandwidth, before.current_bandwidth);
        assert_eq!(status.current_antenna, before.current_antenna);
        assert_eq!(status.temperature, before.temperature);
    }

    #[test]
    fn test_partial_failure_continues() {
        let handler = handler(0.0);
        let response = handler.handle_configure(
            &ConfigureRequest::new("usrp0")
                .with_frequency(10e9)
                .with_gain(30.0),
        );

        assert!(!response.success);
        assert!(response.message.starts_with("Failed to set frequency"));
        assert!(response.message.contains("Gain set to 30 dB"));
        let status = response.status.unwrap();
        assert_eq!(status.status_message, STATUS_CONFIG_ERROR);
        assert_eq!(status.current_frequency, 2.4e9);
        assert_eq!(status.current_gain, 30.0);
    }

    #[test]
    fn test_zero_gain_is_applied() {
        let handler = handler(0.0);
        handler.handle_configure(&ConfigureRequest::new("usrp0").with_gain(40.0));
        let response = handler.handle_configure(&ConfigureRequest::new("usrp0").with_gain(0.0));
        assert!(response.success);
        assert_eq!(response.status.unwrap().current_gain, 0.0);
    }

    #[test]
    fn test_configure_disconnected_device() {
        let handler = handler(1.0);
        let response =
            handler.handle_configure(&ConfigureRequest::new("dead").with_antenna("TX/RX"));
        assert!(!response.success);
        assert!(response.message.contains("not connected"));
        let status = response.status.unwrap();
        assert!(!status.connected);
        assert_eq!(status.current_antenna, "RX2");
    }

    #[test]
    fn test_get_status_messages() {
        assert_eq!(
            handler(0.0).handle_get_status("a").status_message,
            STATUS_OPERATIONAL
        );
        assert_eq!(
            handler(1.0).handle_get_status("a").status_message,
            STATUS_DISCONNECTED
        );
    }

    #[test]
    fn test_get_info_creates_device() {
        let handler = handler(0.0);
        assert!(handler.registry().get("newdevice").is_none());

        let info = handler.handle_get_info("newdevice");
        assert_eq!(info.device_id, "newdevice");
        assert_eq!(info.manufacturer, "Ettus Research");
        assert_eq!(info.model, "USRP B200");
        assert_eq!(info.min_frequency, 70e6);
        assert_eq!(info.max_frequency, 6e9);

        assert!(handler.registry().get("newdevice").is_some());
        assert_eq!(handler.handle_list_devices().device_ids, vec!["newdevice"]);
    }

    #[test]
    fn test_identify() {
        let connected = handler(0.0).handle_identify("usrp0");
        assert!(connected.idn.starts_with("Ettus Research,USRP B200,"));

        let disconnected = handler(1.0).handle_identify("usrp0");
        assert_eq!(disconnected.idn, "DISCONNECTED");
    }

    #[test]
    fn test_dispatch() {
        let handler = handler(0.0);
        let response = handler.handle(&Request::GetStatus(rf_protocol::DeviceRequest::new("x")));
        assert!(matches!(response, Response::Status(s) if s.device_id == "x"));

        let response = handler.handle(&Request::ListDevices);
        assert!(matches!(response, Response::DeviceList(l) if l.device_ids == vec!["x"]));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}

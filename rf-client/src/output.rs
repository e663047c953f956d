//! Text rendering of service responses

use std::fmt::Write;

use rf_protocol::{
    format_bandwidth, ConfigureRequest, ConfigureResponse, DeviceInfo, IdentifyResponse,
    StatusResponse,
};

fn ok_or_error(flag: bool) -> &'static str {
    if flag {
        "OK"
    } else {
        "ERROR"
    }
}

fn ghz(hz: f64) -> String {
    format!("{:.3} GHz", hz / 1e9)
}

/// Echo the changes about to be sent
pub fn format_request(request: &ConfigureRequest) -> String {
    let mut out = format!("Setting RF parameters for device '{}'...\n", request.device_id);
    if let Some(hz) = request.frequency {
        let _ = writeln!(out, "  Frequency: {}", ghz(hz));
    }
    if let Some(db) = request.gain {
        let _ = writeln!(out, "  Gain: {} dB", db);
    }
    if let Some(hz) = request.bandwidth {
        let _ = writeln!(out, "  Bandwidth: {}", format_bandwidth(hz));
    }
    if let Some(antenna) = &request.antenna {
        let _ = writeln!(out, "  Antenna: {}", antenna);
    }
    out
}

fn status_lines(out: &mut String, status: &StatusResponse) {
    let _ = writeln!(out, "  Connected: {}", ok_or_error(status.connected));
    let _ = writeln!(out, "  Frequency: {}", ghz(status.current_frequency));
    let _ = writeln!(out, "  Gain: {} dB", status.current_gain);
    let _ = writeln!(out, "  Bandwidth: {}", format_bandwidth(status.current_bandwidth));
    let _ = writeln!(out, "  Antenna: {}", status.current_antenna);
    let _ = writeln!(out, "  Temperature: {:.1}°C", status.temperature);
    let _ = writeln!(out, "  Status: {}", status.status_message);
}

pub fn format_configure(response: &ConfigureResponse) -> String {
    let mut out = String::from("Server Response:\n");
    let _ = writeln!(out, "  Success: {}", ok_or_error(response.success));
    let _ = writeln!(out, "  Message: {}", response.message);
    let _ = writeln!(out, "  Timestamp: {}", response.timestamp);

    if let Some(status) = &response.status {
        out.push_str("\nDevice Status:\n");
        status_lines(&mut out, status);
    }
    out
}

pub fn format_status(status: &StatusResponse) -> String {
    let mut out = format!("Device Status for '{}':\n", status.device_id);
    status_lines(&mut out, status);
    out
}

pub fn format_info(info: &DeviceInfo) -> String {
    let mut out = format!("Device Information for '{}':\n", info.device_id);
    let _ = writeln!(out, "  Manufacturer: {}", info.manufacturer);
    let _ = writeln!(out, "  Model: {}", info.model);
    let _ = writeln!(out, "  Serial Number: {}", info.serial_number);
    let _ = writeln!(out, "  Firmware Version: {}", info.firmware_version);
    let _ = writeln!(
        out,
        "  Frequency Range: {:.0} MHz - {:.1} GHz",
        info.min_frequency / 1e6,
        info.max_frequency / 1e9
    );
    let _ = writeln!(out, "  Gain Range: {} - {} dB", info.min_gain, info.max_gain);
    out
}

pub fn format_identify(response: &IdentifyResponse) -> String {
    format!("{}: {}\n", response.device_id, response.idn)
}

pub fn format_device_list(device_ids: &[String]) -> String {
    if device_ids.is_empty() {
        return "No devices\n".to_string();
    }
    device_ids.iter().map(|id| format!("{}\n", id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> StatusResponse {
        StatusResponse {
            device_id: "usrp0".to_string(),
            connected: true,
            current_frequency: 2.4e9,
            current_gain: 20.0,
            current_bandwidth: 20e6,
            current_antenna: "TX/RX".to_string(),
            temperature: 45.27,
            status_message: "Device operational".to_string(),
        }
    }

    #[test]
    fn test_status_layout() {
        let text = format_status(&status());
        assert!(text.starts_with("Device Status for 'usrp0':"));
        assert!(text.contains("  Connected: OK\n"));
        assert!(text.contains("  Frequency: 2.400 GHz\n"));
        assert!(text.contains("  Gain: 20 dB\n"));
        assert!(text.contains("  Bandwidth: 20.0 MHz\n"));
        assert!(text.contains("  Antenna: TX/RX\n"));
        assert!(text.contains("  Temperature: 45.3°C\n"));
        assert!(text.contains("  Status: Device operational\n"));
    }

    #[test]
    fn test_disconnected_status() {
        let text = format_status(&StatusResponse::unavailable("usrp0", "Device disconnected"));
        assert!(text.contains("  Connected: ERROR\n"));
        assert!(text.contains("  Status: Device disconnected\n"));
    }

    #[test]
    fn test_configure_without_status() {
        let response = ConfigureResponse {
            success: false,
            message: "Internal error: boom".to_string(),
            status: None,
            timestamp: 1_700_000_000,
        };
        let text = format_configure(&response);
        assert!(text.contains("  Success: ERROR\n"));
        assert!(text.contains("  Message: Internal error: boom\n"));
        assert!(text.contains("  Timestamp: 1700000000\n"));
        assert!(!text.contains("Device Status"));
    }

    #[test]
    fn test_configure_with_status() {
        let response = ConfigureResponse {
            success: true,
            message: "Gain set to 20 dB".to_string(),
            status: Some(status()),
            timestamp: 1,
        };
        let text = format_configure(&response);
        assert!(text.contains("  Success: OK\n"));
        assert!(text.contains("\nDevice Status:\n  Connected: OK\n"));
    }

    #[test]
    fn test_request_echo_skips_unset_fields() {
        let request = ConfigureRequest::new("usrp0").with_gain(-5.0);
        let text = format_request(&request);
        assert!(text.contains("  Gain: -5 dB\n"));
        assert!(!text.contains("Frequency"));
        assert!(!text.contains("Antenna"));
    }

    #[test]
    fn test_info_ranges() {
        let info = DeviceInfo {
            device_id: "usrp0".to_string(),
            manufacturer: "Ettus Research".to_string(),
            model: "USRP B210".to_string(),
            serial_number: "SN1".to_string(),
            firmware_version: "1.0".to_string(),
            min_frequency: 70e6,
            max_frequency: 6e9,
            min_gain: 0.0,
            max_gain: 76.0,
        };
        let text = format_info(&info);
        assert!(text.contains("  Frequency Range: 70 MHz - 6.0 GHz\n"));
        assert!(text.contains("  Gain Range: 0 - 76 dB\n"));
    }

    #[test]
    fn test_device_list() {
        assert_eq!(format_device_list(&[]), "No devices\n");
        assert_eq!(
            format_device_list(&["a".to_string(), "b".to_string()]),
            "a\nb\n"
        );
    }
}

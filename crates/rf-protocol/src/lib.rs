//! RF Control Protocol Library
//!
//! This crate defines the request/response messages exchanged between RF
//! control clients and the control service, plus the framing used to carry
//! them over a byte stream:
//!
//! - **Messages**: typed requests (`Configure`, `GetStatus`, `GetInfo`, ...)
//!   and their responses, all serde-serializable
//! - **Framing**: one JSON document per line, parsed by a streaming
//!   [`LineCodec`] that tolerates partial reads
//! - **Display**: frequency/bandwidth formatting and unit-suffixed parsing
//!   (`"2.4GHz"`, `"20MHz"`)
//!
//! # Example
//!
//! ```rust
//! use rf_protocol::{ConfigureRequest, LineCodec, Request, RequestFrame};
//!
//! let frame = RequestFrame::new(
//!     1,
//!     Request::Configure(ConfigureRequest::new("usrp0").with_frequency(2.4e9)),
//! );
//! let bytes = rf_protocol::encode_frame(&frame).unwrap();
//!
//! let mut codec = LineCodec::new();
//! codec.push_bytes(&bytes);
//! let line = codec.next_frame().unwrap().unwrap();
//! let decoded: RequestFrame = rf_protocol::decode_frame(&line).unwrap();
//! assert_eq!(decoded, frame);
//! ```

pub mod codec;
pub mod display;
pub mod error;
pub mod message;

pub use codec::{decode_frame, encode_frame, LineCodec, DEFAULT_MAX_FRAME_LEN};
pub use display::{format_bandwidth, format_frequency, parse_bandwidth, parse_frequency};
pub use error::{ParseError, ProtocolError};
pub use message::{
    ConfigureRequest, ConfigureResponse, DeviceInfo, DeviceListResponse, DeviceRequest,
    IdentifyResponse, Request, RequestFrame, Response, ResponseFrame, StatusResponse,
};

/// Antenna port names accepted by the supported radios
pub const VALID_ANTENNAS: [&str; 2] = ["TX/RX", "RX2"];

/// Default TCP port the control service listens on
pub const DEFAULT_PORT: u16 = 50051;

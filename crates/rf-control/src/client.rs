//! Async client for the control service

use rf_protocol::{
    decode_frame, encode_frame, ConfigureRequest, ConfigureResponse, DeviceInfo, DeviceRequest,
    IdentifyResponse, LineCodec, ProtocolError, Request, RequestFrame, Response, ResponseFrame,
    StatusResponse,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::ControlError;

/// Responses may carry long device lists, so allow more than a request frame
const CLIENT_MAX_FRAME_LEN: usize = 1024 * 1024;
const READ_BUFFER_LEN: usize = 4096;

/// Client for one server connection
///
/// Requests are sent one at a time; each call waits for its response.
#[derive(Debug)]
pub struct RfControlClient<S = TcpStream> {
    stream: S,
    codec: LineCodec,
    buf: Vec<u8>,
    next_id: u64,
}

impl RfControlClient<TcpStream> {
    /// Connect to a server at `addr` (e.g. `"127.0.0.1:50051"`)
    pub async fn connect(addr: &str) -> Result<Self, ControlError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to RF control server at {}", addr);
        Ok(Self::new(stream))
    }
}

impl<S> RfControlClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            codec: LineCodec::with_max_frame_len(CLIENT_MAX_FRAME_LEN),
            buf: vec![0; READ_BUFFER_LEN],
            next_id: 1,
        }
    }

    /// Send a request and wait for its response
    pub async fn call(&mut self, request: Request) -> Result<Response, ControlError> {
        let id = self.next_id;
        self.next_id += 1;

        debug!("Sending request {}: {}", id, request.method());
        let bytes = encode_frame(&RequestFrame::new(id, request))?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;

        let frame = self.read_frame().await?;
        if let Some(message) = frame.error {
            return Err(ControlError::Remote(message));
        }
        if frame.id != Some(id) {
            return Err(ControlError::ResponseIdMismatch {
                expected: id,
                actual: frame.id,
            });
        }
        frame
            .result
            .ok_or_else(|| ControlError::UnexpectedResponse("empty response frame".to_string()))
    }

    async fn read_frame(&mut self) -> Result<ResponseFrame, ControlError> {
        loop {
            if let Some(frame) = self.codec.next_frame() {
                let bytes = frame.map_err(ProtocolError::from)?;
                return Ok(decode_frame(&bytes)?);
            }

            let n = self.stream.read(&mut self.buf).await?;
            if n == 0 {
                return Err(ControlError::ConnectionClosed);
            }
            self.codec.push_bytes(&self.buf[..n]);
        }
    }

    pub async fn configure(
        &mut self,
        request: ConfigureRequest,
    ) -> Result<ConfigureResponse, ControlError> {
        match self.call(Request::Configure(request)).await? {
            Response::Configure(response) => Ok(response),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_status(&mut self, device_id: &str) -> Result<StatusResponse, ControlError> {
        match self
            .call(Request::GetStatus(DeviceRequest::new(device_id)))
            .await?
        {
            Response::Status(response) => Ok(response),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_info(&mut self, device_id: &str) -> Result<DeviceInfo, ControlError> {
        match self
            .call(Request::GetInfo(DeviceRequest::new(device_id)))
            .await?
        {
            Response::Info(response) => Ok(response),
            other => Err(unexpected(other)),
        }
    }

    /// Retry the handshake of a disconnected device
    pub async fn reconnect(&mut self, device_id: &str) -> Result<StatusResponse, ControlError> {
        match self
            .call(Request::Reconnect(DeviceRequest::new(device_id)))
            .await?
        {
            Response::Status(response) => Ok(response),
            other => Err(unexpected(other)),
        }
    }

    pub async fn identify(&mut self, device_id: &str) -> Result<IdentifyResponse, ControlError> {
        match self
            .call(Request::Identify(DeviceRequest::new(device_id)))
            .await?
        {
            Response::Identify(response) => Ok(response),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_devices(&mut self) -> Result<Vec<String>, ControlError> {
        match self.call(Request::ListDevices).await? {
            Response::DeviceList(response) => Ok(response.device_ids),
            other => Err(unexpected(other)),
        }
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn unexpected(response: Response) -> ControlError {
    let kind = match response {
        Response::Configure(_) => "configure",
        Response::Status(_) => "status",
        Response::Info(_) => "info",
        Response::Identify(_) => "identify",
        Response::DeviceList(_) => "device_list",
    };
    ControlError::UnexpectedResponse(kind.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    /// Answer each request line with the given raw response
    async fn scripted_server(stream: tokio::io::DuplexStream, replies: Vec<String>) {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = BufReader::new(read).lines();
        for reply in replies {
            if lines.next_line().await.unwrap().is_none() {
                return;
            }
            write.write_all(reply.as_bytes()).await.unwrap();
            write.write_all(b"\n").await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_list_devices() {
        let (client_io, server_io) = duplex(4096);
        tokio::spawn(scripted_server(
            server_io,
            vec![r#"{"id":1,"result":{"kind":"device_list","body":{"device_ids":["a","b"]}}}"#.to_string()],
        ));

        let mut client = RfControlClient::new(client_io);
        assert_eq!(client.list_devices().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_remote_error() {
        let (client_io, server_io) = duplex(4096);
        tokio::spawn(scripted_server(
            server_io,
            vec![r#"{"id":1,"error":"invalid message"}"#.to_string()],
        ));

        let mut client = RfControlClient::new(client_io);
        let err = client.get_status("usrp0").await.unwrap_err();
        assert!(matches!(err, ControlError::Remote(m) if m == "invalid message"));
    }

    #[tokio::test]
    async fn test_id_mismatch() {
        let (client_io, server_io) = duplex(4096);
        tokio::spawn(scripted_server(
            server_io,
            vec![r#"{"id":9,"result":{"kind":"device_list","body":{"device_ids":[]}}}"#.to_string()],
        ));

        let mut client = RfControlClient::new(client_io);
        let err = client.list_devices().await.unwrap_err();
        assert!(matches!(
            err,
            ControlError::ResponseIdMismatch {
                expected: 1,
                actual: Some(9)
            }
        ));
    }

    #[tokio::test]
    async fn test_unexpected_response_kind() {
        let (client_io, server_io) = duplex(4096);
        tokio::spawn(scripted_server(
            server_io,
            vec![r#"{"id":1,"result":{"kind":"device_list","body":{"device_ids":[]}}}"#.to_string()],
        ));

        let mut client = RfControlClient::new(client_io);
        let err = client.get_info("usrp0").await.unwrap_err();
        assert!(matches!(err, ControlError::UnexpectedResponse(k) if k == "device_list"));
    }

    #[tokio::test]
    async fn test_connection_closed() {
        let (client_io, server_io) = duplex(4096);
        tokio::spawn(async move {
            let mut lines = BufReader::new(server_io).lines();
            let _ = lines.next_line().await;
        });

        let mut client = RfControlClient::new(client_io);
        let err = client.identify("usrp0").await.unwrap_err();
        assert!(matches!(err, ControlError::ConnectionClosed));
    }
}

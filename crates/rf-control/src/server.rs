//! JSON-lines control server
//!
//! One task per connection reads request frames in order. Each decoded
//! request waits for a worker permit and then runs on the blocking pool,
//! since device handshakes and lock waits are synchronous. Responses are
//! written back in request order.

use std::sync::Arc;

use rf_protocol::{decode_frame, encode_frame, LineCodec, RequestFrame, ResponseFrame};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ControlError;
use crate::handler::RequestHandler;

const READ_BUFFER_LEN: usize = 4096;

/// TCP front end for a [`RequestHandler`]
#[derive(Debug)]
pub struct RfControlServer {
    handler: Arc<RequestHandler>,
    config: ServerConfig,
    workers: Arc<Semaphore>,
}

impl RfControlServer {
    pub fn new(handler: Arc<RequestHandler>, config: ServerConfig) -> Self {
        let workers = Arc::new(Semaphore::new(config.max_workers.max(1)));
        Self {
            handler,
            config,
            workers,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handler(&self) -> &Arc<RequestHandler> {
        &self.handler
    }

    /// Bind the configured listen address
    pub async fn bind(&self) -> Result<TcpListener, ControlError> {
        TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|e| ControlError::BindFailed {
                addr: self.config.listen_addr.clone(),
                reason: e.to_string(),
            })
    }

    /// Accept connections until `shutdown` becomes true or its sender is dropped
    pub async fn run(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ControlError> {
        let local_addr = listener.local_addr()?;
        info!(
            "RF control server listening on {} ({} workers)",
            local_addr,
            self.config.max_workers.max(1)
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("Accepted connection from {}", peer);
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                        }

                        let handler = Arc::clone(&self.handler);
                        let workers = Arc::clone(&self.workers);
                        let max_frame_len = self.config.max_frame_len;
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            match serve_connection(stream, handler, workers, max_frame_len, shutdown).await {
                                Ok(()) => debug!("Connection from {} closed", peer),
                                Err(e) => warn!("Connection from {} failed: {}", peer, e),
                            }
                        });
                    }
                    Err(e) => warn!("Failed to accept connection: {}", e),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("RF control server on {} shutting down", local_addr);
        Ok(())
    }
}

/// Serve one client connection until it closes or shutdown is signalled
///
/// Frames that cannot be decoded are answered with an error frame and the
/// connection stays open.
pub async fn serve_connection<S>(
    mut stream: S,
    handler: Arc<RequestHandler>,
    workers: Arc<Semaphore>,
    max_frame_len: usize,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ControlError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut codec = LineCodec::with_max_frame_len(max_frame_len);
    let mut buf = [0u8; READ_BUFFER_LEN];

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        let n = tokio::select! {
            result = stream.read(&mut buf) => result?,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                continue;
            }
        };

        if n == 0 {
            return Ok(());
        }

        codec.push_bytes(&buf[..n]);
        while let Some(frame) = codec.next_frame() {
            let response = match frame {
                Ok(bytes) => process_frame(&bytes, &handler, &workers).await,
                Err(e) => {
                    warn!("Discarding request frame: {}", e);
                    ResponseFrame::error(None, e.to_string())
                }
            };
            stream.write_all(&encode_frame(&response)?).await?;
        }
        stream.flush().await?;
    }
}

async fn process_frame(
    bytes: &[u8],
    handler: &Arc<RequestHandler>,
    workers: &Arc<Semaphore>,
) -> ResponseFrame {
    let RequestFrame { id, request } = match decode_frame::<RequestFrame>(bytes) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Rejecting request frame: {}", e);
            return ResponseFrame::error(peek_id(bytes), e.to_string());
        }
    };

    debug!(
        "Request {}: {} {}",
        id,
        request.method(),
        request.device_id().unwrap_or("-")
    );

    let permit = match Arc::clone(workers).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return ResponseFrame::error(Some(id), "server is shutting down"),
    };

    let handler = Arc::clone(handler);
    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        handler.handle(&request)
    })
    .await;

    match result {
        Ok(response) => ResponseFrame::result(id, response),
        Err(e) => {
            error!("Worker for request {} failed: {}", id, e);
            ResponseFrame::error(Some(id), format!("internal error: {}", e))
        }
    }
}

/// Recover the request id from a frame that failed to decode
fn peek_id(bytes: &[u8]) -> Option<u64> {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .ok()?
        .get("id")?
        .as_u64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_device::{DeviceRegistry, SimulatorConfig};
    use rf_protocol::{ConfigureRequest, Request, Response};
    use tokio::io::duplex;

    fn handler() -> Arc<RequestHandler> {
        let registry = DeviceRegistry::simulated(SimulatorConfig {
            failure_rate: 0.0,
            handshake_delay_ms: 0,
            seed: Some(3),
            ..Default::default()
        });
        Arc::new(RequestHandler::new(Arc::new(registry)))
    }

    async fn exchange(input: &[u8]) -> Vec<ResponseFrame> {
        let (mut client, server) = duplex(64 * 1024);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(serve_connection(
            server,
            handler(),
            Arc::new(Semaphore::new(2)),
            256,
            shutdown_rx,
        ));

        client.write_all(input).await.unwrap();
        client.shutdown().await.unwrap();

        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        task.await.unwrap().unwrap();

        output
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect()
    }

    #[test]
    fn test_peek_id() {
        assert_eq!(peek_id(br#"{"id":7,"request":{"method":"bogus"}}"#), Some(7));
        assert_eq!(peek_id(br#"{"request":{}}"#), None);
        assert_eq!(peek_id(b"not json"), None);
    }

    #[tokio::test]
    async fn test_responses_in_request_order() {
        let mut input = Vec::new();
        for (id, gain) in [(1u64, 10.0), (2, 20.0), (3, 30.0)] {
            let frame = RequestFrame::new(
                id,
                Request::Configure(ConfigureRequest::new("usrp0").with_gain(gain)),
            );
            input.extend(encode_frame(&frame).unwrap());
        }

        let frames = exchange(&input).await;
        assert_eq!(frames.len(), 3);
        for (frame, (id, gain)) in frames.iter().zip([(1u64, 10.0), (2, 20.0), (3, 30.0)]) {
            assert_eq!(frame.id, Some(id));
            match &frame.result {
                Some(Response::Configure(r)) => {
                    assert!(r.success);
                    assert_eq!(r.status.as_ref().unwrap().current_gain, gain);
                }
                other => panic!("unexpected result {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_bad_frames_answered_and_connection_kept() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"id\":4,\"request\":{\"method\":\"explode\"}}\n");
        input.extend_from_slice(b"garbage\n");
        input.extend(vec![b'x'; 300]);
        input.push(b'\n');
        input.extend(encode_frame(&RequestFrame::new(5, Request::ListDevices)).unwrap());

        let frames = exchange(&input).await;
        assert_eq!(frames.len(), 4);

        assert_eq!(frames[0].id, Some(4));
        assert!(frames[0].error.is_some());
        assert_eq!(frames[1].id, None);
        assert!(frames[1].error.is_some());
        assert_eq!(frames[2].id, None);
        assert!(frames[2].error.as_ref().unwrap().contains("too long"));

        assert_eq!(frames[3].id, Some(5));
        assert!(matches!(frames[3].result, Some(Response::DeviceList(_))));
    }
}

//! WebSocket transport over `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, MAX_FRAME_BYTES, Transport, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

fn io_error(kind: std::io::ErrorKind, e: impl std::error::Error + Send + Sync + 'static) -> std::io::Error {
    std::io::Error::new(kind, e)
}

/// Listens for WebSocket upgrades on a TCP socket.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds to `addr`. Use port 0 to let the OS pick.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "websocket transport listening");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
            TransportError::AcceptFailed(io_error(std::io::ErrorKind::ConnectionRefused, e))
        })?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "accepted websocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink: Arc::new(Mutex::new(sink)),
            stream: Arc::new(Mutex::new(stream)),
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// An accepted WebSocket client.
///
/// The read and write halves sit behind separate locks, so a task parked in
/// [`recv`](Connection::recv) never blocks another task's
/// [`send`](Connection::send). Cloning shares the same socket.
#[derive(Clone)]
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
    stream: Arc<Mutex<SplitStream<WsStream>>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// JSON payloads go out as text frames so browsers can read them
    /// directly; anything that is not UTF-8 goes out as binary.
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let msg = match std::str::from_utf8(frame) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(frame.to_vec()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            let data: Vec<u8> = match stream.next().await {
                Some(Ok(Message::Binary(data))) => data.into(),
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io_error(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            };
            if data.len() > MAX_FRAME_BYTES {
                return Err(TransportError::FrameTooLarge(data.len()));
            }
            return Ok(Some(data));
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

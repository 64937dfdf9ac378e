//! Async Host Link transport abstraction layer.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use hostlink_core::frame::{CR, REQUEST_LINE_END};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::trace;

pub mod server;
pub mod sim;
pub use server::{HostLinkService, HostLinkTcpServer, ServiceError};
pub use sim::{InMemoryPlc, PlcMemory, WordBank};

pub const DEFAULT_MAX_RESPONSE_LEN: usize = 256;

#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("request timed out")]
    Timeout,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("response exceeds {limit} bytes without a terminator")]
    ResponseTooLong { limit: usize },
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
}

#[async_trait]
pub trait DataLink: Send + Sync {
    /// Send one framed command and return the raw response line.
    ///
    /// The returned text includes the terminating CR when the peer sent one.
    async fn round_trip(&self, frame: &str) -> Result<String, DataLinkError>;
}

#[async_trait]
impl<T> DataLink for Arc<T>
where
    T: DataLink + ?Sized,
{
    async fn round_trip(&self, frame: &str) -> Result<String, DataLinkError> {
        (**self).round_trip(frame).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub max_response_len: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            response_timeout: Duration::from_secs(2),
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
        }
    }
}

impl TransportConfig {
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    pub fn with_max_response_len(mut self, max_response_len: usize) -> Self {
        self.max_response_len = max_response_len;
        self
    }
}

/// Connection-per-request transport to a serial bridge.
///
/// Every clone shares one gate, so at most one command is on the serial line
/// at a time no matter how many tasks hold a transport.
#[derive(Debug, Clone)]
pub struct HostLinkTcpTransport {
    addr: String,
    config: TransportConfig,
    gate: Arc<Mutex<()>>,
}

impl HostLinkTcpTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_config(addr, TransportConfig::default())
    }

    pub fn with_config(addr: impl Into<String>, config: TransportConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn config(&self) -> TransportConfig {
        self.config
    }

    async fn connect(&self) -> Result<TcpStream, DataLinkError> {
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| DataLinkError::ConnectTimeout)??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

async fn read_response<R>(reader: R, limit: usize) -> Result<String, DataLinkError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(64);
    let mut limited = reader.take(limit as u64);
    limited.read_until(CR, &mut buf).await?;

    if buf.is_empty() {
        return Err(DataLinkError::ConnectionClosed);
    }
    if buf.len() >= limit && buf.last() != Some(&CR) {
        return Err(DataLinkError::ResponseTooLong { limit });
    }
    String::from_utf8(buf).map_err(|_| DataLinkError::InvalidResponse("response is not ascii"))
}

#[async_trait]
impl DataLink for HostLinkTcpTransport {
    async fn round_trip(&self, frame: &str) -> Result<String, DataLinkError> {
        if frame.is_empty() {
            return Err(DataLinkError::InvalidResponse("empty request frame"));
        }

        let _gate = self.gate.lock().await;
        let mut stream = self.connect().await?;
        trace!(addr = %self.addr, frame, "sending host link frame");

        stream.write_all(frame.as_bytes()).await?;
        stream.write_all(REQUEST_LINE_END).await?;

        let reader = BufReader::new(&mut stream);
        let response = timeout(
            self.config.response_timeout,
            read_response(reader, self.config.max_response_len),
        )
        .await
        .map_err(|_| DataLinkError::Timeout)??;

        trace!(
            addr = %self.addr,
            response = response.trim_end(),
            "received host link response"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::{DataLink, DataLinkError, HostLinkTcpTransport, TransportConfig};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut reader = BufReader::new(socket);
        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line).await.unwrap();
        String::from_utf8(line).unwrap()
    }

    fn fast_config() -> TransportConfig {
        TransportConfig::default()
            .with_connect_timeout(Duration::from_millis(500))
            .with_response_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn round_trip_sends_crlf_and_stops_at_cr() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            assert_eq!(request, "@00RR0191000148*\r\n");
            socket.write_all(b"@00RR0082014B*\rtrailing").await.unwrap();
        });

        let transport = HostLinkTcpTransport::new(addr.to_string());
        let response = transport.round_trip("@00RR0191000148*").await.unwrap();
        assert_eq!(response, "@00RR0082014B*\r");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn every_round_trip_uses_a_fresh_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            for _ in 0..2 {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                socket.write_all(b"@00SC0050*\r").await.unwrap();
            }
        });

        let transport = HostLinkTcpTransport::with_config(addr.to_string(), fast_config());
        assert_eq!(transport.round_trip("@00SC0252*").await.unwrap(), "@00SC0050*\r");
        assert_eq!(transport.round_trip("@00SC0353*").await.unwrap(), "@00SC0050*\r");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn eof_before_any_byte_is_connection_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
        });

        let transport = HostLinkTcpTransport::with_config(addr.to_string(), fast_config());
        let err = transport.round_trip("@00RR0191000148*").await.unwrap_err();
        assert!(matches!(err, DataLinkError::ConnectionClosed));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn partial_line_at_eof_is_returned_as_is() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket.write_all(b"@00RR00").await.unwrap();
        });

        let transport = HostLinkTcpTransport::with_config(addr.to_string(), fast_config());
        let response = transport.round_trip("@00RR0191000148*").await.unwrap();
        assert_eq!(response, "@00RR00");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_bridge_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            tokio::time::sleep(Duration::from_millis(800)).await;
        });

        let transport = HostLinkTcpTransport::with_config(addr.to_string(), fast_config());
        let err = transport.round_trip("@00RR0191000148*").await.unwrap_err();
        assert!(matches!(err, DataLinkError::Timeout));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn unterminated_flood_is_capped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let _ = socket.write_all(&[b'A'; 512]).await;
        });

        let config = fast_config().with_max_response_len(64);
        let transport = HostLinkTcpTransport::with_config(addr.to_string(), config);
        let err = transport.round_trip("@00RR0191000148*").await.unwrap_err();
        assert!(matches!(err, DataLinkError::ResponseTooLong { limit: 64 }));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_an_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HostLinkTcpTransport::with_config(addr.to_string(), fast_config());
        let err = transport.round_trip("@00RR0191000148*").await.unwrap_err();
        assert!(matches!(err, DataLinkError::Io(_)));
    }

    #[tokio::test]
    async fn cloned_transports_never_overlap() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let server = {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            tokio::spawn(async move {
                for _ in 0..4 {
                    let (mut socket, _) = listener.accept().await.unwrap();
                    let active = Arc::clone(&active);
                    let peak = Arc::clone(&peak);
                    tokio::spawn(async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        read_request(&mut socket).await;
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        socket.write_all(b"@00SC0050*\r").await.unwrap();
                    });
                }
            })
        };

        let transport = HostLinkTcpTransport::new(addr.to_string());
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let transport = transport.clone();
                tokio::spawn(async move { transport.round_trip("@00SC0353*").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        server.await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}

use crate::DataLinkError;
use hostlink_core::frame::{CR, UNIT_PREFIX, with_fcs};
use hostlink_core::{DecodeError, EndCode, Request, encode_response};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, warn};

const DEFAULT_MAX_REQUEST_LEN: usize = 128;
/// Header echoed when the request is too mangled to recover its opcode.
const UNDEFINED_COMMAND: &str = "IC";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request rejected with end code {0}")]
    Rejected(EndCode),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl ServiceError {
    fn end_code(&self) -> EndCode {
        match self {
            Self::Rejected(code) => *code,
            Self::InvalidRequest(_) => EndCode::FormatError,
            Self::Internal(_) => EndCode::NotExecutable,
        }
    }
}

pub trait HostLinkService: Send + Sync + 'static {
    /// Handle a decoded request and return the response payload (hex text,
    /// empty for writes and mode changes).
    fn handle(&self, request: Request) -> Result<String, ServiceError>;
}

impl<T> HostLinkService for Arc<T>
where
    T: HostLinkService + ?Sized,
{
    fn handle(&self, request: Request) -> Result<String, ServiceError> {
        (**self).handle(request)
    }
}

/// Host Link server speaking the bridge side of the protocol: one framed request
/// per CR (or CR-LF) terminated line, one CR-terminated response per request.
pub struct HostLinkTcpServer<S> {
    listener: TcpListener,
    service: Arc<S>,
    max_request_len: usize,
}

impl<S: HostLinkService> HostLinkTcpServer<S> {
    pub async fn bind<A: ToSocketAddrs>(addr: A, service: S) -> Result<Self, DataLinkError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, service))
    }

    pub fn from_listener(listener: TcpListener, service: S) -> Self {
        Self {
            listener,
            service: Arc::new(service),
            max_request_len: DEFAULT_MAX_REQUEST_LEN,
        }
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, DataLinkError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn with_max_request_len(mut self, max_request_len: usize) -> Self {
        self.max_request_len = max_request_len;
        self
    }

    pub async fn run(self) -> Result<(), DataLinkError> {
        loop {
            let (socket, peer) = self.listener.accept().await?;
            let service = Arc::clone(&self.service);
            let max_request_len = self.max_request_len;

            tokio::spawn(async move {
                if let Err(err) = handle_connection(socket, service, max_request_len).await {
                    warn!(%peer, error = %err, "host link server connection ended with error");
                }
            });
        }
    }
}

fn map_decode_error(err: &DecodeError) -> EndCode {
    match err {
        DecodeError::InvalidFcs { .. } => EndCode::FcsError,
        DecodeError::InvalidLength => EndCode::FrameLengthError,
        _ => EndCode::FormatError,
    }
}

/// Error reply for a line that did not decode, echoing its opcode when readable.
fn error_response(line: &str, end_code: EndCode) -> String {
    let header = line
        .strip_prefix(UNIT_PREFIX)
        .and_then(|rest| rest.get(..2))
        .filter(|code| code.bytes().all(|b| b.is_ascii_uppercase()))
        .unwrap_or(UNDEFINED_COMMAND);
    with_fcs(&format!("{UNIT_PREFIX}{header}{end_code}"))
}

/// Response line (without CR) for one request line.
pub fn respond<S: HostLinkService + ?Sized>(service: &S, line: &str) -> String {
    let request = match Request::decode(line) {
        Ok(request) => request,
        Err(err) => {
            debug!(line, error = %err, "rejecting undecodable host link request");
            return error_response(line, map_decode_error(&err));
        }
    };

    let opcode = request.opcode();
    match service.handle(request) {
        Ok(payload) => encode_response(opcode, EndCode::Normal, &payload),
        Err(err) => {
            debug!(line, error = %err, "host link request not executed");
            encode_response(opcode, err.end_code(), "")
        }
    }
}

async fn handle_connection<S: HostLinkService>(
    mut socket: TcpStream,
    service: Arc<S>,
    max_request_len: usize,
) -> Result<(), DataLinkError> {
    let (read_half, mut write_half) = socket.split();
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::with_capacity(max_request_len);

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(max_request_len as u64)
            .read_until(CR, &mut buf)
            .await?;
        if read == 0 {
            return Ok(());
        }
        if buf.len() >= max_request_len && buf.last() != Some(&CR) {
            return Err(DataLinkError::InvalidResponse("request line too long"));
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }

        debug!(line, "received host link request");
        let mut response = respond(service.as_ref(), line);
        response.push(char::from(CR));
        write_half.write_all(response.as_bytes()).await?;
    }
}

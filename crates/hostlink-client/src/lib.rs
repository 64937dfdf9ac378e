//! High-level Host Link client crate.

#![forbid(unsafe_code)]

pub mod backoff;
pub mod poll;
pub mod relay;
pub mod sync;
pub mod table;

#[cfg(test)]
mod mock;

pub use backoff::{Backoff, RetryError};
pub use poll::{PollError, PollOutcome, PollPlan, PollTarget, ReadGroup};
pub use relay::{RelayResponse, RelayedFrame, split_frames};
pub use sync::{SyncClientError, SyncHostLinkClient};
pub use table::{AddressTable, RejectedRow, RowError, SwitchRow, TableError, TableLayout, TableRow};

use hostlink_core::frame::verify_fcs;
use hostlink_core::{
    Address, AddressError, DecodeError, EncodeError, ReadRequest, Value, decode_response,
};
use hostlink_datalink::{DataLink, DataLinkError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub response_timeout: Duration,
    /// Budget for a whole poll cycle; targets not reached in time are reported
    /// as [`PollError::CycleDeadlineExceeded`].
    pub cycle_timeout: Option<Duration>,
    /// Minimum gap between two commands, for bridges that need the serial line
    /// to settle.
    pub throttle_delay: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(5),
            cycle_timeout: None,
            throttle_delay: None,
        }
    }
}

impl ClientConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_cycle_timeout(mut self, cycle_timeout: Option<Duration>) -> Self {
        self.cycle_timeout = cycle_timeout;
        self
    }

    pub fn with_throttle_delay(mut self, throttle_delay: Option<Duration>) -> Self {
        self.throttle_delay = throttle_delay;
        self
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("address error: {0}")]
    Address(#[from] AddressError),
    #[error("request timed out")]
    Timeout,
    #[error("invalid frame: {0:?}")]
    InvalidFrame(String),
}

pub struct HostLinkClient<D: DataLink> {
    datalink: D,
    config: ClientConfig,
    last_request_at: Mutex<Option<Instant>>,
    request_counter: AtomicU64,
}

impl<D: DataLink> HostLinkClient<D> {
    pub fn new(datalink: D) -> Self {
        Self::with_config(datalink, ClientConfig::default())
    }

    pub fn with_config(datalink: D, config: ClientConfig) -> Self {
        Self {
            datalink,
            config,
            last_request_at: Mutex::new(None),
            request_counter: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> ClientConfig {
        self.config
    }

    pub fn datalink(&self) -> &D {
        &self.datalink
    }

    fn next_correlation_id(&self) -> u64 {
        self.request_counter.fetch_add(1, Ordering::Relaxed)
    }

    async fn apply_throttle(&self) {
        let Some(delay) = self.config.throttle_delay else {
            return;
        };

        let mut last = self.last_request_at.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < delay {
                sleep(delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Send one framed command and return the raw response line.
    ///
    /// No retries: a failed round trip is reported to the caller as is.
    pub async fn send_frame(&self, frame: &str) -> Result<String, ClientError> {
        self.apply_throttle().await;

        let correlation_id = self.next_correlation_id();
        debug!(correlation_id, frame, "dispatching host link command");

        match timeout(self.config.response_timeout, self.datalink.round_trip(frame)).await {
            Ok(Ok(response)) => {
                debug!(
                    correlation_id,
                    response = response.trim_end(),
                    "host link command answered"
                );
                Ok(response)
            }
            Ok(Err(err)) => Err(ClientError::DataLink(err)),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Read one address and decode its value.
    pub async fn read(&self, address: &Address) -> Result<Value, ClientError> {
        let request = ReadRequest::for_address(address)?;
        let response = self.send_frame(&request.frame()).await?;
        warn_on_bad_fcs(&response);
        Ok(decode_response(&response, &request.command(), address.bit)?)
    }
}

/// Responses are decoded even when their FCS is wrong; the mismatch is only
/// logged.
pub(crate) fn warn_on_bad_fcs(response: &str) {
    if !response.trim_end().is_empty() && !verify_fcs(response) {
        warn!(
            response = response.trim_end(),
            "response fcs does not verify"
        );
    }
}

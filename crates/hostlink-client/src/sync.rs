use crate::{ClientConfig, ClientError, HostLinkClient, PollOutcome, PollTarget, RelayedFrame};
use hostlink_core::{Address, Value};
use hostlink_datalink::{HostLinkTcpTransport, TransportConfig};
use thiserror::Error;
use tokio::runtime::Runtime;

#[derive(Debug, Error)]
pub enum SyncClientError {
    #[error("runtime init error: {0}")]
    RuntimeInit(std::io::Error),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
}

/// Blocking facade over [`HostLinkClient`] for callers without a runtime.
pub struct SyncHostLinkClient {
    runtime: Runtime,
    client: HostLinkClient<HostLinkTcpTransport>,
}

impl SyncHostLinkClient {
    pub fn new(addr: &str) -> Result<Self, SyncClientError> {
        Self::with_config(addr, TransportConfig::default(), ClientConfig::default())
    }

    pub fn with_config(
        addr: &str,
        transport: TransportConfig,
        config: ClientConfig,
    ) -> Result<Self, SyncClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(SyncClientError::RuntimeInit)?;
        let link = HostLinkTcpTransport::with_config(addr, transport);
        let client = HostLinkClient::with_config(link, config);
        Ok(Self { runtime, client })
    }

    pub fn config(&self) -> ClientConfig {
        self.client.config()
    }

    pub fn read(&self, address: &Address) -> Result<Value, SyncClientError> {
        self.runtime
            .block_on(self.client.read(address))
            .map_err(SyncClientError::Client)
    }

    pub fn force_bit(
        &self,
        address: &Address,
        turn_on: bool,
    ) -> Result<Vec<RelayedFrame>, SyncClientError> {
        self.runtime
            .block_on(self.client.force_bit(address, turn_on))
            .map_err(SyncClientError::Client)
    }

    pub fn relay(&self, payload: &str) -> Result<Vec<RelayedFrame>, SyncClientError> {
        self.runtime
            .block_on(self.client.relay(payload))
            .map_err(SyncClientError::Client)
    }

    pub fn poll_cycle(&self, targets: &[PollTarget]) -> Vec<PollOutcome> {
        self.runtime.block_on(self.client.poll_cycle(targets))
    }
}

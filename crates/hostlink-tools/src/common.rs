use clap::{Args, ValueEnum};
use hostlink_client::{Backoff, ClientConfig, HostLinkClient, TableLayout};
use hostlink_core::Address;
use hostlink_datalink::{HostLinkTcpTransport, TransportConfig};
use rumqttc::MqttOptions;
use std::time::Duration;

/// Where the serial-to-Ethernet bridge in front of the PLC listens.
#[derive(Debug, Clone, Args)]
pub struct BridgeArgs {
    #[arg(long, env = "HOSTLINK_HOST", default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, env = "HOSTLINK_PORT", default_value_t = 4001)]
    pub port: u16,
    /// Response timeout per command, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub timeout: u64,
    /// Budget for a whole poll cycle, in milliseconds.
    #[arg(long)]
    pub cycle_timeout: Option<u64>,
    /// Minimum gap between two commands, in milliseconds.
    #[arg(long)]
    pub throttle: Option<u64>,
}

impl BridgeArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_response_timeout(Duration::from_millis(self.timeout))
            .with_cycle_timeout(self.cycle_timeout.map(Duration::from_millis))
            .with_throttle_delay(self.throttle.map(Duration::from_millis))
    }
}

#[derive(Debug, Clone, Args)]
pub struct MqttArgs {
    #[arg(long, env = "MQTT_HOST", default_value = "127.0.0.1")]
    pub mqtt_host: String,
    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,
    #[arg(long, env = "MQTT_USER")]
    pub mqtt_user: Option<String>,
    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,
    #[arg(long, env = "MQTT_CLIENT_ID")]
    pub client_id: Option<String>,
    /// Broker connection attempts before giving up.
    #[arg(long, default_value_t = 10)]
    pub connect_attempts: u32,
}

impl MqttArgs {
    pub fn options(&self, default_client_id: &str) -> MqttOptions {
        let client_id = self.client_id.as_deref().unwrap_or(default_client_id);
        let mut options = MqttOptions::new(client_id, &self.mqtt_host, self.mqtt_port);
        options.set_keep_alive(Duration::from_secs(60));
        if let Some(user) = &self.mqtt_user {
            options.set_credentials(user, self.mqtt_password.as_deref().unwrap_or_default());
        }
        options
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::default().with_max_attempts(self.connect_attempts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    Simple,
    Switch,
}

impl From<LayoutArg> for TableLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Simple => Self::Simple,
            LayoutArg::Switch => Self::Switch,
        }
    }
}

pub fn build_transport(args: &BridgeArgs) -> HostLinkTcpTransport {
    let config = TransportConfig::default()
        .with_response_timeout(Duration::from_millis(args.timeout));
    HostLinkTcpTransport::with_config(args.addr(), config)
}

pub fn build_client(args: &BridgeArgs) -> HostLinkClient<HostLinkTcpTransport> {
    HostLinkClient::with_config(build_transport(args), args.client_config())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

pub fn parse_bool(input: &str) -> Result<bool, String> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(format!("invalid bool value: {input}")),
    }
}

pub fn parse_address(input: &str) -> Result<Address, String> {
    Address::parse(input).map_err(|err| format!("invalid address {input:?}: {err}"))
}

/// A simulator preset such as `DM140=0123` (hex word) or `HR5.06=1` (bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub address: Address,
    pub value: u16,
}

pub fn parse_preset(input: &str) -> Result<Preset, String> {
    let (address, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected ADDRESS=VALUE, got {input:?}"))?;
    let address = parse_address(address)?;
    let value = if address.is_bit() {
        u16::from(parse_bool(value)?)
    } else {
        u16::from_str_radix(value.trim(), 16)
            .map_err(|err| format!("invalid hex word {value:?}: {err}"))?
    };
    Ok(Preset { address, value })
}

//! MQTT side of the bridge: broker connection, discovery publishing and the
//! command listener.

use crate::discovery::{self, COMMAND_SUBSCRIPTION, DiscoveryConfig};
use hostlink_client::{AddressTable, Backoff, ClientError, HostLinkClient, RelayedFrame, RetryError};
use hostlink_datalink::DataLink;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, QoS,
};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const REQUEST_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum MqttError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("broker refused connection: {0:?}")]
    Refused(ConnectReturnCode),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

async fn connect_once(options: MqttOptions) -> Result<(AsyncClient, EventLoop), MqttError> {
    let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
    loop {
        match eventloop.poll().await? {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                return Ok((client, eventloop));
            }
            Event::Incoming(Packet::ConnAck(ack)) => return Err(MqttError::Refused(ack.code)),
            _ => {}
        }
    }
}

/// Connect to the broker, retrying with `backoff` until it answers.
pub async fn connect(
    options: &MqttOptions,
    backoff: &Backoff,
) -> Result<(AsyncClient, EventLoop), RetryError<MqttError>> {
    let (host, port) = options.broker_address();
    let connected = backoff
        .retry(|attempt| {
            debug!(attempt, %host, port, "connecting to mqtt broker");
            connect_once(options.clone())
        })
        .await?;
    info!(%host, port, "connected to mqtt broker");
    Ok(connected)
}

/// Announce one switch and, when its state is known, publish it. Both retained.
pub async fn publish_switch(
    client: &AsyncClient,
    config: &DiscoveryConfig,
    state: Option<bool>,
) -> Result<(), MqttError> {
    client
        .publish(config.config_topic(), QoS::AtMostOnce, true, config.to_json()?)
        .await?;
    if let Some(on) = state {
        client
            .publish(
                config.state_topic.clone(),
                QoS::AtMostOnce,
                true,
                discovery::state_payload(on),
            )
            .await?;
    }
    Ok(())
}

/// Poll every switch of `table` once and publish discovery config and state.
/// Returns the number of switches published.
pub async fn publish_table<D: DataLink>(
    plc: &HostLinkClient<D>,
    client: &AsyncClient,
    table: &AddressTable,
) -> Result<usize, MqttError> {
    let switches: Vec<_> = table.switches().collect();
    let targets: Vec<_> = switches.iter().map(|row| row.target()).collect();
    let outcomes = plc.poll_cycle(&targets).await;

    for (row, outcome) in switches.iter().zip(&outcomes) {
        if let Err(err) = &outcome.result {
            warn!(
                switch = %row.output_description,
                address = %row.output_address,
                error = %err,
                "poll failed"
            );
        }
        let config = DiscoveryConfig::from_switch(row, outcome);
        publish_switch(client, &config, discovery::switch_state(outcome)).await?;
    }
    debug!(switches = switches.len(), "published discovery");
    Ok(switches.len())
}

/// Publish the table once and disconnect.
///
/// The event loop is polled while publishing so the request channel keeps
/// draining; it returns once the outgoing disconnect has been written.
pub async fn publish_once<D: DataLink>(
    plc: &HostLinkClient<D>,
    client: &AsyncClient,
    eventloop: &mut EventLoop,
    table: &AddressTable,
) -> Result<usize, MqttError> {
    let publish = async {
        let published = publish_table(plc, client, table).await?;
        client.disconnect().await?;
        Ok::<_, MqttError>(published)
    };
    let drive = async {
        loop {
            if let Event::Outgoing(Outgoing::Disconnect) = eventloop.poll().await? {
                return Ok::<_, MqttError>(());
            }
        }
    };
    let (published, ()) = tokio::try_join!(publish, drive)?;
    Ok(published)
}

/// Relay a command topic payload to the PLC.
pub async fn relay_command<D: DataLink>(
    plc: &HostLinkClient<D>,
    topic: &str,
    payload: &[u8],
) -> Result<Vec<RelayedFrame>, ClientError> {
    let payload = std::str::from_utf8(payload)
        .map_err(|_| ClientError::InvalidFrame(String::from_utf8_lossy(payload).into_owned()))?;
    let name = discovery::name_from_command_topic(topic).unwrap_or(topic);
    info!(switch = name, payload, "relaying switch command");
    plc.relay(payload).await
}

/// Subscribe to every switch command topic and relay incoming payloads until the
/// broker connection fails for good.
pub async fn run_listener<D: DataLink>(
    plc: &HostLinkClient<D>,
    client: &AsyncClient,
    eventloop: &mut EventLoop,
    backoff: &Backoff,
) -> Result<(), MqttError> {
    client.subscribe(COMMAND_SUBSCRIPTION, QoS::AtMostOnce).await?;

    let mut failures = 0;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                failures = 0;
                client.subscribe(COMMAND_SUBSCRIPTION, QoS::AtMostOnce).await?;
                info!("reconnected to mqtt broker, resubscribed");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                failures = 0;
                match relay_command(plc, &publish.topic, &publish.payload).await {
                    Ok(relayed) => {
                        let accepted = relayed.iter().filter(|frame| frame.is_accepted()).count();
                        debug!(
                            topic = %publish.topic,
                            frames = relayed.len(),
                            accepted,
                            "command relayed"
                        );
                    }
                    Err(err) => warn!(topic = %publish.topic, error = %err, "command rejected"),
                }
            }
            Ok(_) => {}
            Err(err) => {
                failures += 1;
                if failures >= backoff.max_attempts.max(1) {
                    return Err(err.into());
                }
                let delay = backoff.delay_for(failures);
                warn!(attempt = failures, ?delay, error = %err, "mqtt connection lost, retrying");
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::relay_command;
    use hostlink_client::{ClientError, HostLinkClient};
    use hostlink_core::Area;
    use hostlink_datalink::{HostLinkTcpServer, HostLinkTcpTransport, InMemoryPlc};
    use std::sync::Arc;

    #[tokio::test]
    async fn relays_command_payload_to_plc() {
        let plc = Arc::new(InMemoryPlc::new(64));
        let server = HostLinkTcpServer::bind("127.0.0.1:0", Arc::clone(&plc))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let server_task = tokio::spawn(server.run());

        let client = HostLinkClient::new(HostLinkTcpTransport::new(addr.to_string()));
        let relayed = relay_command(
            &client,
            "homeassistant/switch/c_zolder_klein3/set",
            b"@00SC0252*;@00KSHR  00061441*;@00SC0353*",
        )
        .await
        .unwrap();

        assert_eq!(relayed.len(), 3);
        assert!(relayed.iter().all(|frame| frame.is_accepted()));
        assert_eq!(plc.bit(Area::Hr, 6, 14), Some(true));

        server_task.abort();
        let _ = server_task.await;
    }

    #[tokio::test]
    async fn non_utf8_payload_is_rejected_before_sending() {
        let client = HostLinkClient::new(HostLinkTcpTransport::new("127.0.0.1:1"));
        let err = relay_command(&client, "homeassistant/switch/x/set", &[0x40, 0xff, 0x2a])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidFrame(_)));
    }
}

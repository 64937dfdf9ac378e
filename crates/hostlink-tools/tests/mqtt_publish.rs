use hostlink_client::{AddressTable, Backoff, HostLinkClient, TableLayout};
use hostlink_core::Area;
use hostlink_datalink::{HostLinkTcpServer, HostLinkTcpTransport, InMemoryPlc};
use hostlink_tools::mqtt;
use rumqttc::MqttOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const PUBLISH: u8 = 3;
const CONNECT: u8 = 1;
const DISCONNECT: u8 = 14;
const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<u8> {
    let header = reader.read_u8().await?;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8().await?;
        len |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(header >> 4)
}

/// Minimal broker: acknowledges the connect and counts publishes until the
/// client disconnects.
async fn spawn_broker() -> (u16, oneshot::Receiver<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (count_tx, count_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut publishes = 0;
        while let Ok(kind) = read_packet(&mut socket).await {
            match kind {
                CONNECT => socket.write_all(&CONNACK).await.unwrap(),
                PUBLISH => publishes += 1,
                DISCONNECT => break,
                _ => {}
            }
        }
        let _ = count_tx.send(publishes);
    });
    (port, count_rx)
}

#[tokio::test]
async fn one_shot_publish_handles_more_switches_than_the_request_channel() {
    const SWITCHES: u16 = 40;

    let plc = Arc::new(InMemoryPlc::new(256));
    plc.set_word(Area::Ir, 5, 0x0002).unwrap();
    let server = HostLinkTcpServer::bind("127.0.0.1:0", Arc::clone(&plc))
        .await
        .unwrap();
    let plc_addr = server.local_addr().unwrap();
    let server_task = tokio::spawn(server.run());

    let rows: String = (0..SWITCHES)
        .map(|i| format!("Kamer{i};Lamp{i}_Togglebit;HR{i}.00;Lamp{i};{i}.01\n"))
        .collect();
    let table = AddressTable::from_reader(rows.as_bytes(), TableLayout::Switch).unwrap();
    assert_eq!(table.switches().count(), usize::from(SWITCHES));

    let (broker_port, publishes) = spawn_broker().await;
    let options = MqttOptions::new("plc2mqtt-test", "127.0.0.1", broker_port);
    let backoff = Backoff::default().with_max_attempts(1);
    let (client, mut eventloop) = mqtt::connect(&options, &backoff).await.unwrap();

    let plc_client = HostLinkClient::new(HostLinkTcpTransport::new(plc_addr.to_string()));
    let published = tokio::time::timeout(
        Duration::from_secs(10),
        mqtt::publish_once(&plc_client, &client, &mut eventloop, &table),
    )
    .await
    .expect("publishing should not stall")
    .unwrap();
    assert_eq!(published, usize::from(SWITCHES));
    assert_eq!(plc.requests_handled(), usize::from(SWITCHES));

    drop(client);
    drop(eventloop);
    let publishes = tokio::time::timeout(Duration::from_secs(5), publishes)
        .await
        .expect("broker should see the disconnect")
        .unwrap();
    // config and state for every switch, all outputs read as bits
    assert_eq!(publishes, 2 * usize::from(SWITCHES));

    server_task.abort();
    let _ = server_task.await;
}

use hostlink_client::{HostLinkClient, PollTarget};
use hostlink_core::{Address, Area, Value};
use hostlink_datalink::{HostLinkTcpServer, HostLinkTcpTransport, InMemoryPlc};
use std::sync::Arc;

fn target(description: &str, token: &str) -> PollTarget {
    PollTarget::new(description, Address::parse(token).unwrap())
}

#[tokio::test]
async fn poll_cycle_reads_each_word_once() {
    let plc = Arc::new(InMemoryPlc::new(256));
    plc.set_word(Area::Ir, 191, 0x8008).unwrap();
    plc.set_word(Area::Hr, 5, 0x0040).unwrap();
    plc.set_word(Area::Dm, 140, 0x0123).unwrap();

    let server = HostLinkTcpServer::bind("127.0.0.1:0", Arc::clone(&plc))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let server_task = tokio::spawn(server.run());

    let client = HostLinkClient::new(HostLinkTcpTransport::new(addr.to_string()));
    let targets = vec![
        target("wand", "191.15"),
        target("togglebit", "HR5.06"),
        target("teller", "DM140"),
        target("plafond", "191.03"),
        target("nachtlamp", "191.00"),
    ];

    let outcomes = client.poll_cycle(&targets).await;
    assert_eq!(plc.requests_handled(), 3);

    let values: Vec<_> = outcomes.iter().map(|o| o.value().cloned()).collect();
    assert_eq!(
        values,
        vec![
            Some(Value::Bit(true)),
            Some(Value::Bit(true)),
            Some(Value::Word("0123".to_string())),
            Some(Value::Bit(true)),
            Some(Value::Bit(false)),
        ]
    );

    server_task.abort();
    let _ = server_task.await;
}

#[tokio::test]
async fn force_bit_toggles_hr_bit_and_restores_run_mode() {
    let plc = Arc::new(InMemoryPlc::new(256));
    let server = HostLinkTcpServer::bind("127.0.0.1:0", Arc::clone(&plc))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let server_task = tokio::spawn(server.run());

    let client = HostLinkClient::new(HostLinkTcpTransport::new(addr.to_string()));
    let togglebit = Address::parse("HR190.03").unwrap();

    let relayed = client.force_bit(&togglebit, true).await.unwrap();
    assert_eq!(relayed.len(), 3);
    assert!(relayed.iter().all(|frame| frame.is_accepted()));
    assert_eq!(plc.bit(Area::Hr, 190, 3), Some(true));
    assert_eq!(client.read(&togglebit).await.unwrap(), Value::Bit(true));

    client.force_bit(&togglebit, false).await.unwrap();
    assert_eq!(plc.bit(Area::Hr, 190, 3), Some(false));
    assert_eq!(plc.mode(), hostlink_core::PlcMode::Run);

    server_task.abort();
    let _ = server_task.await;
}

#[tokio::test]
async fn relayed_force_without_monitor_mode_is_rejected() {
    let plc = Arc::new(InMemoryPlc::new(256));
    let server = HostLinkTcpServer::bind("127.0.0.1:0", Arc::clone(&plc))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let server_task = tokio::spawn(server.run());

    let client = HostLinkClient::new(HostLinkTcpTransport::new(addr.to_string()));
    let relayed = client.relay("@00KSHR  01900349*").await.unwrap();
    assert_eq!(relayed.len(), 1);
    assert!(!relayed[0].is_accepted());
    assert_eq!(plc.bit(Area::Hr, 190, 3), Some(false));

    server_task.abort();
    let _ = server_task.await;
}

use hostlink_core::frame::with_fcs;
use hostlink_core::{Area, build_read_command, decode_response};
use hostlink_datalink::{DataLink, HostLinkTcpServer, HostLinkTcpTransport, InMemoryPlc};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let plc = std::sync::Arc::new(InMemoryPlc::new(1024));
    plc.set_word(Area::Dm, 140, 0x0123)?;

    let server = HostLinkTcpServer::bind("127.0.0.1:0", std::sync::Arc::clone(&plc)).await?;
    let addr = server.local_addr()?;
    let server_task = tokio::spawn(server.run());

    let transport = HostLinkTcpTransport::new(addr.to_string());
    let command = build_read_command(Area::Dm, 140)?;
    let response = transport.round_trip(&with_fcs(&command)).await?;
    let value = decode_response(&response, &command, None)?;

    println!("response line: {:?}", response);
    println!("DM140 = {value}");

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

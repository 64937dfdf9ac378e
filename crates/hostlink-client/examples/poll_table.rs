use hostlink_client::{AddressTable, HostLinkClient, TableLayout};
use hostlink_datalink::HostLinkTcpTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let table = AddressTable::from_path("lampen.csv", TableLayout::Simple)?;
    let client = HostLinkClient::new(HostLinkTcpTransport::new("127.0.0.1:9600"));

    for outcome in client.poll_cycle(&table.targets()).await {
        match outcome.result {
            Ok(value) => println!("{} ({}): {value}", outcome.description, outcome.address),
            Err(err) => println!("{} ({}): {err}", outcome.description, outcome.address),
        }
    }
    Ok(())
}

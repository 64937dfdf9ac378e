use clap::Parser;
use hostlink_client::AddressTable;
use hostlink_tools::common::{BridgeArgs, LayoutArg, build_client, init_tracing};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "plcpoll", about = "Poll every address of a ;-delimited table")]
struct Args {
    #[command(flatten)]
    bridge: BridgeArgs,
    #[arg(long, env = "HOSTLINK_TABLE")]
    table: PathBuf,
    #[arg(long, value_enum, default_value_t = LayoutArg::Simple)]
    layout: LayoutArg,
    /// Repeat the cycle every N seconds instead of polling once.
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let table = AddressTable::from_path(&args.table, args.layout.into())?;
    for rejected in table.rejected() {
        eprintln!("line {}: {}", rejected.line, rejected.error);
    }

    let client = build_client(&args.bridge);
    let targets = table.targets();
    info!(targets = targets.len(), "polling address table");

    loop {
        for outcome in client.poll_cycle(&targets).await {
            match outcome.result {
                Ok(value) => println!("{};{};{value}", outcome.description, outcome.address),
                Err(err) => println!("{};{};error: {err}", outcome.description, outcome.address),
            }
        }
        let Some(interval) = args.interval else {
            return Ok(());
        };
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }
}

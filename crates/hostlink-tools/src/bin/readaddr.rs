use clap::Parser;
use hostlink_core::Address;
use hostlink_tools::common::{BridgeArgs, build_client, init_tracing, parse_address};

#[derive(Debug, Parser)]
#[command(name = "readaddr", about = "Read PLC addresses such as 191.15, HR5.06 or DM140")]
struct Args {
    #[command(flatten)]
    bridge: BridgeArgs,
    #[arg(required = true, value_parser = parse_address)]
    addresses: Vec<Address>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let client = build_client(&args.bridge);

    for address in &args.addresses {
        let value = client.read(address).await?;
        println!("{address} = {value}");
    }
    Ok(())
}

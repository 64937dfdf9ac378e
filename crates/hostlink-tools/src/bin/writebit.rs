use clap::Parser;
use hostlink_core::Address;
use hostlink_tools::common::{BridgeArgs, build_client, init_tracing, parse_address, parse_bool};

#[derive(Debug, Parser)]
#[command(name = "writebit", about = "Force an HR bit on or off (SC02, KS/KR, SC03)")]
struct Args {
    #[command(flatten)]
    bridge: BridgeArgs,
    #[arg(long, value_parser = parse_address)]
    address: Address,
    #[arg(long, value_parser = parse_bool)]
    value: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let client = build_client(&args.bridge);

    let relayed = client.force_bit(&args.address, args.value).await?;
    for frame in &relayed {
        match &frame.result {
            Ok(response) => println!("{} -> {}", frame.frame, response.raw.trim_end()),
            Err(err) => println!("{} -> error: {err}", frame.frame),
        }
    }
    if relayed.iter().all(|frame| frame.is_accepted()) {
        println!("forced {} => {}", args.address, args.value);
        Ok(())
    } else {
        Err(format!("plc did not accept every frame for {}", args.address).into())
    }
}

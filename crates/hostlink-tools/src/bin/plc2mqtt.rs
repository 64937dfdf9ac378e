use clap::Parser;
use hostlink_client::{AddressTable, TableLayout};
use hostlink_tools::common::{BridgeArgs, MqttArgs, build_client, init_tracing};
use hostlink_tools::mqtt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "plc2mqtt",
    about = "Poll the switch table and publish Home Assistant discovery and state"
)]
struct Args {
    #[command(flatten)]
    bridge: BridgeArgs,
    #[command(flatten)]
    mqtt: MqttArgs,
    /// Switch layout table: location;input;input_address;output;output_address
    #[arg(long, env = "HOSTLINK_TABLE")]
    table: PathBuf,
    /// Repeat every N seconds instead of publishing once.
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let table = AddressTable::from_path(&args.table, TableLayout::Switch)?;
    let plc = build_client(&args.bridge);

    let (client, mut eventloop) =
        mqtt::connect(&args.mqtt.options("plc2mqtt"), &args.mqtt.backoff()).await?;

    let Some(interval) = args.interval else {
        let published = mqtt::publish_once(&plc, &client, &mut eventloop, &table).await?;
        info!(published, "done");
        return Ok(());
    };

    let driver = tokio::spawn(async move {
        loop {
            if let Err(err) = eventloop.poll().await {
                warn!(error = %err, "mqtt event loop error");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });
    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    let result = loop {
        ticker.tick().await;
        if let Err(err) = mqtt::publish_table(&plc, &client, &table).await {
            break err;
        }
    };
    driver.abort();
    Err(result.into())
}

use clap::Parser;
use hostlink_tools::common::{BridgeArgs, MqttArgs, build_client, init_tracing};
use hostlink_tools::discovery::COMMAND_SUBSCRIPTION;
use hostlink_tools::mqtt;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "mqtt2plc", about = "Relay switch commands from MQTT to the PLC")]
struct Args {
    #[command(flatten)]
    bridge: BridgeArgs,
    #[command(flatten)]
    mqtt: MqttArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let plc = build_client(&args.bridge);
    let backoff = args.mqtt.backoff();

    let (client, mut eventloop) = mqtt::connect(&args.mqtt.options("mqtt2plc"), &backoff).await?;
    info!(topic = COMMAND_SUBSCRIPTION, "listening for switch commands");
    mqtt::run_listener(&plc, &client, &mut eventloop, &backoff).await?;
    Ok(())
}

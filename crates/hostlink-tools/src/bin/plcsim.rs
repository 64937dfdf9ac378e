use clap::Parser;
use hostlink_core::PlcMode;
use hostlink_datalink::{HostLinkTcpServer, InMemoryPlc};
use hostlink_tools::common::{Preset, init_tracing, parse_preset};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "plcsim", about = "Serve an in-memory PLC over Host Link TCP")]
struct Args {
    #[arg(long, env = "HOSTLINK_SIM_BIND", default_value = "127.0.0.1:4001")]
    bind: String,
    #[arg(long, default_value_t = 10_000)]
    words: usize,
    /// Initial contents, e.g. `DM140=0123` or `191.15=on`. Repeatable.
    #[arg(long = "set", value_parser = parse_preset)]
    presets: Vec<Preset>,
    /// Start in MONITOR mode so forces are accepted without SC02.
    #[arg(long)]
    monitor: bool,
    /// Connections sending a longer line are dropped.
    #[arg(long, default_value_t = 128)]
    max_request_len: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let plc = Arc::new(InMemoryPlc::new(args.words));
    for preset in &args.presets {
        let address = preset.address;
        match address.bit {
            Some(bit) => plc.set_bit(address.area, address.word, bit, preset.value != 0)?,
            None => plc.set_word(address.area, address.word, preset.value)?,
        }
    }
    if args.monitor {
        plc.set_mode(PlcMode::Monitor);
    }

    let server = HostLinkTcpServer::bind(&args.bind, plc)
        .await?
        .with_max_request_len(args.max_request_len);
    info!(addr = %server.local_addr()?, "plc simulator listening");
    server.run().await?;
    Ok(())
}

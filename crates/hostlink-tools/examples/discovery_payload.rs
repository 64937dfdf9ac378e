use hostlink_client::{AddressTable, PollOutcome, TableLayout};
use hostlink_core::Value;
use hostlink_tools::discovery::{self, DiscoveryConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data = "Portaal;A_Portaal_Togglebit2;HR5.06;A_Portaal;171.12\n";
    let table = AddressTable::from_reader(data.as_bytes(), TableLayout::Switch)?;

    for row in table.switches() {
        let outcome = PollOutcome {
            description: row.output_description.clone(),
            address: row.output_address,
            result: Ok(Value::Bit(true)),
        };
        let config = DiscoveryConfig::from_switch(row, &outcome);
        println!("{} {}", config.config_topic(), config.to_json()?);
        if let Some(on) = discovery::switch_state(&outcome) {
            println!("{} {}", config.state_topic, discovery::state_payload(on));
        }
    }
    Ok(())
}

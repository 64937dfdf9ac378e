//! Home Assistant MQTT discovery for PLC switches.
//!
//! Every switch row of the address table is announced as a `switch` entity under
//! `homeassistant/switch/<name>/`. The command payloads are the `;`-joined Host
//! Link frame sequences that force the row's input bit, so the listener only has
//! to relay what it receives.

use hostlink_client::{PollError, PollOutcome, SwitchRow};
use hostlink_core::{Value, WriteSequence};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const TOPIC_PREFIX: &str = "homeassistant/switch";
pub const COMMAND_SUBSCRIPTION: &str = "homeassistant/switch/+/set";
pub const STATE_ON: &str = "ON";
pub const STATE_OFF: &str = "OFF";

pub fn config_topic(name: &str) -> String {
    format!("{TOPIC_PREFIX}/{name}/config")
}

pub fn state_topic(name: &str) -> String {
    format!("{TOPIC_PREFIX}/{name}/state")
}

pub fn command_topic(name: &str) -> String {
    format!("{TOPIC_PREFIX}/{name}/set")
}

/// Entity name embedded in a command topic.
pub fn name_from_command_topic(topic: &str) -> Option<&str> {
    topic
        .strip_prefix(TOPIC_PREFIX)?
        .strip_prefix('/')?
        .strip_suffix("/set")
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

/// `{"state":"ON"}` or `{"state":"OFF"}`.
pub fn state_payload(on: bool) -> String {
    let state = if on { STATE_ON } else { STATE_OFF };
    serde_json::json!({ "state": state }).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub identifiers: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub name: String,
    pub payload_on: String,
    pub payload_off: String,
    pub state_topic: String,
    pub command_topic: String,
    pub state_on: String,
    pub state_off: String,
    pub icon: String,
    pub value_template: String,
    pub unique_id: String,
    pub device: Device,
}

/// Text reported for a poll outcome: the decoded value, the salvaged payload of
/// a mismatched response, or nothing.
pub fn reported_value(outcome: &PollOutcome) -> String {
    match &outcome.result {
        Ok(value) => value.to_string(),
        Err(PollError::Decode(err)) => err.best_effort_payload().unwrap_or_default().to_string(),
        Err(_) => String::new(),
    }
}

/// The switch state, known only when the output was read as a bit.
pub fn switch_state(outcome: &PollOutcome) -> Option<bool> {
    outcome.value().and_then(Value::as_bit)
}

fn toggle_payloads(row: &SwitchRow) -> (String, String) {
    let input = &row.input_address;
    match (
        WriteSequence::for_address(input, true),
        WriteSequence::for_address(input, false),
    ) {
        (Ok(on), Ok(off)) => (on.to_string(), off.to_string()),
        (Err(err), _) | (_, Err(err)) => {
            warn!(
                switch = %row.output_description,
                input = %input,
                error = %err,
                "switch will have no command payloads"
            );
            (String::new(), String::new())
        }
    }
}

impl DiscoveryConfig {
    pub fn from_switch(row: &SwitchRow, outcome: &PollOutcome) -> Self {
        let name = row.output_description.clone();
        let (payload_on, payload_off) = toggle_payloads(row);
        Self {
            payload_on,
            payload_off,
            state_topic: state_topic(&name),
            command_topic: command_topic(&name),
            state_on: STATE_ON.to_string(),
            state_off: STATE_OFF.to_string(),
            icon: "mdi:lightbulb".to_string(),
            value_template: "{{ value_json.state }}".to_string(),
            unique_id: name.clone(),
            device: Device {
                name: name.clone(),
                identifiers: format!("{}:{}", row.input_address, reported_value(outcome)),
            },
            name,
        }
    }

    pub fn config_topic(&self) -> String {
        config_topic(&self.name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

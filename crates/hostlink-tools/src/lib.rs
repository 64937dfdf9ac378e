//! Command line tools and the MQTT bridge for Host Link PLCs.

pub mod common;
pub mod discovery;
pub mod mqtt;

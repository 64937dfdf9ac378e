//! Omron Host Link (C-mode) addressing and framing in pure Rust.
//!
//! `hostlink-core` turns address tokens such as `HR5.06` into read and write
//! command frames and decodes the PLC's response lines. It performs no I/O.

#![forbid(unsafe_code)]

pub mod address;
pub mod command;
pub mod error;
pub mod frame;

pub use address::{Address, Area};
pub use command::{
    EndCode, Opcode, PlcMode, ReadRequest, Request, Value, WriteSequence, build_read_command,
    build_write_sequence, decode_response, encode_response,
};
pub use error::{AddressError, DecodeError, EncodeError};

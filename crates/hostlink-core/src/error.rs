use crate::address::Area;
use crate::command::EndCode;
use std::fmt;

/// Errors produced while parsing an address token such as `HR5.06` or `DM140`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressError {
    MissingWord,
    InvalidWord,
    WordOutOfRange,
    MissingBit,
    InvalidBit,
    BitOutOfRange,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingWord => f.write_str("address has no word number"),
            Self::InvalidWord => f.write_str("word number is not a decimal integer"),
            Self::WordOutOfRange => f.write_str("word number exceeds 9999"),
            Self::MissingBit => f.write_str("address has a '.' but no bit number"),
            Self::InvalidBit => f.write_str("bit number is not a decimal integer"),
            Self::BitOutOfRange => f.write_str("bit number exceeds 15"),
        }
    }
}

impl std::error::Error for AddressError {}

/// Errors that can occur while building command frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodeError {
    /// Forced set/reset is only wired up for the HR area.
    UnsupportedWriteArea(Area),
    MissingBit,
    BitOutOfRange,
    WordOutOfRange,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedWriteArea(area) => write!(f, "unsupported write area: {area}"),
            Self::MissingBit => f.write_str("write requires a bit address"),
            Self::BitOutOfRange => f.write_str("bit number exceeds 15"),
            Self::WordOutOfRange => f.write_str("word number exceeds 9999"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Errors that can occur while decoding Host Link frames.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecodeError {
    /// The response header or end code does not match the command.
    ///
    /// `payload` holds the raw data slice so callers can still use it.
    ProtocolFrame {
        response: String,
        payload: String,
        end_code: Option<EndCode>,
    },
    /// The requested bit lies beyond the decoded bit string.
    BitIndex { bit: u8, available: usize },
    InvalidHexDigit(char),
    InvalidFcs { expected: String, got: String },
    InvalidLength,
    InvalidValue,
    UnknownOpcode,
}

impl DecodeError {
    /// The raw payload slice recovered from a mismatched response.
    pub fn best_effort_payload(&self) -> Option<&str> {
        match self {
            Self::ProtocolFrame { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolFrame {
                response,
                end_code: Some(code),
                ..
            } => write!(f, "bad response {response:?} (end code {code})"),
            Self::ProtocolFrame { response, .. } => write!(f, "bad response {response:?}"),
            Self::BitIndex { bit, available } => {
                write!(f, "bit {bit} not present in {available}-bit payload")
            }
            Self::InvalidHexDigit(c) => write!(f, "invalid hex digit {c:?} in payload"),
            Self::InvalidFcs { expected, got } => {
                write!(f, "invalid fcs: expected {expected}, got {got}")
            }
            Self::InvalidLength => f.write_str("invalid frame length"),
            Self::InvalidValue => f.write_str("invalid value"),
            Self::UnknownOpcode => f.write_str("unknown opcode"),
        }
    }
}

impl std::error::Error for DecodeError {}

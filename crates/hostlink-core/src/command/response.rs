use crate::DecodeError;
use crate::command::{EndCode, Opcode};
use crate::frame::{
    END_CODE_LEN, HEADER_LEN, UNIT_PREFIX, bit_from_end, hex_to_bits, response_payload, with_fcs,
};
use std::fmt;

/// A decoded read result.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Payload text of a whole-word read, e.g. `"0082"`.
    Word(String),
    Bit(bool),
}

impl Value {
    pub fn as_bit(&self) -> Option<bool> {
        match self {
            Self::Bit(bit) => Some(*bit),
            Self::Word(_) => None,
        }
    }

    pub fn word_text(&self) -> Option<&str> {
        match self {
            Self::Word(text) => Some(text),
            Self::Bit(_) => None,
        }
    }

    /// Integer view used by publishers: bits are 0/1, words are read as decimal
    /// digits (BCD data words).
    pub fn to_integer(&self) -> Option<u32> {
        match self {
            Self::Bit(bit) => Some(u32::from(*bit)),
            Self::Word(text) => {
                if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                text.parse().ok()
            }
        }
    }

    /// The word as raw binary, parsing the payload text as hex.
    pub fn to_raw_word(&self) -> Option<u16> {
        match self {
            Self::Bit(bit) => Some(u16::from(*bit)),
            Self::Word(text) => {
                if text.is_empty() || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return None;
                }
                u16::from_str_radix(text, 16).ok()
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(text) => f.write_str(text),
            Self::Bit(true) => f.write_str("1"),
            Self::Bit(false) => f.write_str("0"),
        }
    }
}

/// End code of a response line, if the line is long enough to carry one.
pub fn response_end_code(response: &str) -> Option<EndCode> {
    response
        .get(HEADER_LEN..HEADER_LEN + END_CODE_LEN)
        .and_then(EndCode::parse)
}

/// Decode the response to `command` (framed or not; only its header is compared).
///
/// The response must echo the command's `@00` + opcode header and carry end code
/// `00`. Otherwise a [`DecodeError::ProtocolFrame`] is returned that still holds
/// the raw payload slice. For bit reads the payload is expanded to a bit string and
/// `bit` is counted from its right end.
pub fn decode_response(
    response: &str,
    command: &str,
    bit: Option<u8>,
) -> Result<Value, DecodeError> {
    let payload = response_payload(response);

    let header_matches = match (response.get(..HEADER_LEN), command.get(..HEADER_LEN)) {
        (Some(got), Some(sent)) => got == sent,
        _ => false,
    };
    let code = response_end_code(response);
    if !header_matches || code != Some(EndCode::Normal) {
        return Err(DecodeError::ProtocolFrame {
            response: response.to_string(),
            payload: payload.to_string(),
            end_code: code,
        });
    }

    match bit {
        None => Ok(Value::Word(payload.to_string())),
        Some(bit) => {
            let bits = hex_to_bits(payload)?;
            bit_from_end(&bits, bit).map(Value::Bit)
        }
    }
}

/// Framed response line (without the trailing CR) as a PLC would send it.
pub fn encode_response(opcode: Opcode, end_code: EndCode, payload: &str) -> String {
    with_fcs(&format!(
        "{UNIT_PREFIX}{}{end_code}{payload}",
        opcode.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::{Value, decode_response, encode_response, response_end_code};
    use crate::DecodeError;
    use crate::command::{EndCode, Opcode};

    const COMMAND: &str = "@00RR00840001";

    #[test]
    fn decodes_bit_from_reference_payload() {
        let value = decode_response("@00RR0084004C*\r", COMMAND, Some(10)).unwrap();
        assert_eq!(value, Value::Bit(true));
        assert_eq!(value.to_string(), "1");

        let value = decode_response("@00RR0084004C*\r", COMMAND, Some(9)).unwrap();
        assert_eq!(value.to_string(), "0");
    }

    #[test]
    fn decodes_word_payload_text() {
        let value = decode_response("@00RD00012356*\r", "@00RD01400001", None).unwrap();
        assert_eq!(value, Value::Word("0123".to_string()));
        assert_eq!(value.to_integer(), Some(123));
        assert_eq!(value.to_raw_word(), Some(0x0123));
    }

    #[test]
    fn header_mismatch_keeps_raw_slice() {
        let err = decode_response("@00RH0084004C*\r", COMMAND, Some(10)).unwrap_err();
        assert_eq!(err.best_effort_payload(), Some("8400"));
        assert!(matches!(
            err,
            DecodeError::ProtocolFrame {
                end_code: Some(EndCode::Normal),
                ..
            }
        ));
    }

    #[test]
    fn non_normal_end_code_is_a_frame_error() {
        let err = decode_response("@00RR1342*\r", COMMAND, None).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ProtocolFrame {
                end_code: Some(EndCode::FcsError),
                ..
            }
        ));
        assert_eq!(err.best_effort_payload(), Some(""));
    }

    #[test]
    fn short_or_empty_responses_are_frame_errors() {
        for response in ["", "@00", "\r"] {
            let err = decode_response(response, COMMAND, Some(0)).unwrap_err();
            assert_eq!(err.best_effort_payload(), Some(""));
        }
    }

    #[test]
    fn bit_beyond_payload_is_reported() {
        let err = decode_response("@00RR0000*\r", "@00RR", Some(3)).unwrap_err();
        assert!(matches!(err, DecodeError::BitIndex { bit: 3, .. }));
    }

    #[test]
    fn encode_response_frames_payload() {
        assert_eq!(
            encode_response(Opcode::ReadIr, EndCode::Normal, "8201"),
            "@00RR0082014B*"
        );
        assert_eq!(encode_response(Opcode::StatusWrite, EndCode::Normal, ""), "@00SC0050*");
        assert_eq!(response_end_code("@00KS0158*"), Some(EndCode::NotExecutableInRunMode));
    }
}

use super::TERMINATOR;
use crate::DecodeError;

/// XOR of every byte of `frame`.
///
/// This is the Host Link frame check sequence: an 8-bit running XOR, not a CRC.
/// Even numbers of flipped bits in the same position go unnoticed.
pub fn fcs(frame: &str) -> u8 {
    frame.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Uppercase hex without zero padding (`0x48 -> "48"`, `0x0F -> "F"`).
///
/// Matches what the bridge installations were commissioned with, so single digit
/// values stay unpadded.
pub fn format_fcs(value: u8) -> String {
    format!("{value:X}")
}

/// `command` followed by its FCS and the `*` terminator.
pub fn with_fcs(command: &str) -> String {
    let mut framed = String::with_capacity(command.len() + 3);
    framed.push_str(command);
    framed.push_str(&format_fcs(fcs(command)));
    framed.push(TERMINATOR);
    framed
}

fn split_check(body: &str, digits: usize) -> Option<(&str, &str)> {
    let split = body.len().checked_sub(digits)?;
    if split == 0 || !body.is_char_boundary(split) {
        return None;
    }
    Some(body.split_at(split))
}

fn check_matches(content: &str, check: &str) -> bool {
    check.bytes().all(|b| b.is_ascii_hexdigit())
        && u8::from_str_radix(check, 16).is_ok_and(|value| value == fcs(content))
}

/// Strip the FCS and `*` from a framed line (trailing CR/LF ignored) and return
/// the checked content.
///
/// Both the padded two digit form and the unpadded single digit form produced by
/// [`format_fcs`] are accepted.
pub fn strip_fcs(frame: &str) -> Result<&str, DecodeError> {
    let frame = frame.trim_end_matches(['\r', '\n']);
    let body = frame
        .strip_suffix(TERMINATOR)
        .ok_or(DecodeError::InvalidLength)?;

    for digits in [2, 1] {
        if let Some((content, check)) = split_check(body, digits) {
            if check_matches(content, check) {
                return Ok(content);
            }
        }
    }

    let (content, got) = split_check(body, 2).ok_or(DecodeError::InvalidLength)?;
    Err(DecodeError::InvalidFcs {
        expected: format_fcs(fcs(content)),
        got: got.to_string(),
    })
}

pub fn verify_fcs(frame: &str) -> bool {
    strip_fcs(frame).is_ok()
}

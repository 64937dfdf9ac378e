//! Host Link C-mode frame layout and the shared FCS helpers.
//!
//! Every frame is ASCII: `@` + two-digit unit number + two-letter opcode + body +
//! two hex FCS digits + `*`. Requests are followed by CR-LF on the wire, responses
//! end with a single CR.

pub mod bits;
pub mod fcs;

pub use bits::{bit_from_end, hex_to_bits};
pub use fcs::{fcs, format_fcs, strip_fcs, verify_fcs, with_fcs};

/// Start character plus the unit number this bridge always talks to.
pub const UNIT_PREFIX: &str = "@00";
/// `@00` + opcode.
pub const HEADER_LEN: usize = 5;
pub const END_CODE_LEN: usize = 2;
/// FCS (2) + `*` + CR at the end of every response line.
pub const RESPONSE_TRAILER_LEN: usize = 4;
pub const TERMINATOR: char = '*';
pub const CR: u8 = b'\r';
pub const REQUEST_LINE_END: &[u8] = b"\r\n";
pub const COMMAND_SEPARATOR: char = ';';

/// Data section of a response line: everything between the end code and the
/// trailing FCS, `*` and CR. Empty when the line is too short to hold one.
pub fn response_payload(response: &str) -> &str {
    let start = HEADER_LEN + END_CODE_LEN;
    let Some(end) = response.len().checked_sub(RESPONSE_TRAILER_LEN) else {
        return "";
    };
    if end <= start {
        return "";
    }
    response.get(start..end).unwrap_or("")
}

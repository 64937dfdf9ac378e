use crate::DecodeError;

/// Expand hex text into a string of `'0'`/`'1'`, four bits per digit, most
/// significant digit first (`"8400"` -> `"1000010000000000"`).
pub fn hex_to_bits(hex: &str) -> Result<String, DecodeError> {
    let mut bits = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        let nibble = c.to_digit(16).ok_or(DecodeError::InvalidHexDigit(c))?;
        for shift in (0..4).rev() {
            bits.push(if (nibble >> shift) & 1 == 1 { '1' } else { '0' });
        }
    }
    Ok(bits)
}

/// Bit `bit` of a bit string, counted from the right: bit 0 is the last character.
pub fn bit_from_end(bits: &str, bit: u8) -> Result<bool, DecodeError> {
    let position = usize::from(bit) + 1;
    let index = bits
        .len()
        .checked_sub(position)
        .ok_or(DecodeError::BitIndex {
            bit,
            available: bits.len(),
        })?;
    match bits.as_bytes()[index] {
        b'1' => Ok(true),
        b'0' => Ok(false),
        _ => Err(DecodeError::InvalidValue),
    }
}

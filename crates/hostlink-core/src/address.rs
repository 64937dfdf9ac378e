use crate::AddressError;
use crate::command::Opcode;
use std::fmt;
use std::str::FromStr;

pub const MAX_WORD: u16 = 9999;
pub const MAX_BIT: u8 = 15;

/// PLC memory area selected by the letter prefix of an address token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Area {
    /// Holding relay.
    Hr,
    /// Data memory.
    Dm,
    /// Link relay.
    Lr,
    /// Internal / input relay. Tokens without a recognised prefix land here.
    Ir,
}

impl Area {
    /// Case-sensitive: only `HR`, `DM` and `LR` are recognised, anything else is IR.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "HR" => Self::Hr,
            "DM" => Self::Dm,
            "LR" => Self::Lr,
            _ => Self::Ir,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hr => "HR",
            Self::Dm => "DM",
            Self::Lr => "LR",
            Self::Ir => "IR",
        }
    }

    pub const fn read_opcode(self) -> Opcode {
        match self {
            Self::Hr => Opcode::ReadHr,
            Self::Dm => Opcode::ReadDm,
            Self::Lr => Opcode::ReadLr,
            Self::Ir => Opcode::ReadIr,
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A word or bit location, e.g. `HR5.06`, `DM140`, `191.15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    pub area: Area,
    pub word: u16,
    /// Bit within the word counted from the least significant bit.
    pub bit: Option<u8>,
}

impl Address {
    pub fn word(area: Area, word: u16) -> Self {
        Self {
            area,
            word,
            bit: None,
        }
    }

    pub fn bit(area: Area, word: u16, bit: u8) -> Self {
        Self {
            area,
            word,
            bit: Some(bit),
        }
    }

    pub fn parse(token: &str) -> Result<Self, AddressError> {
        token.parse()
    }

    pub const fn is_bit(&self) -> bool {
        self.bit.is_some()
    }
}

fn parse_word(digits: &str) -> Result<u16, AddressError> {
    if digits.is_empty() {
        return Err(AddressError::MissingWord);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::InvalidWord);
    }
    let word: u16 = digits.parse().map_err(|_| AddressError::WordOutOfRange)?;
    if word > MAX_WORD {
        return Err(AddressError::WordOutOfRange);
    }
    Ok(word)
}

fn parse_bit(digits: &str) -> Result<u8, AddressError> {
    if digits.is_empty() {
        return Err(AddressError::MissingBit);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::InvalidBit);
    }
    let bit: u8 = digits.parse().map_err(|_| AddressError::BitOutOfRange)?;
    if bit > MAX_BIT {
        return Err(AddressError::BitOutOfRange);
    }
    Ok(bit)
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        let (word_part, bit_part) = match token.split_once('.') {
            Some((word_part, bit_part)) => (word_part, Some(bit_part)),
            None => (token, None),
        };

        let split = word_part
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(word_part.len());
        let (prefix, digits) = word_part.split_at(split);

        Ok(Self {
            area: Area::from_prefix(prefix),
            word: parse_word(digits)?,
            bit: bit_part.map(parse_bit).transpose()?,
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.area, self.word)?;
        if let Some(bit) = self.bit {
            write!(f, ".{bit:02}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Address, Area};
    use crate::AddressError;

    #[test]
    fn parses_bit_addresses() {
        assert_eq!(Address::parse("HR5.06").unwrap(), Address::bit(Area::Hr, 5, 6));
        assert_eq!(Address::parse("191.15").unwrap(), Address::bit(Area::Ir, 191, 15));
        assert_eq!(Address::parse("LR2.0").unwrap(), Address::bit(Area::Lr, 2, 0));
    }

    #[test]
    fn parses_word_addresses() {
        assert_eq!(Address::parse("DM140").unwrap(), Address::word(Area::Dm, 140));
        assert_eq!(Address::parse("0012").unwrap(), Address::word(Area::Ir, 12));
        assert_eq!(Address::parse(" HR4 ").unwrap(), Address::word(Area::Hr, 4));
    }

    #[test]
    fn unknown_and_lowercase_areas_fall_back_to_ir() {
        assert_eq!(Address::parse("hr5.06").unwrap().area, Area::Ir);
        assert_eq!(Address::parse("AR12").unwrap().area, Area::Ir);
        assert_eq!(Address::parse("IR120.01").unwrap().area, Area::Ir);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert_eq!(Address::parse("HR").unwrap_err(), AddressError::MissingWord);
        assert_eq!(Address::parse("HR.05").unwrap_err(), AddressError::MissingWord);
        assert_eq!(Address::parse("HR5x").unwrap_err(), AddressError::InvalidWord);
        assert_eq!(Address::parse("HR5.").unwrap_err(), AddressError::MissingBit);
        assert_eq!(Address::parse("HR5.a").unwrap_err(), AddressError::InvalidBit);
        assert_eq!(Address::parse("HR5.16").unwrap_err(), AddressError::BitOutOfRange);
        assert_eq!(Address::parse("HR5.1.2").unwrap_err(), AddressError::InvalidBit);
        assert_eq!(Address::parse("10000").unwrap_err(), AddressError::WordOutOfRange);
        assert_eq!(
            Address::parse("99999999").unwrap_err(),
            AddressError::WordOutOfRange
        );
    }

    #[test]
    fn display_normalises_area_and_bit() {
        assert_eq!(Address::parse("191.3").unwrap().to_string(), "IR191.03");
        assert_eq!(Address::parse("DM140").unwrap().to_string(), "DM140");
    }
}

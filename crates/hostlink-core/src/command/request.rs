use crate::address::{Address, Area, MAX_BIT, MAX_WORD};
use crate::command::Opcode;
use crate::frame::{COMMAND_SEPARATOR, UNIT_PREFIX, strip_fcs, with_fcs};
use crate::{DecodeError, EncodeError};
use std::fmt;

/// Area field of a forced set/reset command. Only HR is written by this bridge.
const FORCE_AREA_HR: &str = "HR  ";

fn validate_word(word: u16) -> Result<(), EncodeError> {
    if word > MAX_WORD {
        return Err(EncodeError::WordOutOfRange);
    }
    Ok(())
}

fn validate_bit(bit: u8) -> Result<(), EncodeError> {
    if bit > MAX_BIT {
        return Err(EncodeError::BitOutOfRange);
    }
    Ok(())
}

fn parse_digits<T: std::str::FromStr>(text: &str) -> Result<T, DecodeError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidValue);
    }
    text.parse().map_err(|_| DecodeError::InvalidValue)
}

/// Read of `count` words starting at `word` (`RR`, `RL`, `RH`, `RD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadRequest {
    area: Area,
    word: u16,
    count: u16,
}

impl ReadRequest {
    /// Single word read, the only form the poller issues.
    pub fn new(area: Area, word: u16) -> Result<Self, EncodeError> {
        Self::with_count(area, word, 1)
    }

    pub fn with_count(area: Area, word: u16, count: u16) -> Result<Self, EncodeError> {
        validate_word(word)?;
        if count == 0 || count > MAX_WORD {
            return Err(EncodeError::WordOutOfRange);
        }
        Ok(Self { area, word, count })
    }

    /// The word holding `address`; the bit, if any, is picked out after decoding.
    pub fn for_address(address: &Address) -> Result<Self, EncodeError> {
        Self::new(address.area, address.word)
    }

    pub const fn area(&self) -> Area {
        self.area
    }

    pub const fn word(&self) -> u16 {
        self.word
    }

    pub const fn count(&self) -> u16 {
        self.count
    }

    /// Command text without FCS, e.g. `@00RR01910001`.
    pub fn command(&self) -> String {
        format!(
            "{UNIT_PREFIX}{}{:04}{:04}",
            self.area.read_opcode().as_str(),
            self.word,
            self.count
        )
    }

    /// Command with FCS and terminator, e.g. `@00RR0191000148*`.
    pub fn frame(&self) -> String {
        with_fcs(&self.command())
    }
}

/// `@00` + read opcode for `area` + zero padded word + `0001`.
pub fn build_read_command(area: Area, word: u16) -> Result<String, EncodeError> {
    Ok(ReadRequest::new(area, word)?.command())
}

/// Operating modes selectable with the `SC` status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlcMode {
    Program,
    /// Program keeps running but forced set/reset is accepted.
    Monitor,
    Run,
}

impl PlcMode {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Program => "00",
            Self::Monitor => "02",
            Self::Run => "03",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "00" => Some(Self::Program),
            "02" => Some(Self::Monitor),
            "03" => Some(Self::Run),
            _ => None,
        }
    }
}

/// Framed `SC` command switching the PLC to `mode`.
pub fn status_write(mode: PlcMode) -> String {
    with_fcs(&format!(
        "{UNIT_PREFIX}{}{}",
        Opcode::StatusWrite.as_str(),
        mode.code()
    ))
}

/// Forced set (`turn_on`) or reset of one HR bit, without FCS.
pub fn force_command(area: Area, word: u16, bit: u8, turn_on: bool) -> Result<String, EncodeError> {
    if area != Area::Hr {
        return Err(EncodeError::UnsupportedWriteArea(area));
    }
    validate_word(word)?;
    validate_bit(bit)?;
    let opcode = if turn_on {
        Opcode::ForceSet
    } else {
        Opcode::ForceReset
    };
    Ok(format!(
        "{UNIT_PREFIX}{}{FORCE_AREA_HR}{word:04}{bit:02}",
        opcode.as_str()
    ))
}

/// The three frames that toggle an HR bit: switch to monitor mode, force the bit,
/// switch back to run mode.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteSequence {
    frames: [String; 3],
}

impl WriteSequence {
    pub fn build(area: Area, word: u16, bit: u8, turn_on: bool) -> Result<Self, EncodeError> {
        let force = force_command(area, word, bit, turn_on)?;
        Ok(Self {
            frames: [
                status_write(PlcMode::Monitor),
                with_fcs(&force),
                status_write(PlcMode::Run),
            ],
        })
    }

    pub fn for_address(address: &Address, turn_on: bool) -> Result<Self, EncodeError> {
        if address.area != Area::Hr {
            return Err(EncodeError::UnsupportedWriteArea(address.area));
        }
        let bit = address.bit.ok_or(EncodeError::MissingBit)?;
        Self::build(address.area, address.word, bit, turn_on)
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }
}

impl fmt::Display for WriteSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, frame) in self.frames.iter().enumerate() {
            if idx > 0 {
                write!(f, "{COMMAND_SEPARATOR}")?;
            }
            f.write_str(frame)?;
        }
        Ok(())
    }
}

/// Semicolon-joined write sequence, as carried in switch command payloads.
pub fn build_write_sequence(
    area: Area,
    word: u16,
    bit: u8,
    turn_on: bool,
) -> Result<String, EncodeError> {
    Ok(WriteSequence::build(area, word, bit, turn_on)?.to_string())
}

/// A request frame as received by a PLC (or the simulator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Request {
    Read(ReadRequest),
    StatusWrite(PlcMode),
    Force {
        area: Area,
        word: u16,
        bit: u8,
        turn_on: bool,
    },
}

impl Request {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Read(req) => req.area().read_opcode(),
            Self::StatusWrite(_) => Opcode::StatusWrite,
            Self::Force { turn_on: true, .. } => Opcode::ForceSet,
            Self::Force { turn_on: false, .. } => Opcode::ForceReset,
        }
    }

    /// Parse one framed request line; the FCS must verify.
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        let content = strip_fcs(frame)?;
        if !content.is_ascii() {
            return Err(DecodeError::InvalidValue);
        }
        let rest = content
            .strip_prefix(UNIT_PREFIX)
            .ok_or(DecodeError::InvalidValue)?;
        let code = rest.get(..2).ok_or(DecodeError::InvalidLength)?;
        let body = rest.get(2..).ok_or(DecodeError::InvalidLength)?;

        match Opcode::parse(code)? {
            opcode @ (Opcode::ReadIr | Opcode::ReadLr | Opcode::ReadHr | Opcode::ReadDm) => {
                if body.len() != 8 {
                    return Err(DecodeError::InvalidLength);
                }
                let area = match opcode {
                    Opcode::ReadHr => Area::Hr,
                    Opcode::ReadDm => Area::Dm,
                    Opcode::ReadLr => Area::Lr,
                    _ => Area::Ir,
                };
                let word = parse_digits(&body[..4])?;
                let count = parse_digits(&body[4..])?;
                ReadRequest::with_count(area, word, count)
                    .map(Self::Read)
                    .map_err(|_| DecodeError::InvalidValue)
            }
            Opcode::StatusWrite => {
                if body.len() != 2 {
                    return Err(DecodeError::InvalidLength);
                }
                PlcMode::from_code(body)
                    .map(Self::StatusWrite)
                    .ok_or(DecodeError::InvalidValue)
            }
            opcode @ (Opcode::ForceSet | Opcode::ForceReset) => {
                if body.len() != 10 {
                    return Err(DecodeError::InvalidLength);
                }
                let area = match body.get(..4).ok_or(DecodeError::InvalidLength)? {
                    "HR  " => Area::Hr,
                    "LR  " => Area::Lr,
                    "CIO " | "IR  " => Area::Ir,
                    _ => return Err(DecodeError::InvalidValue),
                };
                let word: u16 = parse_digits(&body[4..8])?;
                let bit: u8 = parse_digits(&body[8..])?;
                if word > MAX_WORD || bit > MAX_BIT {
                    return Err(DecodeError::InvalidValue);
                }
                Ok(Self::Force {
                    area,
                    word,
                    bit,
                    turn_on: opcode == Opcode::ForceSet,
                })
            }
        }
    }
}

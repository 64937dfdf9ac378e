use std::fmt;

/// Two-digit status that follows the header of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EndCode {
    Normal,
    NotExecutableInRunMode,
    NotExecutableInMonitorMode,
    WriteProtected,
    AddressOver,
    NotExecutableInProgramMode,
    FcsError,
    FormatError,
    EntryNumberError,
    FrameLengthError,
    NotExecutable,
    Unknown(u8),
}

impl EndCode {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Normal,
            0x01 => Self::NotExecutableInRunMode,
            0x02 => Self::NotExecutableInMonitorMode,
            0x03 => Self::WriteProtected,
            0x04 => Self::AddressOver,
            0x0B => Self::NotExecutableInProgramMode,
            0x13 => Self::FcsError,
            0x14 => Self::FormatError,
            0x15 => Self::EntryNumberError,
            0x18 => Self::FrameLengthError,
            0x19 => Self::NotExecutable,
            other => Self::Unknown(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Normal => 0x00,
            Self::NotExecutableInRunMode => 0x01,
            Self::NotExecutableInMonitorMode => 0x02,
            Self::WriteProtected => 0x03,
            Self::AddressOver => 0x04,
            Self::NotExecutableInProgramMode => 0x0B,
            Self::FcsError => 0x13,
            Self::FormatError => 0x14,
            Self::EntryNumberError => 0x15,
            Self::FrameLengthError => 0x18,
            Self::NotExecutable => 0x19,
            Self::Unknown(raw) => raw,
        }
    }

    /// Parse the two hex characters of a response end code.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() != 2 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u8::from_str_radix(text, 16).ok().map(Self::from_u8)
    }

    pub const fn is_normal(self) -> bool {
        matches!(self, Self::Normal)
    }
}

impl fmt::Display for EndCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.as_u8())
    }
}

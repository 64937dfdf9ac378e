use crate::DecodeError;

/// Two-letter header codes used by this bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    ReadIr,
    ReadLr,
    ReadHr,
    ReadDm,
    StatusWrite,
    ForceSet,
    ForceReset,
}

impl Opcode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadIr => "RR",
            Self::ReadLr => "RL",
            Self::ReadHr => "RH",
            Self::ReadDm => "RD",
            Self::StatusWrite => "SC",
            Self::ForceSet => "KS",
            Self::ForceReset => "KR",
        }
    }

    pub fn parse(code: &str) -> Result<Self, DecodeError> {
        match code {
            "RR" => Ok(Self::ReadIr),
            "RL" => Ok(Self::ReadLr),
            "RH" => Ok(Self::ReadHr),
            "RD" => Ok(Self::ReadDm),
            "SC" => Ok(Self::StatusWrite),
            "KS" => Ok(Self::ForceSet),
            "KR" => Ok(Self::ForceReset),
            _ => Err(DecodeError::UnknownOpcode),
        }
    }

    pub const fn is_read(self) -> bool {
        matches!(
            self,
            Self::ReadIr | Self::ReadLr | Self::ReadHr | Self::ReadDm
        )
    }
}

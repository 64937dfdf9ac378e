use crate::{HostLinkService, ServiceError};
use hostlink_core::address::MAX_WORD;
use hostlink_core::{Area, EndCode, PlcMode, Request};
use std::fmt::Write as _;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordBank {
    values: Vec<u16>,
}

impl WordBank {
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![0u16; size],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u16> {
        self.values.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: u16) -> Result<(), ServiceError> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or(ServiceError::Rejected(EndCode::EntryNumberError))?;
        *slot = value;
        Ok(())
    }

    pub fn set_bit(&mut self, index: usize, bit: u8, on: bool) -> Result<(), ServiceError> {
        let word = self
            .get(index)
            .ok_or(ServiceError::Rejected(EndCode::EntryNumberError))?;
        let mask = 1u16
            .checked_shl(u32::from(bit))
            .ok_or(ServiceError::InvalidRequest("bit number out of range"))?;
        self.set(index, if on { word | mask } else { word & !mask })
    }
}

/// Word banks of every area plus the operating mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlcMemory {
    pub hr: WordBank,
    pub dm: WordBank,
    pub lr: WordBank,
    pub ir: WordBank,
    pub mode: PlcMode,
}

impl PlcMemory {
    pub fn new(words_per_area: usize) -> Self {
        Self {
            hr: WordBank::new(words_per_area),
            dm: WordBank::new(words_per_area),
            lr: WordBank::new(words_per_area),
            ir: WordBank::new(words_per_area),
            mode: PlcMode::Run,
        }
    }

    pub fn bank(&self, area: Area) -> &WordBank {
        match area {
            Area::Hr => &self.hr,
            Area::Dm => &self.dm,
            Area::Lr => &self.lr,
            Area::Ir => &self.ir,
        }
    }

    pub fn bank_mut(&mut self, area: Area) -> &mut WordBank {
        match area {
            Area::Hr => &mut self.hr,
            Area::Dm => &mut self.dm,
            Area::Lr => &mut self.lr,
            Area::Ir => &mut self.ir,
        }
    }
}

impl Default for PlcMemory {
    fn default() -> Self {
        Self::new(usize::from(MAX_WORD) + 1)
    }
}

/// A PLC that lives in memory, for tests and demos.
///
/// It starts in RUN mode and refuses forced set/reset until switched to
/// MONITOR (or PROGRAM), the same way the real controller does.
#[derive(Debug, Default)]
pub struct InMemoryPlc {
    memory: RwLock<PlcMemory>,
    handled: AtomicUsize,
}

impl InMemoryPlc {
    pub fn new(words_per_area: usize) -> Self {
        Self::with_memory(PlcMemory::new(words_per_area))
    }

    pub fn with_memory(memory: PlcMemory) -> Self {
        Self {
            memory: RwLock::new(memory),
            handled: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> PlcMemory {
        self.memory
            .read()
            .expect("in-memory plc lock poisoned")
            .clone()
    }

    pub fn set_word(&self, area: Area, word: u16, value: u16) -> Result<(), ServiceError> {
        self.memory
            .write()
            .expect("in-memory plc lock poisoned")
            .bank_mut(area)
            .set(usize::from(word), value)
    }

    pub fn set_bit(&self, area: Area, word: u16, bit: u8, on: bool) -> Result<(), ServiceError> {
        self.memory
            .write()
            .expect("in-memory plc lock poisoned")
            .bank_mut(area)
            .set_bit(usize::from(word), bit, on)
    }

    pub fn set_mode(&self, mode: PlcMode) {
        self.memory.write().expect("in-memory plc lock poisoned").mode = mode;
    }

    pub fn word(&self, area: Area, word: u16) -> Option<u16> {
        self.memory
            .read()
            .expect("in-memory plc lock poisoned")
            .bank(area)
            .get(usize::from(word))
    }

    pub fn bit(&self, area: Area, word: u16, bit: u8) -> Option<bool> {
        let value = self.word(area, word)?;
        let mask = 1u16.checked_shl(u32::from(bit))?;
        Some(value & mask != 0)
    }

    pub fn mode(&self) -> PlcMode {
        self.memory.read().expect("in-memory plc lock poisoned").mode
    }

    /// Requests handled so far, including rejected ones.
    pub fn requests_handled(&self) -> usize {
        self.handled.load(Ordering::Relaxed)
    }
}

impl HostLinkService for InMemoryPlc {
    fn handle(&self, request: Request) -> Result<String, ServiceError> {
        self.handled.fetch_add(1, Ordering::Relaxed);
        let mut memory = self.memory.write().expect("in-memory plc lock poisoned");

        match request {
            Request::Read(read) => {
                let bank = memory.bank(read.area());
                let start = usize::from(read.word());
                let mut payload = String::with_capacity(usize::from(read.count()) * 4);
                for index in start..start + usize::from(read.count()) {
                    let value = bank
                        .get(index)
                        .ok_or(ServiceError::Rejected(EndCode::EntryNumberError))?;
                    write!(payload, "{value:04X}")
                        .map_err(|_| ServiceError::Internal("payload formatting failed"))?;
                }
                Ok(payload)
            }
            Request::StatusWrite(mode) => {
                memory.mode = mode;
                Ok(String::new())
            }
            Request::Force {
                area,
                word,
                bit,
                turn_on,
            } => {
                if memory.mode == PlcMode::Run {
                    return Err(ServiceError::Rejected(EndCode::NotExecutableInRunMode));
                }
                memory
                    .bank_mut(area)
                    .set_bit(usize::from(word), bit, turn_on)?;
                Ok(String::new())
            }
        }
    }
}

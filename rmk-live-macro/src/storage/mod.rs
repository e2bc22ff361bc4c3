//! Dual tier macro storage.
//!
//! Slots `0..PERSISTENT_SLOTS` are stored in a fixed region of the [`Eeprom`], one record per slot at
//! `storage_offset + slot * RECORD_SIZE`. The remaining slots each own a record in RAM.
//!
//! A record is `[count][event]*count`. A count of 0 or above `MAX_EVENTS` marks a free slot,
//! the trailing bytes of a free record are meaningless.
pub mod eeprom;

use embedded_storage::{ReadStorage, Storage};
use heapless::Vec;

use self::eeprom::{ERASED_BYTE, Eeprom};
use crate::config::{LiveMacroConfig, MAX_EVENTS, PERSISTENT_SLOTS, RECORD_SIZE, TOTAL_SLOTS, VOLATILE_SLOTS};
use crate::live_macro::codec::MacroEvent;

/// Where a slot is stored
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tier {
    /// Kept in the eeprom, survives power-down once committed
    Persistent,
    /// Kept in RAM, lost on power-down
    Volatile,
}

impl Tier {
    /// Tier of the given slot, `None` if the slot doesn't exist
    pub const fn of(slot: u8) -> Option<Tier> {
        if slot as usize >= TOTAL_SLOTS {
            None
        } else if (slot as usize) < PERSISTENT_SLOTS {
            Some(Tier::Persistent)
        } else {
            Some(Tier::Volatile)
        }
    }
}

/// Whether a slot holds a macro
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Occupancy {
    Free,
    /// Occupied by a macro with the given number of events
    Occupied(u8),
}

impl Occupancy {
    /// Interpret the count byte of a record
    pub const fn from_count(count: u8) -> Self {
        if count == 0 || count as usize > MAX_EVENTS {
            Occupancy::Free
        } else {
            Occupancy::Occupied(count)
        }
    }

    pub const fn is_occupied(&self) -> bool {
        matches!(self, Occupancy::Occupied(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The slot doesn't exist
    InvalidSlot(u8),
    /// The slot is free
    Empty(u8),
    /// Reading or writing the eeprom failed
    Storage,
}

/// An encoded macro
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroRecord {
    /// `[count][event]*count`, never empty
    bytes: Vec<u8, RECORD_SIZE>,
}

impl Default for MacroRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroRecord {
    /// A record without any event
    pub fn new() -> Self {
        let mut bytes = Vec::new();
        // The count byte always fits
        let _ = bytes.push(0);
        Self { bytes }
    }

    /// Build a record from events, `None` if there are more than `MAX_EVENTS` events
    pub fn from_events(events: &[MacroEvent]) -> Option<Self> {
        let mut record = Self::new();
        for event in events {
            if !record.push(*event) {
                return None;
            }
        }
        Some(record)
    }

    /// Build a record from its encoded form.
    ///
    /// Returns `None` if the count byte marks a free record, or the bytes are shorter than the count says.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let Occupancy::Occupied(count) = Occupancy::from_count(*bytes.first()?) else {
            return None;
        };
        let len = 1 + 2 * count as usize;
        let bytes = Vec::from_slice(bytes.get(..len)?).ok()?;
        Some(Self { bytes })
    }

    /// Append an event, returns false if the record is full
    pub(crate) fn push(&mut self, event: MacroEvent) -> bool {
        if self.is_full() {
            return false;
        }
        if self.bytes.extend_from_slice(&event.encode()).is_err() {
            return false;
        }
        // Count is updated after the event is complete
        self.bytes[0] += 1;
        true
    }

    /// Number of events in the record
    pub fn len(&self) -> usize {
        self.bytes[0] as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= MAX_EVENTS
    }

    pub fn occupancy(&self) -> Occupancy {
        Occupancy::from_count(self.bytes[0])
    }

    /// Events in recorded order
    pub fn events(&self) -> impl Iterator<Item = MacroEvent> + '_ {
        self.bytes[1..]
            .chunks_exact(2)
            .take(self.len())
            .map(|e| MacroEvent::decode([e[0], e[1]]))
    }

    /// The encoded record
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Free space of the store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FreeSpace {
    pub persistent_slots: usize,
    pub volatile_slots: usize,
    /// Bytes of record space in free slots
    pub bytes: usize,
}

/// Macro storage over both tiers.
///
/// The store is the only owner of the volatile records, installing a record releases the previous one.
/// Persistent records are written byte by byte without any transaction, call [`MacroStore::commit`] to make them durable.
pub struct MacroStore<E: Eeprom> {
    eeprom: E,
    config: LiveMacroConfig,
    volatile: [Option<MacroRecord>; VOLATILE_SLOTS],
}

impl<E: Eeprom> MacroStore<E> {
    pub fn new(eeprom: E, config: LiveMacroConfig) -> Self {
        if config.region_end() > eeprom.capacity() {
            warn!(
                "Persistent macro region ends at {}, but the eeprom has only {} bytes",
                config.region_end(),
                eeprom.capacity()
            );
        }
        Self {
            eeprom,
            config,
            volatile: [const { None }; VOLATILE_SLOTS],
        }
    }

    pub fn config(&self) -> &LiveMacroConfig {
        &self.config
    }

    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    pub fn eeprom_mut(&mut self) -> &mut E {
        &mut self.eeprom
    }

    /// Occupancy of a slot.
    ///
    /// Invalid slots and persistent slots which can't be read are reported as free.
    pub fn occupancy(&mut self, slot: u8) -> Occupancy {
        match Tier::of(slot) {
            Some(Tier::Persistent) => match self.persistent_offset(slot).and_then(|offset| self.read_byte(offset)) {
                Ok(count) => Occupancy::from_count(count),
                Err(_) => Occupancy::Free,
            },
            Some(Tier::Volatile) => self.volatile[volatile_index(slot)]
                .as_ref()
                .map_or(Occupancy::Free, |r| r.occupancy()),
            None => {
                warn!("Invalid macro slot {}", slot);
                Occupancy::Free
            }
        }
    }

    pub fn is_occupied(&mut self, slot: u8) -> bool {
        self.occupancy(slot).is_occupied()
    }

    /// Read the macro in a slot
    pub fn read(&mut self, slot: u8) -> Result<MacroRecord, StoreError> {
        match Tier::of(slot).ok_or(StoreError::InvalidSlot(slot))? {
            Tier::Persistent => {
                let mut raw = [0; RECORD_SIZE];
                self.read_persistent_raw(slot, &mut raw)?;
                MacroRecord::from_bytes(&raw).ok_or(StoreError::Empty(slot))
            }
            Tier::Volatile => self.volatile[volatile_index(slot)]
                .as_ref()
                .filter(|r| r.occupancy().is_occupied())
                .cloned()
                .ok_or(StoreError::Empty(slot)),
        }
    }

    /// Store a macro into a slot, replacing the previous one
    pub fn write(&mut self, slot: u8, record: MacroRecord) -> Result<(), StoreError> {
        match Tier::of(slot).ok_or(StoreError::InvalidSlot(slot))? {
            Tier::Persistent => {
                // Nothing is written unless the whole record fits
                let offset = self.persistent_offset(slot)?;
                for (i, byte) in record.as_bytes().iter().enumerate() {
                    self.write_byte(offset + i, *byte)?;
                }
                debug!("Wrote {} events to persistent slot {}", record.len(), slot);
            }
            Tier::Volatile => {
                let len = record.len();
                if self.volatile[volatile_index(slot)].replace(record).is_some() {
                    debug!("Released previous macro of volatile slot {}", slot);
                }
                debug!("Installed {} events to volatile slot {}", len, slot);
            }
        }
        Ok(())
    }

    /// Raw record of a persistent slot
    pub fn read_persistent_raw(&mut self, slot: u8, buf: &mut [u8; RECORD_SIZE]) -> Result<(), StoreError> {
        let offset = self.persistent_offset(slot)?;
        self.eeprom.read(offset as u32, buf).map_err(|_| {
            error!("Failed to read macro record at {}", offset);
            StoreError::Storage
        })
    }

    /// Reset the whole persistent region to the erased state, which frees every persistent slot
    pub fn erase_persistent(&mut self) -> Result<(), StoreError> {
        for offset in self.config.storage_offset..self.config.region_end() {
            self.write_byte(offset, ERASED_BYTE)?;
        }
        info!("Erased persistent macro region");
        Ok(())
    }

    /// Make the persistent writes durable
    pub fn commit(&mut self) -> Result<(), StoreError> {
        self.eeprom.commit().map_err(|_| {
            error!("Failed to commit macro storage");
            StoreError::Storage
        })
    }

    pub fn free_space(&mut self) -> FreeSpace {
        let mut space = FreeSpace::default();
        for slot in 0..TOTAL_SLOTS as u8 {
            if self.is_occupied(slot) {
                continue;
            }
            match Tier::of(slot) {
                Some(Tier::Persistent) => space.persistent_slots += 1,
                Some(Tier::Volatile) => space.volatile_slots += 1,
                None => {}
            }
            space.bytes += RECORD_SIZE;
        }
        space
    }

    /// Offset of a persistent record which lies completely inside the eeprom
    fn persistent_offset(&self, slot: u8) -> Result<usize, StoreError> {
        if slot as usize >= PERSISTENT_SLOTS {
            return Err(StoreError::InvalidSlot(slot));
        }
        let offset = self.config.record_offset(slot as usize);
        if offset + RECORD_SIZE > self.eeprom.capacity() {
            warn!("Persistent slot {} at {} doesn't fit the eeprom", slot, offset);
            return Err(StoreError::Storage);
        }
        Ok(offset)
    }

    fn read_byte(&mut self, offset: usize) -> Result<u8, StoreError> {
        let mut buf = [0; 1];
        self.eeprom.read(offset as u32, &mut buf).map_err(|_| {
            error!("Failed to read macro storage at {}", offset);
            StoreError::Storage
        })?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, offset: usize, byte: u8) -> Result<(), StoreError> {
        self.eeprom.write(offset as u32, &[byte]).map_err(|_| {
            error!("Failed to write macro storage at {}", offset);
            StoreError::Storage
        })
    }
}

const fn volatile_index(slot: u8) -> usize {
    slot as usize - PERSISTENT_SLOTS
}

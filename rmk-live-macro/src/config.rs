//! Sizing constants and runtime configuration of the live macro engine.

/// Maximum number of key transitions in one macro.
///
/// A key press is one event and its release is another one, so a macro holds at most `MAX_EVENTS / 2` keystrokes.
pub const MAX_EVENTS: usize = 14;

/// Total number of macro slots.
pub const TOTAL_SLOTS: usize = 8;

/// Slots `0..PERSISTENT_SLOTS` are stored in the persistent storage, the rest live in RAM.
pub const PERSISTENT_SLOTS: usize = 6;

/// Number of slots which are lost on power-down.
pub const VOLATILE_SLOTS: usize = TOTAL_SLOTS - PERSISTENT_SLOTS;

/// Size of one encoded macro: the event count followed by two bytes per event.
pub const RECORD_SIZE: usize = 1 + 2 * MAX_EVENTS;

/// Size of the reserved persistent region, one record per persistent slot.
pub const PERSISTENT_REGION_SIZE: usize = PERSISTENT_SLOTS * RECORD_SIZE;

const _: () = assert!(PERSISTENT_SLOTS <= TOTAL_SLOTS, "Invalid number of persistent slots");
const _: () = assert!(MAX_EVENTS > 0 && MAX_EVENTS < u8::MAX as usize, "Event count must fit the count byte");
const _: () = assert!(TOTAL_SLOTS <= u8::MAX as usize);

/// Runtime configuration of the live macro engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LiveMacroConfig {
    /// Offset of the persistent macro region in the byte storage.
    ///
    /// The region is `PERSISTENT_REGION_SIZE` bytes long, it must not overlap with other data in the storage.
    pub storage_offset: usize,
}

impl LiveMacroConfig {
    pub const fn new(storage_offset: usize) -> Self {
        Self { storage_offset }
    }

    /// Offset of the record of the given persistent slot
    pub(crate) const fn record_offset(&self, slot: usize) -> usize {
        self.storage_offset + slot * RECORD_SIZE
    }

    /// End of the persistent region, exclusive
    pub(crate) const fn region_end(&self) -> usize {
        self.storage_offset + PERSISTENT_REGION_SIZE
    }
}

//! Keys as seen by the live macro engine.
//!
//! A [`Key`] is a 16-bit value: the upper byte is a set of [`KeyFlags`], the lower byte is the keycode.
//! Keys with the `reserved` flag are owned by firmware features, the live macro control keys live in that range too.
use bitfield_struct::bitfield;

use crate::config::TOTAL_SLOTS;

#[bitfield(u8, order = Lsb)]
#[derive(Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyFlags {
    #[bits(1)]
    pub ctrl_held: bool,
    #[bits(1)]
    pub left_alt_held: bool,
    #[bits(1)]
    pub right_alt_held: bool,
    #[bits(1)]
    pub shift_held: bool,
    #[bits(1)]
    pub gui_held: bool,
    #[bits(1)]
    __padding: u8,
    /// The key is generated by firmware, not by a keycode of the HID keyboard page
    #[bits(1)]
    pub synthetic: bool,
    /// The key belongs to the reserved range used by firmware features
    #[bits(1)]
    pub reserved: bool,
}

/// A key in the keymap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Key {
    pub flags: KeyFlags,
    pub keycode: u8,
}

impl Key {
    /// No key
    pub const NO: Key = Key::from_raw(0x0000);

    /// Falls through to the next active layer
    pub const TRANSPARENT: Key = Key::from_raw(0xFFFF);

    pub const fn new(keycode: u8, flags: KeyFlags) -> Self {
        Self { flags, keycode }
    }

    /// Plain HID keyboard page key, without any flags
    pub const fn hid(keycode: u8) -> Self {
        Self::new(keycode, KeyFlags::new())
    }

    pub const fn from_raw(raw: u16) -> Self {
        Self {
            flags: KeyFlags::from_bits((raw >> 8) as u8),
            keycode: (raw & 0xFF) as u8,
        }
    }

    pub const fn raw(&self) -> u16 {
        ((self.flags.into_bits() as u16) << 8) | self.keycode as u16
    }

    /// Whether the key is a normal key which can be recorded into a macro
    pub const fn is_recordable(&self) -> bool {
        !self.flags.synthetic() && !self.flags.reserved()
    }
}

/// Raw value of the record key, the first key of the live macro range.
pub const LIVE_MACRO_RECORD: u16 = 0xC0A0;

/// Raw value of the first slot key, slot `n` is `LIVE_MACRO_SLOT_0 + n`.
pub const LIVE_MACRO_SLOT_0: u16 = LIVE_MACRO_RECORD + 1;

/// Keys handled by the live macro engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LiveMacroKey {
    /// Start a recording, or discard the current one
    Record,
    /// Macro slot, plays the macro when idle and saves the recording when recording
    Slot(u8),
}

impl LiveMacroKey {
    /// Convert a key in the keymap to a live macro key.
    /// Slot keys beyond `TOTAL_SLOTS` are not live macro keys.
    pub fn from_key(key: Key) -> Option<Self> {
        let raw = key.raw();
        if raw == LIVE_MACRO_RECORD {
            Some(LiveMacroKey::Record)
        } else if raw >= LIVE_MACRO_SLOT_0 && ((raw - LIVE_MACRO_SLOT_0) as usize) < TOTAL_SLOTS {
            Some(LiveMacroKey::Slot((raw - LIVE_MACRO_SLOT_0) as u8))
        } else {
            None
        }
    }

    /// The key to put in the keymap
    pub const fn key(self) -> Key {
        match self {
            LiveMacroKey::Record => Key::from_raw(LIVE_MACRO_RECORD),
            LiveMacroKey::Slot(n) => Key::from_raw(LIVE_MACRO_SLOT_0 + n as u16),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_raw_key_roundtrip() {
        let key = Key::from_raw(0x0804);
        assert!(key.flags.shift_held());
        assert!(!key.flags.ctrl_held());
        assert_eq!(key.keycode, 0x04);
        assert_eq!(key.raw(), 0x0804);
        assert!(key.is_recordable());
    }

    #[test]
    fn test_live_macro_keys_are_reserved() {
        let record = LiveMacroKey::Record.key();
        assert!(record.flags.reserved());
        assert!(!record.is_recordable());
        for slot in 0..TOTAL_SLOTS as u8 {
            let key = LiveMacroKey::Slot(slot).key();
            assert!(!key.is_recordable());
            assert_eq!(LiveMacroKey::from_key(key), Some(LiveMacroKey::Slot(slot)));
        }
        assert_eq!(LiveMacroKey::from_key(record), Some(LiveMacroKey::Record));
    }

    #[test]
    fn test_slot_key_out_of_range() {
        let key = Key::from_raw(LIVE_MACRO_SLOT_0 + TOTAL_SLOTS as u16);
        assert_eq!(LiveMacroKey::from_key(key), None);
        assert_eq!(LiveMacroKey::from_key(Key::hid(0x04)), None);
        assert_eq!(LiveMacroKey::from_key(Key::NO), None);
    }
}

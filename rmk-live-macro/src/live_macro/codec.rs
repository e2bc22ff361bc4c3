//! Two-byte encoding of a recorded key transition.
//!
//! byte0: the key flags, with bit 7 set if the transition is a press
//! byte1: the keycode
//!
//! Only non-reserved keys are recorded, so bit 7 of the flags is free to use as the press marker.
use crate::event::{KeyEvent, KeySwitchState};
use crate::keycode::{Key, KeyFlags};

/// Marks a key press in the first byte of an encoded event
const KEY_PRESSED: u8 = 0b1000_0000;
const KEY_FLAGS_MASK: u8 = 0b0111_1111;

/// One recorded key transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacroEvent {
    pub pressed: bool,
    pub key: Key,
}

impl MacroEvent {
    pub const fn new(key: Key, pressed: bool) -> Self {
        Self { pressed, key }
    }

    pub const fn press(key: Key) -> Self {
        Self::new(key, true)
    }

    pub const fn release(key: Key) -> Self {
        Self::new(key, false)
    }

    /// Record a key switch event
    pub const fn from_key_event(event: &KeyEvent) -> Self {
        Self::new(event.key, event.state.toggled_on())
    }

    pub const fn encode(&self) -> [u8; 2] {
        let flags = self.key.flags.into_bits() & KEY_FLAGS_MASK;
        let flags = if self.pressed { flags | KEY_PRESSED } else { flags };
        [flags, self.key.keycode]
    }

    pub const fn decode(bytes: [u8; 2]) -> Self {
        Self {
            pressed: bytes[0] & KEY_PRESSED != 0,
            key: Key::new(bytes[1], KeyFlags::from_bits(bytes[0] & KEY_FLAGS_MASK)),
        }
    }

    /// The key switch event to replay, tagged as injected
    pub const fn to_injected_event(&self) -> KeyEvent {
        let state = if self.pressed {
            KeySwitchState::pressed()
        } else {
            KeySwitchState::released()
        };
        KeyEvent::new(self.key, None, state.with_injected(true))
    }
}

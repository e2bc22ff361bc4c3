use bitfield_struct::bitfield;

use crate::keycode::Key;

/// Physical position of a key switch in the matrix
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyAddr {
    pub row: u8,
    pub col: u8,
}

impl KeyAddr {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// State of a key switch, in the current scan and the previous one
#[bitfield(u8, order = Lsb)]
#[derive(Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySwitchState {
    #[bits(1)]
    pub is_pressed: bool,
    #[bits(1)]
    pub was_pressed: bool,
    #[bits(2)]
    __reserved: u8,
    /// The event is generated by firmware, not by a physical key switch
    #[bits(1)]
    pub injected: bool,
    #[bits(3)]
    __unused: u8,
}

impl KeySwitchState {
    /// The key switch was just pressed
    pub const fn pressed() -> Self {
        Self::new().with_is_pressed(true)
    }

    /// The key switch was just released
    pub const fn released() -> Self {
        Self::new().with_was_pressed(true)
    }

    pub const fn toggled_on(&self) -> bool {
        self.is_pressed() && !self.was_pressed()
    }

    pub const fn toggled_off(&self) -> bool {
        self.was_pressed() && !self.is_pressed()
    }
}

/// A key switch event, delivered once per key transition by the key event pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    /// The key mapped to the key switch on the active layer
    pub key: Key,
    /// Position of the key switch, `None` for events which don't come from the matrix
    pub addr: Option<KeyAddr>,
    pub state: KeySwitchState,
}

impl KeyEvent {
    pub const fn new(key: Key, addr: Option<KeyAddr>, state: KeySwitchState) -> Self {
        Self { key, addr, state }
    }

    /// A key press or release of a normal key by the user.
    ///
    /// Synthetic, reserved and injected events are not recordable, so that a macro never records its own output.
    pub const fn is_recordable(&self) -> bool {
        (self.state.toggled_on() || self.state.toggled_off()) && self.key.is_recordable() && !self.state.injected()
    }
}

/// Result of processing an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessResult {
    /// The event is consumed, later consumers won't see it
    Stop,
    /// Pass the event to the next consumer unchanged
    Continue(KeyEvent),
}

use crate::config::TOTAL_SLOTS;
use crate::event::KeyAddr;
use crate::keycode::LiveMacroKey;
use crate::keymap::Layout;

/// Physical positions of the live macro keys on the active layer.
///
/// Used by the indicator to light the record key and the slot keys.
/// If a key appears more than once, the first position in scan order wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhysicalKeyMap {
    record: Option<KeyAddr>,
    slots: [Option<KeyAddr>; TOTAL_SLOTS],
}

impl PhysicalKeyMap {
    pub const fn new() -> Self {
        Self {
            record: None,
            slots: [None; TOTAL_SLOTS],
        }
    }

    /// Rescan the layout, call it whenever the active layer changes
    pub fn rebuild(&mut self, layout: &impl Layout) {
        *self = Self::new();
        for addr in layout.key_addrs() {
            match LiveMacroKey::from_key(layout.key_on_active_layer(addr)) {
                Some(LiveMacroKey::Record) => {
                    self.record.get_or_insert(addr);
                }
                Some(LiveMacroKey::Slot(slot)) => {
                    self.slots[slot as usize].get_or_insert(addr);
                }
                None => {}
            }
            if self.is_complete() {
                break;
            }
        }
        debug!("Live macro keys resolved, record key: {:?}", self.record);
    }

    /// Position of the record key
    pub fn record_addr(&self) -> Option<KeyAddr> {
        self.record
    }

    /// Position of a slot key, `None` if the slot isn't mapped on the active layer or doesn't exist
    pub fn slot_addr(&self, slot: u8) -> Option<KeyAddr> {
        self.slots.get(slot as usize).copied().flatten()
    }

    /// Mapped slots and their positions
    pub fn slot_addrs(&self) -> impl Iterator<Item = (u8, KeyAddr)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, addr)| addr.map(|addr| (slot as u8, addr)))
    }

    fn is_complete(&self) -> bool {
        self.record.is_some() && self.slots.iter().all(Option::is_some)
    }
}

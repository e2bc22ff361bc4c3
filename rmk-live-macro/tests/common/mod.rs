use embassy_futures::block_on;
use rmk_live_macro::event::{KeyAddr, KeyEvent, KeySwitchState, ProcessResult};
use rmk_live_macro::host::MacroHost;
use rmk_live_macro::keycode::{Key, KeyFlags, LiveMacroKey};
use rmk_live_macro::keymap::{KeyMap, Layout};
use rmk_live_macro::live_macro::LiveMacro;
use rmk_live_macro::live_macro::codec::MacroEvent;
use rmk_live_macro::storage::MacroStore;
use rmk_live_macro::storage::eeprom::RamEeprom;
use rmk_live_macro::LiveMacroConfig;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const EEPROM_SIZE: usize = 256;
/// The persistent macro region doesn't start at 0, like in a real keyboard where other settings come first
pub const STORAGE_OFFSET: usize = 0x10;

pub type TestEeprom = RamEeprom<EEPROM_SIZE>;

pub const A: Key = Key::hid(0x04);
pub const B: Key = Key::hid(0x05);
pub const C: Key = Key::hid(0x06);
pub const D: Key = Key::hid(0x07);
pub const SHIFT_A: Key = Key::from_raw(0x0804);
pub const SYNTHETIC: Key = Key::new(0x10, KeyFlags::new().with_synthetic(true));
/// A key owned by another firmware feature
pub const RESERVED: Key = Key::new(0x20, KeyFlags::new().with_reserved(true));
pub const T: Key = Key::TRANSPARENT;
pub const REC: Key = LiveMacroKey::Record.key();

pub const fn slot(n: u8) -> Key {
    LiveMacroKey::Slot(n).key()
}

// Key positions in `LAYERS`
pub const REC_KEY: (u8, u8) = (0, 0);
pub const SLOT_0: (u8, u8) = (0, 1);
pub const SLOT_1: (u8, u8) = (0, 2);
pub const SLOT_5: (u8, u8) = (0, 3);
pub const SLOT_6: (u8, u8) = (0, 4);
pub const SLOT_7: (u8, u8) = (0, 5);
pub const KEY_A: (u8, u8) = (0, 6);
pub const KEY_B: (u8, u8) = (0, 7);
pub const KEY_C: (u8, u8) = (1, 0);
pub const KEY_D: (u8, u8) = (1, 1);
pub const KEY_SHIFT_A: (u8, u8) = (1, 2);
pub const KEY_SYNTHETIC: (u8, u8) = (1, 3);
pub const KEY_RESERVED: (u8, u8) = (1, 4);

/// Layer 1 moves the record key and maps slot 2
pub static LAYERS: [[[Key; 8]; 2]; 2] = [
    [
        [REC, slot(0), slot(1), slot(5), slot(6), slot(7), A, B],
        [C, D, SHIFT_A, SYNTHETIC, RESERVED, Key::NO, Key::NO, Key::NO],
    ],
    [
        [A, T, T, T, T, T, slot(2), T],
        [T, T, T, T, T, T, T, REC],
    ],
];

/// What the engine sent to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    Event(KeyEvent),
    SendReports,
}

#[derive(Default)]
pub struct TestHost {
    pub calls: Vec<HostCall>,
}

impl MacroHost for TestHost {
    async fn handle_key_event(&mut self, event: KeyEvent) {
        self.calls.push(HostCall::Event(event));
    }

    async fn send_reports(&mut self) {
        self.calls.push(HostCall::SendReports);
    }
}

impl TestHost {
    /// The replayed events, checking that every event is flushed right after it's handled
    pub fn played(&self) -> Vec<MacroEvent> {
        assert_eq!(self.calls.len() % 2, 0, "unflushed event: {:?}", self.calls);
        self.calls
            .chunks(2)
            .map(|pair| match pair {
                [HostCall::Event(event), HostCall::SendReports] => {
                    assert!(event.state.injected());
                    assert_eq!(event.addr, None);
                    MacroEvent::new(event.key, event.state.toggled_on())
                }
                _ => panic!("events must be flushed one by one: {:?}", pair),
            })
            .collect()
    }
}

pub fn new_store() -> MacroStore<TestEeprom> {
    MacroStore::new(TestEeprom::new(), LiveMacroConfig::new(STORAGE_OFFSET))
}

/// A keyboard with the live macro engine at the head of its event pipeline
pub struct TestKeyboard {
    pub keymap: KeyMap<'static, 2, 8, 2>,
    pub engine: LiveMacro<TestEeprom>,
    pub host: TestHost,
}

impl TestKeyboard {
    pub fn new() -> Self {
        let keymap = KeyMap::new(&LAYERS);
        let mut engine = LiveMacro::new(new_store());
        engine.on_layer_change(&keymap);
        Self {
            keymap,
            engine,
            host: TestHost::default(),
        }
    }

    pub fn event(&mut self, (row, col): (u8, u8), state: KeySwitchState) -> ProcessResult {
        let addr = KeyAddr::new(row, col);
        let event = KeyEvent::new(self.keymap.key_on_active_layer(addr), Some(addr), state);
        block_on(self.engine.process(event, &mut self.host))
    }

    pub fn press(&mut self, pos: (u8, u8)) -> ProcessResult {
        self.event(pos, KeySwitchState::pressed())
    }

    pub fn release(&mut self, pos: (u8, u8)) -> ProcessResult {
        self.event(pos, KeySwitchState::released())
    }

    pub fn tap(&mut self, pos: (u8, u8)) {
        self.press(pos);
        self.release(pos);
    }

    pub fn activate_layer(&mut self, layer: u8) {
        if self.keymap.activate_layer(layer) {
            self.engine.on_layer_change(&self.keymap);
        }
    }

    /// Record a tap of each key and save it with the slot key
    pub fn record_taps(&mut self, keys: &[(u8, u8)], slot_key: (u8, u8)) {
        self.tap(REC_KEY);
        for key in keys {
            self.tap(*key);
        }
        self.tap(slot_key);
    }

    /// Play a slot and return the replayed events
    pub fn play(&mut self, slot_key: (u8, u8)) -> Vec<MacroEvent> {
        self.host.calls.clear();
        assert_eq!(self.press(slot_key), ProcessResult::Stop);
        self.release(slot_key);
        self.host.played()
    }
}

pub fn taps(keys: &[Key]) -> Vec<MacroEvent> {
    keys.iter()
        .flat_map(|key| [MacroEvent::press(*key), MacroEvent::release(*key)])
        .collect()
}

//! Live macros: record key transitions on the keyboard and replay them from a slot key.
//!
//! Press the record key, type, then press a slot key to save the recording into that slot.
//! Pressing the slot key later replays the recorded transitions into the host pipeline.
//! Saving into an occupied slot asks for confirmation: press the same slot again to replace its macro,
//! press another occupied slot to choose it instead, or press the record key to drop the recording.
pub mod codec;
pub mod recording;
pub mod resolver;
pub mod state;

use self::codec::MacroEvent;
use self::recording::RecordingBuffer;
use self::resolver::PhysicalKeyMap;
use self::state::{Action, LiveMacroState, Trigger, transition};
use crate::event::{KeyEvent, ProcessResult};
use crate::host::MacroHost;
use crate::keycode::LiveMacroKey;
use crate::keymap::Layout;
use crate::storage::eeprom::Eeprom;
use crate::storage::{MacroStore, Tier};

/// The live macro engine.
///
/// Create one instance at startup, then feed it every key switch event with [`LiveMacro::process`]
/// and call [`LiveMacro::on_layer_change`] whenever the active layer changes.
pub struct LiveMacro<E: Eeprom> {
    state: LiveMacroState,
    /// Exists iff `state` is not `Idle`
    recording: Option<RecordingBuffer>,
    key_map: PhysicalKeyMap,
    store: MacroStore<E>,
}

impl<E: Eeprom> LiveMacro<E> {
    pub fn new(store: MacroStore<E>) -> Self {
        Self {
            state: LiveMacroState::Idle,
            recording: None,
            key_map: PhysicalKeyMap::new(),
            store,
        }
    }

    /// Process a key switch event.
    ///
    /// Playing a macro replays all of its events into `host` before returning.
    pub async fn process(&mut self, event: KeyEvent, host: &mut impl MacroHost) -> ProcessResult {
        let trigger = self.trigger(&event);
        let transition = transition(self.state, trigger, self.recorded_events());

        match transition.action {
            Action::None => {}
            Action::BeginRecording => self.begin_recording(),
            Action::Discard => self.discard_recording(),
            Action::Append => self.append(MacroEvent::from_key_event(&event)),
            Action::Save(slot) => self.save(slot),
            Action::Play(slot) => self.play(slot, host).await,
        }

        if transition.next != self.state {
            debug!("Live macro state: {:?} -> {:?}", self.state, transition.next);
        }
        self.state = transition.next;
        if !self.state.is_recording() && self.recording.take().is_some() {
            warn!("Recording buffer left over in idle state, released");
        }

        if transition.consumed {
            ProcessResult::Stop
        } else {
            ProcessResult::Continue(event)
        }
    }

    /// Rescan the positions of the live macro keys on the active layer
    pub fn on_layer_change(&mut self, layout: &impl Layout) {
        self.key_map.rebuild(layout);
    }

    pub fn state(&self) -> LiveMacroState {
        self.state
    }

    /// The slot which would be overwritten by confirming
    pub fn overwrite_target(&self) -> Option<u8> {
        match self.state {
            LiveMacroState::AwaitingOverwriteConfirm { target } => Some(target),
            _ => None,
        }
    }

    /// Number of events in the current recording, 0 when idle
    pub fn recorded_events(&self) -> usize {
        self.recording.as_ref().map_or(0, RecordingBuffer::len)
    }

    /// The current recording
    pub fn recording(&self) -> Option<&RecordingBuffer> {
        self.recording.as_ref()
    }

    pub fn is_slot_occupied(&mut self, slot: u8) -> bool {
        self.store.is_occupied(slot)
    }

    pub fn slot_tier(&self, slot: u8) -> Option<Tier> {
        Tier::of(slot)
    }

    pub fn key_map(&self) -> &PhysicalKeyMap {
        &self.key_map
    }

    pub fn store(&self) -> &MacroStore<E> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MacroStore<E> {
        &mut self.store
    }

    fn trigger(&mut self, event: &KeyEvent) -> Trigger {
        if event.state.injected() {
            return Trigger::Other;
        }
        if event.state.toggled_on() {
            match LiveMacroKey::from_key(event.key) {
                Some(LiveMacroKey::Record) => return Trigger::RecordPressed,
                Some(LiveMacroKey::Slot(slot)) => {
                    return Trigger::SlotPressed {
                        slot,
                        occupied: self.store.is_occupied(slot),
                    };
                }
                None => {}
            }
        }
        if event.is_recordable() {
            Trigger::Recordable
        } else {
            Trigger::Other
        }
    }

    fn begin_recording(&mut self) {
        if self.recording.replace(RecordingBuffer::new()).is_some() {
            warn!("Stale recording buffer released");
        }
        info!("Live macro recording started");
    }

    fn discard_recording(&mut self) {
        if let Some(buffer) = self.recording.take() {
            info!("Live macro recording of {} events discarded", buffer.len());
        }
    }

    fn append(&mut self, event: MacroEvent) {
        match self.recording.as_mut() {
            Some(buffer) => {
                if !buffer.append(event) {
                    warn!("Recording buffer is full, event dropped");
                }
            }
            None => error!("Recording without a recording buffer"),
        }
    }

    fn save(&mut self, slot: u8) {
        let Some(buffer) = self.recording.take() else {
            error!("Saving to slot {} without a recording buffer", slot);
            return;
        };
        let len = buffer.len();
        match self.store.write(slot, buffer.into_record()) {
            Ok(()) => info!("Live macro of {} events saved to slot {}", len, slot),
            Err(e) => error!("Failed to save live macro to slot {}: {:?}", slot, e),
        }
    }

    async fn play(&mut self, slot: u8, host: &mut impl MacroHost) {
        let record = match self.store.read(slot) {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to read live macro in slot {}: {:?}", slot, e);
                return;
            }
        };
        debug!("Playing live macro in slot {}, {} events", slot, record.len());
        for event in record.events() {
            host.handle_key_event(event.to_injected_event()).await;
            host.send_reports().await;
        }
    }
}

//! Capture state machine.
//!
//! [`transition`] is the single place where the engine decides what an event does,
//! the engine only carries out the returned [`Action`].
use crate::config::MAX_EVENTS;

/// State of the live macro engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LiveMacroState {
    /// Not recording. Slot keys play their macros.
    #[default]
    Idle,
    /// Recording key transitions
    Recording,
    /// The recording buffer is full, waiting for a slot key or the record key
    CaptureFull,
    /// The recording is about to replace the macro in `target`, pressing `target` again confirms
    AwaitingOverwriteConfirm { target: u8 },
}

impl LiveMacroState {
    /// Whether a recording buffer exists in this state
    pub const fn is_recording(&self) -> bool {
        !matches!(self, LiveMacroState::Idle)
    }
}

/// What an incoming event means to the state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// The record key is pressed
    RecordPressed,
    /// A slot key is pressed, `occupied` is the occupancy of the slot before the event
    SlotPressed { slot: u8, occupied: bool },
    /// A qualifying key transition
    Recordable,
    /// Any other event, including releases of the live macro keys
    Other,
}

/// Side effect of a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    None,
    /// Create a fresh recording buffer
    BeginRecording,
    /// Drop the recording buffer, no slot is touched
    Discard,
    /// Append the event to the recording buffer
    Append,
    /// Move the recording buffer into the slot
    Save(u8),
    /// Replay the macro in the slot
    Play(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub next: LiveMacroState,
    pub action: Action,
    /// Whether the event is consumed. Unconsumed events are passed through unchanged.
    pub consumed: bool,
}

impl Transition {
    const fn consume(next: LiveMacroState, action: Action) -> Self {
        Self {
            next,
            action,
            consumed: true,
        }
    }

    const fn pass(next: LiveMacroState, action: Action) -> Self {
        Self {
            next,
            action,
            consumed: false,
        }
    }
}

/// Decide the next state, `recorded` is the number of events in the recording buffer.
pub fn transition(state: LiveMacroState, trigger: Trigger, recorded: usize) -> Transition {
    use LiveMacroState::*;

    match (state, trigger) {
        (Idle, Trigger::RecordPressed) => Transition::consume(Recording, Action::BeginRecording),
        (Idle, Trigger::SlotPressed { slot, occupied }) => {
            let action = if occupied { Action::Play(slot) } else { Action::None };
            Transition::consume(Idle, action)
        }
        (Idle, _) => Transition::pass(Idle, Action::None),

        (Recording | CaptureFull | AwaitingOverwriteConfirm { .. }, Trigger::RecordPressed) => {
            Transition::consume(Idle, Action::Discard)
        }

        (Recording | CaptureFull, Trigger::SlotPressed { slot, occupied }) => {
            if recorded == 0 {
                // An empty macro can't be told apart from a free slot
                Transition::consume(Idle, Action::Discard)
            } else if occupied {
                Transition::consume(AwaitingOverwriteConfirm { target: slot }, Action::None)
            } else {
                Transition::consume(Idle, Action::Save(slot))
            }
        }
        (Recording, Trigger::Recordable) => {
            if recorded + 1 >= MAX_EVENTS {
                Transition::pass(CaptureFull, Action::Append)
            } else {
                Transition::pass(Recording, Action::Append)
            }
        }
        (Recording | CaptureFull, _) => Transition::pass(state, Action::None),

        (AwaitingOverwriteConfirm { target }, Trigger::SlotPressed { slot, occupied }) => {
            if slot == target || !occupied {
                Transition::consume(Idle, Action::Save(slot))
            } else {
                Transition::consume(AwaitingOverwriteConfirm { target: slot }, Action::None)
            }
        }
        (AwaitingOverwriteConfirm { .. }, _) => Transition::consume(state, Action::None),
    }
}

#[cfg(test)]
mod test {
    use super::LiveMacroState::*;
    use super::*;

    fn slot(slot: u8, occupied: bool) -> Trigger {
        Trigger::SlotPressed { slot, occupied }
    }

    #[test]
    fn test_idle() {
        assert_eq!(
            transition(Idle, Trigger::RecordPressed, 0),
            Transition::consume(Recording, Action::BeginRecording)
        );
        assert_eq!(transition(Idle, slot(2, true), 0), Transition::consume(Idle, Action::Play(2)));
        assert_eq!(transition(Idle, slot(2, false), 0), Transition::consume(Idle, Action::None));
        assert_eq!(transition(Idle, Trigger::Recordable, 0), Transition::pass(Idle, Action::None));
        assert_eq!(transition(Idle, Trigger::Other, 0), Transition::pass(Idle, Action::None));
    }

    #[test]
    fn test_recording() {
        assert_eq!(
            transition(Recording, Trigger::Recordable, 0),
            Transition::pass(Recording, Action::Append)
        );
        assert_eq!(
            transition(Recording, Trigger::Recordable, MAX_EVENTS - 1),
            Transition::pass(CaptureFull, Action::Append)
        );
        assert_eq!(transition(Recording, Trigger::Other, 3), Transition::pass(Recording, Action::None));
        assert_eq!(
            transition(Recording, Trigger::RecordPressed, 3),
            Transition::consume(Idle, Action::Discard)
        );
        assert_eq!(transition(Recording, slot(1, false), 3), Transition::consume(Idle, Action::Save(1)));
        assert_eq!(
            transition(Recording, slot(1, true), 3),
            Transition::consume(AwaitingOverwriteConfirm { target: 1 }, Action::None)
        );
        // Saving nothing discards the recording, even over an occupied slot
        assert_eq!(transition(Recording, slot(1, true), 0), Transition::consume(Idle, Action::Discard));
    }

    #[test]
    fn test_capture_full() {
        assert_eq!(
            transition(CaptureFull, Trigger::Recordable, MAX_EVENTS),
            Transition::pass(CaptureFull, Action::None)
        );
        assert_eq!(
            transition(CaptureFull, slot(7, false), MAX_EVENTS),
            Transition::consume(Idle, Action::Save(7))
        );
        assert_eq!(
            transition(CaptureFull, slot(0, true), MAX_EVENTS),
            Transition::consume(AwaitingOverwriteConfirm { target: 0 }, Action::None)
        );
        assert_eq!(
            transition(CaptureFull, Trigger::RecordPressed, MAX_EVENTS),
            Transition::consume(Idle, Action::Discard)
        );
    }

    #[test]
    fn test_awaiting_overwrite_confirm() {
        let state = AwaitingOverwriteConfirm { target: 3 };
        assert_eq!(transition(state, slot(3, true), 2), Transition::consume(Idle, Action::Save(3)));
        assert_eq!(
            transition(state, slot(4, true), 2),
            Transition::consume(AwaitingOverwriteConfirm { target: 4 }, Action::None)
        );
        assert_eq!(transition(state, slot(5, false), 2), Transition::consume(Idle, Action::Save(5)));
        assert_eq!(transition(state, Trigger::RecordPressed, 2), Transition::consume(Idle, Action::Discard));
        assert_eq!(transition(state, Trigger::Recordable, 2), Transition::consume(state, Action::None));
        assert_eq!(transition(state, Trigger::Other, 2), Transition::consume(state, Action::None));
    }
}

use super::codec::MacroEvent;
use crate::storage::MacroRecord;

/// Events captured since the record key was pressed.
///
/// The buffer is an encoded record under construction, so the count byte always matches the appended events
/// and saving hands the record to the store as is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingBuffer {
    record: MacroRecord,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self {
            record: MacroRecord::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.record.is_full()
    }

    /// Append an event. Returns false and drops the event if the buffer is full.
    pub fn append(&mut self, event: MacroEvent) -> bool {
        self.record.push(event)
    }

    /// Captured events in order
    pub fn events(&self) -> impl Iterator<Item = MacroEvent> + '_ {
        self.record.events()
    }

    /// Finish the recording
    pub fn into_record(self) -> MacroRecord {
        self.record
    }
}

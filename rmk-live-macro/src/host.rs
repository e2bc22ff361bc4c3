//! Interface to the firmware pipeline which hosts the live macro engine.
use crate::event::KeyEvent;

/// The firmware key event pipeline, which macros are replayed into.
///
/// Playing a macro calls [`MacroHost::handle_key_event`] once for each recorded transition,
/// followed by [`MacroHost::send_reports`], so the host observes the same order as the recording.
///
/// Events passed to the host are tagged as injected.
/// If the host feeds them back to the live macro engine, they are passed through and never recorded.
pub trait MacroHost {
    /// Handle a synthesized key switch event, as if it came from the matrix
    async fn handle_key_event(&mut self, event: KeyEvent);

    /// Send the pending keyboard and mouse reports
    async fn send_reports(&mut self);
}

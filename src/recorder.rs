//! Live key-combination capture used by the settings surface.
//!
//! While recording, every key press goes through [`normalize`]. Modifier-only
//! presses and unusable keys are ignored silently so the user can keep building
//! the combination; a bare Escape abandons the capture and leaves the configured
//! binding untouched.

use crate::shortcut::{normalize, KeyEvent, Normalized, ShortcutBinding};

/// What happened to a key press fed into the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// Recorder was not listening
    Ignored,
    /// Press did not complete a binding; still listening
    Listening,
    /// A binding was captured and the recorder stopped
    Captured(ShortcutBinding),
    /// Capture was abandoned
    Cancelled,
}

#[derive(Debug, Default)]
pub struct HotkeyRecorder {
    active: bool,
    pending_binding: Option<ShortcutBinding>,
}

impl HotkeyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start listening. A recording that is already running is cancelled first.
    pub fn start(&mut self) {
        if self.active {
            log::debug!("Hotkey recorder: restart requested, cancelling previous capture");
            self.cancel();
        }
        self.pending_binding = None;
        self.active = true;
        log::info!("Hotkey recorder: listening for a key combination");
    }

    /// Stop listening and discard any partial state. Returns whether a
    /// recording was in progress.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.pending_binding = None;
        if was_active {
            log::info!("Hotkey recorder: capture cancelled");
        }
        was_active
    }

    /// Feed one key press.
    pub fn handle_key(&mut self, event: &KeyEvent) -> RecorderEvent {
        if !self.active {
            return RecorderEvent::Ignored;
        }

        match normalize(event) {
            Normalized::Binding(binding) => {
                log::info!("Hotkey recorder: captured {}", binding);
                self.active = false;
                self.pending_binding = Some(binding.clone());
                RecorderEvent::Captured(binding)
            }
            Normalized::Cancel => {
                self.cancel();
                RecorderEvent::Cancelled
            }
            Normalized::Rejected => {
                log::debug!("Hotkey recorder: ignoring key '{}'", event.code);
                RecorderEvent::Listening
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Binding captured by the last successful recording, if not yet taken.
    pub fn pending_binding(&self) -> Option<&ShortcutBinding> {
        self.pending_binding.as_ref()
    }

    /// Hand the captured binding to the caller for persisting.
    pub fn take_binding(&mut self) -> Option<ShortcutBinding> {
        self.pending_binding.take()
    }
}

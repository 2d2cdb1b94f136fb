use super::{ApplyError, TextApplier};
use arboard::Clipboard;
use async_trait::async_trait;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::thread;
use std::time::Duration;

/// Time for the OS to publish a clipboard write before pasting
const CLIPBOARD_SETTLE: Duration = Duration::from_millis(10);

/// Time for the focused app to answer a copy chord
const COPY_SETTLE: Duration = Duration::from_millis(100);

#[cfg(target_os = "macos")]
const CHORD_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const CHORD_MODIFIER: Key = Key::Control;

/// Writes the text to the system clipboard and sends the paste chord to the
/// focused window. The clipboard keeps the applied text afterwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClipboardPasteApplier;

impl ClipboardPasteApplier {
    pub fn new() -> Self {
        Self
    }
}

fn send_chord(letter: char) -> Result<(), ApplyError> {
    let mut enigo =
        Enigo::new(&Settings::default()).map_err(|e| ApplyError::Keyboard(e.to_string()))?;

    // The activation shortcut may still be held down
    for held in [Key::Shift, Key::Alt] {
        if let Err(e) = enigo.key(held, Direction::Release) {
            log::debug!("Failed to release {:?} before chord: {}", held, e);
        }
    }

    enigo
        .key(CHORD_MODIFIER, Direction::Press)
        .map_err(|e| ApplyError::Keyboard(e.to_string()))?;
    let click = enigo.key(Key::Unicode(letter), Direction::Click);
    let release = enigo.key(CHORD_MODIFIER, Direction::Release);

    click
        .and(release)
        .map_err(|e| ApplyError::Keyboard(e.to_string()))
}

fn paste_blocking(text: &str) -> Result<(), ApplyError> {
    let mut clipboard = Clipboard::new().map_err(|e| ApplyError::Clipboard(e.to_string()))?;
    clipboard
        .set_text(text)
        .map_err(|e| ApplyError::Clipboard(e.to_string()))?;

    thread::sleep(CLIPBOARD_SETTLE);
    send_chord('v')
}

fn copy_selection_blocking() -> Result<String, ApplyError> {
    send_chord('c')?;
    thread::sleep(COPY_SETTLE);

    let mut clipboard = Clipboard::new().map_err(|e| ApplyError::Clipboard(e.to_string()))?;
    clipboard
        .get_text()
        .map_err(|e| ApplyError::Clipboard(e.to_string()))
}

#[async_trait]
impl TextApplier for ClipboardPasteApplier {
    async fn apply(&self, text: &str) -> Result<(), ApplyError> {
        let text = text.to_string();
        let len = text.len();
        tokio::task::spawn_blocking(move || paste_blocking(&text))
            .await
            .map_err(|e| ApplyError::Task(e.to_string()))??;
        log::info!("Pasted {} bytes via clipboard", len);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clipboard-paste"
    }
}

/// Copy the focused app's selection and return it.
///
/// Sends the copy chord, waits briefly, then reads the clipboard. Whatever the
/// clipboard held before is replaced.
pub async fn read_selection() -> Result<String, ApplyError> {
    let text = tokio::task::spawn_blocking(copy_selection_blocking)
        .await
        .map_err(|e| ApplyError::Task(e.to_string()))??;
    log::debug!("Read {} bytes of selected text", text.len());
    Ok(text)
}

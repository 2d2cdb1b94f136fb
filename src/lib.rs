//! Grammar and style correction for text from any application.
//!
//! The user triggers a global shortcut, the selected text becomes the source
//! of a [`CorrectionSession`], a Chat Completions provider returns a corrected
//! version, and the user reviews a word-level diff before the text is pasted
//! back. The UI shell (tray, windows, global shortcut registration) sits on
//! top of this crate.

pub mod apply;
pub mod correction;
pub mod diff;
pub mod driver;
pub mod recorder;
pub mod session;
pub mod settings;
pub mod shortcut;


pub use apply::{ApplyError, TextApplier};
pub use correction::{
    correct_text, create_provider, ChatCompletionsProvider, Correction, CorrectionProvider,
    ProviderError, ProviderKind,
};
pub use diff::{diff_words, render_segments, DiffSegment, SegmentKind};
pub use driver::{FlowError, SharedSession};
pub use recorder::{HotkeyRecorder, RecorderEvent};
pub use session::{CorrectionSession, SessionError, SessionSnapshot, SessionStatus};
pub use settings::{ProviderSettings, ResolvedProviderConfig, SettingsError, SettingsStore};
pub use shortcut::{normalize, KeyEvent, Normalized, ShortcutBinding};

#[cfg(feature = "desktop")]
pub use apply::{read_selection, ClipboardPasteApplier};

/// Install the global logger. Honors `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

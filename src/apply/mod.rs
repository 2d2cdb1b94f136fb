//! Delivering accepted text to the target application.

#[cfg(feature = "desktop")]
mod clipboard;

#[cfg(feature = "desktop")]
pub use clipboard::{read_selection, ClipboardPasteApplier};

use async_trait::async_trait;

/// Errors that can occur while applying text
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Keyboard simulation error: {0}")]
    Keyboard(String),

    #[error("Apply task failed: {0}")]
    Task(String),
}

/// Trait for sinks that put accepted text where the user wants it
#[async_trait]
pub trait TextApplier: Send + Sync {
    /// Deliver `text`. Called once per apply attempt, never retried.
    async fn apply(&self, text: &str) -> Result<(), ApplyError>;

    fn name(&self) -> &'static str;
}

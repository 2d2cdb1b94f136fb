//! Async driver around [`CorrectionSession`].
//!
//! [`SharedSession`] owns the session behind a mutex and performs the provider
//! and apply calls itself. The lock is never held across an await: a ticket is
//! issued under the lock, the call runs unlocked, and the outcome is handed
//! back under the lock again. Resetting the session (new source text, cancel)
//! fires the outstanding call's cancellation token so the caller learns about
//! it immediately instead of waiting for a response that will be discarded.

use crate::apply::{ApplyError, TextApplier};
use crate::correction::{correct_text, CorrectionProvider, ProviderError};
use crate::session::{
    CorrectionSession, OperationKind, RequestTicket, SessionError, SessionSnapshot, SessionStatus,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Errors surfaced by [`SharedSession`] operations
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Correction failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Apply failed: {0}")]
    Apply(#[from] ApplyError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Lock error: {0}")]
    Lock(String),
}

impl FlowError {
    /// Errors the UI should swallow rather than show: the user moved on, or
    /// pressed the shortcut again while a call was in flight.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            FlowError::Cancelled
                | FlowError::Session(SessionError::StaleResponse { .. })
                | FlowError::Session(SessionError::Busy(_))
        )
    }
}

#[derive(Default)]
struct SessionInner {
    session: CorrectionSession,
    cancel_token: Option<CancellationToken>,
}

impl SessionInner {
    fn abort_outstanding(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

/// Settles an outstanding call whose future is dropped before it completes,
/// e.g. under `tokio::time::timeout` or when the awaiting task is aborted.
/// Without it the session would stay busy until the next reset.
struct PendingCall {
    shared: SharedSession,
    ticket: RequestTicket,
    armed: bool,
}

impl PendingCall {
    fn new(shared: &SharedSession, ticket: RequestTicket) -> Self {
        Self {
            shared: shared.clone(),
            ticket,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(mut inner) = self.shared.inner.lock() else {
            return;
        };
        if inner.session.pending() != Some(self.ticket) {
            return;
        }
        inner.cancel_token = None;

        let message = "call abandoned before completion";
        let result = match self.ticket.kind() {
            OperationKind::Correction => inner.session.on_correction_failure(self.ticket, message),
            OperationKind::Apply => inner.session.on_apply_failure(self.ticket, message),
        };
        if let Err(e) = result {
            log::debug!("Session: could not settle abandoned call: {}", e);
        }
    }
}

/// Thread-safe handle to a correction session
#[derive(Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionInner>, FlowError> {
        self.inner.lock().map_err(|e| FlowError::Lock(e.to_string()))
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, FlowError> {
        Ok(self.lock()?.session.snapshot())
    }

    pub fn status(&self) -> Result<SessionStatus, FlowError> {
        Ok(self.lock()?.session.status())
    }

    /// Replace the source text, abandoning any outstanding call.
    pub fn set_source_text(&self, text: impl Into<String>) -> Result<(), FlowError> {
        let mut inner = self.lock()?;
        inner.abort_outstanding();
        inner.session.set_source_text(text);
        Ok(())
    }

    /// Entry point for text pushed in from outside (selection capture,
    /// clipboard). Behaves exactly like a user edit of the source text.
    pub fn inject_text(&self, text: impl Into<String>) -> Result<(), FlowError> {
        let text = text.into();
        log::debug!("Session: injected {} chars of source text", text.len());
        self.set_source_text(text)
    }

    pub fn edit_corrected_text(&self, text: impl Into<String>) -> Result<(), FlowError> {
        self.lock()?.session.edit_corrected_text(text)?;
        Ok(())
    }

    /// Dismiss the session from any state.
    pub fn cancel(&self) -> Result<(), FlowError> {
        let mut inner = self.lock()?;
        inner.abort_outstanding();
        inner.session.cancel();
        Ok(())
    }

    /// Request a correction and wait for it.
    ///
    /// Returns the session snapshot once the correction is ready for review.
    /// A provider failure moves the session to `Failed` and is returned as
    /// [`FlowError::Provider`].
    pub async fn request_correction(
        &self,
        provider: &dyn CorrectionProvider,
    ) -> Result<SessionSnapshot, FlowError> {
        let (request, cancel_token) = {
            let mut inner = self.lock()?;
            let request = inner.session.request_correction()?;
            let cancel_token = CancellationToken::new();
            inner.cancel_token = Some(cancel_token.clone());
            (request, cancel_token)
        };
        let mut pending = PendingCall::new(self, request.ticket);

        log::info!(
            "Session: sending {} chars to {} ({})",
            request.text.len(),
            provider.name(),
            provider.model()
        );

        let result = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                pending.disarm();
                log::debug!("Session: correction request abandoned");
                return Err(FlowError::Cancelled);
            }

            result = correct_text(provider, &request.text) => result,
        };
        pending.disarm();

        let mut inner = self.lock()?;
        if inner.session.pending() == Some(request.ticket) {
            inner.cancel_token = None;
        }

        match result {
            Ok(correction) => {
                inner.session.on_correction_success(
                    request.ticket,
                    correction.corrected,
                    correction.explanation.unwrap_or_default(),
                )?;
                Ok(inner.session.snapshot())
            }
            Err(e) => {
                inner.session.on_correction_failure(request.ticket, &e.to_string())?;
                Err(FlowError::Provider(e))
            }
        }
    }

    /// Apply the reviewed correction. On success the session resets and the
    /// applied text is returned; on failure the correction stays available.
    pub async fn apply(&self, applier: &dyn TextApplier) -> Result<String, FlowError> {
        let (request, cancel_token) = {
            let mut inner = self.lock()?;
            let request = inner.session.apply_correction()?;
            let cancel_token = CancellationToken::new();
            inner.cancel_token = Some(cancel_token.clone());
            (request, cancel_token)
        };
        let mut pending = PendingCall::new(self, request.ticket);

        log::info!("Session: applying {} chars via {}", request.text.len(), applier.name());

        let result = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                pending.disarm();
                log::debug!("Session: apply abandoned");
                return Err(FlowError::Cancelled);
            }

            result = applier.apply(&request.text) => result,
        };
        pending.disarm();

        let mut inner = self.lock()?;
        if inner.session.pending() == Some(request.ticket) {
            inner.cancel_token = None;
        }

        match result {
            Ok(()) => Ok(inner.session.on_apply_success(request.ticket)?),
            Err(e) => {
                inner.session.on_apply_failure(request.ticket, &e.to_string())?;
                Err(FlowError::Apply(e))
            }
        }
    }
}

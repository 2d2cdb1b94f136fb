//! Correction session state machine.
//!
//! A session walks a single piece of source text through
//! `Idle → AwaitingInput → Requesting → Corrected → Applying`, with `Failed` as
//! the recoverable error state. The model itself never awaits anything: the
//! caller asks for a [`RequestTicket`], performs the provider or apply call, and
//! hands the outcome back together with the ticket.
//!
//! Every reset (new source text, cancel, successful apply) bumps the session
//! generation. Outcomes carrying a ticket from an older generation, or any
//! ticket other than the one currently pending, are reported as
//! [`SessionError::StaleResponse`] and leave the session untouched.

use crate::diff::{diff_words, has_changes, render_segments, DiffSegment};
use serde::Serialize;

/// Lifecycle state of a correction session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No usable source text
    Idle,
    /// Source text present, no correction requested yet
    AwaitingInput,
    /// Correction request in flight
    Requesting,
    /// Correction available for review
    Corrected,
    /// Apply action in flight
    Applying,
    /// Last correction request failed (recoverable - can request again)
    Failed,
}

impl SessionStatus {
    /// Check if a correction can be requested from this state
    pub fn can_request(&self) -> bool {
        matches!(self, SessionStatus::AwaitingInput | SessionStatus::Failed)
    }

    /// Check if the correction can be applied from this state
    pub fn can_apply(&self) -> bool {
        matches!(self, SessionStatus::Corrected)
    }

    /// Check if an external call is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionStatus::Requesting | SessionStatus::Applying)
    }

    /// States in which the session holds a corrected text and diff
    pub fn has_correction(&self) -> bool {
        matches!(self, SessionStatus::Corrected | SessionStatus::Applying)
    }
}

/// Which external call a ticket belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Correction,
    Apply,
}

/// Identifies one outstanding external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
    seq: u64,
    kind: OperationKind,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

/// A correction request the caller must send to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRequest {
    pub ticket: RequestTicket,
    /// Trimmed source text
    pub text: String,
}

/// An apply request the caller must send to the text applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    pub ticket: RequestTicket,
    /// Current corrected text, including any edits made during review
    pub text: String,
}

/// Errors reported by session transitions.
///
/// A transition that returns an error (other than `EmptyCorrection`, see
/// [`CorrectionSession::on_correction_success`]) leaves the session unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Source text is empty")]
    EmptySource,

    #[error("Correction is empty")]
    EmptyCorrection,

    #[error("Another operation is already in flight ({0:?})")]
    Busy(SessionStatus),

    #[error("Operation not allowed in state {0:?}")]
    InvalidState(SessionStatus),

    #[error("Stale response for generation {ticket_generation} (current generation {current_generation})")]
    StaleResponse {
        ticket_generation: u64,
        current_generation: u64,
    },
}

/// Serializable view of a session for the UI shell
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub original_text: String,
    pub corrected_text: String,
    pub explanation: String,
    pub diff: Vec<DiffSegment>,
    pub has_changes: bool,
    pub generation: u64,
}

#[derive(Debug)]
pub struct CorrectionSession {
    original_text: String,
    corrected_text: String,
    explanation: String,
    /// Rendered diff (no removed segments)
    diff: Vec<DiffSegment>,
    status: SessionStatus,
    generation: u64,
    next_seq: u64,
    pending: Option<RequestTicket>,
}

impl Default for CorrectionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrectionSession {
    pub fn new() -> Self {
        Self {
            original_text: String::new(),
            corrected_text: String::new(),
            explanation: String::new(),
            diff: Vec::new(),
            status: SessionStatus::Idle,
            generation: 0,
            next_seq: 0,
            pending: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn corrected_text(&self) -> &str {
        &self.corrected_text
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn diff(&self) -> &[DiffSegment] {
        &self.diff
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ticket of the outstanding external call, if any
    pub fn pending(&self) -> Option<RequestTicket> {
        self.pending
    }

    /// Whether the correction differs from the source (false before a correction)
    pub fn has_changes(&self) -> bool {
        has_changes(&self.diff)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            original_text: self.original_text.clone(),
            corrected_text: self.corrected_text.clone(),
            explanation: self.explanation.clone(),
            diff: self.diff.clone(),
            has_changes: self.has_changes(),
            generation: self.generation,
        }
    }

    /// Replace the source text, from user edits or external injection.
    ///
    /// Always succeeds. Any outstanding call is orphaned: its outcome will be
    /// reported as stale.
    pub fn set_source_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.pending.is_some() {
            log::debug!(
                "Session: source text replaced while {:?}; outstanding response will be discarded",
                self.status
            );
        }
        self.reset();
        self.status = if text.trim().is_empty() {
            SessionStatus::Idle
        } else {
            SessionStatus::AwaitingInput
        };
        self.original_text = text;
    }

    /// Begin a correction request.
    pub fn request_correction(&mut self) -> Result<CorrectionRequest, SessionError> {
        if self.status.is_busy() {
            log::debug!("Session: correction requested while {:?}; ignoring", self.status);
            return Err(SessionError::Busy(self.status));
        }

        let text = self.original_text.trim();
        if text.is_empty() {
            log::debug!("Session: correction requested with empty source text; ignoring");
            return Err(SessionError::EmptySource);
        }

        if !self.status.can_request() {
            return Err(SessionError::InvalidState(self.status));
        }

        let text = text.to_string();
        let ticket = self.issue_ticket(OperationKind::Correction);
        self.status = SessionStatus::Requesting;
        log::info!(
            "Session: correction requested ({} chars, generation {})",
            text.len(),
            self.generation
        );
        Ok(CorrectionRequest { ticket, text })
    }

    /// Deliver a successful provider response.
    ///
    /// A blank correction is treated as a provider failure: the session moves
    /// to `Failed` and `EmptyCorrection` is returned.
    pub fn on_correction_success(
        &mut self,
        ticket: RequestTicket,
        corrected: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.resolve_pending(ticket, OperationKind::Correction)?;

        let corrected = corrected.into();
        if corrected.trim().is_empty() {
            log::warn!("Session: provider returned an empty correction");
            self.status = SessionStatus::Failed;
            return Err(SessionError::EmptyCorrection);
        }

        self.diff = render_segments(&diff_words(self.original_text.trim(), &corrected));
        self.corrected_text = corrected;
        self.explanation = explanation.into();
        self.status = SessionStatus::Corrected;
        log::info!(
            "Session: correction ready ({} segments, changed: {})",
            self.diff.len(),
            self.has_changes()
        );
        Ok(())
    }

    /// Deliver a failed provider response. The message is for display only.
    pub fn on_correction_failure(
        &mut self,
        ticket: RequestTicket,
        message: &str,
    ) -> Result<(), SessionError> {
        self.resolve_pending(ticket, OperationKind::Correction)?;
        log::warn!("Session: correction failed: {}", message);
        self.status = SessionStatus::Failed;
        Ok(())
    }

    /// Replace the corrected text during review and recompute the diff.
    pub fn edit_corrected_text(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        if self.status != SessionStatus::Corrected {
            return Err(SessionError::InvalidState(self.status));
        }
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SessionError::EmptyCorrection);
        }
        self.diff = render_segments(&diff_words(self.original_text.trim(), &text));
        self.corrected_text = text;
        Ok(())
    }

    /// Begin applying the reviewed correction.
    pub fn apply_correction(&mut self) -> Result<ApplyRequest, SessionError> {
        if self.status.is_busy() {
            log::debug!("Session: apply requested while {:?}; ignoring", self.status);
            return Err(SessionError::Busy(self.status));
        }
        if !self.status.can_apply() {
            return Err(SessionError::InvalidState(self.status));
        }

        let ticket = self.issue_ticket(OperationKind::Apply);
        self.status = SessionStatus::Applying;
        log::info!("Session: applying correction (generation {})", self.generation);
        Ok(ApplyRequest {
            ticket,
            text: self.corrected_text.clone(),
        })
    }

    /// Apply succeeded: the session is finished and reset. Returns the text
    /// that was applied.
    pub fn on_apply_success(&mut self, ticket: RequestTicket) -> Result<String, SessionError> {
        self.resolve_pending(ticket, OperationKind::Apply)?;
        let applied = std::mem::take(&mut self.corrected_text);
        self.original_text.clear();
        self.reset();
        log::info!("Session: correction applied");
        Ok(applied)
    }

    /// Apply failed: return to review with the correction intact.
    pub fn on_apply_failure(
        &mut self,
        ticket: RequestTicket,
        message: &str,
    ) -> Result<(), SessionError> {
        self.resolve_pending(ticket, OperationKind::Apply)?;
        log::warn!("Session: apply failed: {}", message);
        self.status = SessionStatus::Corrected;
        Ok(())
    }

    /// Dismiss the session from any state. Nothing is persisted and any
    /// outstanding call becomes stale.
    pub fn cancel(&mut self) {
        if self.status != SessionStatus::Idle || self.pending.is_some() {
            log::info!("Session: cancelled from {:?}", self.status);
        }
        self.original_text.clear();
        self.reset();
    }

    fn issue_ticket(&mut self, kind: OperationKind) -> RequestTicket {
        let ticket = RequestTicket {
            generation: self.generation,
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;
        self.pending = Some(ticket);
        ticket
    }

    fn resolve_pending(
        &mut self,
        ticket: RequestTicket,
        expected: OperationKind,
    ) -> Result<(), SessionError> {
        if ticket.kind == expected && self.pending == Some(ticket) {
            self.pending = None;
            return Ok(());
        }
        log::debug!(
            "Session: discarding stale {:?} response (generation {}, current {})",
            ticket.kind,
            ticket.generation,
            self.generation
        );
        Err(SessionError::StaleResponse {
            ticket_generation: ticket.generation,
            current_generation: self.generation,
        })
    }

    /// Start a new generation with no correction data. `original_text` is
    /// left to the caller.
    fn reset(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.corrected_text.clear();
        self.explanation.clear();
        self.diff.clear();
        self.status = SessionStatus::Idle;
    }
}

//! Word-level diff between the original text and a correction.
//!
//! Both strings are split into tokens where a token is either a maximal run of
//! non-whitespace characters or a maximal run of whitespace. Keeping whitespace
//! runs as tokens means spacing changes survive the diff exactly. The tokens are
//! aligned with Myers' algorithm, which yields a minimal edit script in
//! O((N+M)·D) time, and the result is reported as a list of [`DiffSegment`]s.

use serde::{Deserialize, Serialize};
use similar::algorithms::{myers, DiffHook};
use std::convert::Infallible;

/// How a segment relates the original text to the corrected text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

/// A contiguous run of text with a single [`SegmentKind`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffSegment {
    pub text: String,
    pub kind: SegmentKind,
}

impl DiffSegment {
    pub fn new(text: impl Into<String>, kind: SegmentKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Split text into alternating runs of whitespace and non-whitespace.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current_is_space: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match current_is_space {
            Some(prev) if prev != is_space => {
                tokens.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        current_is_space = Some(is_space);
    }

    if start < text.len() {
        tokens.push(&text[start..]);
    }

    tokens
}

/// Collects diff callbacks into merged segments.
struct SegmentCollector<'a> {
    old: &'a [&'a str],
    new: &'a [&'a str],
    segments: Vec<DiffSegment>,
}

impl<'a> SegmentCollector<'a> {
    fn push(&mut self, tokens: &[&str], kind: SegmentKind) {
        if tokens.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(last) if last.kind == kind => last.text.extend(tokens.iter().copied()),
            _ => self.segments.push(DiffSegment::new(tokens.concat(), kind)),
        }
    }
}

impl DiffHook for SegmentCollector<'_> {
    type Error = Infallible;

    fn equal(&mut self, old_index: usize, _new_index: usize, len: usize) -> Result<(), Infallible> {
        let old = self.old;
        self.push(&old[old_index..old_index + len], SegmentKind::Unchanged);
        Ok(())
    }

    fn delete(
        &mut self,
        old_index: usize,
        old_len: usize,
        _new_index: usize,
    ) -> Result<(), Infallible> {
        let old = self.old;
        self.push(&old[old_index..old_index + old_len], SegmentKind::Removed);
        Ok(())
    }

    fn insert(
        &mut self,
        _old_index: usize,
        new_index: usize,
        new_len: usize,
    ) -> Result<(), Infallible> {
        let new = self.new;
        self.push(&new[new_index..new_index + new_len], SegmentKind::Added);
        Ok(())
    }
}

/// Compute the full edit script between `original` and `corrected`.
///
/// The result includes `Removed` segments; use [`render_segments`] to get the
/// display form. Never fails: empty or whitespace-only inputs simply produce
/// empty or whitespace-only segments.
pub fn diff_words(original: &str, corrected: &str) -> Vec<DiffSegment> {
    let old = tokenize(original);
    let new = tokenize(corrected);

    let mut collector = SegmentCollector {
        old: &old,
        new: &new,
        segments: Vec::new(),
    };

    match myers::diff(&mut collector, &old[..], 0..old.len(), &new[..], 0..new.len()) {
        Ok(()) => {}
        Err(never) => match never {},
    }

    collector.segments
}

/// Reduce an edit script to what the user sees: removed text is dropped and
/// neighbouring segments of the same kind are merged.
///
/// Concatenating the returned texts yields the corrected string.
pub fn render_segments(segments: &[DiffSegment]) -> Vec<DiffSegment> {
    let mut rendered: Vec<DiffSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.kind == SegmentKind::Removed || segment.text.is_empty() {
            continue;
        }
        match rendered.last_mut() {
            Some(last) if last.kind == segment.kind => last.text.push_str(&segment.text),
            _ => rendered.push(segment.clone()),
        }
    }
    rendered
}

/// Whether the segments contain any insertion or removal.
pub fn has_changes(segments: &[DiffSegment]) -> bool {
    segments.iter().any(|s| s.kind != SegmentKind::Unchanged)
}

/// Rebuild the corrected text from an edit script or its rendered form.
pub fn corrected_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Removed)
        .map(|s| s.text.as_str())
        .collect()
}

/// Rebuild the original text from a full edit script.
pub fn original_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.kind != SegmentKind::Added)
        .map(|s| s.text.as_str())
        .collect()
}

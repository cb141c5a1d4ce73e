//! Chat export line parser.
//!
//! Header lines look like `[D.M.Y, H:MM:SS] Sender: Body`; any other non-blank
//! line continues the message above it. A header with an empty body takes its
//! text from the lines after it and is dropped if none follow. Parsing is a
//! two-state machine:
//!
//! - **AwaitingMessageStart** — no message open; stray lines are dropped
//! - **InMessageBody** — a message is open; stray lines are continuations
//!
//! Malformed input is never fatal. System placeholders (pending-message and
//! deletion notices) are suppressed together with their continuation lines.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, trace};

use chatmine_shared::TranscriptConfig;

use crate::normalize::clean_text;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A message as written in the transcript, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub date: String,
    pub time: String,
    pub sender: String,
    pub text: String,
}

/// Parser output with line accounting.
#[derive(Debug, Clone, Default)]
pub struct ParsedTranscript {
    /// Completed messages in transcript order.
    pub entries: Vec<RawEntry>,
    /// Non-blank lines that were neither a header nor a continuation.
    pub skipped_lines: usize,
    /// Header lines (plus their continuations) dropped as system placeholders.
    pub suppressed: usize,
}

impl ParsedTranscript {
    /// Record a completed entry. A header whose body never received any
    /// text is not a message.
    fn flush(&mut self, entry: RawEntry) {
        if entry.text.is_empty() {
            self.skipped_lines += 1;
        } else {
            self.entries.push(entry);
        }
    }
}

enum State {
    AwaitingMessageStart,
    InMessageBody(RawEntry),
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `[12.3.2024, 9:15:02] Sender: Body` (also `/` date separators and
/// times without seconds).
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[(\d{1,2}[./]\d{1,2}[./]\d{2,4}),?\s*(\d{1,2}:\d{2}(?::\d{2})?)\]\s*([^:]+):\s*(.*)$",
    )
    .expect("header regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Line parser configured with the system placeholder markers.
#[derive(Debug, Clone)]
pub struct TranscriptParser {
    placeholders: Vec<String>,
}

impl TranscriptParser {
    pub fn new(config: &TranscriptConfig) -> Self {
        Self {
            placeholders: config
                .placeholders
                .iter()
                .filter(|p| !p.trim().is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Whether a body is a system placeholder that carries no content.
    pub fn is_placeholder(&self, body: &str) -> bool {
        contains_placeholder(body, &self.placeholders)
    }

    /// Parse raw transcript lines into completed entries.
    #[instrument(skip_all)]
    pub fn parse<I, S>(&self, lines: I) -> ParsedTranscript
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = ParsedTranscript::default();
        let mut state = State::AwaitingMessageStart;

        for raw in lines {
            let line = clean_text(raw.as_ref());
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = HEADER_RE.captures(&line) {
                // Any header closes the open message.
                if let State::InMessageBody(entry) =
                    std::mem::replace(&mut state, State::AwaitingMessageStart)
                {
                    out.flush(entry);
                }

                let body = clean_text(&caps[4]);
                if self.is_placeholder(&body) {
                    trace!(date = &caps[1], time = &caps[2], "suppressed system placeholder");
                    out.suppressed += 1;
                    continue;
                }

                state = State::InMessageBody(RawEntry {
                    date: caps[1].to_string(),
                    time: caps[2].to_string(),
                    sender: clean_text(&caps[3]),
                    text: body,
                });
                continue;
            }

            match &mut state {
                State::InMessageBody(entry) => {
                    if !entry.text.is_empty() {
                        entry.text.push('\n');
                    }
                    entry.text.push_str(&line);
                }
                State::AwaitingMessageStart => {
                    out.skipped_lines += 1;
                }
            }
        }

        if let State::InMessageBody(entry) = state {
            out.flush(entry);
        }

        debug!(
            entries = out.entries.len(),
            skipped_lines = out.skipped_lines,
            suppressed = out.suppressed,
            "transcript parsed"
        );

        out
    }
}

/// Substring match against the configured placeholder markers.
pub(crate) fn contains_placeholder(text: &str, placeholders: &[String]) -> bool {
    placeholders.iter().any(|p| text.contains(p.as_str()))
}

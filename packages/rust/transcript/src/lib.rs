//! Transcript ingestion for chatmine.
//!
//! Turns raw chat-export lines into classified [`Message`] records:
//! - [`normalize`] — display cleanup and comparison keys
//! - [`parser`] — the header/continuation state machine
//! - [`classify`] — manager role, media, noise, and operational content

pub mod classify;
pub mod normalize;
pub mod parser;

use tracing::{info, instrument};

use chatmine_shared::Message;

pub use classify::Classifier;
pub use normalize::{char_len, clean_text, normalize, normalize_for_key, truncate_chars};
pub use parser::{ParsedTranscript, RawEntry, TranscriptParser};

/// Classified messages plus parser line accounting.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub messages: Vec<Message>,
    /// Non-blank lines outside any message.
    pub skipped_lines: usize,
    /// System placeholder messages dropped.
    pub suppressed: usize,
}

impl ParseReport {
    pub fn manager_messages(&self) -> usize {
        self.messages.iter().filter(|m| m.is_manager).count()
    }
}

/// Parse and classify a transcript in one pass.
#[instrument(skip_all)]
pub fn parse_transcript<I, S>(
    lines: I,
    parser: &TranscriptParser,
    classifier: &Classifier,
) -> ParseReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parsed = parser.parse(lines);
    let messages: Vec<Message> = parsed
        .entries
        .into_iter()
        .map(|entry| classifier.classify(entry))
        .collect();

    let report = ParseReport {
        messages,
        skipped_lines: parsed.skipped_lines,
        suppressed: parsed.suppressed,
    };

    info!(
        messages = report.messages.len(),
        manager_messages = report.manager_messages(),
        skipped_lines = report.skipped_lines,
        suppressed = report.suppressed,
        "transcript loaded"
    );

    report
}

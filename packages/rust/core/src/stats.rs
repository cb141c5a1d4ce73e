//! Transcript statistics for the `stats` command.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use chatmine_shared::{AppConfig, Message};
use chatmine_transcript::{ParseReport, char_len, normalize};

use crate::cluster::compare_chat_dates;

/// Length bounds (in characters) for question frequency counting.
const QUESTION_CHARS: (usize, usize) = (5, 200);

/// Length bounds (in characters) for answer frequency counting.
const ANSWER_CHARS: (usize, usize) = (5, 300);

/// Normalized texts shorter than this are not counted.
const MIN_NORMALIZED_CHARS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptStats {
    pub total_messages: usize,
    pub participants: usize,
    pub manager_messages: usize,
    pub media_messages: usize,
    pub media_by_type: BTreeMap<String, usize>,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub skipped_lines: usize,
    pub suppressed: usize,
    pub messages_per_manager: Vec<ManagerActivity>,
    pub top_questions: Vec<FrequentText>,
    pub top_answers: Vec<FrequentText>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerActivity {
    pub id: String,
    pub name: String,
    pub messages: usize,
}

/// A text that recurs after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequentText {
    /// First raw occurrence.
    pub example: String,
    pub count: usize,
}

/// Compute statistics over a parsed transcript.
pub fn compute_stats(report: &ParseReport, config: &AppConfig, top_n: usize) -> TranscriptStats {
    let messages = &report.messages;

    let mut senders: Vec<&str> = messages.iter().map(|m| m.sender.as_str()).collect();
    senders.sort_unstable();
    senders.dedup();

    let mut media_by_type: BTreeMap<String, usize> = BTreeMap::new();
    for media in messages.iter().filter_map(|m| m.media.as_ref()) {
        *media_by_type.entry(media.media_type.to_string()).or_default() += 1;
    }

    let first_date = messages
        .iter()
        .map(|m| m.date.as_str())
        .min_by(|a, b| compare_chat_dates(a, b))
        .map(str::to_string);
    let last_date = messages
        .iter()
        .map(|m| m.date.as_str())
        .max_by(|a, b| compare_chat_dates(a, b))
        .map(str::to_string);

    let mut per_manager: HashMap<&str, usize> = HashMap::new();
    for id in messages.iter().filter_map(|m| m.manager_id.as_deref()) {
        *per_manager.entry(id).or_default() += 1;
    }
    let mut messages_per_manager: Vec<ManagerActivity> = per_manager
        .into_iter()
        .map(|(id, count)| ManagerActivity {
            id: id.to_string(),
            name: config.manager_label(id).unwrap_or(id).to_string(),
            messages: count,
        })
        .collect();
    messages_per_manager.sort_by(|a, b| b.messages.cmp(&a.messages).then_with(|| a.id.cmp(&b.id)));

    let top_questions = frequent_texts(
        messages.iter().filter(|m| !m.is_manager && !m.is_media()),
        QUESTION_CHARS,
        top_n,
    );
    let top_answers = frequent_texts(
        messages.iter().filter(|m| m.is_manager && !m.is_media()),
        ANSWER_CHARS,
        top_n,
    );

    TranscriptStats {
        total_messages: messages.len(),
        participants: senders.len(),
        manager_messages: report.manager_messages(),
        media_messages: messages.iter().filter(|m| m.is_media()).count(),
        media_by_type,
        first_date,
        last_date,
        skipped_lines: report.skipped_lines,
        suppressed: report.suppressed,
        messages_per_manager,
        top_questions,
        top_answers,
    }
}

/// Texts seen at least twice after normalization, most frequent first.
fn frequent_texts<'a>(
    messages: impl Iterator<Item = &'a Message>,
    (min_chars, max_chars): (usize, usize),
    top_n: usize,
) -> Vec<FrequentText> {
    let mut counted: Vec<FrequentText> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for msg in messages {
        let len = char_len(msg.text.trim());
        if len < min_chars || len > max_chars {
            continue;
        }
        let key = normalize(&msg.text);
        if char_len(&key) < MIN_NORMALIZED_CHARS {
            continue;
        }
        match index.get(&key) {
            Some(&slot) => counted[slot].count += 1,
            None => {
                index.insert(key, counted.len());
                counted.push(FrequentText {
                    example: msg.text.clone(),
                    count: 1,
                });
            }
        }
    }

    let mut frequent: Vec<FrequentText> = counted.into_iter().filter(|f| f.count >= 2).collect();
    frequent.sort_by(|a, b| b.count.cmp(&a.count));
    frequent.truncate(top_n);
    frequent
}

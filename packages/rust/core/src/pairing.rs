//! Positional question/answer pairing.
//!
//! Pairing is approximate: the nearest qualifying message inside a bounded
//! window wins. Wrong pairings are expected and get filtered out later by
//! repetition thresholds.

use chatmine_shared::{MediaInfo, Message, MiningConfig, QaPair};
use chatmine_transcript::{Classifier, char_len};

/// Window sizes and candidate filters for the pairing engine.
#[derive(Debug, Clone)]
pub struct PairingRules {
    /// Messages searched backward from an answer.
    pub question_window: usize,
    /// Messages searched forward from a question.
    pub answer_window: usize,
    /// Messages searched forward for follow-up media.
    pub media_lookahead: usize,
    pub min_question_chars: usize,
    pub min_answer_chars: usize,
    pub skip_media_questions: bool,
    pub skip_noise_questions: bool,
}

impl From<&MiningConfig> for PairingRules {
    fn from(config: &MiningConfig) -> Self {
        Self {
            question_window: config.question_window,
            answer_window: config.answer_window,
            media_lookahead: config.media_lookahead,
            min_question_chars: config.min_question_chars,
            min_answer_chars: config.min_answer_chars,
            skip_media_questions: config.skip_media_questions,
            skip_noise_questions: config.skip_noise_questions,
        }
    }
}

impl Default for PairingRules {
    fn default() -> Self {
        Self::from(&MiningConfig::default())
    }
}

/// Index of the nearest plausible question before `answer_idx`.
///
/// Scans `answer_idx - 1` down to `answer_idx - question_window` (clamped at
/// the start of the transcript).
pub fn find_question(
    messages: &[Message],
    answer_idx: usize,
    classifier: &Classifier,
    rules: &PairingRules,
) -> Option<usize> {
    let end = answer_idx.min(messages.len());
    let start = end.saturating_sub(rules.question_window);

    (start..end)
        .rev()
        .find(|&j| is_question_candidate(&messages[j], classifier, rules))
}

fn is_question_candidate(msg: &Message, classifier: &Classifier, rules: &PairingRules) -> bool {
    if msg.is_manager || classifier.is_placeholder(&msg.text) {
        return false;
    }
    if char_len(msg.text.trim()) < rules.min_question_chars {
        return false;
    }
    if rules.skip_media_questions && msg.is_media() {
        return false;
    }
    if rules.skip_noise_questions && classifier.is_noise(&msg.text) {
        return false;
    }
    true
}

/// Index of the first substantive manager reply after `question_idx`.
///
/// Scans `question_idx + 1 ..= question_idx + answer_window`. Media replies are
/// ignored; noise and too-short manager replies are skipped.
pub fn find_answer(
    messages: &[Message],
    question_idx: usize,
    classifier: &Classifier,
    rules: &PairingRules,
) -> Option<usize> {
    let start = question_idx.saturating_add(1);
    let end = question_idx
        .saturating_add(rules.answer_window)
        .saturating_add(1)
        .min(messages.len());

    (start..end).find(|&j| {
        let msg = &messages[j];
        msg.is_manager
            && !msg.is_media()
            && !classifier.is_noise(&msg.text)
            && char_len(msg.text.trim()) >= rules.min_answer_chars
    })
}

/// The answer's own media plus media the same manager sent right after it.
///
/// Non-manager messages in between are passed over; a message from a
/// different manager ends the scan.
pub fn follow_up_media(messages: &[Message], answer_idx: usize, lookahead: usize) -> Vec<MediaInfo> {
    let Some(answer) = messages.get(answer_idx) else {
        return Vec::new();
    };

    let mut media: Vec<MediaInfo> = answer.media.iter().cloned().collect();
    let Some(manager) = answer.manager_id.as_deref() else {
        return media;
    };

    for next in messages.iter().skip(answer_idx + 1).take(lookahead) {
        match next.manager_id.as_deref() {
            Some(id) if id == manager => media.extend(next.media.iter().cloned()),
            Some(_) => break,
            None => {}
        }
    }

    media
}

/// Build the pair for the manager message at `answer_idx`.
pub fn pair_answer(
    messages: &[Message],
    answer_idx: usize,
    classifier: &Classifier,
    rules: &PairingRules,
) -> Option<QaPair> {
    let answer = messages.get(answer_idx)?;
    let question = find_question(messages, answer_idx, classifier, rules).map(|j| &messages[j]);

    Some(QaPair {
        question: question.map(|q| q.text.clone()),
        question_sender: question.map(|q| q.sender.clone()),
        answer: answer.text.clone(),
        answer_sender: answer.sender.clone(),
        date: answer.date.clone(),
        time: answer.time.clone(),
        is_media_answer: answer.is_media(),
        manager_id: answer.manager_id.clone(),
        media: answer.media.clone(),
        associated_media: follow_up_media(messages, answer_idx, rules.media_lookahead),
    })
}

/// Pair every manager message in chat order.
pub fn pair_all(messages: &[Message], classifier: &Classifier, rules: &PairingRules) -> Vec<QaPair> {
    messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_manager)
        .filter_map(|(i, _)| pair_answer(messages, i, classifier, rules))
        .collect()
}

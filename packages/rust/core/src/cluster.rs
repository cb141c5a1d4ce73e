//! Answer clustering and promotion.
//!
//! Pairs are grouped by a lexical key: `MEDIA:<filename>` for attachments with
//! a known name, otherwise the capped normalized answer text. Clusters keep
//! chat order; an explicit key index backs the lookup so output order never
//! depends on hash-map iteration.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, trace};

use chatmine_shared::{MediaInfo, MiningConfig, QaPair};
use chatmine_transcript::{Classifier, char_len, normalize_for_key};

/// Prefix of media cluster keys.
pub const MEDIA_KEY_PREFIX: &str = "MEDIA:";

/// Clustering parameters.
#[derive(Debug, Clone)]
pub struct ClusterRules {
    pub answer_key_chars: usize,
    pub min_key_chars: usize,
    pub repetition_threshold: usize,
    pub example_question_cap: usize,
    pub associated_media_cap: usize,
}

impl From<&MiningConfig> for ClusterRules {
    fn from(config: &MiningConfig) -> Self {
        Self {
            answer_key_chars: config.answer_key_chars,
            min_key_chars: config.min_key_chars,
            repetition_threshold: config.repetition_threshold,
            example_question_cap: config.example_question_cap,
            associated_media_cap: config.associated_media_cap,
        }
    }
}

impl Default for ClusterRules {
    fn default() -> Self {
        Self::from(&MiningConfig::default())
    }
}

/// Who gave the answers in a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// Every attributed occurrence came from this identity.
    Manager(String),
    /// More than one identity gave this answer.
    MultipleManagers,
    /// No occurrence carries an identity.
    Unattributed,
}

/// A group of pairs sharing one answer key.
#[derive(Debug, Clone)]
pub struct AnswerCluster {
    pub key: String,
    /// Member pairs in chat order; never empty.
    pub occurrences: Vec<QaPair>,
    /// Distinct non-empty questions, first-seen order, capped.
    pub example_questions: Vec<String>,
    /// Distinct (by filename) media across occurrences, capped.
    pub associated_media: Vec<MediaInfo>,
    /// Latest occurrence date as written in the transcript.
    pub last_date: String,
    pub attribution: Attribution,
}

impl AnswerCluster {
    pub fn count(&self) -> usize {
        self.occurrences.len()
    }

    /// The first occurrence in chat order.
    pub fn canonical(&self) -> &QaPair {
        &self.occurrences[0]
    }

    pub fn is_media(&self) -> bool {
        self.key.starts_with(MEDIA_KEY_PREFIX)
    }
}

/// Clustering key for a pair, or `None` when the key is too short to be
/// meaningful.
pub fn cluster_key(pair: &QaPair, rules: &ClusterRules) -> Option<String> {
    let media_name = pair
        .media
        .as_ref()
        .filter(|_| pair.is_media_answer)
        .and_then(|m| m.filename.as_deref());

    let key = match media_name {
        Some(filename) => format!("{MEDIA_KEY_PREFIX}{filename}"),
        None => normalize_for_key(&pair.answer, rules.answer_key_chars),
    };

    (char_len(&key) >= rules.min_key_chars).then_some(key)
}

/// Group pairs by answer key, in order of first appearance.
pub fn cluster_answers(pairs: &[QaPair], rules: &ClusterRules) -> Vec<AnswerCluster> {
    let mut order: Vec<(String, Vec<QaPair>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut discarded = 0usize;

    for pair in pairs {
        let Some(key) = cluster_key(pair, rules) else {
            discarded += 1;
            continue;
        };
        match index.get(&key) {
            Some(&slot) => order[slot].1.push(pair.clone()),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![pair.clone()]));
            }
        }
    }

    debug!(
        pairs = pairs.len(),
        clusters = order.len(),
        discarded,
        "answers clustered"
    );

    order
        .into_iter()
        .map(|(key, occurrences)| build_cluster(key, occurrences, rules))
        .collect()
}

/// Keep clusters seen at least `repetition_threshold` times whose canonical
/// text answer is not noise, most frequent first (ties keep chat order).
pub fn promote(
    clusters: Vec<AnswerCluster>,
    classifier: &Classifier,
    rules: &ClusterRules,
) -> Vec<AnswerCluster> {
    let mut promoted: Vec<AnswerCluster> = clusters
        .into_iter()
        .filter(|c| c.count() >= rules.repetition_threshold)
        .filter(|c| {
            let noisy = !c.is_media() && classifier.is_noise(&c.canonical().answer);
            if noisy {
                trace!(key = %c.key, "dropping noise cluster");
            }
            !noisy
        })
        .collect();

    promoted.sort_by(|a, b| b.count().cmp(&a.count()));
    promoted
}

fn build_cluster(key: String, occurrences: Vec<QaPair>, rules: &ClusterRules) -> AnswerCluster {
    let mut example_questions: Vec<String> = Vec::new();
    for q in occurrences.iter().filter_map(|p| p.question.as_deref()) {
        if example_questions.len() >= rules.example_question_cap {
            break;
        }
        if !q.trim().is_empty() && !example_questions.iter().any(|e| e == q) {
            example_questions.push(q.to_string());
        }
    }

    let mut associated_media: Vec<MediaInfo> = Vec::new();
    for media in occurrences.iter().flat_map(|p| p.associated_media.iter()) {
        if associated_media.len() >= rules.associated_media_cap {
            break;
        }
        let Some(name) = media.filename.as_deref() else {
            continue;
        };
        if !associated_media
            .iter()
            .any(|m| m.filename.as_deref() == Some(name))
        {
            associated_media.push(media.clone());
        }
    }

    let last_date = occurrences
        .iter()
        .map(|p| p.date.as_str())
        .max_by(|a, b| compare_chat_dates(a, b))
        .unwrap_or_default()
        .to_string();

    let attribution = attribute(&occurrences);

    AnswerCluster {
        key,
        occurrences,
        example_questions,
        associated_media,
        last_date,
        attribution,
    }
}

fn attribute(occurrences: &[QaPair]) -> Attribution {
    let mut ids = occurrences.iter().filter_map(|p| p.manager_id.as_deref());
    let Some(first) = ids.next() else {
        return Attribution::Unattributed;
    };
    if ids.all(|id| id == first) {
        Attribution::Manager(first.to_string())
    } else {
        Attribution::MultipleManagers
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Parse a transcript date (`D.M.YY`, `D.M.YYYY`, or with `/` separators).
pub fn parse_chat_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let year_digits = raw.rsplit(['.', '/']).next().map(str::len).unwrap_or(0);
    let formats: &[&str] = if year_digits <= 2 {
        &["%d.%m.%y", "%d/%m/%y"]
    } else {
        &["%d.%m.%Y", "%d/%m/%Y"]
    };
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Calendar order when both dates parse; unparsable dates sort first.
pub fn compare_chat_dates(a: &str, b: &str) -> Ordering {
    match (parse_chat_date(a), parse_chat_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

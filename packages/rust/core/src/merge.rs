//! Knowledge base merge.
//!
//! Existing items are partitioned into curated (`document`) and mined items.
//! Curated items always survive. Candidates are deduplicated against every
//! retained item by a normalized title prefix; nothing already stored is ever
//! rewritten.

use std::collections::HashSet;

use tracing::{debug, info, instrument};

use chatmine_shared::{AppConfig, KnowledgeItem};
use chatmine_transcript::{char_len, normalize_for_key};

/// Minimum characters in a candidate title.
const MIN_TITLE_CHARS: usize = 5;

/// Minimum characters in candidate content.
const MIN_CONTENT_CHARS: usize = 10;

/// URL-only titles shorter than this carry no knowledge.
const BARE_URL_MAX_CHARS: usize = 100;

/// What happens to existing mined items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Keep every existing item and append unseen candidates.
    #[default]
    Append,
    /// Keep curated items only, then append unseen candidates.
    Rebuild,
}

/// Merge parameters.
#[derive(Debug, Clone)]
pub struct MergeRules {
    pub policy: MergePolicy,
    /// Normalized title prefix length used as the dedup key.
    pub dedup_title_chars: usize,
    /// Titles containing any of these are rejected.
    pub placeholders: Vec<String>,
}

impl MergeRules {
    pub fn new(config: &AppConfig, policy: MergePolicy) -> Self {
        Self {
            policy,
            dedup_title_chars: config.mining.dedup_title_chars,
            placeholders: config.transcript.placeholders.clone(),
        }
    }
}

/// Counts from one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Existing items kept.
    pub retained: usize,
    /// Of those, curated items.
    pub curated: usize,
    /// Existing mined items dropped by a rebuild.
    pub dropped: usize,
    /// Candidates appended.
    pub added: usize,
    /// Candidates whose title key was already present.
    pub duplicates: usize,
    /// Candidates rejected by the validity filter.
    pub invalid: usize,
}

/// The merged item list and its report.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub items: Vec<KnowledgeItem>,
    pub report: MergeReport,
}

/// Dedup key for an item title.
pub fn title_key(item: &KnowledgeItem, dedup_title_chars: usize) -> String {
    normalize_for_key(item.display_title(), dedup_title_chars)
}

/// Whether a candidate is substantial enough to store.
pub fn is_valid_candidate(item: &KnowledgeItem, placeholders: &[String]) -> bool {
    let title = item.display_title().trim();
    let content = item.display_content().trim();

    if char_len(title) < MIN_TITLE_CHARS || char_len(content) < MIN_CONTENT_CHARS {
        return false;
    }
    if placeholders
        .iter()
        .filter(|p| !p.is_empty())
        .any(|p| title.contains(p.as_str()))
    {
        return false;
    }
    !is_bare_url(title)
}

fn is_bare_url(title: &str) -> bool {
    (title.starts_with("http://") || title.starts_with("https://"))
        && !title.contains(char::is_whitespace)
        && char_len(title) < BARE_URL_MAX_CHARS
}

/// Merge candidate lists (in argument order) into the existing items.
///
/// Output is the retained existing items in their original order followed by
/// the appended candidates in candidate order. Running the same merge on its
/// own output changes nothing.
#[instrument(skip_all, fields(policy = ?rules.policy))]
pub fn merge<'a, I>(existing: Vec<KnowledgeItem>, candidates: I, rules: &MergeRules) -> MergeOutcome
where
    I: IntoIterator<Item = &'a [KnowledgeItem]>,
{
    let mut report = MergeReport::default();
    let total_existing = existing.len();

    let mut items: Vec<KnowledgeItem> = match rules.policy {
        MergePolicy::Append => existing,
        MergePolicy::Rebuild => existing.into_iter().filter(|i| i.kind.is_curated()).collect(),
    };
    report.retained = items.len();
    report.dropped = total_existing - items.len();
    report.curated = items.iter().filter(|i| i.kind.is_curated()).count();

    let mut seen: HashSet<String> = items
        .iter()
        .map(|i| title_key(i, rules.dedup_title_chars))
        .collect();

    for list in candidates {
        for candidate in list {
            if !is_valid_candidate(candidate, &rules.placeholders) {
                debug!(title = %candidate.display_title(), "rejecting invalid candidate");
                report.invalid += 1;
                continue;
            }
            if seen.insert(title_key(candidate, rules.dedup_title_chars)) {
                items.push(candidate.clone());
                report.added += 1;
            } else {
                report.duplicates += 1;
            }
        }
    }

    info!(
        retained = report.retained,
        curated = report.curated,
        dropped = report.dropped,
        added = report.added,
        duplicates = report.duplicates,
        invalid = report.invalid,
        total = items.len(),
        "knowledge base merged"
    );

    MergeOutcome { items, report }
}

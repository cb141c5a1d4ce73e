//! End-to-end `mine` pipeline: transcript → messages → pairs → candidates →
//! merged knowledge base.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use chatmine_shared::{AppConfig, Message, QaPair, Result};
use chatmine_store::WriteSummary;
use chatmine_transcript::{Classifier, ParseReport, TranscriptParser, parse_transcript};

use crate::extract::{CandidateSet, ExtractionMode, Extractor};
use crate::merge::{MergePolicy, MergeReport, MergeRules, merge};
use crate::pairing::{PairingRules, pair_all};

/// Configuration for one `mine` run.
#[derive(Debug, Clone)]
pub struct MineConfig {
    /// Transcript to read.
    pub transcript: PathBuf,
    /// Knowledge base file to merge into.
    pub knowledge_base: PathBuf,
    pub mode: ExtractionMode,
    pub policy: MergePolicy,
    /// Where to write the analytics document, if anywhere.
    pub analytics: Option<PathBuf>,
    /// Compute everything but write nothing.
    pub dry_run: bool,
}

/// Result of a `mine` run.
#[derive(Debug)]
pub struct MineResult {
    pub run_id: Uuid,
    pub messages: usize,
    pub manager_messages: usize,
    pub skipped_lines: usize,
    pub suppressed: usize,
    pub pairs: usize,
    /// Candidate counts per extraction step, in merge order.
    pub candidates: Vec<(ExtractionMode, usize)>,
    pub merge: MergeReport,
    /// Items in the knowledge base after the merge.
    pub total_items: usize,
    /// Written knowledge base (absent on a dry run).
    pub knowledge_base: Option<WriteSummary>,
    pub analytics: Option<WriteSummary>,
    pub elapsed: std::time::Duration,
}

/// In-memory output of the mining stages.
#[derive(Debug, Clone)]
pub struct Mined {
    pub pairs: Vec<QaPair>,
    pub candidates: Vec<CandidateSet>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &MineResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &MineResult) {}
}

/// Pair and extract over already classified messages.
pub fn mine_messages(
    messages: &[Message],
    config: &AppConfig,
    classifier: &Classifier,
    mode: ExtractionMode,
) -> Mined {
    let pairs = pair_all(messages, classifier, &PairingRules::from(&config.mining));
    let candidates = Extractor::new(config, classifier).run(mode, messages, &pairs);
    Mined { pairs, candidates }
}

/// Read and classify a transcript file.
pub fn load_transcript(
    path: &std::path::Path,
    config: &AppConfig,
    classifier: &Classifier,
) -> Result<ParseReport> {
    let lines = chatmine_store::read_transcript_lines(path)?;
    let parser = TranscriptParser::new(&config.transcript);
    Ok(parse_transcript(&lines, &parser, classifier))
}

/// Run the full `mine` pipeline.
///
/// 1. Read and parse the transcript
/// 2. Pair manager messages with questions
/// 3. Run the extraction steps of the selected mode
/// 4. Merge candidates into the existing knowledge base
/// 5. Write the knowledge base (and analytics) unless this is a dry run
#[instrument(skip_all, fields(transcript = %config.transcript.display(), mode = %config.mode))]
pub fn run_mine(
    config: &MineConfig,
    app: &AppConfig,
    progress: &dyn ProgressReporter,
) -> Result<MineResult> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();

    info!(%run_id, kb = %config.knowledge_base.display(), "starting mine pipeline");

    if app.managers.is_empty() {
        warn!("no manager identities configured; the mined set will be empty");
    }

    // --- Phase 1: Parse ---
    progress.phase("Parsing transcript");
    let classifier = Classifier::new(app)?;
    let report = load_transcript(&config.transcript, app, &classifier)?;

    // --- Phase 2: Pair & extract ---
    progress.phase("Mining knowledge");
    let mined = mine_messages(&report.messages, app, &classifier, config.mode);

    // --- Phase 3: Merge ---
    progress.phase("Merging knowledge base");
    let existing = chatmine_store::load_knowledge_base(&config.knowledge_base)?;
    let rules = MergeRules::new(app, config.policy);
    let outcome = merge(
        existing,
        mined.candidates.iter().map(|set| set.items.as_slice()),
        &rules,
    );

    // --- Phase 4: Write ---
    let (knowledge_base, analytics) = if config.dry_run {
        info!("dry run, nothing written");
        (None, None)
    } else {
        progress.phase("Writing knowledge base");
        let kb = chatmine_store::save_knowledge_base(&config.knowledge_base, &outcome.items)?;
        let analytics = match &config.analytics {
            Some(path) => {
                progress.phase("Writing analytics");
                Some(chatmine_store::write_analytics(path, &mined.pairs)?)
            }
            None => None,
        };
        (Some(kb), analytics)
    };

    let result = MineResult {
        run_id,
        messages: report.messages.len(),
        manager_messages: report.manager_messages(),
        skipped_lines: report.skipped_lines,
        suppressed: report.suppressed,
        pairs: mined.pairs.len(),
        candidates: mined
            .candidates
            .iter()
            .map(|set| (set.mode, set.items.len()))
            .collect(),
        merge: outcome.report,
        total_items: outcome.items.len(),
        knowledge_base,
        analytics,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        %run_id,
        messages = result.messages,
        pairs = result.pairs,
        added = result.merge.added,
        total_items = result.total_items,
        elapsed_ms = result.elapsed.as_millis(),
        "mine pipeline complete"
    );

    Ok(result)
}

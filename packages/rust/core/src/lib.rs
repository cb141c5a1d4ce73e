//! Mining pipeline and domain logic for chatmine.
//!
//! This crate turns classified transcript messages into knowledge-base
//! entries: positional pairing, answer clustering, the extraction modes,
//! the knowledge-base merge, and end-to-end orchestration (`run_mine`).

pub mod cluster;
pub mod extract;
pub mod merge;
pub mod pairing;
pub mod pipeline;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use cluster::{AnswerCluster, Attribution, ClusterRules, cluster_answers, promote};
pub use extract::{CandidateSet, ExtractionMode, Extractor};
pub use merge::{MergeOutcome, MergePolicy, MergeReport, MergeRules, merge};
pub use pairing::{PairingRules, find_answer, find_question, follow_up_media, pair_all};
pub use pipeline::{
    MineConfig, MineResult, Mined, ProgressReporter, SilentProgress, load_transcript,
    mine_messages, run_mine,
};
pub use stats::{TranscriptStats, compute_stats};

//! Shared types, error model, and configuration for chatmine.
//!
//! This crate is the foundation depended on by all other chatmine crates.
//! It provides:
//! - [`ChatMineError`] — the unified error type
//! - Domain types ([`Message`], [`QaPair`], [`KnowledgeItem`], [`MediaInfo`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ManagerIdentity, MediaConfig, MiningConfig, NoiseConfig, OperationalConfig,
    TemplateConfig, TranscriptConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{ChatMineError, Result};
pub use types::{
    ConversationRecord, ItemStatus, KnowledgeItem, KnowledgeType, MediaInfo, MediaType, Message,
    Priority, QaPair,
};

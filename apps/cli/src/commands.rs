//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chatmine_core::{
    ExtractionMode, MergePolicy, MineConfig, MineResult, ProgressReporter, TranscriptStats,
    compute_stats, load_transcript, run_mine,
};
use chatmine_shared::{AppConfig, init_config, load_config, load_config_from};
use chatmine_transcript::Classifier;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// chatmine — turn group-chat transcripts into a knowledge base.
#[derive(Parser)]
#[command(
    name = "chatmine",
    version,
    about = "Mine recurring answers and instructions from chat transcripts into a knowledge base.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.chatmine/chatmine.toml.
    #[arg(long, global = true, env = "CHATMINE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Which extraction steps `mine` runs.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ModeArg {
    /// Repeated answers, then instructions, then operational FAQ.
    All,
    /// Repeated manager answers only.
    Answers,
    /// Repeated and operational manager instructions only.
    Instructions,
    /// Question → answer pairs from operational questions only.
    Faq,
}

impl From<ModeArg> for ExtractionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => ExtractionMode::All,
            ModeArg::Answers => ExtractionMode::RepeatedAnswers,
            ModeArg::Instructions => ExtractionMode::Instructions,
            ModeArg::Faq => ExtractionMode::OperationalFaq,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Mine a transcript and merge the results into a knowledge base.
    Mine {
        /// Exported chat transcript.
        transcript: PathBuf,

        /// Knowledge base JSON file (created if missing).
        #[arg(long)]
        kb: PathBuf,

        /// Extraction mode.
        #[arg(short, long, default_value = "all")]
        mode: ModeArg,

        /// Drop previously mined items before merging; curated documents are kept.
        #[arg(long)]
        rebuild: bool,

        /// Also write every manager conversation to this file.
        #[arg(long)]
        analytics: Option<PathBuf>,

        /// Run the whole pipeline but write nothing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print statistics about a transcript.
    Stats {
        /// Exported chat transcript.
        transcript: PathBuf,

        /// Rows in the frequent question/answer tables.
        #[arg(long, default_value = "10")]
        top: usize,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "chatmine=info",
        1 => "chatmine=debug",
        _ => "chatmine=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Mine {
            transcript,
            kb,
            mode,
            rebuild,
            analytics,
            dry_run,
        } => {
            let policy = if rebuild {
                MergePolicy::Rebuild
            } else {
                MergePolicy::Append
            };
            let mine = MineConfig {
                transcript,
                knowledge_base: kb,
                mode: mode.into(),
                policy,
                analytics,
                dry_run,
            };
            cmd_mine(&mine, config_path.as_deref())
        }
        Command::Stats {
            transcript,
            top,
            json,
        } => cmd_stats(&transcript, top, json, config_path.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

/// Load the explicit config file if given, else the default location.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(eyre!("config file '{}' does not exist", path.display()));
            }
            load_config_from(path)?
        }
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_mine(mine: &MineConfig, config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;

    info!(
        transcript = %mine.transcript.display(),
        kb = %mine.knowledge_base.display(),
        mode = %mine.mode,
        rebuild = mine.policy == MergePolicy::Rebuild,
        dry_run = mine.dry_run,
        "mining transcript"
    );

    let reporter = CliProgress::new();
    let result = run_mine(mine, &config, &reporter)?;

    print_mine_summary(mine, &result);
    Ok(())
}

fn print_mine_summary(mine: &MineConfig, result: &MineResult) {
    println!();
    if mine.dry_run {
        println!("  Dry run: nothing was written.");
    } else {
        println!("  Knowledge base updated!");
    }
    println!("  Run:        {}", result.run_id);
    println!(
        "  Messages:   {} ({} from managers, {} lines skipped, {} suppressed)",
        result.messages, result.manager_messages, result.skipped_lines, result.suppressed
    );
    println!("  Pairs:      {}", result.pairs);
    for (mode, count) in &result.candidates {
        println!("  Candidates: {count} {mode}");
    }
    println!(
        "  Merge:      {} added, {} duplicate, {} invalid, {} kept ({} curated), {} dropped",
        result.merge.added,
        result.merge.duplicates,
        result.merge.invalid,
        result.merge.retained,
        result.merge.curated,
        result.merge.dropped
    );
    println!("  Items:      {}", result.total_items);
    match &result.knowledge_base {
        Some(kb) => {
            println!("  Path:       {}", kb.path.display());
            println!("  SHA-256:    {}", kb.sha256);
        }
        None => println!("  Path:       {}", mine.knowledge_base.display()),
    }
    if let Some(analytics) = &result.analytics {
        println!("  Analytics:  {}", analytics.path.display());
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn cmd_stats(transcript: &Path, top: usize, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let classifier = Classifier::new(&config)?;
    let report = load_transcript(transcript, &config, &classifier)?;
    let stats = compute_stats(&report, &config, top);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(transcript, &stats);
    }
    Ok(())
}

fn print_stats(transcript: &Path, stats: &TranscriptStats) {
    println!();
    println!("  Transcript:   {}", transcript.display());
    println!("  Messages:     {}", stats.total_messages);
    println!("  Participants: {}", stats.participants);
    println!("  Managers:     {} messages", stats.manager_messages);
    if let (Some(first), Some(last)) = (&stats.first_date, &stats.last_date) {
        println!("  Dates:        {first} – {last}");
    }
    println!(
        "  Skipped:      {} lines, {} suppressed",
        stats.skipped_lines, stats.suppressed
    );
    println!("  Media:        {}", stats.media_messages);
    for (kind, count) in &stats.media_by_type {
        println!("    {kind:<14} {count}");
    }

    if !stats.messages_per_manager.is_empty() {
        println!();
        println!("  Manager activity:");
        for manager in &stats.messages_per_manager {
            println!("    {:>5}  {} ({})", manager.messages, manager.name, manager.id);
        }
    }

    for (heading, rows) in [
        ("Frequent questions:", &stats.top_questions),
        ("Frequent answers:", &stats.top_answers),
    ] {
        if rows.is_empty() {
            continue;
        }
        println!();
        println!("  {heading}");
        for row in rows {
            println!("    {:>5}  {}", row.count, row.example.replace('\n', " "));
        }
    }
    println!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid spinner template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &MineResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // A failed run never reaches `done`.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

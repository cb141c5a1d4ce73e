//! Application configuration for chatmine.
//!
//! User config lives at `~/.chatmine/chatmine.toml`.
//! CLI flags override config file values, which override defaults.
//! Name lists, keyword lists, and transcript markers are configuration,
//! never pipeline logic.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChatMineError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "chatmine.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".chatmine";

// ---------------------------------------------------------------------------
// Config structs (matching chatmine.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Thresholds, windows, and caps.
    #[serde(default)]
    pub mining: MiningConfig,

    /// Noise phrase list and length guards.
    #[serde(default)]
    pub noise: NoiseConfig,

    /// Operational topic keywords.
    #[serde(default)]
    pub operational: OperationalConfig,

    /// Attachment markers and extension tables.
    #[serde(default)]
    pub media: MediaConfig,

    /// System placeholder markers.
    #[serde(default)]
    pub transcript: TranscriptConfig,

    /// Labels used when rendering item content.
    #[serde(default)]
    pub template: TemplateConfig,

    /// Manager identities. Empty means no message is ever a manager message.
    #[serde(default)]
    pub managers: Vec<ManagerIdentity>,
}

/// `[mining]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Minimum occurrences for a cluster to become a knowledge item.
    #[serde(default = "default_repetition_threshold")]
    pub repetition_threshold: usize,

    /// Messages searched backward from an answer for its question.
    #[serde(default = "default_question_window")]
    pub question_window: usize,

    /// Messages searched forward from a question for its answer.
    #[serde(default = "default_answer_window")]
    pub answer_window: usize,

    /// Messages searched forward for the same manager's follow-up media.
    #[serde(default = "default_media_lookahead")]
    pub media_lookahead: usize,

    #[serde(default = "default_min_question_chars")]
    pub min_question_chars: usize,

    #[serde(default = "default_min_answer_chars")]
    pub min_answer_chars: usize,

    /// Skip media messages when searching for a question.
    #[serde(default = "default_true")]
    pub skip_media_questions: bool,

    /// Skip noise messages when searching for a question.
    #[serde(default = "default_true")]
    pub skip_noise_questions: bool,

    /// Normalized prefix length used as the answer clustering key.
    #[serde(default = "default_answer_key_chars")]
    pub answer_key_chars: usize,

    /// Keys shorter than this are too generic to cluster.
    #[serde(default = "default_min_key_chars")]
    pub min_key_chars: usize,

    #[serde(default = "default_example_question_cap")]
    pub example_question_cap: usize,

    #[serde(default = "default_associated_media_cap")]
    pub associated_media_cap: usize,

    /// Normalized title prefix length used for knowledge-base dedup.
    #[serde(default = "default_dedup_title_chars")]
    pub dedup_title_chars: usize,

    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Normalized prefix length used to group repeated instructions.
    #[serde(default = "default_instruction_key_chars")]
    pub instruction_key_chars: usize,

    #[serde(default = "default_min_instruction_key_chars")]
    pub min_instruction_key_chars: usize,

    /// Minimum length of a one-off operational instruction.
    #[serde(default = "default_min_operational_chars")]
    pub min_operational_chars: usize,

    /// Maximum number of one-off operational instructions kept per run.
    #[serde(default = "default_operational_cap")]
    pub operational_cap: usize,

    #[serde(default = "default_faq_question_min_chars")]
    pub faq_question_min_chars: usize,

    #[serde(default = "default_faq_question_max_chars")]
    pub faq_question_max_chars: usize,

    #[serde(default = "default_faq_min_answer_chars")]
    pub faq_min_answer_chars: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            repetition_threshold: default_repetition_threshold(),
            question_window: default_question_window(),
            answer_window: default_answer_window(),
            media_lookahead: default_media_lookahead(),
            min_question_chars: default_min_question_chars(),
            min_answer_chars: default_min_answer_chars(),
            skip_media_questions: true,
            skip_noise_questions: true,
            answer_key_chars: default_answer_key_chars(),
            min_key_chars: default_min_key_chars(),
            example_question_cap: default_example_question_cap(),
            associated_media_cap: default_associated_media_cap(),
            dedup_title_chars: default_dedup_title_chars(),
            title_max_chars: default_title_max_chars(),
            instruction_key_chars: default_instruction_key_chars(),
            min_instruction_key_chars: default_min_instruction_key_chars(),
            min_operational_chars: default_min_operational_chars(),
            operational_cap: default_operational_cap(),
            faq_question_min_chars: default_faq_question_min_chars(),
            faq_question_max_chars: default_faq_question_max_chars(),
            faq_min_answer_chars: default_faq_min_answer_chars(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_repetition_threshold() -> usize {
    2
}
fn default_question_window() -> usize {
    4
}
fn default_answer_window() -> usize {
    7
}
fn default_media_lookahead() -> usize {
    2
}
fn default_min_question_chars() -> usize {
    3
}
fn default_min_answer_chars() -> usize {
    3
}
fn default_answer_key_chars() -> usize {
    80
}
fn default_min_key_chars() -> usize {
    5
}
fn default_example_question_cap() -> usize {
    5
}
fn default_associated_media_cap() -> usize {
    3
}
fn default_dedup_title_chars() -> usize {
    50
}
fn default_title_max_chars() -> usize {
    100
}
fn default_instruction_key_chars() -> usize {
    60
}
fn default_min_instruction_key_chars() -> usize {
    10
}
fn default_min_operational_chars() -> usize {
    15
}
fn default_operational_cap() -> usize {
    150
}
fn default_faq_question_min_chars() -> usize {
    10
}
fn default_faq_question_max_chars() -> usize {
    200
}
fn default_faq_min_answer_chars() -> usize {
    10
}

/// `[noise]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Greetings, acknowledgements, and laughter tokens.
    #[serde(default = "default_noise_phrases")]
    pub phrases: Vec<String>,

    /// Normalized texts shorter than this are noise.
    #[serde(default = "default_noise_min_chars")]
    pub min_chars: usize,

    /// A text starting with a noise phrase is noise only if what follows
    /// the phrase is shorter than this.
    #[serde(default = "default_noise_max_remainder_chars")]
    pub max_remainder_chars: usize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            phrases: default_noise_phrases(),
            min_chars: default_noise_min_chars(),
            max_remainder_chars: default_noise_max_remainder_chars(),
        }
    }
}

fn default_noise_phrases() -> Vec<String> {
    [
        "בוקר טוב",
        "צהריים טובים",
        "ערב טוב",
        "לילה טוב",
        "שבוע טוב",
        "שבת שלום",
        "חג שמח",
        "שנה טובה",
        "תודה רבה",
        "תודה",
        "בבקשה",
        "אמן",
        "חחח",
        "הההה",
        "לול",
        "שלום",
        "היי",
        "הי",
        "מצויין",
        "סבבה",
        "אוקיי",
        "ok",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_noise_min_chars() -> usize {
    5
}
fn default_noise_max_remainder_chars() -> usize {
    10
}

/// `[operational]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalConfig {
    /// Keywords across topic buckets (safety, fuel, payment, equipment,
    /// inventory, procedure, shift, customer service).
    #[serde(default = "default_operational_keywords")]
    pub keywords: Vec<String>,
}

impl Default for OperationalConfig {
    fn default() -> Self {
        Self {
            keywords: default_operational_keywords(),
        }
    }
}

fn default_operational_keywords() -> Vec<String> {
    [
        // safety
        "נכה", "חשוד", "מטף", "חירום", "בטיחות", "משטרה", "שוטר",
        // fuel
        "דלק", "תדלוק", "משאבה", "סולר", "בנזין", "ליטר", "אקדח",
        // payment
        "קופה", "תשלום", "כרטיס", "מזומן", "קבלה", "חשבונית", "מחיר",
        // equipment
        "מכונה", "טרמינל", "שטיפה", "מדפסת",
        // inventory
        "מלאי", "הזמנה", "שמן", "חלב", "מוצר", "סחורה",
        // procedure
        "אסור", "מותר", "חובה", "צריך", "שימו לב", "אישור", "נוהל",
        // shift
        "משמרת", "סידור", "החלפה",
        // customer service
        "לקוח", "תלונה", "שירות", "ארוחה",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[media]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Label inside the attachment marker, e.g. `<מצורף: file.pdf>`.
    #[serde(default = "default_attachment_label")]
    pub attachment_label: String,

    /// Markers the export writes in place of an omitted image.
    #[serde(default = "default_omitted_image_markers")]
    pub omitted_image_markers: Vec<String>,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    #[serde(default = "default_document_extensions")]
    pub document_extensions: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            attachment_label: default_attachment_label(),
            omitted_image_markers: default_omitted_image_markers(),
            image_extensions: default_image_extensions(),
            video_extensions: default_video_extensions(),
            document_extensions: default_document_extensions(),
        }
    }
}

fn default_attachment_label() -> String {
    "מצורף".into()
}
fn default_omitted_image_markers() -> Vec<String> {
    vec!["התמונה הושמטה".into()]
}
fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_video_extensions() -> Vec<String> {
    ["mp4", "mov", "avi"].into_iter().map(String::from).collect()
}
fn default_document_extensions() -> Vec<String> {
    ["pdf", "doc", "docx", "xls", "xlsx"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `[transcript]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Bodies containing any of these are system placeholders (pending
    /// message notices, deletion notices) and are never materialized.
    #[serde(default = "default_placeholders")]
    pub placeholders: Vec<String>,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            placeholders: default_placeholders(),
        }
    }
}

fn default_placeholders() -> Vec<String> {
    ["בהמתנה להודעה", "הודעה זו נמחקה", "מחקת את ההודעה"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `[template]` section: labels rendered into item content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_questions_heading")]
    pub questions_heading: String,
    #[serde(default = "default_answer_heading")]
    pub answer_heading: String,
    /// Rendered in place of the question list when no question was found.
    #[serde(default = "default_no_questions")]
    pub no_questions: String,
    /// Prefix of a media answer's display form, e.g. `[קובץ: file.pdf]`.
    #[serde(default = "default_media_label")]
    pub media_label: String,
    #[serde(default = "default_multiple_managers")]
    pub multiple_managers: String,
    #[serde(default = "default_unknown_manager")]
    pub unknown_manager: String,
    #[serde(default = "default_repeated_instruction_label")]
    pub repeated_instruction_label: String,
    #[serde(default = "default_operational_instruction_label")]
    pub operational_instruction_label: String,
    #[serde(default = "default_faq_question_label")]
    pub faq_question_label: String,
    #[serde(default = "default_faq_answer_label")]
    pub faq_answer_label: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            questions_heading: default_questions_heading(),
            answer_heading: default_answer_heading(),
            no_questions: default_no_questions(),
            media_label: default_media_label(),
            multiple_managers: default_multiple_managers(),
            unknown_manager: default_unknown_manager(),
            repeated_instruction_label: default_repeated_instruction_label(),
            operational_instruction_label: default_operational_instruction_label(),
            faq_question_label: default_faq_question_label(),
            faq_answer_label: default_faq_answer_label(),
        }
    }
}

fn default_questions_heading() -> String {
    "שאלות שהפעילו תשובה זו:".into()
}
fn default_answer_heading() -> String {
    "תשובת מנהל".into()
}
fn default_no_questions() -> String {
    "N/A".into()
}
fn default_media_label() -> String {
    "קובץ".into()
}
fn default_multiple_managers() -> String {
    "מנהלים שונים".into()
}
fn default_unknown_manager() -> String {
    "מנהל".into()
}
fn default_repeated_instruction_label() -> String {
    "הודעת מנהל".into()
}
fn default_operational_instruction_label() -> String {
    "הנחיית מנהל".into()
}
fn default_faq_question_label() -> String {
    "שאלה".into()
}
fn default_faq_answer_label() -> String {
    "תשובה".into()
}

/// `[[managers]]` entry — one privileged identity and its display-name variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerIdentity {
    /// Stable identifier used for attribution (e.g. `nevo`).
    pub id: String,
    /// Name rendered in item content; falls back to the first variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Substrings matched against the sender display name.
    #[serde(default)]
    pub names: Vec<String>,
}

impl ManagerIdentity {
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or_else(|| self.names.first().map(String::as_str))
            .unwrap_or(self.id.as_str())
    }
}

impl AppConfig {
    /// Display name for a manager identity id.
    pub fn manager_label(&self, id: &str) -> Option<&str> {
        self.managers.iter().find(|m| m.id == id).map(|m| m.label())
    }

    /// Reject values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        let m = &self.mining;
        let positive = [
            ("repetition_threshold", m.repetition_threshold),
            ("question_window", m.question_window),
            ("answer_window", m.answer_window),
            ("answer_key_chars", m.answer_key_chars),
            ("dedup_title_chars", m.dedup_title_chars),
            ("title_max_chars", m.title_max_chars),
            ("instruction_key_chars", m.instruction_key_chars),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ChatMineError::config(format!(
                    "mining.{name} must be at least 1"
                )));
            }
        }

        if m.faq_question_min_chars > m.faq_question_max_chars {
            return Err(ChatMineError::config(
                "mining.faq_question_min_chars exceeds mining.faq_question_max_chars",
            ));
        }

        for manager in &self.managers {
            if manager.id.trim().is_empty() {
                return Err(ChatMineError::config("manager id must not be empty"));
            }
            if manager.names.iter().any(|n| n.trim().is_empty()) {
                return Err(ChatMineError::config(format!(
                    "manager '{}' has an empty name variant",
                    manager.id
                )));
            }
        }

        if self.managers.is_empty() {
            tracing::warn!("no manager identities configured; nothing will be mined");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.chatmine/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ChatMineError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.chatmine/chatmine.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ChatMineError::io("read config", path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ChatMineError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ChatMineError::io("create config dir", &dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| ChatMineError::Serialization(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ChatMineError::io("write config", &path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

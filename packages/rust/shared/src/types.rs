//! Core domain types for mined chat knowledge.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Kind of attachment referenced by a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Document,
    File,
    /// The export omitted the image; only the omission marker is present.
    ImageRemoved,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
            Self::File => "file",
            Self::ImageRemoved => "image_removed",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attachment reference extracted from a message body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Attachment filename; `None` when the export dropped the file.
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One transcript entry (a header line plus its continuation lines).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Calendar date as written in the transcript (`D.M.Y`).
    pub date: String,
    /// Time of day as written in the transcript (`H:MM:SS`).
    pub time: String,
    /// Display name with control characters stripped.
    pub sender: String,
    /// Display-cleaned body; continuation lines are joined with `\n`.
    pub text: String,
    pub is_manager: bool,
    /// First configured manager identity matching the sender.
    pub manager_id: Option<String>,
    pub media: Option<MediaInfo>,
}

impl Message {
    pub fn is_media(&self) -> bool {
        self.media.is_some()
    }
}

// ---------------------------------------------------------------------------
// QaPair
// ---------------------------------------------------------------------------

/// A candidate question/answer association produced by the pairing engine.
#[derive(Debug, Clone, PartialEq)]
pub struct QaPair {
    pub question: Option<String>,
    pub question_sender: Option<String>,
    pub answer: String,
    pub answer_sender: String,
    pub date: String,
    pub time: String,
    pub is_media_answer: bool,
    pub manager_id: Option<String>,
    /// Media attached to the answer message itself.
    pub media: Option<MediaInfo>,
    /// Media the same manager sent right after the answer (includes `media`).
    pub associated_media: Vec<MediaInfo>,
}

/// Analytics view of a [`QaPair`] (`all-conversations.json` record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    /// Monotonic identifier (`conv-1`, `conv-2`, ...).
    pub id: String,
    pub question: String,
    pub question_sender: String,
    pub answer: String,
    pub answer_sender: String,
    pub date: String,
    pub time: String,
    pub is_media: bool,
}

impl ConversationRecord {
    /// Build the record for the `seq`-th pair (1-based).
    pub fn from_pair(seq: usize, pair: &QaPair) -> Self {
        Self {
            id: format!("conv-{seq}"),
            question: pair.question.clone().unwrap_or_default(),
            question_sender: pair
                .question_sender
                .clone()
                .unwrap_or_else(|| "Unknown".into()),
            answer: pair.answer.clone(),
            answer_sender: pair.answer_sender.clone(),
            date: pair.date.clone(),
            time: pair.time.clone(),
            is_media: pair.is_media_answer,
        }
    }
}

// ---------------------------------------------------------------------------
// KnowledgeItem
// ---------------------------------------------------------------------------

/// Knowledge item category. Unknown values from the store are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KnowledgeType {
    /// Curated upload; never deduplicated or dropped by a merge.
    Document,
    Instruction,
    Faq,
    RepeatedAnswer,
    Other(String),
}

impl KnowledgeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Document => "document",
            Self::Instruction => "instruction",
            Self::Faq => "faq",
            Self::RepeatedAnswer => "repeated_answer",
            Self::Other(s) => s,
        }
    }

    pub fn is_curated(&self) -> bool {
        matches!(self, Self::Document)
    }
}

impl From<String> for KnowledgeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "document" => Self::Document,
            "instruction" => Self::Instruction,
            "faq" => Self::Faq,
            "repeated_answer" => Self::RepeatedAnswer,
            _ => Self::Other(s),
        }
    }
}

impl From<KnowledgeType> for String {
    fn from(t: KnowledgeType) -> Self {
        match t {
            KnowledgeType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// Review state of a mined item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemStatus {
    PendingApproval,
    Approved,
    Other(String),
}

impl From<String> for ItemStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending_approval" => Self::PendingApproval,
            "approved" => Self::Approved,
            _ => Self::Other(s),
        }
    }
}

impl From<ItemStatus> for String {
    fn from(s: ItemStatus) -> Self {
        match s {
            ItemStatus::PendingApproval => "pending_approval".into(),
            ItemStatus::Approved => "approved".into(),
            ItemStatus::Other(s) => s,
        }
    }
}

/// Priority hint for standing instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Normal,
    Other(String),
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        match s.as_str() {
            "high" => Self::High,
            "normal" => Self::Normal,
            _ => Self::Other(s),
        }
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        match p {
            Priority::High => "high".into(),
            Priority::Normal => "normal".into(),
            Priority::Other(s) => s,
        }
    }
}

/// The persisted unit of the knowledge base (`whatsapp-faqs.json` entry).
///
/// Field names follow the existing store consumer (`titleHe`, `contentHe`,
/// snake_case elsewhere). Fields this struct does not model are kept in
/// [`extra`](Self::extra) so curated items survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "titleHe", default, skip_serializing_if = "Option::is_none")]
    pub title_he: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "contentHe", default, skip_serializing_if = "Option::is_none")]
    pub content_he: Option<String>,
    #[serde(rename = "type")]
    pub kind: KnowledgeType,
    /// Provenance tag (`automation_pattern`, `manager_repeated`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_info: Option<MediaInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associated_media: Vec<MediaInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub example_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_name: Option<String>,
    /// `text` or the media type of the canonical answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl KnowledgeItem {
    /// Create a mined item with the Hebrew mirrors filled in.
    pub fn mined(
        kind: KnowledgeType,
        title: impl Into<String>,
        content: impl Into<String>,
        source: &str,
        frequency: u32,
    ) -> Self {
        let title = title.into();
        let content = content.into();
        Self {
            title_he: Some(title.clone()),
            content_he: Some(content.clone()),
            title,
            content,
            kind,
            source: Some(source.to_string()),
            frequency: Some(frequency.max(1)),
            media_info: None,
            associated_media: Vec::new(),
            example_questions: Vec::new(),
            manager_id: None,
            manager_name: None,
            answer_type: None,
            raw_answer: None,
            status: None,
            priority: None,
            extra: serde_json::Map::new(),
        }
    }

    /// The title used for display and dedup (`titleHe` wins when present).
    pub fn display_title(&self) -> &str {
        match self.title_he.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => &self.title,
        }
    }

    /// The content used for display (`contentHe` wins when present).
    pub fn display_content(&self) -> &str {
        match self.content_he.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => &self.content,
        }
    }

    /// Occurrence count; stored items without one count once.
    pub fn frequency(&self) -> u32 {
        self.frequency.unwrap_or(1).max(1)
    }
}

//! File persistence for chatmine.
//!
//! - Transcripts are read whole and split into lines.
//! - The knowledge base is a pretty-printed JSON array of
//!   [`KnowledgeItem`]s, always rewritten as a complete replacement.
//! - Every write goes to a sibling `.{name}.tmp` file first and is renamed into
//!   place, so a failed run leaves the previous file untouched.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use chatmine_shared::{ChatMineError, ConversationRecord, KnowledgeItem, QaPair, Result};

/// Metadata about a file written by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub path: PathBuf,
    /// Hex SHA-256 of the written bytes.
    pub sha256: String,
    pub size_bytes: usize,
}

/// Analytics document (`all-conversations.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    pub total: usize,
    pub generated_at: String,
    pub conversations: Vec<ConversationRecord>,
}

/// On-disk knowledge base shapes accepted on load.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredKnowledgeBase {
    Items(Vec<KnowledgeItem>),
    /// Extractor output wrapper (`{ "items": [...] , ... }`).
    Wrapped { items: Vec<KnowledgeItem> },
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// Read a transcript file as lines (a leading byte-order mark is dropped).
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_transcript_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            ChatMineError::parse(format!("{} is not valid UTF-8", path.display()))
        } else {
            ChatMineError::io("read transcript", path, e)
        }
    })?;

    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    debug!(lines = lines.len(), bytes = content.len(), "transcript read");
    Ok(lines)
}

// ---------------------------------------------------------------------------
// Knowledge base
// ---------------------------------------------------------------------------

/// Load the knowledge base. A missing or empty file is an empty knowledge base;
/// unparsable content is a validation error and is never overwritten.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_knowledge_base(path: &Path) -> Result<Vec<KnowledgeItem>> {
    if !path.exists() {
        debug!("knowledge base not found, starting empty");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ChatMineError::io("read knowledge base", path, e))?;
    if content.trim().is_empty() {
        warn!("knowledge base file is empty");
        return Ok(Vec::new());
    }

    let stored: StoredKnowledgeBase = serde_json::from_str(&content).map_err(|e| {
        ChatMineError::validation(format!(
            "knowledge base {} is not a valid item list: {e}",
            path.display()
        ))
    })?;

    let items = match stored {
        StoredKnowledgeBase::Items(items) => items,
        StoredKnowledgeBase::Wrapped { items } => items,
    };
    debug!(items = items.len(), "knowledge base loaded");
    Ok(items)
}

/// Replace the knowledge base file with `items`.
#[instrument(skip_all, fields(path = %path.display(), items = items.len()))]
pub fn save_knowledge_base(path: &Path, items: &[KnowledgeItem]) -> Result<WriteSummary> {
    let json = serde_json::to_string_pretty(items)
        .map_err(|e| ChatMineError::Serialization(format!("knowledge base: {e}")))?;
    let summary = atomic_write(path, json.as_bytes())?;
    info!(
        items = items.len(),
        size = summary.size_bytes,
        sha256 = %summary.sha256,
        "knowledge base written"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Build the analytics document for pairs in chat order (`conv-1`, `conv-2`, ...).
pub fn conversation_log(pairs: &[QaPair]) -> ConversationLog {
    let conversations: Vec<ConversationRecord> = pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| ConversationRecord::from_pair(i + 1, pair))
        .collect();
    ConversationLog {
        total: conversations.len(),
        generated_at: Utc::now().to_rfc3339(),
        conversations,
    }
}

/// Write the analytics document.
#[instrument(skip_all, fields(path = %path.display(), pairs = pairs.len()))]
pub fn write_analytics(path: &Path, pairs: &[QaPair]) -> Result<WriteSummary> {
    let log = conversation_log(pairs);
    let json = serde_json::to_string_pretty(&log)
        .map_err(|e| ChatMineError::Serialization(format!("analytics: {e}")))?;
    let summary = atomic_write(path, json.as_bytes())?;
    info!(conversations = log.total, "analytics written");
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write to `.{name}.tmp` next to `path`, then rename over `path`.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<WriteSummary> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ChatMineError::validation(format!("{} has no file name", path.display())))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| ChatMineError::io("create directory", &dir, e))?;

    let temp = dir.join(format!(".{file_name}.tmp"));
    if let Err(e) = std::fs::write(&temp, bytes) {
        let _ = std::fs::remove_file(&temp);
        return Err(ChatMineError::io("write temp file", &temp, e));
    }

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(ChatMineError::io("replace file", path, e));
    }

    debug!(path = %path.display(), size = bytes.len(), "file written");

    Ok(WriteSummary {
        path: path.to_path_buf(),
        sha256: sha256_hex(bytes),
        size_bytes: bytes.len(),
    })
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chatmine_shared::KnowledgeType;

    fn temp_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("chatmine-store-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn item(title: &str) -> KnowledgeItem {
        KnowledgeItem::mined(
            KnowledgeType::Faq,
            title,
            "תוכן הפריט המלא",
            "operational_qa",
            1,
        )
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn missing_knowledge_base_is_empty() {
        let dir = temp_dir();
        let items = load_knowledge_base(&dir.join("whatsapp-faqs.json")).unwrap();
        assert!(items.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn save_then_load() {
        let dir = temp_dir();
        let path = dir.join("whatsapp-faqs.json");
        let items = vec![item("מתי נסגרת הקופה?"), item("איפה המפתח?")];

        let summary = save_knowledge_base(&path, &items).unwrap();
        assert_eq!(summary.sha256.len(), 64);
        assert_eq!(
            summary.size_bytes,
            std::fs::metadata(&path).unwrap().len() as usize
        );
        assert!(leftover_temp_files(&dir).is_empty());

        let loaded = load_knowledge_base(&path).unwrap();
        assert_eq!(loaded, items);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn digest_matches_file_contents() {
        let dir = temp_dir();
        let path = dir.join("kb.json");
        let summary = save_knowledge_base(&path, &[item("מתי נסגרת הקופה?")]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(summary.sha256, sha256_hex(&bytes));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupt_knowledge_base_is_a_validation_error() {
        let dir = temp_dir();
        let path = dir.join("kb.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_knowledge_base(&path).unwrap_err();
        assert!(matches!(err, ChatMineError::Validation { .. }));
        assert!(err.to_string().contains("kb.json"));
        // The corrupt file is left alone.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn wrapped_item_list_is_accepted() {
        let dir = temp_dir();
        let path = dir.join("nevo-knowledge.json");
        std::fs::write(
            &path,
            r#"{"description": "x", "total_items": 1, "items": [{"title": "מתי נסגרת הקופה?", "content": "בשמונה בערב בדיוק", "type": "instruction"}]}"#,
        )
        .unwrap();
        let items = load_knowledge_base(&path).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, KnowledgeType::Instruction);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn failed_write_leaves_previous_file() {
        let dir = temp_dir();
        let path = dir.join("kb.json");
        save_knowledge_base(&path, &[item("מתי נסגרת הקופה?")]).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        // A directory squatting on the temp path makes the temp write fail.
        std::fs::create_dir_all(dir.join(".kb.json.tmp")).unwrap();
        let result = save_knowledge_base(&path, &[item("אחר לגמרי")]);
        assert!(matches!(result, Err(ChatMineError::Io { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[test]
    fn temp_file_is_removed_when_its_write_fails() {
        let dir = temp_dir();
        let path = dir.join("kb.json");
        // The temp path resolves into a directory that does not exist.
        std::os::unix::fs::symlink(dir.join("missing").join("target"), dir.join(".kb.json.tmp"))
            .unwrap();

        let err = save_knowledge_base(&path, &[item("מתי נסגרת הקופה?")]).unwrap_err();
        assert!(err.to_string().contains("write temp file"));
        assert!(leftover_temp_files(&dir).is_empty());
        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn transcript_lines_strip_bom() {
        let dir = temp_dir();
        let path = dir.join("chat.txt");
        std::fs::write(&path, "\u{feff}[1.2.24, 10:00:00] Dana: שלום\r\nשורה שנייה\n").unwrap();
        let lines = read_transcript_lines(&path).unwrap();
        assert_eq!(lines, vec!["[1.2.24, 10:00:00] Dana: שלום", "שורה שנייה"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_transcript_reports_operation_and_path() {
        let err = read_transcript_lines(Path::new("/nonexistent/chat.txt")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("read transcript"));
        assert!(msg.contains("chat.txt"));
    }

    #[test]
    fn analytics_numbers_pairs_in_order() {
        let pair = |q: Option<&str>| QaPair {
            question: q.map(String::from),
            question_sender: q.map(|_| "Dana".to_string()),
            answer: "בשמונה".into(),
            answer_sender: "Nevo Perets".into(),
            date: "1.2.24".into(),
            time: "10:00:00".into(),
            is_media_answer: false,
            manager_id: Some("nevo".into()),
            media: None,
            associated_media: vec![],
        };
        let log = conversation_log(&[pair(Some("מתי?")), pair(None)]);
        assert_eq!(log.total, 2);
        assert_eq!(log.conversations[0].id, "conv-1");
        assert_eq!(log.conversations[1].id, "conv-2");
        assert_eq!(log.conversations[1].question_sender, "Unknown");
        assert!(chrono::DateTime::parse_from_rfc3339(&log.generated_at).is_ok());
    }
}

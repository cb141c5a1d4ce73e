//! Role and content classification.
//!
//! Every list the classifier consults (manager identities, noise phrases,
//! operational keywords, attachment markers, extension tables) comes from
//! [`AppConfig`]. Nothing here is hard-coded to a particular chat.

use regex::Regex;
use tracing::debug;

use chatmine_shared::{
    AppConfig, ChatMineError, ManagerIdentity, MediaInfo, MediaType, Message, Result,
};

use crate::normalize::{char_len, normalize};
use crate::parser::{RawEntry, contains_placeholder};

/// Compiled classification rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    managers: Vec<ManagerIdentity>,
    attachment_re: Regex,
    omitted_image_markers: Vec<String>,
    image_extensions: Vec<String>,
    video_extensions: Vec<String>,
    document_extensions: Vec<String>,
    /// Noise phrases in normalized form.
    noise_phrases: Vec<String>,
    noise_min_chars: usize,
    noise_max_remainder_chars: usize,
    /// Operational keywords, lowercased.
    keywords: Vec<String>,
    placeholders: Vec<String>,
}

impl Classifier {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let label = regex::escape(config.media.attachment_label.trim());
        let attachment_re = Regex::new(&format!(r"<{label}:\s*([^>]+)>"))
            .map_err(|e| ChatMineError::config(format!("invalid attachment label: {e}")))?;

        let lower = |list: &[String]| -> Vec<String> {
            list.iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let noise_phrases: Vec<String> = config
            .noise
            .phrases
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty())
            .collect();

        let classifier = Self {
            managers: config.managers.clone(),
            attachment_re,
            omitted_image_markers: config
                .media
                .omitted_image_markers
                .iter()
                .filter(|m| !m.trim().is_empty())
                .cloned()
                .collect(),
            image_extensions: lower(&config.media.image_extensions),
            video_extensions: lower(&config.media.video_extensions),
            document_extensions: lower(&config.media.document_extensions),
            noise_phrases,
            noise_min_chars: config.noise.min_chars,
            noise_max_remainder_chars: config.noise.max_remainder_chars,
            keywords: lower(&config.operational.keywords),
            placeholders: config
                .transcript
                .placeholders
                .iter()
                .filter(|p| !p.trim().is_empty())
                .cloned()
                .collect(),
        };

        debug!(
            managers = classifier.managers.len(),
            noise_phrases = classifier.noise_phrases.len(),
            keywords = classifier.keywords.len(),
            "classifier ready"
        );

        Ok(classifier)
    }

    // -----------------------------------------------------------------------
    // Role
    // -----------------------------------------------------------------------

    /// First configured identity with a name variant contained in `sender`.
    pub fn manager_id(&self, sender: &str) -> Option<&str> {
        self.managers
            .iter()
            .find(|m| m.names.iter().any(|name| sender.contains(name.as_str())))
            .map(|m| m.id.as_str())
    }

    pub fn is_manager(&self, sender: &str) -> bool {
        self.manager_id(sender).is_some()
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Attachment reference in a message body, if any.
    pub fn detect_media(&self, text: &str) -> Option<MediaInfo> {
        if let Some(caps) = self.attachment_re.captures(text) {
            let filename = caps[1].trim().to_string();
            let media_type = self.media_type_for(&filename);
            return Some(MediaInfo {
                filename: Some(filename),
                media_type,
            });
        }

        if self
            .omitted_image_markers
            .iter()
            .any(|m| text.contains(m.as_str()))
        {
            return Some(MediaInfo {
                filename: None,
                media_type: MediaType::ImageRemoved,
            });
        }

        None
    }

    fn media_type_for(&self, filename: &str) -> MediaType {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if ext.is_empty() {
            MediaType::File
        } else if self.image_extensions.contains(&ext) {
            MediaType::Image
        } else if self.video_extensions.contains(&ext) {
            MediaType::Video
        } else if self.document_extensions.contains(&ext) {
            MediaType::Document
        } else {
            MediaType::File
        }
    }

    /// Greetings, acknowledgements, laughter, and very short texts.
    ///
    /// A text that starts with a noise phrase is noise only when the phrase
    /// ends on a word boundary (or is followed by a repetition of its own
    /// letters, as in drawn-out laughter) and little text follows it.
    pub fn is_noise(&self, text: &str) -> bool {
        let normalized = normalize(text);
        if char_len(&normalized) < self.noise_min_chars {
            return true;
        }

        self.noise_phrases.iter().any(|phrase| {
            if normalized == *phrase {
                return true;
            }
            let Some(rest) = normalized.strip_prefix(phrase.as_str()) else {
                return false;
            };
            if !on_phrase_boundary(phrase, rest) {
                return false;
            }
            char_len(rest.trim()) < self.noise_max_remainder_chars
        })
    }

    /// Whether the text mentions any configured operational keyword.
    pub fn has_operational_content(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Whether the text contains a system placeholder marker.
    pub fn is_placeholder(&self, text: &str) -> bool {
        contains_placeholder(text, &self.placeholders)
    }

    /// Attach role and media information to a parsed entry.
    pub fn classify(&self, entry: RawEntry) -> Message {
        let manager_id = self.manager_id(&entry.sender).map(str::to_string);
        let media = self.detect_media(&entry.text);
        Message {
            date: entry.date,
            time: entry.time,
            sender: entry.sender,
            text: entry.text,
            is_manager: manager_id.is_some(),
            manager_id,
            media,
        }
    }
}

/// `rest` follows `phrase` at a word boundary, or its first word only
/// repeats letters of the phrase.
fn on_phrase_boundary(phrase: &str, rest: &str) -> bool {
    match rest.chars().next() {
        None => true,
        Some(c) if c.is_whitespace() => true,
        Some(_) => {
            let first_word = rest.split_whitespace().next().unwrap_or_default();
            first_word.chars().all(|c| phrase.contains(c))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.managers = vec![
            ManagerIdentity {
                id: "nevo".into(),
                display_name: Some("נבו".into()),
                names: vec!["Nevo Perets".into(), "נבו פרץ".into()],
            },
            ManagerIdentity {
                id: "hila".into(),
                display_name: None,
                names: vec!["Hila".into()],
            },
        ];
        config
    }

    fn classifier() -> Classifier {
        Classifier::new(&config()).expect("classifier")
    }

    #[test]
    fn greeting_alone_is_noise() {
        let c = classifier();
        assert!(c.is_noise("שבת שלום"));
        assert!(c.is_noise("שבת שלום!!"));
        assert!(c.is_noise("תודה רבה"));
        assert!(c.is_noise("ok"));
    }

    #[test]
    fn greeting_followed_by_content_is_not_noise() {
        let c = classifier();
        assert!(!c.is_noise("שבת שלום ותזכורת שהקופה נסגרת ב-20:00 הערב"));
    }

    #[test]
    fn greeting_with_short_tail_is_noise() {
        let c = classifier();
        assert!(c.is_noise("בוקר טוב לכולם"));
        assert!(c.is_noise("חחחחחח"));
    }

    #[test]
    fn phrase_order_does_not_change_noise() {
        let mut reversed = config();
        reversed.noise.phrases.reverse();
        let c = classifier();
        let r = Classifier::new(&reversed).expect("classifier");
        for text in ["תודה רבה", "תודה רבה לכולם", "תודה רבה, הקופה נסגרת היום בשמונה"] {
            assert_eq!(c.is_noise(text), r.is_noise(text), "{text}");
        }
    }

    #[test]
    fn phrase_inside_a_longer_word_is_not_a_prefix_match() {
        let c = classifier();
        // Starts with "הי" but is a question, not a greeting.
        assert!(!c.is_noise("היכן המפתח"));
    }

    #[test]
    fn short_text_is_noise() {
        let c = classifier();
        assert!(c.is_noise("כן"));
        assert!(c.is_noise("  ?! "));
        assert!(!c.is_noise("מתי מגיעה הסחורה?"));
    }

    #[test]
    fn detects_attachment_types() {
        let c = classifier();

        let doc = c.detect_media("<מצורף: price-list.pdf>").expect("media");
        assert_eq!(doc.filename.as_deref(), Some("price-list.pdf"));
        assert_eq!(doc.media_type, MediaType::Document);

        let img = c.detect_media("00000012-PHOTO.JPG <מצורף: 00000012-PHOTO.JPG>").expect("media");
        assert_eq!(img.media_type, MediaType::Image);

        let video = c.detect_media("<מצורף: clip.mov>").expect("media");
        assert_eq!(video.media_type, MediaType::Video);

        let other = c.detect_media("<מצורף: archive.zip>").expect("media");
        assert_eq!(other.media_type, MediaType::File);

        let bare = c.detect_media("<מצורף: README>").expect("media");
        assert_eq!(bare.media_type, MediaType::File);
    }

    #[test]
    fn omitted_image_has_no_filename() {
        let c = classifier();
        let media = c.detect_media("התמונה הושמטה").expect("media");
        assert_eq!(media.filename, None);
        assert_eq!(media.media_type, MediaType::ImageRemoved);
    }

    #[test]
    fn plain_text_has_no_media() {
        assert!(classifier().detect_media("נא לשלוח קבלה").is_none());
    }

    #[test]
    fn custom_attachment_label_is_escaped() {
        let mut config = config();
        config.media.attachment_label = "attached (file)".into();
        let c = Classifier::new(&config).expect("classifier");
        let media = c.detect_media("<attached (file): menu.png>").expect("media");
        assert_eq!(media.filename.as_deref(), Some("menu.png"));
        assert!(c.detect_media("<מצורף: menu.png>").is_none());
    }

    #[test]
    fn manager_identity_by_name_variant() {
        let c = classifier();
        assert_eq!(c.manager_id("Nevo Perets"), Some("nevo"));
        assert_eq!(c.manager_id("~ נבו פרץ"), Some("nevo"));
        assert_eq!(c.manager_id("Hila Cohen"), Some("hila"));
        assert!(!c.is_manager("Dana Levi"));
    }

    #[test]
    fn no_identities_means_no_managers() {
        let c = Classifier::new(&AppConfig::default()).expect("classifier");
        assert!(!c.is_manager("Nevo Perets"));
    }

    #[test]
    fn operational_keywords_match_case_insensitively() {
        let mut config = config();
        config.operational.keywords.push("Pump".into());
        let c = Classifier::new(&config).expect("classifier");
        assert!(c.has_operational_content("הקופה נסגרת בשמונה"));
        assert!(c.has_operational_content("PUMP 4 is down"));
        assert!(!c.has_operational_content("מה נשמע"));
    }

    #[test]
    fn classify_fills_role_and_media() {
        let c = classifier();
        let msg = c.classify(RawEntry {
            date: "3.4.24".into(),
            time: "08:00:00".into(),
            sender: "Nevo Perets".into(),
            text: "<מצורף: price-list.pdf>".into(),
        });
        assert!(msg.is_manager);
        assert_eq!(msg.manager_id.as_deref(), Some("nevo"));
        assert!(msg.is_media());
    }

    #[test]
    fn placeholder_detection() {
        let c = classifier();
        assert!(c.is_placeholder("הודעה זו נמחקה"));
        assert!(!c.is_placeholder("הודעה חשובה"));
    }
}

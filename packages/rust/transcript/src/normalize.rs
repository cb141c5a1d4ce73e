//! Text normalization passes.
//!
//! Two renderings of a message body:
//! - [`clean_text`] — the display form (bidi/isolate controls stripped, trimmed)
//! - [`normalize_for_key`] — a lossy comparison key used only for clustering
//!   and dedup, never for display
//!
//! Both are total functions and the key form is idempotent.

use std::sync::LazyLock;

use regex::Regex;

/// Left-to-right/right-to-left marks, embeddings/overrides, and isolates.
static BIDI_CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{200E}\x{200F}\x{202A}-\x{202E}\x{2066}-\x{2069}]").expect("bidi regex")
});

/// Punctuation removed from comparison keys.
static KEY_PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[?.!,\-'"()]"#).expect("punctuation regex"));

/// Strip bidirectional control characters and surrounding whitespace.
pub fn clean_text(raw: &str) -> String {
    BIDI_CONTROL_RE.replace_all(raw, "").trim().to_string()
}

/// Uncapped comparison form: cleaned, lowercased, punctuation-free,
/// single-spaced.
pub fn normalize(raw: &str) -> String {
    let lowered = clean_text(raw).to_lowercase();
    let stripped = KEY_PUNCTUATION_RE.replace_all(&lowered, "");
    collapse_whitespace(&stripped)
}

/// Comparison key capped at `max_chars` characters.
pub fn normalize_for_key(raw: &str, max_chars: usize) -> String {
    let normalized = normalize(raw);
    truncate_chars(&normalized, max_chars).trim_end().to_string()
}

/// Collapse whitespace runs to a single space and trim both ends.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Take at most `max_chars` characters (never splits a code point).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Character count (the unit every length threshold is expressed in).
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clean_text_strips_bidi_marks() {
        let raw = "\u{200e}[12.3.24, 09:15:02] \u{202a}Nevo Perets\u{202c}: שלום\u{200f} ";
        assert_eq!(clean_text(raw), "[12.3.24, 09:15:02] Nevo Perets: שלום");
    }

    #[test]
    fn clean_text_keeps_inner_newlines() {
        assert_eq!(clean_text("  line one\nline two  "), "line one\nline two");
    }

    #[test]
    fn normalize_ignores_case_punctuation_and_spacing() {
        let a = normalize("Please send the RECEIPT!!");
        let b = normalize("  please   send the receipt ");
        assert_eq!(a, b);
        assert_eq!(a, "please send the receipt");
    }

    #[test]
    fn normalize_hebrew_with_marks() {
        let a = normalize("\u{200f}נא לשלוח קבלה, בסוף משמרת.");
        let b = normalize("נא לשלוח  קבלה בסוף משמרת");
        assert_eq!(a, b);
    }

    #[test]
    fn normalize_for_key_caps_by_characters() {
        let key = normalize_for_key("אבגדהוזחטי", 4);
        assert_eq!(key, "אבגד");
        assert_eq!(char_len(&key), 4);
    }

    #[test]
    fn normalize_for_key_trims_after_cap() {
        assert_eq!(normalize_for_key("abc def", 4), "abc");
    }

    #[test]
    fn texts_differing_beyond_cap_share_a_key() {
        let a = normalize_for_key("the pump on lane three is broken today", 20);
        let b = normalize_for_key("The pump on lane three is BROKEN again", 20);
        assert_eq!(a, b);
    }

    #[test]
    fn truncate_chars_short_input_untouched() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    proptest! {
        #[test]
        fn normalize_for_key_is_idempotent(s in any::<String>(), cap in 1usize..120) {
            let once = normalize_for_key(&s, cap);
            let twice = normalize_for_key(&once, cap);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalize_is_idempotent(s in "\\PC*") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn surface_variants_share_a_key(words in proptest::collection::vec("[a-zא-ת]{1,8}", 1..6)) {
            let plain = words.join(" ");
            let noisy = format!("  {}?! ", words.join(",   ").to_uppercase());
            prop_assert_eq!(normalize_for_key(&plain, 80), normalize_for_key(&noisy, 80));
        }
    }
}

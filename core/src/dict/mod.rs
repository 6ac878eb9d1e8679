//! Word dictionaries
//!
//! Two immutable memory-mapped tries (English, Vietnamese) plus mutable
//! custom overlays loaded from JSON. The engine asks one question per
//! word break: is this raw typing English-and-not-Vietnamese?

pub mod trie;

use std::collections::HashSet;
use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

pub use trie::{Trie, TrieBuilder};

/// Dictionary loading errors. All are recoverable: a failed load leaves
/// the previous state untouched and the affected checks return false.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error("dictionary I/O error on {0}: {1}")]
    Io(String, std::io::Error),
    #[error("not a PHT2 dictionary")]
    BadMagic,
    #[error("unsupported PHT2 version {0}")]
    BadVersion(u8),
    #[error("truncated or corrupt trie")]
    Truncated,
    #[error("malformed custom dictionary: {0}")]
    BadCustomJson(#[from] serde_json::Error),
}

/// Which trie a load call targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DictKind {
    English,
    Vietnamese,
}

#[derive(Deserialize)]
struct CustomWord {
    word: String,
    #[serde(rename = "type")]
    kind: String,
}

/// The dictionary set owned by one engine.
#[derive(Default)]
pub struct Dictionary {
    english: Option<Trie>,
    vietnamese: Option<Trie>,
    custom_english: HashSet<String>,
    custom_vietnamese: HashSet<String>,
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary::default()
    }

    /// Map a prebuilt trie. On failure the previous trie (if any) stays.
    pub fn load(&mut self, kind: DictKind, path: &Path) -> Result<(), DictError> {
        let trie = Trie::open(path)?;
        debug!(
            "loaded {:?} dictionary from {} ({} words)",
            kind,
            path.display(),
            trie.len()
        );
        match kind {
            DictKind::English => self.english = Some(trie),
            DictKind::Vietnamese => self.vietnamese = Some(trie),
        }
        Ok(())
    }

    /// Replace the custom overlays from JSON:
    /// `[{"word": "vinfast", "type": "en"}, {"word": "xin", "type": "vi"}]`
    pub fn load_custom(&mut self, json: &[u8]) -> Result<usize, DictError> {
        let entries: Vec<CustomWord> = serde_json::from_slice(json)?;
        self.custom_english.clear();
        self.custom_vietnamese.clear();
        for entry in &entries {
            let word = entry.word.trim().to_lowercase();
            if word.is_empty() {
                continue;
            }
            match entry.kind.as_str() {
                "en" => {
                    self.custom_english.insert(word);
                }
                "vi" => {
                    self.custom_vietnamese.insert(word);
                }
                other => warn!("custom dictionary entry with unknown type {:?}", other),
            }
        }
        Ok(entries.len())
    }

    pub fn clear_custom(&mut self) {
        self.custom_english.clear();
        self.custom_vietnamese.clear();
    }

    pub fn english_loaded(&self) -> bool {
        self.english.is_some()
    }

    pub fn vietnamese_loaded(&self) -> bool {
        self.vietnamese.is_some()
    }

    pub fn english_len(&self) -> usize {
        self.english.as_ref().map(Trie::len).unwrap_or(0)
    }

    pub fn vietnamese_len(&self) -> usize {
        self.vietnamese.as_ref().map(Trie::len).unwrap_or(0)
    }

    pub fn custom_english_len(&self) -> usize {
        self.custom_english.len()
    }

    pub fn custom_vietnamese_len(&self) -> usize {
        self.custom_vietnamese.len()
    }

    /// Word present in the English trie or custom English overlay.
    /// `word` is lowercase ASCII.
    pub fn is_english(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        self.custom_english.contains(word)
            || self
                .english
                .as_ref()
                .map(|t| t.contains(word))
                .unwrap_or(false)
    }

    /// Word present in the Vietnamese trie or custom Vietnamese overlay.
    /// A missing Vietnamese trie behaves as an empty one.
    pub fn is_vietnamese(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        self.custom_vietnamese.contains(word)
            || self
                .vietnamese
                .as_ref()
                .map(|t| t.contains(word))
                .unwrap_or(false)
    }

    /// The auto-restore decision: English and not Vietnamese.
    pub fn should_restore_english(&self, word: &str) -> bool {
        self.is_english(word) && !self.is_vietnamese(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("vikey-dict-{}-{}", std::process::id(), name));
        p
    }

    fn write_trie(name: &str, words: &[&str]) -> std::path::PathBuf {
        let mut builder = TrieBuilder::new();
        for w in words {
            builder.insert(w);
        }
        let path = temp_path(name);
        builder.write_to(&path).unwrap();
        path
    }

    #[test]
    fn test_restore_decision() {
        let en = write_trie("en.bin", &["terminal", "user", "the"]);
        let vi = write_trie("vi.bin", &["thu", "the"]);

        let mut dict = Dictionary::new();
        dict.load(DictKind::English, &en).unwrap();
        dict.load(DictKind::Vietnamese, &vi).unwrap();

        assert!(dict.should_restore_english("terminal"));
        assert!(dict.should_restore_english("user"));
        // "the" is in both: never restored
        assert!(!dict.should_restore_english("the"));
        assert!(!dict.should_restore_english("tieng"));

        std::fs::remove_file(&en).ok();
        std::fs::remove_file(&vi).ok();
    }

    #[test]
    fn test_missing_vietnamese_trie_allows_restores() {
        let en = write_trie("en-only.bin", &["expect"]);
        let mut dict = Dictionary::new();
        dict.load(DictKind::English, &en).unwrap();
        assert!(dict.should_restore_english("expect"));
        std::fs::remove_file(&en).ok();
    }

    #[test]
    fn test_custom_overlay() {
        let mut dict = Dictionary::new();
        let json = br#"[
            {"word": "qes", "type": "en"},
            {"word": "vinfast", "type": "en"},
            {"word": "xin", "type": "vi"}
        ]"#;
        assert_eq!(dict.load_custom(json).unwrap(), 3);
        assert_eq!(dict.custom_english_len(), 2);
        assert_eq!(dict.custom_vietnamese_len(), 1);
        assert!(dict.should_restore_english("qes"));
        assert!(dict.is_vietnamese("xin"));

        dict.clear_custom();
        assert!(!dict.is_english("qes"));
    }

    #[test]
    fn test_bad_json_keeps_state() {
        let mut dict = Dictionary::new();
        dict.load_custom(br#"[{"word": "ok", "type": "en"}]"#)
            .unwrap();
        assert!(dict.load_custom(b"not json").is_err());
        // A failed replace clears nothing it did not parse
        assert!(dict.is_english("ok"));
    }

    #[test]
    fn test_failed_load_keeps_previous() {
        let en = write_trie("keep.bin", &["keep"]);
        let mut dict = Dictionary::new();
        dict.load(DictKind::English, &en).unwrap();

        let bogus = temp_path("bogus.bin");
        std::fs::write(&bogus, b"XXXX\x01\x00\x00\x00\x00").unwrap();
        assert!(dict.load(DictKind::English, &bogus).is_err());
        assert!(dict.is_english("keep"));

        std::fs::remove_file(&en).ok();
        std::fs::remove_file(&bogus).ok();
    }
}

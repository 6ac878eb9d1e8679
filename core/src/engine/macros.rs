//! Macro table
//!
//! Shortcut → expansion map with two persistence forms (binary blob and
//! tab-separated text) and dynamic snippets. Static expansions are
//! pre-composed into engine codes at load; dynamic snippets compute
//! their payload at each match through an injectable environment, so
//! tests stay deterministic.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use log::{debug, warn};
use rand::Rng;

use super::code::EngCode;
use crate::data::keys;

/// Snippet kinds, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SnippetType {
    Static = 0,
    Date = 1,
    Time = 2,
    DateTime = 3,
    Clipboard = 4,
    Random = 5,
    Counter = 6,
}

impl SnippetType {
    pub fn from_u8(v: u8) -> SnippetType {
        match v {
            1 => SnippetType::Date,
            2 => SnippetType::Time,
            3 => SnippetType::DateTime,
            4 => SnippetType::Clipboard,
            5 => SnippetType::Random,
            6 => SnippetType::Counter,
            _ => SnippetType::Static,
        }
    }
}

/// Host services a dynamic snippet may need. `Send` because the engine
/// that owns the environment crosses thread boundaries inside hosts.
pub trait SnippetEnv: Send {
    fn now(&self) -> NaiveDateTime;
    /// Uniform pick in `0..n` (n ≥ 1)
    fn random_index(&self, n: usize) -> usize;
    fn clipboard(&self) -> Option<String>;
}

/// Production environment: local clock, thread RNG, no clipboard (the
/// host shim supplies clipboard text where the platform allows it).
#[derive(Default)]
pub struct SystemEnv;

impl SnippetEnv for SystemEnv {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn random_index(&self, n: usize) -> usize {
        rand::thread_rng().gen_range(0..n)
    }

    fn clipboard(&self) -> Option<String> {
        None
    }
}

/// One macro definition.
#[derive(Clone, Debug)]
pub struct MacroEntry {
    pub shortcut: String,
    pub content: String,
    pub snippet: SnippetType,
    /// Pre-composed expansion for static entries
    cached: Option<Vec<EngCode>>,
    /// Monotonic counter for `Counter` snippets
    counter: u64,
}

impl MacroEntry {
    fn new(shortcut: &str, content: &str, snippet: SnippetType) -> MacroEntry {
        let counter = if snippet == SnippetType::Counter {
            content.trim().parse().unwrap_or(1)
        } else {
            0
        };
        let cached = if snippet == SnippetType::Static {
            Some(compose_text(content))
        } else {
            None
        };
        MacroEntry {
            shortcut: shortcut.to_string(),
            content: content.to_string(),
            snippet,
            cached,
            counter,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MacroError {
    #[error("truncated macro blob at entry {0}")]
    Truncated(usize),
    #[error("macro I/O error on {0}: {1}")]
    Io(String, std::io::Error),
}

/// Convert UTF-8 text into engine codes: ASCII keys stay key-coded so
/// case transforms work; everything else is carried as a pure character.
fn compose_text(text: &str) -> Vec<EngCode> {
    text.chars()
        .map(|c| match keys::from_ascii(c) {
            Some(key) if c.is_ascii() => EngCode::from_key(key, c.is_ascii_uppercase()),
            _ => EngCode::pure(c),
        })
        .collect()
}

fn uppercase_code(code: EngCode) -> EngCode {
    if let Some(c) = code.pure_char() {
        let upper = c.to_uppercase().next().unwrap_or(c);
        return EngCode::pure(upper);
    }
    let mut out = code;
    out.set_caps(true);
    out
}

/// The macro table. Entries keep insertion order for stable saves;
/// lookups go through a normalized index.
#[derive(Default)]
pub struct MacroTable {
    entries: Vec<MacroEntry>,
    /// lowercase shortcut → entry index
    index: HashMap<String, usize>,
}

/// Result of a successful macro match.
pub struct MacroExpansion {
    pub chars: Vec<EngCode>,
}

impl MacroTable {
    pub fn new() -> MacroTable {
        MacroTable::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn has(&self, shortcut: &str) -> bool {
        self.index.contains_key(&shortcut.to_lowercase())
    }

    pub fn entries(&self) -> &[MacroEntry] {
        &self.entries
    }

    /// Add or replace a definition.
    pub fn add(&mut self, shortcut: &str, content: &str, snippet: SnippetType) {
        let shortcut = shortcut.trim();
        if shortcut.is_empty() {
            return;
        }
        let key = shortcut.to_lowercase();
        let entry = MacroEntry::new(shortcut, content, snippet);
        match self.index.get(&key) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn remove(&mut self, shortcut: &str) -> bool {
        let key = shortcut.to_lowercase();
        match self.index.remove(&key) {
            Some(i) => {
                self.entries.remove(i);
                self.reindex();
                true
            }
            None => false,
        }
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, e) in self.entries.iter().enumerate() {
            self.index.insert(e.shortcut.to_lowercase(), i);
        }
    }

    /// Exact-match expansion for a finished word.
    ///
    /// With `auto_caps`, a case-folded second attempt matches `Btw`/`BTW`
    /// against a `btw` shortcut; the expansion's first character (or all
    /// of them) is uppercased to follow the typing.
    pub fn expand(
        &mut self,
        word: &str,
        auto_caps: bool,
        env: &dyn SnippetEnv,
    ) -> Option<MacroExpansion> {
        if word.is_empty() {
            return None;
        }

        // Direct match on the exact shortcut spelling
        if let Some(&i) = self.index.get(&word.to_lowercase()) {
            if self.entries[i].shortcut == word {
                let chars = self.expansion_codes(i, env);
                return Some(MacroExpansion { chars });
            }

            if auto_caps {
                let mut caps_chars = word.chars();
                let first_upper = caps_chars.next().map(|c| c.is_uppercase()).unwrap_or(false);
                if first_upper {
                    let all_upper = word.chars().all(|c| !c.is_lowercase());
                    let mut chars = self.expansion_codes(i, env);
                    if all_upper && word.chars().count() > 1 {
                        for c in chars.iter_mut() {
                            *c = uppercase_code(*c);
                        }
                    } else if let Some(first) = chars.first_mut() {
                        *first = uppercase_code(*first);
                    }
                    return Some(MacroExpansion { chars });
                }
            }
        }
        None
    }

    fn expansion_codes(&mut self, i: usize, env: &dyn SnippetEnv) -> Vec<EngCode> {
        let entry = &mut self.entries[i];
        match entry.snippet {
            SnippetType::Static => entry
                .cached
                .clone()
                .unwrap_or_else(|| compose_text(&entry.content)),
            SnippetType::Date => {
                let fmt = non_empty(&entry.content).unwrap_or("%Y-%m-%d");
                compose_text(&env.now().format(fmt).to_string())
            }
            SnippetType::Time => {
                let fmt = non_empty(&entry.content).unwrap_or("%H:%M");
                compose_text(&env.now().format(fmt).to_string())
            }
            SnippetType::DateTime => {
                let fmt = non_empty(&entry.content).unwrap_or("%Y-%m-%d %H:%M");
                compose_text(&env.now().format(fmt).to_string())
            }
            SnippetType::Clipboard => match env.clipboard() {
                Some(text) => compose_text(&text),
                None => Vec::new(),
            },
            SnippetType::Random => {
                let choices: Vec<&str> = entry.content.split('|').collect();
                if choices.is_empty() {
                    Vec::new()
                } else {
                    compose_text(choices[env.random_index(choices.len())])
                }
            }
            SnippetType::Counter => {
                let value = entry.counter;
                entry.counter += 1;
                compose_text(&value.to_string())
            }
        }
    }

    // ===== Binary form =====
    //
    // [u16 count][entry: u8 shortcutLen, bytes, u16 contentLen, bytes,
    // u8 snippetType]*

    /// Replace the table from a binary blob. A truncated blob leaves the
    /// current table untouched.
    pub fn load_binary(&mut self, data: &[u8]) -> Result<(), MacroError> {
        let mut parsed = MacroTable::new();
        if data.len() < 2 {
            if data.is_empty() {
                self.clear();
                return Ok(());
            }
            return Err(MacroError::Truncated(0));
        }

        let count = u16::from_le_bytes([data[0], data[1]]) as usize;
        let mut cursor = 2usize;
        for i in 0..count {
            let shortcut_len = *data.get(cursor).ok_or(MacroError::Truncated(i))? as usize;
            cursor += 1;
            let shortcut = data
                .get(cursor..cursor + shortcut_len)
                .ok_or(MacroError::Truncated(i))?;
            cursor += shortcut_len;

            let len_bytes = data
                .get(cursor..cursor + 2)
                .ok_or(MacroError::Truncated(i))?;
            let content_len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
            cursor += 2;
            let content = data
                .get(cursor..cursor + content_len)
                .ok_or(MacroError::Truncated(i))?;
            cursor += content_len;

            // snippet byte absent in old blobs
            let snippet = match data.get(cursor) {
                Some(&b) => {
                    cursor += 1;
                    SnippetType::from_u8(b)
                }
                None => SnippetType::Static,
            };

            let shortcut = String::from_utf8_lossy(shortcut).into_owned();
            let content = String::from_utf8_lossy(content).into_owned();
            parsed.add(&shortcut, &content, snippet);
        }

        debug!("loaded {} macros from binary blob", parsed.len());
        *self = parsed;
        Ok(())
    }

    pub fn to_binary(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let count = self.entries.len().min(u16::MAX as usize) as u16;
        out.extend_from_slice(&count.to_le_bytes());
        for entry in self.entries.iter().take(count as usize) {
            let shortcut = entry.shortcut.as_bytes();
            let content = serialized_content(entry);
            let content = content.as_bytes();
            out.push(shortcut.len().min(255) as u8);
            out.extend_from_slice(&shortcut[..shortcut.len().min(255)]);
            out.extend_from_slice(&(content.len().min(u16::MAX as usize) as u16).to_le_bytes());
            out.extend_from_slice(&content[..content.len().min(u16::MAX as usize)]);
            out.push(entry.snippet as u8);
        }
        out
    }

    // ===== Text form =====
    //
    // One `shortcut<TAB>content` per line, `\n \r \t \\` escaped.
    // Lines starting with `#` are comments.

    pub fn load_text(&mut self, text: &str) -> usize {
        let mut parsed = MacroTable::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some(tab) = trimmed.find('\t') else {
                warn!("macro line without separator: {:?}", trimmed);
                continue;
            };
            let shortcut = unescape(&trimmed[..tab]);
            let content = unescape(&trimmed[tab + 1..]);
            if shortcut.is_empty() || content.is_empty() {
                continue;
            }
            parsed.add(&shortcut, &content, SnippetType::Static);
        }
        let count = parsed.len();
        *self = parsed;
        count
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&escape(&entry.shortcut));
            out.push('\t');
            out.push_str(&escape(&entry.content));
            out.push('\n');
        }
        out
    }
}

/// Counter snippets persist their next value in the content field.
fn serialized_content(entry: &MacroEntry) -> String {
    if entry.snippet == SnippetType::Counter {
        entry.counter.to_string()
    } else {
        entry.content.clone()
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut iter = input.chars();
    while let Some(c) = iter.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match iter.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeEnv;

    impl SnippetEnv for FakeEnv {
        fn now(&self) -> NaiveDateTime {
            chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
        }

        fn random_index(&self, _n: usize) -> usize {
            0
        }

        fn clipboard(&self) -> Option<String> {
            Some("clip".to_string())
        }
    }

    fn codes_to_string(codes: &[EngCode]) -> String {
        codes
            .iter()
            .filter_map(|c| crate::data::chars::compose_code(*c))
            .collect()
    }

    #[test]
    fn test_static_expand() {
        let mut table = MacroTable::new();
        table.add("btw", "by the way", SnippetType::Static);
        let exp = table.expand("btw", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "by the way");
        assert!(table.expand("BTW", false, &FakeEnv).is_none());
    }

    #[test]
    fn test_auto_caps() {
        let mut table = MacroTable::new();
        table.add("btw", "by the way", SnippetType::Static);

        let exp = table.expand("Btw", true, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "By the way");

        let exp = table.expand("BTW", true, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "BY THE WAY");
    }

    #[test]
    fn test_unicode_content() {
        let mut table = MacroTable::new();
        table.add("vn", "Việt Nam", SnippetType::Static);
        let exp = table.expand("vn", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "Việt Nam");
    }

    #[test]
    fn test_dynamic_snippets() {
        let mut table = MacroTable::new();
        table.add("dd", "", SnippetType::Date);
        table.add("tt", "", SnippetType::Time);
        table.add("dt", "", SnippetType::DateTime);
        table.add("cb", "", SnippetType::Clipboard);
        table.add("pick", "x|y|z", SnippetType::Random);

        let exp = table.expand("dd", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "2024-03-15");
        let exp = table.expand("tt", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "09:30");
        let exp = table.expand("dt", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "2024-03-15 09:30");
        let exp = table.expand("cb", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "clip");
        let exp = table.expand("pick", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "x");
    }

    #[test]
    fn test_counter_snippet() {
        let mut table = MacroTable::new();
        table.add("inv", "100", SnippetType::Counter);
        let exp = table.expand("inv", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "100");
        let exp = table.expand("inv", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "101");

        // Counter survives a save/load cycle
        let blob = table.to_binary();
        let mut reloaded = MacroTable::new();
        reloaded.load_binary(&blob).unwrap();
        let exp = reloaded.expand("inv", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "102");
    }

    #[test]
    fn test_binary_roundtrip() {
        let mut table = MacroTable::new();
        table.add("vn", "Việt Nam", SnippetType::Static);
        table.add("dd", "%d/%m/%Y", SnippetType::Date);
        table.add("ms", "millisecond", SnippetType::Static);

        let blob = table.to_binary();
        let mut reloaded = MacroTable::new();
        reloaded.load_binary(&blob).unwrap();
        assert_eq!(reloaded.len(), 3);
        // insertion order is stable
        let shortcuts: Vec<&str> = reloaded.entries().iter().map(|e| e.shortcut.as_str()).collect();
        assert_eq!(shortcuts, ["vn", "dd", "ms"]);
        let exp = reloaded.expand("dd", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "15/03/2024");
    }

    #[test]
    fn test_truncated_blob_keeps_table() {
        let mut table = MacroTable::new();
        table.add("keep", "me", SnippetType::Static);
        let mut blob = table.to_binary();

        let mut other = MacroTable::new();
        other.add("old", "value", SnippetType::Static);
        blob.truncate(blob.len() - 2);
        assert!(other.load_binary(&blob).is_err());
        assert!(other.has("old"));
    }

    #[test]
    fn test_text_roundtrip() {
        let mut table = MacroTable::new();
        table.add("addr", "12 Lê Lợi\nQuận 1", SnippetType::Static);
        table.add("tab", "a\tb", SnippetType::Static);

        let text = table.to_text();
        let mut reloaded = MacroTable::new();
        assert_eq!(reloaded.load_text(&text), 2);
        let exp = reloaded.expand("addr", false, &FakeEnv).unwrap();
        assert_eq!(codes_to_string(&exp.chars), "12 Lê Lợi\nQuận 1");
    }

    #[test]
    fn test_text_comments_and_bad_lines() {
        let mut table = MacroTable::new();
        let loaded = table.load_text("# comment\nnospearator\nok\tvalue\n");
        assert_eq!(loaded, 1);
        assert!(table.has("ok"));
    }

    #[test]
    fn test_remove() {
        let mut table = MacroTable::new();
        table.add("a", "1", SnippetType::Static);
        table.add("b", "2", SnippetType::Static);
        assert!(table.remove("a"));
        assert!(!table.remove("a"));
        assert_eq!(table.len(), 1);
        assert!(table.expand("b", false, &FakeEnv).is_some());
    }
}

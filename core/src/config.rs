//! Runtime configuration
//!
//! All engine behavior flags live in one immutable value. Hosts build a
//! new snapshot and swap it through [`SharedConfig`]; the engine loads
//! the pointer once per event, so no flag can tear mid-keystroke.
//!
//! The on-disk form is INI-style `key=value` with `#`/`;` comments.
//! Unknown keys are ignored; malformed values keep their previous
//! setting, and an unreadable file keeps the whole previous snapshot.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::{debug, warn};

use crate::data::codetable::CodeTable;
use crate::data::keys;
use crate::input::InputType;

/// Engine language mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Language {
    English = 0,
    #[default]
    Vietnamese = 1,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error on {0}: {1}")]
    Io(String, std::io::Error),
}

// Switch-hotkey encoding: bits 0..7 key id, 8 Ctrl, 9 Option/Alt,
// 10 Command/Win, 11 Shift, 12 Fn, 15 beep.
pub const SWITCH_CTRL: u32 = 1 << 8;
pub const SWITCH_OPTION: u32 = 1 << 9;
pub const SWITCH_COMMAND: u32 = 1 << 10;
pub const SWITCH_SHIFT: u32 = 1 << 11;
pub const SWITCH_FN: u32 = 1 << 12;
pub const SWITCH_BEEP: u32 = 1 << 15;

pub fn switch_key(status: u32) -> u16 {
    (status & 0xFF) as u16
}

pub fn switch_has_ctrl(status: u32) -> bool {
    status & SWITCH_CTRL != 0
}

pub fn switch_has_option(status: u32) -> bool {
    status & SWITCH_OPTION != 0
}

pub fn switch_has_command(status: u32) -> bool {
    status & SWITCH_COMMAND != 0
}

pub fn switch_has_shift(status: u32) -> bool {
    status & SWITCH_SHIFT != 0
}

pub fn switch_has_fn(status: u32) -> bool {
    status & SWITCH_FN != 0
}

pub fn switch_has_beep(status: u32) -> bool {
    status & SWITCH_BEEP != 0
}

/// One immutable set of runtime flags.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigSnapshot {
    pub language: Language,
    pub input_type: InputType,
    pub code_table: CodeTable,
    pub switch_key_status: u32,

    pub check_spelling: bool,
    pub restore_if_wrong_spelling: bool,
    pub use_modern_orthography: bool,
    pub quick_telex: bool,
    pub use_macro: bool,
    pub use_macro_in_english_mode: bool,
    pub auto_caps_macro: bool,
    pub use_smart_switch_key: bool,
    pub upper_case_first_char: bool,
    pub allow_consonant_zfwj: bool,
    pub quick_start_consonant: bool,
    pub quick_end_consonant: bool,
    pub remember_code: bool,
    pub restore_on_escape: bool,
    pub custom_escape_key: u16,
    pub pause_key_enabled: bool,
    pub pause_key: u16,
    pub auto_restore_english_word: bool,
    pub send_key_step_by_step: bool,
    pub fix_recommend_browser: bool,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        ConfigSnapshot {
            language: Language::Vietnamese,
            input_type: InputType::Telex,
            code_table: CodeTable::Unicode,
            switch_key_status: SWITCH_CTRL | keys::SPACE as u32,
            check_spelling: true,
            restore_if_wrong_spelling: true,
            use_modern_orthography: true,
            quick_telex: false,
            use_macro: false,
            use_macro_in_english_mode: false,
            auto_caps_macro: false,
            use_smart_switch_key: false,
            upper_case_first_char: false,
            allow_consonant_zfwj: false,
            quick_start_consonant: false,
            quick_end_consonant: false,
            remember_code: false,
            restore_on_escape: false,
            custom_escape_key: keys::ESC,
            pause_key_enabled: false,
            pause_key: keys::LEFT_OPTION,
            auto_restore_english_word: false,
            send_key_step_by_step: false,
            fix_recommend_browser: false,
        }
    }
}

impl ConfigSnapshot {
    /// Parse INI text over a fallback snapshot. Missing or malformed
    /// values keep the fallback's setting.
    pub fn from_ini(text: &str, fallback: &ConfigSnapshot) -> ConfigSnapshot {
        let table = parse_ini(text);
        let mut cfg = fallback.clone();

        if let Some(v) = read_int(&table, "language") {
            cfg.language = if v == 0 {
                Language::English
            } else {
                Language::Vietnamese
            };
        }
        if let Some(v) = read_int(&table, "input_type") {
            cfg.input_type = InputType::from_u8(v.clamp(0, 3) as u8);
        }
        if let Some(v) = read_int(&table, "code_table") {
            cfg.code_table = CodeTable::from_u8(v.clamp(0, 4) as u8);
        }
        if let Some(v) = read_int(&table, "switch_key_status") {
            cfg.switch_key_status = v as u32;
        }

        read_bool(&table, "check_spelling", &mut cfg.check_spelling);
        read_bool(
            &table,
            "restore_if_wrong_spelling",
            &mut cfg.restore_if_wrong_spelling,
        );
        read_bool(
            &table,
            "use_modern_orthography",
            &mut cfg.use_modern_orthography,
        );
        read_bool(&table, "quick_telex", &mut cfg.quick_telex);
        read_bool(&table, "use_macro", &mut cfg.use_macro);
        read_bool(
            &table,
            "use_macro_in_english_mode",
            &mut cfg.use_macro_in_english_mode,
        );
        read_bool(&table, "auto_caps_macro", &mut cfg.auto_caps_macro);
        read_bool(
            &table,
            "use_smart_switch_key",
            &mut cfg.use_smart_switch_key,
        );
        read_bool(
            &table,
            "upper_case_first_char",
            &mut cfg.upper_case_first_char,
        );
        read_bool(
            &table,
            "allow_consonant_zfwj",
            &mut cfg.allow_consonant_zfwj,
        );
        read_bool(
            &table,
            "quick_start_consonant",
            &mut cfg.quick_start_consonant,
        );
        read_bool(&table, "quick_end_consonant", &mut cfg.quick_end_consonant);
        read_bool(&table, "remember_code", &mut cfg.remember_code);
        read_bool(&table, "restore_on_escape", &mut cfg.restore_on_escape);
        read_bool(&table, "pause_key_enabled", &mut cfg.pause_key_enabled);
        read_bool(
            &table,
            "auto_restore_english_word",
            &mut cfg.auto_restore_english_word,
        );
        read_bool(
            &table,
            "send_key_step_by_step",
            &mut cfg.send_key_step_by_step,
        );
        read_bool(
            &table,
            "fix_recommend_browser",
            &mut cfg.fix_recommend_browser,
        );

        if let Some(v) = read_int(&table, "custom_escape_key") {
            cfg.custom_escape_key = if v > 0 { v as u16 } else { keys::ESC };
        }
        if let Some(v) = read_int(&table, "pause_key") {
            cfg.pause_key = if v > 0 { v as u16 } else { keys::LEFT_OPTION };
        }

        cfg
    }

    /// Read a config file; an unreadable file is an error so the caller
    /// can keep its previous snapshot.
    pub fn from_path(path: &Path, fallback: &ConfigSnapshot) -> Result<ConfigSnapshot, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        debug!("loaded runtime config from {}", path.display());
        Ok(ConfigSnapshot::from_ini(&text, fallback))
    }
}

fn parse_ini(text: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        let Some(sep) = trimmed.find('=') else {
            continue;
        };
        if sep == 0 {
            continue;
        }
        let key = trimmed[..sep].trim().to_lowercase();
        let value = trimmed[sep + 1..].trim().to_string();
        if !key.is_empty() {
            out.insert(key, value);
        }
    }
    out
}

fn read_int(table: &HashMap<String, String>, key: &str) -> Option<i64> {
    let raw = table.get(key)?;
    match raw.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("config key {:?} has non-numeric value {:?}", key, raw);
            None
        }
    }
}

fn read_bool(table: &HashMap<String, String>, key: &str, target: &mut bool) {
    if let Some(v) = read_int(table, key) {
        *target = v != 0;
    }
}

/// Split a `|`-separated config value with `\n \t \\` escapes; empty
/// items are dropped.
pub fn parse_escaped_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            match c {
                'n' => current.push('\n'),
                't' => current.push('\t'),
                '\\' => current.push('\\'),
                other => current.push(other),
            }
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '|' => {
                let item = current.trim().to_string();
                if !item.is_empty() {
                    items.push(item);
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if escaped {
        current.push('\\');
    }
    let item = current.trim().to_string();
    if !item.is_empty() {
        items.push(item);
    }
    items
}

/// Lock-free config holder: writers swap whole snapshots, the engine
/// loads the pointer once at each event boundary.
pub struct SharedConfig {
    inner: ArcSwap<ConfigSnapshot>,
}

impl Default for SharedConfig {
    fn default() -> Self {
        SharedConfig::new(ConfigSnapshot::default())
    }
}

impl SharedConfig {
    pub fn new(snapshot: ConfigSnapshot) -> SharedConfig {
        SharedConfig {
            inner: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn load(&self) -> Arc<ConfigSnapshot> {
        self.inner.load_full()
    }

    pub fn store(&self, snapshot: ConfigSnapshot) {
        self.inner.store(Arc::new(snapshot));
    }
}

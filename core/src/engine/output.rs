//! Output assembly
//!
//! Turns composed engine codes into code-table units and keeps the
//! per-session sync stack that measures how many physical code units
//! each slot occupies on screen. Backspace counts are expressed in
//! rendered units, so double-code tables stay balanced.

use smallvec::SmallVec;

use super::buffer::MAX_BUFF;
use super::code::{EngCode, Shape};
use crate::data::codetable::{self, CodeTable};
use crate::data::keys;

/// Primary output code, mirrored to hosts as a byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum OutputCode {
    #[default]
    DoNothing = 0,
    WillProcess = 1,
    BreakWord = 2,
    Restore = 3,
    ReplaceMacro = 4,
    RestoreAndNewSession = 5,
}

/// Secondary output classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ExtCode {
    #[default]
    None = 0,
    WordBreak = 1,
    Delete = 2,
    Normal = 3,
    SuppressEmpty = 4,
    AutoEnglishRestore = 5,
}

/// One keystroke's worth of screen instructions.
///
/// Hosts delete `backspace_count` rendered units, then insert
/// `committed` iterating in REVERSE, then (for restore codes) emit the
/// break key; `ReplaceMacro` emits `macro_chars` in order first.
#[derive(Debug, Default)]
pub struct EngineOutput {
    pub code: OutputCode,
    pub ext_code: ExtCode,
    pub backspace_count: u8,
    pub committed: SmallVec<[EngCode; MAX_BUFF]>,
    pub macro_chars: Vec<EngCode>,
}

impl EngineOutput {
    pub fn nothing() -> EngineOutput {
        EngineOutput::default()
    }

    pub fn break_word() -> EngineOutput {
        EngineOutput {
            code: OutputCode::BreakWord,
            ext_code: ExtCode::WordBreak,
            ..Default::default()
        }
    }
}

/// Encoder for the active code table.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputEncoder {
    table: CodeTable,
}

impl OutputEncoder {
    pub fn new(table: CodeTable) -> OutputEncoder {
        OutputEncoder { table }
    }

    pub fn table(&self) -> CodeTable {
        self.table
    }

    pub fn set_table(&mut self, table: CodeTable) {
        self.table = table;
    }

    /// Encode one composed code into its output form.
    ///
    /// Untouched letters stay key-coded (hosts render their own ASCII);
    /// shaped or marked letters become char codes carrying the table
    /// unit.
    pub fn encode(&self, code: EngCode) -> EngCode {
        if code.is_pure() || code.is_char_code() {
            return code;
        }
        let needs_table = code.shape() != Shape::None || code.has_mark();
        if !needs_table {
            return code;
        }
        match codetable::unit_for(self.table, code) {
            Some(unit) => EngCode::char_code(unit, code.caps()),
            None => code,
        }
    }

    /// Rendered code units for one encoded slot (1 or 2).
    pub fn rendered_units(&self, encoded: EngCode) -> u8 {
        if encoded.is_pure() {
            return 1;
        }
        if !encoded.is_char_code() {
            return 1;
        }
        match codetable::split_unit(self.table, encoded.payload()) {
            (_, Some(_)) => 2,
            _ => 1,
        }
    }

    /// Expand an encoded slot into host characters.
    pub fn to_chars(&self, encoded: EngCode) -> SmallVec<[char; 2]> {
        let mut out = SmallVec::new();
        if let Some(c) = encoded.pure_char() {
            out.push(c);
            return out;
        }
        if encoded.is_char_code() {
            let (a, b) = codetable::split_unit(self.table, encoded.payload());
            if let Some(c) = char::from_u32(a as u32) {
                out.push(c);
            }
            if let Some(b) = b {
                if let Some(c) = char::from_u32(b as u32) {
                    out.push(c);
                }
            }
            return out;
        }
        if let Some(c) = keys::to_ascii(encoded.payload(), encoded.caps()) {
            out.push(c);
        }
        out
    }
}

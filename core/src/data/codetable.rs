//! Output code tables
//!
//! Five encodings share one table shape: each glyph row (a vowel key plus
//! its shape, or đ) maps to 12 variant code units ordered
//! `[upper, lower]` for each of the six marks, so
//! `variant index = 2 * mark + (1 if lowercase)`.
//!
//! A unit is one `u16`. Unicode and TCVN3 units are single output code
//! units. VNI-Windows and CP1258 pack `low byte = base glyph,
//! high byte = trailing diacritic glyph` (high byte 0 or ≤ 32 means no
//! trailing unit). Unicode Composite packs `base | mark_index << 13`,
//! where the mark index selects a combining character.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::{chars, keys};
use crate::engine::code::{EngCode, Mark, Shape};

/// Output encodings, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CodeTable {
    #[default]
    Unicode = 0,
    Tcvn3 = 1,
    VniWindows = 2,
    UnicodeComposite = 3,
    Cp1258 = 4,
}

impl CodeTable {
    pub const COUNT: usize = 5;

    pub fn from_u8(v: u8) -> CodeTable {
        match v {
            1 => CodeTable::Tcvn3,
            2 => CodeTable::VniWindows,
            3 => CodeTable::UnicodeComposite,
            4 => CodeTable::Cp1258,
            _ => CodeTable::Unicode,
        }
    }

    /// Encodings where one character may span two output code units.
    pub fn is_double(self) -> bool {
        matches!(
            self,
            CodeTable::VniWindows | CodeTable::UnicodeComposite | CodeTable::Cp1258
        )
    }
}

/// Combining characters for the Unicode Composite table,
/// indexed by `Mark` (acute, grave, hook, tilde, dot below).
pub const COMPOUND_MARKS: [char; 5] = ['\u{0301}', '\u{0300}', '\u{0309}', '\u{0303}', '\u{0323}'];

/// A glyph row key: vowel (or D) key id plus its shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub key: u16,
    pub shape: Shape,
}

impl GlyphKey {
    pub const fn new(key: u16, shape: Shape) -> Self {
        GlyphKey { key, shape }
    }
}

/// The thirteen glyph rows every table defines.
pub const GLYPH_ROWS: [GlyphKey; 13] = [
    GlyphKey::new(keys::A, Shape::None),
    GlyphKey::new(keys::A, Shape::Horn), // ă
    GlyphKey::new(keys::A, Shape::Hat),  // â
    GlyphKey::new(keys::E, Shape::None),
    GlyphKey::new(keys::E, Shape::Hat), // ê
    GlyphKey::new(keys::I, Shape::None),
    GlyphKey::new(keys::O, Shape::None),
    GlyphKey::new(keys::O, Shape::Hat),  // ô
    GlyphKey::new(keys::O, Shape::Horn), // ơ
    GlyphKey::new(keys::U, Shape::None),
    GlyphKey::new(keys::U, Shape::Horn), // ư
    GlyphKey::new(keys::Y, Shape::None),
    GlyphKey::new(keys::D, Shape::Hat), // đ
];

/// TCVN3 (ABC) single-byte glyphs.
///
/// Rows: (glyph row, caps base glyph, lowercase glyphs for no-mark and the
/// five marks). Marked capitals reuse the lowercase glyph byte; ABC fonts
/// render capitals through the `.VnXxxH` companion faces.
const TCVN3_ROWS: [(u16, u16, [u16; 6]); 13] = [
    (0, 0x41, [0x61, 0xB8, 0xB5, 0xB6, 0xB7, 0xB9]),       // a
    (1, 0xA1, [0xA8, 0xBE, 0xBB, 0xBC, 0xBD, 0xC6]),       // ă
    (2, 0xA2, [0xA9, 0xCA, 0xC7, 0xC8, 0xC9, 0xCB]),       // â
    (3, 0x45, [0x65, 0xD0, 0xCC, 0xCE, 0xCF, 0xD1]),       // e
    (4, 0xA3, [0xAA, 0xD5, 0xD2, 0xD3, 0xD4, 0xD6]),       // ê
    (5, 0x49, [0x69, 0xDD, 0xD7, 0xD8, 0xDC, 0xDE]),       // i
    (6, 0x4F, [0x6F, 0xE3, 0xDF, 0xE1, 0xE2, 0xE4]),       // o
    (7, 0xA4, [0xAB, 0xE8, 0xE5, 0xE6, 0xE7, 0xE9]),       // ô
    (8, 0xA5, [0xAC, 0xED, 0xEA, 0xEB, 0xEC, 0xEE]),       // ơ
    (9, 0x55, [0x75, 0xF3, 0xEF, 0xF1, 0xF2, 0xF4]),       // u
    (10, 0xA6, [0xAD, 0xF8, 0xF5, 0xF6, 0xF7, 0xF9]),      // ư
    (11, 0x59, [0x79, 0xFD, 0xFA, 0xFB, 0xFC, 0xFE]),      // y
    (12, 0xA7, [0xAE, 0xAE, 0xAE, 0xAE, 0xAE, 0xAE]),      // đ
];

// VNI-Windows trailing glyphs per mark (lowercase; capitals are -0x20).
const VNI_TRAIL: [u16; 6] = [0, 0xF9, 0xF8, 0xFB, 0xF5, 0xEF];
// Circumflex-combined trailing glyphs (shape + mark in one glyph).
const VNI_CIRC: [u16; 6] = [0xE2, 0xE1, 0xE0, 0xE5, 0xE3, 0xE4];
// Breve-combined trailing glyphs.
const VNI_BREVE: [u16; 6] = [0xEA, 0xE9, 0xE8, 0xFA, 0xEB, 0xEC];

// CP1258 combining bytes per mark (caseless).
const CP1258_COMB: [u16; 6] = [0, 0xEC, 0xCC, 0xD2, 0xDE, 0xF2];

fn vni_upper(glyph: u16) -> u16 {
    if glyph > 0 {
        glyph - 0x20
    } else {
        0
    }
}

fn ascii_pair(key: u16) -> (u16, u16) {
    let lower = keys::to_ascii(key, false).unwrap_or('?') as u16;
    let upper = keys::to_ascii(key, true).unwrap_or('?') as u16;
    (upper, lower)
}

fn build_unicode_row(row: GlyphKey) -> [u16; 12] {
    let mut out = [0u16; 12];
    for m in 0..6u8 {
        let mark = Mark::from_index(m);
        out[m as usize * 2] = chars::compose(row.key, row.shape, mark, true).unwrap_or('?') as u16;
        out[m as usize * 2 + 1] =
            chars::compose(row.key, row.shape, mark, false).unwrap_or('?') as u16;
    }
    out
}

fn build_composite_row(row: GlyphKey) -> [u16; 12] {
    let upper = chars::compose(row.key, row.shape, Mark::None, true).unwrap_or('?') as u16;
    let lower = chars::compose(row.key, row.shape, Mark::None, false).unwrap_or('?') as u16;
    let mut out = [0u16; 12];
    for m in 0..6u16 {
        let tag = if row.key == keys::D { 0 } else { m << 13 };
        out[m as usize * 2] = upper | tag;
        out[m as usize * 2 + 1] = lower | tag;
    }
    out
}

fn build_tcvn3_row(index: usize) -> [u16; 12] {
    let (_, caps_base, lower) = TCVN3_ROWS[index];
    let mut out = [0u16; 12];
    for m in 0..6 {
        out[m * 2] = if m == 0 { caps_base } else { lower[m] };
        out[m * 2 + 1] = lower[m];
    }
    out
}

fn build_vni_row(row: GlyphKey) -> [u16; 12] {
    // Single-glyph bases: ư, ơ and đ have dedicated code points; every
    // other row is ASCII base + trailing diacritic glyph.
    let (upper_base, lower_base, trail): (u16, u16, &[u16; 6]) = match (row.key, row.shape) {
        (k, Shape::Horn) if k == keys::U => (0xD6, 0xF6, &VNI_TRAIL),
        (k, Shape::Horn) if k == keys::O => (0xD4, 0xF4, &VNI_TRAIL),
        (k, Shape::Hat) if k == keys::D => (0xD1, 0xF1, &[0u16; 6]),
        (k, Shape::Hat) => {
            let (u, l) = ascii_pair(k);
            return build_vni_combined(u, l, &VNI_CIRC);
        }
        (k, Shape::Horn) => {
            // only ă reaches here
            let (u, l) = ascii_pair(k);
            return build_vni_combined(u, l, &VNI_BREVE);
        }
        (k, Shape::None) => {
            let (u, l) = ascii_pair(k);
            (u, l, &VNI_TRAIL)
        }
    };

    let mut out = [0u16; 12];
    for m in 0..6 {
        out[m * 2] = upper_base | (vni_upper(trail[m]) << 8);
        out[m * 2 + 1] = lower_base | (trail[m] << 8);
    }
    out
}

fn build_vni_combined(upper_base: u16, lower_base: u16, glyphs: &[u16; 6]) -> [u16; 12] {
    let mut out = [0u16; 12];
    for m in 0..6 {
        out[m * 2] = upper_base | (vni_upper(glyphs[m]) << 8);
        out[m * 2 + 1] = lower_base | (glyphs[m] << 8);
    }
    out
}

fn build_cp1258_row(row: GlyphKey) -> [u16; 12] {
    let (upper_base, lower_base): (u16, u16) = match (row.key, row.shape) {
        (k, Shape::Horn) if k == keys::A => (0xC3, 0xE3), // Ă ă
        (k, Shape::Hat) if k == keys::A => (0xC2, 0xE2),  // Â â
        (k, Shape::Hat) if k == keys::E => (0xCA, 0xEA),  // Ê ê
        (k, Shape::Hat) if k == keys::O => (0xD4, 0xF4),  // Ô ô
        (k, Shape::Horn) if k == keys::O => (0xD5, 0xF5), // Ơ ơ
        (k, Shape::Horn) if k == keys::U => (0xDD, 0xFD), // Ư ư
        (k, Shape::Hat) if k == keys::D => (0xD0, 0xF0),  // Đ đ
        (k, _) => ascii_pair(k),
    };

    let mut out = [0u16; 12];
    for m in 0..6 {
        let comb = if row.key == keys::D { 0 } else { CP1258_COMB[m] };
        out[m * 2] = upper_base | (comb << 8);
        out[m * 2 + 1] = lower_base | (comb << 8);
    }
    out
}

type Table = HashMap<GlyphKey, [u16; 12]>;

fn build_table(table: CodeTable) -> Table {
    let mut map = Table::with_capacity(GLYPH_ROWS.len());
    for (i, &row) in GLYPH_ROWS.iter().enumerate() {
        let variants = match table {
            CodeTable::Unicode => build_unicode_row(row),
            CodeTable::Tcvn3 => build_tcvn3_row(i),
            CodeTable::VniWindows => build_vni_row(row),
            CodeTable::UnicodeComposite => build_composite_row(row),
            CodeTable::Cp1258 => build_cp1258_row(row),
        };
        map.insert(row, variants);
    }
    map
}

fn tables() -> &'static [Table; CodeTable::COUNT] {
    static TABLES: OnceLock<[Table; CodeTable::COUNT]> = OnceLock::new();
    TABLES.get_or_init(|| {
        [
            build_table(CodeTable::Unicode),
            build_table(CodeTable::Tcvn3),
            build_table(CodeTable::VniWindows),
            build_table(CodeTable::UnicodeComposite),
            build_table(CodeTable::Cp1258),
        ]
    })
}

/// Variant vector for a glyph row, or `None` for rows the table lacks.
pub fn variants(table: CodeTable, key: u16, shape: Shape) -> Option<&'static [u16; 12]> {
    tables()[table as usize].get(&GlyphKey::new(key, shape))
}

/// Variant position inside a row.
pub fn variant_index(mark: Mark, caps: bool) -> usize {
    mark.index() as usize * 2 + usize::from(!caps)
}

/// Encode a composed engine code into the table's `u16` unit.
///
/// Plain consonants and shape-less composition fall back to ASCII.
pub fn unit_for(table: CodeTable, code: EngCode) -> Option<u16> {
    if code.is_char_code() || code.is_pure() {
        return Some(code.payload());
    }
    let key = code.key();
    if key == keys::D && code.shape() == Shape::None {
        return keys::to_ascii(key, code.caps()).map(|c| c as u16);
    }
    match variants(table, key, code.shape()) {
        Some(row) => Some(row[variant_index(code.mark(), code.caps())]),
        None => keys::to_ascii(key, code.caps()).map(|c| c as u16),
    }
}

/// Iterate all rows of a table (reverse-lookup construction).
pub fn rows(table: CodeTable) -> impl Iterator<Item = (GlyphKey, &'static [u16; 12])> {
    tables()[table as usize].iter().map(|(k, v)| (*k, v))
}

/// Split a table unit into its one or two output code units.
pub fn split_unit(table: CodeTable, unit: u16) -> (u16, Option<u16>) {
    match table {
        CodeTable::Unicode | CodeTable::Tcvn3 => (unit, None),
        CodeTable::VniWindows | CodeTable::Cp1258 => {
            let low = unit & 0xFF;
            let high = unit >> 8;
            if high > 32 {
                (low, Some(high))
            } else {
                (unit, None)
            }
        }
        CodeTable::UnicodeComposite => {
            let mark = unit >> 13;
            if mark > 0 {
                (
                    unit & 0x1FFF,
                    Some(COMPOUND_MARKS[(mark - 1) as usize] as u16),
                )
            } else {
                (unit, None)
            }
        }
    }
}

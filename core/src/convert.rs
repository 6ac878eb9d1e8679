//! Standalone text re-encoding
//!
//! Converts a finished string between code tables with optional case
//! and mark transforms. The scanner peeks one character ahead so the
//! two-unit encodings (VNI-Windows, CP1258, Unicode Composite) reassemble
//! before the reverse lookup; anything unknown passes through with the
//! case rules applied.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::data::codetable::{self, CodeTable, GlyphKey, COMPOUND_MARKS};
use crate::data::keys;

/// Conversion options. All-caps beats every other case transform;
/// all-lower beats the sentence/title rules.
#[derive(Clone, Copy, Debug)]
pub struct ConvertOptions {
    pub from_code: CodeTable,
    pub to_code: CodeTable,
    pub to_all_caps: bool,
    pub to_all_lower: bool,
    pub caps_first_letter: bool,
    pub caps_each_word: bool,
    pub remove_mark: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            from_code: CodeTable::Unicode,
            to_code: CodeTable::Unicode,
            to_all_caps: false,
            to_all_lower: false,
            caps_first_letter: false,
            caps_each_word: false,
            remove_mark: false,
        }
    }
}

impl ConvertOptions {
    fn normalized(mut self) -> ConvertOptions {
        if self.to_all_caps {
            self.to_all_lower = false;
            self.caps_first_letter = false;
            self.caps_each_word = false;
        } else if self.to_all_lower {
            self.caps_first_letter = false;
            self.caps_each_word = false;
        }
        self
    }
}

type ReverseTable = HashMap<u16, (GlyphKey, usize)>;

fn reverse_table(table: CodeTable) -> &'static ReverseTable {
    static TABLES: OnceLock<[ReverseTable; CodeTable::COUNT]> = OnceLock::new();
    let all = TABLES.get_or_init(|| {
        let build = |t: CodeTable| {
            let mut map = ReverseTable::new();
            // Lowercase variants first: tables that reuse one glyph for
            // both cases (TCVN3 marked capitals) must resolve to the
            // lowercase reading.
            for parity in [1usize, 0] {
                for (row, variants) in codetable::rows(t) {
                    for (idx, &unit) in variants.iter().enumerate() {
                        if idx % 2 == parity {
                            map.entry(unit).or_insert((row, idx));
                        }
                    }
                }
            }
            map
        };
        [
            build(CodeTable::Unicode),
            build(CodeTable::Tcvn3),
            build(CodeTable::VniWindows),
            build(CodeTable::UnicodeComposite),
            build(CodeTable::Cp1258),
        ]
    });
    &all[table as usize]
}

fn composite_mark_tag(c: char) -> u16 {
    for (i, &m) in COMPOUND_MARKS.iter().enumerate() {
        if c == m {
            return ((i + 1) as u16) << 13;
        }
    }
    0
}

fn push_unit(to_code: CodeTable, unit: u16, out: &mut String) {
    let (a, b) = codetable::split_unit(to_code, unit);
    if let Some(c) = char::from_u32(a as u32) {
        out.push(c);
    }
    if let Some(b) = b {
        if let Some(c) = char::from_u32(b as u32) {
            out.push(c);
        }
    }
}

fn try_convert_unit(
    unit: u16,
    opts: &ConvertOptions,
    should_upper: bool,
    out: &mut String,
) -> bool {
    let Some(&(row, variant)) = reverse_table(opts.from_code).get(&unit) else {
        return false;
    };
    let Some(target_variants) = codetable::variants(opts.to_code, row.key, row.shape) else {
        return false;
    };

    let force_upper = opts.to_all_caps || should_upper;
    let force_lower = opts.to_all_lower || opts.caps_first_letter || opts.caps_each_word;

    let mut idx = variant;
    if force_upper && idx % 2 != 0 {
        idx -= 1;
    } else if force_lower && !force_upper && idx % 2 == 0 && idx + 1 < target_variants.len() {
        idx += 1;
    }

    if opts.remove_mark {
        // Strip every diacritic down to the base letter.
        let upper = idx % 2 == 0;
        if let Some(c) = keys::to_ascii(row.key, upper) {
            out.push(c);
        }
        return true;
    }

    push_unit(opts.to_code, target_variants[idx], out);
    true
}

fn is_sentence_break(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

/// Convert `input` between code tables per `opts`.
pub fn convert(input: &str, opts: &ConvertOptions) -> String {
    let opts = opts.normalized();
    let data: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    let mut has_break = false;
    let mut should_upper = opts.caps_first_letter || opts.caps_each_word;

    let mut i = 0;
    while i < data.len() {
        // Two-unit candidates first.
        if i + 1 < data.len() {
            let (compound, extra) = match opts.from_code {
                CodeTable::VniWindows | CodeTable::Cp1258 => {
                    let lo = data[i] as u32;
                    let hi = data[i + 1] as u32;
                    if lo <= 0xFF && (33..=0xFF).contains(&hi) {
                        ((lo | (hi << 8)) as u16, 1)
                    } else {
                        (0, 0)
                    }
                }
                CodeTable::UnicodeComposite => {
                    let tag = composite_mark_tag(data[i + 1]);
                    let base = data[i] as u32;
                    if tag > 0 && base <= 0x1FFF {
                        (base as u16 | tag, 1)
                    } else {
                        (0, 0)
                    }
                }
                _ => (0, 0),
            };

            if extra > 0 && try_convert_unit(compound, &opts, should_upper, &mut out) {
                i += 1 + extra;
                should_upper = false;
                has_break = false;
                continue;
            }
        }

        let c = data[i];
        let single = c as u32;
        if single <= 0xFFFF && try_convert_unit(single as u16, &opts, should_upper, &mut out) {
            i += 1;
            should_upper = false;
            has_break = false;
            continue;
        }

        // Pass-through with case rules.
        let force_upper = opts.to_all_caps || should_upper;
        let force_lower = opts.to_all_lower || opts.caps_first_letter || opts.caps_each_word;
        if force_upper {
            out.extend(c.to_uppercase());
        } else if force_lower {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }

        if c == '\n' || (has_break && c == ' ') {
            if opts.caps_first_letter || opts.caps_each_word {
                should_upper = true;
            }
            has_break = false;
        } else if c == ' ' && opts.caps_each_word {
            should_upper = true;
        } else if is_sentence_break(c) {
            has_break = true;
        } else {
            should_upper = false;
            has_break = false;
        }

        i += 1;
    }

    out
}

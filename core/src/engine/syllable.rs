//! Syllable structure parser
//!
//! Splits a composed word into (C₁)(G)V(C₂):
//! - C₁: initial consonant (phụ âm đầu)
//! - G: glide/medial (âm đệm)
//! - V: vowel nucleus (nguyên âm chính)
//! - C₂: final consonant (âm cuối)
//!
//! The parser is lenient; the validator rejects what does not belong.

use super::code::EngCode;
use crate::data::keys;

/// Parsed syllable: indices into the composed word.
#[derive(Debug, Clone, Default)]
pub struct Syllable {
    pub initial: Vec<usize>,
    pub glide: Option<usize>,
    pub vowel: Vec<usize>,
    pub final_c: Vec<usize>,
}

impl Syllable {
    pub fn is_empty(&self) -> bool {
        self.vowel.is_empty()
    }

    pub fn has_initial(&self) -> bool {
        !self.initial.is_empty()
    }

    pub fn has_final(&self) -> bool {
        !self.final_c.is_empty()
    }
}

/// Two-letter finals
const FINALS_2: &[[u16; 2]] = &[
    [keys::C, keys::H], // ch
    [keys::N, keys::G], // ng
    [keys::N, keys::H], // nh
];

/// Parse a composed word into syllable structure.
///
/// `gi` and `qu` followed by another vowel are treated as initials, so
/// the `i`/`u` does not join the nucleus.
pub fn parse(word: &[EngCode]) -> Syllable {
    let mut syllable = Syllable::default();
    let len = word.len();
    if len == 0 {
        return syllable;
    }

    let first_vowel = word.iter().position(|c| c.is_vowel());
    let vowel_start = match first_vowel {
        Some(pos) => {
            let mut start = pos;
            if pos > 0 && pos + 1 < len {
                let prev = word[pos - 1].payload();
                let curr = word[pos].payload();
                let next = &word[pos + 1];
                let absorbed = (prev == keys::G && curr == keys::I && next.is_vowel())
                    || (prev == keys::Q && curr == keys::U && next.is_vowel());
                if absorbed {
                    start = pos + 1;
                }
            }
            for i in 0..start {
                syllable.initial.push(i);
            }
            start
        }
        None => return syllable,
    };

    let mut vowel_end = vowel_start;
    while vowel_end < len && word[vowel_end].is_vowel() {
        vowel_end += 1;
    }
    if vowel_end == vowel_start {
        return syllable;
    }

    let vowel_count = vowel_end - vowel_start;
    if vowel_count >= 2 && is_glide(&word[vowel_start], &word[vowel_start + 1], &syllable) {
        syllable.glide = Some(vowel_start);
        for i in (vowel_start + 1)..vowel_end {
            syllable.vowel.push(i);
        }
    } else {
        for i in vowel_start..vowel_end {
            syllable.vowel.push(i);
        }
    }

    if vowel_end < len {
        match_final(word, vowel_end, &mut syllable);
    }

    syllable
}

fn match_final(word: &[EngCode], start: usize, syllable: &mut Syllable) {
    let len = word.len();
    let remaining = len - start;

    if remaining >= 2 {
        for pattern in FINALS_2 {
            if word[start].payload() == pattern[0] && word[start + 1].payload() == pattern[1] {
                syllable.final_c = vec![start, start + 1];
                return;
            }
        }
    }

    // Single finals are validated later; claim one consonant slot
    if remaining >= 1 && word[start].is_letter() && !word[start].is_vowel() {
        syllable.final_c = vec![start];
    }
}

/// Glide (âm đệm) detection: o before a/e, u before y/e.
/// After a `qu` initial the u is already absorbed, never a glide.
fn is_glide(first: &EngCode, second: &EngCode, syllable: &Syllable) -> bool {
    if syllable.initial.len() == 2 {
        return false;
    }
    match first.payload() {
        keys::O => matches!(second.payload(), keys::A | keys::E),
        keys::U => matches!(second.payload(), keys::Y | keys::E),
        _ => false,
    }
}

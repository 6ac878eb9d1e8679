//! Vietnamese syllable validation
//!
//! Rule-based validation over a composed word. Each rule returns
//! `Some(error)` when it rejects, `None` when it passes; rules run in
//! priority order. The caller decides what a failure means (restore or
//! not) — this module only answers valid/invalid.

use super::code::{EngCode, Mark};
use super::syllable::{parse, Syllable};
use crate::data::keys;

/// Validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    NoVowel,
    InvalidInitial,
    InvalidFinal,
    InvalidSpelling,
    InvalidVowelPattern,
    InvalidToneForCoda,
    InvalidTonePlacement,
    DigitInWord,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Validator options captured from the config snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions {
    /// Accept z/f/w/j as onset consonants
    pub allow_zfwj: bool,
    /// Modern orthography: tone on the second vowel of oa/oe/uy
    pub modern_orthography: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            allow_zfwj: false,
            modern_orthography: true,
        }
    }
}

// Single-letter onsets
const VALID_INITIALS_1: &[u16] = &[
    keys::B,
    keys::C,
    keys::D,
    keys::G,
    keys::H,
    keys::K,
    keys::L,
    keys::M,
    keys::N,
    keys::P,
    keys::R,
    keys::S,
    keys::T,
    keys::V,
    keys::X,
];

const ZFWJ_INITIALS: &[u16] = &[keys::Z, keys::F, keys::W, keys::J];

// Two-letter onsets
const VALID_INITIALS_2: &[[u16; 2]] = &[
    [keys::C, keys::H],
    [keys::G, keys::H],
    [keys::G, keys::I],
    [keys::K, keys::H],
    [keys::N, keys::G],
    [keys::N, keys::H],
    [keys::P, keys::H],
    [keys::Q, keys::U],
    [keys::T, keys::H],
    [keys::T, keys::R],
];

// Single-letter codas
const VALID_FINALS_1: &[u16] = &[keys::C, keys::M, keys::N, keys::P, keys::T];

// Two-letter codas
const VALID_FINALS_2: &[[u16; 2]] = &[
    [keys::C, keys::H],
    [keys::N, keys::G],
    [keys::N, keys::H],
];

// Onset/vowel spelling restrictions: (onset, first vowels it cannot precede)
const SPELLING_RULES: &[(&[u16], &[u16])] = &[
    (&[keys::C], &[keys::I, keys::E, keys::Y]),
    (&[keys::K], &[keys::A, keys::O, keys::U]),
    (&[keys::G], &[keys::E]),
    (&[keys::G, keys::H], &[keys::A, keys::O, keys::U]),
    (&[keys::N, keys::G], &[keys::I, keys::E]),
    (&[keys::N, keys::G, keys::H], &[keys::A, keys::O, keys::U]),
];

/// Legal vowel-letter sequences (glide included), by typed base letter.
const VALID_NUCLEI: &[&str] = &[
    "a", "e", "i", "o", "u", "y",
    "ai", "ao", "au", "ay", "eo", "eu", "ia", "ie", "iu", "oa", "oe", "oi", "oo",
    "ua", "uay", "ue", "ui", "uo", "uu", "uy", "ye",
    "ieu", "yeu", "oai", "oay", "oeo", "uoi", "uou", "uya", "uye", "uyu",
];

type Rule = fn(&[EngCode], &Syllable, &ValidationOptions) -> Option<ValidationResult>;

const RULES: &[Rule] = &[
    rule_no_digits,
    rule_has_vowel,
    rule_valid_initial,
    rule_all_slots_parsed,
    rule_spelling,
    rule_valid_final,
    rule_valid_nucleus,
    rule_tone_with_stop_coda,
    rule_tone_placement,
];

fn rule_no_digits(word: &[EngCode], _s: &Syllable, _o: &ValidationOptions) -> Option<ValidationResult> {
    if word
        .iter()
        .any(|c| !c.is_char_code() && keys::is_number(c.payload()))
    {
        return Some(ValidationResult::DigitInWord);
    }
    None
}

fn rule_has_vowel(word: &[EngCode], s: &Syllable, _o: &ValidationOptions) -> Option<ValidationResult> {
    if s.is_empty() && s.glide.is_none() {
        // A bare consonant cluster is never a syllable; a fully empty
        // word is vacuously valid.
        if word.is_empty() {
            return None;
        }
        return Some(ValidationResult::NoVowel);
    }
    None
}

fn rule_valid_initial(word: &[EngCode], s: &Syllable, o: &ValidationOptions) -> Option<ValidationResult> {
    if s.initial.is_empty() {
        return None;
    }
    let initial: Vec<u16> = s.initial.iter().map(|&i| word[i].payload()).collect();

    let is_valid = match initial.len() {
        1 => {
            VALID_INITIALS_1.contains(&initial[0])
                || (o.allow_zfwj && ZFWJ_INITIALS.contains(&initial[0]))
        }
        2 => VALID_INITIALS_2
            .iter()
            .any(|p| p[0] == initial[0] && p[1] == initial[1]),
        3 => initial == [keys::N, keys::G, keys::H],
        _ => false,
    };

    if !is_valid {
        return Some(ValidationResult::InvalidInitial);
    }
    None
}

fn rule_all_slots_parsed(word: &[EngCode], s: &Syllable, _o: &ValidationOptions) -> Option<ValidationResult> {
    let parsed = s.initial.len() + s.glide.map_or(0, |_| 1) + s.vowel.len() + s.final_c.len();
    if !word.is_empty() && parsed != word.len() {
        return Some(ValidationResult::InvalidFinal);
    }
    None
}

fn rule_spelling(word: &[EngCode], s: &Syllable, _o: &ValidationOptions) -> Option<ValidationResult> {
    if s.initial.is_empty() {
        return None;
    }
    let first_vowel_slot = s.glide.or_else(|| s.vowel.first().copied());
    let first_vowel = match first_vowel_slot {
        Some(i) => word[i].payload(),
        None => return None,
    };
    let initial: Vec<u16> = s.initial.iter().map(|&i| word[i].payload()).collect();

    for &(onset, vowels) in SPELLING_RULES {
        if initial == onset && vowels.contains(&first_vowel) {
            return Some(ValidationResult::InvalidSpelling);
        }
    }
    None
}

fn rule_valid_final(word: &[EngCode], s: &Syllable, _o: &ValidationOptions) -> Option<ValidationResult> {
    if s.final_c.is_empty() {
        return None;
    }
    let final_c: Vec<u16> = s.final_c.iter().map(|&i| word[i].payload()).collect();

    let is_valid = match final_c.len() {
        1 => VALID_FINALS_1.contains(&final_c[0]),
        2 => VALID_FINALS_2
            .iter()
            .any(|p| p[0] == final_c[0] && p[1] == final_c[1]),
        _ => false,
    };

    if !is_valid {
        return Some(ValidationResult::InvalidFinal);
    }
    None
}

fn rule_valid_nucleus(word: &[EngCode], s: &Syllable, _o: &ValidationOptions) -> Option<ValidationResult> {
    let mut letters = String::new();
    if let Some(g) = s.glide {
        letters.extend(keys::to_ascii(word[g].payload(), false));
    }
    for &i in &s.vowel {
        letters.extend(keys::to_ascii(word[i].payload(), false));
    }
    if letters.is_empty() {
        return None;
    }
    if !VALID_NUCLEI.contains(&letters.as_str()) {
        return Some(ValidationResult::InvalidVowelPattern);
    }
    None
}

/// Stop codas (c, ch, p, t) only combine with sắc or nặng.
fn rule_tone_with_stop_coda(word: &[EngCode], s: &Syllable, _o: &ValidationOptions) -> Option<ValidationResult> {
    if s.final_c.is_empty() {
        return None;
    }
    let final_keys: Vec<u16> = s.final_c.iter().map(|&i| word[i].payload()).collect();
    let is_stop = matches!(final_keys.as_slice(), [keys::C] | [keys::P] | [keys::T])
        || final_keys == [keys::C, keys::H];
    if !is_stop {
        return None;
    }
    let mark = word.iter().find_map(|c| {
        if c.has_mark() {
            Some(c.mark())
        } else {
            None
        }
    });
    match mark {
        None | Some(Mark::Acute) | Some(Mark::Dot) => None,
        Some(_) => Some(ValidationResult::InvalidToneForCoda),
    }
}

/// oa/oe/uy carrier consistency with the selected orthography.
fn rule_tone_placement(word: &[EngCode], s: &Syllable, o: &ValidationOptions) -> Option<ValidationResult> {
    if !s.final_c.is_empty() || s.glide.is_none() || s.vowel.len() != 1 {
        return None;
    }
    let glide = s.glide.unwrap();
    let nucleus = s.vowel[0];
    let pair = (word[glide].payload(), word[nucleus].payload());
    let is_open_cluster = matches!(pair, (keys::O, keys::A) | (keys::O, keys::E) | (keys::U, keys::Y));
    if !is_open_cluster {
        return None;
    }
    let marked_glide = word[glide].has_mark();
    let marked_nucleus = word[nucleus].has_mark();
    if !marked_glide && !marked_nucleus {
        return None;
    }
    let expected_on_nucleus = o.modern_orthography;
    if (expected_on_nucleus && marked_glide) || (!expected_on_nucleus && marked_nucleus) {
        return Some(ValidationResult::InvalidTonePlacement);
    }
    None
}

/// Validate a composed word. Runs every rule in order.
pub fn validate(word: &[EngCode], opts: &ValidationOptions) -> ValidationResult {
    let syllable = parse(word);
    for rule in RULES {
        if let Some(error) = rule(word, &syllable, opts) {
            return error;
        }
    }
    ValidationResult::Valid
}

pub fn is_valid(word: &[EngCode], opts: &ValidationOptions) -> bool {
    validate(word, opts).is_valid()
}

//! Composition transforms
//!
//! The per-key mutations of the session: structural shapes (â ê ô ơ ư ă
//! đ), tone placement and cancellation, quick-Telex double consonants,
//! and the standalone-W rule. Every function mutates the session and
//! reports whether the triggering key was consumed; the engine derives
//! screen output by diffing rendered state around the call.

use super::buffer::{RawKey, Session};
use super::code::{EngCode, Mark, Shape};
use super::syllable;
use crate::data::keys;
use crate::input::InputType;

/// What a transform did with the incoming key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Key did not participate; append it as a letter.
    NotHandled,
    /// Key was consumed by a transform (not rendered itself).
    Consumed,
    /// Key cancelled a previous transform and must render literally.
    CancelledToLiteral,
}

/// Apply a structural shape if `key` completes one (aa, ee, oo, ow, uw,
/// dd, VNI 6/7/8/9). The trigger is consumed, never rendered.
pub fn try_shape(session: &mut Session, input: InputType, key: u16, modern: bool) -> KeyAction {
    // Scan for the most recent letter this key can shape. Plain letters
    // match; a horn trigger may also reshape a circumflex vowel, so
    // `tuông` + w becomes `tương`.
    let mut target = None;
    for i in (0..session.len()).rev() {
        let slot = match session.composed_at(i) {
            Some(s) => s,
            None => break,
        };
        if slot.is_char_code() || slot.is_pure() {
            continue;
        }
        let Some(shape) = input.shape_trigger(key, slot.payload()) else {
            continue;
        };
        let reshapeable =
            shape == Shape::Horn && slot.shape() == Shape::Hat && slot.is_vowel();
        if slot.shape() == Shape::None || reshapeable {
            target = Some(i);
            break;
        }
    }

    let Some(mut i) = target else {
        return KeyAction::NotHandled;
    };
    let shape = input
        .shape_trigger(key, session.composed_at(i).map(|c| c.payload()).unwrap_or(0))
        .unwrap_or(Shape::None);

    // Horn pairing: ưu heads on the first u; uo horns both letters (ươ).
    if shape == Shape::Horn {
        let this_key = session.composed_at(i).map(|c| c.payload());
        let prev = i.checked_sub(1).and_then(|p| session.composed_at(p));
        if let (Some(k), Some(p)) = (this_key, prev) {
            if k == keys::U && p.payload() == keys::U && p.shape() == Shape::None && p.is_vowel() {
                i -= 1;
            } else if k == keys::O && p.payload() == keys::U && p.shape() == Shape::None && p.is_vowel() {
                if let Some(slot) = session.composed_at_mut(i - 1) {
                    slot.set_shape(Shape::Horn);
                }
            }
        }
    }

    if let Some(slot) = session.composed_at_mut(i) {
        slot.set_shape(shape);
    }
    session.mark_dirty();
    reseat_tone(session, modern);
    KeyAction::Consumed
}

/// Place (or cancel) a tone mark.
///
/// The double-key rule: the same tone typed onto a word that already
/// carries it removes the mark, and the key renders literally; a later
/// repetition applies it again.
pub fn try_tone(session: &mut Session, mark: Mark, modern: bool) -> KeyAction {
    let Some(carrier) = find_tone_carrier(session, modern) else {
        return KeyAction::NotHandled;
    };

    let current = session
        .composed_at(carrier)
        .map(|c| c.mark())
        .unwrap_or(Mark::None);

    if current == mark {
        if let Some(slot) = session.composed_at_mut(carrier) {
            slot.set_mark(Mark::None);
        }
        session.set_tone_index(None);
        session.refresh_dirty();
        return KeyAction::CancelledToLiteral;
    }

    // One mark per word: clear everywhere, then set on the carrier.
    for i in 0..session.len() {
        if let Some(slot) = session.composed_at_mut(i) {
            slot.set_mark(Mark::None);
        }
    }
    if let Some(slot) = session.composed_at_mut(carrier) {
        slot.set_mark(mark);
    }
    session.set_tone_index(Some(carrier));
    session.mark_dirty();
    KeyAction::Consumed
}

/// Standalone W: `w` with no horn target and no vowel yet composes ư.
pub fn try_standalone_w(session: &mut Session, input: InputType, key: u16, caps: bool) -> KeyAction {
    if key != keys::W || !input.standalone_w() {
        return KeyAction::NotHandled;
    }
    if session.composed().iter().any(|c| c.is_vowel()) {
        return KeyAction::NotHandled;
    }

    let mut typed = RawKey::new(keys::W, caps);
    typed.standalone = true;
    let mut composed = EngCode::from_key(keys::U, caps);
    composed.set_shape(Shape::Horn);
    composed.set_standalone(true);

    if session.push_composed(typed, composed) {
        KeyAction::Consumed
    } else {
        KeyAction::NotHandled
    }
}

/// Quick-Telex double consonants: cc→ch, gg→gi, kk→kh, nn→ng, pp→ph,
/// qq→qu, tt→th, uu→ươ. The doubled key renders as the mapped letter.
pub fn try_quick_telex(session: &mut Session, key: u16, caps: bool, modern: bool) -> KeyAction {
    let Some(last) = session.composed().last().copied() else {
        return KeyAction::NotHandled;
    };
    if last.is_char_code() || last.shape() != Shape::None || last.payload() != key {
        return KeyAction::NotHandled;
    }

    // uu → ươ: horn the first u, append a horned o.
    if key == keys::U {
        let i = session.len() - 1;
        if let Some(slot) = session.composed_at_mut(i) {
            slot.set_shape(Shape::Horn);
        }
        let typed = RawKey::new(keys::U, caps);
        let mut composed = EngCode::from_key(keys::O, caps);
        composed.set_shape(Shape::Horn);
        session.push_composed(typed, composed);
        reseat_tone(session, modern);
        return KeyAction::Consumed;
    }

    let mapped = match key {
        keys::C | keys::K | keys::P | keys::T => keys::H,
        keys::G => keys::I,
        keys::N => keys::G,
        keys::Q => keys::U,
        _ => return KeyAction::NotHandled,
    };

    let typed = RawKey::new(key, caps);
    let composed = EngCode::from_key(mapped, caps);
    if session.push_composed(typed, composed) {
        KeyAction::Consumed
    } else {
        KeyAction::NotHandled
    }
}

/// Auto-shape an open nucleus when a coda starts.
///
/// `ie`, `ye` and `uo` cannot stand before a final consonant, so the
/// arriving coda closes them to `iê`/`yê`/`uô` and any tone reseats:
/// `tiés` + n → `tiến`. Call after appending a consonant letter.
pub fn auto_shape_nucleus(session: &mut Session, modern: bool) {
    let word = session.composed();
    let n = word.len();
    if n < 3 {
        return;
    }
    let last = word[n - 1];
    if !last.is_letter() || last.is_vowel() {
        return;
    }
    // Legal codas begin with c, m, n, p or t.
    if !matches!(
        last.payload(),
        keys::C | keys::M | keys::N | keys::P | keys::T
    ) {
        return;
    }
    let a = word[n - 3];
    let b = word[n - 2];
    if !a.is_vowel() || !b.is_vowel() {
        return;
    }
    if a.shape() != Shape::None || b.shape() != Shape::None {
        return;
    }
    let closes = matches!(
        (a.payload(), b.payload()),
        (keys::I, keys::E) | (keys::Y, keys::E) | (keys::U, keys::O)
    );
    if !closes {
        return;
    }
    if let Some(slot) = session.composed_at_mut(n - 2) {
        slot.set_shape(Shape::Hat);
    }
    session.mark_dirty();
    reseat_tone(session, modern);
}

/// Remove the word's mark, or failing that its newest shape (Telex `z`,
/// VNI `0`).
pub fn try_remove_diacritics(session: &mut Session, modern: bool) -> KeyAction {
    let marked = (0..session.len()).rev().find(|&i| {
        session
            .composed_at(i)
            .map(|c| c.has_mark())
            .unwrap_or(false)
    });
    if let Some(i) = marked {
        if let Some(slot) = session.composed_at_mut(i) {
            slot.set_mark(Mark::None);
        }
        session.set_tone_index(None);
        session.refresh_dirty();
        return KeyAction::Consumed;
    }

    let shaped = (0..session.len()).rev().find(|&i| {
        session
            .composed_at(i)
            .map(|c| !c.is_char_code() && c.shape() != Shape::None)
            .unwrap_or(false)
    });
    if let Some(i) = shaped {
        if let Some(slot) = session.composed_at_mut(i) {
            slot.set_shape(Shape::None);
            slot.set_standalone(false);
        }
        session.refresh_dirty();
        reseat_tone(session, modern);
        return KeyAction::Consumed;
    }

    KeyAction::NotHandled
}

/// Tone carrier selection.
///
/// Shaped vowels win (the second of ươ); a coda pulls the tone onto the
/// last vowel; the open clusters oa/oe/uy/oo follow the orthography
/// setting; open triphthongs center; other open clusters lead.
pub fn find_tone_carrier(session: &Session, modern: bool) -> Option<usize> {
    let word = session.composed();
    let parsed = syllable::parse(word);

    let mut slots: Vec<usize> = Vec::with_capacity(4);
    if let Some(g) = parsed.glide {
        slots.push(g);
    }
    slots.extend(&parsed.vowel);
    if slots.is_empty() {
        return None;
    }
    if slots.len() == 1 {
        return Some(slots[0]);
    }

    let shaped: Vec<usize> = slots
        .iter()
        .copied()
        .filter(|&i| word[i].shape() != Shape::None)
        .collect();
    if let Some(&last) = shaped.last() {
        return Some(last);
    }

    if parsed.has_final() {
        return slots.last().copied();
    }

    let letters: String = slots
        .iter()
        .filter_map(|&i| keys::to_ascii(word[i].payload(), false))
        .collect();
    match letters.as_str() {
        "oa" | "oe" | "uy" | "oo" => {
            if modern {
                Some(slots[1])
            } else {
                Some(slots[0])
            }
        }
        // Anticipate the closed forms iê/yê/uô/uê: the mark belongs on
        // the vowel that will take the circumflex.
        "ie" | "ye" | "uo" | "ue" => Some(slots[1]),
        _ if slots.len() == 3 => Some(slots[1]),
        _ => Some(slots[0]),
    }
}

/// Move an existing mark to the carrier the current word demands.
/// Shapes arriving after the tone migrate it (ties → tiés → tiến).
pub fn reseat_tone(session: &mut Session, modern: bool) {
    let current = session.tone_index().or_else(|| {
        (0..session.len()).find(|&i| {
            session
                .composed_at(i)
                .map(|c| c.has_mark())
                .unwrap_or(false)
        })
    });
    let Some(from) = current else {
        return;
    };
    let mark = match session.composed_at(from) {
        Some(c) if c.has_mark() => c.mark(),
        _ => return,
    };
    let Some(to) = find_tone_carrier(session, modern) else {
        return;
    };
    if to == from {
        session.set_tone_index(Some(from));
        return;
    }
    if let Some(slot) = session.composed_at_mut(from) {
        slot.set_mark(Mark::None);
    }
    if let Some(slot) = session.composed_at_mut(to) {
        slot.set_mark(mark);
    }
    session.set_tone_index(Some(to));
    session.mark_dirty();
}

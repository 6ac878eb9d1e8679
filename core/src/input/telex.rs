//! Telex key classification

use crate::data::keys;
use crate::engine::code::{Mark, Shape};

/// Tone keys: s f r x j
pub fn tone_for(key: u16) -> Option<Mark> {
    match key {
        keys::S => Some(Mark::Acute),
        keys::F => Some(Mark::Grave),
        keys::R => Some(Mark::Hook),
        keys::X => Some(Mark::Tilde),
        keys::J => Some(Mark::Dot),
        _ => None,
    }
}

/// Shape applied by `key` to an earlier `target` letter:
/// aa→â, ee→ê, oo→ô, w after a/o/u → ă/ơ/ư, dd→đ.
pub fn shape_trigger(key: u16, target: u16) -> Option<Shape> {
    match key {
        keys::A if target == keys::A => Some(Shape::Hat),
        keys::E if target == keys::E => Some(Shape::Hat),
        keys::O if target == keys::O => Some(Shape::Hat),
        keys::D if target == keys::D => Some(Shape::Hat),
        keys::W if matches!(target, keys::A | keys::O | keys::U) => Some(Shape::Horn),
        _ => None,
    }
}

/// Simple Telex 2 treats `w` as an ordinary letter.
pub fn shape_trigger_no_w(key: u16, target: u16) -> Option<Shape> {
    if key == keys::W {
        return None;
    }
    shape_trigger(key, target)
}

pub fn is_remove(key: u16) -> bool {
    key == keys::Z
}

pub fn is_shape_key(key: u16) -> bool {
    matches!(key, keys::A | keys::E | keys::O | keys::W | keys::D)
}

pub fn is_shape_key_no_w(key: u16) -> bool {
    matches!(key, keys::A | keys::E | keys::O | keys::D)
}

//! VNI key classification

use crate::data::keys;
use crate::engine::code::{Mark, Shape};

/// Tone keys: 1=sắc 2=huyền 3=hỏi 4=ngã 5=nặng
pub fn tone_for(key: u16) -> Option<Mark> {
    match key {
        keys::N1 => Some(Mark::Acute),
        keys::N2 => Some(Mark::Grave),
        keys::N3 => Some(Mark::Hook),
        keys::N4 => Some(Mark::Tilde),
        keys::N5 => Some(Mark::Dot),
        _ => None,
    }
}

/// Shape digits: 6=â/ê/ô, 7=ơ/ư, 8=ă, 9=đ
pub fn shape_trigger(key: u16, target: u16) -> Option<Shape> {
    match key {
        keys::N6 if matches!(target, keys::A | keys::E | keys::O) => Some(Shape::Hat),
        keys::N7 if matches!(target, keys::O | keys::U) => Some(Shape::Horn),
        keys::N8 if target == keys::A => Some(Shape::Horn),
        keys::N9 if target == keys::D => Some(Shape::Hat),
        _ => None,
    }
}

pub fn is_remove(key: u16) -> bool {
    key == keys::N0
}

pub fn is_shape_key(key: u16) -> bool {
    matches!(key, keys::N6 | keys::N7 | keys::N8 | keys::N9)
}

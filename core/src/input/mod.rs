//! Input methods
//!
//! Classification of typed keys under the active input method: which keys
//! carry tones, which trigger letter shapes, and which cancel marks. The
//! state machine asks these questions; the answers never mutate state.

pub mod telex;
pub mod vni;

use crate::engine::code::{Mark, Shape};

/// Supported keystroke interpretations, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum InputType {
    #[default]
    Telex = 0,
    Vni = 1,
    /// Telex without the standalone `w` → ư shortcut.
    SimpleTelex1 = 2,
    /// Telex with `w` demoted to a plain letter everywhere.
    SimpleTelex2 = 3,
}

impl InputType {
    pub fn from_u8(v: u8) -> InputType {
        match v {
            1 => InputType::Vni,
            2 => InputType::SimpleTelex1,
            3 => InputType::SimpleTelex2,
            _ => InputType::Telex,
        }
    }

    /// Tone mark carried by `key`, if any (Telex s/f/r/x/j, VNI 1-5).
    pub fn tone_for(self, key: u16) -> Option<Mark> {
        match self {
            InputType::Vni => vni::tone_for(key),
            _ => telex::tone_for(key),
        }
    }

    /// Does `key` apply a shape to a previously typed `target` letter?
    pub fn shape_trigger(self, key: u16, target: u16) -> Option<Shape> {
        match self {
            InputType::Vni => vni::shape_trigger(key, target),
            InputType::SimpleTelex2 => telex::shape_trigger_no_w(key, target),
            _ => telex::shape_trigger(key, target),
        }
    }

    /// Mark/tone removal key (Telex z, VNI 0).
    pub fn is_remove(self, key: u16) -> bool {
        match self {
            InputType::Vni => vni::is_remove(key),
            _ => telex::is_remove(key),
        }
    }

    /// Standalone `w` at word start composes ư.
    pub fn standalone_w(self) -> bool {
        matches!(self, InputType::Telex)
    }

    /// Is this key ever special under the method (tone, shape or remove)?
    pub fn is_modifier_key(self, key: u16) -> bool {
        self.tone_for(key).is_some()
            || self.is_remove(key)
            || match self {
                InputType::Vni => vni::is_shape_key(key),
                InputType::SimpleTelex2 => telex::is_shape_key_no_w(key),
                _ => telex::is_shape_key(key),
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::keys;

    #[test]
    fn test_telex_tones() {
        assert_eq!(InputType::Telex.tone_for(keys::S), Some(Mark::Acute));
        assert_eq!(InputType::Telex.tone_for(keys::F), Some(Mark::Grave));
        assert_eq!(InputType::Telex.tone_for(keys::R), Some(Mark::Hook));
        assert_eq!(InputType::Telex.tone_for(keys::X), Some(Mark::Tilde));
        assert_eq!(InputType::Telex.tone_for(keys::J), Some(Mark::Dot));
        assert_eq!(InputType::Telex.tone_for(keys::A), None);
    }

    #[test]
    fn test_vni_tones() {
        assert_eq!(InputType::Vni.tone_for(keys::N1), Some(Mark::Acute));
        assert_eq!(InputType::Vni.tone_for(keys::N5), Some(Mark::Dot));
        assert_eq!(InputType::Vni.tone_for(keys::S), None);
    }

    #[test]
    fn test_telex_shapes() {
        assert_eq!(
            InputType::Telex.shape_trigger(keys::A, keys::A),
            Some(Shape::Hat)
        );
        assert_eq!(
            InputType::Telex.shape_trigger(keys::W, keys::U),
            Some(Shape::Horn)
        );
        assert_eq!(
            InputType::Telex.shape_trigger(keys::D, keys::D),
            Some(Shape::Hat)
        );
        assert_eq!(InputType::Telex.shape_trigger(keys::A, keys::E), None);
    }

    #[test]
    fn test_simple_telex2_drops_w() {
        assert_eq!(InputType::SimpleTelex2.shape_trigger(keys::W, keys::U), None);
        assert_eq!(
            InputType::SimpleTelex2.shape_trigger(keys::A, keys::A),
            Some(Shape::Hat)
        );
        assert!(!InputType::SimpleTelex2.standalone_w());
        assert!(!InputType::SimpleTelex1.standalone_w());
        assert!(InputType::Telex.standalone_w());
    }

    #[test]
    fn test_vni_shapes() {
        assert_eq!(
            InputType::Vni.shape_trigger(keys::N6, keys::O),
            Some(Shape::Hat)
        );
        assert_eq!(
            InputType::Vni.shape_trigger(keys::N7, keys::U),
            Some(Shape::Horn)
        );
        assert_eq!(
            InputType::Vni.shape_trigger(keys::N8, keys::A),
            Some(Shape::Horn)
        );
        assert_eq!(
            InputType::Vni.shape_trigger(keys::N9, keys::D),
            Some(Shape::Hat)
        );
        assert_eq!(InputType::Vni.shape_trigger(keys::N7, keys::A), None);
    }

    #[test]
    fn test_remove_keys() {
        assert!(InputType::Telex.is_remove(keys::Z));
        assert!(InputType::Vni.is_remove(keys::N0));
        assert!(!InputType::Vni.is_remove(keys::Z));
    }
}

//! Per-word composition session
//!
//! Two fixed-size logs: the raw keystrokes exactly as typed (including
//! tone and shape triggers the composition consumed), and the composed
//! slots currently on screen. Raw entries that produced no slot of
//! their own carry a `consumed` flag; the count of unconsumed raw keys
//! always equals the composed length. Overflow is the caller's signal
//! to force a word break.

use super::code::{EngCode, Shape};
use crate::data::{chars, keys};

/// Maximum keystrokes per word
pub const MAX_BUFF: usize = 32;

/// One raw keystroke
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawKey {
    pub key: u16,
    pub caps: bool,
    /// Swallowed by a transform; restores render it, the screen never did
    pub consumed: bool,
    /// Produced by the standalone-W rule (restores to `w`)
    pub standalone: bool,
}

impl RawKey {
    pub fn new(key: u16, caps: bool) -> Self {
        RawKey {
            key,
            caps,
            consumed: false,
            standalone: false,
        }
    }
}

/// Composition session for the word under the caret.
#[derive(Clone)]
pub struct Session {
    raw: [RawKey; MAX_BUFF],
    raw_len: usize,
    composed: [EngCode; MAX_BUFF],
    index: usize,
    /// Slot currently carrying the tone mark, if any
    tone_index: Option<usize>,
    /// Composed form differs from raw typing
    dirty: bool,
    /// Next letter is forced uppercase (auto-cap-first-char)
    pub upper_case_primed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            raw: [RawKey::default(); MAX_BUFF],
            raw_len: 0,
            composed: [EngCode::default(); MAX_BUFF],
            index: 0,
            tone_index: None,
            dirty: false,
            upper_case_primed: false,
        }
    }

    /// Composed length (slots on screen)
    pub fn len(&self) -> usize {
        self.index
    }

    pub fn raw_len(&self) -> usize {
        self.raw_len
    }

    pub fn is_empty(&self) -> bool {
        self.index == 0 && self.raw_len == 0
    }

    pub fn is_full(&self) -> bool {
        self.index >= MAX_BUFF || self.raw_len >= MAX_BUFF
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn tone_index(&self) -> Option<usize> {
        self.tone_index
    }

    pub fn set_tone_index(&mut self, i: Option<usize>) {
        self.tone_index = i;
    }

    /// Append a keystroke with identity composition. Returns false when full.
    pub fn push(&mut self, key: u16, caps: bool) -> bool {
        if self.is_full() {
            return false;
        }
        self.raw[self.raw_len] = RawKey::new(key, caps);
        self.raw_len += 1;
        self.composed[self.index] = EngCode::from_key(key, caps);
        self.index += 1;
        true
    }

    /// Record a keystroke the composition consumed (tone or shape
    /// trigger): it joins the raw log but produces no slot.
    pub fn log_consumed(&mut self, key: u16, caps: bool) -> bool {
        if self.raw_len >= MAX_BUFF {
            return false;
        }
        let mut raw = RawKey::new(key, caps);
        raw.consumed = true;
        self.raw[self.raw_len] = raw;
        self.raw_len += 1;
        true
    }

    /// Append a keystroke whose slot differs from its key (standalone W,
    /// quick-Telex second letter).
    pub fn push_composed(&mut self, raw: RawKey, composed: EngCode) -> bool {
        if self.is_full() {
            return false;
        }
        self.raw[self.raw_len] = raw;
        self.raw_len += 1;
        self.composed[self.index] = composed;
        self.index += 1;
        self.refresh_dirty();
        true
    }

    /// User backspace: drop the last slot together with any trailing
    /// consumed trigger keys. Tone index and dirty flag re-derive.
    pub fn pop(&mut self) -> Option<EngCode> {
        if self.index == 0 {
            return None;
        }
        while self.raw_len > 0 && self.raw[self.raw_len - 1].consumed {
            self.raw_len -= 1;
        }
        if self.raw_len > 0 {
            self.raw_len -= 1;
        }
        self.index -= 1;
        let removed = self.composed[self.index];
        self.composed[self.index] = EngCode::default();
        self.rescan_tone();
        self.refresh_dirty();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.raw_len = 0;
        self.index = 0;
        self.tone_index = None;
        self.dirty = false;
    }

    pub fn raw(&self) -> &[RawKey] {
        &self.raw[..self.raw_len]
    }

    pub fn composed(&self) -> &[EngCode] {
        &self.composed[..self.index]
    }

    pub fn composed_at(&self, i: usize) -> Option<EngCode> {
        self.composed().get(i).copied()
    }

    pub fn composed_at_mut(&mut self, i: usize) -> Option<&mut EngCode> {
        if i < self.index {
            Some(&mut self.composed[i])
        } else {
            None
        }
    }

    /// Raw keystrokes as engine codes (restore output).
    pub fn raw_codes(&self) -> Vec<EngCode> {
        self.raw()
            .iter()
            .map(|t| EngCode::from_key(t.key, t.caps))
            .collect()
    }

    /// Lowercase ASCII of the raw typing, or `None` when a key has no
    /// letter form (the English-word check wants letters only).
    pub fn raw_ascii_lowercase(&self) -> Option<String> {
        self.raw()
            .iter()
            .map(|t| keys::to_ascii(t.key, false))
            .collect()
    }

    /// First raw key was uppercase / every raw key was uppercase
    /// (auto-caps macro expansion).
    pub fn raw_case(&self) -> (bool, bool) {
        let first = self.raw().first().map(|r| r.caps).unwrap_or(false);
        let all = self.raw_len > 0 && self.raw().iter().all(|r| r.caps);
        (first, all)
    }

    /// Turn the composition into the raw typing in place: every raw key
    /// becomes its own identity slot and composing continues from there.
    pub fn make_raw(&mut self) {
        for i in 0..self.raw_len {
            self.raw[i].consumed = false;
            self.raw[i].standalone = false;
            self.composed[i] = EngCode::from_key(self.raw[i].key, self.raw[i].caps);
        }
        self.index = self.raw_len;
        self.tone_index = None;
        self.dirty = false;
    }

    /// Re-derive the tone index by scanning for a mark.
    pub fn rescan_tone(&mut self) {
        self.tone_index = self.composed().iter().position(|c| c.has_mark());
    }

    /// Re-derive the dirty flag. With no consumed keys the slots must be
    /// the identity of the raw log; any transform artifact is dirt.
    pub fn refresh_dirty(&mut self) {
        if self.raw_len != self.index {
            self.dirty = true;
            return;
        }
        self.dirty = self.composed().iter().enumerate().any(|(i, c)| {
            c.is_char_code()
                || c.is_pure()
                || c.has_mark()
                || c.shape() != Shape::None
                || c.payload() != self.raw[i].key
                || c.caps() != self.raw[i].caps
        });
    }

    /// Unicode rendering of the composed word (validator, macros, tests).
    pub fn to_unicode_string(&self) -> String {
        self.composed()
            .iter()
            .filter_map(|c| chars::compose_code(*c))
            .collect()
    }

    /// Rebuild the session from an already-rendered word so subsequent
    /// keys continue the composition (host re-entry mid-word).
    pub fn restore_from_word(&mut self, word: &str) {
        self.clear();
        for ch in word.chars() {
            if self.is_full() {
                break;
            }
            if let Some(code) = chars::parse_char(ch) {
                self.raw[self.raw_len] = RawKey::new(code.payload(), code.caps());
                self.raw_len += 1;
                self.composed[self.index] = code;
                self.index += 1;
            } else if let Some(key) = keys::from_ascii(ch) {
                self.raw[self.raw_len] = RawKey::new(key, ch.is_uppercase());
                self.raw_len += 1;
                self.composed[self.index] = EngCode::from_key(key, ch.is_uppercase());
                self.index += 1;
            }
        }
        self.rescan_tone();
        self.refresh_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::code::Mark;

    #[test]
    fn test_push_pop() {
        let mut s = Session::new();
        assert!(s.is_empty());
        assert!(s.push(keys::T, false));
        assert!(s.push(keys::I, true));
        assert_eq!(s.len(), 2);
        assert_eq!(s.raw_len(), 2);
        assert!(!s.dirty());

        let c = s.pop().unwrap();
        assert!(c.caps());
        assert_eq!(s.len(), 1);
        assert_eq!(s.raw_len(), 1);
    }

    #[test]
    fn test_overflow() {
        let mut s = Session::new();
        for _ in 0..MAX_BUFF {
            assert!(s.push(keys::A, false));
        }
        assert!(s.is_full());
        assert!(!s.push(keys::B, false));
    }

    #[test]
    fn test_consumed_keys_survive_for_restore() {
        // "ties": the s is consumed by the tone but restores
        let mut s = Session::new();
        s.push(keys::T, false);
        s.push(keys::I, false);
        s.push(keys::E, false);
        s.log_consumed(keys::S, false);
        s.composed_at_mut(2).unwrap().set_mark(Mark::Acute);
        s.set_tone_index(Some(2));
        s.refresh_dirty();

        assert!(s.dirty());
        assert_eq!(s.len(), 3);
        assert_eq!(s.raw_len(), 4);
        assert_eq!(s.raw_ascii_lowercase().as_deref(), Some("ties"));
    }

    #[test]
    fn test_pop_drops_trailing_consumed() {
        let mut s = Session::new();
        s.push(keys::T, false);
        s.push(keys::I, false);
        s.push(keys::E, false);
        s.log_consumed(keys::S, false);
        s.composed_at_mut(2).unwrap().set_mark(Mark::Acute);
        s.refresh_dirty();

        s.pop(); // removes é and its consumed s
        assert_eq!(s.len(), 2);
        assert_eq!(s.raw_len(), 2);
        assert_eq!(s.tone_index(), None);
        assert!(!s.dirty());
    }

    #[test]
    fn test_make_raw() {
        let mut s = Session::new();
        s.push(keys::T, false);
        s.push(keys::O, false);
        s.push(keys::I, false);
        s.log_consumed(keys::O, false);
        s.composed_at_mut(1).unwrap().set_shape(Shape::Hat);
        s.refresh_dirty();
        assert!(s.dirty());

        s.make_raw();
        assert_eq!(s.len(), 4);
        assert_eq!(s.to_unicode_string(), "toio");
        assert!(!s.dirty());
    }

    #[test]
    fn test_unicode_string() {
        let mut s = Session::new();
        s.push(keys::T, false);
        s.push(keys::O, false);
        s.push(keys::I, false);
        let slot = s.composed_at_mut(1).unwrap();
        slot.set_shape(Shape::Hat);
        slot.set_mark(Mark::Acute);
        s.refresh_dirty();
        assert_eq!(s.to_unicode_string(), "tối");
    }

    #[test]
    fn test_restore_from_word() {
        let mut s = Session::new();
        s.restore_from_word("việt");
        assert_eq!(s.len(), 4);
        assert_eq!(s.to_unicode_string(), "việt");
        assert_eq!(s.tone_index(), Some(2));
        assert!(s.dirty());
    }

    #[test]
    fn test_raw_case() {
        let mut s = Session::new();
        s.push(keys::B, true);
        s.push(keys::T, true);
        s.push(keys::W, false);
        assert_eq!(s.raw_case(), (true, false));
    }
}

//! Vietnamese IME engine
//!
//! The per-keystroke state machine. One engine instance is owned by the
//! host's dispatch thread: every call mutates the current word session
//! and returns screen instructions (delete N units, insert these
//! characters). Configuration is an immutable snapshot loaded once per
//! event, so settings changes never tear a keystroke.

pub mod buffer;
pub mod code;
pub mod macros;
pub mod output;
pub mod smart_switch;
pub mod syllable;
pub mod transform;
pub mod validation;

use std::path::Path;
use std::sync::Arc;

use log::debug;
use smallvec::SmallVec;

use crate::config::{ConfigSnapshot, Language, SharedConfig};
use crate::data::keys;
use crate::dict::{DictError, DictKind, Dictionary};

use buffer::Session;
use code::EngCode;
use macros::{MacroError, MacroTable, SnippetEnv, SystemEnv};
use output::{EngineOutput, ExtCode, OutputCode, OutputEncoder};
use transform::KeyAction;
use validation::ValidationOptions;

/// Caps state of one keystroke; Shift and CapsLock cancel out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapsState {
    pub shift: bool,
    pub caps_lock: bool,
}

impl CapsState {
    pub fn effective(self) -> bool {
        self.shift ^ self.caps_lock
    }
}

/// One keyboard event.
#[derive(Clone, Copy, Debug)]
pub struct KeyEvent {
    pub key: u16,
    pub caps: CapsState,
    pub control: bool,
    pub down: bool,
}

/// Engine input events.
#[derive(Clone, Copy, Debug)]
pub enum Event {
    Key(KeyEvent),
    MouseDown,
    NewSession,
}

/// The engine. See module docs for the threading contract.
pub struct Engine {
    session: Session,
    encoder: OutputEncoder,
    shared: Arc<SharedConfig>,
    cfg: Arc<ConfigSnapshot>,
    dict: Dictionary,
    macros: MacroTable,
    snippet_env: Box<dyn SnippetEnv>,
    smart_switch: smart_switch::SmartSwitchStore,
    /// Encoded output per composed slot (diff base)
    rendered: Vec<EngCode>,
    /// Rendered units per composed slot (double-code sync stack)
    sync: Vec<u8>,
    /// One-shot spelling mute, cleared at the next word break
    temp_off_spelling: bool,
    /// Global pause
    temp_off_engine: bool,
    /// Modifier-release gesture state for the restore key
    restore_armed: bool,
    /// Modifier-release gesture state for the pause key
    pause_armed: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Engine {
        Engine::with_shared_config(Arc::new(SharedConfig::default()))
    }

    /// Share a config holder with the host's settings thread.
    pub fn with_shared_config(shared: Arc<SharedConfig>) -> Engine {
        let cfg = shared.load();
        let encoder = OutputEncoder::new(cfg.code_table);
        Engine {
            session: Session::new(),
            encoder,
            shared,
            cfg,
            dict: Dictionary::new(),
            macros: MacroTable::new(),
            snippet_env: Box::new(SystemEnv),
            smart_switch: smart_switch::SmartSwitchStore::new(),
            rendered: Vec::with_capacity(buffer::MAX_BUFF),
            sync: Vec::with_capacity(buffer::MAX_BUFF),
            temp_off_spelling: false,
            temp_off_engine: false,
            restore_armed: false,
            pause_armed: false,
        }
    }

    // ===== Host configuration surface =====

    /// Swap in a new config snapshot; takes effect on the next event.
    pub fn apply_config(&self, snapshot: ConfigSnapshot) {
        self.shared.store(snapshot);
    }

    pub fn config(&self) -> &ConfigSnapshot {
        &self.cfg
    }

    pub fn shared_config(&self) -> Arc<SharedConfig> {
        Arc::clone(&self.shared)
    }

    /// Deterministic clock/RNG/clipboard for tests.
    pub fn set_snippet_env(&mut self, env: Box<dyn SnippetEnv>) {
        self.snippet_env = env;
    }

    pub fn load_dictionary(&mut self, kind: DictKind, path: &Path) -> Result<(), DictError> {
        self.dict.load(kind, path)
    }

    pub fn load_custom_dictionary(&mut self, json: &[u8]) -> Result<usize, DictError> {
        self.dict.load_custom(json)
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    pub fn reload_macros_binary(&mut self, data: &[u8]) -> Result<(), MacroError> {
        self.macros.load_binary(data)
    }

    pub fn reload_macros_text(&mut self, text: &str) -> usize {
        self.macros.load_text(text)
    }

    /// Load a macro file: UTF-8 with tabs reads as the text form,
    /// anything else as the binary blob.
    pub fn reload_macros_file(&mut self, path: &Path) -> Result<(), MacroError> {
        let bytes = std::fs::read(path)
            .map_err(|e| MacroError::Io(path.display().to_string(), e))?;
        match std::str::from_utf8(&bytes) {
            Ok(text) if text.contains('\t') => {
                self.reload_macros_text(text);
                Ok(())
            }
            _ => self.reload_macros_binary(&bytes),
        }
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn macros_mut(&mut self) -> &mut MacroTable {
        &mut self.macros
    }

    pub fn smart_switch(&mut self) -> &mut smart_switch::SmartSwitchStore {
        &mut self.smart_switch
    }

    /// One-shot spelling mute for the current word.
    pub fn temp_off_spelling(&mut self) {
        self.temp_off_spelling = true;
    }

    /// Global pause; the engine passes everything through while set.
    pub fn temp_off_engine(&mut self, off: bool) {
        self.temp_off_engine = off;
        if off {
            self.clear_word_state();
        }
    }

    /// Force uppercase onto the next letter (sentence start).
    pub fn prime_upper_case(&mut self) {
        self.session.upper_case_primed = true;
    }

    /// Rebuild the session from an already-rendered word so the next
    /// keys keep composing it (host re-entry mid-word).
    pub fn restore_session_word(&mut self, word: &str) {
        self.session.restore_from_word(word);
        self.resync_rendered();
    }

    pub fn new_session(&mut self) {
        self.clear_word_state();
    }

    pub fn notify_mouse_down(&mut self) {
        self.clear_word_state();
    }

    /// Manual restore-to-raw. `DoNothing` when there is nothing to undo.
    pub fn restore_raw_keys(&mut self) -> EngineOutput {
        self.restore_in_place()
    }

    /// The composed word currently under the caret (host debugging).
    pub fn current_word(&self) -> String {
        self.session.to_unicode_string()
    }

    /// Expand an output's committed codes into host characters, in
    /// insertion order, through the active code table.
    pub fn committed_chars(&self, out: &EngineOutput) -> Vec<char> {
        out.committed
            .iter()
            .rev()
            .flat_map(|c| self.encoder.to_chars(*c))
            .collect()
    }

    /// Expand an output's macro payload into text.
    pub fn macro_text(&self, out: &EngineOutput) -> String {
        out.macro_chars
            .iter()
            .flat_map(|c| self.encoder.to_chars(*c))
            .collect()
    }

    // ===== Event entry point =====

    pub fn handle_event(&mut self, event: Event) -> EngineOutput {
        // Snapshot the flags once; nothing below re-reads the shared
        // pointer, so a concurrent settings change cannot tear.
        self.cfg = self.shared.load();
        self.encoder.set_table(self.cfg.code_table);

        match event {
            Event::MouseDown => {
                self.clear_word_state();
                EngineOutput::nothing()
            }
            Event::NewSession => {
                self.clear_word_state();
                EngineOutput::nothing()
            }
            Event::Key(key) => self.on_key(key),
        }
    }

    fn on_key(&mut self, evt: KeyEvent) -> EngineOutput {
        if let Some(out) = self.handle_gesture_keys(&evt) {
            return out;
        }
        if !evt.down {
            return EngineOutput::nothing();
        }
        if self.temp_off_engine {
            return EngineOutput::nothing();
        }
        if keys::is_modifier(evt.key) {
            return EngineOutput::nothing();
        }

        // Host shortcuts reset the word; the chord is not text.
        if evt.control {
            self.clear_word_state();
            return EngineOutput::nothing();
        }

        if self.cfg.language == Language::English {
            return self.on_key_english(evt);
        }
        self.on_key_vietnamese(evt)
    }

    /// Restore and pause keys, including the modifier-release path:
    /// a modifier gesture fires only when the key goes down and up with
    /// no other key in between.
    fn handle_gesture_keys(&mut self, evt: &KeyEvent) -> Option<EngineOutput> {
        let restore_key = self.cfg.custom_escape_key;
        let restore_enabled = self.cfg.restore_on_escape;
        let pause_key = self.cfg.pause_key;
        let pause_enabled = self.cfg.pause_key_enabled;

        if restore_enabled && evt.key == restore_key && keys::is_modifier(restore_key) {
            if evt.down {
                self.restore_armed = true;
                return Some(EngineOutput::nothing());
            }
            let fire = self.restore_armed;
            self.restore_armed = false;
            if fire {
                return Some(self.restore_in_place());
            }
            return Some(EngineOutput::nothing());
        }

        if pause_enabled && evt.key == pause_key && keys::is_modifier(pause_key) {
            if evt.down {
                self.pause_armed = true;
                return Some(EngineOutput::nothing());
            }
            let fire = self.pause_armed;
            self.pause_armed = false;
            if fire {
                self.temp_off_engine = !self.temp_off_engine;
                debug!("engine pause toggled: {}", self.temp_off_engine);
            }
            return Some(EngineOutput::nothing());
        }

        // Any other key breaks a pending modifier gesture.
        if evt.down {
            self.restore_armed = false;
            self.pause_armed = false;
        }

        if restore_enabled
            && evt.down
            && evt.key == restore_key
            && !keys::is_modifier(restore_key)
            && !self.temp_off_engine
        {
            return Some(self.restore_in_place());
        }

        // Plain ESC without the restore feature just abandons the word.
        if evt.down && evt.key == keys::ESC {
            self.clear_word_state();
            return Some(EngineOutput::nothing());
        }

        None
    }

    // ===== English mode =====

    fn on_key_english(&mut self, evt: KeyEvent) -> EngineOutput {
        let track_macros = self.cfg.use_macro && self.cfg.use_macro_in_english_mode;
        if !track_macros {
            return EngineOutput::nothing();
        }

        if evt.key == keys::DELETE {
            self.session.pop();
            self.rendered.pop();
            self.sync.pop();
            return EngineOutput::nothing();
        }

        if self.is_break_key(evt.key, evt.caps.shift) {
            let out = if macro_break_key(evt.key) {
                self.expand_macro_at_break()
            } else {
                None
            };
            self.clear_word_state();
            return out.unwrap_or_else(EngineOutput::nothing);
        }

        let caps = evt.caps.effective();
        if keys::is_letter(evt.key) || keys::is_number(evt.key) {
            if self.session.is_full() {
                self.clear_word_state();
            }
            self.session.push(evt.key, caps);
            self.resync_rendered();
        }
        EngineOutput::nothing()
    }

    // ===== Vietnamese mode =====

    fn on_key_vietnamese(&mut self, evt: KeyEvent) -> EngineOutput {
        let key = evt.key;
        let shift = evt.caps.shift;

        if key == keys::DELETE {
            return self.on_backspace();
        }

        if self.is_break_key(key, shift) {
            return self.on_word_break(key, shift);
        }

        // Unmapped keys (function row etc.) behave like navigation.
        if keys::to_ascii(key, false).is_none() {
            return self.on_word_break(key, shift);
        }

        // VNI symbols: Shift+digit must reach the app untouched.
        if shift && keys::is_number(key) {
            return self.on_word_break(key, shift);
        }

        self.on_printable(evt)
    }

    fn on_backspace(&mut self) -> EngineOutput {
        if self.session.len() == 0 {
            return EngineOutput::nothing();
        }
        let units = self.sync.pop().unwrap_or(1);
        self.rendered.pop();
        self.session.pop();

        if units > 1 {
            // The user's own backspace removes one physical unit; the
            // engine owes the rest of the double-code character.
            return EngineOutput {
                code: OutputCode::WillProcess,
                ext_code: ExtCode::Delete,
                backspace_count: units - 1,
                committed: SmallVec::new(),
                macro_chars: Vec::new(),
            };
        }
        EngineOutput {
            ext_code: ExtCode::Delete,
            ..EngineOutput::nothing()
        }
    }

    fn on_printable(&mut self, evt: KeyEvent) -> EngineOutput {
        let key = evt.key;
        let mut caps = evt.caps.effective();

        // Overflow: break silently, the screen keeps the old word.
        if self.session.is_full() {
            self.clear_word_state();
        }

        let mut forced_caps = false;
        if self.session.upper_case_primed && keys::is_letter(key) {
            caps = true;
            forced_caps = true;
            self.session.upper_case_primed = false;
        }

        let input = self.cfg.input_type;
        let modern = self.cfg.use_modern_orthography;

        // Structural shapes first (aa/ow/dd, VNI 6-9)...
        match transform::try_shape(&mut self.session, input, key, modern) {
            KeyAction::Consumed => {
                self.session.log_consumed(key, caps);
                return self.emit_diff(false);
            }
            KeyAction::CancelledToLiteral => {
                self.session.push(key, caps);
                return self.emit_diff(false);
            }
            KeyAction::NotHandled => {}
        }

        // ...then tones (s/f/r/x/j, VNI 1-5)...
        if let Some(mark) = input.tone_for(key) {
            match transform::try_tone(&mut self.session, mark, modern) {
                KeyAction::Consumed => {
                    self.session.log_consumed(key, caps);
                    return self.emit_diff(false);
                }
                KeyAction::CancelledToLiteral => {
                    self.session.push(key, caps);
                    return self.emit_diff(false);
                }
                KeyAction::NotHandled => {}
            }
        }

        // ...mark removal (z / 0)...
        if input.is_remove(key)
            && transform::try_remove_diacritics(&mut self.session, modern) == KeyAction::Consumed
        {
            self.session.log_consumed(key, caps);
            return self.emit_diff(false);
        }

        // ...quick-Telex doubles...
        if self.cfg.quick_telex
            && transform::try_quick_telex(&mut self.session, key, caps, modern)
                == KeyAction::Consumed
        {
            return self.emit_diff(false);
        }

        // ...standalone W...
        if transform::try_standalone_w(&mut self.session, input, key, caps) == KeyAction::Consumed {
            return self.emit_diff(false);
        }

        // Ordinary letter or digit.
        self.session.push(key, caps);
        if keys::is_consonant(key) {
            transform::auto_shape_nucleus(&mut self.session, modern);
        }
        self.emit_diff(!forced_caps)
    }

    // ===== Word break =====

    fn is_break_key(&self, key: u16, shift: bool) -> bool {
        keys::is_whitespace(key)
            || keys::is_navigation(key)
            || key == keys::FORWARD_DELETE
            || keys::is_sentence_punctuation(key, shift)
            || matches!(
                key,
                keys::SEMICOLON
                    | keys::QUOTE
                    | keys::MINUS
                    | keys::EQUAL
                    | keys::BACKQUOTE
                    | keys::BACKSLASH
            )
    }

    fn on_word_break(&mut self, key: u16, shift: bool) -> EngineOutput {
        if self.session.is_empty() {
            self.clear_word_state();
            return EngineOutput::break_word();
        }

        // Macros first: a matching shortcut swallows the word. Only
        // typing breaks qualify; caret movement never expands.
        if self.cfg.use_macro && macro_break_key(key) {
            if let Some(out) = self.expand_macro_at_break() {
                self.clear_word_state();
                return out;
            }
        }

        // Quick consonant expansion (f→ph, trailing g→ng ...).
        if let Some(out) = self.expand_quick_consonants() {
            self.clear_word_state();
            return out;
        }

        let sentence_break = keys::is_sentence_punctuation(key, shift);
        let restore_code = if sentence_break {
            OutputCode::RestoreAndNewSession
        } else {
            OutputCode::Restore
        };

        // Dictionary-driven English restore outranks the spelling rules:
        // a real English word goes back to its raw typing even when the
        // composition happens to be pronounceable Vietnamese.
        if self.cfg.auto_restore_english_word && self.session.dirty() {
            if let Some(ascii) = self.session.raw_ascii_lowercase() {
                if self.dict.should_restore_english(&ascii) {
                    return self.restore_at_break(restore_code, ExtCode::AutoEnglishRestore);
                }
            }
        }

        if self.cfg.check_spelling
            && self.cfg.restore_if_wrong_spelling
            && !self.temp_off_spelling
            && self.session.dirty()
        {
            let opts = ValidationOptions {
                allow_zfwj: self.cfg.allow_consonant_zfwj || self.cfg.quick_start_consonant,
                modern_orthography: self.cfg.use_modern_orthography,
            };
            if !validation::is_valid(self.session.composed(), &opts) {
                return self.restore_at_break(restore_code, ExtCode::WordBreak);
            }
        }

        self.clear_word_state();
        EngineOutput::break_word()
    }

    fn restore_at_break(&mut self, code: OutputCode, ext: ExtCode) -> EngineOutput {
        let backspace = self.rendered_length();
        let mut committed: SmallVec<[EngCode; buffer::MAX_BUFF]> = SmallVec::new();
        for raw in self.session.raw_codes().into_iter().rev() {
            committed.push(raw);
        }
        self.clear_word_state();
        EngineOutput {
            code,
            ext_code: ext,
            backspace_count: backspace,
            committed,
            macro_chars: Vec::new(),
        }
    }

    fn expand_macro_at_break(&mut self) -> Option<EngineOutput> {
        if self.session.is_empty() {
            return None;
        }
        // Shortcuts match the composed word ("đb") or the raw typing
        // ("btw", whose w composed into ư on screen).
        let composed = self.session.to_unicode_string();
        let raw: String = self
            .session
            .raw()
            .iter()
            .filter_map(|r| keys::to_ascii(r.key, r.caps))
            .collect();
        let auto_caps = self.cfg.auto_caps_macro;
        let expansion = self
            .macros
            .expand(&composed, auto_caps, self.snippet_env.as_ref())
            .or_else(|| {
                if raw != composed {
                    self.macros
                        .expand(&raw, auto_caps, self.snippet_env.as_ref())
                } else {
                    None
                }
            })?;
        // An empty payload (clipboard snippet with nothing available)
        // still swallows the shortcut; the ext code tells the host not
        // to send a zero-width insert.
        let ext_code = if expansion.chars.is_empty() {
            ExtCode::SuppressEmpty
        } else {
            ExtCode::Normal
        };
        Some(EngineOutput {
            code: OutputCode::ReplaceMacro,
            ext_code,
            backspace_count: self.rendered_length(),
            committed: SmallVec::new(),
            macro_chars: expansion.chars,
        })
    }

    /// Quick start/end consonants, applied when the break arrives:
    /// f→ph, j→gi, w→qu, z→d at the head; g→ng, h→nh, k→ch at the tail.
    /// Fires only when it turns an illegal word into a legal one.
    fn expand_quick_consonants(&mut self) -> Option<EngineOutput> {
        if !self.cfg.quick_start_consonant && !self.cfg.quick_end_consonant {
            return None;
        }
        if self.session.len() < 2 {
            return None;
        }
        let opts = ValidationOptions {
            allow_zfwj: self.cfg.allow_consonant_zfwj,
            modern_orthography: self.cfg.use_modern_orthography,
        };
        if validation::is_valid(self.session.composed(), &opts) {
            return None;
        }

        let word = self.session.composed();

        let expand_start = |word: &[EngCode]| -> Option<Vec<EngCode>> {
            if !self.cfg.quick_start_consonant {
                return None;
            }
            let head = word[0];
            if head.is_char_code() || head.standalone() {
                return None;
            }
            let letters: &[u16] = match head.payload() {
                keys::F => &[keys::P, keys::H],
                keys::J => &[keys::G, keys::I],
                keys::W => &[keys::Q, keys::U],
                keys::Z => &[keys::D],
                _ => return None,
            };
            let caps = head.caps();
            let mut out: Vec<EngCode> = letters
                .iter()
                .enumerate()
                .map(|(i, &k)| EngCode::from_key(k, caps && i == 0))
                .collect();
            out.extend_from_slice(&word[1..]);
            Some(out)
        };

        let expand_end = |word: &[EngCode]| -> Option<Vec<EngCode>> {
            if !self.cfg.quick_end_consonant {
                return None;
            }
            let tail = *word.last()?;
            if tail.is_char_code() {
                return None;
            }
            let letters: &[u16] = match tail.payload() {
                keys::G => &[keys::N, keys::G],
                keys::H => &[keys::N, keys::H],
                keys::K => &[keys::C, keys::H],
                _ => return None,
            };
            let caps = tail.caps();
            let mut out = word[..word.len() - 1].to_vec();
            out.extend(letters.iter().map(|&k| EngCode::from_key(k, caps)));
            Some(out)
        };

        // Head-only, tail-only, then both; the first legal word wins.
        let candidate = [
            expand_start(word),
            expand_end(word),
            expand_start(word).and_then(|w| expand_end(&w)),
        ]
        .into_iter()
        .flatten()
        .find(|w| validation::is_valid(w, &opts))?;

        let backspace = self.rendered_length();
        let mut committed: SmallVec<[EngCode; buffer::MAX_BUFF]> = SmallVec::new();
        for c in candidate.iter().rev() {
            committed.push(self.encoder.encode(*c));
        }
        Some(EngineOutput {
            code: OutputCode::WillProcess,
            ext_code: ExtCode::WordBreak,
            backspace_count: backspace,
            committed,
            macro_chars: Vec::new(),
        })
    }

    // ===== Restore =====

    fn restore_in_place(&mut self) -> EngineOutput {
        if !self.session.dirty() || self.session.len() == 0 {
            return EngineOutput::nothing();
        }
        let backspace = self.rendered_length();
        let mut committed: SmallVec<[EngCode; buffer::MAX_BUFF]> = SmallVec::new();
        for raw in self.session.raw_codes().into_iter().rev() {
            committed.push(raw);
        }

        // The word stays open as its raw typing.
        self.session.make_raw();
        self.resync_rendered();

        EngineOutput {
            code: OutputCode::Restore,
            ext_code: ExtCode::None,
            backspace_count: backspace,
            committed,
            macro_chars: Vec::new(),
        }
    }

    // ===== Output assembly =====

    fn rendered_length(&self) -> u8 {
        self.sync.iter().map(|&u| u as u16).sum::<u16>().min(255) as u8
    }

    fn resync_rendered(&mut self) {
        self.rendered = self
            .session
            .composed()
            .iter()
            .map(|c| self.encoder.encode(*c))
            .collect();
        self.sync = self
            .rendered
            .iter()
            .map(|c| self.encoder.rendered_units(*c))
            .collect();
    }

    /// Diff the rendered state around a mutation into one output.
    ///
    /// `identity_append` marks a plain letter the host may deliver
    /// itself (DoNothing passthrough).
    fn emit_diff(&mut self, identity_append: bool) -> EngineOutput {
        let prev = std::mem::take(&mut self.rendered);
        let prev_units = std::mem::take(&mut self.sync);

        self.resync_rendered();

        let common = prev
            .iter()
            .zip(self.rendered.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let backspace: u16 = prev_units[common..].iter().map(|&u| u as u16).sum();
        let mut committed: SmallVec<[EngCode; buffer::MAX_BUFF]> = SmallVec::new();
        for c in self.rendered[common..].iter().rev() {
            committed.push(*c);
        }

        if committed.is_empty() && backspace == 0 {
            return EngineOutput::nothing();
        }

        // A bare identity append renders itself at the host.
        if identity_append
            && backspace == 0
            && committed.len() == 1
            && !committed[0].is_char_code()
            && !committed[0].is_pure()
        {
            return EngineOutput::nothing();
        }

        EngineOutput {
            code: OutputCode::WillProcess,
            ext_code: ExtCode::Normal,
            backspace_count: backspace.min(255) as u8,
            committed,
            macro_chars: Vec::new(),
        }
    }

    fn clear_word_state(&mut self) {
        self.session.clear();
        self.session.upper_case_primed = false;
        self.rendered.clear();
        self.sync.clear();
        self.temp_off_spelling = false;
    }
}

/// Breaks that may trigger a macro: whitespace, return and punctuation,
/// never caret movement.
fn macro_break_key(key: u16) -> bool {
    !keys::is_navigation(key) && key != keys::FORWARD_DELETE
}

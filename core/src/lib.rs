//! ViKey Vietnamese IME Core
//!
//! Keystroke state machine for Vietnamese input: Telex/VNI composition,
//! spelling validation with restore-on-break, dictionary-driven English
//! auto-restore, macro expansion, five output code tables, and the
//! standalone convert utility. Platform shims stay thin: they feed key
//! events in and apply `backspace + insert` instructions coming out.
//!
//! # FFI Usage
//!
//! ```c
//! // Initialize once at app start
//! vikey_init();
//! vikey_set_input_type(0);  // 0=Telex, 1=VNI
//!
//! // Process each keystroke
//! VikeyResult* r = vikey_key(keycode, is_shift, is_capslock, is_ctrl);
//! if (r && r->code != 0) {
//!     // Send r->backspace deletes, then r->chars
//! }
//! vikey_free(r);
//!
//! // Clean up on caret moves
//! vikey_mouse_down();
//! ```

pub mod config;
pub mod convert;
pub mod data;
pub mod dict;
pub mod engine;
pub mod input;

pub use config::{ConfigSnapshot, Language, SharedConfig};
pub use convert::{convert, ConvertOptions};
pub use data::codetable::CodeTable;
pub use dict::{DictKind, Dictionary};
pub use engine::output::{EngineOutput, ExtCode, OutputCode};
pub use engine::{CapsState, Engine, Event, KeyEvent};
pub use input::InputType;

use std::os::raw::c_char;
use std::sync::Mutex;

use engine::buffer::MAX_BUFF;
use engine::macros::SnippetType;

// Global engine instance (thread-safe via Mutex)
static ENGINE: Mutex<Option<Engine>> = Mutex::new(None);

/// Lock the engine mutex, recovering from poisoned state if needed (for tests)
fn lock_engine() -> std::sync::MutexGuard<'static, Option<Engine>> {
    ENGINE.lock().unwrap_or_else(|e| e.into_inner())
}

fn update_config<F: FnOnce(&mut ConfigSnapshot)>(f: F) {
    let guard = lock_engine();
    if let Some(ref e) = *guard {
        let mut snapshot = (*e.shared_config().load()).clone();
        f(&mut snapshot);
        e.apply_config(snapshot);
    }
}

/// Maximum macro payload characters crossing the FFI boundary.
const MACRO_MAX: usize = 512;

/// Result struct shared with host shims. `chars` are UTF-32 code points
/// in insertion order; `code`/`ext_code` follow the engine enums.
#[repr(C)]
pub struct VikeyResult {
    pub code: u8,
    pub ext_code: u8,
    pub backspace: u8,
    pub count: u8,
    pub chars: [u32; MAX_BUFF * 2],
    pub macro_len: u16,
    pub macro_chars: [u32; MACRO_MAX],
}

impl VikeyResult {
    fn from_output(engine: &Engine, out: &EngineOutput) -> VikeyResult {
        let mut result = VikeyResult {
            code: out.code as u8,
            ext_code: out.ext_code as u8,
            backspace: out.backspace_count,
            count: 0,
            chars: [0; MAX_BUFF * 2],
            macro_len: 0,
            macro_chars: [0; MACRO_MAX],
        };
        for (i, c) in engine.committed_chars(out).into_iter().take(MAX_BUFF * 2).enumerate() {
            result.chars[i] = c as u32;
            result.count = (i + 1) as u8;
        }
        for (i, c) in engine.macro_text(out).chars().take(MACRO_MAX).enumerate() {
            result.macro_chars[i] = c as u32;
            result.macro_len = (i + 1) as u16;
        }
        result
    }
}

fn boxed_result(engine: &Engine, out: &EngineOutput) -> *mut VikeyResult {
    Box::into_raw(Box::new(VikeyResult::from_output(engine, out)))
}

unsafe fn cstr<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    std::ffi::CStr::from_ptr(ptr).to_str().ok()
}

// ============================================================
// FFI Interface
// ============================================================

/// Initialize the IME engine. Call once before any other `vikey_*`.
#[no_mangle]
pub extern "C" fn vikey_init() {
    let mut guard = lock_engine();
    *guard = Some(Engine::new());
}

/// Process a key-down event.
///
/// Returns a [`VikeyResult`] the caller must free with `vikey_free`,
/// or null if the engine is not initialized.
#[no_mangle]
pub extern "C" fn vikey_key(key: u16, shift: bool, caps_lock: bool, ctrl: bool) -> *mut VikeyResult {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        let out = e.handle_event(Event::Key(KeyEvent {
            key,
            caps: CapsState { shift, caps_lock },
            control: ctrl,
            down: true,
        }));
        boxed_result(e, &out)
    } else {
        std::ptr::null_mut()
    }
}

/// Process a key-up event (modifier-release gestures).
#[no_mangle]
pub extern "C" fn vikey_key_up(key: u16) -> *mut VikeyResult {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        let out = e.handle_event(Event::Key(KeyEvent {
            key,
            caps: CapsState::default(),
            control: false,
            down: false,
        }));
        boxed_result(e, &out)
    } else {
        std::ptr::null_mut()
    }
}

/// Caret moved by mouse: abandon the current word.
#[no_mangle]
pub extern "C" fn vikey_mouse_down() {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.notify_mouse_down();
    }
}

/// Start a new word session.
#[no_mangle]
pub extern "C" fn vikey_new_session() {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.new_session();
    }
}

/// Manually restore the current word to its raw keystrokes.
#[no_mangle]
pub extern "C" fn vikey_restore() -> *mut VikeyResult {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        let out = e.restore_raw_keys();
        boxed_result(e, &out)
    } else {
        std::ptr::null_mut()
    }
}

/// Temporarily mute spelling validation for the current word.
#[no_mangle]
pub extern "C" fn vikey_temp_off_spelling() {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.temp_off_spelling();
    }
}

/// Pause or resume the whole engine.
#[no_mangle]
pub extern "C" fn vikey_temp_off_engine(off: bool) {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.temp_off_engine(off);
    }
}

/// Prime uppercase for the next letter (sentence start).
#[no_mangle]
pub extern "C" fn vikey_prime_upper_case() {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.prime_upper_case();
    }
}

// ===== Configuration =====

/// 0 = English, 1 = Vietnamese
#[no_mangle]
pub extern "C" fn vikey_set_language(language: u8) {
    update_config(|c| {
        c.language = if language == 0 {
            Language::English
        } else {
            Language::Vietnamese
        }
    });
}

/// 0 = Telex, 1 = VNI, 2/3 = Simple Telex
#[no_mangle]
pub extern "C" fn vikey_set_input_type(input_type: u8) {
    update_config(|c| c.input_type = InputType::from_u8(input_type));
}

/// 0 = Unicode, 1 = TCVN3, 2 = VNI-Windows, 3 = Composite, 4 = CP1258
#[no_mangle]
pub extern "C" fn vikey_set_code_table(code_table: u8) {
    update_config(|c| c.code_table = CodeTable::from_u8(code_table));
}

#[no_mangle]
pub extern "C" fn vikey_set_check_spelling(enabled: bool) {
    update_config(|c| {
        c.check_spelling = enabled;
        c.restore_if_wrong_spelling = enabled;
    });
}

#[no_mangle]
pub extern "C" fn vikey_set_modern_orthography(enabled: bool) {
    update_config(|c| c.use_modern_orthography = enabled);
}

#[no_mangle]
pub extern "C" fn vikey_set_quick_telex(enabled: bool) {
    update_config(|c| c.quick_telex = enabled);
}

#[no_mangle]
pub extern "C" fn vikey_set_use_macro(enabled: bool, in_english: bool, auto_caps: bool) {
    update_config(|c| {
        c.use_macro = enabled;
        c.use_macro_in_english_mode = in_english;
        c.auto_caps_macro = auto_caps;
    });
}

#[no_mangle]
pub extern "C" fn vikey_set_auto_restore_english(enabled: bool) {
    update_config(|c| c.auto_restore_english_word = enabled);
}

#[no_mangle]
pub extern "C" fn vikey_set_restore_on_escape(enabled: bool, key: u16) {
    update_config(|c| {
        c.restore_on_escape = enabled;
        c.custom_escape_key = if key > 0 { key } else { data::keys::ESC };
    });
}

#[no_mangle]
pub extern "C" fn vikey_set_allow_zfwj(enabled: bool) {
    update_config(|c| c.allow_consonant_zfwj = enabled);
}

#[no_mangle]
pub extern "C" fn vikey_set_quick_consonants(start: bool, end: bool) {
    update_config(|c| {
        c.quick_start_consonant = start;
        c.quick_end_consonant = end;
    });
}

// ===== Dictionaries =====

/// kind: 0 = English, 1 = Vietnamese. Returns false on any load error.
///
/// # Safety
/// `path` must be a valid null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn vikey_load_dictionary(kind: u8, path: *const c_char) -> bool {
    let Some(path) = cstr(path) else {
        return false;
    };
    let kind = if kind == 0 {
        DictKind::English
    } else {
        DictKind::Vietnamese
    };
    let mut guard = lock_engine();
    match *guard {
        Some(ref mut e) => match e.load_dictionary(kind, std::path::Path::new(path)) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("dictionary load failed: {}", err);
                false
            }
        },
        None => false,
    }
}

/// Replace the custom dictionary overlays from JSON bytes.
///
/// # Safety
/// `data` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn vikey_load_custom_dictionary(data: *const u8, len: usize) -> bool {
    if data.is_null() {
        return false;
    }
    let bytes = std::slice::from_raw_parts(data, len);
    let mut guard = lock_engine();
    match *guard {
        Some(ref mut e) => e.load_custom_dictionary(bytes).is_ok(),
        None => false,
    }
}

// ===== Macros =====

/// Replace the macro table from a binary blob.
///
/// # Safety
/// `data` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn vikey_load_macros(data: *const u8, len: usize) -> bool {
    if data.is_null() {
        return false;
    }
    let bytes = std::slice::from_raw_parts(data, len);
    let mut guard = lock_engine();
    match *guard {
        Some(ref mut e) => e.reload_macros_binary(bytes).is_ok(),
        None => false,
    }
}

/// Add a single macro definition.
///
/// # Safety
/// Both pointers must be valid null-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn vikey_macro_add(
    shortcut: *const c_char,
    content: *const c_char,
    snippet: u8,
) {
    let (Some(shortcut), Some(content)) = (cstr(shortcut), cstr(content)) else {
        return;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.macros_mut()
            .add(shortcut, content, SnippetType::from_u8(snippet));
    }
}

#[no_mangle]
pub extern "C" fn vikey_macro_clear() {
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.macros_mut().clear();
    }
}

// ===== Session restore & smart switch =====

/// Rebuild the session from a rendered word (caret re-entry).
///
/// # Safety
/// `word` must be a valid null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn vikey_restore_word(word: *const c_char) {
    let Some(word) = cstr(word) else {
        return;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.restore_session_word(word);
    }
}

/// Per-app remembered state; returns -1 when the app was unknown.
///
/// # Safety
/// `app_id` must be a valid null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn vikey_smart_switch_get(app_id: *const c_char, default_state: i32) -> i32 {
    let Some(app_id) = cstr(app_id) else {
        return engine::smart_switch::NOT_FOUND;
    };
    let mut guard = lock_engine();
    match *guard {
        Some(ref mut e) => e.smart_switch().get_or_insert(app_id, default_state),
        None => engine::smart_switch::NOT_FOUND,
    }
}

/// # Safety
/// `app_id` must be a valid null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn vikey_smart_switch_set(app_id: *const c_char, state: i32) {
    let Some(app_id) = cstr(app_id) else {
        return;
    };
    let mut guard = lock_engine();
    if let Some(ref mut e) = *guard {
        e.smart_switch().set(app_id, state);
    }
}

/// Free a result returned by `vikey_key` and friends.
///
/// # Safety
/// `r` must be a pointer from this library, freed exactly once.
#[no_mangle]
pub unsafe extern "C" fn vikey_free(r: *mut VikeyResult) {
    if !r.is_null() {
        drop(Box::from_raw(r));
    }
}

// ============================================================
// Tests
// ============================================================

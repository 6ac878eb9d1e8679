//! Shared test harness: a screen simulator that applies engine outputs
//! the way a host shim would, plus dictionary fixtures.
#![allow(dead_code)]

use std::path::PathBuf;

use vikey_core::data::keys;
use vikey_core::dict::{DictKind, TrieBuilder};
use vikey_core::engine::output::{EngineOutput, ExtCode, OutputCode};
use vikey_core::{CapsState, ConfigSnapshot, Engine, Event, KeyEvent};

pub const ESC_CHAR: char = '\u{1b}';
pub const BACKSPACE_CHAR: char = '\u{8}';

pub fn key_event(key: u16, shift: bool) -> Event {
    Event::Key(KeyEvent {
        key,
        caps: CapsState {
            shift,
            caps_lock: false,
        },
        control: false,
        down: true,
    })
}

/// Apply one output to the simulated screen. `typed` is the raw char of
/// the key that produced it (break keys echo themselves after Restore /
/// BreakWord / ReplaceMacro outputs).
pub fn apply_output(engine: &Engine, screen: &mut String, out: &EngineOutput, typed: Option<char>) {
    for _ in 0..out.backspace_count {
        screen.pop();
    }
    for c in engine.committed_chars(out) {
        screen.push(c);
    }
    match out.code {
        OutputCode::DoNothing => {
            if let Some(c) = typed {
                screen.push(c);
            }
        }
        OutputCode::WillProcess => {
            if out.ext_code == ExtCode::WordBreak {
                if let Some(c) = typed {
                    screen.push(c);
                }
            }
        }
        OutputCode::BreakWord => {
            if let Some(c) = typed {
                screen.push(c);
            }
        }
        OutputCode::Restore | OutputCode::RestoreAndNewSession => {
            if out.ext_code != ExtCode::None {
                if let Some(c) = typed {
                    screen.push(c);
                }
            }
        }
        OutputCode::ReplaceMacro => {
            screen.push_str(&engine.macro_text(out));
            if let Some(c) = typed {
                screen.push(c);
            }
        }
    }
}

/// Simulate typing `input`. `\u{1b}` sends Escape, `\u{8}` backspace;
/// uppercase letters arrive with Shift held.
pub fn type_str(engine: &mut Engine, input: &str) -> String {
    let mut screen = String::new();
    feed(engine, &mut screen, input);
    screen
}

/// Continue typing onto an existing simulated screen.
pub fn feed(engine: &mut Engine, screen: &mut String, input: &str) {
    for ch in input.chars() {
        if ch == ESC_CHAR {
            let out = engine.handle_event(key_event(keys::ESC, false));
            apply_output(engine, screen, &out, None);
            continue;
        }
        if ch == BACKSPACE_CHAR {
            let out = engine.handle_event(key_event(keys::DELETE, false));
            // The host's own backspace removes one unit...
            screen.pop();
            // ...and the engine settles any double-code remainder.
            for _ in 0..out.backspace_count {
                screen.pop();
            }
            continue;
        }

        let Some(key) = keys::from_ascii(ch) else {
            continue;
        };
        let shift = ch.is_uppercase();
        let out = engine.handle_event(key_event(key, shift));
        apply_output(engine, &mut *screen, &out, Some(ch));
    }
}

/// Engine with spell-check on, Telex, Unicode output.
pub fn telex_engine() -> Engine {
    let engine = Engine::new();
    engine.apply_config(ConfigSnapshot::default());
    engine
}

pub fn engine_with(f: impl FnOnce(&mut ConfigSnapshot)) -> Engine {
    let engine = Engine::new();
    let mut cfg = ConfigSnapshot::default();
    f(&mut cfg);
    engine.apply_config(cfg);
    engine
}

/// Run `(input, expected screen)` cases on fresh Telex engines.
pub fn telex_cases(cases: &[(&str, &str)]) {
    for (input, expected) in cases {
        let mut engine = telex_engine();
        let screen = type_str(&mut engine, input);
        assert_eq!(&screen, expected, "[Telex] {:?} → {:?}", input, screen);
    }
}

/// Run cases against a configured engine factory.
pub fn run_cases(make: impl Fn() -> Engine, cases: &[(&str, &str)]) {
    for (input, expected) in cases {
        let mut engine = make();
        let screen = type_str(&mut engine, input);
        assert_eq!(&screen, expected, "{:?} → {:?}", input, screen);
    }
}

fn fixture_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("vikey-fixture-{}-{}", std::process::id(), name));
    p
}

/// Build a PHT2 trie fixture on disk and load it into the engine.
pub fn load_dictionary_fixture(engine: &mut Engine, kind: DictKind, name: &str, words: &[&str]) {
    let mut builder = TrieBuilder::new();
    for w in words {
        builder.insert(w);
    }
    let path = fixture_path(name);
    builder.write_to(&path).expect("fixture trie");
    engine
        .load_dictionary(kind, &path)
        .expect("fixture dictionary load");
    std::fs::remove_file(&path).ok();
}

/// The stock English fixture the scenario tests assume.
pub fn load_english_fixture(engine: &mut Engine) {
    load_dictionary_fixture(
        engine,
        DictKind::English,
        "en.bin",
        &[
            "terminal", "user", "use", "the", "expect", "text", "issue", "around", "water",
        ],
    );
}

//! Engine contract tests: determinism, backspace balance, double-code
//! sync, pause/mute switches and the restore-key gestures.

mod common;

use common::*;
use vikey_core::data::keys;
use vikey_core::engine::output::{ExtCode, OutputCode};
use vikey_core::{CapsState, CodeTable, Event, KeyEvent};

#[test]
fn outputs_are_deterministic() {
    let input = "nguwowif ddepj tieengs vieetj ";
    let mut first = telex_engine();
    let mut second = telex_engine();
    assert_eq!(type_str(&mut first, input), type_str(&mut second, input));
}

#[test]
fn backspace_never_underflows() {
    // Property: every output deletes at most what is on screen.
    let mut e = telex_engine();
    let mut screen = String::new();
    for ch in "ddoongf uwowcs tooi hoaxn xong ".chars() {
        let Some(key) = keys::from_ascii(ch) else {
            continue;
        };
        let out = e.handle_event(key_event(key, false));
        assert!(
            (out.backspace_count as usize) <= screen.chars().count(),
            "backspace {} exceeds screen {:?}",
            out.backspace_count,
            screen
        );
        apply_output(&e, &mut screen, &out, Some(ch));
    }
}

#[test]
fn ordering_law_incremental_equals_final() {
    // Applying every intermediate output in order must land on the same
    // text that the final composed word shows.
    let mut e = telex_engine();
    let mut screen = String::new();
    feed(&mut e, &mut screen, "truowngf");
    assert_eq!(screen, e.current_word());
}

#[test]
fn double_code_table_backspace_sync() {
    let mut e = engine_with(|c| c.code_table = CodeTable::VniWindows);
    let mut screen = String::new();

    feed(&mut e, &mut screen, "as");
    // á in VNI-Windows renders as two units: 'a' + tone glyph
    assert_eq!(screen.chars().count(), 2);

    // One user backspace owes one extra engine delete.
    let out = e.handle_event(key_event(keys::DELETE, false));
    assert_eq!(out.code, OutputCode::WillProcess);
    assert_eq!(out.ext_code, ExtCode::Delete);
    assert_eq!(out.backspace_count, 1);
}

#[test]
fn single_code_backspace_is_passive() {
    let mut e = telex_engine();
    let mut screen = String::new();
    feed(&mut e, &mut screen, "as");
    assert_eq!(screen, "á");

    let out = e.handle_event(key_event(keys::DELETE, false));
    assert_eq!(out.code, OutputCode::DoNothing);
    assert_eq!(out.ext_code, ExtCode::Delete);
}

#[test]
fn temp_off_spelling_is_one_shot() {
    let mut e = telex_engine();
    let mut screen = String::new();

    e.temp_off_spelling();
    feed(&mut e, &mut screen, "qes ");
    // Muted: the illegal word stays composed.
    assert_eq!(screen, "qé ");

    // The mute cleared at the break; the next word validates again.
    feed(&mut e, &mut screen, "qes ");
    assert_eq!(screen, "qé qes ");
}

#[test]
fn temp_off_engine_passes_everything() {
    let mut e = telex_engine();
    e.temp_off_engine(true);
    let out = e.handle_event(key_event(keys::S, false));
    assert_eq!(out.code, OutputCode::DoNothing);
    assert_eq!(e.current_word(), "");

    e.temp_off_engine(false);
    let mut screen = String::new();
    feed(&mut e, &mut screen, "as");
    assert_eq!(screen, "á");
}

#[test]
fn restore_key_modifier_release_path() {
    let mut e = engine_with(|c| {
        c.restore_on_escape = true;
        c.custom_escape_key = keys::LEFT_OPTION;
    });
    let mut screen = String::new();
    feed(&mut e, &mut screen, "tooi");
    assert_eq!(screen, "tôi");

    let down = |key| {
        Event::Key(KeyEvent {
            key,
            caps: CapsState::default(),
            control: false,
            down: true,
        })
    };
    let up = |key| {
        Event::Key(KeyEvent {
            key,
            caps: CapsState::default(),
            control: false,
            down: false,
        })
    };

    // Press with another key in between: the gesture must not fire.
    e.handle_event(down(keys::LEFT_OPTION));
    let out = e.handle_event(down(keys::A));
    apply_output(&e, &mut screen, &out, Some('a'));
    let out = e.handle_event(up(keys::LEFT_OPTION));
    assert_eq!(out.code, OutputCode::DoNothing);

    // Clean press-and-release fires the in-place restore.
    e.handle_event(down(keys::LEFT_OPTION));
    let out = e.handle_event(up(keys::LEFT_OPTION));
    assert_eq!(out.code, OutputCode::Restore);
    assert_eq!(out.ext_code, ExtCode::None);
    apply_output(&e, &mut screen, &out, None);
    assert_eq!(screen, "tooia");
}

#[test]
fn mouse_down_resets_double_code_stack() {
    let mut e = engine_with(|c| c.code_table = CodeTable::Cp1258);
    let mut screen = String::new();
    feed(&mut e, &mut screen, "haix");
    e.handle_event(Event::MouseDown);
    // A fresh session owes nothing to the old word.
    let out = e.handle_event(key_event(keys::DELETE, false));
    assert_eq!(out.code, OutputCode::DoNothing);
    assert_eq!(out.backspace_count, 0);
}

#[test]
fn navigation_breaks_word() {
    let mut e = telex_engine();
    let mut screen = String::new();
    feed(&mut e, &mut screen, "tooi");
    let out = e.handle_event(key_event(keys::LEFT, false));
    assert_eq!(out.code, OutputCode::BreakWord);
    assert_eq!(e.current_word(), "");
}

#[test]
fn forward_delete_breaks_word() {
    let mut e = telex_engine();
    let mut screen = String::new();
    feed(&mut e, &mut screen, "as");
    let out = e.handle_event(key_event(keys::FORWARD_DELETE, false));
    assert_eq!(out.code, OutputCode::BreakWord);
    assert_eq!(e.current_word(), "");
}

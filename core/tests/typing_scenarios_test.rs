//! End-to-end typing flows: the composition scenarios every release is
//! checked against, with cumulative screen assertions.

mod common;

use common::*;
use vikey_core::data::keys;
use vikey_core::engine::output::{ExtCode, OutputCode};

#[test]
fn scenario_tieng_tone_migrates() {
    let mut e = telex_engine();
    let mut screen = String::new();

    feed(&mut e, &mut screen, "ti");
    assert_eq!(screen, "ti");
    feed(&mut e, &mut screen, "e");
    assert_eq!(screen, "tie");
    feed(&mut e, &mut screen, "s");
    assert_eq!(screen, "tié");
    feed(&mut e, &mut screen, "n");
    assert_eq!(screen, "tiến");
    feed(&mut e, &mut screen, "g");
    assert_eq!(screen, "tiếng");
    feed(&mut e, &mut screen, " ");
    assert_eq!(screen, "tiếng ");
}

#[test]
fn scenario_terminal_auto_english_restore() {
    let mut e = engine_with(|c| c.auto_restore_english_word = true);
    load_english_fixture(&mut e);

    let mut screen = String::new();
    feed(&mut e, &mut screen, "terminal");
    assert_eq!(screen, "tẻminal");

    // SPACE restores the raw typing; the ext code marks the reason.
    let out = e.handle_event(key_event(keys::SPACE, false));
    assert_eq!(out.code, OutputCode::Restore);
    assert_eq!(out.ext_code, ExtCode::AutoEnglishRestore);
    apply_output(&e, &mut screen, &out, Some(' '));
    assert_eq!(screen, "terminal ");
}

#[test]
fn scenario_qes_custom_dictionary_vs_spelling() {
    // Path A: custom dictionary carries "qes" → English restore.
    let mut e = engine_with(|c| c.auto_restore_english_word = true);
    e.load_custom_dictionary(br#"[{"word": "qes", "type": "en"}]"#)
        .unwrap();

    let mut screen = String::new();
    feed(&mut e, &mut screen, "qes");
    assert_eq!(screen, "qé");
    let out = e.handle_event(key_event(keys::SPACE, false));
    assert_eq!(out.code, OutputCode::Restore);
    assert_eq!(out.ext_code, ExtCode::AutoEnglishRestore);
    apply_output(&e, &mut screen, &out, Some(' '));
    assert_eq!(screen, "qes ");

    // Path B: no dictionary entry → the invalid-spelling rule restores.
    let mut e = engine_with(|c| c.auto_restore_english_word = true);
    let mut screen = String::new();
    feed(&mut e, &mut screen, "qes");
    let out = e.handle_event(key_event(keys::SPACE, false));
    assert_eq!(out.code, OutputCode::Restore);
    assert_eq!(out.ext_code, ExtCode::WordBreak);
    apply_output(&e, &mut screen, &out, Some(' '));
    assert_eq!(screen, "qes ");
}

#[test]
fn scenario_user_dot_restores() {
    let mut e = engine_with(|c| c.auto_restore_english_word = true);
    load_english_fixture(&mut e);

    let mut screen = String::new();
    feed(&mut e, &mut screen, "user");
    assert_eq!(screen, "uẻ");

    let out = e.handle_event(key_event(keys::DOT, false));
    assert_eq!(out.ext_code, ExtCode::AutoEnglishRestore);
    apply_output(&e, &mut screen, &out, Some('.'));
    assert_eq!(screen, "user.");
}

#[test]
fn scenario_triple_a() {
    let mut e = telex_engine();
    let mut screen = String::new();

    feed(&mut e, &mut screen, "aa");
    assert_eq!(screen, "â");
    feed(&mut e, &mut screen, "a");
    assert_eq!(screen, "âa");
    // `âa` is not a legal nucleus, so the break restores the raw keys.
    feed(&mut e, &mut screen, " ");
    assert_eq!(screen, "aaa ");
}

#[test]
fn scenario_escape_restores_in_place() {
    let mut e = engine_with(|c| {
        c.restore_on_escape = true;
        c.custom_escape_key = keys::ESC;
    });
    let mut screen = String::new();

    feed(&mut e, &mut screen, "tooi");
    assert_eq!(screen, "tôi");

    feed(&mut e, &mut screen, "\u{1b}");
    assert_eq!(screen, "tooi");

    // The session stays open as raw typing; further keys keep composing
    // from the restored letters.
    feed(&mut e, &mut screen, "s");
    assert_eq!(screen, "toói");
    // ooi is no nucleus, so the break falls back to raw once more.
    feed(&mut e, &mut screen, " ");
    assert_eq!(screen, "toois ");
}

#[test]
fn boundary_empty_break() {
    let mut e = telex_engine();
    let out = e.handle_event(key_event(keys::SPACE, false));
    assert_eq!(out.code, OutputCode::BreakWord);
    assert_eq!(out.ext_code, ExtCode::WordBreak);
    assert_eq!(out.backspace_count, 0);
    assert!(out.committed.is_empty());
}

#[test]
fn boundary_overflow_starts_fresh_session() {
    let mut e = telex_engine();
    let mut screen = String::new();
    let long_run: String = "b".repeat(32);
    feed(&mut e, &mut screen, &long_run);
    assert_eq!(screen.chars().count(), 32);

    feed(&mut e, &mut screen, "as");
    // The new session holds only "a" + tone, untouched by the old word.
    assert_eq!(screen, format!("{}á", "b".repeat(32)));
}

#[test]
fn basic_telex_words() {
    telex_cases(&[
        ("vieetj ", "việt "),
        ("tooi ", "tôi "),
        ("ddepj ", "đẹp "),
        ("nguwowif ", "người "),
        ("hoaf ", "hoà "),
        ("truowngf ", "trường "),
        ("quas ", "quá "),
        ("khoong ", "không "),
        ("cuuws ", "cứu "),
        // an illegal coda sends the whole word back to its raw keys
        ("ddaaysd ", "ddaaysd "),
    ]);
}

#[test]
fn tone_cancellation_double_key() {
    telex_cases(&[
        // second s cancels to a literal, third re-applies
        ("bass", "bas"),
        ("basss", "bás"),
        ("tooo", "tôo"),
    ]);
}

#[test]
fn backspace_recomposes() {
    let mut e = telex_engine();
    let mut screen = String::new();
    feed(&mut e, &mut screen, "ties");
    assert_eq!(screen, "tié");
    feed(&mut e, &mut screen, "\u{8}");
    assert_eq!(screen, "ti");
    feed(&mut e, &mut screen, "es");
    assert_eq!(screen, "tié");
}

#[test]
fn uppercase_typing() {
    telex_cases(&[("Vieetj ", "Việt "), ("TIEENGS ", "TIẾNG ")]);
}

#[test]
fn quick_telex_doubles() {
    let make = || engine_with(|c| c.quick_telex = true);
    run_cases(
        make,
        &[("cc", "ch"), ("nn", "ng"), ("tt", "th"), ("qq", "qu")],
    );
}

#[test]
fn quick_consonant_expansion_at_break() {
    let make = || {
        engine_with(|c| {
            c.quick_start_consonant = true;
            c.quick_end_consonant = true;
        })
    };
    run_cases(
        make,
        &[
            ("fanh ", "phanh "),
            ("jang ", "giang "),
            ("hag ", "hang "),
            ("vih ", "vinh "),
            ("bak ", "bach "),
        ],
    );
}

#[test]
fn upper_case_priming() {
    let mut e = telex_engine();
    e.prime_upper_case();
    let mut screen = String::new();
    feed(&mut e, &mut screen, "ba");
    assert_eq!(screen, "Ba");
}

//! Logical key identifiers
//!
//! Key ids use the macOS virtual-keycode namespace; platform shims map
//! their scancodes/virtual keys into these values before calling the
//! engine. The numbering is therefore stable across hosts.

/// Sentinel for "no key".
pub const EMPTY: u16 = 256;

// Letters
pub const A: u16 = 0;
pub const S: u16 = 1;
pub const D: u16 = 2;
pub const F: u16 = 3;
pub const H: u16 = 4;
pub const G: u16 = 5;
pub const Z: u16 = 6;
pub const X: u16 = 7;
pub const C: u16 = 8;
pub const V: u16 = 9;
pub const B: u16 = 11;
pub const Q: u16 = 12;
pub const W: u16 = 13;
pub const E: u16 = 14;
pub const R: u16 = 15;
pub const Y: u16 = 16;
pub const T: u16 = 17;
pub const O: u16 = 31;
pub const U: u16 = 32;
pub const I: u16 = 34;
pub const P: u16 = 35;
pub const L: u16 = 37;
pub const J: u16 = 38;
pub const K: u16 = 40;
pub const N: u16 = 45;
pub const M: u16 = 46;

// Digits
pub const N1: u16 = 18;
pub const N2: u16 = 19;
pub const N3: u16 = 20;
pub const N4: u16 = 21;
pub const N5: u16 = 23;
pub const N6: u16 = 22;
pub const N7: u16 = 26;
pub const N8: u16 = 28;
pub const N9: u16 = 25;
pub const N0: u16 = 29;

// Punctuation
pub const LBRACKET: u16 = 33;
pub const RBRACKET: u16 = 30;
pub const BACKQUOTE: u16 = 50;
pub const MINUS: u16 = 27;
pub const EQUAL: u16 = 24;
pub const BACKSLASH: u16 = 42;
pub const SEMICOLON: u16 = 41;
pub const QUOTE: u16 = 39;
pub const COMMA: u16 = 43;
pub const DOT: u16 = 47;
pub const SLASH: u16 = 44;

// Whitespace and control
pub const RETURN: u16 = 36;
pub const TAB: u16 = 48;
pub const SPACE: u16 = 49;
pub const DELETE: u16 = 51;
pub const ENTER: u16 = 76;
pub const ESC: u16 = 53;
pub const FORWARD_DELETE: u16 = 117;

// Navigation
pub const LEFT: u16 = 123;
pub const RIGHT: u16 = 124;
pub const DOWN: u16 = 125;
pub const UP: u16 = 126;
pub const HOME: u16 = 115;
pub const END: u16 = 119;
pub const PAGE_UP: u16 = 116;
pub const PAGE_DOWN: u16 = 121;

// Modifiers (for the configurable restore/pause key feature)
pub const LEFT_SHIFT: u16 = 57;
pub const RIGHT_SHIFT: u16 = 60;
pub const LEFT_COMMAND: u16 = 55;
pub const RIGHT_COMMAND: u16 = 54;
pub const LEFT_CONTROL: u16 = 59;
pub const RIGHT_CONTROL: u16 = 62;
pub const LEFT_OPTION: u16 = 58;
pub const RIGHT_OPTION: u16 = 61;
pub const FUNCTION: u16 = 63;

/// Check if key is a letter (a-z)
pub fn is_letter(key: u16) -> bool {
    to_ascii(key, false)
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
}

/// Check if key is one of the six vowel letters
pub fn is_vowel(key: u16) -> bool {
    matches!(key, A | E | I | O | U | Y)
}

/// Check if key is a consonant letter
pub fn is_consonant(key: u16) -> bool {
    is_letter(key) && !is_vowel(key)
}

/// Check if key is a digit (0-9)
pub fn is_number(key: u16) -> bool {
    matches!(key, N0 | N1 | N2 | N3 | N4 | N5 | N6 | N7 | N8 | N9)
}

/// Arrow keys
pub fn is_arrow(key: u16) -> bool {
    matches!(key, LEFT | RIGHT | UP | DOWN)
}

/// Arrow keys plus home/end/page up/page down
pub fn is_navigation(key: u16) -> bool {
    is_arrow(key) || matches!(key, HOME | END | PAGE_UP | PAGE_DOWN)
}

/// Whitespace keys that always end the current word
pub fn is_whitespace(key: u16) -> bool {
    matches!(key, SPACE | TAB | RETURN | ENTER)
}

/// Modifier keys (shift, command, control, option, fn)
pub fn is_modifier(key: u16) -> bool {
    matches!(
        key,
        LEFT_SHIFT
            | RIGHT_SHIFT
            | LEFT_COMMAND
            | RIGHT_COMMAND
            | LEFT_CONTROL
            | RIGHT_CONTROL
            | LEFT_OPTION
            | RIGHT_OPTION
            | FUNCTION
    )
}

/// Punctuation that the validator treats as a sentence break.
///
/// `/` breaks unshifted (`?` shifted is also a break); `1`, `9`, `0`
/// break only when shifted into `!`, `(`, `)`.
pub fn is_sentence_punctuation(key: u16, shift: bool) -> bool {
    match key {
        DOT | COMMA | LBRACKET | RBRACKET | SLASH => true,
        N1 | N9 | N0 => shift,
        _ => false,
    }
}

/// Convert a key id to its ASCII character
pub fn to_ascii(key: u16, caps: bool) -> Option<char> {
    let ch = match key {
        A => 'a',
        B => 'b',
        C => 'c',
        D => 'd',
        E => 'e',
        F => 'f',
        G => 'g',
        H => 'h',
        I => 'i',
        J => 'j',
        K => 'k',
        L => 'l',
        M => 'm',
        N => 'n',
        O => 'o',
        P => 'p',
        Q => 'q',
        R => 'r',
        S => 's',
        T => 't',
        U => 'u',
        V => 'v',
        W => 'w',
        X => 'x',
        Y => 'y',
        Z => 'z',
        N0 => return Some('0'),
        N1 => return Some('1'),
        N2 => return Some('2'),
        N3 => return Some('3'),
        N4 => return Some('4'),
        N5 => return Some('5'),
        N6 => return Some('6'),
        N7 => return Some('7'),
        N8 => return Some('8'),
        N9 => return Some('9'),
        LBRACKET => return Some('['),
        RBRACKET => return Some(']'),
        BACKQUOTE => return Some('`'),
        MINUS => return Some('-'),
        EQUAL => return Some('='),
        BACKSLASH => return Some('\\'),
        SEMICOLON => return Some(';'),
        QUOTE => return Some('\''),
        COMMA => return Some(','),
        DOT => return Some('.'),
        SLASH => return Some('/'),
        SPACE => return Some(' '),
        TAB => return Some('\t'),
        RETURN | ENTER => return Some('\n'),
        _ => return None,
    };
    Some(if caps { ch.to_ascii_uppercase() } else { ch })
}

/// Convert an ASCII character to its key id
pub fn from_ascii(c: char) -> Option<u16> {
    let key = match c.to_ascii_lowercase() {
        'a' => A,
        'b' => B,
        'c' => C,
        'd' => D,
        'e' => E,
        'f' => F,
        'g' => G,
        'h' => H,
        'i' => I,
        'j' => J,
        'k' => K,
        'l' => L,
        'm' => M,
        'n' => N,
        'o' => O,
        'p' => P,
        'q' => Q,
        'r' => R,
        's' => S,
        't' => T,
        'u' => U,
        'v' => V,
        'w' => W,
        'x' => X,
        'y' => Y,
        'z' => Z,
        '0' => N0,
        '1' => N1,
        '2' => N2,
        '3' => N3,
        '4' => N4,
        '5' => N5,
        '6' => N6,
        '7' => N7,
        '8' => N8,
        '9' => N9,
        '[' => LBRACKET,
        ']' => RBRACKET,
        '`' => BACKQUOTE,
        '-' => MINUS,
        '=' => EQUAL,
        '\\' => BACKSLASH,
        ';' => SEMICOLON,
        '\'' => QUOTE,
        ',' => COMMA,
        '.' => DOT,
        '/' => SLASH,
        ' ' => SPACE,
        '\t' => TAB,
        '\n' => RETURN,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(is_letter(A));
        assert!(is_letter(Z));
        assert!(!is_letter(N1));
        assert!(is_vowel(A));
        assert!(is_vowel(Y));
        assert!(!is_vowel(B));
        assert!(is_consonant(B));
        assert!(!is_consonant(N3));
        assert!(is_number(N0));
        assert!(is_navigation(HOME));
        assert!(is_whitespace(TAB));
        assert!(is_modifier(LEFT_OPTION));
    }

    #[test]
    fn test_sentence_punctuation() {
        assert!(is_sentence_punctuation(DOT, false));
        assert!(is_sentence_punctuation(SLASH, false));
        assert!(is_sentence_punctuation(N9, true));
        assert!(!is_sentence_punctuation(N9, false));
        assert!(!is_sentence_punctuation(A, false));
    }

    #[test]
    fn test_ascii_roundtrip() {
        for c in "abcdefghijklmnopqrstuvwxyz0123456789[]`-=\\;',./ ".chars() {
            let key = from_ascii(c).unwrap();
            assert_eq!(to_ascii(key, false), Some(c), "roundtrip for {:?}", c);
        }
        assert_eq!(to_ascii(A, true), Some('A'));
        assert_eq!(to_ascii(N5, true), Some('5'));
    }
}

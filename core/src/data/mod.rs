//! Static language data - key ids, character composition, code tables

pub mod chars;
pub mod codetable;
pub mod keys;

pub use chars::{compose, compose_code, parse_char};
pub use codetable::CodeTable;
pub use keys::{is_letter, is_vowel};

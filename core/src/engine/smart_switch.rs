//! Per-application input state store
//!
//! Maps an application identifier to its remembered language + code
//! table so the host can restore them on app switch. Ordered map keeps
//! the serialized form stable; a one-entry cache short-circuits the
//! repeated lookups a focused app generates.

use std::collections::BTreeMap;

/// Returned when an app id was not present before the call.
pub const NOT_FOUND: i32 = -1;

const LANGUAGE_MASK: i32 = 0x01;
const CODE_TABLE_SHIFT: i32 = 1;

/// Encode language (bit 0) + code table (bits 1..) into the stored i8.
pub fn encode_input_state(language: i32, code_table: i32) -> i32 {
    (language & LANGUAGE_MASK) | (code_table << CODE_TABLE_SHIFT)
}

pub fn decode_language(state: i32) -> i32 {
    state & LANGUAGE_MASK
}

pub fn decode_code_table(state: i32) -> i32 {
    state >> CODE_TABLE_SHIFT
}

fn clamp_state(value: i32) -> i8 {
    value.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// The store. App ids longer than 255 bytes are not persisted.
#[derive(Default)]
pub struct SmartSwitchStore {
    data: BTreeMap<String, i8>,
    cache_key: String,
    cache_state: i8,
}

impl SmartSwitchStore {
    pub fn new() -> SmartSwitchStore {
        SmartSwitchStore::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Look up an app id. A missing id is inserted with `default_state`
    /// and reported as [`NOT_FOUND`] so the caller can decide whether a
    /// language change should propagate.
    pub fn get_or_insert(&mut self, app_id: &str, default_state: i32) -> i32 {
        if self.cache_key == app_id && !self.cache_key.is_empty() {
            return self.cache_state as i32;
        }

        if let Some(&state) = self.data.get(app_id) {
            self.cache_key = app_id.to_string();
            self.cache_state = state;
            return state as i32;
        }

        let state = clamp_state(default_state);
        self.cache_key = app_id.to_string();
        self.cache_state = state;
        self.data.insert(app_id.to_string(), state);
        NOT_FOUND
    }

    pub fn set(&mut self, app_id: &str, state: i32) {
        let state = clamp_state(state);
        self.data.insert(app_id.to_string(), state);
        self.cache_key = app_id.to_string();
        self.cache_state = state;
    }

    /// `[u16 count][u8 idLen, id bytes, i8 state]*`, little endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let eligible: Vec<(&String, &i8)> =
            self.data.iter().filter(|(id, _)| id.len() <= 255).collect();
        let count = eligible.len().min(u16::MAX as usize);

        let mut out = Vec::with_capacity(2 + count * 8);
        out.extend_from_slice(&(count as u16).to_le_bytes());
        for (id, &state) in eligible.into_iter().take(count) {
            out.push(id.len() as u8);
            out.extend_from_slice(id.as_bytes());
            out.push(state as u8);
        }
        out
    }

    /// Replace the store from serialized bytes. Truncated input keeps
    /// the entries parsed so far (matching the write-side contract).
    pub fn load_bytes(&mut self, data: &[u8]) {
        self.data.clear();
        self.cache_key.clear();
        self.cache_state = 0;

        if data.len() < 2 {
            return;
        }
        let count = u16::from_le_bytes([data[0], data[1]]) as usize;
        let mut cursor = 2usize;
        for _ in 0..count {
            let Some(&id_len) = data.get(cursor) else {
                break;
            };
            cursor += 1;
            let id_len = id_len as usize;
            let Some(id_bytes) = data.get(cursor..cursor + id_len) else {
                break;
            };
            cursor += id_len;
            let Some(&state) = data.get(cursor) else {
                break;
            };
            cursor += 1;

            if let Ok(id) = std::str::from_utf8(id_bytes) {
                self.data.insert(id.to_string(), state as i8);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let state = encode_input_state(1, 3);
        assert_eq!(decode_language(state), 1);
        assert_eq!(decode_code_table(state), 3);
        assert_eq!(decode_language(encode_input_state(0, 4)), 0);
    }

    #[test]
    fn test_get_or_insert() {
        let mut store = SmartSwitchStore::new();
        let default_state = encode_input_state(1, 0);

        // First sight: stored, reported missing
        assert_eq!(store.get_or_insert("com.apple.Safari", default_state), NOT_FOUND);
        // Second sight: the stored default comes back
        assert_eq!(
            store.get_or_insert("com.apple.Safari", 0),
            default_state
        );
    }

    #[test]
    fn test_cache_hits_after_set(){
        let mut store = SmartSwitchStore::new();
        store.set("org.mozilla.firefox", encode_input_state(0, 2));
        assert_eq!(
            store.get_or_insert("org.mozilla.firefox", 0),
            encode_input_state(0, 2)
        );
        // Same id again (cache path)
        assert_eq!(
            store.get_or_insert("org.mozilla.firefox", 0),
            encode_input_state(0, 2)
        );
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut store = SmartSwitchStore::new();
        store.set("com.apple.Terminal", encode_input_state(0, 0));
        store.set("com.microsoft.Word", encode_input_state(1, 2));
        store.set("vn.app.unikey", -5);

        let bytes = store.to_bytes();
        let mut restored = SmartSwitchStore::new();
        restored.load_bytes(&bytes);
        assert_eq!(restored.len(), 3);
        assert_eq!(
            restored.get_or_insert("com.microsoft.Word", 0),
            encode_input_state(1, 2)
        );
        assert_eq!(restored.get_or_insert("vn.app.unikey", 0), -5);
    }

    #[test]
    fn test_truncated_load() {
        let mut store = SmartSwitchStore::new();
        store.set("a", 1);
        store.set("b", 2);
        let mut bytes = store.to_bytes();
        bytes.truncate(bytes.len() - 1);

        let mut restored = SmartSwitchStore::new();
        restored.load_bytes(&bytes);
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn test_oversized_id_not_persisted() {
        let mut store = SmartSwitchStore::new();
        let long_id = "x".repeat(300);
        store.set(&long_id, 1);
        store.set("ok", 2);

        let bytes = store.to_bytes();
        let mut restored = SmartSwitchStore::new();
        restored.load_bytes(&bytes);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.get_or_insert("ok", 0), 2);
    }
}

//! PHT2 binary trie
//!
//! Prebuilt dictionary format, memory-mapped for O(1) load and O(k)
//! lookup. Layout:
//!
//! ```text
//! 0..4   magic "PHT2"
//! 4      version (1)
//! 5..9   root node offset, u32 LE
//! 9..    node records
//! ```
//!
//! Node record: `[flags u8][child_count u8][child_count × (letter u8,
//! offset u32 LE)]`. Flag bit 0 marks a complete word. Child letters are
//! sorted; lookups accept `a-z` and `0-9` (digits never occur in shipped
//! dictionaries, so they simply miss).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;

use super::DictError;

pub const MAGIC: &[u8; 4] = b"PHT2";
pub const VERSION: u8 = 1;

const FLAG_TERMINAL: u8 = 0x01;
const HEADER_LEN: usize = 9;

/// Read-only memory-mapped trie.
pub struct Trie {
    map: Mmap,
    root: usize,
    word_count: usize,
}

impl Trie {
    /// Map a trie file. The header is validated before anything else is
    /// touched; failures leave no partial state behind.
    pub fn open(path: &Path) -> Result<Trie, DictError> {
        let file = File::open(path).map_err(|e| DictError::Io(path.display().to_string(), e))?;
        // Safety: the mapping is read-only and private to this process.
        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| DictError::Io(path.display().to_string(), e))?;

        if map.len() < HEADER_LEN || &map[0..4] != MAGIC {
            return Err(DictError::BadMagic);
        }
        if map[4] != VERSION {
            return Err(DictError::BadVersion(map[4]));
        }
        let root = u32::from_le_bytes([map[5], map[6], map[7], map[8]]) as usize;
        if root < HEADER_LEN || root >= map.len() {
            return Err(DictError::Truncated);
        }

        let mut trie = Trie {
            map,
            root,
            word_count: 0,
        };
        trie.word_count = trie.count_words(trie.root, 0).ok_or(DictError::Truncated)?;
        Ok(trie)
    }

    /// Number of words stored.
    pub fn len(&self) -> usize {
        self.word_count
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// Character-indexed descent; `word` must already be lowercase ASCII.
    pub fn contains(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        let mut node = self.root;
        for b in word.bytes() {
            if !(b.is_ascii_lowercase() || b.is_ascii_digit()) {
                return false;
            }
            match self.child(node, b) {
                Some(next) => node = next,
                None => return false,
            }
        }
        self.flags(node)
            .map(|f| f & FLAG_TERMINAL != 0)
            .unwrap_or(false)
    }

    fn flags(&self, node: usize) -> Option<u8> {
        self.map.get(node).copied()
    }

    fn child(&self, node: usize, letter: u8) -> Option<usize> {
        let count = *self.map.get(node + 1)? as usize;
        let table = node + 2;
        for i in 0..count {
            let entry = table + i * 5;
            let l = *self.map.get(entry)?;
            if l == letter {
                let bytes = self.map.get(entry + 1..entry + 5)?;
                let off = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
                if off < HEADER_LEN || off >= self.map.len() {
                    return None;
                }
                return Some(off);
            }
            if l > letter {
                return None; // children are sorted
            }
        }
        None
    }

    fn count_words(&self, node: usize, depth: usize) -> Option<usize> {
        if depth > 64 {
            return None; // corrupt cycle guard
        }
        let mut total = usize::from(self.flags(node)? & FLAG_TERMINAL != 0);
        let count = *self.map.get(node + 1)? as usize;
        let table = node + 2;
        for i in 0..count {
            let entry = table + i * 5;
            let bytes = self.map.get(entry + 1..entry + 5)?;
            let off = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
            if off < HEADER_LEN || off >= self.map.len() {
                return None;
            }
            total += self.count_words(off, depth + 1)?;
        }
        Some(total)
    }
}

/// In-memory trie builder; used by tooling and tests to produce the
/// PHT2 files the engine maps.
#[derive(Default)]
pub struct TrieBuilder {
    root: BuildNode,
}

#[derive(Default)]
struct BuildNode {
    terminal: bool,
    children: BTreeMap<u8, BuildNode>,
}

impl TrieBuilder {
    pub fn new() -> TrieBuilder {
        TrieBuilder::default()
    }

    /// Insert a word; uppercase is folded, non-ASCII-letter words skipped.
    pub fn insert(&mut self, word: &str) {
        let lower = word.trim().to_ascii_lowercase();
        if lower.is_empty() || !lower.bytes().all(|b| b.is_ascii_lowercase()) {
            return;
        }
        let mut node = &mut self.root;
        for b in lower.bytes() {
            node = node.children.entry(b).or_default();
        }
        node.terminal = true;
    }

    /// Serialize to the PHT2 wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&[0, 0, 0, 0]); // root offset backpatched

        let root = Self::write_node(&self.root, &mut out);
        out[5..9].copy_from_slice(&root.to_le_bytes());
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<(), DictError> {
        let bytes = self.to_bytes();
        let mut file =
            File::create(path).map_err(|e| DictError::Io(path.display().to_string(), e))?;
        file.write_all(&bytes)
            .map_err(|e| DictError::Io(path.display().to_string(), e))?;
        Ok(())
    }

    // Children first, then the node record referring to them.
    fn write_node(node: &BuildNode, out: &mut Vec<u8>) -> u32 {
        let mut offsets = Vec::with_capacity(node.children.len());
        for (&letter, child) in &node.children {
            offsets.push((letter, Self::write_node(child, out)));
        }

        let offset = out.len() as u32;
        out.push(if node.terminal { FLAG_TERMINAL } else { 0 });
        out.push(offsets.len() as u8);
        for (letter, child_offset) in offsets {
            out.push(letter);
            out.extend_from_slice(&child_offset.to_le_bytes());
        }
        offset
    }
}

//! Typo correction for kana keys.
//!
//! Recovers from a few narrow classes of romaji-input mistakes that leave
//! a well-formed but unlikely kana string behind. Each corrected key keeps
//! an alignment back to the original key so that lattice nodes found
//! through it can be attributed to original spans.

use tracing::debug;

use crate::unicode::{is_small_glide, takes_glide, to_large_kana};

/// A corrected key with its byte alignment to the original key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectedKey {
    /// The corrected key.
    pub key: String,
    /// `alignment[q]` is the original byte offset for corrected offset `q`
    /// (length `key.len() + 1`). Offsets inside a rewritten chunk map to
    /// the chunk's start.
    alignment: Vec<usize>,
    /// Byte ranges of `key` produced by a rewrite.
    changed: Vec<(usize, usize)>,
}

impl CorrectedKey {
    /// The original key, unchanged, with the identity map.
    pub fn identity(key: &str) -> Self {
        Self {
            key: key.to_string(),
            alignment: (0..=key.len()).collect(),
            changed: Vec::new(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.changed.is_empty()
    }

    /// Original byte offset covering corrected offset `pos`.
    pub fn original_offset(&self, pos: usize) -> Option<usize> {
        self.alignment.get(pos).copied()
    }

    /// Original byte range covering the corrected range `[begin, end)`.
    ///
    /// Returns `None` when the range is empty after mapping (it lies
    /// entirely inside one rewritten chunk) or out of bounds.
    pub fn original_range(&self, begin: usize, end: usize) -> Option<(usize, usize)> {
        let b = self.original_offset(begin)?;
        let e = self.original_offset(end)?;
        (b < e).then_some((b, e))
    }

    /// Whether the corrected range `[begin, end)` touches a rewrite.
    pub fn overlaps_change(&self, begin: usize, end: usize) -> bool {
        self.changed.iter().any(|&(cb, ce)| begin < ce && cb < end)
    }

    pub fn changed_ranges(&self) -> &[(usize, usize)] {
        &self.changed
    }
}

/// Incrementally builds a corrected key and its alignment.
struct Rewriter<'a> {
    original: &'a str,
    key: String,
    alignment: Vec<usize>,
    changed: Vec<(usize, usize)>,
}

impl<'a> Rewriter<'a> {
    fn new(original: &'a str) -> Self {
        Self {
            original,
            key: String::with_capacity(original.len()),
            alignment: Vec::with_capacity(original.len() + 1),
            changed: Vec::new(),
        }
    }

    /// Copy `s` (starting at original offset `orig`) verbatim.
    fn keep(&mut self, orig: usize, s: &str) {
        for i in 0..s.len() {
            self.alignment.push(orig + i);
        }
        self.key.push_str(s);
    }

    /// Replace the original chunk starting at `orig` with `s`.
    fn replace(&mut self, orig: usize, s: &str) {
        let start = self.key.len();
        for _ in 0..s.len() {
            self.alignment.push(orig);
        }
        self.key.push_str(s);
        self.changed.push((start, self.key.len()));
    }

    fn finish(mut self) -> CorrectedKey {
        self.alignment.push(self.original.len());
        CorrectedKey {
            key: self.key,
            alignment: self.alignment,
            changed: self.changed,
        }
    }
}

/// Rewrites keys with common kana-input typos.
#[derive(Debug, Clone)]
pub struct KeyCorrector {
    enabled: bool,
    max_key_len: usize,
}

impl Default for KeyCorrector {
    fn default() -> Self {
        Self {
            enabled: true,
            max_key_len: 64,
        }
    }
}

impl KeyCorrector {
    pub fn new(enabled: bool, max_key_len: usize) -> Self {
        Self {
            enabled,
            max_key_len,
        }
    }

    /// Produce corrected keys for `key`.
    ///
    /// Returns the original key with the identity map when no rule applies,
    /// the corrector is disabled, or the key is longer than `max_key_len`
    /// characters.
    pub fn correct(&self, key: &str) -> Vec<CorrectedKey> {
        if !self.enabled || key.is_empty() || key.chars().count() > self.max_key_len {
            return vec![CorrectedKey::identity(key)];
        }
        let corrected = rewrite(key);
        if corrected.is_identity() {
            return vec![CorrectedKey::identity(key)];
        }
        debug!(original = key, corrected = corrected.key.as_str(), "key corrected");
        vec![corrected]
    }
}

/// Apply every rule in a single left-to-right pass.
fn rewrite(key: &str) -> CorrectedKey {
    let chars: Vec<(usize, char)> = key.char_indices().collect();
    let mut rw = Rewriter::new(key);
    let mut i = 0;
    while i < chars.len() {
        let (off, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, n)| n);
        let after = chars.get(i + 2).map(|&(_, n)| n);

        // っっ → っ (sokuon typed twice, e.g. "tttu")
        if c == 'っ' && next == Some('っ') {
            rw.replace(off, "っ");
            i += 2;
            continue;
        }

        // んん + kana outside the な row → ん + kana ("nnn" for "nn")
        if c == 'ん' && next == Some('ん') {
            if let Some(a) = after {
                if is_plain_kana(a) && !is_na_row(a) {
                    rw.replace(off, "ん");
                    i += 2;
                    continue;
                }
            }
        }

        // ん + vowel → ん + な row ("minna" read as "mi nn a")
        if c == 'ん' {
            if let Some(n) = next.and_then(na_row_for_vowel) {
                rw.keep(off, "ん");
                let (noff, _) = chars[i + 1];
                let mut buf = [0u8; 4];
                rw.replace(noff, n.encode_utf8(&mut buf));
                i += 2;
                continue;
            }
        }

        // small ya/yu/yo after a kana that cannot take a glide → large
        if is_small_glide(c) {
            let prev = i.checked_sub(1).map(|p| chars[p].1);
            if !prev.is_some_and(takes_glide) {
                let mut buf = [0u8; 4];
                rw.replace(off, to_large_kana(c).encode_utf8(&mut buf));
                i += 1;
                continue;
            }
        }

        rw.keep(off, &key[off..off + c.len_utf8()]);
        i += 1;
    }
    rw.finish()
}

fn na_row_for_vowel(c: char) -> Option<char> {
    match c {
        'あ' => Some('な'),
        'い' => Some('に'),
        'う' => Some('ぬ'),
        'え' => Some('ね'),
        'お' => Some('の'),
        _ => None,
    }
}

fn is_na_row(c: char) -> bool {
    matches!(c, 'な' | 'に' | 'ぬ' | 'ね' | 'の')
}

fn is_plain_kana(c: char) -> bool {
    ('\u{3041}'..='\u{3096}').contains(&c) && c != 'ん'
}

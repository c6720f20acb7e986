// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Germ inclusion masks and the per-run score cache.

use std::collections::HashMap;
use std::fmt;

const WORD_BITS: usize = 64;

/// Fixed-width bit set marking which candidate germs are included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GermMask {
    words: Vec<u64>,
    len: usize,
}

impl GermMask {
    /// All bits clear.
    pub fn empty(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// All bits set.
    pub fn full(len: usize) -> Self {
        let mut mask = Self::empty(len);
        for i in 0..len {
            mask.set(i, true);
        }
        mask
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        let mut mask = Self::empty(bits.len());
        for (i, &bit) in bits.iter().enumerate() {
            mask.set(i, bit);
        }
        mask
    }

    /// Number of candidates covered by the mask.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether bit `i` is set. Out-of-range bits read as unset.
    pub fn get(&self, i: usize) -> bool {
        i < self.len && self.words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0
    }

    /// Set or clear bit `i`. Out-of-range indices are ignored.
    pub fn set(&mut self, i: usize, value: bool) {
        if i >= self.len {
            return;
        }
        let bit = 1u64 << (i % WORD_BITS);
        if value {
            self.words[i / WORD_BITS] |= bit;
        } else {
            self.words[i / WORD_BITS] &= !bit;
        }
    }

    /// Copy with bit `i` flipped.
    pub fn toggled(&self, i: usize) -> Self {
        let mut next = self.clone();
        next.set(i, !self.get(i));
        next
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether all of the first `k` bits are set.
    pub fn has_prefix(&self, k: usize) -> bool {
        (0..k).all(|i| self.get(i))
    }

    /// Indices of set bits, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }

    /// The `len` single-bit flips of this mask, in index order.
    pub fn neighbors(&self) -> impl Iterator<Item = GermMask> + '_ {
        (0..self.len).map(move |i| self.toggled(i))
    }

    /// The mask as 0/1 weights.
    pub fn to_weights(&self) -> Vec<f64> {
        (0..self.len)
            .map(|i| if self.get(i) { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}

impl fmt::Display for GermMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            write!(f, "{}", if self.get(i) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

/// Scores computed during one optimization run, keyed by model index and mask.
///
/// Entries are write-once: inserting an existing key keeps the first value.
#[derive(Debug, Clone, Default)]
pub struct ScoreCache {
    entries: HashMap<(usize, GermMask), f64>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, model_index: usize, mask: &GermMask) -> Option<f64> {
        // HashMap<(usize, GermMask), _> can't be queried by borrowed parts.
        self.entries.get(&(model_index, mask.clone())).copied()
    }

    /// Insert a score unless one is already cached; returns the cached value.
    pub fn insert(&mut self, model_index: usize, mask: GermMask, score: f64) -> f64 {
        *self.entries.entry((model_index, mask)).or_insert(score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(usize, GermMask), &f64)> {
        self.entries.iter()
    }
}

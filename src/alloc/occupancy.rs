//! `OccupancyMap` - a fixed-length bitmap with first-fit run search.
//!
//! Bits are packed into `u64` words. The search helpers skip whole words at a
//! time (fully occupied words when looking for a free bit, empty words when
//! looking for an occupied one), so a scan over a mostly full or mostly empty
//! chunk touches one word per 64 slots.
//!
//! Bits past `len` in the last word are always zero and are never reported.

const BIT_SHIFT: usize = 6;
const BIT_MASK: usize = 63;
const WORD_BITS: usize = 64;

/// A fixed-length bit sequence. Bit `i` set means slot `i` is taken.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OccupancyMap {
    words: Box<[u64]>,
    len: usize,
}

/// Mask selecting bits `[lo, hi)` of a word. Requires `lo < hi <= 64`.
#[inline]
fn span_mask(lo: usize, hi: usize) -> u64 {
    let upper = if hi == WORD_BITS {
        u64::MAX
    } else {
        (1u64 << hi) - 1
    };
    upper & !((1u64 << lo) - 1)
}

/// Yields `(word_index, mask)` pairs covering bits `[start, end)`.
fn word_spans(start: usize, end: usize) -> impl Iterator<Item = (usize, u64)> {
    let (first, last) = if start < end {
        (start >> BIT_SHIFT, (end - 1) >> BIT_SHIFT)
    } else {
        (1, 0)
    };
    (first..=last).map(move |w| {
        let lo = if w == first { start & BIT_MASK } else { 0 };
        let hi = if w == last {
            ((end - 1) & BIT_MASK) + 1
        } else {
            WORD_BITS
        };
        (w, span_mask(lo, hi))
    })
}

impl OccupancyMap {
    /// Creates a map of `len` clear bits.
    pub fn new(len: usize) -> Self {
        let words = (len + BIT_MASK) >> BIT_SHIFT;
        Self {
            words: vec![0; words].into_boxed_slice(),
            len,
        }
    }

    /// Creates a map of `len` clear bits, returning `None` if the word storage
    /// cannot be allocated.
    pub fn try_new(len: usize) -> Option<Self> {
        let words = (len + BIT_MASK) >> BIT_SHIFT;
        let mut storage = Vec::new();
        storage.try_reserve_exact(words).ok()?;
        storage.resize(words, 0);
        Some(Self {
            words: storage.into_boxed_slice(),
            len,
        })
    }

    /// Number of bits in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map holds no bits at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the bit at `index`. Out-of-range indices read as clear.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.words[index >> BIT_SHIFT] & (1 << (index & BIT_MASK)) != 0
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    #[inline]
    pub fn set(&mut self, index: usize) {
        assert!(index < self.len, "bit {index} out of range for map of {}", self.len);
        self.words[index >> BIT_SHIFT] |= 1 << (index & BIT_MASK);
    }

    /// Clears the bit at `index`.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    #[inline]
    pub fn clear(&mut self, index: usize) {
        assert!(index < self.len, "bit {index} out of range for map of {}", self.len);
        self.words[index >> BIT_SHIFT] &= !(1 << (index & BIT_MASK));
    }

    /// Sets every bit in `[start, end)`.
    ///
    /// # Panics
    /// Panics if `end > len`.
    pub fn set_range(&mut self, start: usize, end: usize) {
        assert!(end <= self.len, "range end {end} out of range for map of {}", self.len);
        for (w, mask) in word_spans(start, end) {
            self.words[w] |= mask;
        }
    }

    /// Clears every bit in `[start, end)`.
    ///
    /// # Panics
    /// Panics if `end > len`.
    pub fn clear_range(&mut self, start: usize, end: usize) {
        assert!(end <= self.len, "range end {end} out of range for map of {}", self.len);
        for (w, mask) in word_spans(start, end) {
            self.words[w] &= !mask;
        }
    }

    /// Clears the whole map.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Returns `true` if every bit in `[start, end)` is set.
    /// Ranges reaching past `len` are never fully set.
    pub fn is_range_set(&self, start: usize, end: usize) -> bool {
        end <= self.len && word_spans(start, end).all(|(w, mask)| self.words[w] & mask == mask)
    }

    /// Returns `true` if no bit in `[start, end)` is set.
    /// Bits past `len` count as clear.
    pub fn is_range_clear(&self, start: usize, end: usize) -> bool {
        let end = end.min(self.len);
        word_spans(start, end).all(|(w, mask)| self.words[w] & mask == 0)
    }

    /// Number of set bits in `[start, end)`.
    pub fn count_range(&self, start: usize, end: usize) -> usize {
        let end = end.min(self.len);
        word_spans(start, end)
            .map(|(w, mask)| (self.words[w] & mask).count_ones() as usize)
            .sum()
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            core::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some((w << BIT_SHIFT) + bit)
            })
        })
    }

    /// Index of the first clear bit at or after `from`.
    pub fn find_first_clear(&self, from: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }
        let first = from >> BIT_SHIFT;
        for w in first..self.words.len() {
            let mut free = !self.words[w];
            if w == first {
                free &= span_mask(from & BIT_MASK, WORD_BITS);
            }
            if free != 0 {
                let index = (w << BIT_SHIFT) + free.trailing_zeros() as usize;
                return (index < self.len).then_some(index);
            }
        }
        None
    }

    /// Index of the first set bit in `[from, end)`.
    pub fn find_first_set(&self, from: usize, end: usize) -> Option<usize> {
        let end = end.min(self.len);
        word_spans(from, end).find_map(|(w, mask)| {
            let taken = self.words[w] & mask;
            (taken != 0).then(|| (w << BIT_SHIFT) + taken.trailing_zeros() as usize)
        })
    }

    /// Leftmost position `i` such that bits `[i, i + n)` are all clear.
    ///
    /// First-fit on run length: the scan jumps to the first clear bit, checks
    /// whether the next `n` bits stay clear, and on hitting an occupied bit
    /// resumes from the first clear bit after it. `n == 0` matches at 0.
    pub fn find_clear_run(&self, n: usize) -> Option<usize> {
        if n == 0 {
            return Some(0);
        }
        let mut start = self.find_first_clear(0)?;
        loop {
            let end = start.checked_add(n)?;
            if end > self.len {
                return None;
            }
            match self.find_first_set(start, end) {
                None => return Some(start),
                Some(blocker) => start = self.find_first_clear(blocker + 1)?,
            }
        }
    }
}

impl core::fmt::Debug for OccupancyMap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let bits: String = (0..self.len)
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect();
        f.debug_struct("OccupancyMap")
            .field("len", &self.len)
            .field("bits", &bits)
            .finish()
    }
}

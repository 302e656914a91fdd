#![forbid(unsafe_code)]

/// A compact bit vector used for validity, boolean storage and selection masks.
///
/// Bits are stored little-endian within each `u64` word:
/// - bit 0 is the LSB of word 0
/// - bit 63 is the MSB of word 0
///
/// Bits past `len` are always zero, so derived equality compares contents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

impl BitVec {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            len: 0,
            ones: 0,
        }
    }

    pub fn with_capacity_bits(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(64)),
            len: 0,
            ones: 0,
        }
    }

    pub fn with_len_all_false(bits: usize) -> Self {
        Self {
            words: vec![0u64; bits.div_ceil(64)],
            len: bits,
            ones: 0,
        }
    }

    pub fn from_bools(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut out = Self::new();
        for bit in bits {
            out.push(bit);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, value: bool) {
        let bit = self.len % 64;
        if bit == 0 {
            self.words.push(0);
        }

        if value {
            let word = self.len / 64;
            self.words[word] |= 1u64 << bit;
            self.ones += 1;
        }

        self.len += 1;
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word = self.words[index / 64];
        ((word >> (index % 64)) & 1) == 1
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    pub fn all_true(&self) -> bool {
        self.ones == self.len
    }

    /// Append every bit of `other` after the current bits.
    ///
    /// Used to stitch per-partition selection masks back together in partition order.
    pub fn extend_from(&mut self, other: &BitVec) {
        if self.len % 64 == 0 {
            self.words.extend_from_slice(&other.words);
            self.len += other.len;
            self.ones += other.ones;
            return;
        }
        for idx in 0..other.len {
            self.push(other.get(idx));
        }
    }

    /// Indices of set bits in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(word_idx * 64 + bit)
            })
        })
    }
}

impl Default for BitVec {
    fn default() -> Self {
        Self::new()
    }
}

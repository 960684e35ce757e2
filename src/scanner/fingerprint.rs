//! Fixed-width perceptual fingerprints and the Hamming distance between them.
//!
//! # Bit Layout
//!
//! A [`Fingerprint`] is an unsigned integer of `bits` width. Hash bits are
//! pushed most-significant first, so the first bit produced by a hasher is the
//! highest bit of the value. The value is stored as big-endian `u64` words and
//! is right-aligned: any unused high bits of the first word are zero.
//!
//! # Hex Encoding
//!
//! The textual form is exactly `ceil(bits / 4)` lowercase hex digits, zero
//! padded. Decoding needs the width back since a width that is not a multiple
//! of four cannot be inferred from the digit count.
//!
//! ```
//! use imgdupe::scanner::fingerprint::{distance, Fingerprint};
//!
//! let a = Fingerprint::from_hex("ff00ff00ff00ff00", 64).unwrap();
//! let b = Fingerprint::from_hex("ff00ff00ff00ff01", 64).unwrap();
//!
//! assert_eq!(distance(&a, &b).unwrap(), 1);
//! assert_eq!(a.to_hex(), "ff00ff00ff00ff00");
//! ```

use serde::{Serialize, Serializer};
use thiserror::Error;

const WORD_BITS: u32 = 64;

/// Errors produced when decoding or comparing fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    /// Two fingerprints of different widths were compared.
    #[error("fingerprint width mismatch: {left} bits vs {right} bits")]
    WidthMismatch {
        /// Width of the left operand
        left: u32,
        /// Width of the right operand
        right: u32,
    },

    /// The hex string has the wrong length or contains a non-hex digit.
    #[error("invalid hex fingerprint '{hex}' for {bits} bits")]
    InvalidHex {
        /// The rejected input
        hex: String,
        /// The expected width
        bits: u32,
    },

    /// The hex value sets bits above the declared width.
    #[error("hex fingerprint '{hex}' does not fit in {bits} bits")]
    Overflow {
        /// The rejected input
        hex: String,
        /// The expected width
        bits: u32,
    },

    /// A zero-width fingerprint was requested.
    #[error("fingerprint width must be at least 1 bit")]
    ZeroWidth,
}

/// A fixed-width perceptual fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bits: u32,
    words: Vec<u64>,
}

impl Fingerprint {
    /// Build a fingerprint of `bits` width with every bit cleared.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is zero; a zero-width fingerprint has no hex form
    /// that [`from_hex`](Self::from_hex) accepts.
    #[must_use]
    pub fn zeroed(bits: u32) -> Self {
        assert!(bits > 0, "fingerprint width must be at least 1 bit");
        Self {
            bits,
            words: vec![0; word_count(bits)],
        }
    }

    /// Pack a stream of bits, first bit most significant.
    ///
    /// The width is the number of bits yielded by the iterator.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is empty.
    ///
    /// ```
    /// use imgdupe::scanner::fingerprint::Fingerprint;
    ///
    /// let fp = Fingerprint::from_bits([true, false, true, true]);
    /// assert_eq!(fp.bits(), 4);
    /// assert_eq!(fp.to_hex(), "b");
    /// ```
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let stream: Vec<bool> = bits.into_iter().collect();
        let mut fp = Self::zeroed(stream.len() as u32);
        for (k, bit) in stream.into_iter().enumerate() {
            if bit {
                fp.set(k as u32);
            }
        }
        fp
    }

    /// Wrap a 64-bit value as a 64-bit fingerprint.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self {
            bits: WORD_BITS,
            words: vec![value],
        }
    }

    /// Width in bits.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Read bit `k` of the stream (0 is the most significant bit).
    ///
    /// # Panics
    ///
    /// Panics if `k >= self.bits()`.
    #[must_use]
    pub fn bit(&self, k: u32) -> bool {
        let (word, mask) = self.locate(k);
        self.words[word] & mask != 0
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// The value as a `u64`, if the width fits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        if self.bits <= WORD_BITS {
            self.words.first().copied()
        } else {
            None
        }
    }

    /// Hamming distance to another fingerprint of the same width.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::WidthMismatch`] if the widths differ.
    pub fn distance(&self, other: &Self) -> Result<u32, FingerprintError> {
        distance(self, other)
    }

    /// Lowercase hex, `ceil(bits / 4)` digits.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let digits = hex_digits(self.bits);
        let full: String = self.words.iter().map(|w| format!("{w:016x}")).collect();
        full[full.len() - digits..].to_string()
    }

    /// Decode a hex fingerprint of the given width.
    ///
    /// # Errors
    ///
    /// - [`FingerprintError::ZeroWidth`] if `bits` is zero
    /// - [`FingerprintError::InvalidHex`] on a wrong digit count or non-hex digit
    /// - [`FingerprintError::Overflow`] if bits above the width are set
    pub fn from_hex(hex: &str, bits: u32) -> Result<Self, FingerprintError> {
        if bits == 0 {
            return Err(FingerprintError::ZeroWidth);
        }
        let hex = hex.trim();
        let invalid = || FingerprintError::InvalidHex {
            hex: hex.to_string(),
            bits,
        };
        if hex.len() != hex_digits(bits) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let count = word_count(bits);
        let padded = format!("{hex:0>width$}", width = count * 16);
        let mut words = Vec::with_capacity(count);
        for chunk in padded.as_bytes().chunks(16) {
            let chunk = std::str::from_utf8(chunk).map_err(|_| invalid())?;
            words.push(u64::from_str_radix(chunk, 16).map_err(|_| invalid())?);
        }

        let unused = count as u32 * WORD_BITS - bits;
        if unused > 0 && words[0] >> (WORD_BITS - unused) != 0 {
            return Err(FingerprintError::Overflow {
                hex: hex.to_string(),
                bits,
            });
        }

        Ok(Self { bits, words })
    }

    fn set(&mut self, k: u32) {
        let (word, mask) = self.locate(k);
        self.words[word] |= mask;
    }

    fn locate(&self, k: u32) -> (usize, u64) {
        assert!(k < self.bits, "bit {k} out of range for {} bits", self.bits);
        // Stream bit k is integer bit (bits - 1 - k), counted from the last word.
        let position = self.bits - 1 - k;
        let word = self.words.len() - 1 - (position / WORD_BITS) as usize;
        (word, 1u64 << (position % WORD_BITS))
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Hamming distance between two fingerprints of equal width.
///
/// # Errors
///
/// Returns [`FingerprintError::WidthMismatch`] if the widths differ.
pub fn distance(a: &Fingerprint, b: &Fingerprint) -> Result<u32, FingerprintError> {
    if a.bits != b.bits {
        return Err(FingerprintError::WidthMismatch {
            left: a.bits,
            right: b.bits,
        });
    }
    Ok(a.words
        .iter()
        .zip(&b.words)
        .map(|(x, y)| (x ^ y).count_ones())
        .sum())
}

fn word_count(bits: u32) -> usize {
    bits.div_ceil(WORD_BITS).max(1) as usize
}

fn hex_digits(bits: u32) -> usize {
    bits.div_ceil(4).max(1) as usize
}

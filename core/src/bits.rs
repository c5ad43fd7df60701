use crate::error::{ModemError, Result};
use std::fmt;
use std::str::FromStr;

/// Ordered bit sequence used between the framer, the modem and the parser.
///
/// Multi-bit fields are always read and written MSB first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitStream {
    bits: Vec<bool>,
}

impl BitStream {
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: Vec::with_capacity(capacity),
        }
    }

    /// Expand bytes into bits, MSB first per byte
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut stream = Self::with_capacity(bytes.len() * 8);
        stream.push_bytes(bytes);
        stream
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    pub fn push(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Append the low `width` bits of `value`, MSB first
    pub fn push_bits(&mut self, value: usize, width: usize) {
        for shift in (0..width).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push_bits(byte as usize, 8);
        }
    }

    pub fn extend_from(&mut self, other: &BitStream) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Read a `width`-bit field starting at `pos`. None if it runs past the end.
    pub fn read_bits(&self, pos: usize, width: usize) -> Option<usize> {
        let end = pos.checked_add(width)?;
        if end > self.bits.len() {
            return None;
        }
        Some(
            self.bits[pos..end]
                .iter()
                .fold(0usize, |acc, &bit| (acc << 1) | bit as usize),
        )
    }

    /// Read `count` whole bytes starting at bit `pos` (no byte alignment required)
    pub fn read_bytes(&self, pos: usize, count: usize) -> Option<Vec<u8>> {
        let end = pos.checked_add(count.checked_mul(8)?)?;
        if end > self.bits.len() {
            return None;
        }
        Some(
            self.bits[pos..end]
                .chunks(8)
                .map(|byte| byte.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
                .collect(),
        )
    }

    /// Copy of bits in `start..end`, clamped to the stream length
    pub fn slice(&self, start: usize, end: usize) -> BitStream {
        let end = end.min(self.bits.len());
        let start = start.min(end);
        Self {
            bits: self.bits[start..end].to_vec(),
        }
    }

    /// First position at or after `from` where `pattern` occurs contiguously
    pub fn find(&self, pattern: &BitStream, from: usize) -> Option<usize> {
        if pattern.is_empty() || from >= self.bits.len() {
            return None;
        }
        self.bits[from..]
            .windows(pattern.len())
            .position(|window| window == pattern.as_slice())
            .map(|offset| from + offset)
    }

    /// Append zero bits until the length is a multiple of `k`
    pub fn pad_to_multiple(&mut self, k: usize) {
        if k == 0 {
            return;
        }
        let remainder = self.bits.len() % k;
        if remainder != 0 {
            self.bits.resize(self.bits.len() + (k - remainder), false);
        }
    }

    /// Drop trailing bits until the length is a multiple of `k`
    pub fn truncate_to_multiple(&mut self, k: usize) {
        if k == 0 {
            return;
        }
        let keep = self.bits.len() - self.bits.len() % k;
        self.bits.truncate(keep);
    }

    /// Split into `k`-bit values. A short final chunk is right-padded with zeros.
    pub fn symbols(&self, k: usize) -> Vec<usize> {
        if k == 0 {
            return Vec::new();
        }
        self.bits
            .chunks(k)
            .map(|chunk| {
                let value = chunk.iter().fold(0usize, |acc, &bit| (acc << 1) | bit as usize);
                value << (k - chunk.len())
            })
            .collect()
    }

    /// Pack into bytes, dropping a trailing partial byte
    pub fn to_bytes(&self) -> Vec<u8> {
        self.read_bytes(0, self.bits.len() / 8).unwrap_or_default()
    }
}

impl FromIterator<bool> for BitStream {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for BitStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for BitStream {
    type Err = ModemError;

    fn from_str(s: &str) -> Result<Self> {
        s.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(ModemError::InvalidBitString(other)),
            })
            .collect()
    }
}

use crate::bits::BitStream;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};

/// Symbol pattern that marks packet boundaries in the bitstream.
///
/// On air the marker symbols are sent `repeat` times back to back; that
/// whole run is one sync block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMarker {
    symbols: Vec<usize>,
    repeat: usize,
    bits_per_symbol: usize,
}

impl SyncMarker {
    pub fn new(symbols: Vec<usize>, repeat: usize, bits_per_symbol: usize) -> Self {
        Self {
            symbols,
            repeat,
            bits_per_symbol,
        }
    }

    pub fn from_config(config: &ModemConfig) -> Self {
        Self::new(
            config.sync_marker.clone(),
            config.sync_repeat,
            config.bits_per_symbol,
        )
    }

    /// Marker symbols repeated `repeat` times
    pub fn block_symbols(&self) -> Vec<usize> {
        self.symbols.repeat(self.repeat)
    }

    /// Bit pattern of a whole sync block
    pub fn block_bits(&self) -> BitStream {
        let mut bits = BitStream::with_capacity(self.block_len());
        for symbol in self.block_symbols() {
            bits.push_bits(symbol, self.bits_per_symbol);
        }
        bits
    }

    /// Bit pattern of a single marker occurrence
    pub fn marker_bits(&self) -> BitStream {
        let mut bits = BitStream::with_capacity(self.marker_len());
        for &symbol in &self.symbols {
            bits.push_bits(symbol, self.bits_per_symbol);
        }
        bits
    }

    /// Length of a sync block in bits
    pub fn block_len(&self) -> usize {
        self.marker_len() * self.repeat
    }

    /// Length of one marker occurrence in bits
    pub fn marker_len(&self) -> usize {
        self.symbols.len() * self.bits_per_symbol
    }

    pub fn bits_per_symbol(&self) -> usize {
        self.bits_per_symbol
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMethod {
    /// Found on a symbol boundary at some bit phase
    SymbolAligned,
    /// Only a single marker occurrence, found by contiguous bit search
    BitSearch,
}

/// Where the first sync block sits in a raw bitstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPoint {
    /// Bit phase (0..bits_per_symbol) at which symbols line up
    pub bit_offset: usize,
    /// Bit position of the start of the sync block
    pub position: usize,
    pub method: SyncMethod,
}

/// Locates the first sync block in a demodulated bitstream
///
/// The window slicing on the receive side knows nothing about where the
/// sender's symbols start, so every bit phase is tried in turn and the
/// bitstream is re-sliced into symbols at that phase. The first phase that
/// contains a full sync block wins. A sync block is several marker
/// repetitions long, which keeps chance matches in noise out.
///
/// A single marker occurrence ahead of the first complete block means the
/// opening block was hit by noise. That marker is reported instead, as a
/// bit-search result, so the packet behind the damaged block is not skipped.
pub struct Synchronizer {
    marker: SyncMarker,
}

impl Synchronizer {
    pub fn new(marker: SyncMarker) -> Self {
        Self { marker }
    }

    pub fn from_config(config: &ModemConfig) -> Self {
        Self::new(SyncMarker::from_config(config))
    }

    pub fn synchronize(&self, bits: &BitStream) -> Result<SyncPoint> {
        let k = self.marker.bits_per_symbol();
        let aligned = self.find_aligned(bits);

        match bits.find(&self.marker.marker_bits(), 0) {
            Some(position) if aligned.map_or(true, |point| position < point.position) => {
                log::info!(
                    "sync found by bit search at bit {} (no intact block before it)",
                    position
                );
                Ok(SyncPoint {
                    bit_offset: position % k,
                    position,
                    method: SyncMethod::BitSearch,
                })
            }
            _ => aligned.ok_or_else(|| {
                log::warn!("no sync block in {} demodulated bits", bits.len());
                ModemError::SyncNotFound
            }),
        }
    }

    /// First complete block found on a symbol boundary, trying each bit phase
    fn find_aligned(&self, bits: &BitStream) -> Option<SyncPoint> {
        let k = self.marker.bits_per_symbol();
        let pattern = self.marker.block_symbols();

        for offset in 0..k {
            let phase = bits.slice(offset, bits.len());
            let mut symbols = phase.symbols(k);
            // A padded tail chunk is not a real symbol
            if phase.len() % k != 0 {
                symbols.pop();
            }

            if let Some(index) = find_run(&symbols, &pattern) {
                let point = SyncPoint {
                    bit_offset: offset,
                    position: offset + index * k,
                    method: SyncMethod::SymbolAligned,
                };
                log::info!(
                    "sync found at bit offset {} (symbol {}, bit {})",
                    offset,
                    index,
                    point.position
                );
                return Some(point);
            }
        }

        log::debug!("no symbol-aligned sync block");
        None
    }
}

fn find_run(symbols: &[usize], pattern: &[usize]) -> Option<usize> {
    if pattern.is_empty() || symbols.len() < pattern.len() {
        return None;
    }
    symbols
        .windows(pattern.len())
        .position(|window| window == pattern)
}

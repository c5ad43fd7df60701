use crate::compression::Compression;
use crate::error::{ModemError, Result};
use crate::window::WindowFunction;
use crate::{
    DEFAULT_AMPLITUDE, DEFAULT_BITS_PER_SYMBOL, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FREQUENCY,
    DEFAULT_MIN_FREQUENCY, DEFAULT_SAMPLE_RATE, DEFAULT_SILENCE_RATIO, DEFAULT_SILENCE_THRESHOLD,
    DEFAULT_SYMBOL_DURATION, DEFAULT_SYNC_REPEAT,
};
use serde::{Deserialize, Serialize};

/// Channel parameters shared by transmitter and receiver.
///
/// Nothing here is negotiated on air: both sides must load the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits carried by one symbol (k); the alphabet has 2^k tones
    pub bits_per_symbol: usize,
    /// Tone frequency in Hz for each symbol index
    pub frequencies: Vec<f32>,
    /// Symbol duration in seconds
    pub symbol_duration: f64,
    /// Tone amplitude in (0, 1]
    pub amplitude: f32,
    pub window: WindowFunction,
    /// Maximum payload bytes per packet
    pub chunk_size: usize,
    /// Sync marker as a sequence of symbol indices
    pub sync_marker: Vec<usize>,
    /// Consecutive marker repetitions forming one sync block
    pub sync_repeat: usize,
    /// Absolute peak magnitude below which a window is silence
    pub silence_threshold: f32,
    /// Peak must exceed this multiple of the mean bin magnitude
    pub silence_ratio: f32,
    pub compression: Compression,
}

impl Default for ModemConfig {
    fn default() -> Self {
        let alphabet_size = 1usize << DEFAULT_BITS_PER_SYMBOL;
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_symbol: DEFAULT_BITS_PER_SYMBOL,
            frequencies: integer_linspace(
                DEFAULT_MIN_FREQUENCY,
                DEFAULT_MAX_FREQUENCY,
                alphabet_size,
            ),
            symbol_duration: DEFAULT_SYMBOL_DURATION,
            amplitude: DEFAULT_AMPLITUDE,
            window: WindowFunction::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            sync_marker: vec![0, alphabet_size - 1, 0, alphabet_size - 1],
            sync_repeat: DEFAULT_SYNC_REPEAT,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            silence_ratio: DEFAULT_SILENCE_RATIO,
            compression: Compression::default(),
        }
    }
}

/// `count` evenly spaced frequencies from `start` to `end` inclusive,
/// truncated to whole hertz.
pub fn integer_linspace(start: f64, end: f64, count: usize) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![start.trunc() as f32],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            // Last entry is pinned to `end` so rounding in `step` cannot lose a hertz
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .map(|f| f.trunc() as f32)
                .collect()
        }
    }
}

impl ModemConfig {
    pub fn alphabet_size(&self) -> usize {
        1usize << self.bits_per_symbol
    }

    /// round(sample_rate * symbol_duration)
    pub fn samples_per_symbol(&self) -> usize {
        (self.sample_rate as f64 * self.symbol_duration).round() as usize
    }

    /// Width of the spectrum bins produced by one symbol window, in Hz
    pub fn bin_resolution(&self) -> f32 {
        self.sample_rate as f32 / self.samples_per_symbol().max(1) as f32
    }

    /// Bytes in the packet length field: 1 when every chunk length fits a byte
    pub fn length_field_bytes(&self) -> usize {
        if self.chunk_size <= u8::MAX as usize {
            1
        } else {
            2
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=16).contains(&self.bits_per_symbol) {
            return Err(invalid(format!(
                "bits_per_symbol must be in 1..=16, got {}",
                self.bits_per_symbol
            )));
        }

        let alphabet_size = self.alphabet_size();
        if self.frequencies.len() != alphabet_size {
            return Err(invalid(format!(
                "frequency table has {} entries, expected 2^{} = {}",
                self.frequencies.len(),
                self.bits_per_symbol,
                alphabet_size
            )));
        }

        if self.sample_rate == 0 {
            return Err(invalid("sample_rate must be positive".into()));
        }
        if !(self.symbol_duration > 0.0) {
            return Err(invalid("symbol_duration must be positive".into()));
        }
        if self.samples_per_symbol() < 2 {
            return Err(invalid(format!(
                "symbol of {}s at {} Hz spans fewer than 2 samples",
                self.symbol_duration, self.sample_rate
            )));
        }
        if !(self.amplitude > 0.0 && self.amplitude <= 1.0) {
            return Err(invalid(format!(
                "amplitude must be in (0, 1], got {}",
                self.amplitude
            )));
        }

        let nyquist = self.sample_rate as f32 / 2.0;
        if let Some(&bad) = self
            .frequencies
            .iter()
            .find(|&&f| !(f > 0.0 && f < nyquist))
        {
            return Err(invalid(format!(
                "frequency {} Hz outside (0, {} Hz)",
                bad, nyquist
            )));
        }

        // A peak can land up to one bin away from its tone; neighbours must
        // stay closer to their own entry than to the next one.
        let mut sorted = self.frequencies.clone();
        sorted.sort_by(f32::total_cmp);
        let min_spacing = sorted
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .fold(f32::INFINITY, f32::min);
        let resolution = self.bin_resolution();
        if min_spacing <= 2.0 * resolution {
            return Err(invalid(format!(
                "frequency spacing {:.1} Hz must exceed two FFT bins ({:.1} Hz); \
                 lengthen symbol_duration",
                min_spacing,
                2.0 * resolution
            )));
        }

        if !(1..=u16::MAX as usize).contains(&self.chunk_size) {
            return Err(invalid(format!(
                "chunk_size must be in 1..=65535, got {}",
                self.chunk_size
            )));
        }

        if self.sync_marker.is_empty() {
            return Err(invalid("sync_marker must not be empty".into()));
        }
        if let Some(&bad) = self.sync_marker.iter().find(|&&s| s >= alphabet_size) {
            return Err(invalid(format!(
                "sync marker symbol {} outside alphabet of {}",
                bad, alphabet_size
            )));
        }
        if self.sync_repeat < 2 {
            return Err(invalid(format!(
                "sync_repeat must be at least 2, got {}",
                self.sync_repeat
            )));
        }

        if !(self.silence_threshold >= 0.0) || !(self.silence_ratio >= 0.0) {
            return Err(invalid("silence thresholds must be non-negative".into()));
        }

        Ok(())
    }
}

fn invalid(message: String) -> ModemError {
    ModemError::InvalidConfig(message)
}

//! Acoustic data link over near-ultrasonic tones
//!
//! Bits are sent as M-ary FSK symbols (k bits per tone, 2^k tones between
//! 17 and 22 kHz by default), framed into CRC-32 checked packets separated by
//! repeated sync markers. The receiver slices a recording into symbol
//! windows, finds the strongest FFT bin of each, recovers the bit phase from
//! the sync markers and keeps only packets whose CRC matches.

pub mod alphabet;
pub mod bits;
pub mod compression;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod framing;
pub mod fsk;
pub mod parser;
pub mod sync;
pub mod window;

pub use alphabet::SymbolAlphabet;
pub use bits::BitStream;
pub use compression::Compression;
pub use config::ModemConfig;
pub use decoder::{Decoder, Reception};
pub use encoder::Encoder;
pub use error::{ModemError, Result};
pub use framing::{Packet, PacketFramer};
pub use fsk::{FskDemodulator, FskModulator};
pub use parser::{FrameParser, ParseReport};
pub use sync::{SyncMarker, SyncMethod, SyncPoint, Synchronizer};
pub use window::WindowFunction;

// Audio defaults
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_SYMBOL_DURATION: f64 = 0.02; // 882 samples, 50 Hz bins
pub const DEFAULT_AMPLITUDE: f32 = 0.5;

// Symbol alphabet
pub const DEFAULT_BITS_PER_SYMBOL: usize = 5;
pub const DEFAULT_MIN_FREQUENCY: f64 = 17000.0; // Hz
pub const DEFAULT_MAX_FREQUENCY: f64 = 22000.0; // Hz

// Silence gate
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 1e-3;
pub const DEFAULT_SILENCE_RATIO: f32 = 4.0;

// Framing
pub const DEFAULT_CHUNK_SIZE: usize = 128;
pub const DEFAULT_SYNC_REPEAT: usize = 3;

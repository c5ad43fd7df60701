use crate::error::{ModemError, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Payload compressor for file transfers. Sender and receiver must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// DEFLATE with the zlib header and Adler-32 trailer
    #[default]
    Zlib,
    /// Raw DEFLATE stream
    Deflate,
    None,
}

impl Compression {
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        let level = flate2::Compression::best();
        let compressed = match self {
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder
                    .write_all(data)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| ModemError::Compression(e.to_string()))?
            }
            Compression::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), level);
                encoder
                    .write_all(data)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| ModemError::Compression(e.to_string()))?
            }
            Compression::None => data.to_vec(),
        };
        Ok(compressed)
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let outcome = match self {
            Compression::Zlib => ZlibDecoder::new(data).read_to_end(&mut out),
            Compression::Deflate => DeflateDecoder::new(data).read_to_end(&mut out),
            Compression::None => return Ok(data.to_vec()),
        };
        outcome.map_err(|e| ModemError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zlib_shrinks_repetitive_text() {
        let text = "sonic mesh ".repeat(50);
        let compressed = Compression::Zlib.compress(text.as_bytes()).unwrap();
        assert!(compressed.len() < text.len() / 4);
        assert_eq!(
            Compression::Zlib.decompress(&compressed).unwrap(),
            text.as_bytes()
        );
    }

    #[test]
    fn test_raw_deflate_roundtrip() {
        let data: Vec<u8> = (0..=255).collect();
        let compressed = Compression::Deflate.compress(&data).unwrap();
        assert_eq!(Compression::Deflate.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_none_is_identity() {
        let data = b"\x00\x01\xfe\xff";
        assert_eq!(Compression::None.compress(data).unwrap(), data);
        assert_eq!(Compression::None.decompress(data).unwrap(), data);
    }

    #[test]
    fn test_garbage_fails_zlib() {
        let result = Compression::Zlib.decompress(&[0xFF; 16]);
        assert!(matches!(result, Err(ModemError::Decompression(_))));
    }
}

use crate::bits::BitStream;
use crate::compression::Compression;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::sync::SyncMarker;

/// Size of the length prefix in a text-message payload
pub const TEXT_LENGTH_BYTES: usize = 2;

/// Size of the trailing CRC-32
pub const CRC_BYTES: usize = 4;

/// One framed chunk of payload and the CRC-32 sent with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    payload: Vec<u8>,
    crc32: u32,
}

impl Packet {
    /// Packet for `payload` with its CRC-32 computed
    pub fn new(payload: Vec<u8>) -> Self {
        let crc32 = crc32fast::hash(&payload);
        Self { payload, crc32 }
    }

    /// Packet as read off the wire; the CRC is whatever was received
    pub fn from_parts(payload: Vec<u8>, crc32: u32) -> Self {
        Self { payload, crc32 }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// True when the carried CRC matches the payload
    pub fn is_valid(&self) -> bool {
        crc32fast::hash(&self.payload) == self.crc32
    }

    /// Wire bytes: big-endian length, payload, big-endian CRC-32
    pub fn to_bytes(&self, length_field_bytes: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(length_field_bytes + self.payload.len() + CRC_BYTES);
        let length = (self.payload.len() as u16).to_be_bytes();
        bytes.extend_from_slice(&length[2 - length_field_bytes..]);
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&self.crc32.to_be_bytes());
        bytes
    }
}

/// Splits payloads into packets and lays them out between sync blocks
pub struct PacketFramer {
    chunk_size: usize,
    length_field_bytes: usize,
    bits_per_symbol: usize,
    compression: Compression,
    marker: SyncMarker,
}

impl PacketFramer {
    pub fn from_config(config: &ModemConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            length_field_bytes: config.length_field_bytes(),
            bits_per_symbol: config.bits_per_symbol,
            compression: config.compression,
            marker: SyncMarker::from_config(config),
        }
    }

    pub fn length_field_bytes(&self) -> usize {
        self.length_field_bytes
    }

    /// Compress `data` and cut it into packets of at most `chunk_size` bytes
    pub fn packetize(&self, data: &[u8]) -> Result<Vec<Packet>> {
        let compressed = self.compression.compress(data)?;
        log::debug!(
            "compressed {} bytes to {} ({:?})",
            data.len(),
            compressed.len(),
            self.compression
        );

        Ok(compressed
            .chunks(self.chunk_size)
            .map(|chunk| Packet::new(chunk.to_vec()))
            .collect())
    }

    /// Single uncompressed packet carrying a length-prefixed UTF-8 message
    pub fn text_packet(&self, message: &str) -> Result<Packet> {
        let text = message.as_bytes();
        let total = TEXT_LENGTH_BYTES + text.len();
        if total > self.chunk_size {
            return Err(ModemError::PayloadTooLarge {
                len: total,
                max: self.chunk_size,
            });
        }

        let mut payload = Vec::with_capacity(total);
        payload.extend_from_slice(&(text.len() as u16).to_be_bytes());
        payload.extend_from_slice(text);
        Ok(Packet::new(payload))
    }

    /// Serialize packets with a sync block before, between and after them
    ///
    /// Packet bits are zero-padded to a whole symbol so every sync block
    /// starts on a symbol boundary.
    pub fn frames_to_bitstream(&self, packets: &[Packet]) -> BitStream {
        let block = self.marker.block_bits();
        let mut bits = BitStream::new();
        bits.extend_from(&block);

        for packet in packets {
            bits.push_bytes(&packet.to_bytes(self.length_field_bytes));
            bits.pad_to_multiple(self.bits_per_symbol);
            bits.extend_from(&block);
        }

        bits
    }
}

/// Recover the message from a text packet payload
pub fn parse_text_payload(payload: &[u8]) -> Result<String> {
    if payload.len() < TEXT_LENGTH_BYTES {
        return Err(ModemError::CorruptedMessage(format!(
            "payload of {} bytes has no length prefix",
            payload.len()
        )));
    }

    let declared = u16::from_be_bytes([payload[0], payload[1]]) as usize;
    let text = &payload[TEXT_LENGTH_BYTES..];
    if declared > text.len() {
        return Err(ModemError::CorruptedMessage(format!(
            "length prefix says {} bytes but only {} arrived",
            declared,
            text.len()
        )));
    }

    String::from_utf8(text[..declared].to_vec())
        .map_err(|e| ModemError::CorruptedMessage(format!("invalid UTF-8: {}", e)))
}

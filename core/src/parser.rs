use crate::bits::BitStream;
use crate::config::ModemConfig;
use crate::framing::{Packet, CRC_BYTES};
use crate::sync::{SyncMarker, SyncMethod, SyncPoint};

/// Outcome of parsing one synchronized bitstream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Packets whose CRC matched, in arrival order
    pub packets: Vec<Packet>,
    /// Packets dropped for a CRC mismatch or an impossible length
    pub rejected: usize,
    /// The stream ended inside a packet
    pub truncated: bool,
}

impl ParseReport {
    pub fn accepted(&self) -> usize {
        self.packets.len()
    }

    /// Accepted payloads joined in order
    pub fn payload(&self) -> Vec<u8> {
        self.packets
            .iter()
            .flat_map(|packet| packet.payload().iter().copied())
            .collect()
    }
}

// Positions are bit indices into the stream being parsed. `block_end` is the
// first bit after the sync block that introduced the current packet; a
// rejected packet resumes the search there.
#[derive(Debug)]
enum ParseState {
    SearchingSync { from: usize },
    ReadingLength { block_end: usize },
    ReadingPayload { block_end: usize, cursor: usize, length: usize },
    ReadingCrc { block_end: usize, cursor: usize, payload: Vec<u8> },
    Validating { block_end: usize, next: usize, packet: Packet },
    Done,
}

/// Splits a synchronized bitstream back into CRC-checked packets
///
/// Packets are never retried: a bad one is counted and skipped, and the
/// search for the next sync block picks up right behind the block that
/// introduced it.
pub struct FrameParser {
    block: BitStream,
    bits_per_symbol: usize,
    length_field_bits: usize,
    chunk_size: usize,
}

impl FrameParser {
    pub fn new(marker: &SyncMarker, length_field_bytes: usize, chunk_size: usize) -> Self {
        Self {
            block: marker.block_bits(),
            bits_per_symbol: marker.bits_per_symbol(),
            length_field_bits: length_field_bytes * 8,
            chunk_size,
        }
    }

    pub fn from_config(config: &ModemConfig) -> Self {
        Self::new(
            &SyncMarker::from_config(config),
            config.length_field_bytes(),
            config.chunk_size,
        )
    }

    /// Parse packets behind a sync point
    ///
    /// A bit-search sync point is a lone marker from a damaged block, so
    /// the block itself will never match. The packet it introduced starts
    /// somewhere within one block length after it, on the marker's symbol
    /// grid; the first start that yields a CRC-valid packet is taken, and
    /// parsing continues behind that packet as usual.
    pub fn parse_from_sync(&self, bits: &BitStream, sync: &SyncPoint) -> ParseReport {
        if sync.method == SyncMethod::BitSearch {
            let k = self.bits_per_symbol.max(1);
            let recovered = (1..=self.block.len() / k)
                .map(|step| sync.position + step * k)
                .take_while(|&start| start < bits.len())
                .find_map(|start| self.packet_at(bits, start));

            if let Some((packet, next)) = recovered {
                log::info!(
                    "recovered a {}-byte packet behind the damaged sync block at bit {}",
                    packet.len(),
                    sync.position
                );
                let mut report = self.parse(bits, next);
                report.packets.insert(0, packet);
                return report;
            }
            log::debug!("no packet behind the marker at bit {}", sync.position);
        }
        self.parse(bits, sync.position)
    }

    /// CRC-valid packet starting exactly at `start`, with the bit after it
    fn packet_at(&self, bits: &BitStream, start: usize) -> Option<(Packet, usize)> {
        let length = bits.read_bits(start, self.length_field_bits)?;
        if length > self.chunk_size {
            return None;
        }
        let cursor = start + self.length_field_bits;
        let payload = bits.read_bytes(cursor, length)?;
        let crc = bits.read_bytes(cursor + length * 8, CRC_BYTES)?;
        let crc = u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]);
        let packet = Packet::from_parts(payload, crc);
        let next = cursor + (length + CRC_BYTES) * 8;
        packet.is_valid().then_some((packet, next))
    }

    /// Parse packets from `bits`, starting the sync search at bit `start`
    pub fn parse(&self, bits: &BitStream, start: usize) -> ParseReport {
        let mut report = ParseReport::default();
        let mut state = ParseState::SearchingSync { from: start };

        loop {
            state = match state {
                ParseState::SearchingSync { from } => match bits.find(&self.block, from) {
                    Some(position) => ParseState::ReadingLength {
                        block_end: position + self.block.len(),
                    },
                    None => ParseState::Done,
                },

                ParseState::ReadingLength { block_end } => {
                    match bits.read_bits(block_end, self.length_field_bits) {
                        // Fewer bits than a length field after a sync block is
                        // the tail of the transmission
                        None => ParseState::Done,
                        Some(length) if length > self.chunk_size => {
                            log::warn!(
                                "packet at bit {} declares {} bytes (max {}), skipping",
                                block_end,
                                length,
                                self.chunk_size
                            );
                            report.rejected += 1;
                            ParseState::SearchingSync { from: block_end }
                        }
                        Some(length) => ParseState::ReadingPayload {
                            block_end,
                            cursor: block_end + self.length_field_bits,
                            length,
                        },
                    }
                }

                ParseState::ReadingPayload {
                    block_end,
                    cursor,
                    length,
                } => match bits.read_bytes(cursor, length) {
                    Some(payload) => ParseState::ReadingCrc {
                        block_end,
                        cursor: cursor + length * 8,
                        payload,
                    },
                    None => {
                        log::warn!(
                            "stream ends inside the payload of the packet at bit {}",
                            block_end
                        );
                        report.truncated = true;
                        ParseState::Done
                    }
                },

                ParseState::ReadingCrc {
                    block_end,
                    cursor,
                    payload,
                } => match bits.read_bytes(cursor, CRC_BYTES) {
                    Some(crc) => ParseState::Validating {
                        block_end,
                        next: cursor + CRC_BYTES * 8,
                        packet: Packet::from_parts(
                            payload,
                            u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]),
                        ),
                    },
                    None => {
                        log::warn!(
                            "stream ends inside the CRC of the packet at bit {}",
                            block_end
                        );
                        report.truncated = true;
                        ParseState::Done
                    }
                },

                ParseState::Validating {
                    block_end,
                    next,
                    packet,
                } => {
                    if packet.is_valid() {
                        log::debug!(
                            "packet {} accepted ({} bytes)",
                            report.packets.len(),
                            packet.len()
                        );
                        report.packets.push(packet);
                        ParseState::SearchingSync { from: next }
                    } else {
                        log::warn!(
                            "CRC mismatch on packet at bit {} ({} bytes), dropped",
                            block_end,
                            packet.len()
                        );
                        report.rejected += 1;
                        ParseState::SearchingSync { from: block_end }
                    }
                }

                ParseState::Done => break,
            };
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compression;
    use crate::framing::PacketFramer;

    // 8-byte chunks, no compression: every packet is 1 + 8 + 4 bytes = 104
    // bits, padded to 105, and every sync block is 60 bits.
    const BLOCK: usize = 60;
    const STRIDE: usize = 105 + BLOCK;

    fn config() -> ModemConfig {
        ModemConfig {
            chunk_size: 8,
            compression: Compression::None,
            ..ModemConfig::default()
        }
    }

    fn framed(data: &[u8]) -> BitStream {
        let framer = PacketFramer::from_config(&config());
        framer.frames_to_bitstream(&framer.packetize(data).unwrap())
    }

    fn flip(bits: &BitStream, index: usize) -> BitStream {
        bits.iter()
            .enumerate()
            .map(|(i, bit)| if i == index { !bit } else { bit })
            .collect()
    }

    fn data() -> Vec<u8> {
        (0u8..40).collect()
    }

    #[test]
    fn test_clean_stream_parses_every_packet() {
        let report = FrameParser::from_config(&config()).parse(&framed(&data()), 0);
        assert_eq!(report.accepted(), 5);
        assert_eq!(report.rejected, 0);
        assert!(!report.truncated);
        assert_eq!(report.payload(), data());
    }

    #[test]
    fn test_flipped_payload_bit_drops_only_that_packet() {
        // Third bit of the third packet's payload
        let bits = flip(&framed(&data()), BLOCK + 2 * STRIDE + 8 + 3);

        let report = FrameParser::from_config(&config()).parse(&bits, 0);
        assert_eq!(report.accepted(), 4);
        assert_eq!(report.rejected, 1);
        assert!(!report.truncated);

        let mut expected = data();
        expected.drain(16..24);
        assert_eq!(report.payload(), expected);
    }

    #[test]
    fn test_flipped_crc_bit_drops_packet() {
        let bits = flip(&framed(&data()), BLOCK + 8 + 64 + 31);
        let report = FrameParser::from_config(&config()).parse(&bits, 0);
        assert_eq!(report.accepted(), 4);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.payload(), data()[8..].to_vec());
    }

    #[test]
    fn test_truncated_payload_keeps_earlier_packets() {
        let bits = framed(&data());
        let cut = bits.slice(0, BLOCK + 2 * STRIDE + 8 + 20);

        let report = FrameParser::from_config(&config()).parse(&cut, 0);
        assert_eq!(report.accepted(), 2);
        assert!(report.truncated);
        assert_eq!(report.payload(), data()[..16].to_vec());
    }

    #[test]
    fn test_truncated_crc_keeps_earlier_packets() {
        let bits = framed(&data());
        let cut = bits.slice(0, BLOCK + STRIDE + 8 + 64 + 10);

        let report = FrameParser::from_config(&config()).parse(&cut, 0);
        assert_eq!(report.accepted(), 1);
        assert_eq!(report.rejected, 0);
        assert!(report.truncated);
    }

    #[test]
    fn test_trailing_symbol_after_last_block_is_not_truncation() {
        let mut bits = framed(&data());
        bits.push_bits(0b11111, 5);

        let report = FrameParser::from_config(&config()).parse(&bits, 0);
        assert_eq!(report.accepted(), 5);
        assert!(!report.truncated);
    }

    #[test]
    fn test_parse_starts_at_given_offset() {
        let mut bits: BitStream = "110".parse().unwrap();
        bits.extend_from(&framed(b"offset"));

        let report = FrameParser::from_config(&config()).parse(&bits, 3);
        assert_eq!(report.payload(), b"offset");
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let block = SyncMarker::from_config(&config()).block_bits();
        let mut bits = block.clone();
        bits.push_bytes(&[200, 1, 2, 3]);
        bits.pad_to_multiple(5);
        bits.extend_from(&framed(b"ok"));

        let report = FrameParser::from_config(&config()).parse(&bits, 0);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.payload(), b"ok");
    }

    fn lone_marker_at_zero() -> SyncPoint {
        SyncPoint {
            bit_offset: 0,
            position: 0,
            method: SyncMethod::BitSearch,
        }
    }

    #[test]
    fn test_packet_behind_lone_marker_is_recovered() {
        let mut bits = SyncMarker::from_config(&config()).marker_bits();
        bits.push_bytes(&Packet::new(b"solo".to_vec()).to_bytes(1));
        bits.pad_to_multiple(5);
        bits.extend_from(&framed(b"more"));

        let parser = FrameParser::from_config(&config());
        let report = parser.parse_from_sync(&bits, &lone_marker_at_zero());
        assert_eq!(report.accepted(), 2);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.payload(), b"solomore");

        // A plain block search from the marker only sees the later block
        assert_eq!(parser.parse(&bits, 0).payload(), b"more");
    }

    #[test]
    fn test_lone_marker_without_packet_falls_back_to_next_block() {
        let mut bits = SyncMarker::from_config(&config()).marker_bits();
        bits.push_bytes(&[0xFF, 0xFF]);
        bits.extend_from(&framed(b"ok"));

        let parser = FrameParser::from_config(&config());
        let report = parser.parse_from_sync(&bits, &lone_marker_at_zero());
        assert_eq!(report.accepted(), 1);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.payload(), b"ok");
    }

    #[test]
    fn test_aligned_sync_point_parses_from_its_block() {
        let bits = framed(&data());
        let point = SyncPoint {
            bit_offset: 0,
            position: 0,
            method: SyncMethod::SymbolAligned,
        };
        let parser = FrameParser::from_config(&config());
        assert_eq!(parser.parse_from_sync(&bits, &point), parser.parse(&bits, 0));
    }

    #[test]
    fn test_no_sync_block_yields_empty_report() {
        let bits = BitStream::from_bytes(&[0xAA; 16]);
        let report = FrameParser::from_config(&config()).parse(&bits, 0);
        assert_eq!(report, ParseReport::default());
    }
}

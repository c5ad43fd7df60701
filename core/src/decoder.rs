use crate::bits::BitStream;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::framing::parse_text_payload;
use crate::fsk::FskDemodulator;
use crate::parser::{FrameParser, ParseReport};
use crate::sync::{SyncMethod, SyncPoint, Synchronizer};

/// What the receive pipeline recovered from one recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    pub sync: SyncPoint,
    pub report: ParseReport,
}

/// Receive pipeline: samples -> bitstream -> sync -> packets -> payload
pub struct Decoder {
    config: ModemConfig,
    demodulator: FskDemodulator,
    synchronizer: Synchronizer,
    parser: FrameParser,
}

impl Decoder {
    pub fn new(config: ModemConfig) -> Result<Self> {
        let demodulator = FskDemodulator::new(&config)?;
        Ok(Self {
            synchronizer: Synchronizer::from_config(&config),
            parser: FrameParser::from_config(&config),
            demodulator,
            config,
        })
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Raw bitstream from audio, silence dropped
    pub fn demodulate(&self, samples: &[f32]) -> Result<BitStream> {
        self.demodulator.demodulate(samples)
    }

    /// Synchronize and parse packets from a demodulated bitstream
    pub fn receive_bits(&self, bits: &BitStream) -> Result<Reception> {
        let sync = self.synchronizer.synchronize(bits)?;
        let report = self.parser.parse_from_sync(bits, &sync);
        if sync.method == SyncMethod::BitSearch && report == ParseReport::default() {
            log::warn!(
                "marker at bit {} introduces no packet and no sync block follows",
                sync.position
            );
            return Err(ModemError::SyncNotFound);
        }
        log::info!(
            "received {} packets ({} rejected{})",
            report.accepted(),
            report.rejected,
            if report.truncated { ", truncated" } else { "" }
        );
        Ok(Reception { sync, report })
    }

    /// Synchronize and parse packets straight from audio
    pub fn receive(&self, samples: &[f32]) -> Result<Reception> {
        let bits = self.demodulate(samples)?;
        self.receive_bits(&bits)
    }

    /// Recover a binary payload from a demodulated bitstream
    pub fn decode_bitstream(&self, bits: &BitStream) -> Result<Vec<u8>> {
        let reception = self.receive_bits(bits)?;
        self.decompress(&reception.report)
    }

    /// Decode audio samples back into the original file bytes
    pub fn decode(&self, samples: &[f32]) -> Result<Vec<u8>> {
        let reception = self.receive(samples)?;
        self.decompress(&reception.report)
    }

    /// Decode audio samples carrying a text message
    pub fn decode_text(&self, samples: &[f32]) -> Result<String> {
        let reception = self.receive(samples)?;
        self.text(&reception.report)
    }

    /// Text message from a demodulated bitstream
    pub fn decode_text_bitstream(&self, bits: &BitStream) -> Result<String> {
        let reception = self.receive_bits(bits)?;
        self.text(&reception.report)
    }

    /// Join and decompress the accepted payloads
    ///
    /// Losing some packets still yields whatever the compressor makes of the
    /// rest, but a reception where every packet was lost is an error even
    /// when no compression is configured.
    pub fn decompress(&self, report: &ParseReport) -> Result<Vec<u8>> {
        if report.accepted() == 0 && (report.rejected > 0 || report.truncated) {
            log::warn!(
                "no packet survived ({} rejected{})",
                report.rejected,
                if report.truncated { ", truncated" } else { "" }
            );
            return Err(ModemError::Decompression(
                "no packet passed its CRC check".into(),
            ));
        }
        let payload = report.payload();
        self.config.compression.decompress(&payload).map_err(|e| {
            log::warn!(
                "decompressing {} bytes from {} packets failed: {}",
                payload.len(),
                report.accepted(),
                e
            );
            e
        })
    }

    /// Text message carried by the first accepted packet
    pub fn text(&self, report: &ParseReport) -> Result<String> {
        let packet = report
            .packets
            .first()
            .ok_or_else(|| ModemError::CorruptedMessage("no valid packet received".into()))?;
        parse_text_payload(packet.payload())
    }
}

use crate::bits::BitStream;
use crate::config::ModemConfig;
use crate::error::Result;
use crate::framing::PacketFramer;
use crate::fsk::FskModulator;

/// Transmit pipeline: payload -> packets -> bitstream -> tones
pub struct Encoder {
    config: ModemConfig,
    framer: PacketFramer,
    modulator: FskModulator,
}

impl Encoder {
    pub fn new(config: ModemConfig) -> Result<Self> {
        let modulator = FskModulator::new(&config)?;
        Ok(Self {
            framer: PacketFramer::from_config(&config),
            modulator,
            config,
        })
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Framed bitstream for a binary payload (compressed first)
    pub fn to_bitstream(&self, data: &[u8]) -> Result<BitStream> {
        let packets = self.framer.packetize(data)?;
        Ok(self.framer.frames_to_bitstream(&packets))
    }

    /// Framed bitstream for a text message (single packet, no compression)
    pub fn text_bitstream(&self, message: &str) -> Result<BitStream> {
        let packet = self.framer.text_packet(message)?;
        Ok(self.framer.frames_to_bitstream(&[packet]))
    }

    /// Encode binary data into audio samples
    pub fn encode(&self, data: &[u8]) -> Result<Vec<f32>> {
        let bits = self.to_bitstream(data)?;
        let samples = self.encode_bits(&bits)?;
        log::info!(
            "encoded {} bytes into {} bits, {:.2}s of audio",
            data.len(),
            bits.len(),
            samples.len() as f64 / self.config.sample_rate as f64
        );
        Ok(samples)
    }

    /// Encode a text message into audio samples
    pub fn encode_text(&self, message: &str) -> Result<Vec<f32>> {
        let bits = self.text_bitstream(message)?;
        let samples = self.encode_bits(&bits)?;
        log::info!(
            "encoded {}-byte message into {} bits, {:.2}s of audio",
            message.len(),
            bits.len(),
            samples.len() as f64 / self.config.sample_rate as f64
        );
        Ok(samples)
    }

    /// Modulate an already framed bitstream
    pub fn encode_bits(&self, bits: &BitStream) -> Result<Vec<f32>> {
        self.modulator.modulate_bits(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModemError;

    #[test]
    fn test_signal_is_whole_symbols() {
        let encoder = Encoder::new(ModemConfig::default()).unwrap();
        let samples = encoder.encode_text("HI").unwrap();
        // 60 + 75 + 60 bits = 39 symbols
        assert_eq!(samples.len(), 39 * 882);
        assert!(samples.iter().all(|s| s.abs() <= 0.5));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ModemConfig {
            frequencies: vec![1000.0; 4],
            ..ModemConfig::default()
        };
        assert!(matches!(
            Encoder::new(config),
            Err(ModemError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_oversized_text_is_rejected() {
        let encoder = Encoder::new(ModemConfig::default()).unwrap();
        let message = "z".repeat(200);
        assert!(matches!(
            encoder.encode_text(&message),
            Err(ModemError::PayloadTooLarge { .. })
        ));
    }
}

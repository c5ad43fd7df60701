use crate::alphabet::SymbolAlphabet;
use crate::bits::BitStream;
use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use realfft::{RealFftPlanner, RealToComplex};
use std::f64::consts::PI;
use std::sync::Arc;

// M-ary FSK over a configurable tone table.
//
// Each symbol carries `bits_per_symbol` bits and is sent as a single windowed
// sine burst at the frequency the alphabet assigns to its index. Bursts are
// concatenated back to back; the taper of the window is the only guard
// between neighbours.
//
// Reception slices the signal into symbol-length windows and takes the
// strongest bin of a real FFT. Windows whose peak does not stand out from
// the rest of the spectrum are treated as silence and produce no bits.

/// Added to the peak amplitude before normalizing so an all-zero window stays zero
const NORMALIZATION_EPSILON: f32 = 1e-9;

/// FSK modulator - turns symbol indices into tone bursts
pub struct FskModulator {
    alphabet: SymbolAlphabet,
    sample_rate: f64,
    samples_per_symbol: usize,
    amplitude: f32,
    window: Vec<f32>,
}

impl FskModulator {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        config.validate()?;
        let samples_per_symbol = config.samples_per_symbol();
        Ok(Self {
            alphabet: SymbolAlphabet::from_config(config),
            sample_rate: config.sample_rate as f64,
            samples_per_symbol,
            amplitude: config.amplitude,
            window: config.window.generate(samples_per_symbol),
        })
    }

    pub fn samples_per_symbol(&self) -> usize {
        self.samples_per_symbol
    }

    /// Generate the tone burst for one symbol
    ///
    /// `amplitude * sin(2*pi*f*t)` over one symbol duration, shaped by the
    /// configured window. An index outside the alphabet is rejected outright.
    pub fn modulate_symbol(&self, index: usize) -> Result<Vec<f32>> {
        let frequency = self
            .alphabet
            .frequency(index)
            .ok_or(ModemError::SymbolOutOfRange {
                index,
                alphabet_size: self.alphabet.len(),
            })?;

        let angular_freq = 2.0 * PI * frequency as f64 / self.sample_rate;
        let amplitude = self.amplitude as f64;

        Ok(self
            .window
            .iter()
            .enumerate()
            .map(|(i, &weight)| (amplitude * (angular_freq * i as f64).sin()) as f32 * weight)
            .collect())
    }

    /// Modulate a whole bitstream, `bits_per_symbol` bits per burst
    ///
    /// A short final chunk is right-padded with zero bits.
    pub fn modulate_bits(&self, bits: &BitStream) -> Result<Vec<f32>> {
        let symbols = bits.symbols(self.alphabet.bits_per_symbol());
        let mut samples = Vec::with_capacity(symbols.len() * self.samples_per_symbol);
        for symbol in symbols {
            samples.extend_from_slice(&self.modulate_symbol(symbol)?);
        }
        Ok(samples)
    }
}

/// Strongest spectral component of one analysis window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumPeak {
    pub bin: usize,
    pub frequency: f32,
    /// Peak magnitude, scaled so a full-scale on-bin tone reads about 0.5
    pub magnitude: f32,
    /// Mean magnitude across all bins
    pub mean_magnitude: f32,
}

/// FSK demodulator - detects the dominant tone of each window
pub struct FskDemodulator {
    alphabet: SymbolAlphabet,
    sample_rate: f32,
    samples_per_symbol: usize,
    window: Vec<f32>,
    window_sum: f32,
    fft: Arc<dyn RealToComplex<f32>>,
    silence_threshold: f32,
    silence_ratio: f32,
}

impl FskDemodulator {
    pub fn new(config: &ModemConfig) -> Result<Self> {
        config.validate()?;
        let samples_per_symbol = config.samples_per_symbol();
        let window = config.window.generate(samples_per_symbol);
        let window_sum = window.iter().sum::<f32>().max(f32::MIN_POSITIVE);

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(samples_per_symbol);

        Ok(Self {
            alphabet: SymbolAlphabet::from_config(config),
            sample_rate: config.sample_rate as f32,
            samples_per_symbol,
            window,
            window_sum,
            fft,
            silence_threshold: config.silence_threshold,
            silence_ratio: config.silence_ratio,
        })
    }

    pub fn samples_per_symbol(&self) -> usize {
        self.samples_per_symbol
    }

    /// Normalize, window and FFT one symbol window, returning its peak
    pub fn analyze(&self, samples: &[f32]) -> Result<SpectrumPeak> {
        if samples.len() != self.samples_per_symbol {
            return Err(ModemError::InvalidInputSize {
                expected: self.samples_per_symbol,
                actual: samples.len(),
            });
        }

        // Remove amplitude dependence before looking at the spectrum
        let peak_amplitude = samples.iter().fold(0.0f32, |max, s| max.max(s.abs()));
        let gain = 1.0 / (peak_amplitude + NORMALIZATION_EPSILON);

        let mut input: Vec<f32> = samples
            .iter()
            .zip(self.window.iter())
            .map(|(&sample, &weight)| sample * gain * weight)
            .collect();
        let mut spectrum = self.fft.make_output_vec();
        self.fft
            .process(&mut input, &mut spectrum)
            .map_err(|e| ModemError::FftError(format!("forward FFT failed: {:?}", e)))?;

        let mut peak_bin = 0;
        let mut peak_magnitude = 0.0f32;
        let mut total = 0.0f32;
        for (bin, value) in spectrum.iter().enumerate() {
            let magnitude = value.norm() / self.window_sum;
            total += magnitude;
            if magnitude > peak_magnitude {
                peak_magnitude = magnitude;
                peak_bin = bin;
            }
        }

        Ok(SpectrumPeak {
            bin: peak_bin,
            frequency: peak_bin as f32 * self.sample_rate / self.samples_per_symbol as f32,
            magnitude: peak_magnitude,
            mean_magnitude: total / spectrum.len() as f32,
        })
    }

    /// Demodulate one window: `None` for silence, otherwise the symbol index
    pub fn demodulate_symbol(&self, samples: &[f32]) -> Result<Option<usize>> {
        let peak = self.analyze(samples)?;

        if peak.magnitude < self.silence_threshold
            || peak.magnitude < self.silence_ratio * peak.mean_magnitude
        {
            return Ok(None);
        }

        Ok(Some(self.alphabet.nearest_index(peak.frequency)))
    }

    /// Demodulate a whole recording into a bitstream
    ///
    /// Walks non-overlapping symbol windows; a trailing partial window is
    /// dropped and silent windows contribute no bits.
    pub fn demodulate(&self, samples: &[f32]) -> Result<BitStream> {
        let bits_per_symbol = self.alphabet.bits_per_symbol();
        let mut bits = BitStream::with_capacity(
            samples.len() / self.samples_per_symbol * bits_per_symbol,
        );
        if samples.len() < self.samples_per_symbol {
            return Ok(bits);
        }

        let mut silent = 0usize;
        for window in samples.chunks_exact(self.samples_per_symbol) {
            match self.demodulate_symbol(window)? {
                Some(symbol) => bits.push_bits(symbol, bits_per_symbol),
                None => silent += 1,
            }
        }
        bits.truncate_to_multiple(bits_per_symbol);

        log::debug!(
            "demodulated {} symbols ({} silent windows skipped)",
            bits.len() / bits_per_symbol,
            silent
        );
        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowFunction;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn config() -> ModemConfig {
        ModemConfig::default()
    }

    #[test]
    fn test_burst_length_matches_symbol_duration() {
        let modulator = FskModulator::new(&config()).unwrap();
        let burst = modulator.modulate_symbol(7).unwrap();
        assert_eq!(burst.len(), 882);
        assert_eq!(burst.len(), modulator.samples_per_symbol());
    }

    #[test]
    fn test_burst_is_windowed() {
        let modulator = FskModulator::new(&config()).unwrap();
        let burst = modulator.modulate_symbol(3).unwrap();

        // Hamming edges fall to 8% of full scale
        assert!(burst[0].abs() < 1e-6);
        assert!(burst[burst.len() - 1].abs() <= 0.5 * 0.08 + 1e-6);
        let peak = burst.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.45 && peak <= 0.5 + 1e-6, "peak={}", peak);
    }

    #[test]
    fn test_modulation_is_deterministic() {
        let modulator = FskModulator::new(&config()).unwrap();
        let other = FskModulator::new(&config()).unwrap();
        assert_eq!(
            modulator.modulate_symbol(19).unwrap(),
            other.modulate_symbol(19).unwrap()
        );
    }

    #[test]
    fn test_symbol_out_of_range_fails() {
        let modulator = FskModulator::new(&config()).unwrap();
        assert!(matches!(
            modulator.modulate_symbol(32),
            Err(ModemError::SymbolOutOfRange {
                index: 32,
                alphabet_size: 32
            })
        ));
    }

    #[test]
    fn test_modulate_bits_pads_final_chunk() {
        let modulator = FskModulator::new(&config()).unwrap();
        let bits: BitStream = "1111100".parse().unwrap();
        let samples = modulator.modulate_bits(&bits).unwrap();
        assert_eq!(samples.len(), 2 * 882);
        assert_eq!(&samples[882..], modulator.modulate_symbol(0b00000).unwrap().as_slice());
    }

    #[test]
    fn test_every_symbol_roundtrips() {
        let modulator = FskModulator::new(&config()).unwrap();
        let demodulator = FskDemodulator::new(&config()).unwrap();

        for index in 0..32 {
            let burst = modulator.modulate_symbol(index).unwrap();
            assert_eq!(
                demodulator.demodulate_symbol(&burst).unwrap(),
                Some(index),
                "symbol {} did not survive",
                index
            );
        }
    }

    #[test]
    fn test_other_windows_roundtrip() {
        for window in [
            WindowFunction::Hann,
            WindowFunction::Blackman,
            WindowFunction::Rectangular,
        ] {
            let config = ModemConfig {
                window,
                ..config()
            };
            let modulator = FskModulator::new(&config).unwrap();
            let demodulator = FskDemodulator::new(&config).unwrap();
            for index in [0, 1, 15, 30, 31] {
                let burst = modulator.modulate_symbol(index).unwrap();
                assert_eq!(
                    demodulator.demodulate_symbol(&burst).unwrap(),
                    Some(index),
                    "{:?} symbol {}",
                    window,
                    index
                );
            }
        }
    }

    #[test]
    fn test_demodulator_gain_invariance() {
        let modulator = FskModulator::new(&config()).unwrap();
        let demodulator = FskDemodulator::new(&config()).unwrap();
        let burst = modulator.modulate_symbol(21).unwrap();

        for gain in [0.001, 0.1, 1.0, 1.9] {
            let scaled: Vec<f32> = burst.iter().map(|s| s * gain).collect();
            assert_eq!(
                demodulator.demodulate_symbol(&scaled).unwrap(),
                Some(21),
                "failed at gain {}",
                gain
            );
        }
    }

    #[test]
    fn test_zero_window_is_silence() {
        let demodulator = FskDemodulator::new(&config()).unwrap();
        let silence = vec![0.0; 882];
        assert_eq!(demodulator.demodulate_symbol(&silence).unwrap(), None);
    }

    #[test]
    fn test_near_zero_tone_is_silence() {
        let demodulator = FskDemodulator::new(&config()).unwrap();
        let faint: Vec<f32> = (0..882)
            .map(|i| 1e-13 * (2.0 * std::f32::consts::PI * 17161.0 * i as f32 / 44100.0).sin())
            .collect();
        assert_eq!(demodulator.demodulate_symbol(&faint).unwrap(), None);
    }

    #[test]
    fn test_white_noise_is_silence() {
        let demodulator = FskDemodulator::new(&config()).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let normal = Normal::new(0.0f32, 0.3).unwrap();

        for _ in 0..5 {
            let noise: Vec<f32> = (0..882).map(|_| normal.sample(&mut rng)).collect();
            assert_eq!(demodulator.demodulate_symbol(&noise).unwrap(), None);
        }
    }

    #[test]
    fn test_tone_survives_moderate_noise() {
        let modulator = FskModulator::new(&config()).unwrap();
        let demodulator = FskDemodulator::new(&config()).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let normal = Normal::new(0.0f32, 0.05).unwrap();

        let burst = modulator.modulate_symbol(12).unwrap();
        let noisy: Vec<f32> = burst.iter().map(|s| s + normal.sample(&mut rng)).collect();
        assert_eq!(demodulator.demodulate_symbol(&noisy).unwrap(), Some(12));
    }

    #[test]
    fn test_wrong_window_length_rejected() {
        let demodulator = FskDemodulator::new(&config()).unwrap();
        assert!(matches!(
            demodulator.demodulate_symbol(&[0.0; 100]),
            Err(ModemError::InvalidInputSize {
                expected: 882,
                actual: 100
            })
        ));
    }

    #[test]
    fn test_demodulate_skips_silence_and_partial_window() {
        let modulator = FskModulator::new(&config()).unwrap();
        let demodulator = FskDemodulator::new(&config()).unwrap();

        let mut signal = vec![0.0; 882 * 2];
        signal.extend(modulator.modulate_symbol(31).unwrap());
        signal.extend(vec![0.0; 882]);
        signal.extend(modulator.modulate_symbol(1).unwrap());
        signal.extend(vec![0.3; 400]);

        let bits = demodulator.demodulate(&signal).unwrap();
        assert_eq!(bits.to_string(), "1111100001");
    }

    #[test]
    fn test_short_signal_gives_empty_bitstream() {
        let demodulator = FskDemodulator::new(&config()).unwrap();
        assert!(demodulator.demodulate(&[0.1; 881]).unwrap().is_empty());
    }

    #[test]
    fn test_spectrum_peak_reports_bin_frequency() {
        let modulator = FskModulator::new(&config()).unwrap();
        let demodulator = FskDemodulator::new(&config()).unwrap();
        // 17000 Hz sits exactly on bin 340 with 50 Hz bins
        let peak = demodulator
            .analyze(&modulator.modulate_symbol(0).unwrap())
            .unwrap();
        assert_eq!(peak.bin, 340);
        assert!((peak.frequency - 17000.0).abs() < 1e-2);
        assert!(peak.magnitude > 10.0 * peak.mean_magnitude);
    }
}

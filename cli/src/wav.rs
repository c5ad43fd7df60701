use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("WAV error: {0}")]
    Hound(#[from] hound::Error),

    #[error("Unsupported WAV format: {0}")]
    Unsupported(String),
}

/// Write samples as 16-bit mono PCM, scaled so the loudest sample hits full scale
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), WavError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let peak = samples.iter().fold(0.0f32, |max, s| max.max(s.abs()));
    let scale = if peak > 0.0 { i16::MAX as f32 / peak } else { 0.0 };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample * scale).round() as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a WAV file as mono `f32` samples in [-1, 1]
///
/// Multi-channel files are averaged down to one channel. A sample rate other
/// than `expected_rate` is only warned about; the samples are not resampled.
pub fn read_wav(path: &Path, expected_rate: u32) -> Result<Vec<f32>, WavError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    log::debug!(
        "read WAV: {} Hz, {} channels, {} bits {:?}",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    if spec.sample_rate != expected_rate {
        log::warn!(
            "{} is {} Hz but the modem expects {} Hz; decoding will likely fail",
            path.display(),
            spec.sample_rate,
            expected_rate
        );
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits @ 8..=32) => {
            let full_scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / full_scale))
                .collect::<Result<_, _>>()?
        }
        (format, bits) => {
            return Err(WavError::Unsupported(format!("{:?} at {} bits", format, bits)));
        }
    };

    let channels = spec.channels.max(1) as usize;
    if channels == 1 {
        return Ok(interleaved);
    }
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect())
}

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Tapering window applied to tone bursts and to analysis frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    #[default]
    Hamming,
    Hann,
    Blackman,
    Rectangular,
}

impl WindowFunction {
    /// Symmetric window of `len` samples (endpoints included, as numpy does)
    pub fn generate(self, len: usize) -> Vec<f32> {
        if len == 0 {
            return Vec::new();
        }
        if len == 1 {
            return vec![1.0];
        }

        let denom = (len - 1) as f64;
        (0..len)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / denom;
                let value = match self {
                    WindowFunction::Hamming => 0.54 - 0.46 * x.cos(),
                    WindowFunction::Hann => 0.5 - 0.5 * x.cos(),
                    WindowFunction::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                    WindowFunction::Rectangular => 1.0,
                };
                value as f32
            })
            .collect()
    }
}

use crate::config::ModemConfig;

/// Frequency table mapping symbol indices to tone frequencies
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolAlphabet {
    frequencies: Vec<f32>,
    bits_per_symbol: usize,
}

impl SymbolAlphabet {
    /// Build from a validated config
    pub fn from_config(config: &ModemConfig) -> Self {
        Self {
            frequencies: config.frequencies.clone(),
            bits_per_symbol: config.bits_per_symbol,
        }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn bits_per_symbol(&self) -> usize {
        self.bits_per_symbol
    }

    pub fn frequency(&self, index: usize) -> Option<f32> {
        self.frequencies.get(index).copied()
    }

    /// Index of the entry closest to `frequency`; ties go to the lowest index
    pub fn nearest_index(&self, frequency: f32) -> usize {
        let mut best = 0;
        let mut best_distance = f32::INFINITY;
        for (index, &candidate) in self.frequencies.iter().enumerate() {
            let distance = (candidate - frequency).abs();
            if distance < best_distance {
                best_distance = distance;
                best = index;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_frequency_maps_back_to_index() {
        let alphabet = SymbolAlphabet::from_config(&ModemConfig::default());
        for index in 0..alphabet.len() {
            let frequency = alphabet.frequency(index).unwrap();
            assert_eq!(alphabet.nearest_index(frequency), index);
        }
    }

    #[test]
    fn test_nearest_index_quantizes() {
        let alphabet = SymbolAlphabet::from_config(&ModemConfig::default());
        assert_eq!(alphabet.nearest_index(17040.0), 0);
        assert_eq!(alphabet.nearest_index(17120.0), 1);
        assert_eq!(alphabet.nearest_index(0.0), 0);
        assert_eq!(alphabet.nearest_index(30000.0), 31);
    }

    #[test]
    fn test_tie_resolves_to_lowest_index() {
        let config = ModemConfig {
            bits_per_symbol: 1,
            frequencies: vec![1000.0, 2000.0],
            ..ModemConfig::default()
        };
        let alphabet = SymbolAlphabet::from_config(&config);
        assert_eq!(alphabet.nearest_index(1500.0), 0);
    }

    #[test]
    fn test_out_of_range_frequency_lookup() {
        let alphabet = SymbolAlphabet::from_config(&ModemConfig::default());
        assert_eq!(alphabet.frequency(32), None);
    }
}

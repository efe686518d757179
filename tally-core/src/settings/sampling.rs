use serde::Deserialize;

/// Sampling configuration validation error
#[derive(Debug)]
pub struct SamplingValidationError {
    pub message: String,
}

impl std::fmt::Display for SamplingValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sampling configuration error: {}", self.message)
    }
}

impl std::error::Error for SamplingValidationError {}

/// Configuration for the high-frequency sampling gate.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplingSettings {
    /// Event names thinned by the sampling gate. Every other name is always
    /// admitted.
    #[serde(default = "default_high_frequency_events")]
    pub high_frequency_events: Vec<String>,

    /// Fraction of high-frequency events admitted, 0.0 to 1.0.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

fn default_high_frequency_events() -> Vec<String> {
    [
        "direction_changed",
        "hedgehog_flap",
        "mouse_move",
        "scroll",
        "key_press",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn default_sample_rate() -> f64 {
    0.1
}

impl Default for SamplingSettings {
    fn default() -> Self {
        SamplingSettings {
            high_frequency_events: default_high_frequency_events(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl SamplingSettings {
    /// Validate the sampling configuration
    pub fn validate(&self) -> Result<(), SamplingValidationError> {
        if !self.sample_rate.is_finite() {
            return Err(SamplingValidationError {
                message: "sample_rate must be a finite number".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.sample_rate) {
            return Err(SamplingValidationError {
                message: format!(
                    "sample_rate ({}) must be between 0.0 and 1.0",
                    self.sample_rate
                ),
            });
        }

        Ok(())
    }
}

//! Probabilistic admission filter for high-frequency event types.
//!
//! Only event names in the configured high-frequency set are thinned;
//! regular business events are never dropped.

use std::collections::HashSet;

use rand::Rng;

use crate::settings::sampling::SamplingSettings;

#[derive(Debug, Clone)]
pub struct SamplingGate {
    high_frequency_events: HashSet<String>,
    sample_rate: f64,
}

impl SamplingGate {
    pub fn new(
        high_frequency_events: impl IntoIterator<Item = String>,
        sample_rate: f64,
    ) -> Self {
        SamplingGate {
            high_frequency_events: high_frequency_events.into_iter().collect(),
            sample_rate,
        }
    }

    pub fn from_settings(settings: &SamplingSettings) -> Self {
        Self::new(
            settings.high_frequency_events.iter().cloned(),
            settings.sample_rate,
        )
    }

    pub fn is_high_frequency(&self, event_name: &str) -> bool {
        self.high_frequency_events.contains(event_name)
    }

    /// Admission with the configured sample rate.
    pub fn should_sample(&self, event_name: &str) -> bool {
        self.should_sample_at_rate(event_name, self.sample_rate)
    }

    /// Admission with an explicit rate.
    ///
    /// High-frequency names are admitted iff a uniform draw in [0, 100) is
    /// strictly below `sample_rate * 100`; a rate of zero admits nothing,
    /// a rate of one or more admits everything. Other names always pass.
    pub fn should_sample_at_rate(&self, event_name: &str, sample_rate: f64) -> bool {
        if !self.is_high_frequency(event_name) {
            return true;
        }
        let draw = rand::thread_rng().gen_range(0..100u32);
        (draw as f64) < sample_rate * 100.0
    }
}

use crate::shape::{ConfigError, DEFAULT_AMPLITUDE, DEFAULT_FALL_TIME, DEFAULT_RISE_TIME};
use crate::waveform::Waveform;
use bon::Builder;
use serde::Deserialize;

fn default_rise_time() -> f64 {
    DEFAULT_RISE_TIME
}

fn default_fall_time() -> f64 {
    DEFAULT_FALL_TIME
}

fn default_amplitude() -> f64 {
    DEFAULT_AMPLITUDE
}

/// Time-domain parameters of the waveform captured in every run.
///
/// Values are not validated until [`build`](Self::build) is called.
///
/// # Examples
///
/// ```
/// use pmt::config::WaveformConfig;
///
/// let config = WaveformConfig::from_json(r#"{ "bin-width": 0.5, "total-time": 200.0 }"#)?;
/// assert_eq!(config.fall_time, 5.0);
///
/// let waveform = config.build()?;
/// assert_eq!(waveform.bin_count(), 400);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Builder, Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WaveformConfig {
    /// Bin width in ns.
    pub bin_width: f64,
    /// Length of the capture window in ns.
    pub total_time: f64,
    #[builder(default = DEFAULT_RISE_TIME)]
    #[serde(default = "default_rise_time")]
    pub rise_time: f64,
    #[builder(default = DEFAULT_FALL_TIME)]
    #[serde(default = "default_fall_time")]
    pub fall_time: f64,
    #[builder(default = DEFAULT_AMPLITUDE)]
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}

impl WaveformConfig {
    /// Parse a configuration from a JSON object with kebab-case keys.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Validate the configuration and create an empty [`Waveform`].
    pub fn build(&self) -> Result<Waveform, ConfigError> {
        Waveform::builder()
            .bin_width(self.bin_width)
            .total_time(self.total_time)
            .rise_time(self.rise_time)
            .fall_time(self.fall_time)
            .amplitude(self.amplitude)
            .build()
    }
}

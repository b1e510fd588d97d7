use crate::shape::{
    positive_finite, ConfigError, Positive, PulseShape, DEFAULT_AMPLITUDE, DEFAULT_FALL_TIME,
    DEFAULT_RISE_TIME,
};
use crate::table::{Row, WaveformTable};
use bon::bon;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Upper bound on the number of bins. Anything above this is certainly a unit
// mistake in the configuration.
const MAX_BIN_COUNT: f64 = u32::MAX as f64;

/// The error type returned when recording a photon with a non-finite arrival
/// time.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("photon arrival time must be finite, got {0}")]
pub struct NonFiniteArrival(pub f64);

/// The error type returned when a [`Waveform`] can't be written to its
/// destination.
#[derive(Debug, Error)]
#[error("failed to export waveform to `{}`", .path.display())]
pub struct ExportError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl ExportError {
    /// The destination that could not be written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Time-binned analog PMT output.
///
/// Each recorded photon adds one [`PulseShape`] response, starting at its
/// arrival time, to every bin at or after that time. Contributions from
/// different photons superpose linearly; bins are never overwritten.
///
/// All times are in nanoseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    bin_width: Positive<f64>,
    shape: PulseShape,
    time_bins: Vec<f64>,
    signal: Vec<f64>,
}

#[bon]
impl Waveform {
    /// Create an empty waveform spanning `floor(total_time / bin_width)` bins.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmt::waveform::Waveform;
    ///
    /// let waveform = Waveform::builder()
    ///     .bin_width(2.0)
    ///     .total_time(9.0)
    ///     .build()?;
    ///
    /// assert_eq!(waveform.time_bins(), &[0.0, 2.0, 4.0, 6.0]);
    /// assert_eq!(waveform.signal(), &[0.0; 4]);
    /// # Ok::<(), pmt::shape::ConfigError>(())
    /// ```
    #[builder]
    pub fn new(
        bin_width: f64,
        total_time: f64,
        #[builder(default = DEFAULT_RISE_TIME)] rise_time: f64,
        #[builder(default = DEFAULT_FALL_TIME)] fall_time: f64,
        #[builder(default = DEFAULT_AMPLITUDE)] amplitude: f64,
    ) -> Result<Self, ConfigError> {
        let shape = PulseShape::new(rise_time, fall_time, amplitude)?;
        Self::with_shape(bin_width, total_time, shape)
    }
}

impl Waveform {
    /// Create an empty waveform with an already validated [`PulseShape`].
    pub fn with_shape(
        bin_width: f64,
        total_time: f64,
        shape: PulseShape,
    ) -> Result<Self, ConfigError> {
        let bin_width_ns = bin_width;
        let bin_width = positive_finite(bin_width).ok_or(ConfigError::BinWidth(bin_width))?;
        if !(total_time >= 0.0 && total_time.is_finite()) {
            return Err(ConfigError::TotalTime(total_time));
        }

        let bin_count = (total_time / bin_width_ns).floor();
        if bin_count > MAX_BIN_COUNT {
            return Err(ConfigError::BinCount {
                total_time,
                bin_width: bin_width_ns,
            });
        }
        // Exact: `bin_count` is a non-negative integer no larger than u32::MAX.
        let bin_count = bin_count as usize;

        let time_bins = (0..bin_count).map(|i| i as f64 * bin_width_ns).collect();

        Ok(Self {
            bin_width,
            shape,
            time_bins,
            signal: vec![0.0; bin_count],
        })
    }

    pub fn bin_width(&self) -> f64 {
        *self.bin_width.inner()
    }

    pub fn bin_count(&self) -> usize {
        self.time_bins.len()
    }

    pub fn shape(&self) -> &PulseShape {
        &self.shape
    }

    /// Start time of each bin, `i * bin_width`.
    pub fn time_bins(&self) -> &[f64] {
        &self.time_bins
    }

    /// Accumulated amplitude of each bin. Same length as
    /// [`time_bins`](Self::time_bins).
    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    /// Iterator over `(time, amplitude)` pairs in ascending time order.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time_bins
            .iter()
            .copied()
            .zip(self.signal.iter().copied())
    }

    /// Add the response of a single photon arriving at `arrival_time`.
    ///
    /// Bins before the arrival time are left untouched. Arrival times outside
    /// the waveform window are accepted. Non-finite arrival times are rejected
    /// without modifying the signal.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmt::waveform::Waveform;
    ///
    /// let mut waveform = Waveform::builder()
    ///     .bin_width(1.0)
    ///     .total_time(3.0)
    ///     .build()?;
    /// waveform.record_photon(0.0)?;
    ///
    /// let signal = waveform.signal();
    /// assert_eq!(signal[0], 0.0);
    /// assert!(signal[1] > 0.0);
    /// assert!(signal[2] > signal[1]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn record_photon(&mut self, arrival_time: f64) -> Result<(), NonFiniteArrival> {
        if !arrival_time.is_finite() {
            return Err(NonFiniteArrival(arrival_time));
        }

        let shape = self.shape;
        let first = self.time_bins.partition_point(|&time| time < arrival_time);
        for (time, amplitude) in self.time_bins[first..]
            .iter()
            .zip(&mut self.signal[first..])
        {
            *amplitude += shape.response(time - arrival_time);
        }

        Ok(())
    }

    /// Zero the signal. Time bins are kept.
    pub fn reset(&mut self) {
        self.signal.fill(0.0);
    }

    /// Write the waveform as a tab separated `time amplitude` table, one bin
    /// per line, with no header.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for (time, amplitude) in self.samples() {
            writeln!(writer, "{}", Row(time, amplitude))?;
        }

        Ok(())
    }

    /// Write the waveform table to the file at `path`, creating or truncating
    /// it.
    ///
    /// The waveform is left untouched on failure, so the caller may retry
    /// with a different destination.
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        let wrap = |source: io::Error| ExportError {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(wrap)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer).map_err(wrap)?;
        writer.flush().map_err(wrap)?;

        tracing::debug!(
            path = %path.display(),
            bins = self.bin_count(),
            "exported waveform"
        );
        Ok(())
    }

    /// Read-only copy of the current samples.
    pub fn snapshot(&self) -> WaveformTable {
        self.samples().collect()
    }
}

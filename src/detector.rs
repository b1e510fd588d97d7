use crate::waveform::Waveform;
use std::path::PathBuf;
use uom::si::f64::Time;
use uom::si::time::nanosecond;

/// Photocathode of the PMT.
///
/// Every photon hit that reaches the sensitive volume is recorded into the
/// waveform of the current run.
#[derive(Debug)]
pub struct PmtSensitiveDetector<'a> {
    waveform: &'a mut Waveform,
    hits: usize,
    rejected: usize,
}

impl<'a> PmtSensitiveDetector<'a> {
    pub fn new(waveform: &'a mut Waveform) -> Self {
        Self {
            waveform,
            hits: 0,
            rejected: 0,
        }
    }

    /// Record a photon hit at `global_time`. Returns whether the hit was
    /// recorded; hits with a non-finite time are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmt::detector::PmtSensitiveDetector;
    /// use pmt::waveform::Waveform;
    /// use uom::si::f64::Time;
    /// use uom::si::time::{microsecond, nanosecond};
    ///
    /// let mut waveform = Waveform::builder().bin_width(1.0).total_time(10.0).build()?;
    /// let mut sd = PmtSensitiveDetector::new(&mut waveform);
    ///
    /// assert!(sd.process_hit(Time::new::<microsecond>(0.002)));
    /// assert!(!sd.process_hit(Time::new::<nanosecond>(f64::NAN)));
    /// assert_eq!((sd.hits(), sd.rejected()), (1, 1));
    ///
    /// // 2 ns after the hit, bin 4 starts rising.
    /// assert_eq!(waveform.signal()[2], 0.0);
    /// assert!(waveform.signal()[4] > 0.0);
    /// # Ok::<(), pmt::shape::ConfigError>(())
    /// ```
    pub fn process_hit(&mut self, global_time: Time) -> bool {
        let arrival_time = global_time.get::<nanosecond>();
        match self.waveform.record_photon(arrival_time) {
            Ok(()) => {
                self.hits += 1;
                true
            }
            Err(error) => {
                tracing::warn!("dropping photon hit: {error}");
                self.rejected += 1;
                false
            }
        }
    }

    /// Number of recorded hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of dropped hits.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

/// Destination of the waveform written at the end of each run.
///
/// Every occurrence of `{run}` is replaced by the run index. A pattern without
/// the placeholder names the same file for every run, so each run overwrites
/// the previous one.
///
/// # Examples
///
/// ```
/// use pmt::detector::OutputPattern;
/// use std::path::Path;
///
/// let pattern = OutputPattern::new("out/waveform_{run}.txt");
/// assert_eq!(pattern.path_for(3), Path::new("out/waveform_3.txt"));
///
/// let shared = OutputPattern::default();
/// assert_eq!(shared.path_for(3), Path::new("waveform.txt"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPattern(String);

impl OutputPattern {
    pub const RUN_PLACEHOLDER: &'static str = "{run}";

    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Returns `true` if every run writes to its own file.
    pub fn is_per_run(&self) -> bool {
        self.0.contains(Self::RUN_PLACEHOLDER)
    }

    pub fn path_for(&self, run: usize) -> PathBuf {
        PathBuf::from(self.0.replace(Self::RUN_PLACEHOLDER, &run.to_string()))
    }
}

impl Default for OutputPattern {
    fn default() -> Self {
        Self::new("waveform.txt")
    }
}

impl From<&str> for OutputPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for OutputPattern {
    fn from(pattern: String) -> Self {
        Self::new(pattern)
    }
}

use num_traits::Zero;
use thiserror::Error;

/// Default rise time constant of the single photoelectron response in ns.
pub const DEFAULT_RISE_TIME: f64 = 1.0;
/// Default fall time constant of the single photoelectron response in ns.
pub const DEFAULT_FALL_TIME: f64 = 5.0;
/// Default amplitude of the single photoelectron response.
pub const DEFAULT_AMPLITUDE: f64 = 1.0;

/// A strictly positive value.
///
/// # Examples
///
/// ```
/// use pmt::shape::Positive;
///
/// assert!(Positive::new(1.0).is_some());
/// assert!(Positive::new(0.0).is_none());
/// assert!(Positive::new(f64::NAN).is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Positive<T>(T);

impl<T> Positive<T>
where
    T: Zero + PartialOrd,
{
    /// Returns `None` unless `value` is greater than zero.
    pub fn new(value: T) -> Option<Self> {
        if value > T::zero() {
            Some(Self(value))
        } else {
            None
        }
    }
}

impl<T> Positive<T> {
    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// The error type returned when a waveform is configured with invalid
/// parameters.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bin width must be positive and finite, got {0}")]
    BinWidth(f64),
    #[error("total time must be non-negative and finite, got {0}")]
    TotalTime(f64),
    #[error("too many bins: {total_time} ns window with {bin_width} ns bins")]
    BinCount { total_time: f64, bin_width: f64 },
    #[error("rise time must be positive and finite, got {0}")]
    RiseTime(f64),
    #[error("fall time must be positive and finite, got {0}")]
    FallTime(f64),
    #[error("pulse amplitude must be finite, got {0}")]
    Amplitude(f64),
}

pub(crate) fn positive_finite(value: f64) -> Option<Positive<f64>> {
    Positive::new(value).filter(|v| v.inner().is_finite())
}

/// Analog response of the PMT to a single photoelectron.
///
/// The pulse is causal, rising with time constant `rise_time` and decaying
/// with time constant `fall_time`:
///
/// ```text
/// f(t) = amplitude * exp(-t / fall_time) * (1 - exp(-t / rise_time)),  t >= 0
/// f(t) = 0,                                                            t < 0
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseShape {
    rise_time: Positive<f64>,
    fall_time: Positive<f64>,
    amplitude: f64,
}

impl PulseShape {
    /// Create a new pulse shape. Time constants are in nanoseconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmt::shape::{ConfigError, PulseShape};
    ///
    /// assert!(PulseShape::new(1.0, 5.0, 1.0).is_ok());
    /// assert_eq!(PulseShape::new(0.0, 5.0, 1.0), Err(ConfigError::RiseTime(0.0)));
    /// ```
    pub fn new(rise_time: f64, fall_time: f64, amplitude: f64) -> Result<Self, ConfigError> {
        let rise_time = positive_finite(rise_time).ok_or(ConfigError::RiseTime(rise_time))?;
        let fall_time = positive_finite(fall_time).ok_or(ConfigError::FallTime(fall_time))?;
        if !amplitude.is_finite() {
            return Err(ConfigError::Amplitude(amplitude));
        }

        Ok(Self {
            rise_time,
            fall_time,
            amplitude,
        })
    }

    pub fn rise_time(&self) -> f64 {
        *self.rise_time.inner()
    }

    pub fn fall_time(&self) -> f64 {
        *self.fall_time.inner()
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Returns the pulse value `t` nanoseconds after the photon arrival.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmt::shape::PulseShape;
    ///
    /// let shape = PulseShape::default();
    /// assert_eq!(shape.response(-1.0), 0.0);
    /// assert_eq!(shape.response(0.0), 0.0);
    /// assert!(shape.response(1.0) > 0.0);
    /// ```
    pub fn response(&self, t: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        self.amplitude * (-t / self.fall_time()).exp() * (1.0 - (-t / self.rise_time()).exp())
    }

    /// Time after arrival at which the pulse reaches its extremum.
    ///
    /// Setting the derivative of the response to zero gives
    /// `exp(-t / rise_time) = rise_time / (rise_time + fall_time)`, i.e.
    /// `t = rise_time * ln(1 + fall_time / rise_time)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmt::shape::PulseShape;
    ///
    /// let shape = PulseShape::default();
    /// assert!((shape.peak_time() - 6.0f64.ln()).abs() < 1e-12);
    /// ```
    pub fn peak_time(&self) -> f64 {
        let (rise, fall) = (self.rise_time(), self.fall_time());
        rise * (fall / rise).ln_1p()
    }
}

impl Default for PulseShape {
    /// 1 ns rise, 5 ns fall, unit amplitude.
    fn default() -> Self {
        Self {
            rise_time: Positive(DEFAULT_RISE_TIME),
            fall_time: Positive(DEFAULT_FALL_TIME),
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn positive_new() {
        assert_eq!(Positive::new(1).map(Positive::into_inner), Some(1));
        assert!(Positive::new(0).is_none());
        assert!(Positive::new(-1).is_none());
        assert!(Positive::new(-0.0).is_none());
    }

    #[test]
    fn pulse_shape_invalid() {
        assert_eq!(
            PulseShape::new(-1.0, 5.0, 1.0),
            Err(ConfigError::RiseTime(-1.0))
        );
        assert_eq!(
            PulseShape::new(1.0, 0.0, 1.0),
            Err(ConfigError::FallTime(0.0))
        );
        assert_eq!(
            PulseShape::new(1.0, f64::INFINITY, 1.0),
            Err(ConfigError::FallTime(f64::INFINITY))
        );
        assert!(matches!(
            PulseShape::new(1.0, 5.0, f64::NAN),
            Err(ConfigError::Amplitude(_))
        ));
    }

    #[test]
    fn pulse_shape_default() {
        let shape = PulseShape::default();
        assert_eq!(shape, PulseShape::new(1.0, 5.0, 1.0).unwrap());
    }

    #[test]
    fn pulse_shape_response() {
        let shape = PulseShape::new(2.0, 3.0, 4.0).unwrap();
        let t: f64 = 1.5;
        let expected = 4.0 * (-t / 3.0).exp() * (1.0 - (-t / 2.0).exp());
        assert_eq!(shape.response(t), expected);
        assert_eq!(shape.response(-1e-9), 0.0);
    }

    #[test]
    fn pulse_shape_non_negative_and_decays() {
        let shape = PulseShape::default();
        for i in 0..10_000 {
            let t = f64::from(i) * 0.01;
            assert!(shape.response(t) >= 0.0);
        }
        assert!(shape.response(500.0) < 1e-40);
    }

    fn numerical_argmax(shape: &PulseShape, step: f64, steps: u32) -> f64 {
        (0..steps)
            .map(|i| f64::from(i) * step)
            .map(|t| (t, shape.response(t)))
            .fold((0.0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best })
            .0
    }

    #[test]
    fn pulse_shape_peak_time() {
        let shape = PulseShape::default();
        let expected = 6.0f64.ln();
        assert_relative_eq!(shape.peak_time(), expected);

        let step = 1e-4;
        let argmax = numerical_argmax(&shape, step, 200_000);
        assert!((argmax - expected).abs() < 2.0 * step);
        assert!(shape.response(expected) > shape.response(expected - 0.01));
        assert!(shape.response(expected) > shape.response(expected + 0.01));
    }

    #[test]
    fn pulse_shape_peak_time_other_constants() {
        for (rise, fall) in [(2.0, 2.0), (0.5, 20.0), (4.0, 1.0)] {
            let shape = PulseShape::new(rise, fall, 3.0).unwrap();
            let step = 1e-4;
            let argmax = numerical_argmax(&shape, step, 400_000);
            assert!((argmax - shape.peak_time()).abs() < 2.0 * step);
        }
        let shape = PulseShape::new(2.0, 2.0, 1.0).unwrap();
        assert_relative_eq!(shape.peak_time(), 2.0 * 2.0f64.ln());
    }
}

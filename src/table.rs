use std::fmt;
use thiserror::Error;
use winnow::ascii::{float, newline};
use winnow::combinator::{opt, separated, separated_pair, terminated};
use winnow::error::ContextError;
use winnow::Parser;

// Single line of the exported table. Shared by `Waveform::write_to` and the
// `Display` implementation of `WaveformTable` so both produce the same bytes.
pub(crate) struct Row(pub(crate) f64, pub(crate) f64);

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.0, self.1)
    }
}

/// Completed waveform samples, as written to disk at the end of a run.
///
/// A [`WaveformTable`] is a read-only snapshot. Tables from independent runs
/// with the same binning can be combined with [`merge`](Self::merge).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaveformTable {
    times: Vec<f64>,
    amplitudes: Vec<f64>,
}

/// The error type returned when merging two [`WaveformTable`]s with different
/// time bins.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("expected {expected} rows, found {found}")]
    Length { expected: usize, found: usize },
    #[error("row {row}: expected time {expected}, found {found}")]
    Time {
        row: usize,
        expected: f64,
        found: f64,
    },
}

impl WaveformTable {
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterator over `(time, amplitude)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times
            .iter()
            .copied()
            .zip(self.amplitudes.iter().copied())
    }

    /// Returns the row with the largest amplitude. Ties go to the earliest
    /// row.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmt::table::WaveformTable;
    ///
    /// let table: WaveformTable = [(0.0, 1.0), (1.0, 3.0), (2.0, 3.0)].into_iter().collect();
    /// assert_eq!(table.peak(), Some((1.0, 3.0)));
    /// assert_eq!(WaveformTable::default().peak(), None);
    /// ```
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.rows()
            .reduce(|best, row| if row.1.total_cmp(&best.1).is_gt() { row } else { best })
    }

    /// Add the amplitudes of `other` bin by bin.
    ///
    /// Both tables must have exactly the same time column.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmt::table::WaveformTable;
    ///
    /// let mut total: WaveformTable = [(0.0, 1.0), (1.0, 2.0)].into_iter().collect();
    /// let other: WaveformTable = [(0.0, 0.5), (1.0, 0.5)].into_iter().collect();
    /// total.merge(&other)?;
    ///
    /// assert_eq!(total.amplitudes(), &[1.5, 2.5]);
    /// # Ok::<(), pmt::table::MergeError>(())
    /// ```
    pub fn merge(&mut self, other: &WaveformTable) -> Result<(), MergeError> {
        if self.len() != other.len() {
            return Err(MergeError::Length {
                expected: self.len(),
                found: other.len(),
            });
        }
        if let Some((row, (&expected, &found))) = self
            .times
            .iter()
            .zip(&other.times)
            .enumerate()
            .find(|(_, (a, b))| a != b)
        {
            return Err(MergeError::Time {
                row,
                expected,
                found,
            });
        }

        for (total, amplitude) in self.amplitudes.iter_mut().zip(&other.amplitudes) {
            *total += amplitude;
        }

        Ok(())
    }
}

impl FromIterator<(f64, f64)> for WaveformTable {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (f64, f64)>,
    {
        let (times, amplitudes) = iter.into_iter().unzip();
        Self { times, amplitudes }
    }
}

impl fmt::Display for WaveformTable {
    /// Same format as written by
    /// [`Waveform::export`](crate::waveform::Waveform::export): one
    /// `time\tamplitude` line per bin, newline terminated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (time, amplitude) in self.rows() {
            writeln!(f, "{}", Row(time, amplitude))?;
        }

        Ok(())
    }
}

// As with most plain-text data files, a precise "this line is wrong" is all
// the error context worth reporting.
fn parse_row(input: &mut &str) -> winnow::Result<(f64, f64)> {
    separated_pair(float, '\t', float).parse_next(input)
}

/// The error type returned when parsing a [`WaveformTable`] fails.
#[derive(Debug)]
pub struct ParseError {
    input: String,
    span: std::ops::Range<usize>,
}

impl ParseError {
    fn from_parse(error: winnow::error::ParseError<&str, ContextError>) -> Self {
        let input = error.input().to_string();
        let span = error.char_span();
        Self { input, span }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = annotate_snippets::Level::Error
            .title("invalid waveform row starting here")
            .snippet(
                annotate_snippets::Snippet::source(&self.input)
                    .fold(true)
                    .annotation(annotate_snippets::Level::Error.span(self.span.clone())),
            );
        let renderer = annotate_snippets::Renderer::plain();
        let rendered = renderer.render(message);
        rendered.fmt(f)
    }
}

impl std::error::Error for ParseError {}

impl std::str::FromStr for WaveformTable {
    type Err = ParseError;

    /// Parse a [`WaveformTable`] from the exported text format.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pmt::table::WaveformTable;
    /// # use std::str::FromStr;
    /// let string = std::fs::read_to_string("waveform.txt")?;
    /// let table = WaveformTable::from_str(&string)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let rows: Vec<(f64, f64)> = terminated(separated(0.., parse_row, newline), opt(newline))
            .parse(input)
            .map_err(ParseError::from_parse)?;

        Ok(rows.into_iter().collect())
    }
}

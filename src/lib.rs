use crate::config::WaveformConfig;
use crate::detector::{OutputPattern, PmtSensitiveDetector};
use crate::shape::ConfigError;
use crate::waveform::{ExportError, Waveform};
use bon::bon;
use std::path::Path;
use thiserror::Error;
use uom::si::f64::Time;

/// Waveform configuration.
pub mod config;
/// Sensitive detector and output naming used at run boundaries.
pub mod detector;
/// Single photoelectron pulse shape.
pub mod shape;
/// Exported waveform tables.
pub mod table;
/// PMT waveform accumulator.
pub mod waveform;

/// A trait that defines the interface for an observer of a [`Simulation`].
///
/// The default implementation of all methods is a no-op. Users are expected to
/// override the methods they are interested in.
#[allow(unused_variables)]
pub trait Observer {
    /// Called before the first photon of a run.
    fn on_run_begin(&mut self, run: usize) {}
    /// Called when a photon hit is recorded into the waveform.
    fn on_photon(&mut self, run: usize, time: Time) {}
    /// Called when a photon hit is dropped because its time is not finite.
    fn on_photon_rejected(&mut self, run: usize, time: Time) {}
    /// Called after the last photon of a run, before the waveform is written.
    fn on_run_end(&mut self, run: usize, waveform: &Waveform) {}
    /// Called after the waveform of a run has been written to `path`.
    fn on_export(&mut self, run: usize, path: &Path) {}
}

impl Observer for () {}

/// The error type returned by [`Simulation::run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// The waveform configuration is invalid. No run was started.
    #[error("invalid waveform configuration")]
    Config(#[from] ConfigError),
    /// The waveform of a run couldn't be written. The accumulated waveform is
    /// returned so it can be written somewhere else.
    #[error("failed to write the waveform of run {run}")]
    Export {
        run: usize,
        #[source]
        source: ExportError,
        waveform: Box<Waveform>,
    },
}

/// Sequence of independent runs, each capturing its own PMT waveform.
pub struct Simulation<O> {
    config: WaveformConfig,
    output: OutputPattern,
    observer: O,
}

#[bon]
impl<O> Simulation<O> {
    #[builder]
    pub fn new(
        config: WaveformConfig,
        #[builder(default, into)] output: OutputPattern,
        observer: O,
    ) -> Self {
        Self {
            config,
            output,
            observer,
        }
    }
}

impl<O> Simulation<O>
where
    O: Observer,
{
    /// Process every run in order. Each item of `runs` yields the global times
    /// of the photon hits of one run.
    ///
    /// A fresh waveform is created for every run and written to the path given
    /// by the output pattern when the run ends. The configuration is validated
    /// before the first run starts.
    pub fn run<R, H>(mut self, runs: R) -> Result<O, RunError>
    where
        R: IntoIterator<Item = H>,
        H: IntoIterator<Item = Time>,
    {
        let empty = self.config.build()?;

        for (run, hits) in runs.into_iter().enumerate() {
            tracing::debug!(run, "starting run");
            self.observer.on_run_begin(run);

            let mut waveform = empty.clone();
            let mut sd = PmtSensitiveDetector::new(&mut waveform);
            for time in hits {
                if sd.process_hit(time) {
                    self.observer.on_photon(run, time);
                } else {
                    self.observer.on_photon_rejected(run, time);
                }
            }
            let (hits, rejected) = (sd.hits(), sd.rejected());
            self.observer.on_run_end(run, &waveform);

            let path = self.output.path_for(run);
            if let Err(source) = waveform.export(&path) {
                tracing::error!(run, path = %path.display(), "failed to export waveform");
                return Err(RunError::Export {
                    run,
                    source,
                    waveform: Box::new(waveform),
                });
            }
            tracing::info!(run, hits, rejected, path = %path.display(), "run finished");
            self.observer.on_export(run, &path);
        }

        Ok(self.observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::WaveformTable;
    use std::path::PathBuf;
    use std::str::FromStr;
    use uom::si::time::nanosecond;

    #[derive(Default)]
    struct TestObserver {
        begun: Vec<usize>,
        photons: Vec<(usize, f64)>,
        rejected: Vec<usize>,
        ended: Vec<(usize, Vec<f64>)>,
        exported: Vec<(usize, PathBuf)>,
    }

    impl Observer for TestObserver {
        fn on_run_begin(&mut self, run: usize) {
            self.begun.push(run);
        }

        fn on_photon(&mut self, run: usize, time: Time) {
            self.photons.push((run, time.get::<nanosecond>()));
        }

        fn on_photon_rejected(&mut self, run: usize, _time: Time) {
            self.rejected.push(run);
        }

        fn on_run_end(&mut self, run: usize, waveform: &Waveform) {
            self.ended.push((run, waveform.signal().to_vec()));
        }

        fn on_export(&mut self, run: usize, path: &Path) {
            self.exported.push((run, path.to_path_buf()));
        }
    }

    fn ns(values: &[f64]) -> Vec<Time> {
        values
            .iter()
            .map(|&t| Time::new::<nanosecond>(t))
            .collect()
    }

    fn config() -> WaveformConfig {
        WaveformConfig::builder()
            .bin_width(1.0)
            .total_time(30.0)
            .build()
    }

    #[test]
    fn simulation_one_waveform_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("waveform_{run}.txt");

        let observer = Simulation::builder()
            .config(config())
            .output(pattern.to_str().unwrap())
            .observer(TestObserver::default())
            .build()
            .run([ns(&[2.0]), ns(&[2.0]), ns(&[])])
            .unwrap();

        assert_eq!(observer.begun, vec![0, 1, 2]);
        assert_eq!(observer.photons, vec![(0, 2.0), (1, 2.0)]);
        // The second run doesn't see the photon of the first one.
        assert_eq!(observer.ended[0].1, observer.ended[1].1);
        assert!(observer.ended[2].1.iter().all(|&a| a == 0.0));

        for (run, path) in &observer.exported {
            assert_eq!(*path, dir.path().join(format!("waveform_{run}.txt")));
            let text = std::fs::read_to_string(path).unwrap();
            let table = WaveformTable::from_str(&text).unwrap();
            assert_eq!(table.len(), 30);
            assert_eq!(table.amplitudes(), observer.ended[*run].1.as_slice());
        }
        assert_eq!(observer.exported.len(), 3);
    }

    #[test]
    fn simulation_shared_output_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waveform.txt");

        let observer = Simulation::builder()
            .config(config())
            .output(path.to_str().unwrap())
            .observer(TestObserver::default())
            .build()
            .run([ns(&[1.0, 4.0]), ns(&[10.0])])
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let table = WaveformTable::from_str(&text).unwrap();
        assert_eq!(table.amplitudes(), observer.ended[1].1.as_slice());
        assert!(table.amplitudes()[..10].iter().all(|&a| a == 0.0));
    }

    #[test]
    fn simulation_rejects_non_finite_hits() {
        let dir = tempfile::tempdir().unwrap();

        let observer = Simulation::builder()
            .config(config())
            .output(dir.path().join("wf.txt").to_str().unwrap())
            .observer(TestObserver::default())
            .build()
            .run([ns(&[f64::NAN, 3.0, f64::NEG_INFINITY])])
            .unwrap();

        assert_eq!(observer.photons, vec![(0, 3.0)]);
        assert_eq!(observer.rejected, vec![0, 0]);
        assert!(observer.ended[0].1.iter().all(|a| a.is_finite()));
    }

    #[test]
    fn simulation_invalid_config() {
        let config = WaveformConfig {
            bin_width: 0.0,
            ..config()
        };
        let result = Simulation::builder()
            .config(config)
            .observer(TestObserver::default())
            .build()
            .run([ns(&[1.0])]);

        assert!(matches!(
            result,
            Err(RunError::Config(ConfigError::BinWidth(_)))
        ));
    }

    #[test]
    fn simulation_export_failure_keeps_waveform() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing").join("wf_{run}.txt");

        let result = Simulation::builder()
            .config(config())
            .output(missing.to_str().unwrap())
            .observer(())
            .build()
            .run([ns(&[5.0])]);

        let Err(RunError::Export {
            run,
            source,
            waveform,
        }) = result
        else {
            panic!("expected an export error");
        };
        assert_eq!(run, 0);
        assert_eq!(
            source.path(),
            dir.path().join("missing").join("wf_0.txt").as_path()
        );
        assert!(waveform.signal()[6] > 0.0);

        let retry = dir.path().join("retry.txt");
        waveform.export(&retry).unwrap();
        let table = WaveformTable::from_str(&std::fs::read_to_string(retry).unwrap()).unwrap();
        assert_eq!(table, waveform.snapshot());
    }

    #[test]
    fn simulation_no_runs() {
        let observer = Simulation::builder()
            .config(config())
            .observer(TestObserver::default())
            .build()
            .run(Vec::<Vec<Time>>::new())
            .unwrap();

        assert!(observer.begun.is_empty());
        assert!(observer.exported.is_empty());
    }
}

/// This is a general example of how you would typically capture PMT waveforms
/// for a sequence of runs.
///
/// Usage: `cargo run --example sim -- [config.json]`
use anyhow::{Context, Result};
use pmt::config::WaveformConfig;
use pmt::table::WaveformTable;
use pmt::waveform::Waveform;
use pmt::{Observer, Simulation};
use rand::Rng;
use rand_distr::{Distribution, Exp, Poisson};
use uom::si::f64::Time;
use uom::si::time::nanosecond;

/// Keeps a read-only copy of every completed waveform.
#[derive(Default)]
struct Summary {
    snapshots: Vec<WaveformTable>,
}

impl Observer for Summary {
    fn on_run_end(&mut self, run: usize, waveform: &Waveform) {
        let snapshot = waveform.snapshot();
        if let Some((time, amplitude)) = snapshot.peak() {
            println!("run {run}: peak {amplitude:.3} at {time} ns");
        }
        self.snapshots.push(snapshot);
    }
}

/// Photon arrival times of a single scintillation event: a Poisson number of
/// photons, each delayed by an exponential decay time plus a constant transit
/// time.
fn scintillation<R: Rng>(
    rng: &mut R,
    mean_photons: f64,
    decay_time: f64,
    transit_time: f64,
) -> Result<Vec<Time>> {
    let count = Poisson::new(mean_photons).context("failed to create Poisson distribution")?;
    let decay = Exp::new(1.0 / decay_time).context("failed to create exponential distribution")?;

    let n = count.sample(rng) as usize;
    Ok((0..n)
        .map(|_| Time::new::<nanosecond>(transit_time + decay.sample(rng)))
        .collect())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ===========================================
    // Waveform capture window and single photoelectron response. Optionally
    // read from a JSON file with kebab-case keys.
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read `{path}`"))?;
            WaveformConfig::from_json(&text).with_context(|| format!("failed to parse `{path}`"))?
        }
        None => WaveformConfig::builder()
            .bin_width(0.2)
            .total_time(200.0)
            .build(),
    };
    // ===========================================

    // ===========================================
    // Then, these are properties of your scintillator and light collection:
    let mean_photons = 50.0;
    let decay_time = 2.1;
    let transit_time = 20.0;
    let n_runs = 5;
    // ===========================================

    let mut rng = rand::rng();
    let runs = (0..n_runs)
        .map(|_| scintillation(&mut rng, mean_photons, decay_time, transit_time))
        .collect::<Result<Vec<_>>>()?;

    let summary = Simulation::builder()
        .config(config)
        .output("waveform_{run}.txt")
        .observer(Summary::default())
        .build()
        .run(runs)?;

    let mut snapshots = summary.snapshots.into_iter();
    if let Some(mut total) = snapshots.next() {
        for snapshot in snapshots {
            total.merge(&snapshot)?;
        }
        std::fs::write("waveform_sum.txt", total.to_string())
            .context("failed to write summed waveform")?;
    }

    Ok(())
}

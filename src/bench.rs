//! Benchmark harness: timed multiply calls, CSV output and the closed-form self-test.

use std::{io::Write, time::Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use rayon::ThreadPool;

use crate::{
    backend::MatrixProduct,
    config::BenchConfig,
    error::{validation_error, Result},
    matrix::Matrix,
};

/// Largest relative error the closed-form self-test accepts.
pub const CLOSED_FORM_TOLERANCE: f64 = 1e-6;

/// Timing of one multiply call.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub backend: String,
    pub size: usize,
    pub threads: usize,
    pub tile: usize,
    /// 0-based index of the timed call.
    pub call: usize,
    pub seconds: f64,
    pub gflops: f64,
}

/// Shortest duration a rate is computed over; faster timings are clamped to it.
pub const MIN_SECONDS: f64 = 1e-9;

/// Floating-point rate of an `n x n` multiply: `2 n^3` operations.
pub fn gflops(size: usize, seconds: f64) -> f64 {
    let n = size as f64;
    2.0 * n * n * n / seconds.max(MIN_SECONDS) / 1e9
}

/// Runs `config.warmup` untimed and `config.calls` timed multiplies inside `pool`.
///
/// A and B are random (seeded); C starts at zero and is accumulated into by
/// every call, the way repeated BLAS calls with `beta = 1` behave.
pub fn run(
    config: &BenchConfig,
    kernel: &dyn MatrixProduct<f64>,
    pool: &ThreadPool,
) -> Result<Vec<Measurement>> {
    config.validate()?;
    let size = config.size;
    let threads = pool.current_num_threads();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let a = Matrix::<f64>::random(size, &mut rng)?;
    let b = Matrix::<f64>::random(size, &mut rng)?;
    let mut c = Matrix::<f64>::zeros(size)?;

    info!(
        "benchmarking {} on {}x{} ({} calls, {} warmup, {} threads, tile {})",
        kernel.name(),
        size,
        size,
        config.calls,
        config.warmup,
        threads,
        config.tile
    );

    let mut measurements = Vec::with_capacity(config.calls);
    pool.install(|| {
        for _ in 0..config.warmup {
            kernel.accumulate_multiply(a.as_slice(), b.as_slice(), c.as_mut_slice(), size);
        }
        for call in 0..config.calls {
            let timestamp = Utc::now();
            let start = Instant::now();
            kernel.accumulate_multiply(a.as_slice(), b.as_slice(), c.as_mut_slice(), size);
            let seconds = start.elapsed().as_secs_f64();
            debug!("call {}: {:.6}s", call, seconds);

            measurements.push(Measurement {
                timestamp,
                backend: kernel.name().to_string(),
                size,
                threads,
                tile: config.tile,
                call,
                seconds,
                gflops: gflops(size, seconds),
            });
        }
    });

    Ok(measurements)
}

pub const CSV_HEADER: &str = "timestamp,backend,size,threads,tile,call,seconds,gflops";

/// Writes measurements as CSV with a header line.
pub fn write_csv<W: Write>(mut writer: W, measurements: &[Measurement]) -> Result<()> {
    writeln!(writer, "{}", CSV_HEADER)?;
    for m in measurements {
        writeln!(
            writer,
            "{},{},{},{},{},{},{:.9},{:.6}",
            m.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            m.backend,
            m.size,
            m.threads,
            m.tile,
            m.call,
            m.seconds,
            m.gflops
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Descriptive statistics of call durations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub calls: usize,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    /// Sample standard deviation; zero for a single call.
    pub stddev: f64,
}

impl Summary {
    /// Spread of the call times relative to their mean: `(max - min) / mean`.
    pub fn variability(&self) -> f64 {
        if self.mean > 0.0 {
            (self.max - self.min) / self.mean
        } else {
            0.0
        }
    }
}

pub fn summarize(measurements: &[Measurement]) -> Option<Summary> {
    if measurements.is_empty() {
        return None;
    }
    let calls = measurements.len();
    let seconds = measurements.iter().map(|m| m.seconds);
    let min = seconds.clone().fold(f64::INFINITY, f64::min);
    let max = seconds.clone().fold(f64::NEG_INFINITY, f64::max);
    let mean = seconds.clone().sum::<f64>() / calls as f64;
    let stddev = if calls > 1 {
        let var = seconds.map(|s| (s - mean).powi(2)).sum::<f64>() / (calls - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    Some(Summary {
        calls,
        min,
        mean,
        max,
        stddev,
    })
}

/// Sum of all elements of `A x B` for `A[i][j] = i`, `B[i][j] = i + j`: `n^3 (n-1)^2 / 2`.
pub fn closed_form_sum(size: usize) -> f64 {
    let n = size as f64;
    n * n * n * (n - 1.0) * (n - 1.0) / 2.0
}

/// Multiplies the closed-form inputs once and returns the relative error of the sum of C.
///
/// Fails with a validation error when the error exceeds [`CLOSED_FORM_TOLERANCE`].
pub fn verify_closed_form(kernel: &dyn MatrixProduct<f64>, size: usize) -> Result<f64> {
    let a = Matrix::<f64>::from_fn(size, |i, _| i as f64)?;
    let b = Matrix::<f64>::from_fn(size, |i, j| (i + j) as f64)?;
    let mut c = Matrix::<f64>::zeros(size)?;

    kernel.accumulate_multiply(a.as_slice(), b.as_slice(), c.as_mut_slice(), size);

    let observed = c.sum();
    let expected = closed_form_sum(size);
    let error = if expected == 0.0 {
        observed.abs()
    } else {
        ((observed - expected) / expected).abs()
    };
    debug!(
        "closed form n={}: expected {}, observed {}, error {:e}",
        size, expected, observed, error
    );

    if error > CLOSED_FORM_TOLERANCE {
        return Err(validation_error(format!(
            "{} failed the closed-form check for size {}: expected {}, observed {}",
            kernel.name(),
            size,
            expected,
            observed
        )));
    }
    Ok(error)
}

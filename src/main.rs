//! Benchmark driver: times repeated accumulate-multiply calls of one backend.
//!
//! Prints one elapsed time in seconds per call on stdout; logs go to stderr.

use std::{fs::File, io::BufWriter, process::ExitCode};

use log::{error, info};
use tilemm::{
    bench::{self, summarize},
    config::{BenchConfig, USAGE},
    logging, Result,
};

const VERIFY_SIZES: std::ops::RangeInclusive<usize> = 100..=1500;

fn run(config: BenchConfig) -> Result<()> {
    config.validate()?;
    let pool = config.build_pool()?;
    let kernel = config.backend.build(config.tiles()?, config.threads);

    if config.verify {
        pool.install(|| -> Result<()> {
            for size in VERIFY_SIZES.step_by(100) {
                let err = bench::verify_closed_form(kernel.as_ref(), size)?;
                info!("closed form size={}: relative error {:e}", size, err);
            }
            Ok(())
        })?;
        info!("closed-form self-test OK");
    }

    let measurements = bench::run(&config, kernel.as_ref(), &pool)?;
    for m in &measurements {
        println!("{:.6}", m.seconds);
    }

    if let Some(path) = &config.csv {
        bench::write_csv(BufWriter::new(File::create(path)?), &measurements)?;
        info!("wrote {} measurements to {}", measurements.len(), path.display());
    }

    if let Some(summary) = summarize(&measurements) {
        info!(
            "{} n={}: min {:.6}s, mean {:.6}s, max {:.6}s, stddev {:.6}s, variability {:.4} ({:.2} GFLOPS at mean)",
            kernel.name(),
            config.size,
            summary.min,
            summary.mean,
            summary.max,
            summary.stddev,
            summary.variability(),
            bench::gflops(config.size, summary.mean)
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = logging::init() {
        eprintln!("could not install logger: {e}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let config = BenchConfig::from_env().and_then(|c| c.parse_args(args));
    match config.and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{USAGE}");
            ExitCode::FAILURE
        }
    }
}

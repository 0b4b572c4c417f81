//! Benchmark configuration: defaults, then environment, then command line.

use std::{env, path::PathBuf, str::FromStr};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    backend::Backend,
    error::{config_error, Result},
    tiling::TileConfig,
    DEFAULT_TILE,
};

pub const ENV_BACKEND: &str = "TILEMM_BACKEND";
pub const ENV_SIZE: &str = "TILEMM_SIZE";
pub const ENV_CALLS: &str = "TILEMM_CALLS";
pub const ENV_TILE: &str = "TILEMM_TILE";
pub const ENV_NUM_THREADS: &str = "TILEMM_NUM_THREADS";

/// Settings for one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub backend: Backend,
    /// Matrix extent `n` of the `n x n` operands.
    pub size: usize,
    /// Number of timed multiply calls.
    pub calls: usize,
    /// Untimed calls made before the timed ones.
    pub warmup: usize,
    pub tile: usize,
    /// Worker-pool size. `None` leaves the choice to rayon (`RAYON_NUM_THREADS`
    /// or the number of logical CPUs).
    pub threads: Option<usize>,
    pub seed: u64,
    /// Run the closed-form self-test before benchmarking.
    pub verify: bool,
    pub csv: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            backend: Backend::Blocked,
            size: 1000,
            calls: 10,
            warmup: 1,
            tile: DEFAULT_TILE,
            threads: None,
            seed: 42,
            verify: false,
            csv: None,
        }
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| config_error(key, raw, "could not parse value"))
}

impl BenchConfig {
    /// Defaults overlaid with the `TILEMM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_vars(|key| env::var(key).ok())
    }

    /// Overlays values looked up through `lookup` (an environment stand-in).
    pub fn with_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_BACKEND) {
            self.backend = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_SIZE) {
            self.size = parse_value(ENV_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CALLS) {
            self.calls = parse_value(ENV_CALLS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TILE) {
            self.tile = parse_value(ENV_TILE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_NUM_THREADS) {
            self.threads = Some(parse_value(ENV_NUM_THREADS, &raw)?);
        }
        Ok(self)
    }

    /// Overlays command-line options (without the program name).
    pub fn parse_args<I, S>(mut self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        while let Some(flag) = args.next() {
            if flag == "--verify" {
                self.verify = true;
                continue;
            }
            let value = args
                .next()
                .ok_or_else(|| config_error(flag.as_str(), "", "missing value"))?;
            match flag.as_str() {
                "--backend" => self.backend = value.parse()?,
                "--size" => self.size = parse_value(&flag, &value)?,
                "--calls" => self.calls = parse_value(&flag, &value)?,
                "--warmup" => self.warmup = parse_value(&flag, &value)?,
                "--tile" => self.tile = parse_value(&flag, &value)?,
                "--threads" => self.threads = Some(parse_value(&flag, &value)?),
                "--seed" => self.seed = parse_value(&flag, &value)?,
                "--csv" => self.csv = Some(PathBuf::from(value)),
                _ => return Err(config_error(flag.as_str(), value, "unknown option")),
            }
        }
        Ok(self)
    }

    /// Rejects values that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(config_error("size", "0", "matrix size must be positive"));
        }
        if self.calls == 0 {
            return Err(config_error("calls", "0", "at least one call is required"));
        }
        if self.tile == 0 {
            return Err(config_error("tile", "0", "tile extent must be positive"));
        }
        if self.threads == Some(0) {
            return Err(config_error("threads", "0", "worker pool needs a thread"));
        }
        Ok(())
    }

    pub fn tiles(&self) -> Result<TileConfig> {
        TileConfig::new(self.tile)
    }

    /// Builds the process-scope worker pool the kernel runs in.
    pub fn build_pool(&self) -> Result<ThreadPool> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("tilemm-worker-{i}"));
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        builder.build().map_err(|e| {
            config_error(
                "threads",
                format!("{:?}", self.threads),
                format!("could not build worker pool: {e}"),
            )
        })
    }
}

pub const USAGE: &str = "\
Usage: tilemm [options]

Options:
  --backend <blocked|reference|ndarray>   multiply implementation (default: blocked)
  --size <n>                              matrix extent (default: 1000)
  --calls <n>                             timed calls (default: 10)
  --warmup <n>                            untimed warmup calls (default: 1)
  --tile <n>                              tile extent of the blocked kernel (default: 128)
  --threads <n>                           worker-pool size (default: rayon's choice)
  --seed <n>                              RNG seed for the input matrices (default: 42)
  --csv <path>                            also write measurements as CSV
  --verify                                run the closed-form self-test first

Environment: TILEMM_BACKEND, TILEMM_SIZE, TILEMM_CALLS, TILEMM_TILE,
TILEMM_NUM_THREADS, TILEMM_LOG (error|warn|info|debug|trace).";

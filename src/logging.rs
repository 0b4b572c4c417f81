//! Minimal `log` backend for the benchmark binary.
//!
//! The library only talks to the `log` facade; this logger is installed by
//! the binary and writes `[LEVEL target] message` lines to stderr, leaving
//! stdout for the timing output.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

pub const ENV_LOG: &str = "TILEMM_LOG";

#[derive(Debug)]
pub struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    pub fn new(level: LevelFilter) -> Self {
        StderrLogger { level }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        // A failed write to stderr has nowhere better to go.
        let _ = writeln!(
            stderr,
            "[{:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Parses a `TILEMM_LOG` value, falling back to `info`.
pub fn level_from_str(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|s| s.trim().parse::<Level>().ok())
        .map(|level| level.to_level_filter())
        .unwrap_or(LevelFilter::Info)
}

/// Installs [`StderrLogger`] as the global logger with the level from `TILEMM_LOG`.
pub fn init() -> Result<(), SetLoggerError> {
    let level = level_from_str(std::env::var(ENV_LOG).ok().as_deref());
    log::set_boxed_logger(Box::new(StderrLogger::new(level)))?;
    log::set_max_level(level);
    Ok(())
}

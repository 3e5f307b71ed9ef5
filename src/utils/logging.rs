// Tue Jan 13 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::thread;

pub struct LoggingUtils;

impl LoggingUtils {
    pub fn init_logger(level: LevelFilter) {
        let logger = Box::new(ColoredLogger::new(level));
        log::set_boxed_logger(logger).ok();
        log::set_max_level(level);
    }

    /// Honours `RUST_LOG` when it is set, otherwise falls back to the colored
    /// logger at `fallback`.
    pub fn init_from_env_or(fallback: LevelFilter) {
        if std::env::var_os("RUST_LOG").is_some() {
            env_logger::try_init().ok();
        } else {
            Self::init_logger(fallback);
        }
    }

    pub fn level_from_str(s: &str) -> LevelFilter {
        match s.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }

    /// `-v` flags raise the configured base level one step each.
    pub fn level_from_verbosity(base: LevelFilter, verbosity: u8) -> LevelFilter {
        let levels = [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
            LevelFilter::Trace,
        ];
        let start = levels.iter().position(|l| *l == base).unwrap_or(3);
        let index = (start + verbosity as usize).min(levels.len() - 1);
        levels[index]
    }
}

struct ColoredLogger {
    level: LevelFilter,
}

impl ColoredLogger {
    fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    fn format_level(&self, level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

impl Log for ColoredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_str = self.format_level(record.level());

        // Sessions and forwarders run on threads named after their process.
        let current = thread::current();
        let origin = current.name().unwrap_or_else(|| record.target());

        eprintln!("{} {} {}", level_str, format!("[{}]", origin).dimmed(), record.args());
    }

    fn flush(&self) {}
}

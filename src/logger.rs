//! Process-wide logging.
//!
//! `log` records from this crate (the `log_*!` macros) and `tracing` spans from
//! the request handlers end up in the same log file. Log lines are mirrored to
//! stdout unless the CLI asked for quiet output.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{LazyLock, OnceLock};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_TRACING_FILTER: &str = "code_scribe=debug,warn";
const NOISY_TARGETS: &[&str] = &[
    "reqwest", "hyper", "h2", "rustls", "tower", "want", "mio", "axum::rejection",
];

#[derive(Default)]
struct LogSettings {
    enabled: bool,
    to_stdout: bool,
    verbose: bool,
    file: Option<File>,
}

impl LogSettings {
    fn write_file(&mut self, bytes: &[u8]) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(bytes);
            let _ = file.flush();
        }
    }
}

static SETTINGS: LazyLock<Mutex<LogSettings>> = LazyLock::new(Mutex::default);
static LOGGER: AgentLogger = AgentLogger;

/// Target of the `log` facade
struct AgentLogger;

impl log::Log for AgentLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let settings = SETTINGS.lock();
        if !settings.enabled {
            return false;
        }
        if metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return metadata.level() <= Level::Debug;
        }
        if !settings.verbose && is_noisy_target(metadata.target()) {
            return false;
        }
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(record.level(), record.target(), &record.args().to_string());
        let mut settings = SETTINGS.lock();
        settings.write_file(line.as_bytes());
        if settings.to_stdout {
            print!("{line}");
        }
    }

    fn flush(&self) {}
}

/// `tracing` output goes to the log file only
#[derive(Clone, Copy)]
struct SpanSink;

impl Write for SpanSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SETTINGS.lock().write_file(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SpanSink {
    type Writer = SpanSink;

    fn make_writer(&'a self) -> Self::Writer {
        *self
    }
}

fn format_line(level: Level, target: &str, message: &str) -> String {
    format!(
        "{} {:<5} [{}] {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        target,
        message
    )
}

/// HTTP stack targets that are only shown with verbose logging
fn is_noisy_target(target: &str) -> bool {
    NOISY_TARGETS.iter().any(|prefix| target.starts_with(prefix))
}

/// Install the `log` logger and the `tracing` subscriber. Safe to call more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    static INIT_RESULT: OnceLock<Result<(), String>> = OnceLock::new();

    let result = INIT_RESULT.get_or_init(|| {
        if std::env::var("CODE_SCRIBE_VERBOSE").is_ok() {
            set_verbose_logging(true);
        }
        enable_logging();
        set_log_to_stdout(true);

        // Claim the `log` facade before the subscriber's log bridge can
        let log_result =
            log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Debug));

        let span_layer = fmt::Layer::new()
            .with_target(true)
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .with_writer(SpanSink);
        let tracing_result = Registry::default()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| DEFAULT_TRACING_FILTER.into()),
            )
            .with(span_layer)
            .try_init();

        match (log_result, tracing_result) {
            (Ok(()), _) | (Err(_), Ok(())) => Ok(()),
            (Err(log_err), Err(tracing_err)) => Err(format!(
                "Failed to initialize logging: log={log_err}, tracing={tracing_err}"
            )),
        }
    });

    result.clone().map_err(Into::into)
}

pub fn enable_logging() {
    SETTINGS.lock().enabled = true;
}

pub fn set_verbose_logging(enabled: bool) {
    SETTINGS.lock().verbose = enabled;
}

pub fn set_log_to_stdout(enabled: bool) {
    SETTINGS.lock().to_stdout = enabled;
}

/// Append log lines to `file_path`, creating its parent directory if needed
pub fn set_log_file(file_path: &str) -> io::Result<()> {
    if let Some(parent) = Path::new(file_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    SETTINGS.lock().file = Some(file);
    Ok(())
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

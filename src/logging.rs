//! Console logging plus an optional per-run log file
//!
//! Every invocation logs to stdout. With `--log-file` the same events also go
//! to `<data dir>/logs/<run>.log`, where `<run>` names the subcommand, so a
//! rate test and a preset run never interleave in one file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::APP_NAME;

/// A run log past this size is started over rather than appended to
const MAX_RUN_LOG_BYTES: u64 = 1024 * 1024;

/// Level used when `RUST_LOG` is unset: 0 = info, 1 = debug, 2+ = trace
pub fn verbosity(debug: u8) -> LevelFilter {
    match debug {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// File name for a run's log, with anything outside `[a-z0-9_-]` folded to `-`
pub fn run_log_name(run: &str) -> String {
    let stem: String = run
        .trim()
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '_' | '-') => c,
            _ => '-',
        })
        .collect();
    if stem.is_empty() {
        format!("{}.log", APP_NAME)
    } else {
        format!("{}.log", stem)
    }
}

/// Install the global subscriber.
///
/// `run` names the log file when `to_file` is set. The returned guard flushes
/// the file writer on drop and must outlive every log call.
pub fn init_logging(run: &str, to_file: bool, debug: u8) -> io::Result<Option<WorkerGuard>> {
    let run_log = if to_file {
        Some(open_run_log(&log_directory()?, run)?)
    } else {
        None
    };

    let (file_layer, guard, path) = match run_log {
        Some((path, file)) => {
            let (writer, guard) = tracing_appender::non_blocking(BufWriter::new(file));
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard), Some(path))
        }
        None => (None, None, None),
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity(debug).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stdout))
        .with(file_layer)
        .init();

    if let Some(path) = path {
        tracing::info!("Logging this run to {}", path.display());
    }

    Ok(guard)
}

fn log_directory() -> io::Result<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("logs"))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory for run logs"))
}

/// Open `<dir>/<run>.log` for appending, starting it over once it has grown
/// past [`MAX_RUN_LOG_BYTES`].
fn open_run_log(dir: &Path, run: &str) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(run_log_name(run));

    let oversized = match fs::metadata(&path) {
        Ok(meta) => meta.len() > MAX_RUN_LOG_BYTES,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };

    let mut options = OpenOptions::new();
    options.create(true);
    if oversized {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    let file = options.open(&path)?;
    Ok((path, file))
}

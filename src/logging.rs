//! Log setup and timestamp formatting
//!
//! Console logging goes through [`crate::init_logging`]. For long-running
//! sessions the SDK can also write a daily debug file, `debug_DDMMYYYY.txt`
//! under a directory of the caller's choice.

use chrono::{Local, NaiveDateTime};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const INIT_BANNER: &str = "============================================\nInitialized logger\n==================================================\n";

/// `DD/MM/YYYY HH:MM:SS`
pub fn format_date_time(at: &NaiveDateTime) -> String {
    at.format("%d/%m/%Y %H:%M:%S").to_string()
}

/// `Mon DD YYYY HH:MM:SS`, e.g. `Feb 18 2019 15:15:00`
pub fn format_date_time_long(at: &NaiveDateTime) -> String {
    at.format("%b %d %Y %H:%M:%S").to_string()
}

/// Daily log file name, `debug_DDMMYYYY.txt`
pub fn log_file_name(at: &NaiveDateTime) -> String {
    at.format("debug_%d%m%Y.txt").to_string()
}

/// Create `dir` if needed and append a banner to the day's log file.
///
/// A fresh file gets the initialization banner; an existing one gets a
/// run marker so separate runs on the same day can be told apart.
pub fn open_log_file(dir: impl AsRef<Path>, at: &NaiveDateTime) -> io::Result<(PathBuf, File)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(log_file_name(at));
    let banner = if path.exists() {
        format!(
            "============================================\n RUN the application on {}\n==================================================\n",
            format_date_time_long(at)
        )
    } else {
        INIT_BANNER.to_string()
    };

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(banner.as_bytes())?;
    Ok((path, file))
}

/// Install a global subscriber writing to today's file under `dir`.
///
/// Fails if the file cannot be opened or a global subscriber is already
/// installed. Nothing else in the SDK depends on this succeeding.
pub fn init_file_logging(dir: impl AsRef<Path>) -> io::Result<PathBuf> {
    let (path, file) = open_log_file(dir, &Local::now().naive_local())?;

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    tracing::info!("logger module initialized successfully, writing to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 2, 8)
            .unwrap()
            .and_hms_opt(5, 7, 9)
            .unwrap()
    }

    #[test]
    fn test_formats_pad_fields() {
        assert_eq!(format_date_time(&at()), "08/02/2019 05:07:09");
        assert_eq!(format_date_time_long(&at()), "Feb 08 2019 05:07:09");
        assert_eq!(log_file_name(&at()), "debug_08022019.txt");
    }

    #[test]
    fn test_banner_then_run_marker() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");

        let (path, _) = open_log_file(&logs, &at()).unwrap();
        assert_eq!(path, logs.join("debug_08022019.txt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), INIT_BANNER);

        open_log_file(&logs, &at()).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with(INIT_BANNER));
        assert!(contents.contains("RUN the application on Feb 08 2019 05:07:09"));
    }
}

//! Session transition log.
//!
//! Optional append-only file with one timestamped line per operation start,
//! operation failure and provider notification. Useful when chasing
//! last-notification-wins races after the fact.

use chrono::{SecondsFormat, Utc};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex},
};

/// File name used inside the configured log directory.
pub const TRANSITION_LOG_FILE: &str = "session.log";

/// Thread-safe handle to an append-only log file. `None` disables logging.
pub type TransitionLog = Arc<Mutex<Option<File>>>;

/// A handle that discards everything.
pub fn disabled() -> TransitionLog {
    Arc::new(Mutex::new(None))
}

/// Current UTC time as ISO 8601 with milliseconds (e.g. 2026-02-04T10:15:30.123Z).
fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write a timestamped line to the log file (if present).
pub fn log_transition(handle: &TransitionLog, label: &str, detail: &str) {
    if let Ok(mut guard) = handle.lock() {
        if let Some(ref mut file) = *guard {
            let ts = utc_timestamp();
            if let Err(e) = writeln!(file, "[{}] {}: {}", ts, label, detail).and_then(|()| file.flush())
            {
                log::warn!("Failed to write session transition log: {}", e);
            }
        }
    }
}

/// Open (or create) `{log_dir}/session.log` and return a shared handle.
///
/// Any failure to create the directory or file disables logging rather
/// than failing the caller.
pub fn open_transition_log(log_dir: Option<&Path>) -> TransitionLog {
    let file = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("Cannot create log dir {}: {}", dir.display(), e);
            return None;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(TRANSITION_LOG_FILE))
            .map_err(|e| log::warn!("Cannot open session log in {}: {}", dir.display(), e))
            .ok()
    });
    Arc::new(Mutex::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_log(dir: &Path) -> String {
        std::fs::read_to_string(dir.join(TRANSITION_LOG_FILE)).unwrap()
    }

    #[test]
    fn utc_timestamp_format() {
        let ts = utc_timestamp();
        // YYYY-MM-DDTHH:MM:SS.mmmZ
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), 24);
        assert_eq!(&ts[10..11], "T");
        assert_eq!(&ts[19..20], ".");
    }

    #[test]
    fn open_creates_file_and_dirs() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("logs").join("auth");

        let handle = open_transition_log(Some(&nested));
        assert!(handle.lock().unwrap().is_some());
        assert!(nested.join(TRANSITION_LOG_FILE).exists());
    }

    #[test]
    fn open_without_dir_is_disabled() {
        let handle = open_transition_log(None);
        assert!(handle.lock().unwrap().is_none());
    }

    #[test]
    fn lines_are_appended() {
        let dir = tempdir().unwrap();
        let handle = open_transition_log(Some(dir.path()));
        log_transition(&handle, "STARTED", "signOut");
        log_transition(&handle, "NOTIFIED", "unauthenticated");

        let contents = read_log(dir.path());
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("STARTED: signOut"));
        assert!(lines[1].ends_with("NOTIFIED: unauthenticated"));
    }

    #[test]
    fn reopening_appends() {
        let dir = tempdir().unwrap();
        log_transition(&open_transition_log(Some(dir.path())), "A", "1");
        log_transition(&open_transition_log(Some(dir.path())), "B", "2");
        assert_eq!(read_log(dir.path()).lines().count(), 2);
    }

    #[test]
    fn disabled_handle_is_silent() {
        log_transition(&disabled(), "STARTED", "signOut");
    }
}

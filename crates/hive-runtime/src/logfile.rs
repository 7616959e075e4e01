// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Per-service append-only log files (§6 `LOGON`/`LOGOFF`).
//!
//! Grounded on `skynet_log.c`'s `skynet_log_open`/`_close`: a file named
//! `<handle-in-hex>.log` under the `logpath` environment key (§6, set via `SETENV`, not a
//! config key), opened in append mode on `LOGON` and closed on `LOGOFF`. This is a
//! service-side feature layered on top of the ambient `tracing` backbone (§AMBIENT
//! /Logging) - it does not replace it, and has nothing to do with the `logger` config key
//! or `HIVE_LOG`.

use hive_core::Handle;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::Write,
    path::PathBuf,
};

#[derive(Debug, Default)]
pub struct LogFiles {
    open: Mutex<HashMap<Handle, File>>,
}

impl LogFiles {
    #[must_use]
    pub fn new() -> Self { LogFiles::default() }

    /// Opens `<logpath>/<handle>.log` in append mode, unless it's already open for this
    /// handle or no `logpath` is configured. Returns whether a file is open afterward.
    pub fn logon(&self, logpath: Option<&str>, handle: Handle) -> bool {
        let mut open = self.open.lock();
        if open.contains_key(&handle) {
            return true;
        }
        let Some(logpath) = logpath else { return false };
        let path = PathBuf::from(logpath).join(format!("{:08x}.log", handle.raw()));
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "open time: {:?}", std::time::SystemTime::now());
                open.insert(handle, file);
                true
            }
            Err(err) => {
                tracing::warn!(%handle, path = %path.display(), %err, "failed to open service log file");
                false
            }
        }
    }

    /// Closes the log file for `handle`, if one is open. Returns whether a file had been
    /// open.
    pub fn logoff(&self, handle: Handle) -> bool {
        let mut open = self.open.lock();
        match open.remove(&handle) {
            Some(mut file) => {
                let _ = writeln!(file, "close time: {:?}", std::time::SystemTime::now());
                true
            }
            None => false,
        }
    }

    /// Appends one line of free-form text to `handle`'s log file, if it has one open.
    /// This is how a service's own `Text` messages get recorded, mirroring
    /// `service_logger.c`'s `PTYPE_TEXT` branch.
    pub fn write_line(&self, handle: Handle, source: Handle, line: &str) {
        let mut open = self.open.lock();
        if let Some(file) = open.get_mut(&handle) {
            let _ = writeln!(file, "[{source}] {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn logon_without_logpath_configured_fails() {
        let files = LogFiles::new();
        assert!(!files.logon(None, Handle::from(1)));
    }

    #[test]
    fn logon_then_logoff_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let files = LogFiles::new();
        let handle = Handle::from(1);
        assert!(files.logon(Some(dir.path().to_str().unwrap()), handle));
        assert!(dir.path().join("00000001.log").exists());
        assert!(files.logoff(handle));
        assert!(!files.logoff(handle), "second logoff finds nothing open");
    }

    #[test]
    fn repeated_logon_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let files = LogFiles::new();
        let handle = Handle::from(1);
        let path = dir.path().to_str().unwrap();
        assert!(files.logon(Some(path), handle));
        assert!(files.logon(Some(path), handle));
        assert_eq!(files.open.lock().len(), 1);
    }

    #[test]
    fn write_line_without_open_file_is_a_silent_no_op() {
        let files = LogFiles::new();
        files.write_line(Handle::from(1), Handle::from(2), "hello");
    }
}

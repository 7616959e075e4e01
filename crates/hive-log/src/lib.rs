// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Structured logging backbone (ambient stack, §AMBIENT/Logging).
//!
//! Every subsystem logs through the `tracing` facade; this crate owns the one place
//! that turns a [`LogConfig`] into an installed global subscriber, following the
//! teacher's `tui::core::log::tracing_init` shape: an `EnvFilter` layer plus a display
//! or file `fmt` layer, composed with `tracing_subscriber::registry()`.
//!
//! Unlike the teacher, the file (or stdout) layer here is wrapped in a
//! [`tracing_subscriber::reload::Layer`] so [`LogHandle::reopen`] can swap it for a
//! freshly opened appender without tearing down the whole subscriber - this is how
//! `SIGHUP`'s "reopen the log file" contract (§6) is modeled.

mod config;
mod error;

pub use config::{LogConfig, LogTarget};
pub use error::{LogError, Result};

use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{
    fmt,
    fmt::writer::BoxMakeWriter,
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedFmtLayer = Box<dyn Layer<Registry> + Send + Sync>;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Handle to the installed subscriber, returned by [`LogHandle::init`]. Kept around by
/// the caller (typically `hive-runtime::bootstrap`) so a later `SIGHUP` can call
/// [`LogHandle::reopen`].
pub struct LogHandle {
    config: LogConfig,
    reload: reload::Handle<BoxedFmtLayer, Registry>,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle").field("config", &self.config).finish_non_exhaustive()
    }
}

impl LogHandle {
    /// Installs the global `tracing` subscriber. May be called at most once per
    /// process; a second call returns [`LogError::AlreadyInstalled`].
    pub fn init(config: LogConfig) -> Result<Self> {
        if INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(LogError::AlreadyInstalled);
        }

        let env_filter = match EnvFilter::try_from_env("HIVE_LOG") {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&config.filter)?,
        };

        let fmt_layer = build_fmt_layer(&config)?;
        let (reloadable, reload) = reload::Layer::new(fmt_layer);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(reloadable)
            .try_init()
            .map_err(|_| {
                INSTALLED.store(false, Ordering::SeqCst);
                LogError::AlreadyInstalled
            })?;

        Ok(LogHandle { config, reload })
    }

    /// Reopens the configured target: a fresh file handle for [`LogTarget::File`]
    /// (so an external `logrotate`-style rename-and-recreate is picked up), a no-op
    /// re-wire for [`LogTarget::Stdout`]. Called in response to the process receiving
    /// `SIGHUP` (§6).
    pub fn reopen(&self) -> Result<()> {
        let fresh = build_fmt_layer(&self.config)?;
        self.reload.reload(fresh)?;
        tracing::info!(target: "hive_log", "log layer reopened");
        Ok(())
    }
}

fn build_fmt_layer(config: &LogConfig) -> Result<BoxedFmtLayer> {
    match &config.target {
        LogTarget::Stdout => {
            Ok(Box::new(fmt::layer().with_writer(std::io::stdout)))
        }
        LogTarget::File(path) => {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or_else(|| LogError::NoParentDirectory(path.clone()))?;
            let file_name =
                path.file_name().ok_or_else(|| LogError::NoFileName(path.clone()))?;
            let appender = tracing_appender::rolling::never(parent, file_name);
            Ok(Box::new(
                fmt::layer().with_writer(BoxMakeWriter::new(appender)).with_ansi(false),
            ))
        }
    }
}

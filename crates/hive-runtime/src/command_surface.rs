// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! The text command surface every service can issue against the runtime (§6 "Command
//! channel to a service").
//!
//! Grounded on `skynet_server.c`'s `cmd_funcs[]`/`skynet_command`: a flat table of
//! `(name, handler)` pairs, each given the issuing context plus a free-form parameter
//! string and returning an optional result string. This is a separate surface from the
//! per-service [`hive_core::MessageHandler::handle`] callback - it's the runtime's own
//! "syscall" API (what Lua's `skynet.command()` calls into), not a message a service
//! receives in its mailbox.

use crate::{env::Env, logfile::LogFiles};
use hive_core::{Context, GlobalQueue, Handle, Message, MessageType, Registry, Session};
use hive_module::ModuleRegistry;
use hive_timer::TimerService;
use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

/// Everything the command surface needs to reach: the registry and queue every other
/// crate already shares, plus the three pieces of state that live only here
/// ([`Env`], [`LogFiles`], and the `monitor_exit` handle).
#[derive(Debug)]
pub struct CommandSurface {
    registry: Arc<Registry>,
    queue: Arc<GlobalQueue>,
    timer: Arc<TimerService>,
    modules: Arc<ModuleRegistry>,
    env: Arc<Env>,
    logfiles: LogFiles,
    /// `0` means "no monitor configured" - matches `G_NODE.monitor_exit`'s use of handle
    /// `0` as a sentinel.
    monitor_exit: AtomicU32,
    start_time: SystemTime,
}

impl CommandSurface {
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        queue: Arc<GlobalQueue>,
        timer: Arc<TimerService>,
        modules: Arc<ModuleRegistry>,
        env: Arc<Env>,
    ) -> Self {
        CommandSurface {
            registry,
            queue,
            timer,
            modules,
            env,
            logfiles: LogFiles::new(),
            monitor_exit: AtomicU32::new(0),
            start_time: SystemTime::now(),
        }
    }

    /// Dispatches one command issued by `caller`. `param` is the raw trailing text, same
    /// as `skynet_command`'s third argument - callers are expected to have already split
    /// off the command name.
    pub fn command(&self, caller: &Context, name: &str, param: &str) -> Option<String> {
        let param = param.trim();
        match name {
            "TIMEOUT" => self.timeout(caller, param),
            "REG" => self.reg(caller, param),
            "QUERY" => self.query(param),
            "NAME" => self.name(param),
            "EXIT" => {
                self.kill(caller.handle);
                None
            }
            "KILL" => {
                if let Some(handle) = self.tohandle(param) {
                    self.kill(handle);
                }
                None
            }
            "LAUNCH" => self.launch(param),
            "GETENV" => self.env.get(param),
            "SETENV" => {
                self.setenv(param);
                None
            }
            "STARTTIME" => Some(self.start_time_secs().to_string()),
            "ABORT" => {
                self.registry.retire_all();
                None
            }
            "MONITOR" => self.monitor(param),
            "STAT" => self.stat(caller, param),
            "LOGON" => {
                if let Some(handle) = self.tohandle(param) {
                    self.logfiles.logon(self.env.get("logpath").as_deref(), handle);
                }
                None
            }
            "LOGOFF" => {
                if let Some(handle) = self.tohandle(param) {
                    self.logfiles.logoff(handle);
                }
                None
            }
            "SIGNAL" => {
                self.signal(param);
                None
            }
            _ => None,
        }
    }

    fn timeout(&self, caller: &Context, param: &str) -> Option<String> {
        let ticks: i32 = param.parse().ok()?;
        let session = caller.next_session();
        self.timer.timeout(caller.handle, session, ticks);
        Some(session.get().to_string())
    }

    fn reg(&self, caller: &Context, param: &str) -> Option<String> {
        if param.is_empty() {
            return Some(caller.handle.to_string());
        }
        let name = param.strip_prefix('.')?;
        match self.registry.register_name(name, caller.handle) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(%err, name, "REG failed");
                None
            }
        }
    }

    fn query(&self, param: &str) -> Option<String> {
        let name = param.strip_prefix('.')?;
        self.registry.find_name(name).map(|h| h.to_string())
    }

    fn name(&self, param: &str) -> Option<String> {
        let mut tokens = param.split_whitespace();
        let name = tokens.next()?.strip_prefix('.')?;
        let handle = tokens.next()?;
        let handle = self.tohandle(handle)?;
        self.registry.register_name(name, handle).ok();
        None
    }

    /// Parses a `:hex` or `.name` handle reference, matching `tohandle` in
    /// `skynet_server.c`.
    fn tohandle(&self, param: &str) -> Option<Handle> {
        if let Some(hex) = param.strip_prefix(':') {
            u32::from_str_radix(hex, 16).ok().map(Handle::from)
        } else if let Some(name) = param.strip_prefix('.') {
            self.registry.find_name(name)
        } else {
            None
        }
    }

    /// Common tail of `EXIT`/`KILL`: notify the configured monitor, then mark the target
    /// for release. The actual teardown (`Context::release_ref`, `Registry::retire`)
    /// happens on the worker thread that next dispatches this mailbox (§4.3), same
    /// separation `hive_dispatch::worker::Worker::dispatch_one` already implements for
    /// every other release path.
    fn kill(&self, handle: Handle) {
        let monitor = self.monitor_exit.load(Ordering::SeqCst);
        if monitor != 0 {
            let _ = hive_dispatch::send(
                &self.registry,
                &self.queue,
                Handle::NONE,
                Handle::from(monitor),
                Session::PUSH,
                MessageType::Trace,
                Vec::new(),
            );
        }
        let Some(ctx) = self.registry.grab(handle) else { return };
        ctx.mailbox.mark_release(&self.queue);
        ctx.release_ref();
    }

    /// `LAUNCH module args`: registers a fresh context, then hands it to the module
    /// registry to build and install a handler. On failure the half-built context is torn
    /// down through the same release path [`CommandSurface::kill`] uses, rather than left
    /// registered with no handler.
    fn launch(&self, param: &str) -> Option<String> {
        let mut parts = param.splitn(2, char::is_whitespace);
        let module = parts.next()?.trim();
        if module.is_empty() {
            return None;
        }
        let args = parts.next().unwrap_or("").trim();

        let ctx = self.registry.register(|h| Context::new(h, module)).ok()?;
        match self.modules.launch(module, &ctx, args) {
            Ok(()) => {
                ctx.release_ref();
                Some(ctx.handle.to_string())
            }
            Err(err) => {
                tracing::warn!(%err, module, "LAUNCH failed");
                ctx.mailbox.mark_release(&self.queue);
                ctx.release_ref();
                None
            }
        }
    }

    fn setenv(&self, param: &str) -> Option<()> {
        let mut parts = param.splitn(2, char::is_whitespace);
        let key = parts.next()?;
        let value = parts.next().unwrap_or("").trim();
        if let Err(err) = self.env.set(key, value) {
            tracing::warn!(%err, key, "SETENV failed");
        }
        Some(())
    }

    fn start_time_secs(&self) -> u64 {
        self.start_time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    }

    fn monitor(&self, param: &str) -> Option<String> {
        if param.is_empty() {
            let current = self.monitor_exit.load(Ordering::SeqCst);
            return (current != 0).then(|| Handle::from(current).to_string());
        }
        let handle = self.tohandle(param).unwrap_or(Handle::NONE);
        self.monitor_exit.store(handle.raw(), Ordering::SeqCst);
        None
    }

    fn stat(&self, caller: &Context, param: &str) -> Option<String> {
        match param {
            "mqlen" => Some(caller.mailbox.len().to_string()),
            "endless" => {
                let was_endless = caller.endless();
                caller.clear_endless();
                Some(if was_endless { "1" } else { "0" }.to_string())
            }
            "cpu" => Some(format!("{:.6}", f64::from(caller.cpu_cost_us()) / 1_000_000.0)),
            // The original additionally reports elapsed time for the *currently running*
            // dispatch via a thread-local start timestamp; this port's synchronous
            // `Context::dispatch` has no mid-call hook to sample that from, so `time`
            // reports the same accumulated total as `cpu` whenever profiling is on.
            "time" => Some(if caller.profile_enabled() {
                format!("{:.6}", f64::from(caller.cpu_cost_us()) / 1_000_000.0)
            } else {
                "0".to_string()
            }),
            "message" => Some(caller.message_count().to_string()),
            _ => Some(String::new()),
        }
    }

    fn signal(&self, param: &str) -> Option<()> {
        let mut parts = param.splitn(2, char::is_whitespace);
        let handle = self.tohandle(parts.next()?)?;
        let sig: i32 = parts.next().unwrap_or("0").trim().parse().unwrap_or(0);
        let ctx = self.registry.grab(handle)?;
        ctx.signal(sig);
        ctx.release_ref();
        Some(())
    }
}

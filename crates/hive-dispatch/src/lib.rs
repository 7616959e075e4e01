// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! Worker dispatch: the `send` primitive, the adaptive-batching worker loop, and the
//! per-worker stuck-service monitor (§4.2, §4.6).

pub mod monitor;
pub mod send;
pub mod worker;

pub use monitor::{MonitorWatchdog, ServiceMonitor, CHECK_INTERVAL};
pub use send::send;
pub use worker::{weight_for, Worker, WEIGHT_TABLE};

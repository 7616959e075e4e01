// Copyright (c) 2026 The Hive Authors. Licensed under Apache License, Version 2.0.

//! CLI entry point (§6 "CLI"). Parses a single config-file path, starts the runtime,
//! and blocks until `SIGINT`/`SIGTERM` requests an orderly shutdown.

use clap::Parser;
use hive_runtime::{Runtime, RuntimeError};
use std::path::PathBuf;

/// Starts a hive node from a TOML config file.
#[derive(Debug, Parser)]
#[command(name = "hive", about = "Start a hive actor runtime node")]
#[command(version)]
struct CliArgs {
    /// Path to the node's TOML config file.
    config: PathBuf,
}

fn main() -> miette::Result<()> {
    let args = CliArgs::parse();
    match Runtime::start(&args.config) {
        Ok(runtime) => {
            runtime.wait_for_shutdown();
            Ok(())
        }
        Err(err) => Err(report(err)),
    }
}

fn report(err: RuntimeError) -> miette::Report {
    miette::Report::msg(err.to_string())
}

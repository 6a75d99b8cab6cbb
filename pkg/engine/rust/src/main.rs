// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result, bail};
use engine_supervisor::Runner;
use engine_supervisor::config::{config_path, load_config};
use log::info;
use nix::sys::signal::Signal;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;
    info!(
        "engine-supervisord starting (version {})",
        env!("CARGO_PKG_VERSION")
    );

    let path = config_path();
    let config = load_config(&path)?;
    config
        .validate()
        .with_context(|| format!("validating {}", path.display()))?;

    let runner = Runner::new(config);
    let cancel = CancellationToken::new();
    let mut exit_rx = runner.start(cancel.clone()).await?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let exit = loop {
        tokio::select! {
            res = &mut exit_rx => break res.context("engine exit notification lost")?,
            _ = sigterm.recv() => {
                info!("received SIGTERM, forwarding to engine");
                runner.signal(Signal::SIGTERM);
            }
            _ = sigint.recv() => {
                info!("received SIGINT, stopping engine");
                cancel.cancel();
            }
        }
    };

    if !exit.is_normal_exit() {
        bail!(exit.error);
    }
    info!("engine-supervisord shutting down");
    Ok(())
}

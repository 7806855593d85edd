//! Asteroid: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  build_rig (rppal / SimPin)   LogEventSink   SystemClock     │
//! │  TriggerListener (HTTP)       signal watcher (tokio)         │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ───────────────         │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │  Orchestrator · EffectSpec::run · Rig              │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  LifecycleManager (boot state → ordered shutdown)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Shutdown order: signal cancels the token → listener stops accepting
//! → batch in flight is cancelled → channels forced inactive → exit code.

use std::process::ExitCode;

use anyhow::{Context, Result};
use futures_lite::future::block_on;
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use asteroid::adapters::hardware::build_rig;
use asteroid::adapters::log_sink::LogEventSink;
use asteroid::adapters::time::SystemClock;
use asteroid::config::AsteroidConfig;
use asteroid::error::{Error, ExitStatus};
use asteroid::lifecycle::{LifecycleManager, ShutdownReason};
use asteroid::listener::{TriggerContext, TriggerListener};
use asteroid::orchestrator::Orchestrator;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Asteroid v{}", env!("CARGO_PKG_VERSION"));

    let status = match run() {
        Ok(status) => status,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            ExitStatus::InitFailed
        }
    };
    info!("Asteroid stopped (exit {})", status.code());
    ExitCode::from(status.code())
}

fn run() -> Result<ExitStatus> {
    // ── 1. Configuration ──────────────────────────────────────
    let config = AsteroidConfig::default();
    config.validate().context("invalid controller table")?;
    debug!(
        "config: {}",
        serde_json::to_string(&config).unwrap_or_else(|e| e.to_string())
    );

    // ── 2. Hardware ───────────────────────────────────────────
    let mut sink = LogEventSink::new();
    let rig = build_rig(&config.channels)?;
    let shutdown = CancellationToken::new();
    let orchestrator = Orchestrator::new(
        config.effects.clone(),
        config.batch_grace,
        SystemClock::new(),
        shutdown.clone(),
        &rig,
    )
    .context("effect table does not match the rig")?;

    let mut lifecycle = LifecycleManager::new(rig, config.boot_states());

    // ── 3. Signals, then boot states ──────────────────────────
    let watcher = match lifecycle.start(&shutdown, &mut sink) {
        Ok(w) => w,
        Err(status) => return Ok(status),
    };

    // ── 4. Listener ───────────────────────────────────────────
    let listener = match TriggerListener::bind(config.listen_addr) {
        Ok(l) => l,
        Err(e) => {
            error!("Binding {} failed: {}", config.listen_addr, e);
            shutdown.cancel();
            let _ = watcher.join();
            return Ok(lifecycle.shutdown(ShutdownReason::ListenerFailed, &mut sink));
        }
    };

    info!(
        "Starting HTTP-server for remote action button on {}",
        listener.local_addr().unwrap_or(config.listen_addr)
    );
    let served = match lifecycle.rig_mut() {
        Some(rig) => {
            let mut batch_sink = LogEventSink::new();
            let mut ctx = TriggerContext {
                orchestrator: &orchestrator,
                rig,
                sink: &mut batch_sink,
            };
            block_on(listener.serve(&mut ctx, &shutdown))
        }
        None => Ok(()),
    };
    info!("Stopping HTTP-server...");
    drop(listener);

    // ── 5. Ordered shutdown ───────────────────────────────────
    shutdown.cancel();
    let signal = watcher.join().unwrap_or_else(|_| {
        warn!("signal watcher panicked");
        None
    });

    let reason = match served {
        Ok(()) => ShutdownReason::Signal(signal.unwrap_or("cancel")),
        Err(Error::Hardware(fault)) => ShutdownReason::HardwareFault(fault),
        Err(e) => {
            error!("Listener failed: {}", e);
            ShutdownReason::ListenerFailed
        }
    };

    info!("Stopping asteroid");
    let status = lifecycle.shutdown(reason, &mut sink);
    info!("Shutdown tasks completed");
    Ok(status)
}

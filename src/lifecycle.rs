//! Lifecycle manager.  Owns the rig from boot to exit.
//!
//! ```text
//!  Uninitialized ──init()──▶ Ready ──shutdown()──▶ ShuttingDown ──▶ Terminated
//! ```
//!
//! `init` applies each channel's boot state.  `shutdown` forces every
//! channel to its safe-off state, releases the pins and records why the
//! process is stopping.  It is idempotent: a second call returns the
//! first call's [`ExitStatus`] without touching hardware.
//!
//! Signal handlers never call into this module.  They only cancel the
//! shutdown token; the supervisor in `main` calls [`LifecycleManager::shutdown`]
//! once the listener and any batch in flight have wound down.
//! [`LifecycleManager::start`] installs the watcher before the first pin
//! write, so a signal during boot still ends in an ordered shutdown.

use core::fmt;
use std::thread::JoinHandle;

use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::app::events::BatchEvent;
use crate::app::ports::{ChannelState, EventSink};
use crate::error::{ExitStatus, HardwareFault};
use crate::rig::Rig;
use crate::signals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    ShuttingDown,
    Terminated,
}

/// Why the controller is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / SIGTERM (signal name).
    Signal(&'static str),
    /// A channel write failed during a batch.
    HardwareFault(HardwareFault),
    /// The trigger listener died.
    ListenerFailed,
    /// Startup failed before the listener was running.
    InitFailed,
}

impl ShutdownReason {
    pub const fn exit_status(self) -> ExitStatus {
        match self {
            Self::Signal(_) => ExitStatus::Clean,
            Self::HardwareFault(_) => ExitStatus::HardwareFault,
            Self::ListenerFailed => ExitStatus::ListenerFailed,
            Self::InitFailed => ExitStatus::InitFailed,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "signal {name}"),
            Self::HardwareFault(fault) => write!(f, "hardware fault: {fault}"),
            Self::ListenerFailed => write!(f, "listener failed"),
            Self::InitFailed => write!(f, "initialisation failed"),
        }
    }
}

pub struct LifecycleManager {
    state: LifecycleState,
    rig: Option<Rig>,
    boot: Vec<(&'static str, ChannelState)>,
    exit: Option<(ShutdownReason, ExitStatus)>,
}

impl LifecycleManager {
    /// Take ownership of `rig`.  `boot` lists the state each channel is
    /// put in by [`init`](Self::init); channels not listed boot Inactive.
    pub fn new(rig: Rig, boot: Vec<(&'static str, ChannelState)>) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            rig: Some(rig),
            boot,
            exit: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The rig, while it is still held.
    pub fn rig(&self) -> Option<&Rig> {
        self.rig.as_ref()
    }

    /// Mutable rig access, only while Ready.
    pub fn rig_mut(&mut self) -> Option<&mut Rig> {
        match self.state {
            LifecycleState::Ready => self.rig.as_mut(),
            _ => None,
        }
    }

    /// Reason and status recorded by the first `shutdown`.
    pub fn exit(&self) -> Option<(ShutdownReason, ExitStatus)> {
        self.exit
    }

    /// Apply boot states.  Uninitialized → Ready.
    pub fn init(&mut self, sink: &mut impl EventSink) -> Result<(), HardwareFault> {
        if self.state != LifecycleState::Uninitialized {
            warn!("init called in {:?}, ignored", self.state);
            return Ok(());
        }
        let Some(rig) = self.rig.as_mut() else {
            return Ok(());
        };

        let names: Vec<&'static str> = rig.names().collect();
        for name in names {
            let boot = self
                .boot
                .iter()
                .find(|(n, _)| *n == name)
                .map_or(ChannelState::Inactive, |(_, s)| *s);
            let Some(ch) = rig.get_mut(name) else {
                continue;
            };
            let res = match boot {
                ChannelState::Active => ch.set_active(),
                ChannelState::Inactive if ch.supports_tone() => ch.stop_tone(),
                ChannelState::Inactive => ch.set_inactive(),
            };
            res.inspect_err(|f| error!("init: {}", f))?;
            info!("initialized {}, {:?}", name, boot);
        }

        self.transition(LifecycleState::Ready, sink);
        Ok(())
    }

    /// Start the signal watcher on `shutdown`, then [`init`](Self::init).
    ///
    /// On failure the manager is already shut down and the error carries
    /// its exit status.
    pub fn start(
        &mut self,
        shutdown: &CancellationToken,
        sink: &mut impl EventSink,
    ) -> Result<JoinHandle<Option<&'static str>>, ExitStatus> {
        let watcher = match signals::spawn_watcher(shutdown.clone()) {
            Ok(w) => w,
            Err(e) => {
                error!("Signal watcher failed: {}", e);
                return Err(self.shutdown(ShutdownReason::InitFailed, sink));
            }
        };
        if let Err(fault) = self.init(sink) {
            error!("Boot state failed: {}", fault);
            shutdown.cancel();
            let _ = watcher.join();
            return Err(self.shutdown(ShutdownReason::InitFailed, sink));
        }
        Ok(watcher)
    }

    /// Force everything off, release the rig and record `reason`.
    /// Safe to call in any state; only the first call has an effect.
    pub fn shutdown(&mut self, reason: ShutdownReason, sink: &mut impl EventSink) -> ExitStatus {
        if let Some((first, status)) = self.exit {
            info!("shutdown ({}) already done for {}", reason, first);
            return status;
        }
        sink.emit(&BatchEvent::ShutdownRequested(reason));
        self.transition(LifecycleState::ShuttingDown, sink);

        let faults = self.release();
        // A fault reason wins over the original reason only when the
        // original one would have exited cleanly.
        let reason = match (reason, faults.first()) {
            (ShutdownReason::Signal(_), Some(f)) => ShutdownReason::HardwareFault(*f),
            _ => reason,
        };

        self.transition(LifecycleState::Terminated, sink);
        let status = reason.exit_status();
        self.exit = Some((reason, status));
        info!("shutdown complete: {} (exit {})", reason, status.code());
        status
    }

    fn release(&mut self) -> Vec<HardwareFault> {
        let Some(mut rig) = self.rig.take() else {
            return Vec::new();
        };
        let faults = rig.force_all_inactive();
        if !rig.all_inactive() {
            for (name, state) in rig.states() {
                if state != ChannelState::Inactive {
                    error!("{} still {:?} at release", name, state);
                }
            }
        }
        drop(rig);
        faults
    }

    fn transition(&mut self, to: LifecycleState, sink: &mut impl EventSink) {
        let from = self.state;
        self.state = to;
        sink.emit(&BatchEvent::Lifecycle { from, to });
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        if self.rig.is_some() {
            warn!("lifecycle dropped without shutdown, forcing channels off");
            for f in self.release() {
                warn!("release: {}", f);
            }
        }
    }
}

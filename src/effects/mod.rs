//! Effect tasks: one timed behaviour bound to one channel.
//!
//! | Pattern     | Behaviour                                         |
//! |-------------|---------------------------------------------------|
//! | `Steady`    | Active for the whole duration, then Inactive      |
//! | `Blink`     | Active/Inactive square wave at a fixed interval   |
//! | `ToneSweep` | Repeated downward frequency sweeps on a tone pin  |
//!
//! Every suspension point goes through [`pause`], which races the clock
//! against the batch's cancellation token.  Whatever way a task ends,
//! [`EffectSpec::run`] settles its channel back to Inactive before
//! reporting.

mod blink;
mod steady;
mod tone_sweep;

pub use tone_sweep::SweepParams;

use core::time::Duration;

use futures_lite::future;
use log::{debug, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::app::ports::{ChannelState, Clock, HardwareChannel};
use crate::error::{ConfigError, HardwareFault};

// ───────────────────────────────────────────────────────────────
// Specs
// ───────────────────────────────────────────────────────────────

/// Pattern-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Pattern {
    Steady,
    Blink { interval: Duration },
    ToneSweep(SweepParams),
}

/// Pattern discriminant, for reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EffectKind {
    Steady,
    Blink,
    ToneSweep,
}

/// One effect of a batch: which channel, for how long, doing what.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectSpec {
    pub channel: &'static str,
    /// Total duration `D`.
    pub duration: Duration,
    pub pattern: Pattern,
}

impl EffectSpec {
    pub const fn new(channel: &'static str, duration: Duration, pattern: Pattern) -> Self {
        Self {
            channel,
            duration,
            pattern,
        }
    }

    pub fn kind(&self) -> EffectKind {
        match self.pattern {
            Pattern::Steady => EffectKind::Steady,
            Pattern::Blink { .. } => EffectKind::Blink,
            Pattern::ToneSweep(_) => EffectKind::ToneSweep,
        }
    }

    /// Check the timing parameters.  Channel binding is checked by the
    /// config and the orchestrator, which know the rig.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration.is_zero() {
            return Err(ConfigError::Invalid("effect duration"));
        }
        match self.pattern {
            Pattern::Steady => Ok(()),
            Pattern::Blink { interval } if interval.is_zero() => {
                Err(ConfigError::Invalid("blink interval"))
            }
            Pattern::Blink { .. } => Ok(()),
            Pattern::ToneSweep(p) => p.step_wait(self.duration).map(|_| ()),
        }
    }

    /// Run the effect on `channel` until it completes, faults, or
    /// `cancel` fires, then force the channel Inactive.
    pub async fn run<C: Clock>(
        &self,
        channel: &mut dyn HardwareChannel,
        clock: &C,
        cancel: &CancellationToken,
    ) -> TaskReport {
        let started = clock.now();
        let halted = match self.pattern {
            _ if cancel.is_cancelled() => Err(Halt::Cancelled),
            Pattern::Steady => steady::run(channel, self.duration, clock, cancel).await,
            Pattern::Blink { interval } => {
                blink::run(channel, self.duration, interval, clock, cancel).await
            }
            Pattern::ToneSweep(params) => {
                tone_sweep::run(channel, self.duration, &params, clock, cancel).await
            }
        };

        let settled = settle(channel);
        let outcome = match (halted, settled) {
            (Err(Halt::Fault(f)), _) | (Ok(()) | Err(Halt::Cancelled), Err(f)) => {
                TaskOutcome::Faulted(f)
            }
            (Err(Halt::Config(e)), _) => TaskOutcome::Rejected(e),
            (Err(Halt::Cancelled), Ok(())) => TaskOutcome::Cancelled,
            (Ok(()), Ok(())) => TaskOutcome::Completed,
        };
        let elapsed = clock.now().saturating_sub(started);
        debug!("{}: {:?} {:?} after {:?}", self.channel, self.kind(), outcome, elapsed);

        TaskReport {
            channel: self.channel,
            kind: self.kind(),
            outcome,
            final_state: channel.state(),
            elapsed,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Reports
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Ran for its full duration.
    Completed,
    /// Stopped early by shutdown.
    Cancelled,
    /// Still running when the join barrier expired.
    TimedOut,
    /// A channel write failed.
    Faulted(HardwareFault),
    /// Parameters failed validation; the channel was never driven.
    Rejected(ConfigError),
}

/// What one effect task did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskReport {
    pub channel: &'static str,
    pub kind: EffectKind,
    pub outcome: TaskOutcome,
    /// Channel state after the task settled it.
    pub final_state: ChannelState,
    pub elapsed: Duration,
}

// ───────────────────────────────────────────────────────────────
// Suspension and cleanup
// ───────────────────────────────────────────────────────────────

/// Why an effect body stopped before its duration ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    Cancelled,
    Fault(HardwareFault),
    Config(ConfigError),
}

impl From<HardwareFault> for Halt {
    fn from(f: HardwareFault) -> Self {
        Self::Fault(f)
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub(crate) async fn pause<C: Clock>(
    clock: &C,
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), Halt> {
    if cancel.is_cancelled() {
        return Err(Halt::Cancelled);
    }
    future::or(
        async {
            clock.sleep(duration).await;
            Ok(())
        },
        async {
            cancel.cancelled().await;
            Err(Halt::Cancelled)
        },
    )
    .await
}

/// Leave `channel` silent and Inactive.
fn settle(channel: &mut dyn HardwareChannel) -> Result<(), HardwareFault> {
    let res = if channel.supports_tone() {
        channel.stop_tone()
    } else {
        channel.set_inactive()
    };
    if let Err(f) = res {
        warn!("{}: could not settle channel: {}", channel.name(), f);
    }
    res
}

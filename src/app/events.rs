//! Outbound controller events.
//!
//! The [`Orchestrator`](crate::orchestrator::Orchestrator) and the
//! [`LifecycleManager`](crate::lifecycle::LifecycleManager) emit these
//! through the [`EventSink`](super::ports::EventSink) port.

use core::time::Duration;

use crate::effects::EffectKind;
use crate::error::HardwareFault;
use crate::lifecycle::{LifecycleState, ShutdownReason};

/// Structured events emitted by the controller core.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A trigger started a batch of `tasks` effects.
    BatchStarted { tasks: usize },

    /// One effect task returned.
    TaskFinished {
        channel: &'static str,
        kind: EffectKind,
        elapsed: Duration,
    },

    /// One effect task hit a hardware fault.
    TaskFaulted(HardwareFault),

    /// The join barrier expired; remaining tasks were cancelled.
    BatchTimedOut { limit: Duration },

    /// Every task returned.  `unsettled` channels were not left inactive.
    BatchFinished {
        elapsed: Duration,
        unsettled: Vec<&'static str>,
    },

    /// The lifecycle manager changed state.
    Lifecycle {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Shutdown started for the given reason.
    ShutdownRequested(ShutdownReason),
}

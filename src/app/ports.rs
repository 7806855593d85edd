//! Port traits: the boundary between effect logic and the outside world.
//!
//! ```text
//!   GpioChannel / ToneChannel ──▶ HardwareChannel ──▶ EffectTask
//!   SystemClock               ──▶ Clock           ──▶ EffectTask
//!   LogEventSink              ◀── EventSink       ◀── Orchestrator
//! ```
//!
//! Effects never touch a pin directly.  They drive one [`HardwareChannel`]
//! and suspend only through a [`Clock`], so the whole batch runs against
//! in-memory pins and a virtual clock in tests.

use core::future::Future;
use core::time::Duration;

use crate::error::{ChannelOp, HardwareFault};

// ───────────────────────────────────────────────────────────────
// Channel port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Logical state of a channel, independent of the electrical level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ChannelState {
    Active,
    Inactive,
}

/// One addressable physical output: a switch, or a tone emitter.
///
/// All calls are synchronous and bounded by the driver's write latency.
/// A failed write is a [`HardwareFault`]; the logical state only changes
/// after a successful write.
pub trait HardwareChannel: Send {
    /// Logical name, unique within a rig.
    fn name(&self) -> &'static str;

    fn state(&self) -> ChannelState;

    fn set_active(&mut self) -> Result<(), HardwareFault>;

    fn set_inactive(&mut self) -> Result<(), HardwareFault>;

    fn supports_tone(&self) -> bool {
        false
    }

    /// Start sounding at `hz` with the given duty fraction (0.0 – 1.0).
    fn start_tone(&mut self, _hz: u32, _duty: f64) -> Result<(), HardwareFault> {
        Err(HardwareFault::unsupported(self.name(), ChannelOp::StartTone))
    }

    /// Retune a sounding tone.
    fn set_frequency(&mut self, _hz: u32) -> Result<(), HardwareFault> {
        Err(HardwareFault::unsupported(self.name(), ChannelOp::SetFrequency))
    }

    /// Silence the tone and leave the channel inactive.
    fn stop_tone(&mut self) -> Result<(), HardwareFault> {
        Err(HardwareFault::unsupported(self.name(), ChannelOp::StopTone))
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source and the only way an effect may suspend.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Suspend the calling task for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The orchestrator and lifecycle manager report what they do through
/// this port.  Adapters decide where the events go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::BatchEvent);
}

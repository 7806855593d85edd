//! Mock hardware channel for integration tests.
//!
//! Records every channel call in a shared journal so tests can assert on
//! the full command history after the channel has been moved into a rig.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use asteroid::adapters::time::VirtualClock;
use asteroid::app::events::BatchEvent;
use asteroid::app::ports::{ChannelState, Clock, EventSink, HardwareChannel};
use asteroid::error::{ChannelOp, HardwareFault};

// ── Channel call record ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Active,
    Inactive,
    StartTone { hz: u32, duty: f64 },
    Frequency(u32),
    StopTone,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Call {
    pub channel: &'static str,
    pub op: Op,
    /// Virtual time when a clock is attached, wall time since creation
    /// otherwise.
    pub at: Duration,
}

/// Shared, ordered record of calls across every mock in a test.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

#[allow(dead_code)]
impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.0.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    pub fn for_channel(&self, channel: &str) -> Vec<Call> {
        self.lock()
            .iter()
            .filter(|c| c.channel == channel)
            .copied()
            .collect()
    }

    pub fn ops(&self, channel: &str) -> Vec<Op> {
        self.for_channel(channel).into_iter().map(|c| c.op).collect()
    }

    pub fn frequencies(&self, channel: &str) -> Vec<u32> {
        self.for_channel(channel)
            .into_iter()
            .filter_map(|c| match c.op {
                Op::Frequency(hz) => Some(hz),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, channel: &str, op: Op) -> usize {
        self.for_channel(channel)
            .iter()
            .filter(|c| c.op == op)
            .count()
    }
}

// ── Fault injection ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    #[default]
    Never,
    /// Activation fails; deactivation still works.
    OnActivate,
    /// Every write fails.
    Always,
}

// ── MockChannel ───────────────────────────────────────────────

pub struct MockChannel {
    name: &'static str,
    tone: bool,
    state: ChannelState,
    sounding: bool,
    fault: FaultMode,
    journal: Journal,
    clock: Option<VirtualClock>,
    origin: Instant,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn switch(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            tone: false,
            state: ChannelState::Inactive,
            sounding: false,
            fault: FaultMode::Never,
            journal: journal.clone(),
            clock: None,
            origin: Instant::now(),
        }
    }

    pub fn tone(name: &'static str, journal: &Journal) -> Self {
        Self {
            tone: true,
            ..Self::switch(name, journal)
        }
    }

    pub fn with_clock(mut self, clock: &VirtualClock) -> Self {
        self.clock = Some(clock.clone());
        self
    }

    pub fn failing(mut self, fault: FaultMode) -> Self {
        self.fault = fault;
        self
    }

    fn record(&mut self, op: Op, code: ChannelOp) -> Result<(), HardwareFault> {
        let activating = matches!(op, Op::Active | Op::StartTone { .. } | Op::Frequency(_));
        match self.fault {
            FaultMode::Always => return Err(HardwareFault::write(self.name, code)),
            FaultMode::OnActivate if activating => {
                return Err(HardwareFault::write(self.name, code));
            }
            _ => {}
        }
        let at = match &self.clock {
            Some(c) => c.now(),
            None => self.origin.elapsed(),
        };
        self.journal.0.lock().unwrap().push(Call {
            channel: self.name,
            op,
            at,
        });
        Ok(())
    }
}

impl HardwareChannel for MockChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn state(&self) -> ChannelState {
        self.state
    }

    fn set_active(&mut self) -> Result<(), HardwareFault> {
        self.record(Op::Active, ChannelOp::SetActive)?;
        self.state = ChannelState::Active;
        Ok(())
    }

    fn set_inactive(&mut self) -> Result<(), HardwareFault> {
        self.record(Op::Inactive, ChannelOp::SetInactive)?;
        self.state = ChannelState::Inactive;
        self.sounding = false;
        Ok(())
    }

    fn supports_tone(&self) -> bool {
        self.tone
    }

    fn start_tone(&mut self, hz: u32, duty: f64) -> Result<(), HardwareFault> {
        if !self.tone {
            return Err(HardwareFault::unsupported(self.name, ChannelOp::StartTone));
        }
        self.record(Op::StartTone { hz, duty }, ChannelOp::StartTone)?;
        self.sounding = true;
        self.state = ChannelState::Active;
        Ok(())
    }

    fn set_frequency(&mut self, hz: u32) -> Result<(), HardwareFault> {
        if !self.tone {
            return Err(HardwareFault::unsupported(self.name, ChannelOp::SetFrequency));
        }
        self.record(Op::Frequency(hz), ChannelOp::SetFrequency)
    }

    fn stop_tone(&mut self) -> Result<(), HardwareFault> {
        if !self.tone {
            return Err(HardwareFault::unsupported(self.name, ChannelOp::StopTone));
        }
        self.record(Op::StopTone, ChannelOp::StopTone)?;
        self.sounding = false;
        self.state = ChannelState::Inactive;
        Ok(())
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<BatchEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timed_out(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, BatchEvent::BatchTimedOut { .. }))
    }

    pub fn faults(&self) -> Vec<HardwareFault> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::TaskFaulted(f) => Some(*f),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &BatchEvent) {
        self.events.push(event.clone());
    }
}

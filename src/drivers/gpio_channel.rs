//! Binary output channel over an `embedded-hal` output pin.
//!
//! Relays on the Asteroid board close when the pin is pulled LOW, the
//! buzzer transistor when it is driven HIGH.  [`Polarity`] keeps that
//! electrical detail out of the effect logic, which only ever asks for
//! Active or Inactive.
//!
//! ## Dual-target design
//!
//! On the Pi: `P` is an `rppal` output pin.
//! On host/test: `P` is a [`SimPin`](super::sim_pin::SimPin) or a mock.

use embedded_hal::digital::{Error as _, OutputPin};
use log::{debug, warn};

use crate::app::ports::{ChannelState, HardwareChannel};
use crate::error::{ChannelOp, HardwareFault};

/// Which electrical level means "active".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Pin level (true = HIGH) for the given logical state.
    pub const fn level(self, state: ChannelState) -> bool {
        match (self, state) {
            (Self::ActiveHigh, ChannelState::Active) | (Self::ActiveLow, ChannelState::Inactive) => {
                true
            }
            (Self::ActiveHigh, ChannelState::Inactive) | (Self::ActiveLow, ChannelState::Active) => {
                false
            }
        }
    }
}

/// Drive `pin` to the level that represents `state`.
pub(crate) fn drive<P: OutputPin>(
    pin: &mut P,
    polarity: Polarity,
    state: ChannelState,
    name: &'static str,
    op: ChannelOp,
) -> Result<(), HardwareFault> {
    let res = if polarity.level(state) {
        pin.set_high()
    } else {
        pin.set_low()
    };
    res.map_err(|e| {
        warn!("{}: {} rejected by driver ({:?})", name, op, e.kind());
        HardwareFault::write(name, op)
    })
}

pub struct GpioChannel<P> {
    name: &'static str,
    polarity: Polarity,
    pin: P,
    state: ChannelState,
}

impl<P: OutputPin> GpioChannel<P> {
    /// Wrap `pin`.  The pin is not written until the lifecycle manager
    /// applies the boot state.
    pub fn new(name: &'static str, polarity: Polarity, pin: P) -> Self {
        Self {
            name,
            polarity,
            pin,
            state: ChannelState::Inactive,
        }
    }

    fn write(&mut self, state: ChannelState, op: ChannelOp) -> Result<(), HardwareFault> {
        drive(&mut self.pin, self.polarity, state, self.name, op)?;
        if self.state != state {
            debug!("{}: {:?} -> {:?}", self.name, self.state, state);
        }
        self.state = state;
        Ok(())
    }
}

impl<P: OutputPin + Send> HardwareChannel for GpioChannel<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn state(&self) -> ChannelState {
        self.state
    }

    fn set_active(&mut self) -> Result<(), HardwareFault> {
        self.write(ChannelState::Active, ChannelOp::SetActive)
    }

    fn set_inactive(&mut self) -> Result<(), HardwareFault> {
        self.write(ChannelState::Inactive, ChannelOp::SetInactive)
    }
}

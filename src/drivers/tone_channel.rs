//! Frequency-driven tone channel (piezo buzzer on software PWM).
//!
//! Logical Active means "a tone is sounding".  Silencing clears PWM and
//! then drives the pin to its inactive level, so a buzzer never idles
//! with the transistor half-on.
//!
//! ## Dual-target design
//!
//! On the Pi: `P` is an `rppal` output pin using its software PWM.
//! On host/test: `P` is a [`SimPin`](super::sim_pin::SimPin) or a mock.

use core::fmt::Debug;

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use super::gpio_channel::{Polarity, drive};
use crate::app::ports::{ChannelState, HardwareChannel};
use crate::error::{ChannelOp, FaultKind, HardwareFault};

/// An output pin that can also generate a PWM square wave.
///
/// `embedded-hal` has no frequency-setting trait, so the tone channel
/// needs this extra capability on top of [`OutputPin`].
pub trait TonePin: OutputPin {
    type PwmError: Debug;

    /// Start or retune PWM at `hz` with `duty` in 0.0 – 1.0.
    fn set_pwm(&mut self, hz: f64, duty: f64) -> Result<(), Self::PwmError>;

    /// Stop PWM.  The pin level afterwards is unspecified.
    fn clear_pwm(&mut self) -> Result<(), Self::PwmError>;
}

pub struct ToneChannel<P> {
    name: &'static str,
    polarity: Polarity,
    pin: P,
    base_hz: u32,
    default_duty: f64,
    /// `(hz, duty)` while sounding.
    sounding: Option<(u32, f64)>,
}

impl<P: TonePin> ToneChannel<P> {
    /// `base_hz` and `default_duty` are what a plain `set_active` plays.
    pub fn new(
        name: &'static str,
        polarity: Polarity,
        pin: P,
        base_hz: u32,
        default_duty: f64,
    ) -> Self {
        Self {
            name,
            polarity,
            pin,
            base_hz,
            default_duty: default_duty.clamp(0.0, 1.0),
            sounding: None,
        }
    }

    /// Frequency currently playing, if any.
    pub fn frequency(&self) -> Option<u32> {
        self.sounding.map(|(hz, _)| hz)
    }

    fn pwm(&mut self, hz: u32, duty: f64, op: ChannelOp) -> Result<(), HardwareFault> {
        self.pin.set_pwm(f64::from(hz), duty).map_err(|e| {
            warn!("{}: {} rejected by driver ({:?})", self.name, op, e);
            HardwareFault::write(self.name, op)
        })?;
        if self.sounding.is_none() {
            debug!("{}: tone on at {} Hz", self.name, hz);
        }
        self.sounding = Some((hz, duty));
        Ok(())
    }

    fn silence(&mut self, op: ChannelOp) -> Result<(), HardwareFault> {
        let cleared = self.pin.clear_pwm().map_err(|e| {
            warn!("{}: {} rejected by driver ({:?})", self.name, op, e);
            HardwareFault::write(self.name, op)
        });
        // Drive the idle level even if clearing PWM failed.
        let driven = drive(&mut self.pin, self.polarity, ChannelState::Inactive, self.name, op);
        cleared.and(driven)?;
        if self.sounding.take().is_some() {
            debug!("{}: tone off", self.name);
        }
        Ok(())
    }
}

impl<P: TonePin + Send> HardwareChannel for ToneChannel<P> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn state(&self) -> ChannelState {
        if self.sounding.is_some() {
            ChannelState::Active
        } else {
            ChannelState::Inactive
        }
    }

    fn set_active(&mut self) -> Result<(), HardwareFault> {
        self.pwm(self.base_hz, self.default_duty, ChannelOp::SetActive)
    }

    fn set_inactive(&mut self) -> Result<(), HardwareFault> {
        self.silence(ChannelOp::SetInactive)
    }

    fn supports_tone(&self) -> bool {
        true
    }

    fn start_tone(&mut self, hz: u32, duty: f64) -> Result<(), HardwareFault> {
        self.pwm(hz, duty.clamp(0.0, 1.0), ChannelOp::StartTone)
    }

    fn set_frequency(&mut self, hz: u32) -> Result<(), HardwareFault> {
        let Some((_, duty)) = self.sounding else {
            return Err(HardwareFault::new(
                self.name,
                ChannelOp::SetFrequency,
                FaultKind::NotSounding,
            ));
        };
        self.pwm(hz, duty, ChannelOp::SetFrequency)
    }

    fn stop_tone(&mut self) -> Result<(), HardwareFault> {
        self.silence(ChannelOp::StopTone)
    }
}

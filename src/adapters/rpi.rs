//! Raspberry Pi pins via `rppal`.

use anyhow::{Context, Result};
use rppal::gpio::{Gpio, OutputPin};

use crate::config::ChannelSpec;
use crate::drivers::tone_channel::TonePin;

/// Claim the channel's pin as an output already at its boot level.
///
/// `rppal` resets the pin to its previous mode when the returned handle
/// is dropped, which is how the lifecycle manager releases hardware.
pub fn claim(gpio: &Gpio, spec: &ChannelSpec) -> Result<OutputPin> {
    let pin = gpio
        .get(spec.gpio)
        .with_context(|| format!("claiming GPIO {} for {}", spec.gpio, spec.name))?;
    let out = if spec.polarity.level(spec.boot_state) {
        pin.into_output_high()
    } else {
        pin.into_output_low()
    };
    Ok(out)
}

impl TonePin for OutputPin {
    type PwmError = rppal::gpio::Error;

    fn set_pwm(&mut self, hz: f64, duty: f64) -> Result<(), Self::PwmError> {
        self.set_pwm_frequency(hz, duty)
    }

    fn clear_pwm(&mut self) -> Result<(), Self::PwmError> {
        OutputPin::clear_pwm(self)
    }
}

//! Hardware adapter: turns the channel table into a [`Rig`].
//!
//! This is the only module that picks a pin implementation.  With the
//! `rpi` feature every channel gets an `rppal` output pin, claimed at its
//! boot level so a relay never chatters while the process starts.
//! Without it every channel gets a [`SimPin`], which lets the controller
//! run on a development host.

use anyhow::Result;
use log::info;

use crate::app::ports::HardwareChannel;
use crate::config::ChannelSpec;
use crate::drivers::gpio_channel::GpioChannel;
#[cfg(not(feature = "rpi"))]
use crate::drivers::sim_pin::SimPin;
use crate::drivers::tone_channel::{TonePin, ToneChannel};
use crate::rig::Rig;

/// Claim one pin per channel spec and wrap it in the matching channel.
pub fn build_rig(specs: &[ChannelSpec]) -> Result<Rig> {
    #[cfg(feature = "rpi")]
    let gpio = {
        use anyhow::Context;
        rppal::gpio::Gpio::new().context("opening GPIO")?
    };

    let mut channels: Vec<Box<dyn HardwareChannel>> = Vec::with_capacity(specs.len());
    for spec in specs {
        #[cfg(feature = "rpi")]
        let pin = super::rpi::claim(&gpio, spec)?;
        #[cfg(not(feature = "rpi"))]
        let pin = SimPin::new(spec.name);

        info!(
            "channel {} on GPIO {} ({:?}, {})",
            spec.name,
            spec.gpio,
            spec.polarity,
            if spec.tone.is_some() { "tone" } else { "switch" }
        );
        channels.push(channel(spec, pin));
    }
    Ok(Rig::new(channels)?)
}

fn channel<P: TonePin + Send + 'static>(spec: &ChannelSpec, pin: P) -> Box<dyn HardwareChannel> {
    match spec.tone {
        Some(t) => Box::new(ToneChannel::new(
            spec.name,
            spec.polarity,
            pin,
            t.base_hz,
            t.duty,
        )),
        None => Box::new(GpioChannel::new(spec.name, spec.polarity, pin)),
    }
}

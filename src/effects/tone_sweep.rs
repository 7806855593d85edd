//! ToneSweep: repeated downward frequency sweeps on a tone channel.
//!
//! ## Termination
//!
//! The effect duration `D` is the only terminator.  A pass visits
//! `max_hz, max_hz - step_hz, …` while the frequency is above `min_hz`
//! and always runs to the end once started; a new pass starts while
//! elapsed `< D`.  `repetitions` only sizes the per-step wait:
//!
//! ```text
//! steps     = (max_hz - min_hz) / step_hz
//! step_wait = ceil(D / steps / repetitions)
//! ```
//!
//! Rounding up means `repetitions` passes always cover `D`, so an
//! unhindered run performs exactly `repetitions` passes.

use core::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{Halt, pause};
use crate::app::ports::{Clock, HardwareChannel};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepParams {
    /// Frequency the tone starts at before the first pass.
    pub base_hz: u32,
    pub max_hz: u32,
    pub min_hz: u32,
    pub step_hz: u32,
    pub repetitions: u32,
    /// PWM duty fraction (0.0 – 1.0).
    pub duty: f64,
}

impl SweepParams {
    /// Frequency steps in one pass.
    pub fn steps(&self) -> u32 {
        if self.step_hz == 0 || self.max_hz <= self.min_hz {
            return 0;
        }
        (self.max_hz - self.min_hz) / self.step_hz
    }

    /// Wait after each frequency step.  Fails on any parameter that
    /// would make it zero or undefined.
    pub fn step_wait(&self, duration: Duration) -> Result<Duration, ConfigError> {
        if self.step_hz == 0 {
            return Err(ConfigError::Invalid("sweep step"));
        }
        if self.max_hz <= self.min_hz {
            return Err(ConfigError::Invalid("sweep range"));
        }
        if self.repetitions == 0 {
            return Err(ConfigError::Invalid("sweep repetitions"));
        }
        if self.base_hz == 0 {
            return Err(ConfigError::Invalid("sweep base frequency"));
        }
        if !(0.0..=1.0).contains(&self.duty) {
            return Err(ConfigError::Invalid("sweep duty"));
        }
        let steps = self.steps();
        if steps == 0 {
            return Err(ConfigError::Invalid("sweep step"));
        }
        let slots = u128::from(steps) * u128::from(self.repetitions);
        let nanos = duration.as_nanos().div_ceil(slots);
        if nanos == 0 {
            return Err(ConfigError::Invalid("effect duration"));
        }
        let nanos = u64::try_from(nanos).map_err(|_| ConfigError::Invalid("effect duration"))?;
        Ok(Duration::from_nanos(nanos))
    }
}

pub(super) async fn run<C: Clock>(
    channel: &mut dyn HardwareChannel,
    duration: Duration,
    params: &SweepParams,
    clock: &C,
    cancel: &CancellationToken,
) -> Result<(), Halt> {
    let step_wait = params.step_wait(duration).map_err(Halt::Config)?;

    channel.start_tone(params.base_hz, params.duty)?;
    let start = clock.now();
    while clock.now().saturating_sub(start) < duration {
        let mut hz = params.max_hz;
        while hz > params.min_hz {
            channel.set_frequency(hz)?;
            pause(clock, step_wait, cancel).await?;
            hz = hz.saturating_sub(params.step_hz);
        }
    }
    channel.stop_tone()?;
    Ok(())
}

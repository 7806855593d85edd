//! In-memory output pin for hosts without GPIO.
//!
//! Used by the binary when built without the `rpi` feature, and by unit
//! tests.  Every write is logged at trace level and mirrored into a
//! shared cell that a [`SimProbe`] can read after the pin has been moved
//! into a channel.

use core::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::{ErrorType, OutputPin};
use log::trace;

use super::tone_channel::TonePin;

#[derive(Debug, Default, Clone, Copy)]
struct SimLevels {
    level: Option<bool>,
    pwm: Option<(f64, f64)>,
    writes: u32,
}

fn lock(cell: &Mutex<SimLevels>) -> MutexGuard<'_, SimLevels> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated output pin.
pub struct SimPin {
    label: &'static str,
    cell: Arc<Mutex<SimLevels>>,
}

impl SimPin {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            cell: Arc::new(Mutex::new(SimLevels::default())),
        }
    }

    /// A read-only view that stays valid after the pin is moved.
    pub fn probe(&self) -> SimProbe {
        SimProbe(Arc::clone(&self.cell))
    }

    fn set_level(&mut self, high: bool) {
        trace!("sim {}: level {}", self.label, if high { "HIGH" } else { "LOW" });
        let mut s = lock(&self.cell);
        s.level = Some(high);
        s.writes += 1;
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_level(true);
        Ok(())
    }
}

impl TonePin for SimPin {
    type PwmError = Infallible;

    fn set_pwm(&mut self, hz: f64, duty: f64) -> Result<(), Self::PwmError> {
        trace!("sim {}: pwm {:.0} Hz @ {:.0}%", self.label, hz, duty * 100.0);
        let mut s = lock(&self.cell);
        s.pwm = Some((hz, duty));
        s.writes += 1;
        Ok(())
    }

    fn clear_pwm(&mut self) -> Result<(), Self::PwmError> {
        trace!("sim {}: pwm off", self.label);
        let mut s = lock(&self.cell);
        s.pwm = None;
        s.writes += 1;
        Ok(())
    }
}

/// Read side of a [`SimPin`].
#[derive(Clone)]
pub struct SimProbe(Arc<Mutex<SimLevels>>);

impl SimProbe {
    /// Last level written, `None` if the pin was never driven.
    pub fn level(&self) -> Option<bool> {
        lock(&self.0).level
    }

    /// Current PWM `(hz, duty)`, `None` when PWM is off.
    pub fn pwm(&self) -> Option<(f64, f64)> {
        lock(&self.0).pwm
    }

    pub fn writes(&self) -> u32 {
        lock(&self.0).writes
    }
}

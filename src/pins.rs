//! GPIO pin assignments for the Asteroid relay board.
//!
//! Single source of truth: the stock [`AsteroidConfig`](crate::config::AsteroidConfig)
//! references this module rather than hard-coding pin numbers.
//!
//! Numbers are BCM GPIO numbers (what `rppal` expects).  The physical
//! header position (BOARD numbering) is noted next to each one because
//! that is how the wiring loom is labelled.

// ---------------------------------------------------------------------------
// Relay outputs (active LOW, the relay closes when the pin is pulled down)
// ---------------------------------------------------------------------------

/// Main light relay.  BOARD pin 11.
pub const MAIN_LIGHT_GPIO: u8 = 17;
/// First auxiliary light relay.  BOARD pin 12.
pub const AUX_LIGHT1_GPIO: u8 = 18;
/// Second auxiliary light relay.  BOARD pin 36.
pub const AUX_LIGHT2_GPIO: u8 = 16;

// ---------------------------------------------------------------------------
// Piezo buzzer (active HIGH, driven with software PWM)
// ---------------------------------------------------------------------------

/// Buzzer transistor base.  BOARD pin 32.
pub const BUZZER_GPIO: u8 = 12;

// ---------------------------------------------------------------------------
// Tone defaults
// ---------------------------------------------------------------------------

/// Frequency the buzzer starts at before a sweep takes over.
pub const BUZZER_BASE_HZ: u32 = 440;
/// PWM duty cycle used for every tone (fraction, 0.0 – 1.0).
pub const BUZZER_DUTY: f64 = 0.5;

//! Channel drivers over `embedded-hal` pins, plus the simulated pin.

pub mod gpio_channel;
pub mod sim_pin;
pub mod tone_channel;

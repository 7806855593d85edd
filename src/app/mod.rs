//! Application core: port traits and the events that cross them.
//!
//! The effect logic depends only on these abstractions, never on a
//! concrete driver.

pub mod events;
pub mod ports;

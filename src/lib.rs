//! Asteroid effect controller library.
//!
//! A remote button issues an HTTP GET; the controller acknowledges it and
//! runs a fixed batch of timed effects (lights, blinkers, a swept tone)
//! in parallel, then leaves every channel inactive.  The modules are
//! exposed for integration testing; the binary in `main.rs` wires them
//! to real pins.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod effects;
pub mod error;
pub mod lifecycle;
pub mod listener;
pub mod orchestrator;
pub mod pins;
pub mod rig;
pub mod signals;

//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements     | Connects to                   |
//! |------------|----------------|-------------------------------|
//! | `hardware` | HardwareChannel| rppal GPIO or simulated pins  |
//! | `log_sink` | EventSink      | `log` facade                  |
//! | `rpi`      | TonePin        | rppal software PWM            |
//! | `time`     | Clock          | async-io-mini timers          |

pub mod hardware;
pub mod log_sink;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod time;

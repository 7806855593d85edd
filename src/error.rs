//! Unified error types for the Asteroid controller.
//!
//! [`Error`] is what the trigger listener returns; the supervisor in
//! `main` turns it into a shutdown reason and from there an [`ExitStatus`].
//! Hardware and config errors are `Copy` so they can be passed through
//! task outcomes and batch reports without allocation.

use core::fmt;
use std::io;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// A channel write failed.  Always fatal.
    Hardware(HardwareFault),
    /// The trigger listener failed outside of a recoverable interruption.
    Listener(ListenerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Listener(e) => write!(f, "listener: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Listener(ListenerError::Io(e)) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Hardware faults
// ---------------------------------------------------------------------------

/// The channel operation that was being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOp {
    SetActive,
    SetInactive,
    StartTone,
    SetFrequency,
    StopTone,
}

impl fmt::Display for ChannelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetActive => write!(f, "set_active"),
            Self::SetInactive => write!(f, "set_inactive"),
            Self::StartTone => write!(f, "start_tone"),
            Self::SetFrequency => write!(f, "set_frequency"),
            Self::StopTone => write!(f, "stop_tone"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The pin or PWM write was rejected by the driver.
    Write,
    /// The channel has no tone capability.
    Unsupported,
    /// A frequency change was requested while no tone is sounding.
    NotSounding,
}

/// A failed write to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareFault {
    pub channel: &'static str,
    pub op: ChannelOp,
    pub kind: FaultKind,
}

impl HardwareFault {
    pub const fn new(channel: &'static str, op: ChannelOp, kind: FaultKind) -> Self {
        Self { channel, op, kind }
    }

    pub const fn write(channel: &'static str, op: ChannelOp) -> Self {
        Self::new(channel, op, FaultKind::Write)
    }

    pub const fn unsupported(channel: &'static str, op: ChannelOp) -> Self {
        Self::new(channel, op, FaultKind::Unsupported)
    }
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            FaultKind::Write => "write failed",
            FaultKind::Unsupported => "not supported",
            FaultKind::NotSounding => "no tone sounding",
        };
        write!(f, "{} on '{}': {}", self.op, self.channel, what)
    }
}

impl std::error::Error for HardwareFault {}

impl From<HardwareFault> for Error {
    fn from(e: HardwareFault) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A rejected effect or channel table.  Raised before any pin is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// An effect references a channel name that is not in the rig.
    UnknownChannel(&'static str),
    /// Two channels share a name.
    DuplicateChannel(&'static str),
    /// Two effects in one batch drive the same channel.
    ChannelReused(&'static str),
    /// A ToneSweep is bound to a channel with no tone capability.
    NotToneCapable(&'static str),
    /// A parameter is out of range.  The string names the field.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChannel(name) => write!(f, "unknown channel '{name}'"),
            Self::DuplicateChannel(name) => write!(f, "duplicate channel '{name}'"),
            Self::ChannelReused(name) => {
                write!(f, "channel '{name}' is driven by more than one effect")
            }
            Self::NotToneCapable(name) => write!(f, "channel '{name}' cannot play tones"),
            Self::Invalid(field) => write!(f, "invalid {field}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Listener errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ListenerError {
    /// Binding or accepting on the trigger socket failed.
    Io(io::Error),
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
        }
    }
}

impl From<ListenerError> for Error {
    fn from(e: ListenerError) -> Self {
        Self::Listener(e)
    }
}

impl From<io::Error> for ListenerError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Exit status
// ---------------------------------------------------------------------------

/// Process exit status, one per shutdown path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Stopped by SIGINT / SIGTERM after an orderly shutdown.
    Clean,
    /// A channel write failed.
    HardwareFault,
    /// The trigger listener died.
    ListenerFailed,
    /// Startup failed before the listener was running.
    InitFailed,
}

impl ExitStatus {
    pub const fn code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::HardwareFault => 1,
            Self::ListenerFailed => 2,
            Self::InitFailed => 3,
        }
    }
}

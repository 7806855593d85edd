//! The rig: every hardware channel the controller owns, by name.
//!
//! The lifecycle manager owns the rig.  During a batch the orchestrator
//! borrows it mutably and hands each effect task exclusive access to
//! exactly one channel via [`Rig::disjoint_mut`], so two tasks can never
//! write the same pin.

use log::warn;

use crate::app::ports::{ChannelState, HardwareChannel};
use crate::error::{ConfigError, HardwareFault};

pub struct Rig {
    channels: Vec<Box<dyn HardwareChannel>>,
}

impl Rig {
    /// Build a rig.  Channel names must be unique.
    pub fn new(channels: Vec<Box<dyn HardwareChannel>>) -> Result<Self, ConfigError> {
        for (i, ch) in channels.iter().enumerate() {
            if channels[..i].iter().any(|c| c.name() == ch.name()) {
                return Err(ConfigError::DuplicateChannel(ch.name()));
            }
        }
        Ok(Self { channels })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.channels.iter().map(|c| c.name())
    }

    pub fn get(&self, name: &str) -> Option<&dyn HardwareChannel> {
        self.channels
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn HardwareChannel + 'static)> {
        self.channels
            .iter_mut()
            .find(|c| c.name() == name)
            .map(|c| c.as_mut())
    }

    /// Current state of every channel, in rig order.
    pub fn states(&self) -> Vec<(&'static str, ChannelState)> {
        self.channels.iter().map(|c| (c.name(), c.state())).collect()
    }

    /// True when every channel reports Inactive.
    pub fn all_inactive(&self) -> bool {
        self.channels
            .iter()
            .all(|c| c.state() == ChannelState::Inactive)
    }

    /// Mutable access to the named channels, in the order given.
    ///
    /// Fails if a name is unknown or appears twice, which is what makes
    /// the one-writer-per-channel rule hold without runtime locking.
    pub fn disjoint_mut(
        &mut self,
        names: &[&'static str],
    ) -> Result<Vec<&mut (dyn HardwareChannel + 'static)>, ConfigError> {
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ConfigError::ChannelReused(*name));
            }
        }
        let mut slots: Vec<Option<&mut (dyn HardwareChannel + 'static)>> =
            names.iter().map(|_| None).collect();
        for ch in &mut self.channels {
            if let Some(i) = names.iter().position(|n| *n == ch.name()) {
                slots[i] = Some(ch.as_mut());
            }
        }
        slots
            .into_iter()
            .zip(names)
            .map(|(slot, name)| slot.ok_or(ConfigError::UnknownChannel(*name)))
            .collect()
    }

    /// Drive every channel to its safe-off state.  Tries every channel
    /// even after a failure and returns all faults.
    pub fn force_all_inactive(&mut self) -> Vec<HardwareFault> {
        let mut faults = Vec::new();
        for ch in &mut self.channels {
            let res = if ch.supports_tone() {
                ch.stop_tone()
            } else {
                ch.set_inactive()
            };
            if let Err(f) = res {
                warn!("force-off failed: {}", f);
                faults.push(f);
            }
        }
        faults
    }
}

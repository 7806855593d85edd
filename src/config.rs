//! Controller configuration.
//!
//! The channel table and the effect batch are fixed at build time:
//! [`AsteroidConfig::default`] is the stock scenario for the Asteroid
//! prop.  [`AsteroidConfig::validate`] runs before any pin is touched, so
//! a bad table fails the process at startup rather than mid-batch.

use core::time::Duration;
use std::net::{Ipv4Addr, SocketAddr};

use serde::Serialize;

use crate::app::ports::ChannelState;
use crate::drivers::gpio_channel::Polarity;
use crate::effects::{EffectSpec, Pattern, SweepParams};
use crate::error::ConfigError;
use crate::pins;

/// Upper bound on effects in one batch (executor queue capacity).
pub const MAX_BATCH: usize = 16;

/// Tone capability of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneSpec {
    /// Frequency a plain `set_active` plays.
    pub base_hz: u32,
    /// PWM duty fraction (0.0 – 1.0).
    pub duty: f64,
}

/// One physical output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelSpec {
    pub name: &'static str,
    /// BCM GPIO number.
    pub gpio: u8,
    pub polarity: Polarity,
    /// State applied by the lifecycle manager at boot.
    pub boot_state: ChannelState,
    /// `Some` for tone emitters.
    pub tone: Option<ToneSpec>,
}

impl ChannelSpec {
    pub const fn switch(name: &'static str, gpio: u8, polarity: Polarity) -> Self {
        Self {
            name,
            gpio,
            polarity,
            boot_state: ChannelState::Inactive,
            tone: None,
        }
    }

    pub const fn tone(name: &'static str, gpio: u8, polarity: Polarity, tone: ToneSpec) -> Self {
        Self {
            name,
            gpio,
            polarity,
            boot_state: ChannelState::Inactive,
            tone: Some(tone),
        }
    }
}

/// Core controller configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AsteroidConfig {
    /// Address the trigger endpoint listens on.
    pub listen_addr: SocketAddr,
    /// Slack on top of the longest effect before the join barrier gives
    /// up, and again for cancelled tasks to unwind.
    pub batch_grace: Duration,
    pub channels: Vec<ChannelSpec>,
    pub effects: Vec<EffectSpec>,
}

impl Default for AsteroidConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            batch_grace: Duration::from_secs(5),
            channels: vec![
                ChannelSpec::switch("main_light", pins::MAIN_LIGHT_GPIO, Polarity::ActiveLow),
                ChannelSpec::switch("aux_light1", pins::AUX_LIGHT1_GPIO, Polarity::ActiveLow),
                ChannelSpec::switch("aux_light2", pins::AUX_LIGHT2_GPIO, Polarity::ActiveLow),
                ChannelSpec::tone(
                    "buzzer",
                    pins::BUZZER_GPIO,
                    Polarity::ActiveHigh,
                    ToneSpec {
                        base_hz: pins::BUZZER_BASE_HZ,
                        duty: pins::BUZZER_DUTY,
                    },
                ),
            ],
            effects: vec![
                EffectSpec::new("main_light", Duration::from_secs(5), Pattern::Steady),
                EffectSpec::new(
                    "aux_light1",
                    Duration::from_secs(5),
                    Pattern::Blink {
                        interval: Duration::from_millis(50),
                    },
                ),
                EffectSpec::new(
                    "aux_light2",
                    Duration::from_secs(5),
                    Pattern::Blink {
                        interval: Duration::from_millis(100),
                    },
                ),
                EffectSpec::new(
                    "buzzer",
                    Duration::from_secs(10),
                    Pattern::ToneSweep(SweepParams {
                        base_hz: pins::BUZZER_BASE_HZ,
                        max_hz: 6000,
                        min_hz: 1000,
                        step_hz: 10,
                        repetitions: 5,
                        duty: pins::BUZZER_DUTY,
                    }),
                ),
            ],
        }
    }
}

impl AsteroidConfig {
    /// Reject tables that would misbehave at run time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_grace.is_zero() {
            return Err(ConfigError::Invalid("batch grace"));
        }
        for (i, ch) in self.channels.iter().enumerate() {
            if ch.name.is_empty() {
                return Err(ConfigError::Invalid("channel name"));
            }
            if self.channels[..i].iter().any(|c| c.name == ch.name) {
                return Err(ConfigError::DuplicateChannel(ch.name));
            }
            if let Some(t) = ch.tone {
                if t.base_hz == 0 {
                    return Err(ConfigError::Invalid("tone base frequency"));
                }
                if !(0.0..=1.0).contains(&t.duty) {
                    return Err(ConfigError::Invalid("tone duty"));
                }
            }
        }

        if self.effects.is_empty() || self.effects.len() > MAX_BATCH {
            return Err(ConfigError::Invalid("effect count"));
        }
        for (i, fx) in self.effects.iter().enumerate() {
            let Some(ch) = self.channels.iter().find(|c| c.name == fx.channel) else {
                return Err(ConfigError::UnknownChannel(fx.channel));
            };
            if self.effects[..i].iter().any(|f| f.channel == fx.channel) {
                return Err(ConfigError::ChannelReused(fx.channel));
            }
            if matches!(fx.pattern, Pattern::ToneSweep(_)) && ch.tone.is_none() {
                return Err(ConfigError::NotToneCapable(fx.channel));
            }
            fx.validate()?;
        }
        Ok(())
    }

    /// `(channel, boot state)` pairs for the lifecycle manager.
    pub fn boot_states(&self) -> Vec<(&'static str, ChannelState)> {
        self.channels.iter().map(|c| (c.name, c.boot_state)).collect()
    }
}

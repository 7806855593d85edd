//! Blink: Active/Inactive square wave until the duration is used up.
//!
//! Each cycle is Active for `interval`, then Inactive for `interval`.
//! The elapsed check happens once per full cycle, so a run performs
//! `ceil(D / 2I)` cycles: `floor(D / 2I)`, or one more when `D` is not a
//! whole number of cycles.

use core::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Halt, pause};
use crate::app::ports::{Clock, HardwareChannel};

pub(super) async fn run<C: Clock>(
    channel: &mut dyn HardwareChannel,
    duration: Duration,
    interval: Duration,
    clock: &C,
    cancel: &CancellationToken,
) -> Result<(), Halt> {
    let start = clock.now();
    while clock.now().saturating_sub(start) < duration {
        channel.set_active()?;
        pause(clock, interval, cancel).await?;
        channel.set_inactive()?;
        pause(clock, interval, cancel).await?;
    }
    Ok(())
}

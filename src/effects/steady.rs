//! Steady: Active for the whole duration, then Inactive.

use core::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Halt, pause};
use crate::app::ports::{Clock, HardwareChannel};

pub(super) async fn run<C: Clock>(
    channel: &mut dyn HardwareChannel,
    duration: Duration,
    clock: &C,
    cancel: &CancellationToken,
) -> Result<(), Halt> {
    channel.set_active()?;
    pause(clock, duration, cancel).await?;
    channel.set_inactive()?;
    Ok(())
}

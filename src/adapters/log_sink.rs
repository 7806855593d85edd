//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events through the
//! `log` facade.  The subscriber installed in `main` decides where they
//! end up (stderr by default).

use log::{error, info, warn};

use crate::app::events::BatchEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`BatchEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::BatchStarted { tasks } => {
                info!("BATCH | started, {} effects", tasks);
            }
            BatchEvent::TaskFinished {
                channel,
                kind,
                elapsed,
            } => {
                info!("TASK  | {} {:?} done after {:?}", channel, kind, elapsed);
            }
            BatchEvent::TaskFaulted(fault) => {
                error!("FAULT | {}", fault);
            }
            BatchEvent::BatchTimedOut { limit } => {
                warn!("BATCH | join barrier expired after {:?}", limit);
            }
            BatchEvent::BatchFinished { elapsed, unsettled } if unsettled.is_empty() => {
                info!("BATCH | finished in {:?}, all channels inactive", elapsed);
            }
            BatchEvent::BatchFinished { elapsed, unsettled } => {
                warn!("BATCH | finished in {:?}, unsettled: {:?}", elapsed, unsettled);
            }
            BatchEvent::Lifecycle { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            BatchEvent::ShutdownRequested(reason) => {
                info!("STOP  | {}", reason);
            }
        }
    }
}

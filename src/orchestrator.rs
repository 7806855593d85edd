//! Effect orchestrator.  Fans one trigger out into a batch of effect
//! tasks and joins them.
//!
//! ```text
//!   run() ──▶ disjoint channel borrows ──▶ LocalExecutor
//!                                          ├── EffectSpec::run (main_light)
//!                                          ├── EffectSpec::run (aux_light1)
//!                                          └── EffectSpec::run (buzzer)
//!             join barrier (bounded) ◀─────┘
//!             settle stragglers ──▶ BatchReport
//! ```
//!
//! ## Guarantees
//!
//! - `run` returns only after every task has returned or been dropped.
//! - On return every channel the batch touched has been driven Inactive;
//!   channels that could not be are listed in [`BatchReport::unsettled`].
//! - The join barrier is bounded by the longest effect plus the grace
//!   period.  On expiry the batch token is cancelled and tasks get one
//!   more grace period to unwind before they are dropped.
//! - Batches are serialized by construction: `run` takes the rig by
//!   `&mut`, so a second batch cannot start while one is in flight.

use core::cell::Cell;
use core::time::Duration;

use edge_executor::{LocalExecutor, Task};
use futures_lite::future;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::app::events::BatchEvent;
use crate::app::ports::{ChannelState, Clock, EventSink};
use crate::config::MAX_BATCH;
use crate::effects::{EffectSpec, Pattern, TaskOutcome, TaskReport};
use crate::error::{ConfigError, HardwareFault};
use crate::rig::Rig;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running,
}

/// Result of one batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One entry per effect, in configuration order.
    pub tasks: Vec<TaskReport>,
    pub elapsed: Duration,
    /// The join barrier expired.
    pub timed_out: bool,
    /// Channels left in a state other than Inactive.
    pub unsettled: Vec<&'static str>,
}

impl BatchReport {
    pub fn first_fault(&self) -> Option<HardwareFault> {
        self.tasks.iter().find_map(|t| match t.outcome {
            TaskOutcome::Faulted(f) => Some(f),
            _ => None,
        })
    }

    /// Channels whose task faulted.
    pub fn failed_channels(&self) -> Vec<&'static str> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Faulted(_)))
            .map(|t| t.channel)
            .collect()
    }

    pub fn all_completed(&self) -> bool {
        self.tasks
            .iter()
            .all(|t| t.outcome == TaskOutcome::Completed)
    }
}

/// Marks the orchestrator Running until dropped, including when the
/// `run` future itself is dropped mid-batch.
struct RunningGuard<'a>(&'a Cell<bool>);

impl<'a> RunningGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct Orchestrator<C> {
    effects: Vec<EffectSpec>,
    grace: Duration,
    clock: C,
    shutdown: CancellationToken,
    running: Cell<bool>,
}

impl<C: Clock> Orchestrator<C> {
    /// Validate `effects` against `rig` and build the orchestrator.
    ///
    /// `shutdown` is the process-wide token; each batch runs under a
    /// child of it, so shutdown cancels any batch in flight.
    pub fn new(
        effects: Vec<EffectSpec>,
        grace: Duration,
        clock: C,
        shutdown: CancellationToken,
        rig: &Rig,
    ) -> Result<Self, ConfigError> {
        if effects.is_empty() || effects.len() > MAX_BATCH {
            return Err(ConfigError::Invalid("effect count"));
        }
        if grace.is_zero() {
            return Err(ConfigError::Invalid("batch grace"));
        }
        for (i, fx) in effects.iter().enumerate() {
            let Some(ch) = rig.get(fx.channel) else {
                return Err(ConfigError::UnknownChannel(fx.channel));
            };
            if effects[..i].iter().any(|f| f.channel == fx.channel) {
                return Err(ConfigError::ChannelReused(fx.channel));
            }
            if matches!(fx.pattern, Pattern::ToneSweep(_)) && !ch.supports_tone() {
                return Err(ConfigError::NotToneCapable(fx.channel));
            }
            fx.validate()?;
        }
        Ok(Self {
            effects,
            grace,
            clock,
            shutdown,
            running: Cell::new(false),
        })
    }

    pub fn state(&self) -> OrchestratorState {
        if self.running.get() {
            OrchestratorState::Running
        } else {
            OrchestratorState::Idle
        }
    }

    /// Longest effect plus the grace period.
    pub fn batch_limit(&self) -> Duration {
        let longest = self
            .effects
            .iter()
            .map(|e| e.duration)
            .max()
            .unwrap_or_default();
        longest + self.grace
    }

    /// Run one batch to completion.  Blocks the calling thread.
    pub fn run_once(&self, rig: &mut Rig, sink: &mut impl EventSink) -> BatchReport {
        future::block_on(self.run(rig, sink))
    }

    /// Run one batch to completion.
    pub async fn run(&self, rig: &mut Rig, sink: &mut impl EventSink) -> BatchReport {
        let started = self.clock.now();
        let names: Vec<&'static str> = self.effects.iter().map(|e| e.channel).collect();

        if self.shutdown.is_cancelled() {
            info!("Shutdown in progress, batch skipped");
            let tasks = self
                .effects
                .iter()
                .map(|fx| self.unrun(fx, TaskOutcome::Cancelled, rig))
                .collect();
            return BatchReport {
                tasks,
                elapsed: Duration::ZERO,
                timed_out: false,
                unsettled: Vec::new(),
            };
        }

        let _running = RunningGuard::enter(&self.running);
        sink.emit(&BatchEvent::BatchStarted {
            tasks: self.effects.len(),
        });

        let batch = self.shutdown.child_token();
        let limit = self.batch_limit();

        let (slots, timed_out) = match rig.disjoint_mut(&names) {
            Ok(channels) => {
                let executor: LocalExecutor<'_, MAX_BATCH> = LocalExecutor::new();
                let mut tasks: Vec<Option<Task<TaskReport>>> = self
                    .effects
                    .iter()
                    .zip(channels)
                    .map(|(fx, ch)| Some(executor.spawn(fx.run(ch, &self.clock, &batch))))
                    .collect();
                let mut slots: Vec<Option<TaskReport>> =
                    self.effects.iter().map(|_| None).collect();

                let timed_out = executor
                    .run(async {
                        if self.join_within(&mut tasks, &mut slots, limit).await {
                            return false;
                        }
                        warn!("Batch exceeded {:?}, cancelling remaining effects", limit);
                        batch.cancel();
                        if !self.join_within(&mut tasks, &mut slots, self.grace).await {
                            warn!("Effects ignored cancellation, dropping them");
                        }
                        true
                    })
                    .await;

                // Dropping a pending task cancels it and releases its channel.
                drop(tasks);
                (slots, timed_out)
            }
            Err(e) => {
                // The rig no longer matches the validated table.
                warn!("Batch rejected: {}", e);
                (self.effects.iter().map(|_| None).collect(), false)
            }
        };
        if timed_out {
            sink.emit(&BatchEvent::BatchTimedOut { limit });
        }

        let mut reports = Vec::with_capacity(self.effects.len());
        for (fx, slot) in self.effects.iter().zip(slots) {
            let report = match slot {
                Some(mut r) => {
                    if timed_out
                        && r.outcome == TaskOutcome::Cancelled
                        && !self.shutdown.is_cancelled()
                    {
                        r.outcome = TaskOutcome::TimedOut;
                    }
                    r
                }
                None if timed_out => self.unrun(fx, TaskOutcome::TimedOut, rig),
                None => {
                    let rejected = TaskOutcome::Rejected(ConfigError::UnknownChannel(fx.channel));
                    self.unrun(fx, rejected, rig)
                }
            };
            if let TaskOutcome::Faulted(f) = report.outcome {
                sink.emit(&BatchEvent::TaskFaulted(f));
            }
            sink.emit(&BatchEvent::TaskFinished {
                channel: report.channel,
                kind: report.kind,
                elapsed: report.elapsed,
            });
            reports.push(report);
        }

        let unsettled = self.settle_stragglers(&names, rig);
        let elapsed = self.clock.now().saturating_sub(started);
        sink.emit(&BatchEvent::BatchFinished {
            elapsed,
            unsettled: unsettled.clone(),
        });

        BatchReport {
            tasks: reports,
            elapsed,
            timed_out,
            unsettled,
        }
    }

    /// Await every outstanding task, or give up after `limit`.
    /// Returns true if all tasks finished.
    async fn join_within(
        &self,
        tasks: &mut [Option<Task<TaskReport>>],
        slots: &mut [Option<TaskReport>],
        limit: Duration,
    ) -> bool {
        let collect = async {
            for (task, slot) in tasks.iter_mut().zip(slots.iter_mut()) {
                if let Some(t) = task.as_mut() {
                    *slot = Some(t.await);
                    *task = None;
                }
            }
            true
        };
        let expire = async {
            self.clock.sleep(limit).await;
            false
        };
        future::or(collect, expire).await
    }

    /// Report for a task that never returned: force its channel off.
    fn unrun(&self, fx: &EffectSpec, outcome: TaskOutcome, rig: &mut Rig) -> TaskReport {
        let final_state = match rig.get_mut(fx.channel) {
            Some(ch) => {
                let res = if ch.supports_tone() {
                    ch.stop_tone()
                } else {
                    ch.set_inactive()
                };
                if let Err(f) = res {
                    warn!("{}: force-off failed: {}", fx.channel, f);
                }
                ch.state()
            }
            None => ChannelState::Inactive,
        };
        TaskReport {
            channel: fx.channel,
            kind: fx.kind(),
            outcome,
            final_state,
            elapsed: Duration::ZERO,
        }
    }

    /// Retry deactivation on any batch channel still Active.  Returns
    /// the channels that stay Active.
    fn settle_stragglers(&self, names: &[&'static str], rig: &mut Rig) -> Vec<&'static str> {
        let mut unsettled = Vec::new();
        for name in names {
            let Some(ch) = rig.get_mut(name) else {
                continue;
            };
            if ch.state() == ChannelState::Inactive {
                continue;
            }
            let res = if ch.supports_tone() {
                ch.stop_tone()
            } else {
                ch.set_inactive()
            };
            if res.is_err() || ch.state() != ChannelState::Inactive {
                warn!("{}: left {:?} after batch", name, ch.state());
                unsettled.push(*name);
            }
        }
        unsettled
    }
}

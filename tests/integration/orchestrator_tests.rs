//! Integration tests for the orchestrator: parallel fan-out, the join
//! barrier, fault isolation and the bounded join.
//!
//! These use the real clock with durations scaled down to tens of
//! milliseconds.

use std::future::Future;
use std::time::Duration;

use asteroid::adapters::time::SystemClock;
use asteroid::app::ports::{ChannelState, Clock, HardwareChannel};
use asteroid::effects::{EffectSpec, Pattern, SweepParams, TaskOutcome};
use asteroid::orchestrator::{Orchestrator, OrchestratorState};
use asteroid::rig::Rig;
use async_io_mini::Timer;
use tokio_util::sync::CancellationToken;

use crate::mock_hw::{FaultMode, Journal, MockChannel, Op, RecordingSink};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn rig(journal: &Journal, faulty: Option<(&'static str, FaultMode)>) -> Rig {
    let mode = |name: &str| match faulty {
        Some((n, m)) if n == name => m,
        _ => FaultMode::Never,
    };
    let channels: Vec<Box<dyn HardwareChannel>> = vec![
        Box::new(MockChannel::switch("main_light", journal).failing(mode("main_light"))),
        Box::new(MockChannel::switch("aux_light1", journal).failing(mode("aux_light1"))),
        Box::new(MockChannel::switch("aux_light2", journal).failing(mode("aux_light2"))),
        Box::new(MockChannel::tone("buzzer", journal).failing(mode("buzzer"))),
    ];
    Rig::new(channels).unwrap()
}

/// The stock scenario at 1/50 scale.
fn scaled_batch() -> Vec<EffectSpec> {
    vec![
        EffectSpec::new("main_light", ms(100), Pattern::Steady),
        EffectSpec::new("aux_light1", ms(100), Pattern::Blink { interval: ms(5) }),
        EffectSpec::new("aux_light2", ms(100), Pattern::Blink { interval: ms(10) }),
        EffectSpec::new(
            "buzzer",
            ms(200),
            Pattern::ToneSweep(SweepParams {
                base_hz: 440,
                max_hz: 6000,
                min_hz: 1000,
                step_hz: 500,
                repetitions: 5,
                duty: 0.5,
            }),
        ),
    ]
}

fn orchestrator<C: Clock>(
    effects: Vec<EffectSpec>,
    grace: Duration,
    clock: C,
    rig: &Rig,
) -> Orchestrator<C> {
    Orchestrator::new(effects, grace, clock, CancellationToken::new(), rig).unwrap()
}

// ── Join barrier ─────────────────────────────────────────────

#[test]
fn batch_returns_after_longest_effect_with_everything_inactive() {
    let journal = Journal::new();
    let mut rig = rig(&journal, None);
    let orch = orchestrator(scaled_batch(), ms(500), SystemClock::new(), &rig);
    let mut sink = RecordingSink::new();

    let report = orch.run_once(&mut rig, &mut sink);

    assert!(report.all_completed(), "{:?}", report.tasks);
    assert!(report.elapsed >= ms(200));
    assert!(report.elapsed < ms(600), "elapsed {:?}", report.elapsed);
    assert!(rig.all_inactive());
    assert!(report.unsettled.is_empty());
    assert!(!sink.timed_out());
    assert_eq!(orch.state(), OrchestratorState::Idle);
}

#[test]
fn short_effects_run_for_their_own_duration() {
    let journal = Journal::new();
    let mut rig = rig(&journal, None);
    let orch = orchestrator(scaled_batch(), ms(500), SystemClock::new(), &rig);

    orch.run_once(&mut rig, &mut RecordingSink::new());

    // main_light's first deactivation happens around its own 100ms, well
    // before the 200ms buzzer finishes.
    let main = journal.for_channel("main_light");
    let off = main.iter().find(|c| c.op == Op::Inactive).unwrap();
    let buzzer_end = journal.for_channel("buzzer").last().unwrap().at;
    assert!(off.at >= ms(100));
    assert!(off.at < buzzer_end, "{:?} vs {:?}", off.at, buzzer_end);
}

#[test]
fn all_effects_start_together() {
    let journal = Journal::new();
    let mut rig = rig(&journal, None);
    let orch = orchestrator(scaled_batch(), ms(500), SystemClock::new(), &rig);

    orch.run_once(&mut rig, &mut RecordingSink::new());

    let firsts: Vec<Duration> = ["main_light", "aux_light1", "aux_light2", "buzzer"]
        .iter()
        .map(|ch| journal.for_channel(ch)[0].at)
        .collect();
    let spread = *firsts.iter().max().unwrap() - *firsts.iter().min().unwrap();
    assert!(spread < ms(20), "start spread {:?}", spread);
}

#[test]
fn back_to_back_batches_each_settle() {
    let journal = Journal::new();
    let mut rig = rig(&journal, None);
    let effects = vec![EffectSpec::new("main_light", ms(20), Pattern::Steady)];
    let orch = orchestrator(effects, ms(200), SystemClock::new(), &rig);

    for _ in 0..3 {
        let report = orch.run_once(&mut rig, &mut RecordingSink::new());
        assert!(report.all_completed());
        assert!(rig.all_inactive());
    }
    assert_eq!(journal.count("main_light", Op::Active), 3);
}

// ── Fault isolation ──────────────────────────────────────────

#[test]
fn one_faulty_channel_does_not_stop_the_others() {
    let journal = Journal::new();
    let mut rig = rig(&journal, Some(("aux_light1", FaultMode::OnActivate)));
    let orch = orchestrator(scaled_batch(), ms(500), SystemClock::new(), &rig);
    let mut sink = RecordingSink::new();

    let report = orch.run_once(&mut rig, &mut sink);

    assert_eq!(report.failed_channels(), ["aux_light1"]);
    assert_eq!(report.first_fault().unwrap().channel, "aux_light1");
    assert_eq!(sink.faults().len(), 1);
    for t in report.tasks.iter().filter(|t| t.channel != "aux_light1") {
        assert_eq!(t.outcome, TaskOutcome::Completed, "{}", t.channel);
    }
    assert!(rig.all_inactive());
}

#[test]
fn channel_that_cannot_deactivate_is_reported_unsettled() {
    let journal = Journal::new();
    // Stuck Active, and every further write fails.
    let mut stuck = MockChannel::switch("main_light", &journal);
    stuck.set_active().unwrap();
    let channels: Vec<Box<dyn HardwareChannel>> = vec![
        Box::new(stuck.failing(FaultMode::Always)),
        Box::new(MockChannel::switch("aux_light1", &journal)),
    ];
    let mut rig = Rig::new(channels).unwrap();
    let effects = vec![
        EffectSpec::new("main_light", ms(20), Pattern::Steady),
        EffectSpec::new("aux_light1", ms(20), Pattern::Steady),
    ];
    let orch = orchestrator(effects, ms(200), SystemClock::new(), &rig);

    let report = orch.run_once(&mut rig, &mut RecordingSink::new());

    assert_eq!(report.unsettled, ["main_light"]);
    assert_eq!(
        report.tasks[0].final_state,
        ChannelState::Active,
        "stuck channel keeps its last good state"
    );
    assert_eq!(report.tasks[1].outcome, TaskOutcome::Completed);
}

// ── Bounded join ─────────────────────────────────────────────

/// A clock whose short sleeps never finish, standing in for an effect
/// stuck on hardware.  Long sleeps (the join barrier) use real timers.
struct StuckClock {
    inner: SystemClock,
    threshold: Duration,
}

impl Clock for StuckClock {
    fn now(&self) -> Duration {
        self.inner.now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        let stuck = duration < self.threshold;
        async move {
            if stuck {
                std::future::pending::<()>().await;
            } else {
                Timer::after(duration).await;
            }
        }
    }
}

#[test]
fn expired_join_cancels_and_forces_channels_off() {
    let journal = Journal::new();
    let mut rig = rig(&journal, None);
    let effects = vec![
        EffectSpec::new("main_light", ms(40), Pattern::Steady),
        EffectSpec::new("aux_light1", ms(40), Pattern::Blink { interval: ms(10) }),
    ];
    let clock = StuckClock {
        inner: SystemClock::new(),
        threshold: ms(60),
    };
    let orch = orchestrator(effects, ms(60), clock, &rig);
    assert_eq!(orch.batch_limit(), ms(100));
    let mut sink = RecordingSink::new();

    let report = orch.run_once(&mut rig, &mut sink);

    assert!(report.timed_out);
    assert!(sink.timed_out());
    assert!(report.tasks.iter().all(|t| t.outcome == TaskOutcome::TimedOut));
    assert!(report.elapsed >= ms(100));
    assert!(rig.all_inactive());
    assert!(report.unsettled.is_empty());
}

// ── Shutdown ─────────────────────────────────────────────────

#[test]
fn shutdown_during_batch_cancels_promptly() {
    let journal = Journal::new();
    let mut rig = rig(&journal, None);
    let shutdown = CancellationToken::new();
    let effects = vec![
        EffectSpec::new("main_light", Duration::from_secs(5), Pattern::Steady),
        EffectSpec::new("aux_light1", Duration::from_secs(5), Pattern::Blink { interval: ms(50) }),
    ];
    let orch = Orchestrator::new(effects, ms(500), SystemClock::new(), shutdown.clone(), &rig)
        .unwrap();

    let mut sink = RecordingSink::new();
    let report = futures_lite::future::block_on(async {
        let run = orch.run(&mut rig, &mut sink);
        let cancel = async {
            Timer::after(ms(100)).await;
            shutdown.cancel();
            std::future::pending().await
        };
        futures_lite::future::or(run, cancel).await
    });

    assert!(report.elapsed < Duration::from_secs(1), "{:?}", report.elapsed);
    assert!(report.tasks.iter().all(|t| t.outcome == TaskOutcome::Cancelled));
    assert!(rig.all_inactive());
}

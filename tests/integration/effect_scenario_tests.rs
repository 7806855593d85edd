//! Single-effect scenarios on a virtual clock.
//!
//! Each effect runs against a [`MockChannel`] stamped with virtual time,
//! so the stock multi-second effects finish instantly and the journal
//! shows exactly when each transition would have happened.

use std::time::Duration;

use asteroid::adapters::time::VirtualClock;
use asteroid::app::ports::{ChannelState, Clock};
use asteroid::config::AsteroidConfig;
use asteroid::effects::{EffectSpec, Pattern, SweepParams, TaskOutcome};
use futures_lite::future::block_on;
use tokio_util::sync::CancellationToken;

use crate::mock_hw::{FaultMode, Journal, MockChannel, Op};

fn stock_effect(channel: &str) -> EffectSpec {
    AsteroidConfig::default()
        .effects
        .into_iter()
        .find(|e| e.channel == channel)
        .unwrap()
}

// ── Steady ───────────────────────────────────────────────────

#[test]
fn steady_main_light_active_at_zero_inactive_after_five_seconds() {
    let journal = Journal::new();
    let clock = VirtualClock::new();
    let mut ch = MockChannel::switch("main_light", &journal).with_clock(&clock);

    let fx = stock_effect("main_light");
    let report = block_on(fx.run(&mut ch, &clock, &CancellationToken::new()));

    assert_eq!(report.outcome, TaskOutcome::Completed);
    let calls = journal.for_channel("main_light");
    assert_eq!(calls[0].op, Op::Active);
    assert_eq!(calls[0].at, Duration::ZERO);
    // Never active again after the first deactivation.
    let first_off = calls.iter().position(|c| c.op == Op::Inactive).unwrap();
    assert!(calls[first_off].at >= Duration::from_secs(5));
    assert!(calls[first_off..].iter().all(|c| c.op == Op::Inactive));
    assert_eq!(report.final_state, ChannelState::Inactive);
}

// ── Blink ────────────────────────────────────────────────────

#[test]
fn blink_aux_light_toggles_every_fifty_ms() {
    let journal = Journal::new();
    let clock = VirtualClock::new();
    let mut ch = MockChannel::switch("aux_light1", &journal).with_clock(&clock);

    let fx = stock_effect("aux_light1");
    let report = block_on(fx.run(&mut ch, &clock, &CancellationToken::new()));

    assert_eq!(report.outcome, TaskOutcome::Completed);
    assert_eq!(journal.count("aux_light1", Op::Active), 50);

    let calls = journal.for_channel("aux_light1");
    for pair in calls.windows(2).take(99) {
        assert_eq!(pair[1].at - pair[0].at, Duration::from_millis(50));
        assert_ne!(pair[0].op, pair[1].op);
    }
    assert_eq!(calls.last().unwrap().op, Op::Inactive);
    assert_eq!(clock.now(), Duration::from_secs(5));
}

#[test]
fn blink_with_partial_cycle_runs_one_extra_cycle() {
    let journal = Journal::new();
    let clock = VirtualClock::new();
    let mut ch = MockChannel::switch("aux_light2", &journal).with_clock(&clock);

    let fx = EffectSpec::new(
        "aux_light2",
        Duration::from_millis(450),
        Pattern::Blink {
            interval: Duration::from_millis(100),
        },
    );
    block_on(fx.run(&mut ch, &clock, &CancellationToken::new()));

    // floor(450 / 200) = 2, plus the partial cycle.
    assert_eq!(journal.count("aux_light2", Op::Active), 3);
    assert_eq!(ch_state(&journal, "aux_light2"), Op::Inactive);
}

fn ch_state(journal: &Journal, channel: &str) -> Op {
    journal.ops(channel).last().copied().unwrap()
}

// ── ToneSweep ────────────────────────────────────────────────

#[test]
fn stock_sweep_decreases_within_each_pass_and_ends_silent() {
    let journal = Journal::new();
    let clock = VirtualClock::new();
    let mut ch = MockChannel::tone("buzzer", &journal).with_clock(&clock);

    let fx = stock_effect("buzzer");
    let report = block_on(fx.run(&mut ch, &clock, &CancellationToken::new()));
    assert_eq!(report.outcome, TaskOutcome::Completed);

    let ops = journal.ops("buzzer");
    assert_eq!(ops[0], Op::StartTone { hz: 440, duty: 0.5 });

    let freqs = journal.frequencies("buzzer");
    assert_eq!(freqs.len(), 5 * 500);
    for pass in freqs.chunks(500) {
        assert_eq!(pass[0], 6000);
        assert_eq!(*pass.last().unwrap(), 1010);
        assert!(pass.windows(2).all(|w| w[0] > w[1]));
    }

    let last = journal.for_channel("buzzer").last().copied().unwrap();
    assert_eq!(last.op, Op::StopTone);
    assert!(last.at >= Duration::from_secs(10));
    assert_eq!(report.final_state, ChannelState::Inactive);
}

#[test]
fn sweep_on_switch_channel_faults_and_settles() {
    let journal = Journal::new();
    let clock = VirtualClock::new();
    let mut ch = MockChannel::switch("main_light", &journal).with_clock(&clock);

    let fx = EffectSpec::new(
        "main_light",
        Duration::from_secs(1),
        Pattern::ToneSweep(SweepParams {
            base_hz: 440,
            max_hz: 2000,
            min_hz: 1000,
            step_hz: 100,
            repetitions: 1,
            duty: 0.5,
        }),
    );
    let report = block_on(fx.run(&mut ch, &clock, &CancellationToken::new()));

    assert!(matches!(report.outcome, TaskOutcome::Faulted(_)));
    assert_eq!(journal.ops("main_light"), [Op::Inactive]);
}

// ── Faults and cancellation ──────────────────────────────────

#[test]
fn activation_fault_still_leaves_channel_inactive() {
    let journal = Journal::new();
    let clock = VirtualClock::new();
    let mut ch = MockChannel::switch("main_light", &journal)
        .with_clock(&clock)
        .failing(FaultMode::OnActivate);

    let report = block_on(stock_effect("main_light").run(&mut ch, &clock, &CancellationToken::new()));

    match report.outcome {
        TaskOutcome::Faulted(f) => assert_eq!(f.channel, "main_light"),
        other => panic!("expected fault, got {:?}", other),
    }
    assert_eq!(report.final_state, ChannelState::Inactive);
    assert_eq!(clock.now(), Duration::ZERO);
}

#[test]
fn cancellation_mid_blink_settles_channel() {
    let journal = Journal::new();
    let clock = VirtualClock::new();
    let mut ch = MockChannel::switch("aux_light1", &journal).with_clock(&clock);
    let cancel = CancellationToken::new();

    let fx = stock_effect("aux_light1");
    let report = block_on(futures_lite::future::or(
        fx.run(&mut ch, &clock, &cancel),
        async {
            // Let a few cycles pass, then cancel and wait for the task.
            while clock.now() < Duration::from_millis(500) {
                futures_lite::future::yield_now().await;
            }
            cancel.cancel();
            std::future::pending().await
        },
    ));

    assert_eq!(report.outcome, TaskOutcome::Cancelled);
    assert_eq!(report.final_state, ChannelState::Inactive);
    assert!(report.elapsed < Duration::from_secs(5));
    assert_eq!(ch_state(&journal, "aux_light1"), Op::Inactive);
}

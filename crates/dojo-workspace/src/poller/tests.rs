use std::sync::Arc;
use std::time::Duration;

use dojo_api::ProbeOutcome::{NotReady, Reachable, Unverifiable};

use super::*;
use crate::testing::{settle, ScriptedProbe};

const URL_A: &str = "http://localhost/workspace/terminal/";
const URL_B: &str = "http://localhost/workspace/code/";

fn policy(max_attempts: u32) -> ProbePolicy {
    ProbePolicy {
        interval: Duration::from_secs(1),
        max_attempts,
        fail_open_after: 3,
    }
}

#[test]
fn reachable_is_ready_immediately() {
    let mut machine = ProbeMachine::new(Service::Terminal, policy(30));
    assert_eq!(machine.observe(Reachable), ProbeState::Ready);
    assert_eq!(machine.attempt(), 1);
}

#[test]
fn three_unverifiable_outcomes_fail_open() {
    let mut machine = ProbeMachine::new(Service::Code, policy(30));
    assert_eq!(machine.observe(Unverifiable), ProbeState::Probing);
    assert_eq!(machine.observe(Unverifiable), ProbeState::Probing);
    assert_eq!(machine.observe(Unverifiable), ProbeState::Ready);
}

#[test]
fn not_ready_resets_unverifiable_streak() {
    let mut machine = ProbeMachine::new(Service::Code, policy(30));
    for outcome in [Unverifiable, Unverifiable, NotReady, Unverifiable, Unverifiable] {
        assert_eq!(machine.observe(outcome), ProbeState::Probing);
    }
    assert_eq!(machine.observe(Unverifiable), ProbeState::Ready);
}

#[test]
fn never_ready_fails_at_max_attempts() {
    let mut machine = ProbeMachine::new(Service::Desktop, policy(30));
    for _ in 0..29 {
        assert_eq!(machine.observe(NotReady), ProbeState::Probing);
    }
    assert_eq!(machine.observe(NotReady), ProbeState::Failed);
    assert_eq!(machine.attempt(), 30);

    assert_eq!(machine.observe(Reachable), ProbeState::Failed);
    assert_eq!(machine.attempt(), 30);
    assert_eq!(
        machine.failure_message(),
        "Desktop service timed out after 30 attempts"
    );
}

#[test]
fn reachable_on_last_attempt_wins() {
    let mut machine = ProbeMachine::new(Service::Terminal, policy(2));
    assert_eq!(machine.observe(NotReady), ProbeState::Probing);
    assert_eq!(machine.observe(Reachable), ProbeState::Ready);
}

#[test]
fn policy_from_config() {
    let config = WorkspaceConfig::default();
    assert_eq!(ProbePolicy::from(&config), ProbePolicy::default());
}

#[tokio::test(start_paused = true)]
async fn never_ready_probe_stops_after_max_attempts() {
    let probe = Arc::new(ScriptedProbe::new(NotReady));
    let poller = WorkspacePoller::new(probe.clone(), ProbePolicy::default());
    let mut rx = poller.subscribe();

    assert!(poller.watch(Service::Terminal, URL_A));
    let status = rx
        .wait_for(|s| matches!(s, PollerStatus::Error { .. }))
        .await
        .unwrap()
        .clone();

    assert_eq!(
        status,
        PollerStatus::Error {
            service: Service::Terminal,
            message: "Terminal service timed out after 30 attempts".into(),
        }
    );
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(probe.calls(URL_A), 30);
}

#[tokio::test(start_paused = true)]
async fn unverifiable_probe_fails_open() {
    let probe = Arc::new(ScriptedProbe::new(Unverifiable));
    let poller = WorkspacePoller::new(probe.clone(), ProbePolicy::default());
    let mut rx = poller.subscribe();

    poller.watch(Service::Code, URL_B);
    let status = rx
        .wait_for(|s| !matches!(s, PollerStatus::Loading { .. }))
        .await
        .unwrap()
        .clone();

    assert_eq!(
        status,
        PollerStatus::Ready {
            service: Service::Code,
            url: URL_B.into(),
        }
    );
    assert_eq!(probe.calls(URL_B), 3);
}

#[tokio::test(start_paused = true)]
async fn loading_reports_attempts() {
    let probe = Arc::new(ScriptedProbe::new(NotReady).script(URL_A, vec![NotReady, NotReady, Reachable]));
    let poller = WorkspacePoller::new(probe, ProbePolicy::default());
    let mut rx = poller.subscribe();

    poller.watch(Service::Terminal, URL_A);
    rx.wait_for(|s| matches!(s, PollerStatus::Loading { attempt: 2, .. }))
        .await
        .unwrap();
    rx.wait_for(|s| matches!(s, PollerStatus::Ready { .. }))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn newer_probe_supersedes_older_one() {
    let probe = Arc::new(
        ScriptedProbe::new(NotReady)
            .script(URL_A, vec![Reachable])
            .delay(URL_A, Duration::from_secs(5)),
    );
    let poller = WorkspacePoller::new(probe.clone(), policy(3));
    let mut rx = poller.subscribe();

    poller.watch(Service::Terminal, URL_A);
    settle().await;
    assert_eq!(probe.calls(URL_A), 1);

    poller.watch(Service::Code, URL_B);
    let status = rx
        .wait_for(|s| matches!(s, PollerStatus::Error { .. }))
        .await
        .unwrap()
        .clone();
    assert_eq!(status.service(), Some(Service::Code));

    // Well past A's slow probe: its "ready" must never land.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(poller.status(), status);
    assert_eq!(poller.target(), Some((Service::Code, URL_B.to_string())));
}

#[tokio::test(start_paused = true)]
async fn same_inputs_are_a_noop() {
    let probe = Arc::new(ScriptedProbe::new(Reachable));
    let poller = WorkspacePoller::new(probe.clone(), ProbePolicy::default());
    let mut rx = poller.subscribe();

    assert!(poller.watch(Service::Terminal, URL_A));
    rx.wait_for(|s| matches!(s, PollerStatus::Ready { .. }))
        .await
        .unwrap();

    assert!(!poller.watch(Service::Terminal, URL_A));
    settle().await;
    assert_eq!(probe.calls(URL_A), 1);
    assert!(matches!(poller.status(), PollerStatus::Ready { .. }));
}

#[tokio::test(start_paused = true)]
async fn retry_restarts_after_error() {
    let probe = Arc::new(
        ScriptedProbe::new(Reachable).script(URL_A, vec![NotReady, NotReady, NotReady]),
    );
    let poller = WorkspacePoller::new(probe.clone(), policy(3));
    let mut rx = poller.subscribe();

    assert!(!poller.retry(), "nothing to retry yet");
    poller.watch(Service::Terminal, URL_A);
    rx.wait_for(|s| matches!(s, PollerStatus::Error { .. }))
        .await
        .unwrap();

    assert!(poller.retry());
    rx.wait_for(|s| matches!(s, PollerStatus::Ready { .. }))
        .await
        .unwrap();
    assert_eq!(probe.calls(URL_A), 4);
    assert!(!poller.retry(), "retry only applies to errors");
}

#[tokio::test(start_paused = true)]
async fn watching_failed_inputs_again_does_not_restart() {
    let probe = Arc::new(ScriptedProbe::new(NotReady));
    let poller = WorkspacePoller::new(probe.clone(), policy(3));
    let mut rx = poller.subscribe();

    poller.watch(Service::Terminal, URL_A);
    rx.wait_for(|s| matches!(s, PollerStatus::Error { .. }))
        .await
        .unwrap();

    assert!(!poller.watch(Service::Terminal, URL_A));
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(probe.calls(URL_A), 3);
    assert!(matches!(poller.status(), PollerStatus::Error { .. }));

    assert!(poller.watch(Service::Code, URL_B));
}

#[tokio::test(start_paused = true)]
async fn terminal_states_are_published_as_events() {
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let probe = Arc::new(ScriptedProbe::new(Reachable).script(URL_B, vec![NotReady; 3]));
    let poller = WorkspacePoller::new(probe, policy(3)).with_events(events.clone());
    let mut status = poller.subscribe();

    poller.watch(Service::Terminal, URL_A);
    status
        .wait_for(|s| matches!(s, PollerStatus::Ready { .. }))
        .await
        .unwrap();
    assert!(matches!(
        rx.try_recv(),
        Ok(Event::ServiceReady { service: Service::Terminal, ref url }) if url == URL_A
    ));

    poller.watch(Service::Code, URL_B);
    status
        .wait_for(|s| matches!(s, PollerStatus::Error { .. }))
        .await
        .unwrap();
    assert!(matches!(
        rx.try_recv(),
        Ok(Event::ServiceFailed { service: Service::Code, .. })
    ));
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_probing() {
    let probe = Arc::new(ScriptedProbe::new(NotReady));
    let poller = WorkspacePoller::new(probe.clone(), ProbePolicy::default());

    poller.watch(Service::Terminal, URL_A);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    poller.cancel();
    let calls = probe.calls(URL_A);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(probe.calls(URL_A), calls);
    assert_eq!(poller.status(), PollerStatus::Idle);
    assert!(poller.target().is_none());
}

#[tokio::test(start_paused = true)]
async fn dropping_poller_cancels_probe() {
    let probe = Arc::new(ScriptedProbe::new(NotReady));
    let poller = WorkspacePoller::new(probe.clone(), ProbePolicy::default());

    poller.watch(Service::Desktop, URL_A);
    settle().await;
    drop(poller);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(probe.calls(URL_A), 1);
}

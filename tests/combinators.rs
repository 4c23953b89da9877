use std::time::Duration;

use pledge::{Pledge, PledgeExt, Resolution, State, scheduler};
use tokio::task::LocalSet;

#[test]
fn all_empty_fulfills_immediately() {
    let all = Pledge::<i32, String>::all(Vec::<Pledge<i32, String>>::new());

    assert_eq!(all.peek(), Some(Ok(Vec::new())));
}

#[test]
fn all_preserves_input_order() {
    let (first, resolve_first) = Pledge::<&str, &str>::deferred();
    let (second, resolve_second) = Pledge::<&str, &str>::deferred();
    let all = Pledge::all(vec![first, second]);

    resolve_second.fulfill("b");
    scheduler::run_until_idle();
    assert_eq!(all.state(), State::Pending, "One input is still pending");

    resolve_first.fulfill("a");
    scheduler::run_until_idle();
    assert_eq!(all.peek(), Some(Ok(vec!["a", "b"])));
}

#[test]
fn all_resolved_inputs() {
    let all = Pledge::all(vec![Pledge::<&str, &str>::resolved("a"), Pledge::resolved("b")]);

    scheduler::run_until_idle();
    assert_eq!(all.peek(), Some(Ok(vec!["a", "b"])));
}

#[test]
fn all_rejects_with_first_reason() {
    let all = Pledge::all(vec![
        Pledge::<&str, &str>::resolved("a"),
        Pledge::rejected("x"),
        Pledge::rejected("y"),
    ]);

    scheduler::run_until_idle();
    assert_eq!(all.peek(), Some(Err("x")));
}

#[test]
fn all_wraps_plain_values() {
    let (pending, resolver) = Pledge::<i32, String>::deferred();
    let all = Pledge::all(vec![
        Resolution::value(1),
        Resolution::from(pending),
        Resolution::value(3),
    ]);

    resolver.fulfill(2);
    scheduler::run_until_idle();
    assert_eq!(all.peek(), Some(Ok(vec![1, 2, 3])));
}

#[test]
fn race_first_settlement_wins() {
    let (slow, resolve_slow) = Pledge::<&str, &str>::deferred();
    let race = Pledge::race(vec![slow, Pledge::resolved("fast")]);

    scheduler::run_until_idle();
    resolve_slow.fulfill("slow");
    scheduler::run_until_idle();

    assert_eq!(race.peek(), Some(Ok("fast")));
}

#[test]
fn race_first_rejection_wins() {
    let (slow, resolve_slow) = Pledge::<&str, &str>::deferred();
    let race = Pledge::race(vec![slow, Pledge::rejected("fail")]);

    scheduler::run_until_idle();
    resolve_slow.fulfill("slow");
    scheduler::run_until_idle();

    assert_eq!(race.peek(), Some(Err("fail")));
}

#[test]
fn race_empty_stays_pending() {
    let race = Pledge::<i32, String>::race(Vec::<Pledge<i32, String>>::new());

    scheduler::run_until_idle();
    assert_eq!(race.state(), State::Pending);
}

#[tokio::test]
async fn race_against_delayed_pledge() {
    LocalSet::new()
        .run_until(async {
            scheduler::set_backend(|| {
                tokio::task::spawn_local(async {
                    scheduler::run_until_idle();
                });
            });

            let (slow, completion) = async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, String>("slow")
            }
            .into_pledge();
            let slow_handle = tokio::task::spawn_local(completion);

            let winner = Pledge::race(vec![slow.clone(), Pledge::resolved("fast")]);
            assert_eq!(winner.clone().await, Ok("fast"));

            slow_handle.await.expect("Completion should not panic");
            assert_eq!(slow.await, Ok("slow"));
            assert_eq!(winner.peek(), Some(Ok("fast")), "Later settlement is ignored");
        })
        .await;
}

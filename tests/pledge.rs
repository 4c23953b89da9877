use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use pledge::{Pledge, Resolution, SettleError, State, scheduler};

#[test]
fn pledge_setup_runs_synchronously() {
    let called = Rc::new(Cell::new(false));
    let called_cl = Rc::clone(&called);

    let pledge = Pledge::<i32, String>::new(move |_resolver| {
        called_cl.set(true);
        Ok(())
    });

    assert!(called.get(), "Setup should run inside the constructor");
    assert_eq!(pledge.state(), State::Pending);
}

#[test]
fn pledge_setup_error_rejects() {
    let pledge = Pledge::<i32, String>::new(|_resolver| Err("should be caught".to_string()));

    assert_eq!(pledge.state(), State::Rejected);
    assert_eq!(pledge.peek(), Some(Err("should be caught".to_string())));
}

#[test]
fn pledge_setup_error_after_settlement_is_ignored() {
    let pledge = Pledge::<i32, String>::new(|resolver| {
        resolver.fulfill(1);
        Err("too late".to_string())
    });

    assert_eq!(pledge.peek(), Some(Ok(1)), "First settlement should win");
}

#[test]
fn pledge_settles_only_once() {
    let (pledge, resolver) = Pledge::<i32, String>::deferred();

    resolver.fulfill(1);
    resolver.fulfill(2);
    resolver.reject("nope".to_string());

    assert_eq!(pledge.state(), State::Fulfilled);
    assert_eq!(pledge.peek(), Some(Ok(1)), "Second settle should be a no-op");
}

#[test]
fn pledge_resolved_with_itself_fails() {
    let (pledge, resolver) = Pledge::<i32, String>::deferred();

    let r = resolver.resolve(pledge.clone());

    assert_eq!(r, Err(SettleError::SelfResolution));
    assert_eq!(pledge.state(), State::Pending, "Pledge should stay pending");
    scheduler::run_until_idle();
    assert_eq!(pledge.state(), State::Pending);
}

#[test]
fn pledge_then_runs_asynchronously() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_cl = Rc::clone(&seen);

    Pledge::<&str, String>::resolved("hello").map(move |x| seen_cl.borrow_mut().push(x));

    assert!(seen.borrow().is_empty(), "Callback must not run before then returns");
    scheduler::run_until_idle();
    assert_eq!(*seen.borrow(), vec!["hello"], "Callback should run exactly once");
}

#[test]
fn pledge_rejected_calls_rejection_handler() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_cl = Rc::clone(&seen);

    Pledge::<(), &str>::rejected("bye").then(
        |_| Ok(()),
        move |r| {
            seen_cl.borrow_mut().push(r);
            Ok(())
        },
    );

    scheduler::run_until_idle();
    assert_eq!(*seen.borrow(), vec!["bye"]);
}

#[test]
fn pledge_then_chains_values() {
    let seen = Rc::new(Cell::new(0));
    let seen_cl = Rc::clone(&seen);

    Pledge::<i32, String>::resolved(1)
        .map(|x| x + 1)
        .map(move |y| seen_cl.set(y));

    scheduler::run_until_idle();
    assert_eq!(seen.get(), 2);
}

#[test]
fn pledge_then_can_change_value_type() {
    let chained = Pledge::<i32, String>::resolved(7)
        .and_then(|x| Ok(format!("value {x}")))
        .map(|s: String| s.len());

    scheduler::run_until_idle();
    assert_eq!(chained.peek(), Some(Ok(7)));
}

#[test]
fn pledge_reactions_run_in_registration_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let (pledge, resolver) = Pledge::<i32, String>::deferred();

    for name in ["f1", "f2", "f3"] {
        let log = Rc::clone(&log);
        pledge.map(move |_| log.borrow_mut().push(name));
    }
    resolver.fulfill(0);

    assert!(log.borrow().is_empty(), "Settlement must not dispatch inline");
    scheduler::run_until_idle();
    assert_eq!(*log.borrow(), vec!["f1", "f2", "f3"]);
}

#[test]
fn pledge_reaction_registered_after_settlement_is_dispatched() {
    let (pledge, resolver) = Pledge::<i32, String>::deferred();
    resolver.fulfill(3);
    scheduler::run_until_idle();

    let late = pledge.map(|x| x * 10);
    assert_eq!(late.state(), State::Pending, "Late reaction still waits for a turn");
    scheduler::run_until_idle();
    assert_eq!(late.peek(), Some(Ok(30)));
}

#[test]
fn pledge_callback_error_rejects_derived() {
    let derived = Pledge::<i32, String>::resolved(1)
        .and_then(|_| Err::<i32, _>("boom".to_string()))
        .map(|x| x + 1);

    scheduler::run_until_idle();
    assert_eq!(derived.peek(), Some(Err("boom".to_string())));
}

#[test]
fn pledge_rejection_passes_through_missing_handler() {
    let recovered = Pledge::<i32, String>::rejected("bye".to_string())
        .map(|x| x + 1)
        .catch(|r| Ok(r.len() as i32));

    scheduler::run_until_idle();
    assert_eq!(recovered.peek(), Some(Ok(3)), "Reason should reach the catch handler");
}

#[test]
fn pledge_catch_skipped_when_fulfilled() {
    let catch_called = Rc::new(Cell::new(false));
    let catch_called_cl = Rc::clone(&catch_called);

    let chained = Pledge::<&str, String>::new(|resolver| {
        resolver.fulfill("hello");
        Ok(())
    })
    .catch(move |_| {
        catch_called_cl.set(true);
        Ok("recovered")
    });

    scheduler::run_until_idle();
    assert_eq!(chained.peek(), Some(Ok("hello")));
    assert!(!catch_called.get(), "Catch should not run for a fulfilled pledge");
}

#[test]
fn pledge_rejection_handler_result_fulfills() {
    let recovered = Pledge::<i32, String>::rejected("bye".to_string()).then(
        |x| Ok(x),
        |_| Ok(0),
    );

    scheduler::run_until_idle();
    assert_eq!(recovered.state(), State::Fulfilled);
    assert_eq!(recovered.peek(), Some(Ok(0)));
}

#[test]
fn pledge_callback_returning_pledge_is_adopted() {
    let (inner, inner_resolver) = Pledge::<i32, String>::deferred();
    let inner_cl = inner.clone();

    let outer = Pledge::<i32, String>::resolved(1).and_then(move |_| inner_cl);

    scheduler::run_until_idle();
    assert_eq!(outer.state(), State::Pending, "Outer should follow the inner pledge");

    inner_resolver.fulfill(99);
    scheduler::run_until_idle();
    assert_eq!(outer.peek(), Some(Ok(99)));
}

#[test]
fn pledge_resolved_with_rejected_pledge_rejects() {
    let adopted = Pledge::<i32, String>::adopt(Pledge::<i32, String>::rejected("inner".to_string()));

    scheduler::run_until_idle();
    assert_eq!(adopted.peek(), Some(Err("inner".to_string())));
}

#[test]
fn pledge_resolver_stored_for_later_use() {
    let stash = Rc::new(RefCell::new(None));
    let stash_cl = Rc::clone(&stash);

    let pledge = Pledge::<i32, String>::new(move |resolver| {
        *stash_cl.borrow_mut() = Some(resolver);
        Ok(())
    });
    let doubled = pledge.map(|x| x * 2);

    scheduler::run_until_idle();
    assert_eq!(doubled.state(), State::Pending);

    if let Some(resolver) = stash.borrow_mut().take() {
        resolver
            .resolve(Resolution::value(21))
            .expect("Resolving with a value cannot fail");
    }
    scheduler::run_until_idle();
    assert_eq!(doubled.peek(), Some(Ok(42)));
}

#[test]
fn pledge_unrelated_pledges_dispatch_in_settlement_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let (a, resolve_a) = Pledge::<&str, String>::deferred();
    let (b, resolve_b) = Pledge::<&str, String>::deferred();

    for p in [&a, &b] {
        let log = Rc::clone(&log);
        p.map(move |x| log.borrow_mut().push(x));
    }
    resolve_b.fulfill("b");
    resolve_a.fulfill("a");

    scheduler::run_until_idle();
    assert_eq!(*log.borrow(), vec!["b", "a"]);
}

#[derive(Clone, Debug, PartialEq)]
enum Failure {
    Settle(SettleError),
    Other(String),
}

impl From<SettleError> for Failure {
    fn from(err: SettleError) -> Self {
        Failure::Settle(err)
    }
}

#[test]
fn pledge_then_checked_rejects_callback_returning_derived() {
    let slot: Rc<RefCell<Option<Pledge<i32, Failure>>>> = Rc::new(RefCell::new(None));
    let slot_cl = Rc::clone(&slot);

    let derived = Pledge::<i32, Failure>::resolved(1).then_checked(
        move |_| slot_cl.borrow_mut().take().expect("Derived pledge should be stored"),
        |reason| Err::<i32, _>(reason),
    );
    *slot.borrow_mut() = Some(derived.clone());

    scheduler::run_until_idle();
    assert_eq!(
        derived.peek(),
        Some(Err(Failure::Settle(SettleError::SelfResolution))),
        "Derived pledge should not hang"
    );
}

#[test]
fn pledge_then_checked_behaves_like_then() {
    let fulfilled = Pledge::<i32, Failure>::resolved(2)
        .then_checked(|x| Ok::<_, Failure>(x * 10), |reason| Err::<i32, _>(reason));
    let recovered = Pledge::<i32, Failure>::rejected(Failure::Other("bad".to_string()))
        .then_checked(|x| Ok::<_, Failure>(x), |_| Ok::<_, Failure>(0));

    scheduler::run_until_idle();
    assert_eq!(fulfilled.peek(), Some(Ok(20)));
    assert_eq!(recovered.peek(), Some(Ok(0)));
}

#[test]
fn pledge_then_callback_returning_derived_stays_pending() {
    let slot: Rc<RefCell<Option<Pledge<i32, String>>>> = Rc::new(RefCell::new(None));
    let slot_cl = Rc::clone(&slot);

    let derived = Pledge::<i32, String>::resolved(1).then(
        move |_| slot_cl.borrow_mut().take().expect("Derived pledge should be stored"),
        |reason| Err::<i32, _>(reason),
    );
    *slot.borrow_mut() = Some(derived.clone());

    scheduler::run_until_idle();
    assert_eq!(derived.state(), State::Pending, "Plain then cannot name the error");
}

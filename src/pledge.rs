//! Defines the `Pledge` state machine, its `Resolver` capabilities and reaction chaining.
//!
//! A `Pledge` starts out pending and settles exactly once, either fulfilled with a value
//! or rejected with a reason. Continuations registered with [`Pledge::then`] and friends
//! are queued on the pledge and dispatched in registration order by a task on the
//! current thread's [`scheduler`](crate::scheduler), never inline with the call that
//! settled the pledge or registered the continuation.
//!
//! Resolving is thenable-aware: resolving a pledge with another pledge or with a
//! foreign [`Thenable`] makes it adopt that value's eventual outcome.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use crate::{
    IntoResolution, Resolution, SettleError, Thenable,
    reaction::{React, Reaction},
    scheduler,
};

/// The lifecycle state of a [`Pledge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// Not settled yet.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

struct Inner<T, E> {
    outcome: Option<Result<T, E>>,
    reactions: VecDeque<Box<dyn React<T, E>>>,
    wakers: Vec<Waker>,
}

/// A deferred value that is eventually fulfilled with a `T` or rejected with an `E`.
///
/// `Pledge` is a cheap handle; clones refer to the same underlying state. It is not
/// `Send`: a pledge lives on the thread that created it and is dispatched by that
/// thread's scheduler.
///
/// # Example
/// ```
/// use pledge::{Pledge, scheduler};
/// use std::{cell::RefCell, rc::Rc};
///
/// let seen = Rc::new(RefCell::new(None));
/// let seen_cl = Rc::clone(&seen);
///
/// Pledge::<i32, String>::resolved(1)
///     .map(|x| x + 1)
///     .map(move |y| *seen_cl.borrow_mut() = Some(y));
///
/// // Nothing runs until the scheduler drains.
/// assert_eq!(*seen.borrow(), None);
/// scheduler::run_until_idle();
/// assert_eq!(*seen.borrow(), Some(2));
/// ```
pub struct Pledge<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

impl<T, E> Clone for Pledge<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// The settle and fail capabilities bound to one [`Pledge`].
///
/// Resolvers are handed to setup routines by [`Pledge::new`] and to foreign thenables
/// during adoption. Calls on a pledge that is no longer pending do nothing.
///
/// A resolver given to a [`Thenable`] is guarded: the first call among it and all its
/// clones wins, and later calls are ignored even while the pledge is still pending.
pub struct Resolver<T, E> {
    pledge: Pledge<T, E>,
    guard: Option<Rc<Cell<bool>>>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            pledge: self.pledge.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Resolves the pledge, adopting the outcome of pledges and thenables.
    ///
    /// Returns [`SettleError::SelfResolution`] when resolving the pledge with itself;
    /// the pledge stays pending in that case. A guarded resolver is not spent by the
    /// failed call, so the same resolver can still settle the pledge afterwards.
    pub fn resolve(&self, resolution: impl Into<Resolution<T, E>>) -> Result<(), SettleError> {
        if !self.claim() {
            return Ok(());
        }
        let resolved = self.pledge.resolve_with(resolution.into());
        if resolved.is_err() {
            self.release();
        }
        resolved
    }

    /// Fulfills the pledge with a plain value.
    pub fn fulfill(&self, value: T) {
        if self.claim() {
            self.pledge.settle(Ok(value));
        }
    }

    /// Rejects the pledge with a reason.
    pub fn reject(&self, reason: E) {
        if self.claim() {
            self.pledge.settle(Err(reason));
        }
    }

    // Unguarded resolvers always pass.
    fn claim(&self) -> bool {
        match &self.guard {
            Some(called) => !called.replace(true),
            None => true,
        }
    }

    fn release(&self) {
        if let Some(called) = &self.guard {
            called.set(false);
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("pledge", &self.pledge)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

impl<T, E> Pledge<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Creates a pledge and synchronously runs `setup` with its [`Resolver`].
    ///
    /// The resolver may be used right away or stored for later. If `setup` returns
    /// `Err`, the pledge is rejected with that reason unless it already settled.
    ///
    /// # Example
    /// ```
    /// use pledge::{Pledge, State};
    ///
    /// let pledge = Pledge::<i32, &str>::new(|resolver| {
    ///     resolver.fulfill(1);
    ///     resolver.fulfill(2);
    ///     Err("too late")
    /// });
    /// assert_eq!(pledge.state(), State::Fulfilled);
    /// assert_eq!(pledge.peek(), Some(Ok(1)));
    /// ```
    pub fn new<S>(setup: S) -> Self
    where
        S: FnOnce(Resolver<T, E>) -> Result<(), E>,
    {
        let (pledge, resolver) = Self::deferred();
        if let Err(reason) = setup(resolver) {
            pledge.settle(Err(reason));
        }
        pledge
    }

    /// Creates a pending pledge together with its resolver, without a setup routine.
    #[must_use]
    pub fn deferred() -> (Self, Resolver<T, E>) {
        let pledge = Pledge {
            inner: Rc::new(RefCell::new(Inner {
                outcome: None,
                reactions: VecDeque::new(),
                wakers: Vec::new(),
            })),
        };
        let resolver = Resolver {
            pledge: pledge.clone(),
            guard: None,
        };
        (pledge, resolver)
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> State {
        match &self.inner.borrow().outcome {
            None => State::Pending,
            Some(Ok(_)) => State::Fulfilled,
            Some(Err(_)) => State::Rejected,
        }
    }

    /// Returns `true` while the pledge has not settled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.borrow().outcome.is_none()
    }

    /// Returns a copy of the outcome, or `None` while pending.
    #[must_use]
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.inner.borrow().outcome.clone()
    }

    /// Returns `true` if both handles refer to the same pledge.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers both continuations and returns the pledge they settle.
    ///
    /// Exactly one of the callbacks runs, with the outcome, in a later scheduler turn.
    /// Its return value resolves the returned pledge (see [`IntoResolution`]); an
    /// `Err` rejects it. A callback that returns the returned pledge itself leaves it
    /// pending; see [`Pledge::then_checked`].
    pub fn then<U, F, R, G, S>(&self, on_fulfilled: F, on_rejected: G) -> Pledge<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        R: IntoResolution<U, E>,
        G: FnOnce(E) -> S + 'static,
        S: IntoResolution<U, E>,
    {
        let (derived, resolver) = Pledge::deferred();
        self.register(Reaction::new(
            Box::new(move |value| on_fulfilled(value).into_resolution()),
            Some(Box::new(move |reason| on_rejected(reason).into_resolution())),
            resolver,
        ));
        derived
    }

    /// Registers a fulfillment continuation; a rejection passes through unchanged.
    pub fn and_then<U, F, R>(&self, on_fulfilled: F) -> Pledge<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        R: IntoResolution<U, E>,
    {
        let (derived, resolver) = Pledge::deferred();
        self.register(Reaction::new(
            Box::new(move |value| on_fulfilled(value).into_resolution()),
            None,
            resolver,
        ));
        derived
    }

    /// Transforms the fulfillment value; a rejection passes through unchanged.
    pub fn map<U, F>(&self, f: F) -> Pledge<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.and_then(move |value| Ok::<U, E>(f(value)))
    }

    /// Registers a rejection continuation; a fulfillment passes through unchanged.
    pub fn catch<G, S>(&self, on_rejected: G) -> Pledge<T, E>
    where
        G: FnOnce(E) -> S + 'static,
        S: IntoResolution<T, E>,
    {
        let (derived, resolver) = Pledge::deferred();
        self.register(Reaction::new(
            Box::new(|value| Ok(Resolution::Value(value))),
            Some(Box::new(move |reason| on_rejected(reason).into_resolution())),
            resolver,
        ));
        derived
    }

    fn register<U>(&self, reaction: Reaction<T, U, E>)
    where
        U: Clone + 'static,
    {
        let settled = {
            let mut inner = self.inner.borrow_mut();
            inner.reactions.push_back(Box::new(reaction));
            inner.outcome.is_some()
        };
        if settled {
            self.notify();
        }
    }

    // The resolution procedure: plain values fulfill, pledges and thenables are adopted.
    pub(crate) fn resolve_with(&self, resolution: Resolution<T, E>) -> Result<(), SettleError> {
        if !self.is_pending() {
            return Ok(());
        }
        match resolution {
            Resolution::Value(value) => self.settle(Ok(value)),
            Resolution::Pledge(other) => {
                if other.ptr_eq(self) {
                    return Err(SettleError::SelfResolution);
                }
                tracing::trace!("adopting pledge");
                other.register(Reaction::forward(self.guarded()));
            }
            Resolution::Thenable(thenable) => {
                if let Some(own) = thenable.as_pledge() {
                    return self.resolve_with(Resolution::Pledge(own.clone()));
                }
                tracing::trace!("adopting thenable");
                let resolver = self.guarded();
                if let Err(reason) = thenable.then(resolver.clone()) {
                    if resolver.claim() {
                        tracing::debug!("thenable failed before settling; rejecting");
                        self.settle(Err(reason));
                    }
                }
            }
        }
        Ok(())
    }

    fn guarded(&self) -> Resolver<T, E> {
        Resolver {
            pledge: self.clone(),
            guard: Some(Rc::new(Cell::new(false))),
        }
    }

    fn settle(&self, outcome: Result<T, E>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.outcome.is_some() {
                return;
            }
            tracing::trace!(fulfilled = outcome.is_ok(), "pledge settled");
            inner.outcome = Some(outcome);
        }
        self.notify();
    }

    // Enqueues a dispatch task. Redundant triggers are harmless, the task only
    // drains what is queued at the time it runs.
    fn notify(&self) {
        let pledge = self.clone();
        scheduler::enqueue(move || pledge.dispatch());
    }

    fn dispatch(&self) {
        let mut dispatched = 0usize;
        loop {
            // Never hold the borrow across a callback.
            let next = {
                let mut inner = self.inner.borrow_mut();
                let reaction = if inner.outcome.is_some() {
                    inner.reactions.pop_front()
                } else {
                    None
                };
                reaction.zip(inner.outcome.clone())
            };
            let Some((reaction, outcome)) = next else {
                break;
            };
            reaction.react(outcome);
            dispatched += 1;
        }
        let wakers = std::mem::take(&mut self.inner.borrow_mut().wakers);
        if dispatched > 0 || !wakers.is_empty() {
            tracing::trace!(dispatched, woken = wakers.len(), "pledge dispatched");
        }
        for waker in wakers {
            waker.wake();
        }
    }
}

impl<T, E> Pledge<T, E>
where
    T: Clone + 'static,
    E: Clone + From<SettleError> + 'static,
{
    /// Like [`Pledge::then`], but rejects the returned pledge if a callback returns that
    /// same pledge.
    ///
    /// Plain `then` cannot turn a [`SettleError`] into an `E`, so it leaves such a
    /// pledge pending forever.
    pub fn then_checked<U, F, R, G, S>(&self, on_fulfilled: F, on_rejected: G) -> Pledge<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> R + 'static,
        R: IntoResolution<U, E>,
        G: FnOnce(E) -> S + 'static,
        S: IntoResolution<U, E>,
    {
        let (derived, resolver) = Pledge::deferred();
        self.register(
            Reaction::new(
                Box::new(move |value| on_fulfilled(value).into_resolution()),
                Some(Box::new(move |reason| on_rejected(reason).into_resolution())),
                resolver,
            )
            .reject_self_resolution(<E as From<SettleError>>::from),
        );
        derived
    }
}

impl<T, E> Thenable<T, E> for Pledge<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn then(&self, resolver: Resolver<T, E>) -> Result<(), E> {
        self.register(Reaction::forward(resolver));
        Ok(())
    }

    fn as_pledge(&self) -> Option<&Pledge<T, E>> {
        Some(self)
    }
}

/// Awaiting a pledge yields its outcome.
///
/// A pending pledge wakes its awaiting task from its dispatch task, so the scheduler
/// must be driven by a backend that runs on the same executor, e.g.
/// [`Spawner`](crate::scheduler::Spawner).
impl<T, E> Future for Pledge<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.inner.borrow_mut();
        if let Some(outcome) = &inner.outcome {
            return Poll::Ready(outcome.clone());
        }
        if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T, E> fmt::Debug for Pledge<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let state = match &inner.outcome {
            None => State::Pending,
            Some(Ok(_)) => State::Fulfilled,
            Some(Err(_)) => State::Rejected,
        };
        f.debug_struct("Pledge")
            .field("state", &state)
            .field("reactions", &inner.reactions.len())
            .finish()
    }
}

//! Bridges Rust futures into pledges.
//!
//! A [`Completion`] drives a future that yields `Result<T, E>` and settles a pledge with
//! its output. The completion itself must be polled by some executor, usually by
//! spawning it next to the code that consumes the pledge.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use pin_project_lite::pin_project;

use crate::{Pledge, Resolver};

pin_project! {
    /// A future that settles a pledge with the output of its inner future.
    ///
    /// `Ok` fulfills the pledge and `Err` rejects it. Dropping a completion before it
    /// finishes leaves the pledge pending.
    #[must_use = "futures do nothing unless polled or .awaited"]
    pub struct Completion<F, T, E> {
        #[pin]
        future: F,
        resolver: Option<Resolver<T, E>>,
    }
}

impl<F, T, E> Completion<F, T, E>
where
    F: Future<Output = Result<T, E>>,
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Creates a completion for `future` and returns the pledge it will settle.
    ///
    /// A more convenient way to construct this is via the
    /// [`into_pledge()`](PledgeExt::into_pledge) operator.
    pub fn new(future: F) -> (Pledge<T, E>, Self) {
        let (pledge, resolver) = Pledge::deferred();
        let completion = Completion {
            future,
            resolver: Some(resolver),
        };
        (pledge, completion)
    }
}

impl<F, T, E> Future for Completion<F, T, E>
where
    F: Future<Output = Result<T, E>>,
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let outcome = match this.future.poll(cx) {
            Poll::Ready(outcome) => outcome,
            Poll::Pending => return Poll::Pending,
        };
        if let Some(resolver) = this.resolver.take() {
            match outcome {
                Ok(value) => resolver.fulfill(value),
                Err(reason) => resolver.reject(reason),
            }
        }
        Poll::Ready(())
    }
}

/// Extend fallible futures with conversion into a pledge.
///
/// # Example
/// ```
/// use futures::executor::LocalPool;
/// use pledge::{PledgeExt, scheduler::{self, Spawner}};
///
/// let mut pool = LocalPool::new();
/// scheduler::set_backend(Spawner::new(pool.spawner()));
///
/// let (pledge, completion) = async { Ok::<_, String>(21) }.into_pledge();
/// let doubled = pledge.map(|x| x * 2);
/// pool.run_until(completion);
/// assert_eq!(pool.run_until(doubled), Ok(42));
/// ```
pub trait PledgeExt<T, E>: Future<Output = Result<T, E>> {
    fn into_pledge(self) -> (Pledge<T, E>, Completion<Self, T, E>)
    where
        Self: Sized,
        T: Clone + 'static,
        E: Clone + 'static,
    {
        Completion::new(self)
    }
}

impl<F, T, E> PledgeExt<T, E> for F where F: Future<Output = Result<T, E>> {}

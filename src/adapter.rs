//! The minimal surface a conformance harness drives.
//!
//! A harness only needs three entry points: a pledge fulfilled with a value, a pledge
//! rejected with a reason, and a pending pledge whose capabilities are handed out
//! separately.

use crate::{Pledge, Resolver};

/// A pending pledge together with the capabilities that settle it.
#[derive(Debug)]
pub struct Deferred<T, E> {
    pub pledge: Pledge<T, E>,
    pub resolver: Resolver<T, E>,
}

/// Returns a pledge fulfilled with `value`.
pub fn resolved<T, E>(value: T) -> Pledge<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Pledge::resolved(value)
}

/// Returns a pledge rejected with `reason`.
pub fn rejected<T, E>(reason: E) -> Pledge<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    Pledge::rejected(reason)
}

/// Returns a pending pledge and its resolver.
#[must_use]
pub fn deferred<T, E>() -> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    let (pledge, resolver) = Pledge::deferred();
    Deferred { pledge, resolver }
}

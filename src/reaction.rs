use crate::{Resolution, Resolver, SettleError};

pub(crate) type Callback<A, U, E> = Box<dyn FnOnce(A) -> Result<Resolution<U, E>, E>>;

/// A continuation registered on a pledge, type-erased over the derived value type.
pub(crate) trait React<T, E> {
    fn react(self: Box<Self>, outcome: Result<T, E>);
}

// One registered continuation and the capabilities of the pledge it settles.
// A missing rejection handler forwards the reason unchanged.
pub(crate) struct Reaction<T, U, E> {
    on_fulfilled: Callback<T, U, E>,
    on_rejected: Option<Callback<E, U, E>>,
    downstream: Resolver<U, E>,
    self_resolution: Option<fn(SettleError) -> E>,
}

impl<T, U, E> Reaction<T, U, E> {
    pub(crate) fn new(
        on_fulfilled: Callback<T, U, E>,
        on_rejected: Option<Callback<E, U, E>>,
        downstream: Resolver<U, E>,
    ) -> Self {
        Self {
            on_fulfilled,
            on_rejected,
            downstream,
            self_resolution: None,
        }
    }

    // Rejects the downstream pledge instead of leaving it pending when a callback
    // hands that pledge back.
    pub(crate) fn reject_self_resolution(mut self, convert: fn(SettleError) -> E) -> Self {
        self.self_resolution = Some(convert);
        self
    }
}

impl<T, E> Reaction<T, T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Forwards the outcome unchanged, in the same disposition.
    pub(crate) fn forward(downstream: Resolver<T, E>) -> Self {
        Self::new(Box::new(|value| Ok(Resolution::Value(value))), None, downstream)
    }
}

impl<T, U, E> React<T, E> for Reaction<T, U, E>
where
    U: Clone + 'static,
    E: Clone + 'static,
{
    fn react(self: Box<Self>, outcome: Result<T, E>) {
        let Reaction {
            on_fulfilled,
            on_rejected,
            downstream,
            self_resolution,
        } = *self;
        let handled = match outcome {
            Ok(value) => on_fulfilled(value),
            Err(reason) => match on_rejected {
                Some(on_rejected) => on_rejected(reason),
                None => {
                    downstream.reject(reason);
                    return;
                }
            },
        };
        match handled {
            Ok(resolution) => {
                // The callback returned the pledge it was supposed to settle.
                if let Err(err) = downstream.resolve(resolution) {
                    match self_resolution {
                        Some(convert) => {
                            tracing::debug!(error = %err, "rejecting self-resolved derived pledge");
                            downstream.reject(convert(err));
                        }
                        None => {
                            tracing::error!(error = %err, "reaction left its derived pledge pending");
                        }
                    }
                }
            }
            Err(reason) => {
                tracing::trace!("reaction callback failed; rejecting derived pledge");
                downstream.reject(reason);
            }
        }
    }
}

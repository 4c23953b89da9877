//! Static constructors and the `all` / `race` combinators.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{Pledge, Resolution};

impl<T, E> Pledge<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Creates a pledge fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        Self::adopt(Resolution::Value(value))
    }

    /// Creates a pledge rejected with `reason`.
    pub fn rejected(reason: E) -> Self {
        Self::new(|resolver| {
            resolver.reject(reason);
            Ok(())
        })
    }

    /// Creates a pledge resolved with `resolution`, adopting pledges and thenables.
    ///
    /// Adopting a pledge yields a new pledge that follows it, never the same handle.
    pub fn adopt(resolution: impl Into<Resolution<T, E>>) -> Self {
        let (pledge, resolver) = Self::deferred();
        // A pledge that does not exist yet cannot be resolved with itself.
        let _ = resolver.resolve(resolution);
        pledge
    }

    /// Waits for every input to fulfill.
    ///
    /// Fulfills with the values in input order, whatever order the inputs settle in, or
    /// rejects with the reason of the first input to reject. Inputs are normalized with
    /// [`Pledge::adopt`]. No inputs fulfills right away with an empty `Vec`.
    ///
    /// # Example
    /// ```
    /// use pledge::{Pledge, Resolution, scheduler};
    ///
    /// let inputs: Vec<Resolution<&str, &str>> = vec![
    ///     Pledge::resolved("a").into(),
    ///     Resolution::value("b"),
    /// ];
    /// let all = Pledge::all(inputs);
    /// scheduler::run_until_idle();
    /// assert_eq!(all.peek(), Some(Ok(vec!["a", "b"])));
    /// ```
    pub fn all<I>(inputs: I) -> Pledge<Vec<T>, E>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs: Vec<Pledge<T, E>> = inputs.into_iter().map(Self::adopt).collect();
        Pledge::new(move |resolver| {
            if inputs.is_empty() {
                resolver.fulfill(Vec::new());
                return Ok(());
            }
            let total = inputs.len();
            let results = Rc::new(RefCell::new(vec![None; total]));
            let fulfilled = Rc::new(Cell::new(0usize));
            for (index, input) in inputs.into_iter().enumerate() {
                let results = Rc::clone(&results);
                let fulfilled = Rc::clone(&fulfilled);
                let on_value = resolver.clone();
                let on_reason = resolver.clone();
                input.then(
                    move |value| {
                        results.borrow_mut()[index] = Some(value);
                        fulfilled.set(fulfilled.get() + 1);
                        if fulfilled.get() == total {
                            let values = std::mem::take(&mut *results.borrow_mut());
                            on_value.fulfill(values.into_iter().flatten().collect());
                        }
                        Ok::<(), E>(())
                    },
                    move |reason| {
                        on_reason.reject(reason);
                        Ok::<(), E>(())
                    },
                );
            }
            Ok(())
        })
    }

    /// Settles like whichever input settles first; later settlements are ignored.
    ///
    /// Inputs are normalized with [`Pledge::adopt`]. No inputs leaves the pledge
    /// pending forever.
    pub fn race<I>(inputs: I) -> Pledge<T, E>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs: Vec<Pledge<T, E>> = inputs.into_iter().map(Self::adopt).collect();
        Pledge::new(move |resolver| {
            for input in inputs {
                let on_value = resolver.clone();
                let on_reason = resolver.clone();
                input.then(
                    move |value| {
                        on_value.fulfill(value);
                        Ok::<(), E>(())
                    },
                    move |reason| {
                        on_reason.reject(reason);
                        Ok::<(), E>(())
                    },
                );
            }
            Ok(())
        })
    }
}

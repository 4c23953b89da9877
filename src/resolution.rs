//! Values a pledge can be resolved with, and the structural thenable protocol.
//!
//! Resolving a pledge is not the same as fulfilling it. A [`Resolution`] is either a
//! plain value, which fulfills the pledge, or something that will settle later, which
//! the pledge adopts: another [`Pledge`] or any foreign [`Thenable`].

use std::{fmt, rc::Rc};

use crate::{Pledge, Resolver};

/// Anything exposing a callback-registration method a pledge can adopt.
///
/// A thenable receives a guarded [`Resolver`] bound to the adopting pledge. Only the
/// first `resolve`, `fulfill` or `reject` across all clones of that resolver has an
/// effect; duplicate or conflicting calls are ignored, whether they happen
/// synchronously inside `then` or later. Returning `Err` before any call rejects the
/// adopting pledge with that reason; returning `Err` afterwards is ignored.
///
/// Closures with the right shape are thenables:
///
/// ```
/// use pledge::{Pledge, Resolution, Resolver, State, scheduler};
///
/// let pledge = Pledge::<i32, String>::adopt(Resolution::thenable(|r: Resolver<i32, String>| {
///     r.fulfill(5);
///     Ok(())
/// }));
/// scheduler::run_until_idle();
/// assert_eq!(pledge.state(), State::Fulfilled);
/// assert_eq!(pledge.peek(), Some(Ok(5)));
/// ```
pub trait Thenable<T, E> {
    /// Registers the adopting pledge's capabilities with this thenable.
    fn then(&self, resolver: Resolver<T, E>) -> Result<(), E>;

    /// Returns the pledge behind this thenable, if it is one.
    ///
    /// Adoption uses it to catch a pledge that is handed back to itself as a thenable.
    fn as_pledge(&self) -> Option<&Pledge<T, E>> {
        None
    }
}

impl<T, E, F> Thenable<T, E> for F
where
    F: Fn(Resolver<T, E>) -> Result<(), E>,
{
    fn then(&self, resolver: Resolver<T, E>) -> Result<(), E> {
        self(resolver)
    }
}

/// The value a pledge is resolved with.
pub enum Resolution<T, E> {
    /// A plain value; fulfills the pledge.
    Value(T),
    /// A pledge from this crate; its eventual outcome is adopted.
    Pledge(Pledge<T, E>),
    /// A foreign thenable; its eventual outcome is adopted.
    Thenable(Rc<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    /// Wraps a plain value.
    pub fn value(value: T) -> Self {
        Resolution::Value(value)
    }

    /// Wraps a foreign thenable.
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Resolution::Thenable(Rc::new(thenable))
    }
}

impl<T, E> From<Pledge<T, E>> for Resolution<T, E> {
    fn from(pledge: Pledge<T, E>) -> Self {
        Resolution::Pledge(pledge)
    }
}

impl<T, E> From<Rc<dyn Thenable<T, E>>> for Resolution<T, E> {
    fn from(thenable: Rc<dyn Thenable<T, E>>) -> Self {
        Resolution::Thenable(thenable)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Pledge(_) => f.write_str("Pledge(..)"),
            Resolution::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// Return types accepted from reaction callbacks.
///
/// `Ok` values fulfill the derived pledge and `Err` reasons reject it. Returning a
/// [`Pledge`] or a [`Resolution`] makes the derived pledge adopt it.
pub trait IntoResolution<T, E> {
    /// Converts the callback's return value; `Err` becomes the rejection reason.
    fn into_resolution(self) -> Result<Resolution<T, E>, E>;
}

impl<T, E> IntoResolution<T, E> for Result<T, E> {
    fn into_resolution(self) -> Result<Resolution<T, E>, E> {
        self.map(Resolution::Value)
    }
}

impl<T, E> IntoResolution<T, E> for Resolution<T, E> {
    fn into_resolution(self) -> Result<Resolution<T, E>, E> {
        Ok(self)
    }
}

impl<T, E> IntoResolution<T, E> for Pledge<T, E> {
    fn into_resolution(self) -> Result<Resolution<T, E>, E> {
        Ok(Resolution::Pledge(self))
    }
}

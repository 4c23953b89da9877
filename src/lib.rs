//! Single-threaded deferred values with structural thenable interoperability.
//!
//! `pledge` provides a [`Pledge`], a value container that is eventually fulfilled with
//! a value or rejected with a reason, and the machinery around it:
//! - A per-thread task [`Scheduler`](scheduler::Scheduler) that runs every dispatch in
//!   a later turn, in FIFO order, on a pluggable [`Backend`](scheduler::Backend)
//! - A resolution procedure that adopts other pledges and any foreign [`Thenable`],
//!   tolerating thenables that fail, call back twice, or call back synchronously
//! - Reaction chaining with [`Pledge::then`], [`Pledge::and_then`], [`Pledge::map`]
//!   and [`Pledge::catch`]
//! - The [`Pledge::all`] and [`Pledge::race`] combinators
//! - A bridge from Rust futures ([`PledgeExt`]) and back (`Pledge` is awaitable)
//!
//! Every pledge settles at most once, its continuations run in registration order,
//! and no continuation ever runs inside the call that registered it. There is no
//! cancellation: a pledge that never settles keeps its continuations alive.

pub mod adapter;
mod combinators;
pub mod completion;
pub mod error;
pub mod pledge;
mod reaction;
pub mod resolution;
pub mod scheduler;

pub use completion::{Completion, PledgeExt};
pub use error::SettleError;
pub use pledge::{Pledge, Resolver, State};
pub use resolution::{IntoResolution, Resolution, Thenable};

use thiserror::Error;

/// Errors returned synchronously by a [`Resolver`](crate::Resolver).
///
/// Everything else that can go wrong while settling a pledge (a failing setup routine,
/// a failing thenable, a failing callback) is recovered locally and becomes a
/// rejection reason instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SettleError {
    /// The pledge was resolved with itself.
    #[error("pledge settled with itself")]
    SelfResolution,
}

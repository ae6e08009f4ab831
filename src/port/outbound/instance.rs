//! Single-instance registration port.

/// A system-wide exclusivity token scoped to one installation identity.
pub trait InstanceLock: Send + Sync {
    /// Try to become the sole holder.
    ///
    /// Returns `true` only if this call acquired the token. Failure to acquire
    /// is reported through the return value, never by panicking.
    fn register(&self) -> bool;

    /// Release the token.
    ///
    /// A no-op when registration failed or was never attempted.
    fn unregister(&self);
}

//! Shutdown state machine.
//!
//! `NotStarted -> InProgress -> Completed`, never backwards. Every transition
//! is a compare-and-swap so concurrent triggers cannot both claim the
//! sequence.

use std::sync::atomic::{AtomicU8, Ordering};

/// Progress of the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    NotStarted,
    InProgress,
    Completed,
}

impl ShutdownState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::NotStarted,
            1 => Self::InProgress,
            _ => Self::Completed,
        }
    }

    /// Stable string identifier for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// Atomic holder for [`ShutdownState`].
#[derive(Debug)]
pub struct ShutdownStateCell {
    raw: AtomicU8,
}

impl ShutdownStateCell {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: AtomicU8::new(0),
        }
    }

    #[must_use]
    pub fn get(&self) -> ShutdownState {
        ShutdownState::from_u8(self.raw.load(Ordering::Acquire))
    }

    /// Claim the sequence. Only one caller ever gets `true`.
    ///
    /// On failure the observed state is returned so the loser can log it.
    pub fn try_begin(&self) -> Result<(), ShutdownState> {
        self.transition(ShutdownState::NotStarted, ShutdownState::InProgress)
    }

    /// Mark the claimed sequence as finished.
    pub fn complete(&self) -> Result<(), ShutdownState> {
        self.transition(ShutdownState::InProgress, ShutdownState::Completed)
    }

    fn transition(&self, from: ShutdownState, to: ShutdownState) -> Result<(), ShutdownState> {
        self.raw
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ShutdownState::from_u8)
    }
}

impl Default for ShutdownStateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_not_started() {
        let cell = ShutdownStateCell::new();
        assert_eq!(cell.get(), ShutdownState::NotStarted);
    }

    #[test]
    fn test_second_claim_observes_in_progress() {
        let cell = ShutdownStateCell::new();
        assert!(cell.try_begin().is_ok());
        assert_eq!(cell.try_begin(), Err(ShutdownState::InProgress));
    }

    #[test]
    fn test_claim_after_completion_observes_completed() {
        let cell = ShutdownStateCell::new();
        cell.try_begin().unwrap();
        cell.complete().unwrap();
        assert_eq!(cell.try_begin(), Err(ShutdownState::Completed));
        assert_eq!(cell.get(), ShutdownState::Completed);
    }

    #[test]
    fn test_complete_requires_claim() {
        let cell = ShutdownStateCell::new();
        assert_eq!(cell.complete(), Err(ShutdownState::NotStarted));
        assert_eq!(cell.get(), ShutdownState::NotStarted);
    }

    #[test]
    fn test_concurrent_claims_have_single_winner() {
        let cell = Arc::new(ShutdownStateCell::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || cell.try_begin().is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}

//! Request tokens for latest-wins ordering
//!
//! Every logical operation (reverse resolution, forward search) owns one
//! [`RequestSequence`]. A completion may only touch shared state when its
//! token is still the current one; arrival order is irrelevant.

use crate::error::{Error, Result};
use std::fmt;

/// Identifies one issued request within its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic token counter for one logical operation
#[derive(Debug, Default)]
pub struct RequestSequence {
    counter: u64,
    retired: bool,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next token; it becomes the only current one
    pub fn issue(&mut self) -> RequestToken {
        self.counter += 1;
        RequestToken(self.counter)
    }

    /// Advance without issuing, obsoleting whatever is in flight
    pub fn invalidate(&mut self) {
        self.counter += 1;
    }

    /// Whether a completion carrying `token` may be applied
    pub fn is_current(&self, token: RequestToken) -> bool {
        !self.retired && token.0 == self.counter
    }

    /// Like [`RequestSequence::is_current`], failing with [`Error::Stale`]
    pub fn ensure_current(&self, token: RequestToken) -> Result<()> {
        if self.is_current(token) {
            Ok(())
        } else {
            Err(Error::Stale)
        }
    }

    /// Drop the sequence for good; nothing is ever current again
    pub fn retire(&mut self) {
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

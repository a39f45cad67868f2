//! Failure classification.

/// Decides which completed checks are alertable.
///
/// Only an exact match on the configured status classifies; transport
/// failures (status 0) never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    status: u16,
}

impl FailurePolicy {
    pub fn new(status: u16) -> Self {
        Self { status }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_failure_class(&self, status: u16) -> bool {
        status != 0 && status == self.status
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::new(404)
    }
}

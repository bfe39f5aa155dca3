use crate::domain::{brew::BrewRequest, error::ExecutorError};

/// Immutable view of the controller returned by the `get` RPC.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub status: &'static str,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        StatusSnapshot { status: "ok" }
    }
}

/// RPC-facing surface of the brew executor. Handlers only enqueue or read
/// snapshots; the executor loop owns all mutable state.
pub trait BaristaDriverPort {
    /// Tries to enqueue a request. `Err(ExecutorError::Busy)` when one brew
    /// is already pending or executing; that is the sole backpressure
    /// mechanism.
    fn submit(&self, request: BrewRequest) -> Result<(), ExecutorError>;

    fn status(&self) -> StatusSnapshot;

    /// Raises the cooperative cancellation flag checked by long-running
    /// steps of the brew in flight.
    fn stop(&self);
}

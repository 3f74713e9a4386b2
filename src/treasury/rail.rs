//! Trait abstraction for moving funds out of a group.
//!
//! The engine never talks to a chain or a bank. It hands a batch of
//! [`Transfer`]s to a `PaymentRail` once a command has succeeded, and the
//! command only commits if the rail accepts the whole batch.

use super::Transfer;
use async_trait::async_trait;

/// Result type for rail operations.
pub type RailResult<T> = Result<T, RailError>;

/// Rail errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RailError {
    #[error("transfer rejected: {0}")]
    Rejected(String),

    #[error("rail unavailable: {0}")]
    Unavailable(String),
}

/// Settles outbound transfers.
///
/// `settle` must be all-or-nothing: on error, none of the batch may have
/// been paid.
#[async_trait]
pub trait PaymentRail: Send + Sync {
    async fn settle(&self, batch: &[Transfer]) -> RailResult<()>;
}

/// Rail that accepts every batch without moving anything.
///
/// Used when the ledger itself is the record of payment (operator CLI,
/// dry runs).
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerOnlyRail;

#[async_trait]
impl PaymentRail for LedgerOnlyRail {
    async fn settle(&self, batch: &[Transfer]) -> RailResult<()> {
        tracing::debug!(transfers = batch.len(), "ledger-only settlement");
        Ok(())
    }
}

//! Mock payment rail for testing.
//!
//! Records every settled batch and can be told to reject the next batch or
//! any batch paying a given recipient.

use super::rail::{PaymentRail, RailError, RailResult};
use super::Transfer;
use crate::identity::Address;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Mock payment rail.
#[derive(Clone, Default)]
pub struct MockPaymentRail {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    settled: Vec<Vec<Transfer>>,
    fail_next: bool,
    blocked: HashSet<Address>,
}

impl MockPaymentRail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next settlement attempt.
    pub fn fail_next_settlement(&self) {
        self.state.lock().unwrap().fail_next = true;
    }

    /// Reject every batch that pays `recipient`.
    pub fn block_recipient(&self, recipient: Address) {
        self.state.lock().unwrap().blocked.insert(recipient);
    }

    pub fn unblock_recipient(&self, recipient: &Address) {
        self.state.lock().unwrap().blocked.remove(recipient);
    }

    /// Batches settled so far.
    pub fn settled_batches(&self) -> Vec<Vec<Transfer>> {
        self.state.lock().unwrap().settled.clone()
    }

    /// All settled transfers, flattened.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.state
            .lock()
            .unwrap()
            .settled
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Total settled to `recipient`.
    pub fn paid_to(&self, recipient: &Address) -> u128 {
        self.transfers()
            .iter()
            .filter(|t| &t.recipient == recipient)
            .map(|t| t.amount)
            .sum()
    }
}

#[async_trait]
impl PaymentRail for MockPaymentRail {
    async fn settle(&self, batch: &[Transfer]) -> RailResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next {
            state.fail_next = false;
            return Err(RailError::Unavailable("injected failure".to_string()));
        }
        if let Some(t) = batch.iter().find(|t| state.blocked.contains(&t.recipient)) {
            return Err(RailError::Rejected(format!("recipient {} blocked", t.recipient)));
        }
        if !batch.is_empty() {
            state.settled.push(batch.to_vec());
        }
        Ok(())
    }
}

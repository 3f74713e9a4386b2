//! Treasury ledger.
//!
//! Tracks the funds a group holds and stages every outbound transfer.
//!
//! - Contributions are credited to the held balance
//! - Payouts, commission, platform fees and approved transfers are debited
//!   and staged as [`Transfer`]s
//! - Staged transfers are settled by a [`PaymentRail`] only after the
//!   command that produced them has fully succeeded
//! - Percentage math truncates; whatever is not paid out stays held

pub mod mock;
pub mod rail;

pub use mock::MockPaymentRail;
pub use rail::{LedgerOnlyRail, PaymentRail, RailError, RailResult};

use crate::error::{ArisanError, ArisanResult};
use crate::identity::{Address, Wei};
use serde::{Deserialize, Serialize};

/// Share of the coordinator commission withheld for the platform.
pub const PLATFORM_FEE_PERCENTAGE: u8 = 5;

/// Why funds left the treasury.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferReason {
    Prize { period: u64, round: u64 },
    Commission { period: u64, round: u64 },
    PlatformFee { period: u64, round: u64 },
    CapacityUpgrade,
    Proposal { index: u64 },
}

/// An outbound payment awaiting settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub recipient: Address,
    pub amount: Wei,
    pub reason: TransferReason,
}

/// How one round's pool is divided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSplit {
    pub pool: Wei,
    /// Full coordinator commission, platform cut included.
    pub commission: Wei,
    pub platform_cut: Wei,
    pub coordinator_share: Wei,
    pub prize: Wei,
    /// Left in the period balance.
    pub remainder: Wei,
}

/// `floor(amount * percentage / 100)` for `percentage <= 100`, without
/// overflowing on amounts near `Wei::MAX`.
pub fn percent_of(amount: Wei, percentage: u8) -> Wei {
    let percentage = Wei::from(percentage.min(100));
    amount / 100 * percentage + amount % 100 * percentage / 100
}

impl PayoutSplit {
    /// Split `pool` by the commission and prize percentages.
    ///
    /// Callers guarantee `commission_percentage + prize_percentage <= 100`.
    pub fn compute(pool: Wei, commission_percentage: u8, prize_percentage: u8) -> Self {
        let commission = percent_of(pool, commission_percentage);
        let platform_cut = percent_of(commission, PLATFORM_FEE_PERCENTAGE);
        let prize = percent_of(pool, prize_percentage);
        let remainder = pool.saturating_sub(commission).saturating_sub(prize);

        Self {
            pool,
            commission,
            platform_cut,
            coordinator_share: commission - platform_cut,
            prize,
            remainder,
        }
    }
}

/// Who gets paid when a round settles.
#[derive(Clone, Copy, Debug)]
pub struct RoundPayees {
    pub winner: Address,
    pub coordinator: Address,
    pub platform_wallet: Address,
}

/// Group treasury.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryLedger {
    balance: Wei,
    total_contributed: Wei,
    total_paid_out: Wei,
    platform_revenue: Wei,

    /// Transfers staged by the command in flight.
    #[serde(skip)]
    pending: Vec<Transfer>,
}

impl TreasuryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Funds currently held.
    pub fn balance(&self) -> Wei {
        self.balance
    }

    pub fn total_contributed(&self) -> Wei {
        self.total_contributed
    }

    pub fn total_paid_out(&self) -> Wei {
        self.total_paid_out
    }

    pub fn platform_revenue(&self) -> Wei {
        self.platform_revenue
    }

    /// Credit a contribution.
    pub fn credit(&mut self, amount: Wei) -> ArisanResult<()> {
        if amount == 0 {
            return Err(ArisanError::AmountIsZero);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(ArisanError::InsufficientBalance {
                available: self.balance,
                requested: amount,
            })?;
        self.total_contributed = self.total_contributed.saturating_add(amount);
        Ok(())
    }

    /// Debit held funds towards `recipient`.
    pub fn debit(&mut self, recipient: Address, amount: Wei, reason: TransferReason) -> ArisanResult<()> {
        self.debit_within(recipient, amount, reason, self.balance)
    }

    /// Debit, allowing at most `spendable` of the held balance to be used.
    pub fn debit_within(
        &mut self,
        recipient: Address,
        amount: Wei,
        reason: TransferReason,
        spendable: Wei,
    ) -> ArisanResult<()> {
        if recipient.is_zero() {
            return Err(ArisanError::InvalidRecipient);
        }
        if amount == 0 {
            return Err(ArisanError::AmountIsZero);
        }
        let available = spendable.min(self.balance);
        if amount > available {
            return Err(ArisanError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        self.balance -= amount;
        self.total_paid_out = self.total_paid_out.saturating_add(amount);
        self.pending.push(Transfer {
            recipient,
            amount,
            reason,
        });
        Ok(())
    }

    /// Route a payment that never enters the held balance (capacity upgrades)
    /// straight to the platform wallet.
    pub fn route_platform_revenue(
        &mut self,
        platform_wallet: Address,
        amount: Wei,
        reason: TransferReason,
    ) -> ArisanResult<()> {
        if platform_wallet.is_zero() {
            return Err(ArisanError::InvalidRecipient);
        }
        if amount == 0 {
            return Err(ArisanError::AmountIsZero);
        }
        self.platform_revenue = self.platform_revenue.saturating_add(amount);
        self.pending.push(Transfer {
            recipient: platform_wallet,
            amount,
            reason,
        });
        Ok(())
    }

    /// Pay out one drawn round. Zero-sized shares are skipped.
    pub fn settle_round(
        &mut self,
        split: &PayoutSplit,
        payees: RoundPayees,
        period: u64,
        round: u64,
    ) -> ArisanResult<()> {
        if split.prize > 0 {
            self.debit(payees.winner, split.prize, TransferReason::Prize { period, round })?;
        }
        if split.coordinator_share > 0 {
            self.debit(
                payees.coordinator,
                split.coordinator_share,
                TransferReason::Commission { period, round },
            )?;
        }
        if split.platform_cut > 0 {
            self.debit(
                payees.platform_wallet,
                split.platform_cut,
                TransferReason::PlatformFee { period, round },
            )?;
            self.platform_revenue = self.platform_revenue.saturating_add(split.platform_cut);
        }
        Ok(())
    }

    /// Transfers staged so far by the command in flight.
    pub fn pending(&self) -> &[Transfer] {
        &self.pending
    }

    /// Drain staged transfers for settlement.
    pub fn take_pending(&mut self) -> Vec<Transfer> {
        std::mem::take(&mut self.pending)
    }
}

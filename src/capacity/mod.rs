//! Capacity tier pricing.
//!
//! A group's member ceiling grows in fixed steps. Each step is bought with
//! one exact payment of the platform's upgrade cost, and only once the
//! current membership has actually reached the ceiling.

use crate::error::{ArisanError, ArisanResult};
use crate::identity::Wei;
use serde::{Deserialize, Serialize};

fn default_initial_capacity() -> u32 {
    10
}

fn default_tier_step() -> u32 {
    10
}

fn default_ceiling() -> u32 {
    100
}

/// Platform-wide capacity policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityPolicy {
    /// Ceiling of a freshly created group.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: u32,

    /// Members added by one upgrade.
    #[serde(default = "default_tier_step")]
    pub tier_step: u32,

    /// Hard ceiling no upgrade can exceed.
    #[serde(default = "default_ceiling")]
    pub ceiling: u32,

    /// Exact price of one upgrade.
    pub upgrade_cost: Wei,
}

impl CapacityPolicy {
    pub fn new(upgrade_cost: Wei) -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            tier_step: default_tier_step(),
            ceiling: default_ceiling(),
            upgrade_cost,
        }
    }
}

/// A successful upgrade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityUpgrade {
    pub previous_capacity: u32,
    pub new_capacity: u32,
    pub cost: Wei,
}

/// Computes eligibility and cost of capacity upgrades.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityTierPricing {
    policy: CapacityPolicy,
}

impl CapacityTierPricing {
    pub fn new(policy: CapacityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CapacityPolicy {
        &self.policy
    }

    pub fn upgrade_cost(&self) -> Wei {
        self.policy.upgrade_cost
    }

    pub fn available_capacity(&self, max_capacity: u32, member_count: u32) -> u32 {
        max_capacity.saturating_sub(member_count)
    }

    /// Ceiling after one more upgrade, if the platform ceiling allows one.
    pub fn next_capacity_tier(&self, max_capacity: u32) -> Option<u32> {
        let next = max_capacity.checked_add(self.policy.tier_step)?;
        (self.policy.tier_step > 0 && next <= self.policy.ceiling).then_some(next)
    }

    /// Smallest tier boundary strictly above the current membership.
    fn tier_for_members(&self, member_count: u32) -> u32 {
        let step = self.policy.tier_step.max(1);
        (member_count / step + 1).saturating_mul(step)
    }

    /// Validate an upgrade paid with `payment`.
    ///
    /// Payment is checked before eligibility. A zero payment counts as
    /// underfunded; any other amount besides the exact cost is incorrect.
    pub fn quote_upgrade(
        &self,
        max_capacity: u32,
        member_count: u32,
        payment: Wei,
    ) -> ArisanResult<CapacityUpgrade> {
        let cost = self.policy.upgrade_cost;
        if payment == 0 {
            return Err(ArisanError::InsufficientCapacityUpgradeFunds { expected: cost });
        }
        if payment != cost {
            return Err(ArisanError::IncorrectCapacityUpgradePayment {
                expected: cost,
                received: payment,
            });
        }

        let cannot_upgrade = ArisanError::CannotUpgradeAtCurrentMemberCount {
            members: member_count,
            max: max_capacity,
        };
        if self.tier_for_members(member_count) <= max_capacity {
            return Err(cannot_upgrade);
        }
        let new_capacity = self.next_capacity_tier(max_capacity).ok_or(cannot_upgrade)?;

        Ok(CapacityUpgrade {
            previous_capacity: max_capacity,
            new_capacity,
            cost,
        })
    }
}

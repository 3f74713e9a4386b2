//! Membership registry.
//!
//! Owns every Member record of a group. Periods, rounds and proposals only
//! hold addresses and resolve them here.
//!
//! - Join order is preserved (member-by-index queries)
//! - The coordinator is a member like any other, but cannot be removed
//! - Members still due to win in the ongoing period cannot be removed

use crate::error::{ArisanError, ArisanResult};
use crate::identity::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A group member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: Address,
    pub handle: String,
    /// Whether this member's vote counts towards proposal majorities.
    pub is_active_voter: bool,
    /// Index of the last period this member contributed in.
    pub latest_period_participation: Option<u64>,
    pub joined_at: u64,
}

/// How a member is leaving. Selects the error reported when the member is
/// still due to win.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// The member asked to leave.
    Leave,
    /// An approved KickMember proposal.
    Kick,
}

/// Set of members, in join order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRegistry {
    members: BTreeMap<Address, Member>,
    order: Vec<Address>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member.
    ///
    /// New members start as active voters with no participation history.
    pub fn add_member(
        &mut self,
        address: Address,
        handle: &str,
        max_capacity: u32,
        now: u64,
    ) -> ArisanResult<&Member> {
        if handle.trim().is_empty() {
            return Err(ArisanError::EmptyHandle);
        }
        if address.is_zero() {
            return Err(ArisanError::InvalidRecipient);
        }
        if self.members.contains_key(&address) {
            return Err(ArisanError::MemberAlreadyExists(address));
        }
        if self.member_count() >= max_capacity {
            return Err(ArisanError::GroupCapacityExceeded { max: max_capacity });
        }

        self.order.push(address);
        let member = self.members.entry(address).or_insert(Member {
            address,
            handle: handle.trim().to_string(),
            is_active_voter: true,
            latest_period_participation: None,
            joined_at: now,
        });
        Ok(member)
    }

    /// Remove a member.
    ///
    /// `due_winners` is the ongoing period's due-winner set, if a period is
    /// ongoing.
    pub fn remove_member(
        &mut self,
        address: &Address,
        coordinator: &Address,
        due_winners: Option<&BTreeSet<Address>>,
        removal: Removal,
    ) -> ArisanResult<Member> {
        if !self.members.contains_key(address) {
            return Err(ArisanError::MemberDoesNotExist(*address));
        }
        if address == coordinator {
            return Err(ArisanError::CoordinatorCannotLeave);
        }
        if due_winners.is_some_and(|due| due.contains(address)) {
            return Err(match removal {
                Removal::Leave => ArisanError::CannotLeaveWhileParticipating,
                Removal::Kick => ArisanError::StillParticipatingInPeriod,
            });
        }

        self.order.retain(|a| a != address);
        self.members
            .remove(address)
            .ok_or(ArisanError::MemberDoesNotExist(*address))
    }

    pub fn set_active_voter(&mut self, address: &Address, active: bool) -> ArisanResult<()> {
        let member = self
            .members
            .get_mut(address)
            .ok_or(ArisanError::MemberDoesNotExist(*address))?;
        member.is_active_voter = active;
        Ok(())
    }

    /// Record a contribution in `period`. Contributing re-activates voting.
    pub fn record_participation(&mut self, address: &Address, period: u64) -> ArisanResult<()> {
        let member = self
            .members
            .get_mut(address)
            .ok_or(ArisanError::MemberDoesNotExist(*address))?;
        member.latest_period_participation = Some(period);
        member.is_active_voter = true;
        Ok(())
    }

    pub fn is_member(&self, address: &Address) -> bool {
        self.members.contains_key(address)
    }

    pub fn member_count(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn active_voters_count(&self) -> u32 {
        self.members.values().filter(|m| m.is_active_voter).count() as u32
    }

    /// Addresses currently allowed to vote.
    pub fn active_voters(&self) -> BTreeSet<Address> {
        self.members
            .values()
            .filter(|m| m.is_active_voter)
            .map(|m| m.address)
            .collect()
    }

    pub fn is_active_voter(&self, address: &Address) -> bool {
        self.members
            .get(address)
            .map(|m| m.is_active_voter)
            .unwrap_or(false)
    }

    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.members.get(address)
    }

    /// Member at `index` in join order.
    pub fn member_by_index(&self, index: usize) -> Option<&Member> {
        self.order.get(index).and_then(|a| self.members.get(a))
    }

    /// Addresses in join order.
    pub fn addresses(&self) -> &[Address] {
        &self.order
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.order.iter().filter_map(|a| self.members.get(a))
    }
}

//! Proposal types.

use crate::identity::{Address, Wei};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// What a proposal changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProposalCategory {
    NewTitle,
    NewTelegramUrl,
    NewCoordinator,
    NewCommission,
    NewContribution,
    NewPrize,
    NewMember,
    KickMember,
    Transfer,
}

impl ProposalCategory {
    pub const ALL: [ProposalCategory; 9] = [
        ProposalCategory::NewTitle,
        ProposalCategory::NewTelegramUrl,
        ProposalCategory::NewCoordinator,
        ProposalCategory::NewCommission,
        ProposalCategory::NewContribution,
        ProposalCategory::NewPrize,
        ProposalCategory::NewMember,
        ProposalCategory::KickMember,
        ProposalCategory::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalCategory::NewTitle => "new-title",
            ProposalCategory::NewTelegramUrl => "new-telegram-url",
            ProposalCategory::NewCoordinator => "new-coordinator",
            ProposalCategory::NewCommission => "new-commission",
            ProposalCategory::NewContribution => "new-contribution",
            ProposalCategory::NewPrize => "new-prize",
            ProposalCategory::NewMember => "new-member",
            ProposalCategory::KickMember => "kick-member",
            ProposalCategory::Transfer => "transfer",
        }
    }
}

impl fmt::Display for ProposalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown proposal category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ProposalCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProposalCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Proposal body. Exactly one shape per category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalPayload {
    NewTitle { title: String },
    NewTelegramUrl { url: String },
    NewCoordinator { coordinator: Address },
    NewCommission { percentage: u8 },
    NewContribution { amount: Wei },
    NewPrize { percentage: u8 },
    NewMember { address: Address, handle: String },
    KickMember { member: Address },
    Transfer { recipient: Address, amount: Wei },
}

impl ProposalPayload {
    pub fn category(&self) -> ProposalCategory {
        match self {
            ProposalPayload::NewTitle { .. } => ProposalCategory::NewTitle,
            ProposalPayload::NewTelegramUrl { .. } => ProposalCategory::NewTelegramUrl,
            ProposalPayload::NewCoordinator { .. } => ProposalCategory::NewCoordinator,
            ProposalPayload::NewCommission { .. } => ProposalCategory::NewCommission,
            ProposalPayload::NewContribution { .. } => ProposalCategory::NewContribution,
            ProposalPayload::NewPrize { .. } => ProposalCategory::NewPrize,
            ProposalPayload::NewMember { .. } => ProposalCategory::NewMember,
            ProposalPayload::KickMember { .. } => ProposalCategory::KickMember,
            ProposalPayload::Transfer { .. } => ProposalCategory::Transfer,
        }
    }

    /// Member address the proposal is about, for membership categories.
    pub fn target(&self) -> Option<Address> {
        match self {
            ProposalPayload::NewCoordinator { coordinator } => Some(*coordinator),
            ProposalPayload::NewMember { address, .. } => Some(*address),
            ProposalPayload::KickMember { member } => Some(*member),
            _ => None,
        }
    }
}

/// A ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Approve,
    Reject,
}

impl Vote {
    pub fn from_approve(approve: bool) -> Self {
        if approve {
            Vote::Approve
        } else {
            Vote::Reject
        }
    }
}

/// Lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Open,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn is_completed(&self) -> bool {
        !matches!(self, ProposalStatus::Open)
    }
}

/// A governance proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub index: u64,
    pub payload: ProposalPayload,
    pub proposer: Address,
    pub proposed_at: u64,
    pub completed_at: Option<u64>,
    pub is_approved: bool,
    /// Approvers in vote order.
    pub approvers: Vec<Address>,
    pub rejecters: Vec<Address>,
    /// Period that was ongoing when the proposal was created.
    pub period_scope: Option<u64>,
}

impl Proposal {
    pub fn category(&self) -> ProposalCategory {
        self.payload.category()
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn status(&self) -> ProposalStatus {
        match (self.completed_at, self.is_approved) {
            (None, _) => ProposalStatus::Open,
            (Some(_), true) => ProposalStatus::Approved,
            (Some(_), false) => ProposalStatus::Rejected,
        }
    }

    pub fn approvers_count(&self) -> u32 {
        self.approvers.len() as u32
    }

    pub fn rejecters_count(&self) -> u32 {
        self.rejecters.len() as u32
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.approvers.contains(voter) || self.rejecters.contains(voter)
    }

    /// Approvals cast by members of `voters`. Ballots of members who have
    /// since left or lost their vote do not count.
    pub fn approvals_among(&self, voters: &BTreeSet<Address>) -> u32 {
        self.approvers.iter().filter(|a| voters.contains(a)).count() as u32
    }

    /// Members of `voters` who have not voted yet.
    pub fn undecided_among(&self, voters: &BTreeSet<Address>) -> u32 {
        voters.iter().filter(|v| !self.has_voted(v)).count() as u32
    }
}

//! Proposal governance.
//!
//! Every change to group parameters, membership or funds is a proposal:
//! - Indices are monotonic and never reused
//! - Only active voters vote; each member votes once per proposal
//! - Approval needs `floor(active_voters / 2) + 1` approvals from current
//!   active voters, evaluated at vote time
//! - A rejection that leaves the threshold unreachable completes the
//!   proposal as rejected
//! - Completed proposals reject further votes
//!
//! This module does the bookkeeping only. Applying an approved proposal's
//! effect belongs to the group aggregate, which discards the whole vote if
//! the effect fails.

pub mod proposal;

#[cfg(test)]
mod proptests;

pub use proposal::{
    Proposal, ProposalCategory, ProposalPayload, ProposalStatus, UnknownCategory, Vote,
};

use crate::error::{ArisanError, ArisanResult};
use crate::identity::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Approvals needed with `active_voters` active voters.
pub fn majority_threshold(active_voters: u32) -> u32 {
    active_voters / 2 + 1
}

/// Result of recording one vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Still open.
    Pending,
    /// Threshold reached; the effect must be applied.
    Approved,
    /// Threshold can no longer be reached.
    Rejected,
}

/// All proposals of a group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalGovernance {
    proposals: Vec<Proposal>,
}

impl ProposalGovernance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a proposal. Validation happens in the caller.
    pub fn create(
        &mut self,
        payload: ProposalPayload,
        proposer: Address,
        now: u64,
        period_scope: Option<u64>,
    ) -> &Proposal {
        let index = self.proposals.len() as u64;
        self.proposals.push(Proposal {
            index,
            payload,
            proposer,
            proposed_at: now,
            completed_at: None,
            is_approved: false,
            approvers: Vec::new(),
            rejecters: Vec::new(),
            period_scope,
        });
        &self.proposals[index as usize]
    }

    pub fn proposal(&self, index: u64) -> ArisanResult<&Proposal> {
        self.proposals
            .get(index as usize)
            .ok_or(ArisanError::ProposalDoesNotExist(index))
    }

    /// Record `voter`'s ballot on proposal `index`.
    ///
    /// `category` must match the proposal's category. `active_voters` is the
    /// current voter set; the caller checks that `voter` belongs to it.
    /// Threshold, approvals and undecided ballots are all counted over that
    /// set, so votes of members who left or went inactive no longer count.
    pub fn record_vote(
        &mut self,
        index: u64,
        category: ProposalCategory,
        voter: Address,
        vote: Vote,
        active_voters: &BTreeSet<Address>,
        now: u64,
    ) -> ArisanResult<VoteOutcome> {
        let proposal = self
            .proposals
            .get_mut(index as usize)
            .ok_or(ArisanError::ProposalDoesNotExist(index))?;

        if proposal.category() != category {
            return Err(ArisanError::InvalidProposalCategory {
                expected: category,
                actual: proposal.category(),
            });
        }
        if proposal.is_completed() {
            return Err(ArisanError::ProposalAlreadyCompleted(index));
        }
        if proposal.has_voted(&voter) {
            return Err(ArisanError::AlreadyVotedOnProposal(index));
        }

        let threshold = majority_threshold(active_voters.len() as u32);
        match vote {
            Vote::Approve => proposal.approvers.push(voter),
            Vote::Reject => proposal.rejecters.push(voter),
        }

        let approvals = proposal.approvals_among(active_voters);
        if vote == Vote::Approve && approvals >= threshold {
            proposal.is_approved = true;
            proposal.completed_at = Some(now);
            return Ok(VoteOutcome::Approved);
        }
        if vote == Vote::Reject && approvals + proposal.undecided_among(active_voters) < threshold {
            proposal.completed_at = Some(now);
            return Ok(VoteOutcome::Rejected);
        }
        Ok(VoteOutcome::Pending)
    }

    pub fn proposals_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter().filter(|p| !p.is_completed())
    }

    pub fn incomplete_count(&self) -> usize {
        self.incomplete().count()
    }

    /// The `position`-th open proposal, oldest first.
    pub fn incomplete_by_index(&self, position: usize) -> Option<&Proposal> {
        self.incomplete().nth(position)
    }

    /// Open proposals created while period `period` was ongoing.
    pub fn incomplete_scoped_to(&self, period: u64) -> usize {
        self.incomplete()
            .filter(|p| p.period_scope == Some(period))
            .count()
    }

    pub fn approver_by_index(&self, index: u64, position: usize) -> ArisanResult<Option<Address>> {
        Ok(self.proposal(index)?.approvers.get(position).copied())
    }

    pub fn has_voted(&self, index: u64, voter: &Address) -> ArisanResult<bool> {
        Ok(self.proposal(index)?.has_voted(voter))
    }

    /// Open NewMember proposal for `address`, if any.
    pub fn pending_join_for(&self, address: &Address) -> Option<&Proposal> {
        self.incomplete().find(|p| {
            matches!(&p.payload, ProposalPayload::NewMember { address: a, .. } if a == address)
        })
    }
}

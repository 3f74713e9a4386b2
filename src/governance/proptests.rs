//! Property-based tests for proposal voting
//!
//! Tests for:
//! - Threshold: approval completes exactly at floor(n/2)+1 approvals
//! - Completion: completed proposals reject every further vote
//! - Rejection: early rejection only fires once approval is unreachable
//! - Departure: ballots from outside the current voter set never count

use super::*;
use proptest::prelude::*;

fn voter(id: u32) -> Address {
    let mut bytes = [0u8; 20];
    bytes[16..].copy_from_slice(&(id + 1).to_be_bytes());
    Address::from_bytes(&bytes)
}

fn voters(active: u32) -> BTreeSet<Address> {
    (0..active).map(voter).collect()
}

fn fresh() -> ProposalGovernance {
    let mut gov = ProposalGovernance::new();
    gov.create(
        ProposalPayload::NewCommission { percentage: 20 },
        voter(0),
        0,
        None,
    );
    gov
}

proptest! {
    /// Property: the threshold-th approval completes the proposal, none before it
    #[test]
    fn approval_completes_exactly_at_threshold(active in 1u32..60) {
        let mut gov = fresh();
        let threshold = majority_threshold(active);
        let set = voters(active);

        for id in 0..threshold {
            let outcome = gov
                .record_vote(0, ProposalCategory::NewCommission, voter(id), Vote::Approve, &set, 1)
                .unwrap();
            if id + 1 < threshold {
                prop_assert_eq!(outcome, VoteOutcome::Pending);
            } else {
                prop_assert_eq!(outcome, VoteOutcome::Approved);
            }
        }
        prop_assert!(gov.proposal(0).unwrap().is_approved);
    }

    /// Property: once completed, any vote fails with ProposalAlreadyCompleted
    #[test]
    fn completed_proposals_reject_votes(
        active in 1u32..40,
        approve in any::<bool>(),
        late_vote in any::<bool>(),
    ) {
        let mut gov = fresh();
        let set = voters(active);
        let vote = Vote::from_approve(approve);
        let mut id = 0;
        while !gov.proposal(0).unwrap().is_completed() {
            gov.record_vote(0, ProposalCategory::NewCommission, voter(id), vote, &set, 1)
                .unwrap();
            id += 1;
        }

        let err = gov
            .record_vote(0, ProposalCategory::NewCommission, voter(id), Vote::from_approve(late_vote), &set, 2)
            .unwrap_err();
        prop_assert_eq!(err, ArisanError::ProposalAlreadyCompleted(0));
    }

    /// Property: a proposal is rejected early only when approvals plus
    /// undecided voters cannot reach the threshold
    #[test]
    fn early_rejection_only_when_unreachable(
        active in 1u32..40,
        ballots in prop::collection::vec(any::<bool>(), 1..40),
    ) {
        let mut gov = fresh();
        let threshold = majority_threshold(active);
        let set = voters(active);

        for (id, approve) in ballots.into_iter().enumerate().take(active as usize) {
            let outcome = gov
                .record_vote(0, ProposalCategory::NewCommission, voter(id as u32), Vote::from_approve(approve), &set, 1)
                .unwrap();
            let proposal = gov.proposal(0).unwrap();
            let undecided = proposal.undecided_among(&set);
            match outcome {
                VoteOutcome::Rejected => {
                    prop_assert!(proposal.approvers_count() + undecided < threshold);
                }
                VoteOutcome::Pending => {
                    prop_assert!(proposal.approvers_count() + undecided >= threshold);
                    prop_assert!(proposal.approvers_count() < threshold);
                }
                VoteOutcome::Approved => {
                    prop_assert_eq!(proposal.approvers_count(), threshold);
                }
            }
            if outcome != VoteOutcome::Pending {
                break;
            }
        }
    }

    /// Property: approvals from voters outside the current set never count
    /// toward approval or rejection
    #[test]
    fn departed_voters_are_ignored(
        active in 2u32..30,
        departed in 1u32..10,
    ) {
        let mut gov = fresh();
        let everyone = voters(active + departed);
        for id in active..active + departed {
            gov.record_vote(0, ProposalCategory::NewCommission, voter(id), Vote::Approve, &everyone, 1)
                .unwrap();
            if gov.proposal(0).unwrap().is_completed() {
                return Ok(());
            }
        }

        let set = voters(active);
        let threshold = majority_threshold(active);
        let outcome = gov
            .record_vote(0, ProposalCategory::NewCommission, voter(0), Vote::Reject, &set, 2)
            .unwrap();
        let reachable = active - 1 >= threshold;
        prop_assert_eq!(outcome == VoteOutcome::Pending, reachable);
        prop_assert_eq!(gov.proposal(0).unwrap().approvals_among(&set), 0);
    }
}

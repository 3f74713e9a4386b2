//! Group engine errors.
//!
//! Every command either commits fully or fails with exactly one of these.
//! Variants are grouped by [`ErrorCategory`] so callers can branch on the
//! kind of failure without matching every variant.

use crate::governance::ProposalCategory;
use crate::identity::{Address, Wei};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for group operations.
pub type ArisanResult<T> = Result<T, ArisanError>;

/// Broad failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    AccessControl,
    Validation,
    PeriodState,
    ProposalState,
    MembershipCapacity,
    Finance,
    Platform,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccessControl => "access-control",
            Self::Validation => "validation",
            Self::PeriodState => "period-state",
            Self::ProposalState => "proposal-state",
            Self::MembershipCapacity => "membership/capacity",
            Self::Finance => "finance",
            Self::Platform => "platform",
        };
        f.write_str(name)
    }
}

/// Group engine errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArisanError {
    // Access control
    #[error("caller is not the coordinator")]
    NotCoordinator,

    #[error("caller is not a member")]
    NotMember,

    #[error("caller is not an active voter")]
    NotActiveVoter,

    #[error("a member cannot propose itself")]
    CannotProposeSelf,

    #[error("the coordinator cannot be kicked")]
    CannotKickCoordinator,

    // Validation
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("chat link must not be empty")]
    EmptyChatUrl,

    #[error("handle must not be empty")]
    EmptyHandle,

    #[error("commission percentage {0} outside 5..=50")]
    InvalidCommissionPercentage(u8),

    #[error("prize percentage {0} outside 1..=100")]
    InvalidPrizePercentage(u8),

    #[error("commission {commission}% + prize {prize}% exceeds 100%")]
    PercentageSumExceeded { commission: u8, prize: u8 },

    #[error("contribution amount must be greater than zero")]
    ContributionAmountIsZero,

    #[error("amount must be greater than zero")]
    AmountIsZero,

    #[error("invalid recipient address")]
    InvalidRecipient,

    #[error("{0} is already the coordinator")]
    AlreadyCoordinator(Address),

    // Period state
    #[error("no period has been started")]
    NoPeriodOngoing,

    #[error("the last period has not ended")]
    LastPeriodNotEnded,

    #[error("period {0} still has due winners")]
    PeriodNotEnded(u64),

    #[error("period {0} has ended")]
    PeriodEnded(u64),

    #[error("period {0} does not exist")]
    PeriodDoesNotExist(u64),

    #[error("round {round} of period {period} does not exist")]
    RoundDoesNotExist { period: u64, round: u64 },

    #[error("already contributed this round")]
    AlreadyContributedThisRound,

    #[error("incorrect contribution: expected {expected} wei, received {received} wei")]
    IncorrectContributionAmount { expected: Wei, received: Wei },

    #[error("round incomplete: {missing} due winner(s) have not contributed")]
    IncompleteRound { missing: usize },

    #[error("no due winners remaining in period")]
    NoDueWinnersRemaining,

    #[error("did not participate in the previous round")]
    DidNotParticipateInPreviousRound,

    #[error("not a participant of period {0}")]
    NotParticipatingInPeriod(u64),

    // Proposal state
    #[error("proposal {0} does not exist")]
    ProposalDoesNotExist(u64),

    #[error("proposal {0} is already completed")]
    ProposalAlreadyCompleted(u64),

    #[error("already voted on proposal {0}")]
    AlreadyVotedOnProposal(u64),

    #[error("proposal is {actual}, not {expected}")]
    InvalidProposalCategory {
        expected: ProposalCategory,
        actual: ProposalCategory,
    },

    #[error("{0} incomplete proposal(s) remaining for this period")]
    IncompleteProposalsRemaining(usize),

    // Membership / capacity
    #[error("member {0} already exists")]
    MemberAlreadyExists(Address),

    #[error("member {0} does not exist")]
    MemberDoesNotExist(Address),

    #[error("group capacity of {max} members reached")]
    GroupCapacityExceeded { max: u32 },

    #[error("the coordinator cannot leave")]
    CoordinatorCannotLeave,

    #[error("cannot leave while still due to win in the ongoing period")]
    CannotLeaveWhileParticipating,

    #[error("member is still participating in the ongoing period")]
    StillParticipatingInPeriod,

    #[error("open join is disabled")]
    JoinMechanismNotOpen,

    #[error("already waiting for join approval")]
    AlreadyWaitingForJoinApproval,

    #[error("capacity upgrade costs exactly {expected} wei, received {received} wei")]
    IncorrectCapacityUpgradePayment { expected: Wei, received: Wei },

    #[error("capacity upgrade requires {expected} wei")]
    InsufficientCapacityUpgradeFunds { expected: Wei },

    #[error("cannot upgrade capacity {max} with {members} member(s)")]
    CannotUpgradeAtCurrentMemberCount { members: u32, max: u32 },

    // Finance
    #[error("insufficient balance: {available} wei available, {requested} wei requested")]
    InsufficientBalance { available: Wei, requested: Wei },

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("command does not accept payment")]
    PaymentNotAccepted,

    // Platform
    #[error("platform config has not been initialized")]
    PlatformNotInitialized,

    #[error("platform config is already initialized")]
    PlatformAlreadyInitialized,

    #[error("group {0} does not exist")]
    GroupDoesNotExist(u64),
}

impl ArisanError {
    /// Failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        use ArisanError::*;
        match self {
            NotCoordinator | NotMember | NotActiveVoter | CannotProposeSelf
            | CannotKickCoordinator => ErrorCategory::AccessControl,

            EmptyTitle
            | EmptyChatUrl
            | EmptyHandle
            | InvalidCommissionPercentage(_)
            | InvalidPrizePercentage(_)
            | PercentageSumExceeded { .. }
            | ContributionAmountIsZero
            | AmountIsZero
            | InvalidRecipient
            | AlreadyCoordinator(_) => ErrorCategory::Validation,

            NoPeriodOngoing
            | LastPeriodNotEnded
            | PeriodNotEnded(_)
            | PeriodEnded(_)
            | PeriodDoesNotExist(_)
            | RoundDoesNotExist { .. }
            | AlreadyContributedThisRound
            | IncorrectContributionAmount { .. }
            | IncompleteRound { .. }
            | NoDueWinnersRemaining
            | DidNotParticipateInPreviousRound
            | NotParticipatingInPeriod(_) => ErrorCategory::PeriodState,

            ProposalDoesNotExist(_)
            | ProposalAlreadyCompleted(_)
            | AlreadyVotedOnProposal(_)
            | InvalidProposalCategory { .. }
            | IncompleteProposalsRemaining(_) => ErrorCategory::ProposalState,

            MemberAlreadyExists(_)
            | MemberDoesNotExist(_)
            | GroupCapacityExceeded { .. }
            | CoordinatorCannotLeave
            | CannotLeaveWhileParticipating
            | StillParticipatingInPeriod
            | JoinMechanismNotOpen
            | AlreadyWaitingForJoinApproval
            | IncorrectCapacityUpgradePayment { .. }
            | InsufficientCapacityUpgradeFunds { .. }
            | CannotUpgradeAtCurrentMemberCount { .. } => ErrorCategory::MembershipCapacity,

            InsufficientBalance { .. } | TransferFailed(_) | PaymentNotAccepted => {
                ErrorCategory::Finance
            }

            PlatformNotInitialized | PlatformAlreadyInitialized | GroupDoesNotExist(_) => {
                ErrorCategory::Platform
            }
        }
    }
}

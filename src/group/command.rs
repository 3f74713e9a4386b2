//! Write commands accepted by a group.

use crate::governance::{ProposalCategory, ProposalPayload, Vote};
use crate::identity::{Address, Wei};
use serde::{Deserialize, Serialize};

/// A state-changing request against one group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Ask to join. Opens a NewMember proposal for the caller.
    JoinGroup { handle: String },
    /// Join directly. Only while open join is enabled.
    JoinGroupNoApproval { handle: String },
    Leave,
    StartPeriod,
    /// Pay the period's contribution into its open round.
    Contribute { period: u64 },
    DrawWinner { period: u64 },
    EndPeriod { period: u64 },
    /// Buy one capacity tier.
    UpgradeCapacity,
    ToggleOpenJoin,
    Propose(ProposalPayload),
    Vote {
        proposal: u64,
        category: ProposalCategory,
        vote: Vote,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::JoinGroup { .. } => "join_group",
            Command::JoinGroupNoApproval { .. } => "join_group_no_approval",
            Command::Leave => "leave",
            Command::StartPeriod => "start_period",
            Command::Contribute { .. } => "contribute",
            Command::DrawWinner { .. } => "draw_winner",
            Command::EndPeriod { .. } => "end_period",
            Command::UpgradeCapacity => "upgrade_capacity",
            Command::ToggleOpenJoin => "toggle_open_join",
            Command::Propose(_) => "propose",
            Command::Vote { .. } => "vote",
        }
    }

    /// Whether the command may carry a payment.
    pub fn is_payable(&self) -> bool {
        matches!(self, Command::Contribute { .. } | Command::UpgradeCapacity)
    }
}

/// Who sends a command, with how much, and when.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub caller: Address,
    pub value: Wei,
    pub now: u64,
}

impl CommandContext {
    pub fn new(caller: Address, now: u64) -> Self {
        Self {
            caller,
            value: 0,
            now,
        }
    }

    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }
}

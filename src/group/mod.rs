//! Group aggregate.
//!
//! One `GroupState` owns every component of a single savings group:
//! settings, membership, periods, proposals, treasury and draw beacon.
//! Every write goes through [`GroupState::execute`], which either applies a
//! command completely or leaves the state untouched.
//!
//! Outbound transfers and events produced by a command are returned in
//! [`Applied`]; the caller settles the transfers and publishes the events.

pub mod command;
pub mod settings;

#[cfg(test)]
mod proptests;

pub use command::{Command, CommandContext};
pub use settings::{GroupSettings, NewGroup};

use crate::capacity::CapacityTierPricing;
use crate::error::{ArisanError, ArisanResult};
use crate::events::GroupEvent;
use crate::factory::PlatformConfig;
use crate::governance::{
    Proposal, ProposalCategory, ProposalGovernance, ProposalPayload, Vote, VoteOutcome,
};
use crate::identity::{Address, Wei};
use crate::membership::{Member, MembershipRegistry, Removal};
use crate::period::{DrawBeacon, Period, PeriodCycleEngine, Round};
use crate::treasury::{RoundPayees, Transfer, TransferReason, TreasuryLedger};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// What a committed command produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Applied {
    pub events: Vec<GroupEvent>,
    pub transfers: Vec<Transfer>,
}

/// Read-only summary of a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDetail {
    pub id: u64,
    pub settings: GroupSettings,
    pub members: Vec<Member>,
    pub member_count: u32,
    pub active_voters: u32,
    pub available_capacity: u32,
    pub next_capacity_tier: Option<u32>,
    pub periods_count: u64,
    pub ongoing_period: Option<u64>,
    pub due_winners: Vec<Address>,
    pub incomplete_proposals: usize,
    pub proposals_count: u64,
    pub balance: Wei,
    pub total_contributed: Wei,
    pub total_paid_out: Wei,
    pub platform_revenue: Wei,
    pub beacon_commitment: String,
}

/// State of one savings group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    id: u64,
    settings: GroupSettings,
    membership: MembershipRegistry,
    periods: PeriodCycleEngine,
    governance: ProposalGovernance,
    treasury: TreasuryLedger,
    beacon: DrawBeacon,
}

impl GroupState {
    /// Create a group with the coordinator as its only member.
    pub fn create(
        id: u64,
        params: &NewGroup,
        platform: &PlatformConfig,
        beacon: DrawBeacon,
        now: u64,
    ) -> ArisanResult<(Self, GroupEvent)> {
        let settings =
            GroupSettings::from_new_group(params, platform.capacity.initial_capacity, now)?;
        let mut membership = MembershipRegistry::new();
        membership.add_member(
            params.coordinator,
            &params.coordinator_handle,
            settings.max_capacity,
            now,
        )?;

        let event = GroupEvent::GroupCreated {
            group: id,
            title: settings.title.clone(),
            coordinator: settings.coordinator,
            beacon_commitment: beacon.commitment(),
        };
        let state = Self {
            id,
            settings,
            membership,
            periods: PeriodCycleEngine::new(),
            governance: ProposalGovernance::new(),
            treasury: TreasuryLedger::new(),
            beacon,
        };
        Ok((state, event))
    }

    /// Apply `command` atomically.
    pub fn execute(
        &mut self,
        ctx: &CommandContext,
        command: Command,
        platform: &PlatformConfig,
    ) -> ArisanResult<Applied> {
        let mut next = self.clone();
        let applied = next.apply(ctx, command, platform)?;
        *self = next;
        Ok(applied)
    }

    /// Apply `command` in place. On error the state may be partially
    /// modified, so callers run this against a copy.
    pub(crate) fn apply(
        &mut self,
        ctx: &CommandContext,
        command: Command,
        platform: &PlatformConfig,
    ) -> ArisanResult<Applied> {
        if ctx.value > 0 && !command.is_payable() {
            return Err(ArisanError::PaymentNotAccepted);
        }

        let mut events = Vec::new();
        match command {
            Command::JoinGroup { handle } => self.join_group(ctx, &handle, &mut events)?,
            Command::JoinGroupNoApproval { handle } => {
                self.join_group_no_approval(ctx, &handle, &mut events)?
            }
            Command::Leave => self.leave(ctx, &mut events)?,
            Command::StartPeriod => self.start_period(ctx, &mut events)?,
            Command::Contribute { period } => self.contribute(ctx, period, &mut events)?,
            Command::DrawWinner { period } => {
                self.draw_winner(ctx, period, platform, &mut events)?
            }
            Command::EndPeriod { period } => self.end_period(ctx, period, &mut events)?,
            Command::UpgradeCapacity => self.upgrade_capacity(ctx, platform, &mut events)?,
            Command::ToggleOpenJoin => self.toggle_open_join(ctx, &mut events)?,
            Command::Propose(payload) => self.propose(ctx, payload, &mut events)?,
            Command::Vote {
                proposal,
                category,
                vote,
            } => self.vote(ctx, proposal, category, vote, &mut events)?,
        }

        Ok(Applied {
            events,
            transfers: self.treasury.take_pending(),
        })
    }

    fn require_member(&self, caller: &Address) -> ArisanResult<()> {
        if !self.membership.is_member(caller) {
            return Err(ArisanError::NotMember);
        }
        Ok(())
    }

    fn join_group(
        &mut self,
        ctx: &CommandContext,
        handle: &str,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        let payload = ProposalPayload::NewMember {
            address: ctx.caller,
            handle: handle.trim().to_string(),
        };
        settings::validate_payload(&payload, &self.settings)?;
        self.check_join_request(&ctx.caller)?;

        let proposal = self.open_proposal(payload, ctx, events);
        events.push(GroupEvent::JoinRequested {
            group: self.id,
            member: ctx.caller,
            proposal,
        });
        Ok(())
    }

    fn check_join_request(&self, address: &Address) -> ArisanResult<()> {
        if self.membership.is_member(address) {
            return Err(ArisanError::MemberAlreadyExists(*address));
        }
        if self.governance.pending_join_for(address).is_some() {
            return Err(ArisanError::AlreadyWaitingForJoinApproval);
        }
        if self.membership.member_count() >= self.settings.max_capacity {
            return Err(ArisanError::GroupCapacityExceeded {
                max: self.settings.max_capacity,
            });
        }
        Ok(())
    }

    fn join_group_no_approval(
        &mut self,
        ctx: &CommandContext,
        handle: &str,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        if !self.settings.open_join_enabled {
            return Err(ArisanError::JoinMechanismNotOpen);
        }
        if self.governance.pending_join_for(&ctx.caller).is_some() {
            return Err(ArisanError::AlreadyWaitingForJoinApproval);
        }
        let member = self.membership.add_member(
            ctx.caller,
            handle,
            self.settings.max_capacity,
            ctx.now,
        )?;
        events.push(GroupEvent::MemberJoined {
            group: self.id,
            member: member.address,
            handle: member.handle.clone(),
        });
        Ok(())
    }

    fn leave(&mut self, ctx: &CommandContext, events: &mut Vec<GroupEvent>) -> ArisanResult<()> {
        self.require_member(&ctx.caller)?;
        self.membership.remove_member(
            &ctx.caller,
            &self.settings.coordinator,
            self.periods.ongoing_due_winners(),
            Removal::Leave,
        )?;
        events.push(GroupEvent::MemberLeft {
            group: self.id,
            member: ctx.caller,
            kicked: false,
        });
        Ok(())
    }

    fn start_period(
        &mut self,
        ctx: &CommandContext,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        self.require_member(&ctx.caller)?;
        let period =
            self.periods
                .start_period(&mut self.membership, self.settings.period_terms(), ctx.now)?;
        events.push(GroupEvent::PeriodStarted {
            group: self.id,
            period: period.index,
            participants: period.participants.len() as u32,
        });
        Ok(())
    }

    fn contribute(
        &mut self,
        ctx: &CommandContext,
        period: u64,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        self.require_member(&ctx.caller)?;
        let receipt = self.periods.contribute(
            period,
            ctx.caller,
            ctx.value,
            &mut self.membership,
            &mut self.treasury,
        )?;
        debug!(
            group = self.id,
            period,
            round = receipt.round,
            contributors = receipt.contributor_count,
            "contribution accepted"
        );
        events.push(GroupEvent::ContributionReceived {
            group: self.id,
            period,
            round: receipt.round,
            member: ctx.caller,
            amount: ctx.value,
        });
        Ok(())
    }

    fn draw_winner(
        &mut self,
        ctx: &CommandContext,
        period: u64,
        platform: &PlatformConfig,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        self.require_member(&ctx.caller)?;
        let payees = RoundPayees {
            winner: Address::ZERO,
            coordinator: self.settings.coordinator,
            platform_wallet: platform.platform_wallet,
        };
        let outcome =
            self.periods
                .draw_winner(period, &self.beacon, &mut self.treasury, payees, ctx.now)?;
        events.push(GroupEvent::WinnerDrawn {
            group: self.id,
            period,
            round: outcome.round,
            winner: outcome.winner,
            prize: outcome.split.prize,
        });

        if outcome.due_winners_left == 0 && self.governance.incomplete_scoped_to(period) == 0 {
            self.periods.end_period(period, 0, ctx.now)?;
            events.push(GroupEvent::PeriodEnded {
                group: self.id,
                period,
            });
        }
        Ok(())
    }

    fn end_period(
        &mut self,
        ctx: &CommandContext,
        period: u64,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        self.require_member(&ctx.caller)?;
        let scoped = self.governance.incomplete_scoped_to(period);
        self.periods.end_period(period, scoped, ctx.now)?;
        events.push(GroupEvent::PeriodEnded {
            group: self.id,
            period,
        });
        Ok(())
    }

    fn upgrade_capacity(
        &mut self,
        ctx: &CommandContext,
        platform: &PlatformConfig,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        self.require_member(&ctx.caller)?;
        let upgrade = platform.pricing().quote_upgrade(
            self.settings.max_capacity,
            self.membership.member_count(),
            ctx.value,
        )?;
        self.treasury.route_platform_revenue(
            platform.platform_wallet,
            upgrade.cost,
            TransferReason::CapacityUpgrade,
        )?;
        self.settings.max_capacity = upgrade.new_capacity;
        self.settings.capacity_upgrade_count += 1;
        events.push(GroupEvent::CapacityUpgraded {
            group: self.id,
            new_capacity: upgrade.new_capacity,
            cost: upgrade.cost,
        });
        Ok(())
    }

    fn toggle_open_join(
        &mut self,
        ctx: &CommandContext,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        if ctx.caller != self.settings.coordinator {
            return Err(ArisanError::NotCoordinator);
        }
        self.settings.open_join_enabled = !self.settings.open_join_enabled;
        events.push(GroupEvent::OpenJoinToggled {
            group: self.id,
            enabled: self.settings.open_join_enabled,
        });
        Ok(())
    }

    fn propose(
        &mut self,
        ctx: &CommandContext,
        payload: ProposalPayload,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        self.require_member(&ctx.caller)?;
        settings::validate_payload(&payload, &self.settings)?;

        match &payload {
            ProposalPayload::KickMember { member } => {
                if *member == ctx.caller {
                    return Err(ArisanError::CannotProposeSelf);
                }
                if *member == self.settings.coordinator {
                    return Err(ArisanError::CannotKickCoordinator);
                }
                if !self.membership.is_member(member) {
                    return Err(ArisanError::MemberDoesNotExist(*member));
                }
            }
            ProposalPayload::NewCoordinator { coordinator } => {
                self.check_coordinator_candidate(coordinator)?;
            }
            ProposalPayload::NewMember { address, .. } => {
                if *address == ctx.caller {
                    return Err(ArisanError::CannotProposeSelf);
                }
                self.check_join_request(address)?;
            }
            _ => {}
        }

        let target = payload.target();
        let is_join = payload.category() == ProposalCategory::NewMember;
        let proposal = self.open_proposal(payload, ctx, events);
        if let (true, Some(member)) = (is_join, target) {
            events.push(GroupEvent::JoinRequested {
                group: self.id,
                member,
                proposal,
            });
        }
        Ok(())
    }

    fn check_coordinator_candidate(&self, candidate: &Address) -> ArisanResult<()> {
        if !self.membership.is_member(candidate) {
            return Err(ArisanError::MemberDoesNotExist(*candidate));
        }
        if *candidate == self.settings.coordinator {
            return Err(ArisanError::AlreadyCoordinator(*candidate));
        }
        Ok(())
    }

    fn open_proposal(
        &mut self,
        payload: ProposalPayload,
        ctx: &CommandContext,
        events: &mut Vec<GroupEvent>,
    ) -> u64 {
        let scope = self.periods.ongoing_period().map(|p| p.index);
        let proposal = self.governance.create(payload, ctx.caller, ctx.now, scope);
        events.push(GroupEvent::ProposalCreated {
            group: self.id,
            proposal: proposal.index,
            category: proposal.category(),
            proposer: proposal.proposer,
        });
        proposal.index
    }

    fn vote(
        &mut self,
        ctx: &CommandContext,
        index: u64,
        category: ProposalCategory,
        vote: Vote,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        self.require_member(&ctx.caller)?;
        if !self.membership.is_active_voter(&ctx.caller) {
            return Err(ArisanError::NotActiveVoter);
        }

        let outcome = self.governance.record_vote(
            index,
            category,
            ctx.caller,
            vote,
            &self.membership.active_voters(),
            ctx.now,
        )?;
        debug!(group = self.id, proposal = index, ?vote, ?outcome, "vote recorded");
        events.push(GroupEvent::VoteCast {
            group: self.id,
            proposal: index,
            voter: ctx.caller,
            vote,
        });

        match outcome {
            VoteOutcome::Pending => {}
            VoteOutcome::Approved => {
                let payload = self.governance.proposal(index)?.payload.clone();
                self.apply_effect(index, payload, ctx.now, events)?;
                events.push(GroupEvent::ProposalApproved {
                    group: self.id,
                    proposal: index,
                    category,
                });
                events.push(GroupEvent::ProposalCompleted {
                    group: self.id,
                    proposal: index,
                    approved: true,
                });
            }
            VoteOutcome::Rejected => {
                if let ProposalPayload::NewMember { address, .. } =
                    &self.governance.proposal(index)?.payload
                {
                    events.push(GroupEvent::JoinRejected {
                        group: self.id,
                        member: *address,
                        proposal: index,
                    });
                }
                events.push(GroupEvent::ProposalRejected {
                    group: self.id,
                    proposal: index,
                    category,
                });
                events.push(GroupEvent::ProposalCompleted {
                    group: self.id,
                    proposal: index,
                    approved: false,
                });
            }
        }
        Ok(())
    }

    fn apply_effect(
        &mut self,
        index: u64,
        payload: ProposalPayload,
        now: u64,
        events: &mut Vec<GroupEvent>,
    ) -> ArisanResult<()> {
        match payload {
            ProposalPayload::NewTitle { title } => self.settings.set_title(&title)?,
            ProposalPayload::NewTelegramUrl { url } => self.settings.set_chat_url(&url)?,
            ProposalPayload::NewCommission { percentage } => {
                self.settings.set_commission(percentage)?
            }
            ProposalPayload::NewContribution { amount } => self.settings.set_contribution(amount)?,
            ProposalPayload::NewPrize { percentage } => self.settings.set_prize(percentage)?,
            ProposalPayload::NewCoordinator { coordinator } => {
                self.check_coordinator_candidate(&coordinator)?;
                self.settings.coordinator = coordinator;
            }
            ProposalPayload::NewMember { address, handle } => {
                let member =
                    self.membership
                        .add_member(address, &handle, self.settings.max_capacity, now)?;
                events.push(GroupEvent::MemberJoined {
                    group: self.id,
                    member: member.address,
                    handle: member.handle.clone(),
                });
                events.push(GroupEvent::JoinApproved {
                    group: self.id,
                    member: address,
                    proposal: index,
                });
            }
            ProposalPayload::KickMember { member } => {
                if member == self.settings.coordinator {
                    return Err(ArisanError::CannotKickCoordinator);
                }
                self.membership.remove_member(
                    &member,
                    &self.settings.coordinator,
                    self.periods.ongoing_due_winners(),
                    Removal::Kick,
                )?;
                events.push(GroupEvent::MemberLeft {
                    group: self.id,
                    member,
                    kicked: true,
                });
            }
            ProposalPayload::Transfer { recipient, amount } => {
                let spendable = self
                    .treasury
                    .balance()
                    .saturating_sub(self.periods.locked_funds());
                self.treasury.debit_within(
                    recipient,
                    amount,
                    TransferReason::Proposal { index },
                    spendable,
                )?;
                events.push(GroupEvent::TransferExecuted {
                    group: self.id,
                    proposal: index,
                    recipient,
                    amount,
                });
            }
        }
        Ok(())
    }

    // Read surface.

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn settings(&self) -> &GroupSettings {
        &self.settings
    }

    pub fn membership(&self) -> &MembershipRegistry {
        &self.membership
    }

    pub fn periods(&self) -> &PeriodCycleEngine {
        &self.periods
    }

    pub fn governance(&self) -> &ProposalGovernance {
        &self.governance
    }

    pub fn treasury(&self) -> &TreasuryLedger {
        &self.treasury
    }

    pub fn beacon_commitment(&self) -> String {
        self.beacon.commitment()
    }

    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.membership.member(address)
    }

    pub fn period(&self, index: u64) -> ArisanResult<&Period> {
        self.periods.period(index)
    }

    pub fn round(&self, period: u64, round: u64) -> ArisanResult<&Round> {
        self.periods.round(period, round)
    }

    pub fn proposal(&self, index: u64) -> ArisanResult<&Proposal> {
        self.governance.proposal(index)
    }

    /// Due winners of the ongoing period; empty when none is ongoing.
    pub fn current_due_winners(&self) -> BTreeSet<Address> {
        self.periods.ongoing_due_winners().cloned().unwrap_or_default()
    }

    pub fn available_capacity(&self, pricing: &CapacityTierPricing) -> u32 {
        pricing.available_capacity(self.settings.max_capacity, self.membership.member_count())
    }

    pub fn next_capacity_tier(&self, pricing: &CapacityTierPricing) -> Option<u32> {
        pricing.next_capacity_tier(self.settings.max_capacity)
    }

    pub fn detail(&self, pricing: &CapacityTierPricing) -> GroupDetail {
        GroupDetail {
            id: self.id,
            settings: self.settings.clone(),
            members: self.membership.members().cloned().collect(),
            member_count: self.membership.member_count(),
            active_voters: self.membership.active_voters_count(),
            available_capacity: self.available_capacity(pricing),
            next_capacity_tier: self.next_capacity_tier(pricing),
            periods_count: self.periods.periods_count(),
            ongoing_period: self.periods.ongoing_period().map(|p| p.index),
            due_winners: self.current_due_winners().into_iter().collect(),
            incomplete_proposals: self.governance.incomplete_count(),
            proposals_count: self.governance.proposals_count(),
            balance: self.treasury.balance(),
            total_contributed: self.treasury.total_contributed(),
            total_paid_out: self.treasury.total_paid_out(),
            platform_revenue: self.treasury.platform_revenue(),
            beacon_commitment: self.beacon.commitment(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::CapacityPolicy;

    const AMOUNT: Wei = 1_000;

    fn test_member(id: u8) -> Address {
        Address::from_bytes(&[id; 20])
    }

    fn platform() -> PlatformConfig {
        PlatformConfig {
            platform_wallet: test_member(200),
            capacity: CapacityPolicy::new(500),
        }
    }

    fn new_group() -> GroupState {
        let params = NewGroup {
            title: "Arisan".to_string(),
            chat_url: "https://t.me/arisan".to_string(),
            coordinator: test_member(1),
            coordinator_handle: "coord".to_string(),
            commission_percentage: 10,
            contribution_amount: AMOUNT,
            prize_percentage: 80,
        };
        GroupState::create(0, &params, &platform(), DrawBeacon::from_seed([5u8; 32]), 0)
            .unwrap()
            .0
    }

    fn run(group: &mut GroupState, caller: u8, command: Command) -> ArisanResult<Applied> {
        group.execute(&CommandContext::new(test_member(caller), 1), command, &platform())
    }

    fn pay(group: &mut GroupState, caller: u8, value: Wei, command: Command) -> ArisanResult<Applied> {
        let ctx = CommandContext::new(test_member(caller), 1).with_value(value);
        group.execute(&ctx, command, &platform())
    }

    fn group_with(n: u8) -> GroupState {
        let mut group = new_group();
        run(&mut group, 1, Command::ToggleOpenJoin).unwrap();
        for id in 2..=n {
            run(
                &mut group,
                id,
                Command::JoinGroupNoApproval {
                    handle: format!("m{}", id),
                },
            )
            .unwrap();
        }
        group
    }

    fn approve(group: &mut GroupState, voter: u8, proposal: u64, category: ProposalCategory) -> Applied {
        run(
            group,
            voter,
            Command::Vote {
                proposal,
                category,
                vote: Vote::Approve,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_group() {
        let group = new_group();
        assert_eq!(group.membership().member_count(), 1);
        assert_eq!(group.settings().max_capacity, 10);
        assert_eq!(group.detail(&platform().pricing()).available_capacity, 9);
    }

    #[test]
    fn test_payment_rejected_on_non_payable_command() {
        let mut group = new_group();
        assert_eq!(
            pay(&mut group, 1, 5, Command::StartPeriod).unwrap_err(),
            ArisanError::PaymentNotAccepted
        );
    }

    #[test]
    fn test_toggle_open_join_coordinator_only() {
        let mut group = group_with(2);
        assert_eq!(
            run(&mut group, 2, Command::ToggleOpenJoin).unwrap_err(),
            ArisanError::NotCoordinator
        );
        let applied = run(&mut group, 1, Command::ToggleOpenJoin).unwrap();
        assert_eq!(
            applied.events,
            vec![GroupEvent::OpenJoinToggled {
                group: 0,
                enabled: false
            }]
        );
        assert_eq!(
            run(&mut group, 3, Command::JoinGroupNoApproval { handle: "x".into() }).unwrap_err(),
            ArisanError::JoinMechanismNotOpen
        );
    }

    #[test]
    fn test_governed_join() {
        let mut group = group_with(2);
        run(
            &mut group,
            9,
            Command::JoinGroup {
                handle: "nine".into(),
            },
        )
        .unwrap();
        assert_eq!(
            run(&mut group, 9, Command::JoinGroup { handle: "nine".into() }).unwrap_err(),
            ArisanError::AlreadyWaitingForJoinApproval
        );

        // Two active voters: threshold 2.
        approve(&mut group, 1, 0, ProposalCategory::NewMember);
        assert!(!group.membership().is_member(&test_member(9)));
        let applied = approve(&mut group, 2, 0, ProposalCategory::NewMember);

        assert!(group.membership().is_member(&test_member(9)));
        assert!(applied.events.contains(&GroupEvent::JoinApproved {
            group: 0,
            member: test_member(9),
            proposal: 0
        }));
    }

    #[test]
    fn test_propose_rules() {
        let mut group = group_with(3);
        let propose = |g: &mut GroupState, caller, payload| run(g, caller, Command::Propose(payload));

        assert_eq!(
            propose(&mut group, 2, ProposalPayload::KickMember { member: test_member(2) }).unwrap_err(),
            ArisanError::CannotProposeSelf
        );
        assert_eq!(
            propose(&mut group, 2, ProposalPayload::KickMember { member: test_member(1) }).unwrap_err(),
            ArisanError::CannotKickCoordinator
        );
        assert_eq!(
            propose(&mut group, 2, ProposalPayload::NewCoordinator { coordinator: test_member(1) })
                .unwrap_err(),
            ArisanError::AlreadyCoordinator(test_member(1))
        );
        assert_eq!(
            propose(
                &mut group,
                2,
                ProposalPayload::NewMember {
                    address: test_member(2),
                    handle: "me".into()
                }
            )
            .unwrap_err(),
            ArisanError::CannotProposeSelf
        );
        assert_eq!(
            propose(&mut group, 9, ProposalPayload::NewTitle { title: "t".into() }).unwrap_err(),
            ArisanError::NotMember
        );
        assert_eq!(group.governance().proposals_count(), 0);
    }

    #[test]
    fn test_vote_requires_active_voter() {
        let mut group = group_with(2);
        run(
            &mut group,
            1,
            Command::Propose(ProposalPayload::NewTitle { title: "t".into() }),
        )
        .unwrap();
        group.membership.set_active_voter(&test_member(2), false).unwrap();

        assert_eq!(
            run(
                &mut group,
                2,
                Command::Vote {
                    proposal: 0,
                    category: ProposalCategory::NewTitle,
                    vote: Vote::Approve
                }
            )
            .unwrap_err(),
            ArisanError::NotActiveVoter
        );
    }

    #[test]
    fn test_failed_effect_aborts_vote() {
        let mut group = group_with(1);
        run(
            &mut group,
            1,
            Command::Propose(ProposalPayload::Transfer {
                recipient: test_member(7),
                amount: 10,
            }),
        )
        .unwrap();

        let err = run(
            &mut group,
            1,
            Command::Vote {
                proposal: 0,
                category: ProposalCategory::Transfer,
                vote: Vote::Approve,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ArisanError::InsufficientBalance {
                available: 0,
                requested: 10
            }
        );
        let proposal = group.proposal(0).unwrap();
        assert!(!proposal.is_completed());
        assert_eq!(proposal.approvers_count(), 0);
    }

    #[test]
    fn test_transfer_cannot_spend_open_round_pool() {
        let mut group = group_with(2);
        run(&mut group, 1, Command::StartPeriod).unwrap();
        pay(&mut group, 1, AMOUNT, Command::Contribute { period: 0 }).unwrap();
        run(
            &mut group,
            2,
            Command::Propose(ProposalPayload::Transfer {
                recipient: test_member(7),
                amount: 1,
            }),
        )
        .unwrap();

        approve(&mut group, 1, 0, ProposalCategory::Transfer);
        let err = run(
            &mut group,
            2,
            Command::Vote {
                proposal: 0,
                category: ProposalCategory::Transfer,
                vote: Vote::Approve,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            ArisanError::InsufficientBalance {
                available: 0,
                requested: 1
            }
        );
    }

    #[test]
    fn test_full_period_auto_ends() {
        let mut group = group_with(2);
        run(&mut group, 2, Command::StartPeriod).unwrap();

        for _ in 0..2 {
            pay(&mut group, 1, AMOUNT, Command::Contribute { period: 0 }).unwrap();
            pay(&mut group, 2, AMOUNT, Command::Contribute { period: 0 }).unwrap();
            let applied = run(&mut group, 1, Command::DrawWinner { period: 0 }).unwrap();
            assert_eq!(applied.transfers.len(), 3);
        }

        assert!(!group.periods().is_ongoing());
        assert_eq!(group.period(0).unwrap().winners().len(), 2);
        run(&mut group, 1, Command::StartPeriod).unwrap();
        assert_eq!(group.periods().periods_count(), 2);
    }

    #[test]
    fn test_scoped_proposal_defers_period_end() {
        let mut group = group_with(2);
        run(&mut group, 1, Command::StartPeriod).unwrap();
        run(
            &mut group,
            1,
            Command::Propose(ProposalPayload::NewTitle { title: "later".into() }),
        )
        .unwrap();

        for _ in 0..2 {
            pay(&mut group, 1, AMOUNT, Command::Contribute { period: 0 }).unwrap();
            pay(&mut group, 2, AMOUNT, Command::Contribute { period: 0 }).unwrap();
            run(&mut group, 1, Command::DrawWinner { period: 0 }).unwrap();
        }
        assert!(group.periods().is_ongoing());
        assert_eq!(
            run(&mut group, 1, Command::EndPeriod { period: 0 }).unwrap_err(),
            ArisanError::IncompleteProposalsRemaining(1)
        );

        approve(&mut group, 1, 0, ProposalCategory::NewTitle);
        approve(&mut group, 2, 0, ProposalCategory::NewTitle);
        run(&mut group, 1, Command::EndPeriod { period: 0 }).unwrap();
        assert!(!group.periods().is_ongoing());
        assert_eq!(group.settings().title, "later");
    }

    #[test]
    fn test_upgrade_capacity_routes_to_platform() {
        let mut group = group_with(10);
        assert_eq!(
            pay(&mut group, 2, 0, Command::UpgradeCapacity).unwrap_err(),
            ArisanError::InsufficientCapacityUpgradeFunds { expected: 500 }
        );
        let applied = pay(&mut group, 2, 500, Command::UpgradeCapacity).unwrap();

        assert_eq!(group.settings().max_capacity, 20);
        assert_eq!(group.settings().capacity_upgrade_count, 1);
        assert_eq!(group.treasury().balance(), 0);
        assert_eq!(applied.transfers[0].recipient, test_member(200));
    }

    #[test]
    fn test_kick_member() {
        let mut group = group_with(3);
        run(
            &mut group,
            2,
            Command::Propose(ProposalPayload::KickMember { member: test_member(3) }),
        )
        .unwrap();
        approve(&mut group, 1, 0, ProposalCategory::KickMember);
        let applied = approve(&mut group, 2, 0, ProposalCategory::KickMember);

        assert!(!group.membership().is_member(&test_member(3)));
        assert!(applied.events.contains(&GroupEvent::MemberLeft {
            group: 0,
            member: test_member(3),
            kicked: true
        }));
    }

    #[test]
    fn test_reads_are_idempotent() {
        let group = group_with(3);
        let pricing = platform().pricing();
        assert_eq!(group.detail(&pricing), group.detail(&pricing));
    }
}

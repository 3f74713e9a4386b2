//! Period cycle engine.
//!
//! A period is one full rotation: every due winner wins exactly once. Each
//! period is a sequence of rounds; a round collects one contribution from
//! every participant still due to win (past winners may keep contributing),
//! then draws one winner from the due-winner set and pays the pool out.
//!
//! State machine per group: `NoPeriodOngoing -> Ongoing -> Ended`, cycling.
//! Terms (contribution, commission, prize) are snapshotted at period start,
//! so governance changes only affect later periods.

pub mod beacon;

pub use beacon::DrawBeacon;

use crate::error::{ArisanError, ArisanResult};
use crate::identity::{Address, Wei};
use crate::membership::MembershipRegistry;
use crate::treasury::{PayoutSplit, RoundPayees, TreasuryLedger};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Settings captured when a period starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTerms {
    pub contribution_amount: Wei,
    pub commission_percentage: u8,
    pub prize_percentage: u8,
}

/// One contribution-and-draw iteration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub index: u64,
    pub drawn_at: Option<u64>,
    pub winner: Option<Address>,
    pub contributor_count: u32,
    pub contributors: BTreeSet<Address>,
    /// Sum of this round's contributions.
    pub pool: Wei,
    /// Split applied when the round was drawn.
    pub payout: Option<PayoutSplit>,
}

impl Round {
    fn open(index: u64) -> Self {
        Self {
            index,
            drawn_at: None,
            winner: None,
            contributor_count: 0,
            contributors: BTreeSet::new(),
            pool: 0,
            payout: None,
        }
    }

    pub fn is_drawn(&self) -> bool {
        self.drawn_at.is_some()
    }

    pub fn has_contributed(&self, member: &Address) -> bool {
        self.contributors.contains(member)
    }
}

/// One rotation of the group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub index: u64,
    pub started_at: u64,
    pub ended_at: Option<u64>,
    pub terms: PeriodTerms,
    /// Pool remainders accrued by this period's draws.
    pub remaining_balance: Wei,
    pub rounds: Vec<Round>,
    /// Members still eligible to win. Shrinks by one per draw.
    pub due_winners: BTreeSet<Address>,
    /// Members admitted to the period at start.
    pub participants: BTreeSet<Address>,
}

impl Period {
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// The round currently collecting contributions.
    pub fn open_round(&self) -> Option<&Round> {
        self.rounds.last().filter(|r| !r.is_drawn())
    }

    fn open_round_mut(&mut self) -> Option<&mut Round> {
        self.rounds.last_mut().filter(|r| !r.is_drawn())
    }

    /// Due winners that have not contributed to the open round.
    pub fn missing_contributors(&self) -> Vec<Address> {
        match self.open_round() {
            Some(round) => self
                .due_winners
                .iter()
                .filter(|m| !round.has_contributed(m))
                .copied()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Winners drawn so far, in round order.
    pub fn winners(&self) -> Vec<Address> {
        self.rounds.iter().filter_map(|r| r.winner).collect()
    }
}

/// Receipt for an accepted contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionReceipt {
    pub period: u64,
    pub round: u64,
    pub contributor_count: u32,
}

/// Result of a draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawOutcome {
    pub period: u64,
    pub round: u64,
    pub winner: Address,
    pub split: PayoutSplit,
    pub due_winners_left: usize,
}

/// Owns every period of a group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCycleEngine {
    periods: Vec<Period>,
}

impl PeriodCycleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn periods_count(&self) -> u64 {
        self.periods.len() as u64
    }

    pub fn period(&self, index: u64) -> ArisanResult<&Period> {
        self.periods
            .get(index as usize)
            .ok_or(ArisanError::PeriodDoesNotExist(index))
    }

    pub fn round(&self, period: u64, round: u64) -> ArisanResult<&Round> {
        self.period(period)?
            .rounds
            .get(round as usize)
            .ok_or(ArisanError::RoundDoesNotExist { period, round })
    }

    /// Most recently started period, ended or not.
    pub fn current_period(&self) -> Option<&Period> {
        self.periods.last()
    }

    pub fn is_ongoing(&self) -> bool {
        self.current_period().is_some_and(|p| !p.is_ended())
    }

    pub fn ongoing_period(&self) -> Option<&Period> {
        self.current_period().filter(|p| !p.is_ended())
    }

    /// Due winners of the ongoing period.
    pub fn ongoing_due_winners(&self) -> Option<&BTreeSet<Address>> {
        self.ongoing_period().map(|p| &p.due_winners)
    }

    /// Contributions collected for a round that has not been drawn yet.
    /// These are owed to the next winner and cannot be spent elsewhere.
    pub fn locked_funds(&self) -> Wei {
        self.ongoing_period()
            .and_then(|p| p.open_round())
            .map(|r| r.pool)
            .unwrap_or(0)
    }

    /// Start the next period.
    ///
    /// Period 0 admits every member. Later periods admit members who took
    /// part in the previous period and members who have never taken part;
    /// anyone else is left out and loses their active-voter flag.
    pub fn start_period(
        &mut self,
        registry: &mut MembershipRegistry,
        terms: PeriodTerms,
        now: u64,
    ) -> ArisanResult<&Period> {
        if self.is_ongoing() {
            return Err(ArisanError::LastPeriodNotEnded);
        }

        let index = self.periods_count();
        let previous = index.checked_sub(1);
        let mut participants = BTreeSet::new();
        let mut excluded = Vec::new();

        for member in registry.members() {
            let eligible = match (previous, member.latest_period_participation) {
                (None, _) | (_, None) => true,
                (Some(prev), Some(latest)) => latest >= prev,
            };
            if eligible {
                participants.insert(member.address);
            } else {
                excluded.push(member.address);
            }
        }

        if participants.is_empty() {
            return Err(ArisanError::NoDueWinnersRemaining);
        }
        for address in &excluded {
            registry.set_active_voter(address, false)?;
        }

        self.periods.push(Period {
            index,
            started_at: now,
            ended_at: None,
            terms,
            remaining_balance: 0,
            rounds: vec![Round::open(0)],
            due_winners: participants.clone(),
            participants,
        });

        Ok(&self.periods[index as usize])
    }

    /// Accept `payment` from `contributor` into the open round of `index`.
    pub fn contribute(
        &mut self,
        index: u64,
        contributor: Address,
        payment: Wei,
        registry: &mut MembershipRegistry,
        treasury: &mut TreasuryLedger,
    ) -> ArisanResult<ContributionReceipt> {
        let period = self
            .periods
            .get_mut(index as usize)
            .ok_or(ArisanError::PeriodDoesNotExist(index))?;
        if period.is_ended() {
            return Err(ArisanError::PeriodEnded(index));
        }
        if !period.participants.contains(&contributor) {
            return Err(ArisanError::NotParticipatingInPeriod(index));
        }

        let expected = period.terms.contribution_amount;
        let previous_contributed = match period.rounds.len() {
            0 | 1 => true,
            n => period.rounds[n - 2].has_contributed(&contributor),
        };
        let round = period
            .open_round_mut()
            .ok_or(ArisanError::NoDueWinnersRemaining)?;

        if round.has_contributed(&contributor) {
            return Err(ArisanError::AlreadyContributedThisRound);
        }
        if !previous_contributed {
            return Err(ArisanError::DidNotParticipateInPreviousRound);
        }
        if payment != expected {
            return Err(ArisanError::IncorrectContributionAmount {
                expected,
                received: payment,
            });
        }

        treasury.credit(payment)?;
        registry.record_participation(&contributor, index)?;
        round.contributors.insert(contributor);
        round.contributor_count += 1;
        round.pool += payment;

        Ok(ContributionReceipt {
            period: index,
            round: round.index,
            contributor_count: round.contributor_count,
        })
    }

    /// Draw the open round's winner of period `index` and pay the pool out.
    ///
    /// `payees` supplies the coordinator and platform wallet; its `winner`
    /// field is ignored and replaced by the beacon's pick.
    pub fn draw_winner(
        &mut self,
        index: u64,
        beacon: &DrawBeacon,
        treasury: &mut TreasuryLedger,
        payees: RoundPayees,
        now: u64,
    ) -> ArisanResult<DrawOutcome> {
        let period = self
            .periods
            .get_mut(index as usize)
            .ok_or(ArisanError::PeriodDoesNotExist(index))?;
        if period.is_ended() {
            return Err(ArisanError::PeriodEnded(index));
        }
        if period.due_winners.is_empty() {
            return Err(ArisanError::NoDueWinnersRemaining);
        }
        let missing = period.missing_contributors().len();
        if missing > 0 {
            return Err(ArisanError::IncompleteRound { missing });
        }

        let terms = period.terms;
        let candidates: Vec<Address> = period.due_winners.iter().copied().collect();
        let round = period
            .open_round_mut()
            .ok_or(ArisanError::NoDueWinnersRemaining)?;
        let winner = beacon
            .pick(index, round.index, &candidates)
            .ok_or(ArisanError::NoDueWinnersRemaining)?;

        let split = PayoutSplit::compute(
            round.pool,
            terms.commission_percentage,
            terms.prize_percentage,
        );
        treasury.settle_round(&split, RoundPayees { winner, ..payees }, index, round.index)?;

        round.drawn_at = Some(now);
        round.winner = Some(winner);
        round.payout = Some(split);
        let round_index = round.index;

        period.remaining_balance = period.remaining_balance.saturating_add(split.remainder);
        period.due_winners.remove(&winner);
        if !period.due_winners.is_empty() {
            period.rounds.push(Round::open(round_index + 1));
        }

        Ok(DrawOutcome {
            period: index,
            round: round_index,
            winner,
            split,
            due_winners_left: period.due_winners.len(),
        })
    }

    /// Close period `index` once every due winner has won and no proposal
    /// scoped to it is still open.
    pub fn end_period(
        &mut self,
        index: u64,
        incomplete_proposals: usize,
        now: u64,
    ) -> ArisanResult<&Period> {
        let period = self
            .periods
            .get_mut(index as usize)
            .ok_or(ArisanError::PeriodDoesNotExist(index))?;
        if period.is_ended() {
            return Err(ArisanError::PeriodEnded(index));
        }
        if !period.due_winners.is_empty() {
            return Err(ArisanError::PeriodNotEnded(index));
        }
        if incomplete_proposals > 0 {
            return Err(ArisanError::IncompleteProposalsRemaining(incomplete_proposals));
        }
        period.ended_at = Some(now);
        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMOUNT: Wei = 1_000;

    fn test_member(id: u8) -> Address {
        Address::from_bytes(&[id; 20])
    }

    fn terms() -> PeriodTerms {
        PeriodTerms {
            contribution_amount: AMOUNT,
            commission_percentage: 10,
            prize_percentage: 80,
        }
    }

    fn payees() -> RoundPayees {
        RoundPayees {
            winner: Address::ZERO,
            coordinator: test_member(1),
            platform_wallet: test_member(99),
        }
    }

    struct Fixture {
        registry: MembershipRegistry,
        treasury: TreasuryLedger,
        engine: PeriodCycleEngine,
        beacon: DrawBeacon,
    }

    fn fixture(n: u8) -> Fixture {
        let mut registry = MembershipRegistry::new();
        for id in 1..=n {
            registry
                .add_member(test_member(id), &format!("m{}", id), 10, 0)
                .unwrap();
        }
        Fixture {
            registry,
            treasury: TreasuryLedger::new(),
            engine: PeriodCycleEngine::new(),
            beacon: DrawBeacon::from_seed([1u8; 32]),
        }
    }

    impl Fixture {
        fn contribute_all(&mut self, period: u64) {
            let members: Vec<_> = self.registry.addresses().to_vec();
            for member in members {
                self.engine
                    .contribute(period, member, AMOUNT, &mut self.registry, &mut self.treasury)
                    .unwrap();
            }
        }

        fn draw(&mut self, period: u64) -> ArisanResult<DrawOutcome> {
            self.engine
                .draw_winner(period, &self.beacon, &mut self.treasury, payees(), 5)
        }
    }

    #[test]
    fn test_start_period_snapshots_members() {
        let mut f = fixture(3);
        let period = f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        assert_eq!(period.index, 0);
        assert_eq!(period.due_winners.len(), 3);
        assert_eq!(period.rounds.len(), 1);
        assert!(f.engine.is_ongoing());
    }

    #[test]
    fn test_start_period_while_ongoing() {
        let mut f = fixture(2);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        assert_eq!(
            f.engine.start_period(&mut f.registry, terms(), 2).unwrap_err(),
            ArisanError::LastPeriodNotEnded
        );
    }

    #[test]
    fn test_contribute_checks() {
        let mut f = fixture(2);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();

        assert_eq!(
            f.engine
                .contribute(1, test_member(1), AMOUNT, &mut f.registry, &mut f.treasury)
                .unwrap_err(),
            ArisanError::PeriodDoesNotExist(1)
        );
        assert_eq!(
            f.engine
                .contribute(0, test_member(1), AMOUNT - 1, &mut f.registry, &mut f.treasury)
                .unwrap_err(),
            ArisanError::IncorrectContributionAmount {
                expected: AMOUNT,
                received: AMOUNT - 1
            }
        );
        assert_eq!(
            f.engine
                .contribute(0, test_member(7), AMOUNT, &mut f.registry, &mut f.treasury)
                .unwrap_err(),
            ArisanError::NotParticipatingInPeriod(0)
        );

        let receipt = f
            .engine
            .contribute(0, test_member(1), AMOUNT, &mut f.registry, &mut f.treasury)
            .unwrap();
        assert_eq!(receipt.contributor_count, 1);
        assert_eq!(f.treasury.balance(), AMOUNT);
        assert_eq!(
            f.engine
                .contribute(0, test_member(1), AMOUNT, &mut f.registry, &mut f.treasury)
                .unwrap_err(),
            ArisanError::AlreadyContributedThisRound
        );
    }

    #[test]
    fn test_draw_requires_complete_round() {
        let mut f = fixture(3);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        f.engine
            .contribute(0, test_member(1), AMOUNT, &mut f.registry, &mut f.treasury)
            .unwrap();

        assert_eq!(f.draw(0).unwrap_err(), ArisanError::IncompleteRound { missing: 2 });
    }

    #[test]
    fn test_draw_removes_winner_and_opens_next_round() {
        let mut f = fixture(3);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        f.contribute_all(0);

        let outcome = f.draw(0).unwrap();
        assert_eq!(outcome.due_winners_left, 2);
        assert_eq!(outcome.split.pool, 3 * AMOUNT);

        let period = f.engine.period(0).unwrap();
        assert!(!period.due_winners.contains(&outcome.winner));
        assert_eq!(period.rounds.len(), 2);
        assert_eq!(period.open_round().unwrap().contributor_count, 0);
        assert_eq!(period.remaining_balance, outcome.split.remainder);
        assert_eq!(f.treasury.balance(), outcome.split.remainder);
    }

    #[test]
    fn test_past_winner_must_keep_contributing() {
        let mut f = fixture(3);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        f.contribute_all(0);
        let first = f.draw(0).unwrap().winner;

        // Round 1: due winners contribute, past winner skips.
        let due: Vec<_> = f.engine.period(0).unwrap().due_winners.iter().copied().collect();
        for member in &due {
            f.engine
                .contribute(0, *member, AMOUNT, &mut f.registry, &mut f.treasury)
                .unwrap();
        }
        f.draw(0).unwrap();

        // Round 2: the past winner who skipped round 1 is turned away.
        assert_eq!(
            f.engine
                .contribute(0, first, AMOUNT, &mut f.registry, &mut f.treasury)
                .unwrap_err(),
            ArisanError::DidNotParticipateInPreviousRound
        );
    }

    #[test]
    fn test_period_exhaustion_and_end() {
        let mut f = fixture(2);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        f.contribute_all(0);
        f.draw(0).unwrap();
        f.contribute_all(0);
        let last = f.draw(0).unwrap();
        assert_eq!(last.due_winners_left, 0);

        assert_eq!(f.draw(0).unwrap_err(), ArisanError::NoDueWinnersRemaining);
        assert_eq!(
            f.engine
                .contribute(0, test_member(1), AMOUNT, &mut f.registry, &mut f.treasury)
                .unwrap_err(),
            ArisanError::NoDueWinnersRemaining
        );
        assert_eq!(
            f.engine.end_period(0, 1, 9).unwrap_err(),
            ArisanError::IncompleteProposalsRemaining(1)
        );

        f.engine.end_period(0, 0, 9).unwrap();
        assert!(!f.engine.is_ongoing());
        assert_eq!(f.engine.period(0).unwrap().ended_at, Some(9));
        assert_eq!(f.engine.period(0).unwrap().winners().len(), 2);
    }

    #[test]
    fn test_end_period_with_due_winners() {
        let mut f = fixture(2);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        assert_eq!(
            f.engine.end_period(0, 0, 2).unwrap_err(),
            ArisanError::PeriodNotEnded(0)
        );
    }

    #[test]
    fn test_next_period_excludes_stale_members() {
        let mut f = fixture(2);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        f.contribute_all(0);
        f.draw(0).unwrap();
        f.contribute_all(0);
        f.draw(0).unwrap();
        f.engine.end_period(0, 0, 3).unwrap();

        // A member whose last participation is older than the previous period.
        f.registry.add_member(test_member(3), "m3", 10, 4).unwrap();
        f.registry.record_participation(&test_member(3), 0).unwrap();
        f.engine.start_period(&mut f.registry, terms(), 5).unwrap();
        f.contribute_all(1);
        f.draw(1).unwrap();
        f.contribute_all(1);
        f.draw(1).unwrap();
        f.contribute_all(1);
        f.draw(1).unwrap();
        f.engine.end_period(1, 0, 6).unwrap();

        f.registry.record_participation(&test_member(3), 0).unwrap();
        let period = f.engine.start_period(&mut f.registry, terms(), 7).unwrap();
        assert!(!period.participants.contains(&test_member(3)));
        assert!(!f.registry.is_active_voter(&test_member(3)));
    }

    #[test]
    fn test_locked_funds_track_open_round() {
        let mut f = fixture(2);
        f.engine.start_period(&mut f.registry, terms(), 1).unwrap();
        f.engine
            .contribute(0, test_member(1), AMOUNT, &mut f.registry, &mut f.treasury)
            .unwrap();
        assert_eq!(f.engine.locked_funds(), AMOUNT);
    }
}

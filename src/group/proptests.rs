//! Property-based tests for the group aggregate
//!
//! Tests for:
//! - Settings: commission + prize never exceeds 100 through any proposal sequence
//! - Atomicity: a rejected command leaves the state byte-for-byte unchanged
//! - Reads: querying never changes the answer

use super::*;
use crate::capacity::CapacityPolicy;
use proptest::prelude::*;

fn addr(id: u8) -> Address {
    Address::from_bytes(&[id; 20])
}

fn platform() -> PlatformConfig {
    PlatformConfig {
        platform_wallet: addr(250),
        capacity: CapacityPolicy::new(100),
    }
}

fn single_member_group(commission: u8, prize: u8) -> GroupState {
    let params = NewGroup {
        title: "prop".to_string(),
        chat_url: "https://t.me/prop".to_string(),
        coordinator: addr(1),
        coordinator_handle: "solo".to_string(),
        commission_percentage: commission,
        contribution_amount: 10,
        prize_percentage: prize,
    };
    GroupState::create(0, &params, &platform(), DrawBeacon::from_seed([0u8; 32]), 0)
        .unwrap()
        .0
}

#[derive(Clone, Debug)]
enum Change {
    Commission(u8),
    Prize(u8),
}

fn change_strategy() -> impl Strategy<Value = Change> {
    prop_oneof![
        (0u8..=120).prop_map(Change::Commission),
        (0u8..=120).prop_map(Change::Prize),
    ]
}

proptest! {
    /// Property: no sequence of proposals can push commission + prize past 100
    #[test]
    fn percentage_sum_never_exceeds_100(
        changes in prop::collection::vec(change_strategy(), 1..30),
    ) {
        let mut group = single_member_group(10, 80);
        let ctx = CommandContext::new(addr(1), 1);

        for change in changes {
            let (payload, category) = match change {
                Change::Commission(p) => (ProposalPayload::NewCommission { percentage: p }, ProposalCategory::NewCommission),
                Change::Prize(p) => (ProposalPayload::NewPrize { percentage: p }, ProposalCategory::NewPrize),
            };
            if group.execute(&ctx, Command::Propose(payload), &platform()).is_ok() {
                let index = group.governance().proposals_count() - 1;
                // Single voter: one approval completes and applies.
                group
                    .execute(&ctx, Command::Vote { proposal: index, category, vote: Vote::Approve }, &platform())
                    .unwrap();
            }

            let settings = group.settings();
            prop_assert!(
                u16::from(settings.commission_percentage) + u16::from(settings.prize_percentage) <= 100
            );
        }
    }

    /// Property: a failing command leaves the group unchanged
    #[test]
    fn rejected_commands_change_nothing(period in 0u64..5, value in 1u128..1_000) {
        let mut group = single_member_group(10, 80);
        let before = group.clone();
        let ctx = CommandContext::new(addr(1), 1).with_value(value);

        // No period has started, so every contribution fails.
        let result = group.execute(&ctx, Command::Contribute { period }, &platform());
        prop_assert!(result.is_err());
        prop_assert_eq!(group, before);
    }

    /// Property: reads are idempotent
    #[test]
    fn reads_are_idempotent(commission in 5u8..=50, prize in 1u8..=50) {
        let group = single_member_group(commission, prize);
        let pricing = platform().pricing();

        prop_assert_eq!(group.detail(&pricing), group.detail(&pricing));
        prop_assert_eq!(group.current_due_winners(), group.current_due_winners());
        prop_assert_eq!(group.beacon_commitment(), group.beacon_commitment());
    }
}

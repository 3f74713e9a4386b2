//! Group settings and their validation rules.
//!
//! Group creation and proposals share the same rules, so a value that could
//! not have been used to create a group can never be proposed either.

use crate::error::{ArisanError, ArisanResult};
use crate::governance::ProposalPayload;
use crate::identity::{Address, Wei};
use crate::period::PeriodTerms;
use serde::{Deserialize, Serialize};

pub const MIN_COMMISSION_PERCENTAGE: u8 = 5;
pub const MAX_COMMISSION_PERCENTAGE: u8 = 50;
pub const MIN_PRIZE_PERCENTAGE: u8 = 1;
pub const MAX_PRIZE_PERCENTAGE: u8 = 100;

/// Parameters for creating a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub title: String,
    pub chat_url: String,
    pub coordinator: Address,
    pub coordinator_handle: String,
    pub commission_percentage: u8,
    pub contribution_amount: Wei,
    pub prize_percentage: u8,
}

impl NewGroup {
    pub fn validate(&self) -> ArisanResult<()> {
        validate_title(&self.title)?;
        validate_chat_url(&self.chat_url)?;
        validate_handle(&self.coordinator_handle)?;
        if self.coordinator.is_zero() {
            return Err(ArisanError::InvalidRecipient);
        }
        validate_commission(self.commission_percentage)?;
        validate_prize(self.prize_percentage)?;
        validate_percentage_sum(self.commission_percentage, self.prize_percentage)?;
        validate_contribution(self.contribution_amount)
    }
}

/// Mutable configuration of one group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub title: String,
    pub chat_url: String,
    pub coordinator: Address,
    pub commission_percentage: u8,
    pub contribution_amount: Wei,
    pub prize_percentage: u8,
    pub max_capacity: u32,
    pub capacity_upgrade_count: u32,
    pub open_join_enabled: bool,
    pub created_at: u64,
}

impl GroupSettings {
    pub fn from_new_group(params: &NewGroup, initial_capacity: u32, now: u64) -> ArisanResult<Self> {
        params.validate()?;
        Ok(Self {
            title: params.title.trim().to_string(),
            chat_url: params.chat_url.trim().to_string(),
            coordinator: params.coordinator,
            commission_percentage: params.commission_percentage,
            contribution_amount: params.contribution_amount,
            prize_percentage: params.prize_percentage,
            max_capacity: initial_capacity,
            capacity_upgrade_count: 0,
            open_join_enabled: false,
            created_at: now,
        })
    }

    /// Terms a period started now would run under.
    pub fn period_terms(&self) -> PeriodTerms {
        PeriodTerms {
            contribution_amount: self.contribution_amount,
            commission_percentage: self.commission_percentage,
            prize_percentage: self.prize_percentage,
        }
    }

    pub fn set_commission(&mut self, percentage: u8) -> ArisanResult<()> {
        validate_commission(percentage)?;
        validate_percentage_sum(percentage, self.prize_percentage)?;
        self.commission_percentage = percentage;
        Ok(())
    }

    pub fn set_prize(&mut self, percentage: u8) -> ArisanResult<()> {
        validate_prize(percentage)?;
        validate_percentage_sum(self.commission_percentage, percentage)?;
        self.prize_percentage = percentage;
        Ok(())
    }

    pub fn set_contribution(&mut self, amount: Wei) -> ArisanResult<()> {
        validate_contribution(amount)?;
        self.contribution_amount = amount;
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> ArisanResult<()> {
        validate_title(title)?;
        self.title = title.trim().to_string();
        Ok(())
    }

    pub fn set_chat_url(&mut self, url: &str) -> ArisanResult<()> {
        validate_chat_url(url)?;
        self.chat_url = url.trim().to_string();
        Ok(())
    }
}

pub fn validate_title(title: &str) -> ArisanResult<()> {
    if title.trim().is_empty() {
        return Err(ArisanError::EmptyTitle);
    }
    Ok(())
}

pub fn validate_chat_url(url: &str) -> ArisanResult<()> {
    if url.trim().is_empty() {
        return Err(ArisanError::EmptyChatUrl);
    }
    Ok(())
}

pub fn validate_handle(handle: &str) -> ArisanResult<()> {
    if handle.trim().is_empty() {
        return Err(ArisanError::EmptyHandle);
    }
    Ok(())
}

pub fn validate_commission(percentage: u8) -> ArisanResult<()> {
    if !(MIN_COMMISSION_PERCENTAGE..=MAX_COMMISSION_PERCENTAGE).contains(&percentage) {
        return Err(ArisanError::InvalidCommissionPercentage(percentage));
    }
    Ok(())
}

pub fn validate_prize(percentage: u8) -> ArisanResult<()> {
    if !(MIN_PRIZE_PERCENTAGE..=MAX_PRIZE_PERCENTAGE).contains(&percentage) {
        return Err(ArisanError::InvalidPrizePercentage(percentage));
    }
    Ok(())
}

pub fn validate_percentage_sum(commission: u8, prize: u8) -> ArisanResult<()> {
    if u16::from(commission) + u16::from(prize) > 100 {
        return Err(ArisanError::PercentageSumExceeded { commission, prize });
    }
    Ok(())
}

pub fn validate_contribution(amount: Wei) -> ArisanResult<()> {
    if amount == 0 {
        return Err(ArisanError::ContributionAmountIsZero);
    }
    Ok(())
}

/// Shape checks for a proposal payload against the current settings.
///
/// Membership rules (targets existing, self-proposals, the coordinator)
/// need the registry and are checked by the group.
pub fn validate_payload(payload: &ProposalPayload, settings: &GroupSettings) -> ArisanResult<()> {
    match payload {
        ProposalPayload::NewTitle { title } => validate_title(title),
        ProposalPayload::NewTelegramUrl { url } => validate_chat_url(url),
        ProposalPayload::NewCommission { percentage } => {
            validate_commission(*percentage)?;
            validate_percentage_sum(*percentage, settings.prize_percentage)
        }
        ProposalPayload::NewPrize { percentage } => {
            validate_prize(*percentage)?;
            validate_percentage_sum(settings.commission_percentage, *percentage)
        }
        ProposalPayload::NewContribution { amount } => validate_contribution(*amount),
        ProposalPayload::NewMember { address, handle } => {
            validate_handle(handle)?;
            non_zero(address)
        }
        ProposalPayload::NewCoordinator { coordinator } => non_zero(coordinator),
        ProposalPayload::KickMember { member } => non_zero(member),
        ProposalPayload::Transfer { recipient, amount } => {
            non_zero(recipient)?;
            if *amount == 0 {
                return Err(ArisanError::AmountIsZero);
            }
            Ok(())
        }
    }
}

fn non_zero(address: &Address) -> ArisanResult<()> {
    if address.is_zero() {
        return Err(ArisanError::InvalidRecipient);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> NewGroup {
        NewGroup {
            title: "Arisan RT 05".to_string(),
            chat_url: "https://t.me/arisan-rt05".to_string(),
            coordinator: Address::from_bytes(&[1u8; 20]),
            coordinator_handle: "bu-rt".to_string(),
            commission_percentage: 10,
            contribution_amount: 1_000,
            prize_percentage: 80,
        }
    }

    #[test]
    fn test_new_group_valid() {
        let settings = GroupSettings::from_new_group(&params(), 10, 42).unwrap();
        assert_eq!(settings.max_capacity, 10);
        assert_eq!(settings.created_at, 42);
        assert!(!settings.open_join_enabled);
    }

    #[test]
    fn test_new_group_rejections() {
        let cases: Vec<(fn(&mut NewGroup), ArisanError)> = vec![
            (|p| p.title = " ".into(), ArisanError::EmptyTitle),
            (|p| p.chat_url.clear(), ArisanError::EmptyChatUrl),
            (|p| p.coordinator_handle.clear(), ArisanError::EmptyHandle),
            (|p| p.commission_percentage = 4, ArisanError::InvalidCommissionPercentage(4)),
            (|p| p.commission_percentage = 51, ArisanError::InvalidCommissionPercentage(51)),
            (|p| p.prize_percentage = 0, ArisanError::InvalidPrizePercentage(0)),
            (|p| p.prize_percentage = 101, ArisanError::InvalidPrizePercentage(101)),
            (
                |p| p.prize_percentage = 95,
                ArisanError::PercentageSumExceeded {
                    commission: 10,
                    prize: 95,
                },
            ),
            (|p| p.contribution_amount = 0, ArisanError::ContributionAmountIsZero),
        ];

        for (mutate, expected) in cases {
            let mut p = params();
            mutate(&mut p);
            assert_eq!(p.validate().unwrap_err(), expected);
        }
    }

    #[test]
    fn test_setters_keep_sum_within_bounds() {
        let mut settings = GroupSettings::from_new_group(&params(), 10, 0).unwrap();
        assert_eq!(
            settings.set_commission(25).unwrap_err(),
            ArisanError::PercentageSumExceeded {
                commission: 25,
                prize: 80
            }
        );
        settings.set_prize(70).unwrap();
        settings.set_commission(25).unwrap();
        assert_eq!(settings.commission_percentage + settings.prize_percentage, 95);
    }

    #[test]
    fn test_validate_payload() {
        let settings = GroupSettings::from_new_group(&params(), 10, 0).unwrap();
        assert_eq!(
            validate_payload(&ProposalPayload::NewPrize { percentage: 91 }, &settings).unwrap_err(),
            ArisanError::PercentageSumExceeded {
                commission: 10,
                prize: 91
            }
        );
        assert_eq!(
            validate_payload(
                &ProposalPayload::Transfer {
                    recipient: Address::ZERO,
                    amount: 1
                },
                &settings
            )
            .unwrap_err(),
            ArisanError::InvalidRecipient
        );
        assert_eq!(
            validate_payload(
                &ProposalPayload::Transfer {
                    recipient: Address::from_bytes(&[2u8; 20]),
                    amount: 0
                },
                &settings
            )
            .unwrap_err(),
            ArisanError::AmountIsZero
        );
        assert!(validate_payload(&ProposalPayload::NewContribution { amount: 5 }, &settings).is_ok());
    }
}

//! Group notifications.
//!
//! Events are produced by a command and published only after the command
//! committed. A rejected or rolled-back command publishes nothing.

use crate::governance::{ProposalCategory, Vote};
use crate::identity::{Address, Wei};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GroupEvent {
    GroupCreated {
        group: u64,
        title: String,
        coordinator: Address,
        /// Hex SHA-256 of the draw seed.
        beacon_commitment: String,
    },
    MemberJoined {
        group: u64,
        member: Address,
        handle: String,
    },
    MemberLeft {
        group: u64,
        member: Address,
        kicked: bool,
    },
    JoinRequested {
        group: u64,
        member: Address,
        proposal: u64,
    },
    JoinApproved {
        group: u64,
        member: Address,
        proposal: u64,
    },
    JoinRejected {
        group: u64,
        member: Address,
        proposal: u64,
    },
    OpenJoinToggled {
        group: u64,
        enabled: bool,
    },
    PeriodStarted {
        group: u64,
        period: u64,
        participants: u32,
    },
    PeriodEnded {
        group: u64,
        period: u64,
    },
    ContributionReceived {
        group: u64,
        period: u64,
        round: u64,
        member: Address,
        amount: Wei,
    },
    WinnerDrawn {
        group: u64,
        period: u64,
        round: u64,
        winner: Address,
        prize: Wei,
    },
    ProposalCreated {
        group: u64,
        proposal: u64,
        category: ProposalCategory,
        proposer: Address,
    },
    VoteCast {
        group: u64,
        proposal: u64,
        voter: Address,
        vote: Vote,
    },
    ProposalApproved {
        group: u64,
        proposal: u64,
        category: ProposalCategory,
    },
    ProposalRejected {
        group: u64,
        proposal: u64,
        category: ProposalCategory,
    },
    ProposalCompleted {
        group: u64,
        proposal: u64,
        approved: bool,
    },
    CapacityUpgraded {
        group: u64,
        new_capacity: u32,
        cost: Wei,
    },
    TransferExecuted {
        group: u64,
        proposal: u64,
        recipient: Address,
        amount: Wei,
    },
}

impl GroupEvent {
    /// Group the event belongs to.
    pub fn group(&self) -> u64 {
        match self {
            GroupEvent::GroupCreated { group, .. }
            | GroupEvent::MemberJoined { group, .. }
            | GroupEvent::MemberLeft { group, .. }
            | GroupEvent::JoinRequested { group, .. }
            | GroupEvent::JoinApproved { group, .. }
            | GroupEvent::JoinRejected { group, .. }
            | GroupEvent::OpenJoinToggled { group, .. }
            | GroupEvent::PeriodStarted { group, .. }
            | GroupEvent::PeriodEnded { group, .. }
            | GroupEvent::ContributionReceived { group, .. }
            | GroupEvent::WinnerDrawn { group, .. }
            | GroupEvent::ProposalCreated { group, .. }
            | GroupEvent::VoteCast { group, .. }
            | GroupEvent::ProposalApproved { group, .. }
            | GroupEvent::ProposalRejected { group, .. }
            | GroupEvent::ProposalCompleted { group, .. }
            | GroupEvent::CapacityUpgraded { group, .. }
            | GroupEvent::TransferExecuted { group, .. } => *group,
        }
    }
}

/// Live event feed of one group.
///
/// Subscribers that fall behind skip the events they missed and keep going.
pub struct EventStream {
    group: u64,
    inner: BroadcastStream<GroupEvent>,
}

impl EventStream {
    pub fn new(group: u64, receiver: broadcast::Receiver<GroupEvent>) -> Self {
        Self {
            group,
            inner: BroadcastStream::new(receiver),
        }
    }

    pub fn group(&self) -> u64 {
        self.group
    }
}

impl Stream for EventStream {
    type Item = GroupEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(event)) => return Poll::Ready(Some(event)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(group = self.group, skipped, "event subscriber lagged");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_skips_lagged_events() {
        let (tx, rx) = broadcast::channel(2);
        let mut stream = EventStream::new(1, rx);
        for period in 0..4 {
            tx.send(GroupEvent::PeriodEnded { group: 1, period }).unwrap();
        }
        drop(tx);

        let received: Vec<_> = stream.by_ref().collect().await;
        assert_eq!(
            received,
            vec![
                GroupEvent::PeriodEnded { group: 1, period: 2 },
                GroupEvent::PeriodEnded { group: 1, period: 3 },
            ]
        );
        assert_eq!(stream.group(), 1);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = GroupEvent::PeriodEnded { group: 3, period: 1 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "period_ended");
        assert_eq!(json["group"], 3);
        assert_eq!(event.group(), 3);
    }
}

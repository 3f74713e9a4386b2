//! Group factory and per-group execution handles.
//!
//! The factory holds the platform configuration (initialized exactly once)
//! and every group created under it. Each group lives behind its own
//! [`GroupHandle`]:
//! - Commands on one group are serialized by a `tokio::sync::Mutex`
//! - A command runs against a copy of the state; the copy replaces the
//!   original only after the [`PaymentRail`] settled every staged transfer
//! - Events are broadcast after commit
//!
//! Groups share nothing but the read-only platform configuration.

use crate::capacity::{CapacityPolicy, CapacityTierPricing};
use crate::error::{ArisanError, ArisanResult};
use crate::events::{EventStream, GroupEvent};
use crate::group::{Command, CommandContext, GroupState, NewGroup};
use crate::identity::{Address, Wei};
use crate::period::DrawBeacon;
use crate::store::FactorySnapshot;
use crate::treasury::PaymentRail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

/// Buffered events per group before slow subscribers start lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Platform-wide configuration shared by every group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Receives platform fees and capacity upgrade payments.
    pub platform_wallet: Address,
    pub capacity: CapacityPolicy,
}

impl PlatformConfig {
    pub fn new(platform_wallet: Address, capacity_upgrade_cost: Wei) -> ArisanResult<Self> {
        Self::with_policy(platform_wallet, CapacityPolicy::new(capacity_upgrade_cost))
    }

    pub fn with_policy(platform_wallet: Address, capacity: CapacityPolicy) -> ArisanResult<Self> {
        if platform_wallet.is_zero() {
            return Err(ArisanError::InvalidRecipient);
        }
        Ok(Self {
            platform_wallet,
            capacity,
        })
    }

    pub fn pricing(&self) -> CapacityTierPricing {
        CapacityTierPricing::new(self.capacity.clone())
    }
}

/// Exclusive execution boundary for one group.
pub struct GroupHandle<R> {
    id: u64,
    state: Arc<Mutex<GroupState>>,
    platform: Arc<PlatformConfig>,
    rail: Arc<R>,
    events: broadcast::Sender<GroupEvent>,
}

impl<R> Clone for GroupHandle<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Arc::clone(&self.state),
            platform: Arc::clone(&self.platform),
            rail: Arc::clone(&self.rail),
            events: self.events.clone(),
        }
    }
}

impl<R: PaymentRail> GroupHandle<R> {
    fn new(state: GroupState, platform: Arc<PlatformConfig>, rail: Arc<R>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            id: state.id(),
            state: Arc::new(Mutex::new(state)),
            platform,
            rail,
            events,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Execute `command` as `caller` with payment `value`, timestamped now.
    pub async fn execute(
        &self,
        caller: Address,
        value: Wei,
        command: Command,
    ) -> ArisanResult<Vec<GroupEvent>> {
        let ctx = CommandContext::new(caller, unix_now()).with_value(value);
        self.execute_at(ctx, command).await
    }

    /// Execute `command` under an explicit context.
    ///
    /// Either the command applies and its transfers settle, or nothing
    /// changes and nothing is published.
    pub async fn execute_at(
        &self,
        ctx: CommandContext,
        command: Command,
    ) -> ArisanResult<Vec<GroupEvent>> {
        let name = command.name();
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();

        let applied = match next.apply(&ctx, command, &self.platform) {
            Ok(applied) => applied,
            Err(e) => {
                warn!(group = self.id, command = name, caller = %ctx.caller, error = %e, "command rejected");
                return Err(e);
            }
        };

        if !applied.transfers.is_empty() {
            if let Err(e) = self.rail.settle(&applied.transfers).await {
                warn!(group = self.id, command = name, error = %e, "settlement failed, rolling back");
                return Err(ArisanError::TransferFailed(e.to_string()));
            }
        }

        *guard = next;
        drop(guard);

        info!(
            group = self.id,
            command = name,
            caller = %ctx.caller,
            transfers = applied.transfers.len(),
            "command committed"
        );
        for event in &applied.events {
            // No subscribers is fine.
            let _ = self.events.send(event.clone());
        }
        Ok(applied.events)
    }

    /// Run `f` against the current state.
    pub async fn read<T>(&self, f: impl FnOnce(&GroupState) -> T) -> T {
        let guard = self.state.lock().await;
        f(&guard)
    }

    /// Copy of the current state.
    pub async fn state(&self) -> GroupState {
        self.state.lock().await.clone()
    }

    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GroupEvent> {
        self.events.subscribe()
    }

    /// Stream of this group's events from now on.
    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.id, self.events.subscribe())
    }
}

/// Creates groups and hands out their handles.
pub struct ArisanFactory<R> {
    platform: Option<Arc<PlatformConfig>>,
    rail: Arc<R>,
    groups: BTreeMap<u64, GroupHandle<R>>,
}

impl<R: PaymentRail> ArisanFactory<R> {
    pub fn new(rail: R) -> Self {
        Self {
            platform: None,
            rail: Arc::new(rail),
            groups: BTreeMap::new(),
        }
    }

    /// Set the platform wallet and capacity upgrade cost. Only once.
    pub fn initialize_platform_config(
        &mut self,
        platform_wallet: Address,
        capacity_upgrade_cost: Wei,
    ) -> ArisanResult<&PlatformConfig> {
        let config = PlatformConfig::new(platform_wallet, capacity_upgrade_cost)?;
        self.install_platform(config)
    }

    /// Same as `initialize_platform_config` with a full capacity policy.
    pub fn install_platform(&mut self, config: PlatformConfig) -> ArisanResult<&PlatformConfig> {
        if self.platform.is_some() {
            return Err(ArisanError::PlatformAlreadyInitialized);
        }
        info!(wallet = %config.platform_wallet, upgrade_cost = %config.capacity.upgrade_cost, "platform initialized");
        let platform = self.platform.insert(Arc::new(config));
        Ok(&**platform)
    }

    pub fn platform_config(&self) -> ArisanResult<&PlatformConfig> {
        self.platform
            .as_deref()
            .ok_or(ArisanError::PlatformNotInitialized)
    }

    /// Create a group with a fresh random draw beacon.
    pub fn create_group(&mut self, params: NewGroup, now: u64) -> ArisanResult<GroupHandle<R>> {
        self.create_group_with_beacon(params, DrawBeacon::generate(), now)
    }

    pub fn create_group_with_beacon(
        &mut self,
        params: NewGroup,
        beacon: DrawBeacon,
        now: u64,
    ) -> ArisanResult<GroupHandle<R>> {
        let platform = self
            .platform
            .clone()
            .ok_or(ArisanError::PlatformNotInitialized)?;
        let id = self.groups.len() as u64;
        let (state, event) = GroupState::create(id, &params, &platform, beacon, now)?;

        let handle = GroupHandle::new(state, platform, Arc::clone(&self.rail));
        info!(group = id, title = %params.title, coordinator = %params.coordinator, "group created");
        let _ = handle.events.send(event);
        self.groups.insert(id, handle.clone());
        Ok(handle)
    }

    pub fn group(&self, id: u64) -> ArisanResult<GroupHandle<R>> {
        self.groups
            .get(&id)
            .cloned()
            .ok_or(ArisanError::GroupDoesNotExist(id))
    }

    pub fn groups_count(&self) -> u64 {
        self.groups.len() as u64
    }

    pub fn group_ids(&self) -> Vec<u64> {
        self.groups.keys().copied().collect()
    }

    /// Copy of the platform config and every group.
    pub async fn snapshot(&self) -> FactorySnapshot {
        let mut groups = Vec::with_capacity(self.groups.len());
        for handle in self.groups.values() {
            groups.push(handle.state().await);
        }
        FactorySnapshot {
            platform: self.platform.as_deref().cloned(),
            groups,
        }
    }

    /// Rebuild a factory from a snapshot.
    ///
    /// Groups cannot exist without a platform config, so a snapshot holding
    /// groups but no platform is rejected rather than dropping the groups.
    pub fn from_snapshot(snapshot: FactorySnapshot, rail: R) -> ArisanResult<Self> {
        if snapshot.platform.is_none() && !snapshot.groups.is_empty() {
            return Err(ArisanError::PlatformNotInitialized);
        }
        let rail = Arc::new(rail);
        let platform = snapshot.platform.map(Arc::new);

        let mut handles = BTreeMap::new();
        if let Some(platform) = &platform {
            for state in snapshot.groups {
                let handle = GroupHandle::new(state, Arc::clone(platform), Arc::clone(&rail));
                handles.insert(handle.id(), handle);
            }
        }
        Ok(Self {
            platform,
            rail,
            groups: handles,
        })
    }
}

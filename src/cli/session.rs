//! One CLI invocation against the persisted snapshot.
//!
//! Each mutating command loads the snapshot, executes through a group
//! handle with a ledger-only rail, and writes the snapshot back only if the
//! command committed.

use super::config::ArisanConfig;
use arisan::events::GroupEvent;
use arisan::factory::{ArisanFactory, GroupHandle};
use arisan::group::Command;
use arisan::identity::{Address, Wei};
use arisan::store::SnapshotStore;
use arisan::treasury::LedgerOnlyRail;

/// Resolve `--as` input: a 0x address, or a label hashed into one.
pub fn parse_caller(input: &str) -> Result<Address, Box<dyn std::error::Error>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Caller must not be empty".into());
    }
    if trimmed.starts_with("0x") {
        return trimmed
            .parse()
            .map_err(|e| format!("Invalid address '{}': {}", trimmed, e).into());
    }
    Ok(Address::from_label(trimmed))
}

pub struct Session {
    store: SnapshotStore,
    factory: ArisanFactory<LedgerOnlyRail>,
}

impl Session {
    pub fn open(config: &ArisanConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = SnapshotStore::new(config.store.path.clone());
        let snapshot = store.load()?;
        tracing::debug!(path = %store.path().display(), groups = snapshot.groups.len(), "snapshot loaded");
        Ok(Self {
            store,
            factory: ArisanFactory::from_snapshot(snapshot, LedgerOnlyRail)?,
        })
    }

    pub fn factory(&self) -> &ArisanFactory<LedgerOnlyRail> {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut ArisanFactory<LedgerOnlyRail> {
        &mut self.factory
    }

    pub fn group(&self, id: u64) -> Result<GroupHandle<LedgerOnlyRail>, Box<dyn std::error::Error>> {
        Ok(self.factory.group(id)?)
    }

    /// Execute one command and persist on success.
    pub async fn run(
        &self,
        group: u64,
        caller: Address,
        value: Wei,
        command: Command,
    ) -> Result<Vec<GroupEvent>, Box<dyn std::error::Error>> {
        let events = self.group(group)?.execute(caller, value, command).await?;
        self.save().await?;
        Ok(events)
    }

    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.store.save(&self.factory.snapshot().await)?;
        Ok(())
    }
}

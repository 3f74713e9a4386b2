//! Arisan - Rotating Savings Group Engine
//!
//! A fixed set of members contribute equal amounts each round, one due
//! winner is drawn per round and receives the pool minus fees, and every
//! change to parameters, membership or funds is decided by majority vote
//! among active members.
//!
//! Key principles:
//! - One aggregate per group; commands apply completely or not at all
//! - Funds leave only through a `PaymentRail`, settled after the command
//! - Members are referenced by address; the registry owns their records
//! - Draws are reproducible from a committed seed

pub mod capacity;
pub mod error;
pub mod events;
pub mod factory;
pub mod governance;
pub mod group;
pub mod identity;
pub mod membership;
pub mod period;
pub mod serialization;
pub mod store;
pub mod treasury;

pub use error::{ArisanError, ArisanResult, ErrorCategory};
pub use events::GroupEvent;
pub use factory::{ArisanFactory, GroupHandle, PlatformConfig};
pub use group::{Command, CommandContext, GroupState, NewGroup};
pub use identity::{Address, Wei};

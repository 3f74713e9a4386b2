//! Wallet identities and amounts.
//!
//! Every participant in a group (members, the coordinator, transfer
//! recipients, the platform wallet) is a 20-byte wallet address. Amounts are
//! denominated in wei and carried as `u128`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Amount in wei.
pub type Wei = u128;

/// 10^18 wei.
pub const WEI_PER_ETHER: Wei = 1_000_000_000_000_000_000;

/// Wallet address (20 bytes).
///
/// Serialized as its `0x` hex string in every format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The null address. Never a valid member or recipient.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create from bytes (first 20 are used).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes[..20]);
        Self(addr)
    }

    /// Get bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Derive a stable address from a human label.
    ///
    /// Takes the low 20 bytes of SHA-256(label). Used for fixture and demo
    /// accounts so the CLI can say `--caller alice` instead of pasting hex.
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        Self::from_bytes(&digest[12..32])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Address parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    #[error("address must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(AddressParseError::InvalidLength(bytes.len()));
        }
        Ok(Self::from_bytes(&bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

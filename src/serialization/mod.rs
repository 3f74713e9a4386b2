//! CBOR encoding for persisted group state.
//!
//! - CBOR via `ciborium`; JSON is only used for human-facing output
//! - Encoding is deterministic for a given value
//! - New fields use `#[serde(default)]` so older snapshots keep loading

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Serialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    #[error("CBOR decoding failed: {0}")]
    Decode(String),
}

/// Serialize to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| SerializationError::Encode(format!("{:?}", e)))?;
    Ok(bytes)
}

/// Deserialize from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    ciborium::from_reader(bytes).map_err(|e| SerializationError::Decode(format!("{:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Address, WEI_PER_ETHER};
    use crate::treasury::PayoutSplit;

    #[test]
    fn test_wei_amounts_survive_cbor() {
        let split = PayoutSplit::compute(400 * WEI_PER_ETHER, 10, 80);
        let bytes = to_cbor(&split).unwrap();
        let recovered: PayoutSplit = from_cbor(&bytes).unwrap();
        assert_eq!(recovered, split);
    }

    #[test]
    fn test_address_encoding_is_deterministic() {
        let addr = Address::from_label("alice");
        assert_eq!(to_cbor(&addr).unwrap(), to_cbor(&addr).unwrap());
        assert_eq!(from_cbor::<Address>(&to_cbor(&addr).unwrap()).unwrap(), addr);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = from_cbor::<PayoutSplit>(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, SerializationError::Decode(_)));
    }

    #[test]
    fn test_older_records_load_with_defaults() {
        #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
        struct V1 {
            balance: u128,
        }

        #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
        struct V2 {
            balance: u128,
            #[serde(default)]
            platform_revenue: u128,
        }

        let bytes = to_cbor(&V1 { balance: 7 }).unwrap();
        let v2: V2 = from_cbor(&bytes).unwrap();
        assert_eq!(v2.balance, 7);
        assert_eq!(v2.platform_revenue, 0);
    }
}

//! Strongly-typed identifiers used across the engine.
//!
//! Identifiers come from uploaded tabular data, so they are opaque strings.
//! Ordering is lexicographic and is what the optimizer uses for tie-breaking.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;

/// Identifier of an inventory item (SKU).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

/// Identifier of a store (demand node).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(String);

/// Identifier of a warehouse (supply node).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(String);

macro_rules! impl_string_id {
    ($t:ty, $field:literal) => {
        impl $t {
            /// Create an identifier, rejecting blank values.
            pub fn new(value: impl Into<String>) -> Result<Self, InvalidInput> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(InvalidInput::Missing { field: $field });
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = InvalidInput;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_string_id!(ItemId, "item_id");
impl_string_id!(StoreId, "store_id");
impl_string_id!(WarehouseId, "warehouse_id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_trimmed_and_ordered() {
        let a = WarehouseId::new(" WH001 ").unwrap();
        let b: WarehouseId = "WH002".parse().unwrap();
        assert_eq!(a.as_str(), "WH001");
        assert!(a < b);
    }

    #[test]
    fn blank_id_is_missing() {
        let err = StoreId::new("   ").unwrap_err();
        assert_eq!(err, InvalidInput::Missing { field: "store_id" });
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ItemId::new("ITM001").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ITM001\"");
    }
}

//! Opaque entity identifiers.
//!
//! Every core entity is keyed by an opaque UUID. Each gets its own newtype
//! instead of passing bare `Uuid` around, so a `SaleId` can never be handed
//! to a function expecting a `ProductId` by accident.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[inline]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            #[inline]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::from_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(ProductId);
opaque_id!(LocationId);
opaque_id!(BatchId);
opaque_id!(MoveId);
opaque_id!(PatientId);
opaque_id!(EncounterId);
opaque_id!(TreatmentId);
opaque_id!(EncounterTreatmentId);
opaque_id!(SaleId);
opaque_id!(SaleLineId);
opaque_id!(ChargeProposalId);
opaque_id!(ChargeProposalLineId);
opaque_id!(LegalEntityId);
opaque_id!(ActorId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_roundtrip() {
        let id = SaleId::new();
        let s = id.to_string();
        let parsed: SaleId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_types_do_not_compare() {
        let sale = SaleId::new();
        let product = ProductId::from_uuid(sale.as_uuid());
        // Same underlying UUID, different type -- this just demonstrates
        // the newtypes don't implicitly coerce; there's no `==` across types.
        assert_eq!(sale.as_uuid(), product.as_uuid());
    }
}

//! Clinical domain types feeding the billing handoff.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, EncounterId, EncounterTreatmentId, PatientId, TreatmentId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consents {
    pub privacy_accepted: bool,
    pub privacy_accepted_at: Option<DateTime<Utc>>,
    pub terms_accepted: bool,
    pub terms_accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub row_version: i64,
    pub consents: Consents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterStatus {
    Draft,
    Finalized,
    Cancelled,
}

impl EncounterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncounterStatus::Draft => "draft",
            EncounterStatus::Finalized => "finalized",
            EncounterStatus::Cancelled => "cancelled",
        }
    }

    /// Once finalized or cancelled an encounter never moves again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EncounterStatus::Finalized | EncounterStatus::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct Encounter {
    pub id: EncounterId,
    pub patient: PatientId,
    pub practitioner: ActorId,
    pub status: EncounterStatus,
    pub occurred_at: DateTime<Utc>,
    pub clinical_notes: Option<String>,
}

/// A priced item added to an encounter. `effective_price` is the value
/// actually billed: the override when present, else the treatment's
/// catalog price at the time it was read.
#[derive(Debug, Clone)]
pub struct EncounterTreatment {
    pub id: EncounterTreatmentId,
    pub encounter: EncounterId,
    pub treatment: TreatmentId,
    pub treatment_name: String,
    pub quantity: i64,
    pub unit_price_override: Option<Decimal>,
    pub default_price: Option<Decimal>,
    pub notes: Option<String>,
}

impl EncounterTreatment {
    pub fn effective_price(&self) -> Option<Decimal> {
        self.unit_price_override.or(self.default_price)
    }

    pub fn total(&self) -> Option<Decimal> {
        self.effective_price().map(|p| Decimal::from(self.quantity) * p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn treatment(override_price: Option<Decimal>, default_price: Option<Decimal>) -> EncounterTreatment {
        EncounterTreatment {
            id: EncounterTreatmentId::new(),
            encounter: EncounterId::new(),
            treatment: TreatmentId::new(),
            treatment_name: "Cleaning".to_string(),
            quantity: 2,
            unit_price_override: override_price,
            default_price,
            notes: None,
        }
    }

    #[test]
    fn override_wins_over_default_price() {
        let t = treatment(Some(Decimal::new(30000, 2)), Some(Decimal::new(25000, 2)));
        assert_eq!(t.effective_price(), Some(Decimal::new(30000, 2)));
        assert_eq!(t.total(), Some(Decimal::new(60000, 2)));
    }

    #[test]
    fn falls_back_to_default_when_no_override() {
        let t = treatment(None, Some(Decimal::new(25000, 2)));
        assert_eq!(t.effective_price(), Some(Decimal::new(25000, 2)));
    }

    #[test]
    fn no_price_at_all_yields_none() {
        let t = treatment(None, None);
        assert_eq!(t.effective_price(), None);
        assert_eq!(t.total(), None);
    }

    #[test]
    fn finalized_and_cancelled_are_terminal() {
        assert!(EncounterStatus::Finalized.is_terminal());
        assert!(EncounterStatus::Cancelled.is_terminal());
        assert!(!EncounterStatus::Draft.is_terminal());
    }
}

//! Charge proposal types: the reviewable document between a finalized
//! encounter and a billable sale.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, ChargeProposalId, ChargeProposalLineId, EncounterId, EncounterTreatmentId, PatientId, SaleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Draft,
    Converted,
    Cancelled,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Converted => "converted",
            ProposalStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChargeProposal {
    pub id: ChargeProposalId,
    pub encounter: EncounterId,
    pub patient: PatientId,
    pub practitioner: ActorId,
    pub status: ProposalStatus,
    pub converted_to_sale: Option<SaleId>,
    pub converted_at: Option<DateTime<Utc>>,
    pub total_amount: Decimal,
    pub currency: String,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChargeProposalLine {
    pub id: ChargeProposalLineId,
    pub proposal: ChargeProposalId,
    pub encounter_treatment: EncounterTreatmentId,
    pub treatment_name_snapshot: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl ChargeProposalLine {
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

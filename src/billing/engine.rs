//! Charge Proposal Engine.
//!
//! Bridges a finalized clinical encounter into the sales domain. Both
//! operations are explicit, two-step, and idempotent: generating a second
//! proposal for the same encounter fails loudly rather than silently
//! returning the first one, and converting an already-converted proposal
//! fails rather than minting a second sale.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use crate::billing::db::BillingDb;
use crate::billing::types::{ChargeProposal, ChargeProposalLine, ProposalStatus};
use crate::clinical::db::ClinicalDb;
use crate::clinical::types::EncounterStatus;
use crate::error::CoreError;
use crate::ids::{ActorId, ChargeProposalId, ChargeProposalLineId, EncounterId, LegalEntityId, SaleLineId};
use crate::sales::db::SaleDb;
use crate::sales::types::{Sale, SaleLine, SaleStatus};

pub struct ChargeProposalEngine;

impl ChargeProposalEngine {
    /// Snapshot pricing from a finalized encounter into a new draft
    /// proposal. One proposal per encounter, enforced both here (a
    /// pre-check) and by a unique index at the store layer (the
    /// authoritative guard under concurrent callers).
    pub async fn generate_proposal(
        tx: &mut Transaction<'_, Postgres>,
        encounter: EncounterId,
        actor: ActorId,
        currency: &str,
        notes: Option<String>,
    ) -> Result<ChargeProposal, CoreError> {
        let encounter_row = ClinicalDb::find_encounter(tx, encounter).await?;
        if encounter_row.status != EncounterStatus::Finalized {
            return Err(CoreError::InvalidOperation(format!(
                "encounter {encounter} is not finalized"
            )));
        }

        if BillingDb::find_by_encounter(tx, encounter).await?.is_some() {
            return Err(CoreError::IdempotencyViolation(format!(
                "a charge proposal already exists for encounter {encounter}"
            )));
        }

        let treatments = ClinicalDb::find_treatments(tx, encounter).await?;
        if treatments.is_empty() {
            return Err(CoreError::InvalidOperation(format!(
                "encounter {encounter} has no billable treatments"
            )));
        }

        let proposal_id = ChargeProposalId::new();
        let mut total = rust_decimal::Decimal::ZERO;
        let mut lines = Vec::new();

        for et in &treatments {
            let Some(effective_price) = et.effective_price() else {
                tracing::warn!(
                    encounter_treatment = %et.id,
                    "skipping treatment with no effective price in proposal generation"
                );
                continue;
            };

            let description = match &et.notes {
                Some(n) if !n.is_empty() => format!("{} - {}", et.treatment_name, n),
                _ => et.treatment_name.clone(),
            };

            let line = ChargeProposalLine {
                id: ChargeProposalLineId::new(),
                proposal: proposal_id,
                encounter_treatment: et.id,
                treatment_name_snapshot: et.treatment_name.clone(),
                description,
                quantity: et.quantity,
                unit_price: effective_price,
            };
            total += line.line_total();
            lines.push(line);
        }

        let proposal = ChargeProposal {
            id: proposal_id,
            encounter,
            patient: encounter_row.patient,
            practitioner: encounter_row.practitioner,
            status: ProposalStatus::Draft,
            converted_to_sale: None,
            converted_at: None,
            total_amount: total,
            currency: currency.to_string(),
            cancellation_reason: None,
            notes,
        };

        BillingDb::insert(tx, &proposal).await?;
        for line in &lines {
            BillingDb::insert_line(tx, line).await?;
        }

        let _ = actor; // recorded by the caller's audit layer, not the engine itself

        Ok(proposal)
    }

    /// Convert a draft proposal into a draft sale, one SaleLine per
    /// proposal line, every line's product left null (clinical services
    /// never trigger FEFO). The returned sale still needs to be
    /// transitioned forward through the Sale State Machine.
    pub async fn convert_to_sale(
        tx: &mut Transaction<'_, Postgres>,
        proposal: ChargeProposalId,
        legal_entity: LegalEntityId,
        actor: ActorId,
        sale_number_format: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Sale, CoreError> {
        let proposal_row = BillingDb::find(tx, proposal).await?;

        if proposal_row.status != ProposalStatus::Draft {
            return Err(CoreError::InvalidOperation(format!(
                "proposal {proposal} is not in draft status"
            )));
        }
        if proposal_row.converted_to_sale.is_some() {
            return Err(CoreError::AlreadyConverted(proposal.to_string()));
        }

        let lines = BillingDb::find_lines(tx, proposal).await?;
        if lines.is_empty() {
            return Err(CoreError::InvalidOperation(format!(
                "proposal {proposal} has no lines to convert"
            )));
        }

        let year: i32 = now.date_naive().format("%Y").to_string().parse().unwrap_or(0);
        let sale_number = SaleDb::next_sale_number(tx, sale_number_format, year).await?;

        let sale = Sale {
            id: crate::ids::SaleId::new(),
            patient: proposal_row.patient,
            legal_entity,
            status: SaleStatus::Draft,
            sale_number,
            paid_at: None,
            refund_reason: None,
            row_version: 0,
            created_by: actor,
            notes,
        };
        SaleDb::insert(tx, &sale).await?;

        for cpl in &lines {
            let sale_line = SaleLine {
                id: SaleLineId::new(),
                sale: sale.id,
                product: None,
                product_name: cpl.treatment_name_snapshot.clone(),
                quantity: cpl.quantity,
                unit_price: cpl.unit_price,
            };
            SaleDb::insert_line(tx, &sale_line).await?;
        }

        BillingDb::mark_converted(tx, proposal, sale.id, now).await?;

        Ok(sale)
    }
}

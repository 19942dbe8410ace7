//! Charge proposal persistence.

use rust_decimal::Decimal;
use sqlx::{Postgres, Row, Transaction};

use crate::billing::types::{ChargeProposal, ChargeProposalLine, ProposalStatus};
use crate::error::CoreError;
use crate::ids::{ActorId, ChargeProposalId, ChargeProposalLineId, EncounterId, EncounterTreatmentId, PatientId, SaleId};

pub struct BillingDb;

impl BillingDb {
    pub async fn find_by_encounter(
        tx: &mut Transaction<'_, Postgres>,
        encounter: EncounterId,
    ) -> Result<Option<ChargeProposal>, CoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, encounter_id, patient_id, practitioner_id, status, converted_to_sale,
                   converted_at, total_amount, currency, cancellation_reason, notes
            FROM charge_proposals WHERE encounter_id = $1
            "#,
        )
        .bind(encounter.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;

        row.map(|r| row_to_proposal(&r)).transpose()
    }

    pub async fn find(
        tx: &mut Transaction<'_, Postgres>,
        id: ChargeProposalId,
    ) -> Result<ChargeProposal, CoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, encounter_id, patient_id, practitioner_id, status, converted_to_sale,
                   converted_at, total_amount, currency, cancellation_reason, notes
            FROM charge_proposals WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("charge proposal {id}")))?;

        row_to_proposal(&row)
    }

    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        proposal: &ChargeProposal,
    ) -> Result<(), CoreError> {
        // Relies on a unique index over encounter_id at the store layer
        // (at most one proposal per encounter) to turn a racing duplicate
        // insert into a constraint violation rather than silent data loss.
        sqlx::query(
            r#"
            INSERT INTO charge_proposals
                (id, encounter_id, patient_id, practitioner_id, status, converted_to_sale,
                 converted_at, total_amount, currency, cancellation_reason, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(proposal.id.as_uuid())
        .bind(proposal.encounter.as_uuid())
        .bind(proposal.patient.as_uuid())
        .bind(proposal.practitioner.as_uuid())
        .bind(proposal.status.as_str())
        .bind(proposal.converted_to_sale.map(|s| s.as_uuid()))
        .bind(proposal.converted_at)
        .bind(proposal.total_amount)
        .bind(&proposal.currency)
        .bind(&proposal.cancellation_reason)
        .bind(&proposal.notes)
        .execute(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                CoreError::IdempotencyViolation(format!(
                    "a charge proposal already exists for encounter {}",
                    proposal.encounter
                ))
            }
            other => CoreError::from(other),
        })?;
        Ok(())
    }

    pub async fn insert_line(
        tx: &mut Transaction<'_, Postgres>,
        line: &ChargeProposalLine,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO charge_proposal_lines
                (id, proposal_id, encounter_treatment_id, treatment_name_snapshot, description, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.proposal.as_uuid())
        .bind(line.encounter_treatment.as_uuid())
        .bind(&line.treatment_name_snapshot)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn find_lines(
        tx: &mut Transaction<'_, Postgres>,
        proposal: ChargeProposalId,
    ) -> Result<Vec<ChargeProposalLine>, CoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, proposal_id, encounter_treatment_id, treatment_name_snapshot, description,
                   quantity, unit_price
            FROM charge_proposal_lines WHERE proposal_id = $1 ORDER BY line_no ASC
            "#,
        )
        .bind(proposal.as_uuid())
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ChargeProposalLine {
                id: ChargeProposalLineId::from_uuid(r.get("id")),
                proposal,
                encounter_treatment: EncounterTreatmentId::from_uuid(r.get("encounter_treatment_id")),
                treatment_name_snapshot: r.get("treatment_name_snapshot"),
                description: r.get("description"),
                quantity: r.get("quantity"),
                unit_price: r.get::<Decimal, _>("unit_price"),
            })
            .collect())
    }

    pub async fn mark_converted(
        tx: &mut Transaction<'_, Postgres>,
        proposal: ChargeProposalId,
        sale: SaleId,
        converted_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            UPDATE charge_proposals
            SET status = 'converted', converted_to_sale = $2, converted_at = $3
            WHERE id = $1
            "#,
        )
        .bind(proposal.as_uuid())
        .bind(sale.as_uuid())
        .bind(converted_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn row_to_proposal(row: &sqlx::postgres::PgRow) -> Result<ChargeProposal, CoreError> {
    let status_str: String = row.get("status");
    let status = match status_str.as_str() {
        "draft" => ProposalStatus::Draft,
        "converted" => ProposalStatus::Converted,
        "cancelled" => ProposalStatus::Cancelled,
        other => {
            return Err(CoreError::ConfigurationError(format!(
                "invalid proposal status in storage: {other}"
            )));
        }
    };

    Ok(ChargeProposal {
        id: ChargeProposalId::from_uuid(row.get("id")),
        encounter: EncounterId::from_uuid(row.get("encounter_id")),
        patient: PatientId::from_uuid(row.get("patient_id")),
        practitioner: ActorId::from_uuid(row.get("practitioner_id")),
        status,
        converted_to_sale: row
            .get::<Option<uuid::Uuid>, _>("converted_to_sale")
            .map(SaleId::from_uuid),
        converted_at: row.get("converted_at"),
        total_amount: row.get::<Decimal, _>("total_amount"),
        currency: row.get("currency"),
        cancellation_reason: row.get("cancellation_reason"),
        notes: row.get("notes"),
    })
}

//! Encounter/treatment persistence used by the billing handoff.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Row, Transaction};

use crate::clinical::types::{Encounter, EncounterStatus, EncounterTreatment};
use crate::error::CoreError;
use crate::ids::{ActorId, EncounterId, EncounterTreatmentId, PatientId, TreatmentId};

pub struct ClinicalDb;

impl ClinicalDb {
    pub async fn find_encounter(
        tx: &mut Transaction<'_, Postgres>,
        id: EncounterId,
    ) -> Result<Encounter, CoreError> {
        let row = sqlx::query(
            "SELECT id, patient_id, practitioner_id, status, occurred_at, clinical_notes
             FROM encounters WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("encounter {id}")))?;

        let status_str: String = row.get("status");
        let status = match status_str.as_str() {
            "draft" => EncounterStatus::Draft,
            "finalized" => EncounterStatus::Finalized,
            "cancelled" => EncounterStatus::Cancelled,
            other => {
                return Err(CoreError::ConfigurationError(format!(
                    "invalid encounter status in storage: {other}"
                )));
            }
        };

        Ok(Encounter {
            id,
            patient: PatientId::from_uuid(row.get("patient_id")),
            practitioner: ActorId::from_uuid(row.get("practitioner_id")),
            status,
            occurred_at: row.get::<DateTime<Utc>, _>("occurred_at"),
            clinical_notes: row.get("clinical_notes"),
        })
    }

    pub async fn find_treatments(
        tx: &mut Transaction<'_, Postgres>,
        encounter: EncounterId,
    ) -> Result<Vec<EncounterTreatment>, CoreError> {
        let rows = sqlx::query(
            r#"
            SELECT et.id, et.encounter_id, et.treatment_id, t.name AS treatment_name,
                   et.quantity, et.unit_price_override, t.default_price, et.notes
            FROM encounter_treatments et
            JOIN treatments t ON t.id = et.treatment_id
            WHERE et.encounter_id = $1
            ORDER BY et.line_no ASC
            "#,
        )
        .bind(encounter.as_uuid())
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| EncounterTreatment {
                id: EncounterTreatmentId::from_uuid(r.get("id")),
                encounter,
                treatment: TreatmentId::from_uuid(r.get("treatment_id")),
                treatment_name: r.get("treatment_name"),
                quantity: r.get("quantity"),
                unit_price_override: r.get::<Option<Decimal>, _>("unit_price_override"),
                default_price: r.get::<Option<Decimal>, _>("default_price"),
                notes: r.get("notes"),
            })
            .collect())
    }
}

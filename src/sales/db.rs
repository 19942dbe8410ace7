//! Sale persistence: row_version optimistic concurrency via conditional UPDATE.

use rust_decimal::Decimal;
use sqlx::{Postgres, Row, Transaction};

use crate::error::CoreError;
use crate::ids::{ActorId, LegalEntityId, PatientId, ProductId, SaleId, SaleLineId};
use crate::sales::types::{Sale, SaleLine, SaleStatus};

pub struct SaleDb;

impl SaleDb {
    pub async fn insert(tx: &mut Transaction<'_, Postgres>, sale: &Sale) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO sales
                (id, patient_id, legal_entity_id, status, sale_number, paid_at,
                 refund_reason, row_version, created_by, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(sale.id.as_uuid())
        .bind(sale.patient.as_uuid())
        .bind(sale.legal_entity.as_uuid())
        .bind(sale.status.id())
        .bind(&sale.sale_number)
        .bind(sale.paid_at)
        .bind(&sale.refund_reason)
        .bind(sale.row_version)
        .bind(sale.created_by.as_uuid())
        .bind(&sale.notes)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn insert_line(
        tx: &mut Transaction<'_, Postgres>,
        line: &SaleLine,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (id, sale_id, product_id, product_name, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.sale.as_uuid())
        .bind(line.product.map(|p| p.as_uuid()))
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn find(
        tx: &mut Transaction<'_, Postgres>,
        id: SaleId,
    ) -> Result<Sale, CoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, patient_id, legal_entity_id, status, sale_number, paid_at,
                   refund_reason, row_version, created_by, notes
            FROM sales WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("sale {id}")))?;

        row_to_sale(&row)
    }

    pub async fn find_lines(
        tx: &mut Transaction<'_, Postgres>,
        sale: SaleId,
    ) -> Result<Vec<SaleLine>, CoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sale_id, product_id, product_name, quantity, unit_price
            FROM sale_lines WHERE sale_id = $1 ORDER BY line_no ASC
            "#,
        )
        .bind(sale.as_uuid())
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| SaleLine {
                id: SaleLineId::from_uuid(r.get("id")),
                sale: SaleId::from_uuid(r.get("sale_id")),
                product: r
                    .get::<Option<uuid::Uuid>, _>("product_id")
                    .map(ProductId::from_uuid),
                product_name: r.get("product_name"),
                quantity: r.get("quantity"),
                unit_price: r.get::<Decimal, _>("unit_price"),
            })
            .collect())
    }

    /// Conditional UPDATE: succeeds only if `expected_row_version` still
    /// matches. Returns ConcurrencyConflict on mismatch.
    pub async fn update_status_cas(
        tx: &mut Transaction<'_, Postgres>,
        sale: SaleId,
        expected_row_version: i64,
        new_status: SaleStatus,
        paid_at: Option<chrono::DateTime<chrono::Utc>>,
        refund_reason: Option<&str>,
    ) -> Result<i64, CoreError> {
        let new_row_version = expected_row_version + 1;
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = $1, paid_at = COALESCE($2, paid_at), refund_reason = COALESCE($3, refund_reason),
                row_version = $4
            WHERE id = $5 AND row_version = $6
            "#,
        )
        .bind(new_status.id())
        .bind(paid_at)
        .bind(refund_reason)
        .bind(new_row_version)
        .bind(sale.as_uuid())
        .bind(expected_row_version)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let current = sqlx::query("SELECT row_version FROM sales WHERE id = $1")
                .bind(sale.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;
            let found = current
                .map(|r| r.get::<i64, _>("row_version"))
                .unwrap_or(-1);
            return Err(CoreError::ConcurrencyConflict {
                entity: "Sale".to_string(),
                id: sale.to_string(),
                expected: expected_row_version,
                found,
            });
        }

        Ok(new_row_version)
    }

    pub async fn next_sale_number(
        tx: &mut Transaction<'_, Postgres>,
        format: &str,
        year: i32,
    ) -> Result<String, CoreError> {
        let seq: i64 = sqlx::query("SELECT nextval('sale_number_seq')")
            .fetch_one(&mut **tx)
            .await?
            .get(0);

        Ok(format
            .replace("{year}", &year.to_string())
            .replace("{seq:06}", &format!("{seq:06}"))
            .replace("{seq}", &seq.to_string()))
    }
}

fn row_to_sale(row: &sqlx::postgres::PgRow) -> Result<Sale, CoreError> {
    let status_id: i16 = row.get("status");
    let status = SaleStatus::from_id(status_id)
        .ok_or_else(|| CoreError::ConfigurationError(format!("invalid sale status id {status_id}")))?;

    Ok(Sale {
        id: SaleId::from_uuid(row.get("id")),
        patient: PatientId::from_uuid(row.get("patient_id")),
        legal_entity: LegalEntityId::from_uuid(row.get("legal_entity_id")),
        status,
        sale_number: row.get("sale_number"),
        paid_at: row.get("paid_at"),
        refund_reason: row.get("refund_reason"),
        row_version: row.get("row_version"),
        created_by: ActorId::from_uuid(row.get("created_by")),
        notes: row.get("notes"),
    })
}

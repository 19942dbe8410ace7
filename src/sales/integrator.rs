//! Stock-sale integrator.
//!
//! Bridges the sale state machine to the FEFO allocator and inventory
//! ledger. Both operations are idempotent and run inside the caller's
//! transaction; neither consults row_version, that belongs to the state
//! machine.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Row, Transaction};

use crate::error::CoreError;
use crate::ids::{ActorId, LocationId, SaleId};
use crate::inventory::allocator;
use crate::inventory::ledger::InventoryLedger;
use crate::inventory::types::{MoveSpec, MoveType, StockMove};
use crate::sales::db::SaleDb;
use crate::sales::types::{Sale, SaleLine, SaleStatus};

pub struct StockSaleIntegrator;

impl StockSaleIntegrator {
    /// Consume stock for every product line on `sale`, FEFO-ordered within
    /// each line, moves created in SaleLine insertion order. Idempotent:
    /// a second call against an already-consumed sale returns the existing
    /// moves without writing anything new.
    pub async fn consume_stock_for_sale(
        tx: &mut Transaction<'_, Postgres>,
        sale: &Sale,
        location: Option<LocationId>,
        default_location_code: &str,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Vec<StockMove>, CoreError> {
        let existing = find_moves_by_sale_ref(tx, sale.id, MoveType::SaleOut).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let location = match location {
            Some(l) => l,
            None => resolve_default_location(tx, default_location_code).await?,
        };

        let lines = SaleDb::find_lines(tx, sale.id).await?;
        let product_lines: Vec<&SaleLine> = lines.iter().filter(|l| !l.is_service()).collect();

        if product_lines.is_empty() {
            return Ok(Vec::new());
        }

        // Acquire the StockOnHand row locks for every distinct product up
        // front, sorted by product id ascending -- not in SaleLine order --
        // so two concurrent paid-transitions over an overlapping product
        // set always request their locks in the same order and cannot
        // deadlock against each other.
        let mut distinct_products: Vec<_> = product_lines
            .iter()
            .map(|l| l.product.expect("filtered to product lines above"))
            .collect();
        distinct_products.sort_by_key(|p| p.as_uuid());
        distinct_products.dedup();
        for product in distinct_products {
            InventoryLedger::lock_on_hand_rows(tx, product, location).await?;
        }

        let today = now.date_naive();
        let mut created = Vec::new();

        for line in product_lines {
            let product = line.product.expect("filtered to product lines above");

            // Locks were already taken above; this re-read picks up any
            // on-hand changes made by an earlier line in this same call
            // (e.g. two lines for the same product) while still holding
            // the same row locks.
            let rows = InventoryLedger::lock_on_hand_rows(tx, product, location).await?;
            let draws = allocator::plan(product, &rows, line.quantity, today, false)?;

            for draw in draws {
                let reason = format!("Sale {} - {}", sale.sale_number, line.product_name);
                let move_spec = MoveSpec {
                    product,
                    location,
                    batch: draw.batch,
                    move_type: MoveType::SaleOut,
                    quantity: -draw.draw_qty,
                    reason,
                    reference_type: "Sale".to_string(),
                    reference_id: sale.id.to_string(),
                    sale_ref: Some(sale.id),
                    sale_line_ref: Some(line.id),
                    reversed_move_ref: None,
                    created_by: actor,
                    is_reversal: false,
                    allow_expired: false,
                };
                created.push(InventoryLedger::append_move(tx, move_spec, now).await?);
            }
        }

        Ok(created)
    }

    /// Reverse every SALE_OUT move for `sale` with a REFUND_IN move
    /// pairing 1:1 via `reversed_move_ref`. Restores to the exact
    /// originating batch, independent of the allocator. Idempotent.
    pub async fn refund_stock_for_sale(
        tx: &mut Transaction<'_, Postgres>,
        sale: &Sale,
        allow_expired_on_refund: bool,
        actor: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Vec<StockMove>, CoreError> {
        if sale.status != SaleStatus::Paid {
            return Err(CoreError::InvalidOperation(format!(
                "cannot refund sale {} in status {}",
                sale.id, sale.status
            )));
        }

        let sale_out_moves = find_moves_by_sale_ref(tx, sale.id, MoveType::SaleOut).await?;
        if sale_out_moves.is_empty() {
            return Ok(Vec::new());
        }

        let existing_reversals = find_reversals_for(tx, &sale_out_moves).await?;
        if !existing_reversals.is_empty() {
            return Ok(existing_reversals);
        }

        // Same deterministic-order locking discipline as consume: acquire
        // every (product, location) row-lock up front, sorted by product id
        // ascending, before writing any reversal. The reversal moves below
        // are still written in original SALE_OUT order, independent of this
        // lock-acquisition order.
        let mut distinct: Vec<_> = sale_out_moves.iter().map(|m| (m.product, m.location)).collect();
        distinct.sort_by_key(|(p, _)| p.as_uuid());
        distinct.dedup();
        for (product, location) in distinct {
            InventoryLedger::lock_on_hand_rows(tx, product, location).await?;
        }

        let mut created = Vec::new();
        for m in &sale_out_moves {
            let product_name = fetch_product_name(tx, m.product).await?;
            let reason = format!("Refund of sale {} - {}", sale.sale_number, product_name);
            let move_spec = MoveSpec {
                product: m.product,
                location: m.location,
                batch: m.batch,
                move_type: MoveType::RefundIn,
                quantity: -m.quantity,
                reason,
                reference_type: "SaleRefund".to_string(),
                reference_id: sale.id.to_string(),
                sale_ref: Some(sale.id),
                sale_line_ref: m.sale_line_ref,
                reversed_move_ref: Some(m.id),
                created_by: actor,
                is_reversal: true,
                allow_expired: allow_expired_on_refund,
            };
            created.push(InventoryLedger::append_move(tx, move_spec, now).await?);
        }

        Ok(created)
    }
}

async fn resolve_default_location(
    tx: &mut Transaction<'_, Postgres>,
    code: &str,
) -> Result<LocationId, CoreError> {
    let row = sqlx::query("SELECT id FROM stock_locations WHERE code = $1 AND active = true")
        .bind(code)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| {
            CoreError::ConfigurationError(format!(
                "default stock location '{code}' is missing or inactive"
            ))
        })?;
    Ok(LocationId::from_uuid(row.get("id")))
}

/// Resolve a product's display name for the refund reason string, mirroring
/// the consume path's use of the sale line's `product_name` snapshot. The
/// refund move has no line snapshot of its own (it mirrors a StockMove, not
/// a SaleLine), so the current catalog name is read instead.
async fn fetch_product_name(
    tx: &mut Transaction<'_, Postgres>,
    product: crate::ids::ProductId,
) -> Result<String, CoreError> {
    let row = sqlx::query("SELECT name FROM products WHERE id = $1")
        .bind(product.as_uuid())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("product {product}")))?;
    Ok(row.get("name"))
}

async fn find_moves_by_sale_ref(
    tx: &mut Transaction<'_, Postgres>,
    sale: SaleId,
    move_type: MoveType,
) -> Result<Vec<StockMove>, CoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, product_id, location_id, batch_id, move_type, quantity, reason,
               reference_type, reference_id, sale_ref, sale_line_ref, reversed_move_ref,
               created_by, created_at
        FROM stock_moves
        WHERE sale_ref = $1 AND move_type = $2
        ORDER BY seq ASC
        "#,
    )
    .bind(sale.as_uuid())
    .bind(move_type.as_str())
    .fetch_all(&mut **tx)
    .await?;

    rows.iter().map(row_to_move).collect()
}

async fn find_reversals_for(
    tx: &mut Transaction<'_, Postgres>,
    originals: &[StockMove],
) -> Result<Vec<StockMove>, CoreError> {
    if originals.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<uuid::Uuid> = originals.iter().map(|m| m.id.as_uuid()).collect();

    let rows = sqlx::query(
        r#"
        SELECT id, product_id, location_id, batch_id, move_type, quantity, reason,
               reference_type, reference_id, sale_ref, sale_line_ref, reversed_move_ref,
               created_by, created_at
        FROM stock_moves
        WHERE reversed_move_ref = ANY($1)
        ORDER BY seq ASC
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut **tx)
    .await?;

    rows.iter().map(row_to_move).collect()
}

fn row_to_move(row: &sqlx::postgres::PgRow) -> Result<StockMove, CoreError> {
    use crate::ids::{BatchId, MoveId, ProductId, SaleLineId};

    let move_type_str: String = row.get("move_type");
    let move_type = MoveType::from_str(&move_type_str).ok_or_else(|| {
        CoreError::ConfigurationError(format!("invalid move_type in storage: {move_type_str}"))
    })?;

    Ok(StockMove {
        id: MoveId::from_uuid(row.get("id")),
        product: ProductId::from_uuid(row.get("product_id")),
        location: LocationId::from_uuid(row.get("location_id")),
        batch: BatchId::from_uuid(row.get("batch_id")),
        move_type,
        quantity: row.get("quantity"),
        reason: row.get("reason"),
        reference_type: row.get("reference_type"),
        reference_id: row.get("reference_id"),
        sale_ref: row.get::<Option<uuid::Uuid>, _>("sale_ref").map(SaleId::from_uuid),
        sale_line_ref: row
            .get::<Option<uuid::Uuid>, _>("sale_line_ref")
            .map(SaleLineId::from_uuid),
        reversed_move_ref: row
            .get::<Option<uuid::Uuid>, _>("reversed_move_ref")
            .map(MoveId::from_uuid),
        created_by: ActorId::from_uuid(row.get("created_by")),
        created_at: row.get("created_at"),
    })
}

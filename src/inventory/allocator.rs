//! FEFO allocator.
//!
//! Pure planning: given on-hand rows for a (product, location), decides
//! which batches to draw from and how much, without touching the store.
//! Actual writes happen in the integrator via the ledger.

use chrono::NaiveDate;

use crate::error::CoreError;
use crate::ids::ProductId;
use crate::inventory::types::{BatchDraw, StockOnHand};

/// Produce a draw plan covering `needed_qty` units of `product`, ordered
/// nearest-expiry-first (FEFO).
///
/// `rows` must already be scoped to the (product, location) pair and to
/// `quantity_on_hand > 0`; the allocator does not filter by location itself,
/// it only sorts and drains what it is given.
pub fn plan(
    product: ProductId,
    rows: &[StockOnHand],
    needed_qty: i64,
    today: NaiveDate,
    allow_expired: bool,
) -> Result<Vec<BatchDraw>, CoreError> {
    let mut candidates: Vec<&StockOnHand> = rows
        .iter()
        .filter(|r| allow_expired || !is_expired(r.expiry_date, today))
        .collect();

    candidates.sort_by(|a, b| {
        expiry_sort_key(a.expiry_date)
            .cmp(&expiry_sort_key(b.expiry_date))
            .then_with(|| a.batch_number.cmp(&b.batch_number))
    });

    let mut remaining = needed_qty;
    let mut draws = Vec::new();

    for row in candidates {
        if remaining <= 0 {
            break;
        }
        let draw_qty = remaining.min(row.quantity_on_hand);
        if draw_qty > 0 {
            draws.push(BatchDraw {
                batch: row.batch,
                batch_number: row.batch_number.clone(),
                draw_qty,
            });
            remaining -= draw_qty;
        }
    }

    if remaining > 0 {
        let pre_filter_nonempty = rows.iter().any(|r| r.quantity_on_hand > 0);
        let all_expired = pre_filter_nonempty
            && !allow_expired
            && rows
                .iter()
                .filter(|r| r.quantity_on_hand > 0)
                .all(|r| is_expired(r.expiry_date, today));

        if all_expired {
            return Err(CoreError::ExpiredBatchOnly {
                product: product.to_string(),
            });
        }

        let available: i64 = rows.iter().map(|r| r.quantity_on_hand).sum();
        return Err(CoreError::InsufficientStock {
            product: product.to_string(),
            requested: needed_qty,
            available,
        });
    }

    Ok(draws)
}

fn is_expired(expiry: Option<NaiveDate>, today: NaiveDate) -> bool {
    expiry.is_some_and(|d| d < today)
}

/// Sort key putting no-expiry batches last.
fn expiry_sort_key(expiry: Option<NaiveDate>) -> NaiveDate {
    expiry.unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BatchId, LocationId};

    fn row(batch_number: &str, expiry: Option<NaiveDate>, qty: i64) -> StockOnHand {
        StockOnHand {
            product: ProductId::new(),
            location: LocationId::new(),
            batch: BatchId::new(),
            batch_number: batch_number.to_string(),
            expiry_date: expiry,
            quantity_on_hand: qty,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn draws_across_two_batches_nearest_expiry_first() {
        let product = ProductId::new();
        let a = row("A", Some(date(2025, 3, 1)), 10);
        let b = row("B", Some(date(2025, 9, 1)), 50);
        let rows = vec![b.clone(), a.clone()]; // deliberately out of order

        let draws = plan(product, &rows, 15, date(2025, 1, 1), false).unwrap();

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].batch, a.batch);
        assert_eq!(draws[0].draw_qty, 10);
        assert_eq!(draws[1].batch, b.batch);
        assert_eq!(draws[1].draw_qty, 5);
    }

    #[test]
    fn exact_match_drains_single_batch_to_zero() {
        let product = ProductId::new();
        let a = row("A", Some(date(2025, 3, 1)), 10);
        let draws = plan(product, &[a.clone()], 10, date(2025, 1, 1), false).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].draw_qty, 10);
    }

    #[test]
    fn no_expiry_batches_sort_last() {
        let product = ProductId::new();
        let no_expiry = row("Z", None, 100);
        let near = row("A", Some(date(2025, 3, 1)), 5);
        let draws = plan(product, &[no_expiry.clone(), near.clone()], 10, date(2025, 1, 1), false).unwrap();
        assert_eq!(draws[0].batch, near.batch);
        assert_eq!(draws[0].draw_qty, 5);
        assert_eq!(draws[1].batch, no_expiry.batch);
        assert_eq!(draws[1].draw_qty, 5);
    }

    #[test]
    fn ties_break_on_batch_number_ascending() {
        let product = ProductId::new();
        let same_expiry = Some(date(2025, 3, 1));
        let b = row("B", same_expiry, 10);
        let a = row("A", same_expiry, 10);
        let draws = plan(product, &[b.clone(), a.clone()], 5, date(2025, 1, 1), false).unwrap();
        assert_eq!(draws[0].batch, a.batch);
    }

    #[test]
    fn insufficient_stock_when_total_on_hand_too_low() {
        let product = ProductId::new();
        let a = row("A", None, 8);
        let err = plan(product, &[a], 10, date(2025, 1, 1), false).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { requested: 10, available: 8, .. }));
    }

    #[test]
    fn expired_batch_only_when_all_candidates_expired() {
        let product = ProductId::new();
        let expired = row("A", Some(date(2024, 1, 1)), 10);
        let err = plan(product, &[expired], 5, date(2025, 1, 1), false).unwrap_err();
        assert!(matches!(err, CoreError::ExpiredBatchOnly { .. }));
    }

    #[test]
    fn allow_expired_true_consumes_expired_batches() {
        let product = ProductId::new();
        let expired = row("A", Some(date(2024, 1, 1)), 10);
        let draws = plan(product, &[expired.clone()], 5, date(2025, 1, 1), true).unwrap();
        assert_eq!(draws[0].batch, expired.batch);
        assert_eq!(draws[0].draw_qty, 5);
    }

    #[test]
    fn zero_rows_yields_insufficient_stock_not_expired_only() {
        let product = ProductId::new();
        let err = plan(product, &[], 5, date(2025, 1, 1), false).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 0, .. }));
    }
}

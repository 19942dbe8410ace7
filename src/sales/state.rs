//! Sale state machine.
//!
//! Enforces the transition graph, drives the integrator on paid/refunded,
//! and checks row_version on every write. The machine composes the
//! allocator, ledger, and integrator explicitly; nothing here reacts to
//! an implicit save-hook.

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::ids::{ActorId, LocationId};
use crate::sales::db::SaleDb;
use crate::sales::integrator::StockSaleIntegrator;
use crate::sales::types::{Sale, SaleStatus};

use sqlx::{Postgres, Transaction};

pub struct SaleStateMachine;

impl SaleStateMachine {
    /// Transition `sale` to `target`, checking `expected_row_version`
    /// against storage first. On `-> paid` consumes stock via the
    /// integrator; on `-> refunded` reverses it. A failure inside the
    /// integrator propagates and the caller's transaction rolls back,
    /// leaving the sale's prior status and row_version untouched.
    #[allow(clippy::too_many_arguments)]
    pub async fn transition_to(
        tx: &mut Transaction<'_, Postgres>,
        sale: &Sale,
        expected_row_version: i64,
        target: SaleStatus,
        reason: Option<&str>,
        actor: ActorId,
        location: Option<LocationId>,
        default_location_code: &str,
        allow_expired_on_refund: bool,
        now: DateTime<Utc>,
    ) -> Result<Sale, CoreError> {
        if !sale.status.can_transition_to(target) {
            return Err(CoreError::InvalidTransition {
                from: sale.status.to_string(),
                to: target.to_string(),
            });
        }

        let (paid_at, refund_reason) = match target {
            SaleStatus::Paid => (Some(now), None),
            SaleStatus::Refunded => (None, reason),
            _ => (None, None),
        };

        let new_row_version = SaleDb::update_status_cas(
            tx,
            sale.id,
            expected_row_version,
            target,
            paid_at,
            refund_reason,
        )
        .await?;

        match target {
            SaleStatus::Paid => {
                let mut updated = sale.clone();
                updated.status = target;
                updated.paid_at = paid_at;
                updated.row_version = new_row_version;

                StockSaleIntegrator::consume_stock_for_sale(
                    tx,
                    &updated,
                    location,
                    default_location_code,
                    actor,
                    now,
                )
                .await?;

                Ok(updated)
            }
            SaleStatus::Refunded => {
                let mut updated = sale.clone();
                updated.status = target;
                updated.refund_reason = refund_reason.map(|s| s.to_string());
                updated.row_version = new_row_version;

                StockSaleIntegrator::refund_stock_for_sale(
                    tx,
                    &updated,
                    allow_expired_on_refund,
                    actor,
                    now,
                )
                .await?;

                Ok(updated)
            }
            _ => {
                let mut updated = sale.clone();
                updated.status = target;
                updated.row_version = new_row_version;
                Ok(updated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{LegalEntityId, PatientId, SaleId};

    fn draft_sale() -> Sale {
        Sale {
            id: SaleId::new(),
            patient: PatientId::new(),
            legal_entity: LegalEntityId::new(),
            status: SaleStatus::Draft,
            sale_number: "INV-2026-000001".to_string(),
            paid_at: None,
            refund_reason: None,
            row_version: 0,
            created_by: ActorId::new(),
            notes: None,
        }
    }

    #[test]
    fn paid_to_paid_is_rejected_before_any_io() {
        let mut sale = draft_sale();
        sale.status = SaleStatus::Paid;
        assert!(!sale.status.can_transition_to(SaleStatus::Paid));
    }

    #[test]
    fn draft_cannot_jump_to_paid() {
        let sale = draft_sale();
        assert!(!sale.status.can_transition_to(SaleStatus::Paid));
    }
}

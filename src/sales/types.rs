//! Sale lifecycle types.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, LegalEntityId, PatientId, ProductId, SaleId, SaleLineId};

/// Sale status. IDs match the storage column for debuggability; no
/// ordering significance beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i16)]
pub enum SaleStatus {
    Draft = 0,
    Pending = 10,
    Paid = 20,
    Cancelled = -10,
    Refunded = -20,
}

impl SaleStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Cancelled | SaleStatus::Refunded)
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(SaleStatus::Draft),
            10 => Some(SaleStatus::Pending),
            20 => Some(SaleStatus::Paid),
            -10 => Some(SaleStatus::Cancelled),
            -20 => Some(SaleStatus::Refunded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Draft => "draft",
            SaleStatus::Pending => "pending",
            SaleStatus::Paid => "paid",
            SaleStatus::Cancelled => "cancelled",
            SaleStatus::Refunded => "refunded",
        }
    }

    /// Allowed target statuses for a transition from `self` (the state
    /// graph). `paid -> paid` is deliberately absent: a repeated
    /// transition to an already-current status is rejected at this layer
    /// even though the downstream consume is itself idempotent.
    pub fn allowed_targets(&self) -> &'static [SaleStatus] {
        match self {
            SaleStatus::Draft => &[SaleStatus::Pending, SaleStatus::Cancelled],
            SaleStatus::Pending => &[SaleStatus::Paid, SaleStatus::Cancelled],
            SaleStatus::Paid => &[SaleStatus::Refunded],
            SaleStatus::Cancelled => &[],
            SaleStatus::Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, target: SaleStatus) -> bool {
        self.allowed_targets().contains(&target)
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for SaleStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        SaleStatus::from_id(value).ok_or(())
    }
}

#[derive(Debug, Clone)]
pub struct Sale {
    pub id: SaleId,
    pub patient: PatientId,
    pub legal_entity: LegalEntityId,
    pub status: SaleStatus,
    pub sale_number: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
    pub row_version: i64,
    pub created_by: ActorId,
    pub notes: Option<String>,
}

/// One line of a sale. `product = None` marks a service line: it carries
/// a price but does not consume stock and is skipped by the integrator.
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub id: SaleLineId,
    pub sale: SaleId,
    pub product: Option<ProductId>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl SaleLine {
    pub fn is_service(&self) -> bool {
        self.product.is_none()
    }

    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_state_graph() {
        assert!(SaleStatus::Draft.can_transition_to(SaleStatus::Pending));
        assert!(SaleStatus::Draft.can_transition_to(SaleStatus::Cancelled));
        assert!(!SaleStatus::Draft.can_transition_to(SaleStatus::Paid));

        assert!(SaleStatus::Pending.can_transition_to(SaleStatus::Paid));
        assert!(SaleStatus::Pending.can_transition_to(SaleStatus::Cancelled));

        assert!(SaleStatus::Paid.can_transition_to(SaleStatus::Refunded));
        assert!(!SaleStatus::Paid.can_transition_to(SaleStatus::Cancelled));
        assert!(!SaleStatus::Paid.can_transition_to(SaleStatus::Paid));

        assert!(SaleStatus::Cancelled.allowed_targets().is_empty());
        assert!(SaleStatus::Refunded.allowed_targets().is_empty());
    }

    #[test]
    fn terminal_states_are_flagged() {
        assert!(SaleStatus::Cancelled.is_terminal());
        assert!(SaleStatus::Refunded.is_terminal());
        assert!(!SaleStatus::Paid.is_terminal());
    }

    #[test]
    fn id_roundtrip() {
        for s in [
            SaleStatus::Draft,
            SaleStatus::Pending,
            SaleStatus::Paid,
            SaleStatus::Cancelled,
            SaleStatus::Refunded,
        ] {
            assert_eq!(SaleStatus::from_id(s.id()), Some(s));
        }
        assert_eq!(SaleStatus::from_id(999), None);
    }

    #[test]
    fn service_line_has_no_product() {
        let line = SaleLine {
            id: SaleLineId::new(),
            sale: SaleId::new(),
            product: None,
            product_name: "Consultation".to_string(),
            quantity: 1,
            unit_price: Decimal::new(5000, 2),
        };
        assert!(line.is_service());
        assert_eq!(line.line_total(), Decimal::new(5000, 2));
    }
}

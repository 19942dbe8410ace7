//! Inventory domain types shared by the ledger and the allocator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, BatchId, LocationId, MoveId, ProductId, SaleId, SaleLineId};

#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct StockLocation {
    pub id: LocationId,
    pub code: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct StockBatch {
    pub id: BatchId,
    pub product: ProductId,
    pub batch_number: String,
    /// `None` means no expiry; such batches sort last under FEFO.
    pub expiry_date: Option<NaiveDate>,
}

/// A single (product, location, batch) balance row.
#[derive(Debug, Clone)]
pub struct StockOnHand {
    pub product: ProductId,
    pub location: LocationId,
    pub batch: BatchId,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity_on_hand: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveType {
    PurchaseIn,
    AdjustmentIn,
    AdjustmentOut,
    TransferIn,
    TransferOut,
    WasteOut,
    SaleOut,
    RefundIn,
}

impl MoveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveType::PurchaseIn => "PURCHASE_IN",
            MoveType::AdjustmentIn => "ADJUSTMENT_IN",
            MoveType::AdjustmentOut => "ADJUSTMENT_OUT",
            MoveType::TransferIn => "TRANSFER_IN",
            MoveType::TransferOut => "TRANSFER_OUT",
            MoveType::WasteOut => "WASTE_OUT",
            MoveType::SaleOut => "SALE_OUT",
            MoveType::RefundIn => "REFUND_IN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "PURCHASE_IN" => MoveType::PurchaseIn,
            "ADJUSTMENT_IN" => MoveType::AdjustmentIn,
            "ADJUSTMENT_OUT" => MoveType::AdjustmentOut,
            "TRANSFER_IN" => MoveType::TransferIn,
            "TRANSFER_OUT" => MoveType::TransferOut,
            "WASTE_OUT" => MoveType::WasteOut,
            "SALE_OUT" => MoveType::SaleOut,
            "REFUND_IN" => MoveType::RefundIn,
            _ => return None,
        })
    }

    /// Whether this move type is conventionally a debit (negative quantity).
    pub fn is_out(&self) -> bool {
        matches!(
            self,
            MoveType::AdjustmentOut | MoveType::TransferOut | MoveType::WasteOut | MoveType::SaleOut
        )
    }
}

/// An append-only stock movement. Never updated or deleted once committed.
#[derive(Debug, Clone)]
pub struct StockMove {
    pub id: MoveId,
    pub product: ProductId,
    pub location: LocationId,
    pub batch: BatchId,
    pub move_type: MoveType,
    /// Signed: positive for IN move types, negative for OUT.
    pub quantity: i64,
    pub reason: String,
    pub reference_type: String,
    pub reference_id: String,
    pub sale_ref: Option<SaleId>,
    pub sale_line_ref: Option<SaleLineId>,
    /// Set on a REFUND_IN move that reverses a prior SALE_OUT; unique when set.
    pub reversed_move_ref: Option<MoveId>,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
}

/// Input to `InventoryLedger::append_move`.
#[derive(Debug, Clone)]
pub struct MoveSpec {
    pub product: ProductId,
    pub location: LocationId,
    pub batch: BatchId,
    pub move_type: MoveType,
    pub quantity: i64,
    pub reason: String,
    pub reference_type: String,
    pub reference_id: String,
    pub sale_ref: Option<SaleId>,
    pub sale_line_ref: Option<SaleLineId>,
    pub reversed_move_ref: Option<MoveId>,
    pub created_by: ActorId,
    /// Caller asserts this OUT move reverses a prior one; bypasses the
    /// below-zero rejection the same way a REFUND_IN naturally would not
    /// need to, since refunds are always positive quantities in practice.
    pub is_reversal: bool,
    /// Caller asserts the targeted batch may be expired.
    pub allow_expired: bool,
}

/// A planned draw from one batch, produced by the FEFO allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDraw {
    pub batch: BatchId,
    pub batch_number: String,
    pub draw_qty: i64,
}

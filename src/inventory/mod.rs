//! Inventory ledger and FEFO allocator.

pub mod allocator;
pub mod ledger;
pub mod types;

pub use ledger::InventoryLedger;
pub use types::{BatchDraw, MoveSpec, MoveType, Product, StockBatch, StockLocation, StockMove, StockOnHand};

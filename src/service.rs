//! The operation boundary: a uniform, synchronous, transactional call
//! surface over the inventory, sales, clinical, and billing components.
//!
//! Every public method here is one user-initiated operation: it validates
//! its structured request, checks RBAC, opens exactly one
//! `sqlx::Transaction`, resolves `now` once from the injected [`Clock`],
//! delegates to the relevant component(s), and commits only if every
//! sub-step succeeded. A `?` anywhere in the body drops the transaction
//! without committing, which is the rollback — no explicit `tx.rollback()`
//! call is needed on the error path.
//!
//! This is the seam an HTTP transport would sit behind; the core itself
//! never speaks HTTP.

use std::sync::Arc;

use crate::actor::Actor;
use crate::billing::{ChargeProposal, ChargeProposalEngine};
use crate::clinical::ClinicalDb;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::Database;
use crate::error::CoreError;
use crate::rbac::{Operation, RbacGuard};
use crate::sales::db::SaleDb;
use crate::sales::state::SaleStateMachine;
use crate::sales::types::{Sale, SaleStatus};
use crate::validation::{self, ConvertToSaleRequest, GenerateProposalRequest, PaySaleRequest, RefundSaleRequest};

/// Wires the database, process-wide configuration, and the injected clock
/// together into the core's operation surface.
#[derive(Clone)]
pub struct CoreService {
    db: Database,
    config: AppConfig,
    clock: Arc<dyn Clock>,
}

impl CoreService {
    pub fn new(db: Database, config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self { db, config, clock }
    }

    /// `proposal.generate` — charge proposal engine, step 1. A Practitioner
    /// may only generate a proposal for an encounter they themselves ran.
    pub async fn generate_proposal(
        &self,
        actor: &Actor,
        request: GenerateProposalRequest,
    ) -> Result<ChargeProposal, CoreError> {
        validation::validate(&request)?;

        let mut tx = self.db.pool().begin().await?;

        let encounter_row = ClinicalDb::find_encounter(&mut tx, request.encounter).await?;
        RbacGuard::check(
            Operation::ProposalGenerate,
            actor,
            Some(encounter_row.practitioner),
        )?;

        let proposal = ChargeProposalEngine::generate_proposal(
            &mut tx,
            request.encounter,
            actor.subject_id,
            &self.config.default_currency,
            request.notes,
        )
        .await?;

        tx.commit().await?;
        Ok(proposal)
    }

    /// `proposal.convert_to_sale` — charge proposal engine, step 2. Returns a sale in
    /// `draft`; the caller must transition it forward separately.
    pub async fn convert_to_sale(
        &self,
        actor: &Actor,
        request: ConvertToSaleRequest,
    ) -> Result<Sale, CoreError> {
        validation::validate(&request)?;
        RbacGuard::check(Operation::ProposalConvertToSale, actor, None)?;

        let mut tx = self.db.pool().begin().await?;
        let now = self.clock.now();

        let sale = ChargeProposalEngine::convert_to_sale(
            &mut tx,
            request.proposal,
            request.legal_entity,
            actor.subject_id,
            &self.config.sale_number_format,
            request.notes,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(sale)
    }

    /// `sale.transition(->paid)` — drives the stock integrator's consume path.
    pub async fn pay_sale(&self, actor: &Actor, request: PaySaleRequest) -> Result<Sale, CoreError> {
        validation::validate(&request)?;
        RbacGuard::check(Operation::SaleTransitionToPaid, actor, None)?;

        let mut tx = self.db.pool().begin().await?;
        let sale = SaleDb::find(&mut tx, request.sale).await?;
        let now = self.clock.now();

        let updated = SaleStateMachine::transition_to(
            &mut tx,
            &sale,
            request.expected_row_version,
            SaleStatus::Paid,
            None,
            actor.subject_id,
            request.location,
            &self.config.default_stock_location_code,
            self.config.allow_expired_on_refund,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// `sale.transition(->refunded)` — drives the stock integrator's
    /// reversal path. Reception may trigger this even though Reception
    /// cannot call `stock.manual_adjust` directly.
    pub async fn refund_sale(&self, actor: &Actor, request: RefundSaleRequest) -> Result<Sale, CoreError> {
        validation::validate(&request)?;
        RbacGuard::check(Operation::SaleTransitionToRefunded, actor, None)?;

        let mut tx = self.db.pool().begin().await?;
        let sale = SaleDb::find(&mut tx, request.sale).await?;
        let now = self.clock.now();

        let updated = SaleStateMachine::transition_to(
            &mut tx,
            &sale,
            request.expected_row_version,
            SaleStatus::Refunded,
            Some(&request.reason),
            actor.subject_id,
            None,
            &self.config.default_stock_location_code,
            self.config.allow_expired_on_refund,
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}

//! RBAC guard.
//!
//! A declarative matrix evaluated at every core operation's entry point.
//! Admin always passes; everyone else is checked against the table below.
//! A handful of operations additionally restrict a Practitioner to
//! resources they own (`resource_practitioner == actor`).

use crate::actor::{Actor, Role};
use crate::error::CoreError;
use crate::ids::ActorId;

/// Core operations the guard is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    EncounterCreateOrFinalize,
    EncounterAddTreatment,
    ProposalGenerate,
    ProposalView,
    ProposalConvertToSale,
    SaleTransitionToPaid,
    SaleTransitionToRefunded,
    StockManualAdjust,
    StockView,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::EncounterCreateOrFinalize => "encounter.create/finalize",
            Operation::EncounterAddTreatment => "encounter.add_treatment",
            Operation::ProposalGenerate => "proposal.generate",
            Operation::ProposalView => "proposal.view",
            Operation::ProposalConvertToSale => "proposal.convert_to_sale",
            Operation::SaleTransitionToPaid => "sale.transition(->paid)",
            Operation::SaleTransitionToRefunded => "sale.transition(->refunded)",
            Operation::StockManualAdjust => "stock.manual_adjust",
            Operation::StockView => "stock.view",
        }
    }
}

/// Per-role permission for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    Allowed,
    /// Allowed only when the resource's practitioner matches the actor.
    OwnOnly,
    Denied,
}

/// Look up the declarative permission matrix. Admin is handled by the
/// caller before consulting this table.
fn grant_for(op: Operation, role: Role) -> Grant {
    use Grant::*;
    use Operation::*;
    use Role::*;

    match (op, role) {
        (_, Admin) => Allowed,

        (EncounterCreateOrFinalize, Practitioner) => Allowed,
        (EncounterCreateOrFinalize, ClinicalOps) => Allowed,
        (EncounterCreateOrFinalize, _) => Denied,

        (EncounterAddTreatment, Practitioner) => Allowed,
        (EncounterAddTreatment, ClinicalOps) => Allowed,
        (EncounterAddTreatment, _) => Denied,

        (ProposalGenerate, Practitioner) => OwnOnly,
        (ProposalGenerate, ClinicalOps) => Allowed,
        (ProposalGenerate, _) => Denied,

        (ProposalView, Practitioner) => OwnOnly,
        (ProposalView, Reception) => Allowed,
        (ProposalView, ClinicalOps) => Allowed,
        (ProposalView, Accounting) => Allowed,
        (ProposalView, _) => Denied,

        (ProposalConvertToSale, Reception) => Allowed,
        (ProposalConvertToSale, ClinicalOps) => Allowed,
        (ProposalConvertToSale, _) => Denied,

        (SaleTransitionToPaid, Reception) => Allowed,
        (SaleTransitionToPaid, ClinicalOps) => Allowed,
        (SaleTransitionToPaid, _) => Denied,

        // Reception may trigger refund even though it cannot touch stock
        // directly; the stock reversal itself runs under the integrator's
        // own authority, not the triggering actor's.
        (SaleTransitionToRefunded, Reception) => Allowed,
        (SaleTransitionToRefunded, ClinicalOps) => Allowed,
        (SaleTransitionToRefunded, _) => Denied,

        (StockManualAdjust, ClinicalOps) => Allowed,
        (StockManualAdjust, _) => Denied,

        (StockView, Practitioner) => Allowed,
        (StockView, Reception) => Allowed,
        (StockView, ClinicalOps) => Allowed,
        (StockView, Accounting) => Allowed,
        (StockView, Marketing) => Denied,
    }
}

/// Evaluates the RBAC matrix for a single operation.
pub struct RbacGuard;

impl RbacGuard {
    /// Check whether `actor` may perform `op`.
    ///
    /// `resource_practitioner` is the practitioner id attached to the
    /// resource being acted on, when the operation is subject to an "own"
    /// restriction (proposal.generate, proposal.view). Pass `None` for
    /// operations without an owning practitioner.
    pub fn check(
        op: Operation,
        actor: &Actor,
        resource_practitioner: Option<ActorId>,
    ) -> Result<(), CoreError> {
        // An actor may hold several roles; any granting role authorizes.
        let mut own_only_seen = false;
        for role in &actor.roles {
            match grant_for(op, *role) {
                Grant::Allowed => return Ok(()),
                Grant::OwnOnly => {
                    own_only_seen = true;
                    if resource_practitioner == Some(actor.subject_id) {
                        return Ok(());
                    }
                }
                Grant::Denied => {}
            }
        }

        if own_only_seen {
            return Err(CoreError::Forbidden(format!(
                "{} is restricted to the owning practitioner",
                op.name()
            )));
        }

        Err(CoreError::Forbidden(format!(
            "actor lacks a role permitting {}",
            op.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor_with(roles: impl IntoIterator<Item = Role>) -> Actor {
        Actor::new(ActorId::new(), roles)
    }

    #[test]
    fn admin_can_do_anything() {
        let admin = actor_with([Role::Admin]);
        assert!(RbacGuard::check(Operation::StockManualAdjust, &admin, None).is_ok());
        assert!(RbacGuard::check(Operation::SaleTransitionToRefunded, &admin, None).is_ok());
    }

    #[test]
    fn reception_can_convert_and_pay_and_refund_but_not_adjust_stock() {
        let reception = actor_with([Role::Reception]);
        assert!(RbacGuard::check(Operation::ProposalConvertToSale, &reception, None).is_ok());
        assert!(RbacGuard::check(Operation::SaleTransitionToPaid, &reception, None).is_ok());
        assert!(RbacGuard::check(Operation::SaleTransitionToRefunded, &reception, None).is_ok());
        assert!(RbacGuard::check(Operation::StockManualAdjust, &reception, None).is_err());
        assert!(RbacGuard::check(Operation::EncounterCreateOrFinalize, &reception, None).is_err());
    }

    #[test]
    fn practitioner_proposal_access_is_own_only() {
        let practitioner = actor_with([Role::Practitioner]);
        let owned = Some(practitioner.subject_id);
        let other = Some(ActorId::new());

        assert!(RbacGuard::check(Operation::ProposalGenerate, &practitioner, owned).is_ok());
        assert!(RbacGuard::check(Operation::ProposalGenerate, &practitioner, other).is_err());
        assert!(RbacGuard::check(Operation::ProposalView, &practitioner, owned).is_ok());
        assert!(RbacGuard::check(Operation::ProposalView, &practitioner, other).is_err());
    }

    #[test]
    fn marketing_has_no_core_access() {
        let marketing = actor_with([Role::Marketing]);
        for op in [
            Operation::EncounterCreateOrFinalize,
            Operation::ProposalView,
            Operation::SaleTransitionToPaid,
            Operation::StockView,
        ] {
            assert!(RbacGuard::check(op, &marketing, None).is_err());
        }
    }

    #[test]
    fn clinical_ops_has_full_core_access() {
        let clinical_ops = actor_with([Role::ClinicalOps]);
        for op in [
            Operation::EncounterCreateOrFinalize,
            Operation::EncounterAddTreatment,
            Operation::ProposalGenerate,
            Operation::ProposalView,
            Operation::ProposalConvertToSale,
            Operation::SaleTransitionToPaid,
            Operation::SaleTransitionToRefunded,
            Operation::StockManualAdjust,
            Operation::StockView,
        ] {
            assert!(RbacGuard::check(op, &clinical_ops, None).is_ok());
        }
    }
}

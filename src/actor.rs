//! Authenticated caller carried into every core operation.
//!
//! The identity provider is an external collaborator; it resolves a
//! request down to a subject id and a role set and hands both to the core
//! as an `Actor`. The core never authenticates anyone itself.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ids::ActorId;

/// Role tags recognized by the RBAC guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Practitioner,
    Reception,
    ClinicalOps,
    Accounting,
    Marketing,
}

/// The authenticated principal attached to every core operation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub subject_id: ActorId,
    pub roles: HashSet<Role>,
}

impl Actor {
    pub fn new(subject_id: ActorId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            subject_id,
            roles: roles.into_iter().collect(),
        }
    }

    #[inline]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_role_checks_membership() {
        let actor = Actor::new(ActorId::new(), [Role::Reception]);
        assert!(actor.has_role(Role::Reception));
        assert!(!actor.has_role(Role::Practitioner));
        assert!(!actor.is_admin());
    }
}

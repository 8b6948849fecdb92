use crate::domain::models::UserRole;
use crate::error::{AppError, AppResult};
use uuid::Uuid;

/// Authenticated caller as seen by the business rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is(&self, role: UserRole) -> bool {
        self.role == role
    }
}

/// Capability gate run before every state-mutating operation.
pub fn require_role(actor: &Actor, allowed: &[UserRole]) -> AppResult<()> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        tracing::warn!(
            "Role {} denied, needs one of {:?}",
            actor.role.as_str(),
            allowed.iter().map(|r| r.as_str()).collect::<Vec<_>>()
        );
        Err(AppError::forbidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_listed_roles_only() {
        let hr = Actor::new(Uuid::new_v4(), UserRole::Hr);
        let panel = Actor::new(Uuid::new_v4(), UserRole::Panel);
        assert!(require_role(&hr, &[UserRole::Hr, UserRole::Manager]).is_ok());
        assert!(matches!(
            require_role(&panel, &[UserRole::Hr, UserRole::Manager]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn empty_allow_list_denies_everyone() {
        for role in UserRole::ALL {
            let actor = Actor::new(Uuid::new_v4(), role);
            assert!(require_role(&actor, &[]).is_err());
        }
    }
}

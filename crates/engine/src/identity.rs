//! Caller identity.
//!
//! The engine never verifies credentials. An outer layer resolves the caller
//! (see [`crate::services::AccountService::resolve`]) and passes the
//! resulting [`AuthContext`] into every operation explicitly.

use tradepost_core::{UserId, UserRole};

use crate::error::ServiceError;

/// An identified account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: UserRole,
    pub active: bool,
}

/// Who is calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthContext {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl AuthContext {
    /// The caller as an active account.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for anonymous callers, `Forbidden` for accounts that
    /// have not been confirmed.
    pub fn require_user(&self) -> Result<&Principal, ServiceError> {
        match self {
            Self::Anonymous => Err(ServiceError::Unauthenticated),
            Self::Authenticated(principal) if !principal.active => Err(ServiceError::Forbidden(
                "account is not active".to_owned(),
            )),
            Self::Authenticated(principal) => Ok(principal),
        }
    }

    /// The caller as an active account with `role`.
    ///
    /// # Errors
    ///
    /// As [`AuthContext::require_user`], plus `Forbidden` for the wrong role.
    pub fn require_role(&self, role: UserRole) -> Result<&Principal, ServiceError> {
        let principal = self.require_user()?;
        if principal.role != role {
            return Err(ServiceError::Forbidden(format!(
                "only {role} accounts may do this"
            )));
        }
        Ok(principal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ctx(role: UserRole, active: bool) -> AuthContext {
        AuthContext::Authenticated(Principal {
            user_id: UserId::new(1),
            role,
            active,
        })
    }

    #[test]
    fn test_anonymous_is_unauthenticated() {
        assert!(matches!(
            AuthContext::Anonymous.require_user(),
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[test]
    fn test_inactive_is_forbidden() {
        assert!(matches!(
            ctx(UserRole::Buyer, false).require_user(),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn test_role_check() {
        assert!(ctx(UserRole::Shop, true).require_role(UserRole::Shop).is_ok());
        assert!(matches!(
            ctx(UserRole::Buyer, true).require_role(UserRole::Shop),
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(
            ctx(UserRole::Buyer, true).require_user().unwrap().user_id,
            UserId::new(1)
        );
    }
}

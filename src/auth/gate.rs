//! Role checks over an already validated [`Identity`].

use super::{AuthError, Identity};

pub fn require_admin(identity: Identity) -> Result<Identity, AuthError> {
    if identity.is_admin {
        Ok(identity)
    } else {
        Err(AuthError::Forbidden(
            "You must be admin user for this".to_string(),
        ))
    }
}

pub fn require_admin_or_supplier(identity: Identity) -> Result<Identity, AuthError> {
    if identity.is_admin || identity.is_supplier {
        Ok(identity)
    } else {
        Err(AuthError::Forbidden(
            "You must be admin or supplier user for this".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::{sample_user, test_service};

    fn identity(is_admin: bool, is_supplier: bool) -> Identity {
        let service = test_service();
        let token = service.issue_session(&sample_user(is_admin, is_supplier)).unwrap();
        service.validate(&token).unwrap()
    }

    #[test]
    fn test_require_admin_passes_admin_through_unchanged() {
        let admin = identity(true, false);
        assert_eq!(require_admin(admin.clone()).unwrap(), admin);
    }

    #[test]
    fn test_require_admin_rejects_others() {
        assert!(matches!(
            require_admin(identity(false, false)),
            Err(AuthError::Forbidden(_))
        ));
        assert!(matches!(
            require_admin(identity(false, true)),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn test_require_admin_or_supplier() {
        assert!(require_admin_or_supplier(identity(true, false)).is_ok());
        assert!(require_admin_or_supplier(identity(false, true)).is_ok());
        assert!(matches!(
            require_admin_or_supplier(identity(false, false)),
            Err(AuthError::Forbidden(_))
        ));
    }
}

use crate::auth::Claims;
use crate::directory::Role;
use crate::error::AuthError;

/// Reject unless the caller holds `required`
pub fn require_role(caller: &Claims, required: Role) -> Result<(), AuthError> {
    if caller.user_type != required {
        tracing::warn!(
            user_id = %caller.sub,
            role = %caller.user_type,
            required = %required,
            "role check failed"
        );
        return Err(AuthError::Forbidden);
    }
    Ok(())
}

/// Accept the target user themself, or any caller holding `required`
pub fn require_self_or_role(
    caller: &Claims,
    target_user_id: &str,
    required: Role,
) -> Result<(), AuthError> {
    if caller.sub == target_user_id {
        return Ok(());
    }
    require_role(caller, required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenKind;
    use crate::directory::test_user;

    fn claims_for(role: Role) -> Claims {
        let user = test_user("S-9", "guard@example.com", role);
        Claims::new(&user, TokenKind::Access, 60, "test".into())
    }

    #[test]
    fn admin_passes_role_check() {
        assert!(require_role(&claims_for(Role::Admin), Role::Admin).is_ok());
    }

    #[test]
    fn user_fails_admin_role_check() {
        assert_eq!(
            require_role(&claims_for(Role::User), Role::Admin),
            Err(AuthError::Forbidden)
        );
    }

    #[test]
    fn self_access_is_allowed_without_role() {
        let caller = claims_for(Role::User);
        let own_id = caller.sub.clone();
        assert!(require_self_or_role(&caller, &own_id, Role::Admin).is_ok());
    }

    #[test]
    fn other_user_access_requires_role() {
        let caller = claims_for(Role::User);
        assert_eq!(
            require_self_or_role(&caller, "someone-else", Role::Admin),
            Err(AuthError::Forbidden)
        );

        let admin = claims_for(Role::Admin);
        assert!(require_self_or_role(&admin, "someone-else", Role::Admin).is_ok());
    }
}

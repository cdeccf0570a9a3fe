//! Role checks. Every "does role X dominate role Y" decision in the crate goes
//! through `at_least`; exclusive actions use `allowed_roles`.

use super::principal::{Identity, Role};
use crate::error::{AppError, AppResult};

/// True when the identity's role ranks at or above `required`. Anonymous
/// callers never pass.
pub fn at_least(identity: Option<&Identity>, required: Role) -> bool {
    match identity {
        Some(id) => id.role.rank() >= required.rank(),
        None => false,
    }
}

/// True when the identity's exact role is in the allow-list. Hierarchy is
/// ignored here: `allowed_roles(manager, [admin])` is false.
pub fn allowed_roles(identity: Option<&Identity>, roles: &[Role]) -> bool {
    match identity {
        Some(id) => roles.contains(&id.role),
        None => false,
    }
}

/// Route-level helper: unauthenticated vs insufficient role map to distinct errors.
pub fn require_at_least(identity: Option<&Identity>, required: Role) -> AppResult<&Identity> {
    let Some(id) = identity else { return Err(AppError::unauthenticated()); };
    if !at_least(Some(id), required) {
        return Err(AppError::insufficient_permissions());
    }
    Ok(id)
}

pub fn require_one_of<'a>(identity: Option<&'a Identity>, roles: &[Role]) -> AppResult<&'a Identity> {
    let Some(id) = identity else { return Err(AppError::unauthenticated()); };
    if !allowed_roles(Some(id), roles) {
        return Err(AppError::insufficient_permissions());
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_role(role: Role) -> Identity {
        Identity { id: format!("{}-1", role), email: format!("{}@example.com", role), role, first_name: String::new(), last_name: String::new() }
    }

    #[test]
    fn at_least_matches_rank_for_every_pair() {
        for have in Role::ALL {
            let id = with_role(have);
            for need in Role::ALL {
                assert_eq!(at_least(Some(&id), need), have.rank() >= need.rank(), "{have} >= {need}");
            }
        }
    }

    #[test]
    fn anonymous_never_passes() {
        for need in Role::ALL {
            assert!(!at_least(None, need));
        }
        assert!(!allowed_roles(None, &Role::ALL));
    }

    #[test]
    fn allow_list_is_exact() {
        let mgr = with_role(Role::Manager);
        assert!(!allowed_roles(Some(&mgr), &[Role::Admin]));
        assert!(allowed_roles(Some(&mgr), &[Role::Admin, Role::Manager]));
        assert!(!allowed_roles(Some(&mgr), &[]));
    }

    #[test]
    fn require_helpers_distinguish_absence_from_denial() {
        let rep = with_role(Role::SalesRep);
        assert!(matches!(require_at_least(None, Role::SalesRep), Err(AppError::Auth { .. })));
        assert!(matches!(require_at_least(Some(&rep), Role::Manager), Err(AppError::Forbidden { .. })));
        assert!(require_at_least(Some(&rep), Role::SalesRep).is_ok());
        assert!(matches!(require_one_of(Some(&rep), &[Role::Admin]), Err(AppError::Forbidden { .. })));
    }
}

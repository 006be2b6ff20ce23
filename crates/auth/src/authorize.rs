use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{Permission, PermissionCatalog, PermissionSet, RequestContext, Role, RoleAssignmentTable};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Carries the catalog message for the first missing token.
    #[error("{message}")]
    Forbidden {
        permission: Option<Permission>,
        message: String,
    },
}

/// True iff every token in `required` is present in `permissions`.
///
/// - No IO
/// - No panics
/// - An absent or empty set denies, even when `required` is empty.
pub fn check_all(permissions: Option<&PermissionSet>, required: &[Permission]) -> bool {
    match permissions {
        Some(set) if !set.is_empty() => set.contains_all(required),
        _ => false,
    }
}

/// [`check_all`] against the permission set of the request context.
pub fn check_permission(ctx: &RequestContext, required: &[Permission]) -> bool {
    check_all(ctx.permissions(), required)
}

/// Request-layer guard: converts a denial into [`AuthzError::Forbidden`].
///
/// Missing context and insufficient permissions produce the same error.
pub fn require_permissions(
    ctx: &RequestContext,
    required: &[Permission],
    catalog: &PermissionCatalog,
) -> Result<(), AuthzError> {
    if check_permission(ctx, required) {
        return Ok(());
    }

    let first_missing = required
        .iter()
        .find(|p| !ctx.permissions().is_some_and(|set| set.contains(p)))
        .copied();

    debug!(
        user_id = ?ctx.user_id(),
        permission = ?first_missing.map(|p| p.to_string()),
        "permission denied"
    );

    let message = match &first_missing {
        Some(p) => catalog.message(p).to_string(),
        None => catalog.default_message().to_string(),
    };

    Err(AuthzError::Forbidden {
        permission: first_missing,
        message,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required: Vec<String>,
    pub granted: bool,
    pub reason: String,
    pub role: Option<Role>,
    pub effective_permissions: Vec<String>,
    /// Required tokens the caller does not hold.
    pub missing: Vec<String>,
    /// Roles that would satisfy every required token.
    pub granting_roles: Vec<Role>,
}

/// Explain why a check against `ctx` is allowed or denied.
pub fn explain_authorization(
    ctx: &RequestContext,
    required: &[Permission],
    table: &RoleAssignmentTable,
) -> AuthorizationExplanation {
    let granted = check_permission(ctx, required);

    let effective_permissions: Vec<String> = ctx
        .permissions()
        .map(|set| set.iter().map(Permission::to_string).collect())
        .unwrap_or_default();

    let missing: Vec<String> = required
        .iter()
        .filter(|p| !ctx.permissions().is_some_and(|set| set.contains(p)))
        .map(Permission::to_string)
        .collect();

    let granting_roles: Vec<Role> = Role::ALL
        .into_iter()
        .filter(|role| {
            table
                .resolve(*role)
                .is_ok_and(|set| !set.is_empty() && set.contains_all(required))
        })
        .collect();

    let reason = if granted {
        match ctx.role() {
            Some(role) => format!("Role '{role}' grants all required permissions"),
            None => "Caller holds all required permissions".to_string(),
        }
    } else if ctx.permissions().is_none_or(|set| set.is_empty()) {
        "Caller has no permission context".to_string()
    } else {
        format!("Missing required permissions: {missing:?}")
    };

    AuthorizationExplanation {
        required: required.iter().map(Permission::to_string).collect(),
        granted,
        reason,
        role: ctx.role(),
        effective_permissions,
        missing,
        granting_roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::User;
    use bookhub_core::UserId;
    use chrono::Utc;

    fn ctx_for(role: Role) -> RequestContext {
        let user = User::new(UserId::new(), "user@example.com", "Some User", role, Utc::now())
            .unwrap();
        RequestContext::for_user(&user, RoleAssignmentTable::global().unwrap()).unwrap()
    }

    #[test]
    fn allows_when_every_token_is_held() {
        let ctx = ctx_for(Role::Publisher);
        assert!(check_permission(
            &ctx,
            &[Permission::CREATE_BOOK, Permission::UPDATE_ORDER]
        ));
    }

    #[test]
    fn denies_when_any_token_is_missing() {
        let ctx = ctx_for(Role::Publisher);
        assert!(!check_permission(
            &ctx,
            &[Permission::CREATE_BOOK, Permission::CREATE_PUBLISHER]
        ));
    }

    #[test]
    fn missing_context_denies() {
        let ctx = RequestContext::anonymous();
        assert!(!check_permission(&ctx, &[Permission::RETRIEVE_BOOK]));
        assert!(!check_all(None, &[Permission::RETRIEVE_BOOK]));
    }

    #[test]
    fn empty_set_denies() {
        let empty = PermissionSet::new();
        assert!(!check_all(Some(&empty), &[Permission::RETRIEVE_BOOK]));
    }

    #[test]
    fn zero_required_tokens_needs_a_non_empty_set() {
        let set: PermissionSet = [Permission::RETRIEVE_BOOK].into_iter().collect();
        assert!(check_all(Some(&set), &[]));
        assert!(!check_all(Some(&PermissionSet::new()), &[]));
        assert!(!check_all(None, &[]));
    }

    #[test]
    fn require_reports_first_missing_token_message() {
        let ctx = ctx_for(Role::IndividualUser);
        let catalog = PermissionCatalog::standard();

        let err = require_permissions(
            &ctx,
            &[Permission::RETRIEVE_BOOK, Permission::DELETE_BOOK],
            &catalog,
        )
        .unwrap_err();

        assert_eq!(
            err,
            AuthzError::Forbidden {
                permission: Some(Permission::DELETE_BOOK),
                message: "You don't have permission to delete book".to_string(),
            }
        );
    }

    #[test]
    fn require_treats_anonymous_like_insufficient() {
        let catalog = PermissionCatalog::standard();

        let anonymous = require_permissions(
            &RequestContext::anonymous(),
            &[Permission::CREATE_FAQ],
            &catalog,
        )
        .unwrap_err();
        let insufficient =
            require_permissions(&ctx_for(Role::SchoolAdmin), &[Permission::CREATE_FAQ], &catalog)
                .unwrap_err();

        assert_eq!(anonymous, insufficient);
    }

    #[test]
    fn require_with_no_tokens_and_no_context_uses_default_message() {
        let catalog = PermissionCatalog::empty("denied");
        let err = require_permissions(&RequestContext::anonymous(), &[], &catalog).unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                permission: None,
                message: "denied".to_string()
            }
        );
    }

    #[test]
    fn explanation_lists_missing_tokens_and_granting_roles() {
        let ctx = ctx_for(Role::IndividualUser);
        let explanation = explain_authorization(
            &ctx,
            &[Permission::UPDATE_INSTITUTION],
            RoleAssignmentTable::global().unwrap(),
        );

        assert!(!explanation.granted);
        assert_eq!(explanation.missing, vec!["institution.update".to_string()]);
        assert_eq!(
            explanation.granting_roles,
            vec![Role::Admin, Role::InstitutionalUser]
        );
        assert_eq!(explanation.role, Some(Role::IndividualUser));
    }

    #[test]
    fn explanation_for_anonymous_caller() {
        let explanation = explain_authorization(
            &RequestContext::anonymous(),
            &[Permission::RETRIEVE_BOOK],
            RoleAssignmentTable::global().unwrap(),
        );

        assert!(!explanation.granted);
        assert!(explanation.effective_permissions.is_empty());
        assert_eq!(explanation.reason, "Caller has no permission context");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_permissions() -> impl Strategy<Value = Vec<Permission>> {
            prop::collection::vec(
                prop::sample::select(Permission::all().collect::<Vec<_>>()),
                0..6,
            )
        }

        proptest! {
            /// Property: the admin passes every check.
            #[test]
            fn admin_passes_every_check(required in any_permissions()) {
                prop_assert!(check_permission(&ctx_for(Role::Admin), &required));
            }

            /// Property: anonymous callers fail every check.
            #[test]
            fn anonymous_fails_every_check(required in any_permissions()) {
                prop_assert!(!check_permission(&RequestContext::anonymous(), &required));
            }

            /// Property: check_all agrees with per-token membership.
            #[test]
            fn check_all_matches_membership(
                held in any_permissions(),
                required in any_permissions(),
            ) {
                let set: PermissionSet = held.into_iter().collect();
                let expected = !set.is_empty() && required.iter().all(|p| set.contains(p));
                prop_assert_eq!(check_all(Some(&set), &required), expected);
            }
        }
    }
}

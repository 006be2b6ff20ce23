use bookhub_core::UserId;

use crate::{PermissionSet, Role, RoleAssignmentTable, UnknownRoleError, User};

/// Per-request authorization context.
///
/// Resolved once when the request starts; guarded operations read the
/// permission set from here. An anonymous context has no permission set and
/// every check against it denies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    user_id: Option<UserId>,
    role: Option<Role>,
    permissions: Option<PermissionSet>,
}

impl RequestContext {
    /// Context of an unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Resolve the user's role through `table`.
    pub fn for_user(user: &User, table: &RoleAssignmentTable) -> Result<Self, UnknownRoleError> {
        let permissions = table.resolve(user.role)?.clone();
        Ok(Self {
            user_id: Some(user.id),
            role: Some(user.role),
            permissions: Some(permissions),
        })
    }

    /// Context with an explicit permission set (service calls, tests).
    pub fn with_permissions(user_id: UserId, permissions: PermissionSet) -> Self {
        Self {
            user_id: Some(user_id),
            role: None,
            permissions: Some(permissions),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

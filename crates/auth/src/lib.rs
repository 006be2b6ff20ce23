//! `bookhub-auth`: role-based authorization for the bookhub platform.
//!
//! Pure and synchronous: a caller's role resolves to a permission set once
//! per request, and every guarded operation checks that set. Decoupled from
//! HTTP/GraphQL and storage.

pub mod authorize;
pub mod context;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{
    AuthorizationExplanation, AuthzError, check_all, check_permission, explain_authorization,
    require_permissions,
};
pub use context::RequestContext;
pub use permissions::{
    Action, DEFAULT_PERMISSION_DENIED_MESSAGE, Permission, PermissionCatalog, PermissionSet,
    Resource,
};
pub use roles::{Role, RoleAssignmentTable, RoleTableError, UnknownRoleError};
pub use user::User;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::permissions::{Permission, PermissionSet};

/// Caller category used to resolve a permission set.
///
/// Every user has exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Publisher,
    InstitutionalUser,
    SchoolAdmin,
    IndividualUser,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Publisher,
        Role::InstitutionalUser,
        Role::SchoolAdmin,
        Role::IndividualUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Publisher => "publisher",
            Role::InstitutionalUser => "institutional_user",
            Role::SchoolAdmin => "school_admin",
            Role::IndividualUser => "individual_user",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role name (or table entry) that the platform does not know.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRoleError(s.to_string()))
    }
}

/// A role table that breaks the grant-composition invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleTableError {
    #[error("role '{0}' has no grant set")]
    MissingRole(Role),

    #[error("role '{role}' lacks base grants: {missing:?}")]
    MissingBaseGrants { role: Role, missing: Vec<String> },

    #[error("admin grants differ from the union of all roles: missing {missing:?}, extra {extra:?}")]
    AdminMismatch { missing: Vec<String>, extra: Vec<String> },
}

static STANDARD_TABLE: LazyLock<Result<RoleAssignmentTable, RoleTableError>> =
    LazyLock::new(RoleAssignmentTable::standard);

/// Role -> permission grants.
///
/// Invariants (checked by [`RoleAssignmentTable::validate`]):
/// - every role's set contains the individual user's set;
/// - the admin set equals the union of the other four sets plus the
///   admin-only tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentTable {
    grants: HashMap<Role, PermissionSet>,
    admin_only: PermissionSet,
}

impl RoleAssignmentTable {
    /// Process-wide standard table, built and validated on first use.
    pub fn global() -> Result<&'static RoleAssignmentTable, RoleTableError> {
        STANDARD_TABLE.as_ref().map_err(Clone::clone)
    }

    /// Build and validate the standard table.
    pub fn standard() -> Result<Self, RoleTableError> {
        let table = Self::compose_standard();
        table.validate()?;
        Ok(table)
    }

    /// Build a table from explicit grants, rejecting tables that break the
    /// composition invariants.
    pub fn from_grants(
        grants: HashMap<Role, PermissionSet>,
        admin_only: PermissionSet,
    ) -> Result<Self, RoleTableError> {
        let table = Self { grants, admin_only };
        table.validate()?;
        Ok(table)
    }

    fn compose_standard() -> Self {
        let individual_user: PermissionSet = [
            Permission::RETRIEVE_BOOK,
            Permission::RETRIEVE_PUBLISHER,
            Permission::RETRIEVE_SCHOOL,
            Permission::RETRIEVE_INSTITUTION,
            Permission::CREATE_ORDER,
            Permission::RETRIEVE_ORDER,
            Permission::RETRIEVE_FAQ,
            Permission::CREATE_CONTACT_MESSAGE,
        ]
        .into_iter()
        .collect();

        let school_admin = individual_user.clone().with([Permission::UPDATE_SCHOOL]);

        let publisher = individual_user.clone().with([
            Permission::CREATE_BOOK,
            Permission::UPDATE_BOOK,
            Permission::DELETE_BOOK,
            Permission::UPDATE_PUBLISHER,
            Permission::UPDATE_ORDER,
            Permission::DELETE_ORDER,
        ]);

        let institutional_user = individual_user.clone().with([Permission::UPDATE_INSTITUTION]);

        let admin_only: PermissionSet = [
            Permission::CREATE_PUBLISHER,
            Permission::DELETE_PUBLISHER,
            Permission::CREATE_SCHOOL,
            Permission::DELETE_SCHOOL,
            Permission::CREATE_INSTITUTION,
            Permission::DELETE_INSTITUTION,
            Permission::CREATE_FAQ,
            Permission::UPDATE_FAQ,
            Permission::DELETE_FAQ,
            Permission::RETRIEVE_CONTACT_MESSAGE,
            Permission::UPDATE_CONTACT_MESSAGE,
            Permission::DELETE_CONTACT_MESSAGE,
        ]
        .into_iter()
        .collect();

        let admin = individual_user
            .union(&publisher)
            .union(&institutional_user)
            .union(&school_admin)
            .union(&admin_only);

        let grants = HashMap::from([
            (Role::Admin, admin),
            (Role::Publisher, publisher),
            (Role::InstitutionalUser, institutional_user),
            (Role::SchoolAdmin, school_admin),
            (Role::IndividualUser, individual_user),
        ]);

        Self { grants, admin_only }
    }

    /// Check the composition invariants.
    pub fn validate(&self) -> Result<(), RoleTableError> {
        let base = self.grant_set(Role::IndividualUser)?;

        for role in Role::ALL {
            let set = self.grant_set(role)?;
            let missing = base.difference(set);
            if !missing.is_empty() {
                return Err(RoleTableError::MissingBaseGrants {
                    role,
                    missing: missing.iter().map(Permission::to_string).collect(),
                });
            }
        }

        let mut expected = self.admin_only.clone();
        for role in Role::ALL.into_iter().filter(|r| *r != Role::Admin) {
            expected = expected.union(self.grant_set(role)?);
        }

        let admin = self.grant_set(Role::Admin)?;
        if *admin != expected {
            return Err(RoleTableError::AdminMismatch {
                missing: expected.difference(admin).iter().map(Permission::to_string).collect(),
                extra: admin.difference(&expected).iter().map(Permission::to_string).collect(),
            });
        }

        Ok(())
    }

    fn grant_set(&self, role: Role) -> Result<&PermissionSet, RoleTableError> {
        self.grants.get(&role).ok_or(RoleTableError::MissingRole(role))
    }

    /// Permission set granted to `role`.
    pub fn resolve(&self, role: Role) -> Result<&PermissionSet, UnknownRoleError> {
        self.grants
            .get(&role)
            .ok_or_else(|| UnknownRoleError(role.as_str().to_string()))
    }

    /// Permission set granted to the role named `name` (e.g. `"school_admin"`).
    pub fn resolve_name(&self, name: &str) -> Result<&PermissionSet, UnknownRoleError> {
        let role: Role = name.parse()?;
        self.resolve(role)
    }

    /// Tokens only the admin role holds.
    pub fn admin_only(&self) -> &PermissionSet {
        &self.admin_only
    }

    /// Roles whose grant set includes `permission`, in [`Role::ALL`] order.
    pub fn roles_granting(&self, permission: &Permission) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| {
                self.grants
                    .get(role)
                    .is_some_and(|set| set.contains(permission))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> &'static RoleAssignmentTable {
        RoleAssignmentTable::global().unwrap()
    }

    #[test]
    fn standard_table_validates() {
        assert!(RoleAssignmentTable::standard().is_ok());
        assert!(RoleAssignmentTable::global().is_ok());
        assert_eq!(table(), &RoleAssignmentTable::standard().unwrap());
    }

    #[test]
    fn every_role_contains_individual_user_grants() {
        let base = table().resolve(Role::IndividualUser).unwrap();
        for role in Role::ALL {
            assert!(base.is_subset(table().resolve(role).unwrap()), "{role}");
        }
    }

    #[test]
    fn admin_is_union_of_all_roles_plus_admin_only() {
        let mut union = table().admin_only().clone();
        for role in [
            Role::Publisher,
            Role::InstitutionalUser,
            Role::SchoolAdmin,
            Role::IndividualUser,
        ] {
            union = union.union(table().resolve(role).unwrap());
        }
        assert_eq!(table().resolve(Role::Admin).unwrap(), &union);
    }

    #[test]
    fn admin_holds_every_token() {
        let admin = table().resolve(Role::Admin).unwrap();
        assert_eq!(admin.len(), Permission::all().count());
    }

    #[test]
    fn role_specific_grants() {
        let school_admin = table().resolve(Role::SchoolAdmin).unwrap();
        assert!(school_admin.contains(&Permission::UPDATE_SCHOOL));
        assert!(!school_admin.contains(&Permission::UPDATE_INSTITUTION));

        let publisher = table().resolve(Role::Publisher).unwrap();
        assert!(publisher.contains(&Permission::CREATE_BOOK));
        assert!(publisher.contains(&Permission::UPDATE_ORDER));
        assert!(!publisher.contains(&Permission::CREATE_PUBLISHER));

        let individual = table().resolve(Role::IndividualUser).unwrap();
        assert_eq!(individual.len(), 8);
        assert!(!individual.contains(&Permission::CREATE_BOOK));
    }

    #[test]
    fn unknown_role_name_is_an_error_not_an_empty_set() {
        let err = table().resolve_name("superuser").unwrap_err();
        assert_eq!(err, UnknownRoleError("superuser".to_string()));

        assert!(table().resolve_name("school_admin").is_ok());
    }

    #[test]
    fn role_with_no_grants_resolves_to_empty_set() {
        let empty = PermissionSet::new();
        let grants: HashMap<Role, PermissionSet> =
            Role::ALL.into_iter().map(|r| (r, empty.clone())).collect();

        let table = RoleAssignmentTable::from_grants(grants, PermissionSet::new()).unwrap();
        let resolved = table.resolve(Role::IndividualUser).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn validation_rejects_role_missing_base_grants() {
        let base: PermissionSet = [Permission::RETRIEVE_BOOK].into_iter().collect();
        let mut grants: HashMap<Role, PermissionSet> =
            Role::ALL.into_iter().map(|r| (r, base.clone())).collect();
        grants.insert(Role::SchoolAdmin, PermissionSet::new());

        let err = RoleAssignmentTable::from_grants(grants, PermissionSet::new()).unwrap_err();
        assert!(matches!(
            err,
            RoleTableError::MissingBaseGrants { role: Role::SchoolAdmin, .. }
        ));
    }

    #[test]
    fn validation_rejects_admin_with_extra_tokens() {
        let base: PermissionSet = [Permission::RETRIEVE_BOOK].into_iter().collect();
        let mut grants: HashMap<Role, PermissionSet> =
            Role::ALL.into_iter().map(|r| (r, base.clone())).collect();
        grants.insert(Role::Admin, base.clone().with([Permission::DELETE_FAQ]));

        let err = RoleAssignmentTable::from_grants(grants, PermissionSet::new()).unwrap_err();
        match err {
            RoleTableError::AdminMismatch { missing, extra } => {
                assert!(missing.is_empty());
                assert_eq!(extra, vec!["faq.delete".to_string()]);
            }
            other => panic!("expected AdminMismatch, got {other:?}"),
        }
    }

    #[test]
    fn validation_rejects_missing_role() {
        let grants = HashMap::from([(Role::IndividualUser, PermissionSet::new())]);
        let err = RoleAssignmentTable::from_grants(grants, PermissionSet::new()).unwrap_err();
        assert!(matches!(err, RoleTableError::MissingRole(_)));
    }

    #[test]
    fn roles_granting_lists_roles_in_order() {
        assert_eq!(
            table().roles_granting(&Permission::UPDATE_SCHOOL),
            vec![Role::Admin, Role::SchoolAdmin]
        );
        assert_eq!(table().roles_granting(&Permission::RETRIEVE_BOOK).len(), 5);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_role() -> impl Strategy<Value = Role> {
            prop::sample::select(Role::ALL.to_vec())
        }

        fn any_permission() -> impl Strategy<Value = Permission> {
            prop::sample::select(Permission::all().collect::<Vec<_>>())
        }

        proptest! {
            /// Property: anything the individual user may do, every role may do.
            #[test]
            fn base_grants_are_inherited(role in any_role(), perm in any_permission()) {
                let table = RoleAssignmentTable::global().unwrap();
                let base = table.resolve(Role::IndividualUser).unwrap();
                if base.contains(&perm) {
                    prop_assert!(table.resolve(role).unwrap().contains(&perm));
                }
            }

            /// Property: anything some role may do, the admin may do.
            #[test]
            fn admin_dominates(role in any_role(), perm in any_permission()) {
                let table = RoleAssignmentTable::global().unwrap();
                if table.resolve(role).unwrap().contains(&perm) {
                    prop_assert!(table.resolve(Role::Admin).unwrap().contains(&perm));
                }
            }

            /// Property: role names round-trip through parsing.
            #[test]
            fn role_names_round_trip(role in any_role()) {
                prop_assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            }
        }
    }
}

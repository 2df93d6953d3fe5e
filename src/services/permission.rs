//! Pure in-memory permission resolution.
//!
//! A user's effective permission set is the flat union of every assigned
//! role's permissions. There is no hierarchy and no precedence between
//! roles.
//!
//! All checks run against a materialized [`UserAccess`] aggregate loaded
//! once by the role repository; nothing here touches the store.

use std::collections::HashSet;

use crate::db::UserAccess;

/// Flatten the aggregate into the effective (resource, action) set.
#[must_use]
pub fn flatten(access: &UserAccess) -> HashSet<(String, String)> {
    access
        .roles
        .iter()
        .flat_map(|grant| grant.permissions.iter().cloned())
        .collect()
}

/// Set-membership test against the flattened permissions.
#[must_use]
pub fn has_permission(access: &UserAccess, resource: &str, action: &str) -> bool {
    access.roles.iter().any(|grant| {
        grant
            .permissions
            .iter()
            .any(|(r, a)| r == resource && a == action)
    })
}

/// True if the user holds at least one of the named roles.
#[must_use]
pub fn has_any_role(access: &UserAccess, role_names: &[&str]) -> bool {
    access
        .roles
        .iter()
        .any(|grant| role_names.contains(&grant.role.as_str()))
}

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};

use crate::entities::{permissions, role_permissions, roles, user_roles};

/// A role together with its fully materialized permission set.
#[derive(Debug, Clone)]
pub struct RoleGrant {
    pub role: String,
    pub permissions: Vec<(String, String)>,
}

/// A user's assigned roles with their permissions, loaded up front so the
/// permission resolver never touches the store.
#[derive(Debug, Clone, Default)]
pub struct UserAccess {
    pub roles: Vec<RoleGrant>,
}

pub struct RoleRepository {
    conn: DatabaseConnection,
}

impl RoleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Materialize the user → roles → permissions aggregate in two query
    /// passes. No lazy traversal; authorization checks afterwards are pure
    /// in-memory set operations.
    pub async fn load_user_access(&self, user_id: i32) -> Result<UserAccess> {
        let assigned: Vec<(user_roles::Model, Option<roles::Model>)> = user_roles::Entity::find()
            .filter(user_roles::Column::UserId.eq(user_id))
            .find_also_related(roles::Entity)
            .all(&self.conn)
            .await
            .context("Failed to load user roles")?;

        let mut grants = Vec::with_capacity(assigned.len());

        for (_, role) in assigned {
            let Some(role) = role else { continue };

            let perms: Vec<(role_permissions::Model, Option<permissions::Model>)> =
                role_permissions::Entity::find()
                    .filter(role_permissions::Column::RoleId.eq(role.id))
                    .find_also_related(permissions::Entity)
                    .all(&self.conn)
                    .await
                    .context("Failed to load role permissions")?;

            grants.push(RoleGrant {
                role: role.name,
                permissions: perms
                    .into_iter()
                    .filter_map(|(_, p)| p.map(|p| (p.resource, p.action)))
                    .collect(),
            });
        }

        Ok(UserAccess { roles: grants })
    }

    /// Assign a built-in role to a user by role name.
    pub async fn assign_role(&self, user_id: i32, role_name: &str) -> Result<()> {
        Self::assign_role_on(&self.conn, user_id, role_name).await
    }

    pub async fn assign_role_on<C: ConnectionTrait>(
        conn: &C,
        user_id: i32,
        role_name: &str,
    ) -> Result<()> {
        let role = roles::Entity::find()
            .filter(roles::Column::Name.eq(role_name))
            .one(conn)
            .await
            .context("Failed to look up role")?
            .ok_or_else(|| anyhow::anyhow!("Role not found: {role_name}"))?;

        let model = user_roles::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role.id),
            ..Default::default()
        };

        model
            .insert(conn)
            .await
            .context("Failed to assign role")?;

        Ok(())
    }
}

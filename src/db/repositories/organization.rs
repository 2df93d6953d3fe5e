use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};

use crate::entities::organizations;

#[derive(Debug, Clone)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub owner_user_id: i32,
    pub subscription_tier: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<organizations::Model> for Organization {
    fn from(model: organizations::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            owner_user_id: model.owner_user_id,
            subscription_tier: model.subscription_tier,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

pub struct OrganizationRepository {
    conn: DatabaseConnection,
}

impl OrganizationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Organization>> {
        let org = organizations::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query organization by id")?;

        Ok(org.map(Organization::from))
    }

    /// Create an organization. The owner user id is stamped in afterwards
    /// because the owner row references the organization in turn.
    /// Connection-generic so registration can run the whole
    /// organization/owner sequence inside one transaction.
    pub async fn create_on<C: ConnectionTrait>(
        conn: &C,
        name: &str,
        slug: &str,
    ) -> Result<Organization> {
        let now = Utc::now();

        let model = organizations::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            owner_user_id: Set(0),
            subscription_tier: Set("free".to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model
            .insert(conn)
            .await
            .context("Failed to insert organization")?;

        Ok(Organization::from(inserted))
    }

    pub async fn set_owner_on<C: ConnectionTrait>(
        conn: &C,
        org_id: i32,
        owner_user_id: i32,
    ) -> Result<()> {
        let org = organizations::Entity::find_by_id(org_id)
            .one(conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Organization not found: {org_id}"))?;

        let mut active: organizations::ActiveModel = org.into();
        active.owner_user_id = Set(owner_user_id);
        active.updated_at = Set(Utc::now());
        active.update(conn).await?;

        Ok(())
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let count = organizations::Entity::find()
            .filter(organizations::Column::Slug.eq(slug))
            .count(&self.conn)
            .await
            .context("Failed to count organizations by slug")?;

        Ok(count > 0)
    }
}

/// Derive a URL-safe slug from an organization name.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;

    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("Acme"), "acme");
        assert_eq!(slugify("Acme Games, Inc."), "acme-games-inc");
        assert_eq!(slugify("  Über Keys  "), "über-keys");
        assert_eq!(slugify("---"), "");
    }
}

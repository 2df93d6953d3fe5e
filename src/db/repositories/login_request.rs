use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{LoginRequestStatus, UserType};
use crate::entities::{login_requests, users};

#[derive(Debug, Clone)]
pub struct LoginRequestRow {
    pub id: String,
    pub user_id: i32,
    pub organization_id: i32,
    pub device_fingerprint_id: Option<i32>,
    pub status: LoginRequestStatus,
    pub approved_by: Option<i32>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<login_requests::Model> for LoginRequestRow {
    fn from(model: login_requests::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            organization_id: model.organization_id,
            device_fingerprint_id: model.device_fingerprint_id,
            status: LoginRequestStatus::parse(&model.status)
                .unwrap_or(LoginRequestStatus::Expired),
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            rejection_reason: model.rejection_reason,
            expires_at: model.expires_at,
            created_at: model.created_at,
        }
    }
}

/// A pending request joined with the requesting user, for the owner's
/// approval queue.
#[derive(Debug, Clone)]
pub struct PendingLoginRequest {
    pub request: LoginRequestRow,
    pub user_email: String,
    pub user_first_name: String,
    pub user_last_name: String,
}

pub struct LoginRequestRepository {
    conn: DatabaseConnection,
}

impl LoginRequestRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: i32,
        organization_id: i32,
        device_fingerprint_id: Option<i32>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<LoginRequestRow> {
        let now = Utc::now();

        let model = login_requests::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id),
            organization_id: Set(organization_id),
            device_fingerprint_id: Set(device_fingerprint_id),
            ip_address: Set(ip_address.map(str::to_string)),
            user_agent: Set(user_agent.map(str::to_string)),
            status: Set(LoginRequestStatus::Pending.as_str().to_string()),
            approved_by: Set(None),
            approved_at: Set(None),
            rejection_reason: Set(None),
            expires_at: Set(expires_at),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert login request")?;

        Ok(LoginRequestRow::from(inserted))
    }

    pub async fn get(&self, id: &str) -> Result<Option<LoginRequestRow>> {
        let row = login_requests::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query login request")?;

        Ok(row.map(LoginRequestRow::from))
    }

    /// Conditional pending → expired transition. Only flips rows that are
    /// still pending and past their deadline, so a concurrent approve and a
    /// concurrent expiry check cannot both win.
    pub async fn expire_if_pending(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = login_requests::Entity::update_many()
            .col_expr(
                login_requests::Column::Status,
                Expr::value(LoginRequestStatus::Expired.as_str()),
            )
            .col_expr(login_requests::Column::UpdatedAt, Expr::value(now))
            .filter(login_requests::Column::Id.eq(id))
            .filter(login_requests::Column::Status.eq(LoginRequestStatus::Pending.as_str()))
            .filter(login_requests::Column::ExpiresAt.lt(now))
            .exec(&self.conn)
            .await
            .context("Failed to expire login request")?;

        Ok(result.rows_affected > 0)
    }

    /// Conditional pending → approved transition stamping the approver.
    pub async fn approve_if_pending(
        &self,
        id: &str,
        approver_user_id: i32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = login_requests::Entity::update_many()
            .col_expr(
                login_requests::Column::Status,
                Expr::value(LoginRequestStatus::Approved.as_str()),
            )
            .col_expr(login_requests::Column::ApprovedBy, Expr::value(approver_user_id))
            .col_expr(login_requests::Column::ApprovedAt, Expr::value(now))
            .col_expr(login_requests::Column::UpdatedAt, Expr::value(now))
            .filter(login_requests::Column::Id.eq(id))
            .filter(login_requests::Column::Status.eq(LoginRequestStatus::Pending.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to approve login request")?;

        Ok(result.rows_affected > 0)
    }

    /// Conditional pending → rejected transition with an optional reason.
    pub async fn reject_if_pending(
        &self,
        id: &str,
        approver_user_id: i32,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = login_requests::Entity::update_many()
            .col_expr(
                login_requests::Column::Status,
                Expr::value(LoginRequestStatus::Rejected.as_str()),
            )
            .col_expr(login_requests::Column::ApprovedBy, Expr::value(approver_user_id))
            .col_expr(
                login_requests::Column::RejectionReason,
                Expr::value(reason.map(str::to_string)),
            )
            .col_expr(login_requests::Column::UpdatedAt, Expr::value(now))
            .filter(login_requests::Column::Id.eq(id))
            .filter(login_requests::Column::Status.eq(LoginRequestStatus::Pending.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to reject login request")?;

        Ok(result.rows_affected > 0)
    }

    /// Conditional approved → expired transition for a blown grace window.
    pub async fn expire_if_approved(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = login_requests::Entity::update_many()
            .col_expr(
                login_requests::Column::Status,
                Expr::value(LoginRequestStatus::Expired.as_str()),
            )
            .col_expr(login_requests::Column::UpdatedAt, Expr::value(now))
            .filter(login_requests::Column::Id.eq(id))
            .filter(login_requests::Column::Status.eq(LoginRequestStatus::Approved.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to expire approved login request")?;

        Ok(result.rows_affected > 0)
    }

    /// Conditional approved → completed transition. Completion is terminal
    /// and never repeatable. Connection-generic so the flip and the
    /// session's refresh-token write land in one transaction.
    pub async fn complete_if_approved_on<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = login_requests::Entity::update_many()
            .col_expr(
                login_requests::Column::Status,
                Expr::value(LoginRequestStatus::Completed.as_str()),
            )
            .col_expr(login_requests::Column::CompletedAt, Expr::value(now))
            .col_expr(login_requests::Column::UpdatedAt, Expr::value(now))
            .filter(login_requests::Column::Id.eq(id))
            .filter(login_requests::Column::Status.eq(LoginRequestStatus::Approved.as_str()))
            .exec(conn)
            .await
            .context("Failed to complete login request")?;

        Ok(result.rows_affected > 0)
    }

    /// Pending requests for an organization's approval queue, restricted to
    /// member-type users. Owners never appear in their own queue.
    pub async fn list_pending_members(
        &self,
        organization_id: i32,
    ) -> Result<Vec<PendingLoginRequest>> {
        let rows: Vec<(login_requests::Model, Option<users::Model>)> =
            login_requests::Entity::find()
                .filter(login_requests::Column::OrganizationId.eq(organization_id))
                .filter(login_requests::Column::Status.eq(LoginRequestStatus::Pending.as_str()))
                .find_also_related(users::Entity)
                .order_by_asc(login_requests::Column::CreatedAt)
                .all(&self.conn)
                .await
                .context("Failed to list pending login requests")?;

        Ok(rows
            .into_iter()
            .filter_map(|(request, user)| {
                let user = user?;
                if user.user_type != UserType::Member.as_str() {
                    return None;
                }
                Some(PendingLoginRequest {
                    request: LoginRequestRow::from(request),
                    user_email: user.email,
                    user_first_name: user.first_name,
                    user_last_name: user.last_name,
                })
            })
            .collect())
    }
}

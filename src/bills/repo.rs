use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::error::ApiError;

/// Bill lifecycle state. Transitions are caller-driven only; nothing moves a
/// bill to `overdue` automatically when its due date passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "bill_status", rename_all = "lowercase")]
pub enum BillStatus {
    Pending,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, FromRow)]
pub struct Bill {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub amount: f64,
    pub due_date: OffsetDateTime,
    pub status: BillStatus,
    pub category: String,
    pub created_at: OffsetDateTime,
    pub user_id: i64,
}

impl Bill {
    pub async fn find_by_id(db: &PgPool, id: i64) -> Result<Option<Bill>, ApiError> {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, title, description, amount, due_date, status, category, created_at, user_id
            FROM bills
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(bill)
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Bill>, ApiError> {
        let bills = sqlx::query_as::<_, Bill>(
            r#"
            SELECT id, title, description, amount, due_date, status, category, created_at, user_id
            FROM bills
            WHERE user_id = $1
            ORDER BY id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(bills)
    }

    /// Insert a bill owned by `user_id`. Status, id and created_at are
    /// assigned by the database; `RETURNING` hands them straight back so the
    /// caller observes the committed row.
    pub async fn create(
        db: &PgPool,
        user_id: i64,
        title: &str,
        description: Option<&str>,
        amount: f64,
        due_date: OffsetDateTime,
        category: &str,
    ) -> Result<Bill, ApiError> {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            INSERT INTO bills (title, description, amount, due_date, category, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, amount, due_date, status, category, created_at, user_id
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(amount)
        .bind(due_date)
        .bind(category)
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(bill)
    }

    /// Overwrite the status field only. `None` when the id is unknown; an
    /// update-if-exists policy, not an error path.
    pub async fn update_status(
        db: &PgPool,
        id: i64,
        status: BillStatus,
    ) -> Result<Option<Bill>, ApiError> {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            UPDATE bills
            SET status = $2
            WHERE id = $1
            RETURNING id, title, description, amount, due_date, status, category, created_at, user_id
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(db)
        .await?;
        Ok(bill)
    }

    /// Remove the row, returning it as it existed. `None` when the id is
    /// unknown (idempotent delete).
    pub async fn delete(db: &PgPool, id: i64) -> Result<Option<Bill>, ApiError> {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            DELETE FROM bills
            WHERE id = $1
            RETURNING id, title, description, amount, due_date, status, category, created_at, user_id
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&BillStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(serde_json::to_string(&BillStatus::Paid).unwrap(), "\"paid\"");
        assert_eq!(
            serde_json::to_string(&BillStatus::Overdue).unwrap(),
            "\"overdue\""
        );
    }

    #[test]
    fn status_rejects_values_outside_the_domain() {
        assert!(serde_json::from_str::<BillStatus>("\"cancelled\"").is_err());
        assert!(serde_json::from_str::<BillStatus>("\"PENDING\"").is_err());
    }
}

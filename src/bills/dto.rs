use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::bills::repo::{Bill, BillStatus};

/// Write shape. Carries no status or owner field: status always starts as
/// `pending` and ownership comes from the authenticated caller, so neither
/// can be influenced by the request body.
#[derive(Debug, Deserialize)]
pub struct CreateBillRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub due_date: OffsetDateTime,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BillStatus,
}

#[derive(Debug, Serialize)]
pub struct BillResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub due_date: OffsetDateTime,
    pub status: BillStatus,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_id: i64,
}

impl From<Bill> for BillResponse {
    fn from(b: Bill) -> Self {
        Self {
            id: b.id,
            title: b.title,
            description: b.description,
            amount: b.amount,
            due_date: b.due_date,
            status: b.status,
            category: b.category,
            created_at: b.created_at,
            user_id: b.user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

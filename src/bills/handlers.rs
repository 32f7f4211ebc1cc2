use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    bills::dto::{BillResponse, CreateBillRequest, Pagination, UpdateStatusRequest},
    bills::repo::Bill,
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bills/", get(list_bills).post(create_bill))
        .route("/bills/:id", get(get_bill).delete(delete_bill))
        .route("/bills/:id/status", patch(update_bill_status))
}

#[instrument(skip(state, user, payload))]
pub async fn create_bill(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateBillRequest>,
) -> Result<Json<BillResponse>, ApiError> {
    if payload.amount < 0.0 {
        warn!(amount = payload.amount, "negative bill amount");
        return Err(ApiError::validation("Amount must be non-negative"));
    }

    let bill = Bill::create(
        &state.db,
        user.id,
        &payload.title,
        payload.description.as_deref(),
        payload.amount,
        payload.due_date,
        &payload.category,
    )
    .await?;

    info!(bill_id = bill.id, user_id = user.id, "bill created");
    Ok(Json(bill.into()))
}

#[instrument(skip(state, user))]
pub async fn list_bills(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<BillResponse>>, ApiError> {
    let bills = Bill::list_by_user(&state.db, user.id, p.skip, p.limit).await?;
    Ok(Json(bills.into_iter().map(BillResponse::from).collect()))
}

#[instrument(skip(state, user))]
pub async fn get_bill(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<BillResponse>, ApiError> {
    let bill = owned_bill(&state, &user, id).await?;
    Ok(Json(bill.into()))
}

#[instrument(skip(state, user))]
pub async fn update_bill_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<BillResponse>, ApiError> {
    owned_bill(&state, &user, id).await?;

    let bill = Bill::update_status(&state.db, id, payload.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bill not found".into()))?;

    info!(bill_id = id, status = ?payload.status, "bill status updated");
    Ok(Json(bill.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_bill(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<BillResponse>, ApiError> {
    owned_bill(&state, &user, id).await?;

    let bill = Bill::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bill not found".into()))?;

    info!(bill_id = id, user_id = user.id, "bill deleted");
    Ok(Json(bill.into()))
}

/// Resolve a bill and enforce ownership: 404 for unknown ids, 403 when the
/// bill belongs to another user.
async fn owned_bill(
    state: &AppState,
    user: &crate::users::repo::User,
    id: i64,
) -> Result<Bill, ApiError> {
    let bill = Bill::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bill not found".into()))?;
    if bill.user_id != user.id {
        warn!(bill_id = id, owner = bill.user_id, caller = user.id, "ownership violation");
        return Err(ApiError::Forbidden(
            "Not authorized to access this bill".into(),
        ));
    }
    Ok(bill)
}

//! Request handlers.
//!
//! The inventory handlers are generic over the collection's input type, so
//! one set serves implants, surgical and restorative stock alike. Storage
//! calls block, so they run on the blocking pool.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use dental_clinic_core::db::InventoryRecord;
use dental_clinic_core::validation::InventoryInput;
use dental_clinic_core::{Clinic, ClinicResult};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

async fn blocking<T, F>(state: AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Clinic) -> ClinicResult<T> + Send + 'static,
{
    let clinic = state.clinic;
    let result = tokio::task::spawn_blocking(move || f(&clinic))
        .await
        .map_err(|e| ApiError::Internal(format!("Task failed: {}", e)))?;
    Ok(result?)
}

fn body<I>(payload: Result<Json<I>, JsonRejection>) -> ApiResult<I> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_items<I>(State(state): State<AppState>) -> ApiResult<Json<Vec<I::Item>>>
where
    I: InventoryInput,
    I::Item: InventoryRecord + Serialize + Send + 'static,
{
    let items = blocking(state, |clinic| clinic.list_inventory::<I>()).await?;
    Ok(Json(items))
}

pub async fn create_item<I>(
    State(state): State<AppState>,
    payload: Result<Json<I>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<I::Item>)>
where
    I: InventoryInput,
    I::Item: InventoryRecord + Serialize + Send + 'static,
{
    let input = body(payload)?;
    let item = blocking(state, move |clinic| clinic.create_inventory_item(input)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item<I>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<I>, JsonRejection>,
) -> ApiResult<Json<I::Item>>
where
    I: InventoryInput,
    I::Item: InventoryRecord + Serialize + Send + 'static,
{
    let input = body(payload)?;
    let item = blocking(state, move |clinic| clinic.update_inventory_item(&id, input)).await?;
    Ok(Json(item))
}

pub async fn delete_item<I>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>>
where
    I: InventoryInput,
    I::Item: InventoryRecord + Serialize + Send + 'static,
{
    blocking(state, move |clinic| clinic.delete_inventory_item::<I>(&id)).await?;
    Ok(Json(json!({ "ok": true })))
}

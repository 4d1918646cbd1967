//! Crop log CRUD.
//!
//! `/api/crops/{id}` is a farmer id for `GET` and a crop id for `PUT` and
//! `DELETE`.

use crate::SharedState;
use crate::error::ApiError;
use agromind_core::farm::{Crop, CropUpdate, NewCrop, parse_planting_date};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct CreateCropRequest {
    pub farmer_id: String,
    #[serde(rename = "cropName")]
    pub crop_name: String,
    #[serde(rename = "plantingDate")]
    pub planting_date: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCropRequest {
    #[serde(rename = "cropName")]
    pub crop_name: String,
    #[serde(rename = "plantingDate")]
    pub planting_date: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn validated(crop_name: &str, planting_date: &str) -> Result<NaiveDate, ApiError> {
    if crop_name.trim().is_empty() {
        return Err(ApiError::validation("cropName is required"));
    }
    parse_planting_date(planting_date).ok_or_else(|| {
        ApiError::validation(format!(
            "plantingDate '{planting_date}' is not a YYYY-MM-DD date"
        ))
    })
}

pub async fn list_crops_handler(
    State(state): State<SharedState>,
    Path(farmer_id): Path<String>,
) -> Result<Json<Vec<Crop>>, ApiError> {
    Ok(Json(state.store.list_crops(&farmer_id).await?))
}

pub async fn create_crop_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CreateCropRequest>,
) -> Result<(StatusCode, Json<Crop>), ApiError> {
    let planting_date = validated(&payload.crop_name, &payload.planting_date)?;

    if state.store.find_farmer(&payload.farmer_id).await?.is_none() {
        return Err(ApiError::not_found("Farmer not found"));
    }

    let crop = state
        .store
        .create_crop(NewCrop {
            farmer_id: payload.farmer_id,
            crop_name: payload.crop_name,
            planting_date,
        })
        .await?;

    debug!(crop_id = %crop.id, farmer_id = %crop.farmer_id, "Crop logged");
    Ok((StatusCode::CREATED, Json(crop)))
}

pub async fn update_crop_handler(
    State(state): State<SharedState>,
    Path(crop_id): Path<String>,
    Json(payload): Json<UpdateCropRequest>,
) -> Result<Json<Crop>, ApiError> {
    let planting_date = validated(&payload.crop_name, &payload.planting_date)?;

    state
        .store
        .update_crop(
            &crop_id,
            CropUpdate {
                crop_name: payload.crop_name,
                planting_date,
            },
        )
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Crop not found"))
}

pub async fn delete_crop_handler(
    State(state): State<SharedState>,
    Path(crop_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.store.delete_crop(&crop_id).await? {
        return Err(ApiError::not_found("Crop not found"));
    }
    Ok(Json(MessageResponse {
        message: "Crop deleted successfully".into(),
    }))
}

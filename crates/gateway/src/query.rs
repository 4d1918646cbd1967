//! `POST /api/query` — the advisory endpoint.
//!
//! A missing farmer is a 404 and bad input a 400. Any other failure is
//! logged and answered with the fixed failure reply and status 200.

use crate::SharedState;
use crate::error::ApiError;
use agromind_advisor::{AdvisoryReply, AdvisoryRequest};
use agromind_core::error::Error;
use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub farmer_id: String,
    pub query: String,
    #[serde(default)]
    pub image: Option<String>,
}

pub async fn query_handler(
    State(state): State<SharedState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<AdvisoryReply>, ApiError> {
    let advisor = state.advisor.clone().ok_or_else(|| {
        ApiError(Error::NotConfigured(
            "Advisory queries need a model provider API key".into(),
        ))
    })?;

    let result = advisor
        .advise(AdvisoryRequest {
            farmer_id: payload.farmer_id,
            query: payload.query,
            image: payload.image,
        })
        .await;

    match result {
        Ok(outcome) => Ok(Json(outcome.into_reply())),
        Err(Error::NotFound(_)) => Err(ApiError::not_found("Farmer not found.")),
        Err(Error::Validation(msg)) => Err(ApiError::validation(msg)),
        Err(e) => {
            error!(error = %e, "Error processing query");
            Ok(Json(AdvisoryReply::failure()))
        }
    }
}

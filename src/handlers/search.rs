use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::Result;
use crate::search::{SearchRequest, SearchResponse};
use crate::state::AppState;

pub async fn search_facilities(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let response = state.search.run(request).await?;
    Ok(Json(response))
}

pub async fn facility_details(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> Result<Json<Value>> {
    let details = state.search.facility_details(&place_id).await?;
    Ok(Json(json!({
        "place_id": place_id,
        "details": details,
        "timestamp": Utc::now(),
    })))
}

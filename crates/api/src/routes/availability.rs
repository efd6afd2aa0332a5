use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use slotline_domain::{AvailabilitySuggestion, WorkingHoursPolicy};

use super::finish;
use crate::context::AppContext;
use crate::errors::ApiError;
use crate::identity::CallerIdentity;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestAvailabilityRequest {
    /// Falls back to the policy's default meeting duration.
    pub duration_minutes: Option<u32>,
}

pub async fn suggest_availability(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
    payload: Option<Json<SuggestAvailabilityRequest>>,
) -> Result<Json<AvailabilitySuggestion>, ApiError> {
    let started = Instant::now();
    let duration_minutes = payload.and_then(|Json(body)| body.duration_minutes);

    let result = context.availability.suggest(caller.user_id(), duration_minutes).await;
    finish("suggest_availability", started, result).map(Json)
}

pub async fn get_policy(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
) -> Result<Json<WorkingHoursPolicy>, ApiError> {
    let started = Instant::now();
    let result = context.availability.policy_for(caller.user_id()).await;
    finish("get_availability_policy", started, result).map(Json)
}

pub async fn update_policy(
    State(context): State<Arc<AppContext>>,
    caller: CallerIdentity,
    Json(policy): Json<WorkingHoursPolicy>,
) -> Result<Json<WorkingHoursPolicy>, ApiError> {
    let started = Instant::now();
    let result = context.availability.update_policy(caller.user_id(), policy).await;
    finish("update_availability_policy", started, result).map(Json)
}

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::services::analytics_service::AnalyticsService;
use crate::services::AppState;

/// GET /admin/analytics
pub async fn get_admin_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let analytics = AnalyticsService::new(state.mongo.clone(), &state.config)
        .get_admin_analytics()
        .await?;
    Ok(Json(json!({ "analytics": analytics })))
}

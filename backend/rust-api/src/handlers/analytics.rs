use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::extractors::ValidatedJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::analytics::UpdateAnalyticsRequest;
use crate::models::GameType;
use crate::services::analytics_service::AnalyticsService;
use crate::services::AppState;

fn service(state: &AppState) -> AnalyticsService {
    AnalyticsService::new(state.mongo.clone(), &state.config)
}

/// GET /api/v1/analytics
pub async fn get_user_analytics(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let analytics = service(&state).get_user_analytics(&claims.sub).await?;
    Ok(Json(json!({ "analytics": analytics })))
}

/// GET /api/v1/analytics/{game_type}
pub async fn get_game_analytics(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(game_type): Path<GameType>,
) -> Result<impl IntoResponse, ApiError> {
    let analytics = service(&state)
        .get_game_analytics(&claims.sub, game_type)
        .await?;
    Ok(Json(json!({ "analytics": analytics })))
}

/// POST /api/v1/analytics/update
///
/// Synchronous re-derivation for one (game, level). The usual path is the
/// background trigger on submission; this exists for clients that want the
/// derived record immediately.
pub async fn update_analytics(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(req): ValidatedJson<UpdateAnalyticsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = service(&state)
        .update_analytics(&claims.sub, req.game_type, req.level)
        .await?;
    Ok(Json(json!({ "analytics": record })))
}

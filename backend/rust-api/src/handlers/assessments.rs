use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::errors::ApiError;
use crate::extractors::ValidatedJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::assessment::{GenerateAssessmentRequest, SubmitAssessmentRequest};
use crate::models::GameType;
use crate::services::assessment_service::AssessmentService;
use crate::services::AppState;

fn service(state: &AppState) -> AssessmentService {
    AssessmentService::new(
        state.mongo.clone(),
        state.redis.clone(),
        state.config.clone(),
    )
}

/// POST /api/v1/assessments/generate
///
/// Returns 201 for a freshly generated assessment, 200 when an unsubmitted
/// one is served from cache.
pub async fn generate_assessment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(req): ValidatedJson<GenerateAssessmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (assessment, created) = service(&state).generate(&claims.sub, &req).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "assessment": assessment }))))
}

/// POST /api/v1/assessments/submit
pub async fn submit_assessment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    ValidatedJson(req): ValidatedJson<SubmitAssessmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = service(&state).submit(&claims.sub, &req).await?;
    Ok(Json(json!({ "assessment": result })))
}

/// GET /api/v1/assessments
pub async fn list_assessments(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let assessments = service(&state).list_all(&claims.sub).await?;
    Ok(Json(json!({ "assessments": assessments })))
}

/// GET /api/v1/assessments/{id}
pub async fn get_assessment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let assessment = service(&state).get(&claims.sub, &id).await?;
    Ok(Json(json!({ "assessment": assessment })))
}

/// GET /api/v1/assessments/game/{game_type}/{level}
pub async fn get_game_assessments(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path((game_type, level)): Path<(GameType, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let assessments = service(&state)
        .list_for_game(&claims.sub, game_type, level)
        .await?;
    Ok(Json(json!({ "assessments": assessments })))
}

/// DELETE /api/v1/assessments/{id}
pub async fn delete_assessment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    service(&state).delete(&claims.sub, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

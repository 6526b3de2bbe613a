use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Protected endpoints (require JWT)
        .nest(
            "/api/v1/assessments",
            assessments_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/api/v1/analytics",
            analytics_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware)) // Apply CSP to all responses
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn assessments_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/generate", post(handlers::assessments::generate_assessment))
        .route("/submit", post(handlers::assessments::submit_assessment))
        .route("/", get(handlers::assessments::list_assessments))
        // Literal /game prefix keeps the tuple route from clashing with /{id}
        .route(
            "/game/{game_type}/{level}",
            get(handlers::assessments::get_game_assessments),
        )
        .route(
            "/{id}",
            get(handlers::assessments::get_assessment)
                .delete(handlers::assessments::delete_assessment),
        )
}

fn analytics_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", get(handlers::analytics::get_user_analytics))
        .route("/update", post(handlers::analytics::update_analytics))
        .route("/{game_type}", get(handlers::analytics::get_game_analytics))
}

fn admin_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/analytics", get(handlers::admin::get_admin_analytics))
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
}

//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{SheetsAdapter, UserInfoAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, refresh_handler},
        change_config_handler, create_school_handler, create_student_handler, dashboard_handler,
        delete_student_handler, list_students_handler, master_handler, query_students_handler,
        record_visit_handler, replace_master_handler, require_auth,
        rest::ApiDoc,
        state::AppState,
        update_notes_handler, update_student_handler,
    },
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let store = Arc::new(SheetsAdapter::new(
        &config.sheets_api_base,
        &config.spreadsheet_id,
    ));
    let identity = Arc::new(UserInfoAdapter::new(&config.userinfo_url));

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(store, identity, config.clone()));

    // The client authenticates with a bearer token, so no cookies cross
    // origins and the CORS policy can stay permissive.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // --- 4. Create the Web Router ---
    // Public routes (no session required)
    let public_routes = Router::new().route("/auth/login", post(login_handler));

    // Protected routes (session required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(logout_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route(
            "/students",
            get(list_students_handler).post(create_student_handler),
        )
        .route("/students/query", post(query_students_handler))
        .route(
            "/students/{id}",
            put(update_student_handler).delete(delete_student_handler),
        )
        .route("/students/{id}/visit", put(record_visit_handler))
        .route("/students/{id}/notes", put(update_notes_handler))
        .route("/dashboard", post(dashboard_handler))
        .route("/master", get(master_handler).put(replace_master_handler))
        .route("/schools", post(create_school_handler))
        .route("/config/changes", post(change_config_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

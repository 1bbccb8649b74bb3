//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification. The presentation layer only
//! reads projections produced here and calls back into the mutation
//! endpoints; it never touches the session collections directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use recruit_core::domain::{ConfigChange, ConfigData, SchoolData, StudentProfile, VisitOutcome};
use recruit_core::ports::PortError;
use recruit_core::query::{filter_students, sort_students, DashboardSummary, FilterState, SortState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};

use crate::web::auth::{LoginRequest, LoginResponse};
use crate::web::middleware::AuthContext;
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        delete_student_handler,
        update_notes_handler,
    ),
    components(
        schemas(LoginRequest, LoginResponse, NotesRequest)
    ),
    tags(
        (name = "Recruitment Tracker API", description = "API endpoints for the scholarship recruitment dashboard.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub filter: FilterState,
    pub sort: Option<SortState>,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub total: usize,
    pub students: Vec<StudentProfile>,
}

#[derive(Deserialize, ToSchema)]
pub struct NotesRequest {
    pub notes: String,
}

#[derive(Deserialize)]
pub struct MasterPayload {
    pub schools: Vec<SchoolData>,
    pub clubs: Vec<String>,
    pub recruiters: Vec<String>,
}

#[derive(Serialize)]
pub struct MasterResponse {
    pub schools: Vec<SchoolData>,
    pub clubs: Vec<String>,
    pub recruiters: Vec<String>,
    pub config: ConfigData,
}

/// Maps a port failure to the response the client surfaces. The local
/// optimistic mutation has already been rolled back by the time a handler
/// sees one of these.
pub(crate) fn port_error_response(err: &PortError) -> (StatusCode, String) {
    match err {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {what}")),
        PortError::PermissionDenied(what) => {
            (StatusCode::FORBIDDEN, format!("Access denied: {what}"))
        }
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(what) => (
            StatusCode::BAD_GATEWAY,
            format!("Backend write failed: {what}"),
        ),
    }
}

//=========================================================================================
// Student Handlers
//=========================================================================================

/// GET /students - the full list in entry order.
pub async fn list_students_handler(
    Extension(ctx): Extension<AuthContext>,
) -> Json<Vec<StudentProfile>> {
    let session = ctx.session.read().await;
    Json(session.roster.students.clone())
}

/// POST /students/query - filtered and sorted projection of the list.
pub async fn query_students_handler(
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let session = ctx.session.read().await;
    let mut students = filter_students(&session.roster.students, &req.filter, &session.roster.config);
    if let Some(sort) = req.sort {
        sort_students(&mut students, sort, &session.roster.config);
    }
    Json(QueryResponse {
        total: students.len(),
        students,
    })
}

/// POST /students - create a record. The identifier and sequence number in
/// the payload are ignored; both are assigned here.
pub async fn create_student_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(draft): Json<StudentProfile>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = ctx.session.write().await;
    let created = state
        .sync
        .create_student(&mut session.roster, &ctx.access_token, draft)
        .await
        .map_err(|e| {
            error!("Failed to create student: {:?}", e);
            port_error_response(&e)
        })?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /students/{id} - full-record overwrite.
pub async fn update_student_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(mut record): Json<StudentProfile>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    record.id = id;
    let mut session = ctx.session.write().await;
    let updated = state
        .sync
        .update_student(&mut session.roster, &ctx.access_token, record)
        .await
        .map_err(|e| {
            error!("Failed to update student: {:?}", e);
            port_error_response(&e)
        })?;
    Ok(Json(updated))
}

/// DELETE /students/{id} - remove a record. Unknown identifiers are a
/// no-op, so repeated deletes are safe.
#[utoipa::path(
    delete,
    path = "/students/{id}",
    params(("id" = String, Path, description = "Student identifier")),
    responses(
        (status = 204, description = "Deleted (or already absent)"),
        (status = 502, description = "Backend write failed; local state restored")
    )
)]
pub async fn delete_student_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = ctx.session.write().await;
    state
        .sync
        .delete_student(&mut session.roster, &ctx.access_token, &id)
        .await
        .map_err(|e| {
            error!("Failed to delete student: {:?}", e);
            port_error_response(&e)
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /students/{id}/visit - record a visit outcome. A declined visit
/// updates the visit date and the result together in one write.
pub async fn record_visit_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(outcome): Json<VisitOutcome>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = ctx.session.write().await;
    let updated = state
        .sync
        .record_visit(&mut session.roster, &ctx.access_token, &id, &outcome)
        .await
        .map_err(|e| {
            error!("Failed to record visit outcome: {:?}", e);
            port_error_response(&e)
        })?;
    Ok(Json(updated))
}

/// PUT /students/{id}/notes - save the detail-view memo.
#[utoipa::path(
    put,
    path = "/students/{id}/notes",
    request_body = NotesRequest,
    params(("id" = String, Path, description = "Student identifier")),
    responses(
        (status = 200, description = "Notes saved"),
        (status = 404, description = "Unknown student"),
        (status = 502, description = "Backend write failed; local state restored")
    )
)]
pub async fn update_notes_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<NotesRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = ctx.session.write().await;
    let updated = state
        .sync
        .update_notes(&mut session.roster, &ctx.access_token, &id, &req.notes)
        .await
        .map_err(|e| {
            error!("Failed to save notes: {:?}", e);
            port_error_response(&e)
        })?;
    Ok(Json(updated))
}

//=========================================================================================
// Dashboard Handler
//=========================================================================================

/// POST /dashboard - aggregated counts and the recruitment funnel over the
/// filtered set.
pub async fn dashboard_handler(
    Extension(ctx): Extension<AuthContext>,
    Json(filter): Json<FilterState>,
) -> Json<DashboardSummary> {
    let session = ctx.session.read().await;
    let roster = &session.roster;
    let students = filter_students(&roster.students, &filter, &roster.config);
    Json(DashboardSummary::compute(
        &students,
        &roster.clubs,
        &roster.config,
    ))
}

//=========================================================================================
// Master Data Handlers
//=========================================================================================

/// GET /master - schools, clubs, recruiters and configuration.
pub async fn master_handler(Extension(ctx): Extension<AuthContext>) -> Json<MasterResponse> {
    let session = ctx.session.read().await;
    let roster = &session.roster;
    Json(MasterResponse {
        schools: roster.schools.clone(),
        clubs: roster.clubs.clone(),
        recruiters: roster.recruiters.clone(),
        config: roster.config.clone(),
    })
}

/// POST /schools - create a school; its code is assigned here. Pushes the
/// whole master set, as every master mutation does.
pub async fn create_school_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(draft): Json<SchoolData>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = ctx.session.write().await;
    let created = state
        .sync
        .add_school(&mut session.roster, &ctx.access_token, draft)
        .await
        .map_err(|e| {
            error!("Failed to add school: {:?}", e);
            port_error_response(&e)
        })?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /master - replace schools, clubs and recruiters wholesale. The
/// master view edits its local copies and submits everything at once;
/// concurrent editors overwrite each other (single-editor assumption).
pub async fn replace_master_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<MasterPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = ctx.session.write().await;
    state
        .sync
        .replace_master(
            &mut session.roster,
            &ctx.access_token,
            payload.schools,
            payload.clubs,
            payload.recruiters,
        )
        .await
        .map_err(|e| {
            error!("Failed to sync master data: {:?}", e);
            port_error_response(&e)
        })?;
    Ok(StatusCode::OK)
}

/// POST /config/changes - apply one vocabulary or target change and push
/// the full configuration.
pub async fn change_config_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(change): Json<ConfigChange>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = ctx.session.write().await;
    let updated = state
        .sync
        .change_config(&mut session.roster, &ctx.access_token, &change)
        .await
        .map_err(|e| {
            error!("Failed to update configuration: {:?}", e);
            port_error_response(&e)
        })?;
    for warning in updated.validate() {
        warn!("config: {warning}");
    }
    Ok(Json(updated))
}

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::profile::Profile;
use crate::domain::report::{AddReportPayload, Report, ReportFieldsPayload};
use crate::error::ApiError;
use crate::infra::postgrest::TableRequest;
use crate::middleware::auth::SessionToken;
use crate::security::jwt::Claims;
use crate::state::AppState;

/// Admin insert. Ownership fields are required; everything else
/// defaults to empty, and the report date defaults to now.
pub async fn add_report(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddReportPayload>,
) -> Result<Json<Value>, ApiError> {
    let new_report = payload.into_new_report(OffsetDateTime::now_utc())?;
    let report: Report = TableRequest::service(&state.supabase, "reports")
        .insert(&new_report)
        .await?;
    Ok(Json(json!({ "success": true, "report": report })))
}

#[derive(Deserialize)]
pub struct EditReportPayload {
    id: Option<Uuid>,
    #[serde(flatten)]
    fields: ReportFieldsPayload,
}

/// Admin edit: a full overwrite of the content columns by report id.
/// Ownership and the signature flag are left as they are.
pub async fn edit_report(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EditReportPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Report ID is missing".into()))?;
    let content = payload.fields.normalize(OffsetDateTime::now_utc());

    let rows: Vec<Report> = TableRequest::service(&state.supabase, "reports")
        .eq("id", id)
        .update(&content)
        .await?;
    let report = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound("Report not found".into()))?;
    Ok(Json(json!({ "success": true, "report": report })))
}

#[derive(Deserialize)]
pub struct ReportIdPayload {
    id: Option<Uuid>,
}

pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ReportIdPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Report ID is missing".into()))?;
    TableRequest::service(&state.supabase, "reports")
        .eq("id", id)
        .delete()
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct StudentReportsQuery {
    email: Option<String>,
}

/// Admin detail view: all reports for one student, newest first.
pub async fn admin_reports_for_student(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StudentReportsQuery>,
) -> Result<Json<Value>, ApiError> {
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("email is required".into()))?;
    let reports: Vec<Report> = TableRequest::service(&state.supabase, "reports")
        .eq("user_email", &email)
        .order("created_at", false)
        .fetch()
        .await?;
    Ok(Json(json!({ "success": true, "reports": reports })))
}

/// The student's own profile row, read with the student's own token so
/// row-level security stays the gate.
pub async fn my_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<Json<Profile>, ApiError> {
    let profile: Profile = TableRequest::with_token(&state.supabase, "profiles", &token)
        .eq("id", &claims.sub)
        .fetch_one("Profile not found")
        .await?;
    Ok(Json(profile))
}

pub async fn my_reports(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<Json<Value>, ApiError> {
    let reports: Vec<Report> = TableRequest::with_token(&state.supabase, "reports", &token)
        .eq("user_id", &claims.sub)
        .order("created_at", false)
        .fetch()
        .await?;
    Ok(Json(json!({ "reports": reports })))
}

#[derive(Deserialize)]
pub struct ReportIdQuery {
    id: Option<Uuid>,
}

/// One report by id. Rows the caller does not own are invisible under
/// row-level security, so a mismatched owner is a plain not-found.
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    Query(query): Query<ReportIdQuery>,
) -> Result<Json<Report>, ApiError> {
    let id = query
        .id
        .ok_or_else(|| ApiError::Validation("Report ID is missing".into()))?;
    let report: Option<Report> = TableRequest::with_token(&state.supabase, "reports", &token)
        .eq("id", id)
        .fetch_optional()
        .await?;
    report
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Report not found".into()))
}

/// Acknowledge a report. The transition is one-directional; signing an
/// already-signed report just leaves it signed.
pub async fn sign_report(
    State(state): State<Arc<AppState>>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    Json(payload): Json<ReportIdPayload>,
) -> Result<Json<Value>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::Validation("Report ID is missing".into()))?;
    let rows: Vec<Report> = TableRequest::with_token(&state.supabase, "reports", &token)
        .eq("id", id)
        .update(&json!({ "parent_sign": true }))
        .await?;
    let report = rows
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound("Report not found".into()))?;
    Ok(Json(json!({ "success": true, "report": report })))
}

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::middleware as mw;
use crate::state::AppState;

mod auth;
mod reports;
mod users;

pub fn router(state: Arc<AppState>) -> Router {
    let admin_api = Router::new()
        .route("/api/admin/addUser", post(users::add_user))
        .route("/api/admin/editUser", post(users::edit_user))
        .route("/api/admin/deleteUser", post(users::delete_user))
        .route("/api/admin/add-report", post(reports::add_report))
        .route("/api/admin/edit-report", post(reports::edit_report))
        .route("/api/admin/delete-report", post(reports::delete_report))
        .route("/api/admin/get-reports", get(reports::admin_reports_for_student))
        .route("/api/get-students", post(users::get_students))
        .route("/api/get-user-by-email", get(users::get_user_by_email))
        .route("/api/make-admin", post(users::make_admin))
        .layer(from_fn_with_state(state.clone(), mw::admin::require_admin))
        .layer(from_fn_with_state(state.clone(), mw::auth::require_session));

    let session_api = Router::new()
        .route("/api/check-admin-role", post(users::check_admin_role))
        .route("/api/my-profile", get(reports::my_profile))
        .route("/api/my-reports", get(reports::my_reports))
        .route("/api/get-report", get(reports::get_report))
        .route("/api/sign-report", post(reports::sign_report))
        .layer(from_fn_with_state(state.clone(), mw::auth::require_session));

    Router::new()
        .merge(auth::router(state.clone()))
        .merge(admin_api)
        .merge(session_api)
        .with_state(state)
}

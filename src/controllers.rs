use super::{
    auth,
    errors::ApiError,
    extractors::{ApiJson, AuthenticatedUser},
    models::{AppState, NoteDraft, NotePatch, NoteView},
    notes,
};
use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "API is working!",
        "timestamp": Utc::now(),
    }))
}

pub async fn health(
    State(AppState { notes: store, .. }): State<AppState>,
) -> impl IntoResponse {
    let database = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("health check cannot reach the database: {e:#}");
            false
        }
    };

    let message = if database {
        "Server is healthy"
    } else {
        "Server is running, database is unreachable"
    };

    Json(json!({
        "status": "OK",
        "message": message,
        "database": database,
        "timestamp": Utc::now(),
    }))
}

pub async fn test_route(
    State(AppState { config, .. }): State<AppState>,
) -> impl IntoResponse {
    Json(json!({
        "message": "Test route working",
        "environment": config.environment.as_str(),
    }))
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "path": uri.path(),
        })),
    )
}

#[derive(Deserialize)]
pub struct RegisterForm {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

pub async fn register(
    State(AppState { users, config, .. }): State<AppState>,
    ApiJson(form): ApiJson<RegisterForm>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = auth::register(
        users.as_ref(),
        &config,
        form.username,
        form.email,
        form.password,
        Utc::now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": payload,
        })),
    ))
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: Option<String>,
    password: Option<String>,
}

pub async fn login(
    State(AppState { users, config, .. }): State<AppState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = auth::authenticate(
        users.as_ref(),
        &config,
        form.email,
        form.password,
        Utc::now(),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "data": payload,
    })))
}

pub async fn list_notes(
    State(AppState { notes: store, .. }): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let owned = notes::list(store.as_ref(), &user).await?;
    let data: Vec<NoteView> = owned.iter().map(|n| n.view(now)).collect();

    Ok(Json(json!({
        "success": true,
        "data": data,
        "count": data.len(),
    })))
}

pub async fn create_note(
    State(AppState { notes: store, config, .. }): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    ApiJson(draft): ApiJson<NoteDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let note = notes::create(
        store.as_ref(),
        &user,
        draft,
        now,
        config.reminder_offset,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Note created successfully",
            "data": note.view(now),
        })),
    ))
}

pub async fn update_note(
    State(AppState { notes: store, .. }): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<NotePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let note = notes::update(store.as_ref(), &user, &id, patch, now).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Note updated successfully",
        "data": note.view(now),
    })))
}

pub async fn delete_note(
    State(AppState { notes: store, .. }): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    notes::delete(store.as_ref(), &user, &id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Note deleted successfully",
    })))
}

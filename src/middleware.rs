use super::{
    errors::{ErrorDetail, GENERIC_MESSAGE},
    models::AppState,
};
use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Outside production, put the text of internal errors back into the 500
/// body.
pub async fn error_detail<B>(
    State(state): State<AppState>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let response = next.run(request).await;
    if state.config.environment.is_production() {
        return response;
    }
    let Some(ErrorDetail(detail)) =
        response.extensions().get::<ErrorDetail>().cloned()
    else {
        return response;
    };

    (
        response.status(),
        Json(json!({
            "success": false,
            "message": GENERIC_MESSAGE,
            "error": detail,
        })),
    )
        .into_response()
}

use super::{auth, errors::ApiError, models};
use async_trait::async_trait;
use axum::{
    body::HttpBody,
    extract::{FromRequest, FromRequestParts},
    headers::{authorization::Bearer, Authorization},
    http::{request::Parts, Request},
    BoxError, Json, TypedHeader,
};
use chrono::Utc;
use serde::de::DeserializeOwned;

/// The caller of an authenticated route. Extracting this rejects the request
/// with a 401 before the handler body runs.
pub struct AuthenticatedUser(pub models::User);

#[async_trait]
impl FromRequestParts<models::AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &models::AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(
                parts, state,
            )
            .await
            .map_err(|_| ApiError::Auth("Not authorized, no token".into()))?;

        let user = auth::resolve_token(
            state.users.as_ref(),
            &state.config,
            bearer.token(),
            Utc::now(),
        )
        .await?;

        Ok(AuthenticatedUser(user))
    }
}

/// `Json`, except that a body which doesn't parse is our own 400 instead of
/// axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = ApiError;

    async fn from_request(
        req: Request<B>,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

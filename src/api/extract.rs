use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, OptionalFromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::Identity;

/// Set by the upstream authentication layer for signed-in users.
pub const USER_HEADER: &str = "x-user-id";
/// Anonymous learners are tracked by session key.
pub const SESSION_HEADER: &str = "x-session-key";

/// JSON body whose rejection is reported as a 400 in the API error format.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_error(rejection)),
        }
    }
}

fn json_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonSyntaxError(_) => AppError::BadRequest("Invalid JSON".to_string()),
        other => AppError::BadRequest(other.body_text()),
    }
}

pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    read(USER_HEADER)
        .map(Identity::User)
        .or_else(|| read(SESSION_HEADER).map(Identity::Session))
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers).ok_or_else(|| {
            AppError::Unauthorized(format!(
                "Missing learner identity ({} or {} header)",
                USER_HEADER, SESSION_HEADER
            ))
        })
    }
}

impl<S> OptionalFromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(identity_from_headers(&parts.headers))
    }
}

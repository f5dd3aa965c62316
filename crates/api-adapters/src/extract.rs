//! Request extractors: the viewer behind the bearer token, JSON bodies and
//! id path segments, each rejecting with an `ApiError`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use domains::{AuthProvider, DomainError, Viewer};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// `None` for anonymous requests. A present but invalid credential is a
/// 401, even on endpoints that allow anonymous access.
#[derive(Debug, Clone, Copy)]
pub struct CurrentViewer(pub Option<Viewer>);

impl CurrentViewer {
    pub fn viewer(&self) -> Option<&Viewer> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0.map(|v| v.id)
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub fn resolve_viewer(auth: &dyn AuthProvider, header: Option<&str>) -> Result<Option<Viewer>, DomainError> {
    let Some(raw) = header else {
        return Ok(None);
    };
    let token = bearer_token(raw).ok_or(DomainError::Unauthenticated)?;
    let id = auth.resolve_viewer(token)?;
    Ok(Some(Viewer {
        id,
        is_admin: auth.is_admin(id),
    }))
}

impl FromRequestParts<AppState> for CurrentViewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| DomainError::Unauthenticated)?),
            None => None,
        };
        Ok(Self(resolve_viewer(state.auth.as_ref(), header)?))
    }
}

/// `Json<T>` with the rejection folded into the error envelope.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::MalformedBody {
                status: rejection.status().as_u16(),
                message: rejection.body_text(),
            }),
        }
    }
}

/// A UUID path segment such as `/api/ideas/{id}`.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Uuid);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| Self(id))
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
    }
}

//! # Handlers
//!
//! Thin glue between HTTP and the services: extract, call, map the result.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domains::{
    DomainError, IdeaDetail, IdeaSummary, ProfileOverview, Report, Tag, UserProfile, VoteOutcome,
};
use services::listing::filter_state::parse_query_pairs;
use services::{IdeaInput, ReconcileReport};
use tracing::{info, warn};

use crate::dto::{HealthResponse, ListingResponse, ProfilePayload, ReportPayload};
use crate::error::{domain_body, domain_status, ApiError};
use crate::extract::{ApiJson, CurrentViewer, IdPath};
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// `GET /api/ideas`
///
/// A bad filter is a 400. Any other failure still answers with a
/// well-formed empty page so the client can render the error in place.
pub async fn list_ideas(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<ListingResponse>)> {
    let Query(pairs) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let filter = parse_query_pairs(pairs)?;

    match state.listing.list_ideas(&filter, viewer.id()).await {
        Ok(listing) => Ok((StatusCode::OK, Json(listing.into()))),
        Err(e @ DomainError::ValidationFailed(_)) => Err(e.into()),
        Err(e) => {
            warn!(error = %e, page = filter.page, "listing failed, returning empty page");
            state.metrics.record_listing_failure();
            let status = StatusCode::from_u16(domain_status(&e)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = ListingResponse::empty(filter.page, state.listing.page_size(), domain_body(&e));
            Ok((status, Json(body)))
        }
    }
}

/// `POST /api/ideas`
pub async fn create_idea(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    ApiJson(input): ApiJson<IdeaInput>,
) -> ApiResult<(StatusCode, Json<IdeaDetail>)> {
    let idea = state.submission.submit_idea(viewer.viewer(), input).await?;
    let detail = state.listing.get_idea(idea.id, viewer.viewer()).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /api/ideas/{id}`
pub async fn get_idea(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    IdPath(id): IdPath,
) -> ApiResult<Json<IdeaDetail>> {
    Ok(Json(state.listing.get_idea(id, viewer.viewer()).await?))
}

/// `PUT /api/ideas/{id}`
pub async fn update_idea(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    IdPath(id): IdPath,
    ApiJson(input): ApiJson<IdeaInput>,
) -> ApiResult<Json<IdeaDetail>> {
    state.submission.update_idea(viewer.viewer(), id, input).await?;
    Ok(Json(state.listing.get_idea(id, viewer.viewer()).await?))
}

/// `DELETE /api/ideas/{id}`
pub async fn delete_idea(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    IdPath(id): IdPath,
) -> ApiResult<StatusCode> {
    state.submission.delete_idea(viewer.viewer(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/ideas/{id}/similar`
pub async fn similar_ideas(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    IdPath(id): IdPath,
) -> ApiResult<Json<Vec<IdeaSummary>>> {
    Ok(Json(state.listing.similar_ideas(id, viewer.viewer()).await?))
}

/// `POST /api/ideas/{id}/vote` toggles the viewer's upvote.
pub async fn toggle_vote(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    IdPath(id): IdPath,
) -> ApiResult<Json<VoteOutcome>> {
    let outcome = state.votes.toggle_upvote(id, viewer.id()).await?;
    state.metrics.record_vote(outcome.action.as_str());
    Ok(Json(outcome))
}

/// `POST /api/ideas/{id}/reports`
pub async fn report_idea(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    IdPath(id): IdPath,
    ApiJson(payload): ApiJson<ReportPayload>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    let report = state
        .reports
        .report_idea(viewer.viewer(), id, payload.reason, payload.description)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// `GET /api/tags`
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Tag>>> {
    Ok(Json(state.reference.tags().await?))
}

/// `GET /api/tech-stacks`
pub async fn list_tech_stacks(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.reference.tech_stack_names().await?))
}

/// `GET /api/profiles/{id}`
pub async fn get_profile(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    IdPath(user_id): IdPath,
) -> ApiResult<Json<ProfileOverview>> {
    Ok(Json(state.profiles.profile_overview(user_id, viewer.viewer()).await?))
}

/// `GET /api/profile`, the viewer's own page including drafts.
pub async fn get_own_profile(
    State(state): State<AppState>,
    viewer: CurrentViewer,
) -> ApiResult<Json<ProfileOverview>> {
    let me = viewer.viewer().ok_or(DomainError::Unauthenticated)?;
    Ok(Json(state.profiles.profile_overview(me.id, Some(me)).await?))
}

/// `PUT /api/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    viewer: CurrentViewer,
    ApiJson(payload): ApiJson<ProfilePayload>,
) -> ApiResult<Json<UserProfile>> {
    let profile = state
        .profiles
        .update_profile(viewer.viewer(), payload.full_name, payload.avatar_url)
        .await?;
    Ok(Json(profile))
}

/// `POST /api/admin/reconcile` recomputes every idea's counter.
pub async fn reconcile_upvotes(
    State(state): State<AppState>,
    viewer: CurrentViewer,
) -> ApiResult<Json<ReconcileReport>> {
    let admin = viewer.viewer().ok_or(DomainError::Unauthenticated)?;
    if !admin.is_admin {
        return Err(DomainError::Forbidden("counter repair is limited to staff".into()).into());
    }
    let report = state.votes.reconcile_all().await?;
    info!(checked = report.checked, repaired = report.repaired.len(), by = %admin.id, "reconcile finished");
    Ok(Json(report))
}

/// `GET /healthz`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state
        .metrics
        .render()
        .map_err(|e| DomainError::Internal(format!("metrics encoding: {e}")))?;
    Ok((
        [(CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
        body,
    ))
}

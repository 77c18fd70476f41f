use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::collaborators::{ExtractionError, ListingSource};
use super::domain::ListingId;
use super::query::{ListingQuery, ListingQueryParams};
use super::reconcile::{ListingDraft, ListingPatch};
use super::repository::{ListingRepository, RepositoryError};
use super::scoring::{WeightConfig, WeightConfigInput};
use super::service::{ListingService, ListingServiceError, ListingUpdate};
use super::settings::SettingsStore;

type SharedService<R, S> = Arc<ListingService<R, S>>;

/// Router builder exposing HTTP endpoints for listing tracking and ranking.
pub fn listing_router<R, S>(service: SharedService<R, S>) -> Router
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings",
            get(list_handler::<R, S>)
                .post(create_handler::<R, S>)
                .patch(update_handler::<R, S>),
        )
        .route(
            "/api/v1/listings/extract",
            post(extract_handler::<R, S>),
        )
        .route(
            "/api/v1/listings/:listing_id",
            get(get_handler::<R, S>).delete(delete_handler::<R, S>),
        )
        .route(
            "/api/v1/listings/:listing_id/contacted",
            post(contacted_handler::<R, S>),
        )
        .route(
            "/api/v1/listings/:listing_id/applied",
            post(applied_handler::<R, S>),
        )
        .route(
            "/api/v1/listings/:listing_id/group",
            post(group_handler::<R, S>),
        )
        .route(
            "/api/v1/listings/:listing_id/comments",
            post(comments_handler::<R, S>),
        )
        .route(
            "/api/v1/settings",
            get(settings_handler::<R, S>).put(update_settings_handler::<R, S>),
        )
        .route(
            "/api/v1/spiel",
            get(spiel_handler::<R, S>).put(save_spiel_handler::<R, S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionBody {
    selected: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupBody {
    group: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsBody {
    comments: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtractBody {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpielBody {
    #[serde(default)]
    spiel: Option<String>,
}

fn error_payload(status: StatusCode, message: impl ToString) -> Response {
    let payload = json!({
        "error": message.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn service_error_response(error: ListingServiceError) -> Response {
    let status = match &error {
        ListingServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ListingServiceError::DuplicateAddress(_)
        | ListingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ListingServiceError::NotFound(_)
        | ListingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ListingServiceError::Extraction(ExtractionError::Parse(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ListingServiceError::Extraction(ExtractionError::Fetch(_)) => StatusCode::BAD_GATEWAY,
        ListingServiceError::ExtractorUnavailable => StatusCode::NOT_IMPLEMENTED,
        ListingServiceError::Repository(_)
        | ListingServiceError::Settings(_)
        | ListingServiceError::Spiel(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_payload(status, error)
}

/// Status endpoints carry one field, so a rejected value means the request failed.
fn single_field_response(result: Result<ListingUpdate, ListingServiceError>) -> Response {
    match result {
        Ok(update) if !update.issues.is_empty() => {
            let message = update.issues[0].message.clone();
            let payload = json!({
                "error": message,
                "issues": update.issues,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Ok(update) => (StatusCode::OK, axum::Json(update)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn create_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    let draft = match ListingDraft::from_value(payload) {
        Ok(draft) => draft,
        Err(error) => return error_payload(StatusCode::BAD_REQUEST, error),
    };

    match service.create(draft) {
        Ok(update) => (StatusCode::CREATED, axum::Json(update)).into_response(),
        Err(error) => service_error_response(error),
    }
}

/// Create a listing from a URL or pasted page source via the configured
/// extractor.
pub(crate) async fn extract_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    axum::Json(body): axum::Json<ExtractBody>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    let Some(source) = ListingSource::from_parts(body.url, body.content) else {
        return error_payload(
            StatusCode::BAD_REQUEST,
            "provide a listing url or the page content",
        );
    };

    match service.create_from_source(&source) {
        Ok(update) => (StatusCode::CREATED, axum::Json(update)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn list_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Query(params): Query<ListingQueryParams>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    let query = match ListingQuery::try_from(params) {
        Ok(query) => query,
        Err(error) => return error_payload(StatusCode::BAD_REQUEST, error),
    };

    match service.list(&query) {
        Ok(listings) => {
            let payload = json!({
                "sort_by": query.sort.key(),
                "listings": listings,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn update_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    let patch = match ListingPatch::from_value(payload) {
        Ok(patch) => patch,
        Err(error) => return error_payload(StatusCode::BAD_REQUEST, error),
    };

    match service.update(patch) {
        Ok(update) => (StatusCode::OK, axum::Json(update)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn get_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(listing_id): Path<u64>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    match service.get(ListingId(listing_id)) {
        Ok(listing) => (StatusCode::OK, axum::Json(listing)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn delete_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(listing_id): Path<u64>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    let id = ListingId(listing_id);
    match service.delete(id) {
        Ok(()) => {
            let payload = json!({
                "deleted": id,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn contacted_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(listing_id): Path<u64>,
    axum::Json(body): axum::Json<SelectionBody>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    single_field_response(service.set_contacted(ListingId(listing_id), body.selected))
}

pub(crate) async fn applied_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(listing_id): Path<u64>,
    axum::Json(body): axum::Json<SelectionBody>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    single_field_response(service.set_applied(ListingId(listing_id), body.selected))
}

pub(crate) async fn group_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(listing_id): Path<u64>,
    axum::Json(body): axum::Json<GroupBody>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    single_field_response(service.set_group(ListingId(listing_id), body.group))
}

pub(crate) async fn comments_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    Path(listing_id): Path<u64>,
    axum::Json(body): axum::Json<CommentsBody>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    single_field_response(service.set_comments(ListingId(listing_id), body.comments))
}

pub(crate) async fn settings_handler<R, S>(State(service): State<SharedService<R, S>>) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    (StatusCode::OK, axum::Json(service.settings())).into_response()
}

pub(crate) async fn update_settings_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    axum::Json(input): axum::Json<WeightConfigInput>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    let config = match WeightConfig::try_from(input) {
        Ok(config) => config,
        Err(error) => return error_payload(StatusCode::UNPROCESSABLE_ENTITY, error),
    };

    match service.update_settings(config) {
        Ok(config) => (StatusCode::OK, axum::Json(config)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn spiel_handler<R, S>(State(service): State<SharedService<R, S>>) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    match service.spiel() {
        Ok(spiel) => (StatusCode::OK, axum::Json(json!({ "spiel": spiel }))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn save_spiel_handler<R, S>(
    State(service): State<SharedService<R, S>>,
    axum::Json(body): axum::Json<SpielBody>,
) -> Response
where
    R: ListingRepository + 'static,
    S: SettingsStore + 'static,
{
    let Some(spiel) = body.spiel else {
        return error_payload(StatusCode::BAD_REQUEST, "no spiel provided");
    };

    match service.save_spiel(&spiel) {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "spiel": spiel }))).into_response(),
        Err(error) => service_error_response(error),
    }
}

//! HTTP routes over the continuity engine.

use crate::auth::AuthorIdentity;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use continuity_core::{
    AuthorId, Book, BookId, BookPatch, Character, CharacterId, CharacterPatch, ContinuityEngine,
    ContinuityNote, EngineError, NewBook, NewCharacter, NewNote, NewSeries, NewWorldElement,
    NoteId, NotePatch, Series, SeriesId, SeriesOverview, SeriesPatch, SeriesSummary,
    ValidationError, Violation, ViolationId, ViolationStatus, WorldElement, WorldElementId,
    WorldElementPatch, WriteOutcome,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct ServerState {
    pub engine: ContinuityEngine,
}

impl ServerState {
    pub fn new(engine: ContinuityEngine) -> Self {
        Self { engine }
    }
}

type AppState = State<Arc<ServerState>>;

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Series.
        .route("/series", get(list_series).post(create_series))
        .route(
            "/series/{id}",
            get(series_overview).patch(update_series).delete(delete_series),
        )
        // Books.
        .route("/series/{id}/books", get(list_books).post(create_book))
        .route("/books/{id}", get(get_book).patch(update_book))
        // Characters and world elements.
        .route("/characters", get(list_characters).post(create_character))
        .route("/characters/{id}", get(get_character).patch(update_character))
        .route(
            "/world-elements",
            get(list_world_elements).post(create_world_element),
        )
        .route(
            "/world-elements/{id}",
            get(get_world_element).patch(update_world_element),
        )
        // Notes.
        .route("/series/{id}/notes", get(list_notes).post(add_note))
        .route("/notes/{id}", patch(update_note))
        // Violations.
        .route("/series/{id}/violations", get(list_violations))
        .route("/violations/{id}/acknowledge", post(acknowledge_violation))
        .route("/violations/{id}/resolve", post(resolve_violation))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Query strings ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorQuery {
    pub author_id: Option<AuthorId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    pub series_id: Option<SeriesId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<ViolationStatus>,
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, EngineError> {
    value.ok_or(EngineError::Validation(ValidationError::Missing { field }))
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_series(
    State(state): AppState,
    ApiQuery(query): ApiQuery<AuthorQuery>,
) -> ApiResult<Json<Vec<SeriesSummary>>> {
    let author = require(query.author_id, "authorId")?;
    Ok(Json(state.engine.list_series_by_author(author).await?))
}

async fn create_series(
    State(state): AppState,
    identity: AuthorIdentity,
    ApiJson(request): ApiJson<NewSeries>,
) -> ApiResult<(StatusCode, Json<Series>)> {
    identity.ensure(request.author_id)?;
    let series = state.engine.create_series(request).await?;
    Ok((StatusCode::CREATED, Json(series)))
}

async fn series_overview(
    State(state): AppState,
    ApiPath(id): ApiPath<SeriesId>,
) -> ApiResult<Json<SeriesOverview>> {
    Ok(Json(state.engine.get_series_overview(id).await?))
}

async fn update_series(
    State(state): AppState,
    _identity: AuthorIdentity,
    ApiPath(id): ApiPath<SeriesId>,
    ApiJson(patch): ApiJson<SeriesPatch>,
) -> ApiResult<Json<Series>> {
    Ok(Json(state.engine.update_series(id, patch).await?))
}

async fn delete_series(
    State(state): AppState,
    _identity: AuthorIdentity,
    ApiPath(id): ApiPath<SeriesId>,
) -> ApiResult<StatusCode> {
    state.engine.delete_series(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_books(
    State(state): AppState,
    ApiPath(id): ApiPath<SeriesId>,
) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(state.engine.get_series_books(id).await?))
}

async fn create_book(
    State(state): AppState,
    identity: AuthorIdentity,
    ApiPath(id): ApiPath<SeriesId>,
    ApiJson(request): ApiJson<NewBook>,
) -> ApiResult<(StatusCode, Json<WriteOutcome<Book>>)> {
    identity.ensure(request.author_id)?;
    let outcome = state.engine.create_book(id, request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn get_book(State(state): AppState, ApiPath(id): ApiPath<BookId>) -> ApiResult<Json<Book>> {
    Ok(Json(state.engine.get_book(id).await?))
}

async fn update_book(
    State(state): AppState,
    _identity: AuthorIdentity,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(patch): ApiJson<BookPatch>,
) -> ApiResult<Json<WriteOutcome<Book>>> {
    Ok(Json(state.engine.update_book(id, patch).await?))
}

async fn list_characters(
    State(state): AppState,
    ApiQuery(query): ApiQuery<SeriesQuery>,
) -> ApiResult<Json<Vec<Character>>> {
    let series = require(query.series_id, "seriesId")?;
    Ok(Json(state.engine.get_series_characters(series).await?))
}

async fn create_character(
    State(state): AppState,
    identity: AuthorIdentity,
    ApiJson(request): ApiJson<NewCharacter>,
) -> ApiResult<(StatusCode, Json<WriteOutcome<Character>>)> {
    identity.ensure(request.author_id)?;
    let outcome = state.engine.create_character(request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn get_character(
    State(state): AppState,
    ApiPath(id): ApiPath<CharacterId>,
) -> ApiResult<Json<Character>> {
    Ok(Json(state.engine.get_character(id).await?))
}

async fn update_character(
    State(state): AppState,
    _identity: AuthorIdentity,
    ApiPath(id): ApiPath<CharacterId>,
    ApiJson(patch): ApiJson<CharacterPatch>,
) -> ApiResult<Json<WriteOutcome<Character>>> {
    Ok(Json(state.engine.update_character(id, patch).await?))
}

async fn list_world_elements(
    State(state): AppState,
    ApiQuery(query): ApiQuery<SeriesQuery>,
) -> ApiResult<Json<Vec<WorldElement>>> {
    let series = require(query.series_id, "seriesId")?;
    Ok(Json(state.engine.get_series_world_elements(series).await?))
}

async fn create_world_element(
    State(state): AppState,
    identity: AuthorIdentity,
    ApiJson(request): ApiJson<NewWorldElement>,
) -> ApiResult<(StatusCode, Json<WriteOutcome<WorldElement>>)> {
    identity.ensure(request.author_id)?;
    let outcome = state.engine.create_world_element(request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn get_world_element(
    State(state): AppState,
    ApiPath(id): ApiPath<WorldElementId>,
) -> ApiResult<Json<WorldElement>> {
    Ok(Json(state.engine.get_world_element(id).await?))
}

async fn update_world_element(
    State(state): AppState,
    _identity: AuthorIdentity,
    ApiPath(id): ApiPath<WorldElementId>,
    ApiJson(patch): ApiJson<WorldElementPatch>,
) -> ApiResult<Json<WriteOutcome<WorldElement>>> {
    Ok(Json(state.engine.update_world_element(id, patch).await?))
}

async fn list_notes(
    State(state): AppState,
    ApiPath(id): ApiPath<SeriesId>,
) -> ApiResult<Json<Vec<ContinuityNote>>> {
    Ok(Json(state.engine.get_series_notes(id).await?))
}

async fn add_note(
    State(state): AppState,
    identity: AuthorIdentity,
    ApiPath(id): ApiPath<SeriesId>,
    ApiJson(request): ApiJson<NewNote>,
) -> ApiResult<(StatusCode, Json<ContinuityNote>)> {
    identity.ensure(request.author_id)?;
    let note = state.engine.add_note(id, request).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn update_note(
    State(state): AppState,
    _identity: AuthorIdentity,
    ApiPath(id): ApiPath<NoteId>,
    ApiJson(patch): ApiJson<NotePatch>,
) -> ApiResult<Json<ContinuityNote>> {
    Ok(Json(state.engine.update_note(id, patch).await?))
}

async fn list_violations(
    State(state): AppState,
    ApiPath(id): ApiPath<SeriesId>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> ApiResult<Json<Vec<Violation>>> {
    Ok(Json(
        state.engine.get_series_violations(id, query.status).await?,
    ))
}

async fn acknowledge_violation(
    State(state): AppState,
    _identity: AuthorIdentity,
    ApiPath(id): ApiPath<ViolationId>,
) -> ApiResult<Json<Violation>> {
    Ok(Json(state.engine.acknowledge_violation(id).await?))
}

async fn resolve_violation(
    State(state): AppState,
    _identity: AuthorIdentity,
    ApiPath(id): ApiPath<ViolationId>,
) -> ApiResult<Json<Violation>> {
    Ok(Json(state.engine.resolve_violation(id).await?))
}

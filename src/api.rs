use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use jiff::{SignedDuration, Timestamp};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::{
    channel::{Channel, ItemRef, Program},
    config::Config,
    error::Error,
    schedule::{Schedule, ScheduleEngine},
    store::ChannelStore,
};

pub struct AppState {
    pub config: Config,
    pub store: ChannelStore,
    pub engine: ScheduleEngine,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/channels", get(list_channels).post(create_channel))
        .route(
            "/channels/{id}",
            get(get_channel).put(update_channel).delete(delete_channel),
        )
        .route("/channels/{id}/programs", post(add_program))
        .route("/channels/{id}/programs/{item_ref}", delete(remove_program))
        .route("/channels/{id}/schedule", get(schedule))
        .route("/channels/{id}/now", get(now_playing))
        .route("/channels/{id}/play", get(play_position))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::ChannelNotFound { .. } | Error::LibraryNotFound(_) => StatusCode::NOT_FOUND,
            Error::ChannelExists { .. } => StatusCode::CONFLICT,
            Error::InvalidChannel(_) | Error::Time(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(%err, "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct ScheduleQuery {
    hours: Option<u32>,
    at: Option<Timestamp>,
}

#[derive(Debug, Deserialize)]
struct AtQuery {
    at: Option<Timestamp>,
}

async fn list_channels(State(state): State<Arc<AppState>>) -> Json<Vec<Channel>> {
    Json(state.store.list().await)
}

async fn create_channel(
    State(state): State<Arc<AppState>>,
    Json(channel): Json<Channel>,
) -> ApiResult<(StatusCode, Json<Channel>)> {
    let channel = state.store.create(channel).await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

async fn get_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Channel>> {
    Ok(Json(state.store.get(&id).await?))
}

async fn update_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(channel): Json<Channel>,
) -> ApiResult<Json<Channel>> {
    Ok(Json(state.store.update(&id, channel).await?))
}

async fn delete_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_program(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(program): Json<Program>,
) -> ApiResult<Json<Channel>> {
    Ok(Json(state.store.add_program(&id, program).await?))
}

async fn remove_program(
    State(state): State<Arc<AppState>>,
    Path((id, item_ref)): Path<(String, String)>,
) -> ApiResult<Json<Channel>> {
    let channel = state
        .store
        .remove_program(&id, &ItemRef::new(item_ref))
        .await?;
    Ok(Json(channel))
}

async fn schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Json<Schedule>> {
    let hours = query.hours.unwrap_or(state.config.schedule_hours);
    if hours == 0 || hours > state.config.max_schedule_hours {
        return Err(ApiError::bad_request(format!(
            "hours must be between 1 and {}",
            state.config.max_schedule_hours
        )));
    }

    let channel = state.store.get(&id).await?;
    let start = query.at.unwrap_or_else(Timestamp::now);
    let end = start
        .checked_add(SignedDuration::from_hours(i64::from(hours)))
        .map_err(Error::from)?;
    Ok(Json(state.engine.schedule(&channel, start, end).await?))
}

async fn now_playing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AtQuery>,
) -> ApiResult<Response> {
    let channel = state.store.get(&id).await?;
    let now = query.at.unwrap_or_else(Timestamp::now);
    Ok(match state.engine.now_playing(&channel, now).await? {
        Some(slot) => Json(slot).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn play_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AtQuery>,
) -> ApiResult<Response> {
    let channel = state.store.get(&id).await?;
    let now = query.at.unwrap_or_else(Timestamp::now);
    Ok(match state.engine.play_position(&channel, now).await? {
        Some(position) => Json(position).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        catalog::ProgramCatalog,
        enrich::SlotEnricher,
        library::{ManifestEntry, MediaLibrary},
    };

    fn entry(id: &str, name: &str, minutes: i64) -> ManifestEntry {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "runtime_ticks": minutes * 600_000_000,
            "kind": "movie",
            "production_year": 1980,
        }))
        .unwrap()
    }

    fn app(dir: &tempfile::TempDir) -> Router {
        let mut library = MediaLibrary::default();
        library.insert(
            "films".to_string(),
            vec![entry("f1", "Alien", 117), entry("f2", "Blade Runner", 117)],
        );
        let library = Arc::new(library);

        let engine = ScheduleEngine::new(
            ProgramCatalog::new(library.clone()),
            SlotEnricher::new(library, Duration::from_secs(1)),
        );
        let state = AppState {
            config: Config::default(),
            store: ChannelStore::open(dir.path().join("channels.json")).unwrap(),
            engine,
        };
        router(Arc::new(state))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_channel_crud() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let (status, _) = send(&app, "POST", "/channels", Some(json!({"id": "scifi"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, "POST", "/channels", Some(json!({"id": "scifi"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            "POST",
            "/channels/scifi/programs",
            Some(json!({"item_ref": "x", "name": "X", "duration": 600_000_000})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["programs"][0]["item_ref"], "x");

        let (status, body) = send(&app, "DELETE", "/channels/scifi/programs/x", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["programs"], json!([]));

        let (status, body) = send(&app, "GET", "/channels", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "DELETE", "/channels/scifi", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "GET", "/channels/scifi", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "channel not found: scifi");
    }

    #[tokio::test]
    async fn test_schedule_and_now_from_library() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        send(
            &app,
            "POST",
            "/channels",
            Some(json!({"id": "films", "libraries": ["films"]})),
        )
        .await;

        let (status, body) = send(
            &app,
            "GET",
            "/channels/films/schedule?hours=4&at=1970-01-01T00:30:00Z",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let slots = body["slots"].as_array().unwrap();
        let titles: Vec<&str> = slots.iter().map(|s| s["title"].as_str().unwrap()).collect();
        assert_eq!(titles, ["Alien", "Blade Runner", "Alien"]);
        assert_eq!(slots[0]["start_time"], "1970-01-01T00:00:00Z");
        assert_eq!(slots[0]["is_movie"], true);
        assert_eq!(slots[0]["production_year"], 1980);

        let (status, body) = send(
            &app,
            "GET",
            "/channels/films/now?at=1970-01-01T02:00:00Z",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Blade Runner");
        assert_eq!(body["elapsed"], 3 * 600_000_000_i64);

        let (status, body) = send(
            &app,
            "GET",
            "/channels/films/play?at=1970-01-01T02:00:00Z",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item_ref"], "f2");
        assert_eq!(body["start_position"], 3 * 600_000_000_i64);
    }

    #[tokio::test]
    async fn test_empty_channel_has_nothing_playing() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        send(&app, "POST", "/channels", Some(json!({"id": "blank"}))).await;

        let (status, _) = send(&app, "GET", "/channels/blank/now", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "GET", "/channels/blank/schedule", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slots"], json!([]));
    }

    #[tokio::test]
    async fn test_schedule_rejects_bad_window() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        send(&app, "POST", "/channels", Some(json!({"id": "c"}))).await;

        let (status, _) = send(&app, "GET", "/channels/c/schedule?hours=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, "GET", "/channels/c/schedule?hours=100000", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, "GET", "/channels/missing/schedule", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

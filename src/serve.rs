//! Purpose: Provide a loopback HTTP/JSON mock of the remote record API.
//! Exports: `ServeConfig`, `serve`, `seed_records`, `load_seed_file`.
//! Role: Axum server over `MemoryClient` for local development and integration tests.
//! Invariants: Routes mirror the client contract: `/{resource}` and `/{resource}/:id`.
//! Invariants: Loopback-only; records live in memory and vanish on exit.
//! Notes: Error bodies use the `{"error": {...}}` envelope the client understands.

use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::{Future, IntoFuture};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

use catalog::api::{Error, ErrorKind, MemoryClient, Record, RecordApi, RecordDraft};
use catalog::core::record::format_timestamp;

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub resource: String,
    pub seed: Vec<Record>,
}

#[derive(Clone)]
struct AppState {
    records: Arc<MemoryClient>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(rename = "_start")]
    start: Option<usize>,
    #[serde(rename = "_limit")]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    let records = Arc::new(MemoryClient::with_records(config.seed));
    let app = router(Arc::clone(&records), &config.resource);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    info!(
        bind = %config.bind,
        resource = %config.resource,
        records = records.len(),
        "serving records"
    );
    run_until(listener, app, shutdown_signal()).await
}

pub(crate) async fn run_until<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: F,
) -> Result<(), Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    Ok(())
}

pub(crate) fn router(records: Arc<MemoryClient>, resource: &str) -> Router {
    let state = AppState { records };
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            &format!("/{resource}"),
            get(list_records).post(create_record),
        )
        .route(
            &format!("/{resource}/:id"),
            get(get_record).put(update_record).delete(delete_record),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("the mock server only binds to loopback addresses")
            .with_hint("Use an address like 127.0.0.1:9800."));
    }
    if config.resource.is_empty() || config.resource.contains('/') {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("resource name must be a single non-empty path segment")
            .with_hint("Use a plain name like `posts`."));
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

/// Deterministic sample records, one hour apart, newest last.
pub fn seed_records(count: usize) -> Result<Vec<Record>, Error> {
    let origin = time::macros::datetime!(2024-01-01 00:00 UTC);
    (1..=count)
        .map(|n| {
            let created_at = format_timestamp(origin + time::Duration::hours(n as i64))?;
            Ok(Record {
                id: n as u64,
                title: format!("Sample record {n}"),
                body: format!("Body text for sample record {n}."),
                owner_id: (n as u64 % 10) + 1,
                created_at: Some(created_at),
            })
        })
        .collect()
}

pub fn load_seed_file(path: &Path) -> Result<Vec<Record>, Error> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to read seed file {}", path.display()))
            .with_source(err)
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("seed file must be a JSON array of records")
            .with_hint("Each record needs id, title, body, userId; createdAt is optional.")
            .with_source(err)
    })
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn list_records(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let start = query.start.unwrap_or(0);
    let limit = query.limit.unwrap_or(usize::MAX);
    match state.records.list(start, limit) {
        Ok(records) => Json(records).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_record(State(state): State<AppState>, AxumPath(id): AxumPath<u64>) -> Response {
    match state.records.get(id) {
        Ok(record) => Json(record).into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_record(State(state): State<AppState>, Json(draft): Json<RecordDraft>) -> Response {
    match state.records.create(&draft) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_record(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<u64>,
    Json(mut record): Json<Record>,
) -> Response {
    record.id = id;
    match state.records.update(&record) {
        Ok(record) => Json(record).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_record(State(state): State<AppState>, AxumPath(id): AxumPath<u64>) -> Response {
    match state.records.delete(id) {
        Ok(()) => Json(json!({})).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Network | ErrorKind::Io | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            id: err.id(),
        },
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::{ServeConfig, router, run_until, seed_records, serve, validate_config};
    use catalog::api::{Catalog, ErrorKind, MemoryClient, RecordApi, RecordDraft, RemoteClient};
    use catalog::notice::NoticeKind;
    use std::sync::Arc;

    fn config(bind: &str) -> ServeConfig {
        ServeConfig {
            bind: bind.parse().expect("bind"),
            resource: "posts".to_string(),
            seed: Vec::new(),
        }
    }

    #[tokio::test]
    async fn serve_rejects_non_loopback_bind() {
        let err = serve(config("0.0.0.0:0"))
            .await
            .expect_err("expected usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn resource_with_slash_is_rejected() {
        let mut config = config("127.0.0.1:0");
        config.resource = "a/b".to_string();
        let err = validate_config(&config).expect_err("expected usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn seed_records_are_ordered_and_timed() {
        let records = seed_records(3).expect("seed");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, 1);
        assert_eq!(
            records[0].created_at.as_deref(),
            Some("2024-01-01T01:00:00Z")
        );
        assert!(records[2].timestamp() > records[1].timestamp());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn remote_client_round_trips_against_router() {
        let records = Arc::new(MemoryClient::with_records(seed_records(5).expect("seed")));
        let app = router(Arc::clone(&records), "posts");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(run_until(listener, app, async {
            let _ = stop_rx.await;
        }));

        let base_url = format!("http://{addr}");
        let outcome = tokio::task::spawn_blocking(move || {
            let client = RemoteClient::new(base_url).expect("client");
            let listed = client.list(1, 2).expect("list");
            assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);

            let created = client
                .create(&RecordDraft::new("New", "body", 4))
                .expect("create");
            assert_eq!(created.id, 6);

            let missing = client.get(404).expect_err("missing");
            assert_eq!(missing.kind(), ErrorKind::NotFound);

            let mut catalog = Catalog::new(Arc::new(client));
            catalog.load_all().result.expect("load");
            let deleted = catalog.delete(404);
            (catalog.store().all_items().len(), deleted.notice.kind)
        })
        .await
        .expect("join");

        assert_eq!(outcome, (6, NoticeKind::Success));
        assert_eq!(records.len(), 6);

        let _ = stop_tx.send(());
        server.await.expect("join").expect("server");
    }
}

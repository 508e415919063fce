use crate::{
    catalog::BookRecord,
    engine::{EngineError, RecommendationEngine, RecommendationQuery},
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

const NO_RESULTS_MESSAGE: &str = "no recommendations found";
const UNAVAILABLE_MESSAGE: &str = "recommendations temporarily unavailable";

#[derive(Clone)]
struct SharedState {
    engine: Arc<RecommendationEngine>,
}

async fn start_app(engine: Arc<RecommendationEngine>, listen_addr: &str) {
    let shared_state = Arc::new(SharedState { engine });

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = Router::new()
        .route("/api/recommend", post(recommend))
        .route("/api/search/:query", get(search))
        .route("/api/categories", get(categories))
        .route("/api/health", get(health))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await.unwrap();
    log::info!("listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(engine: Arc<RecommendationEngine>, listen_addr: &str) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(engine, listen_addr).await });
}

// Wraps EngineError so axum can convert it into a response.
#[derive(Debug)]
struct HttpError(EngineError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            EngineError::EmptyQuery => (
                axum::http::StatusCode::BAD_REQUEST,
                json!({"error": "no search query provided"}).to_string(),
            ),
            err => {
                log::error!("{err:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": UNAVAILABLE_MESSAGE}).to_string(),
                )
            }
        }
        .into_response()
    }
}

impl From<EngineError> for HttpError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendRequest {
    pub query: String,

    /// "All" or absent disables category filtering
    pub category: Option<String>,

    /// happy, surprising, angry, suspenseful or sad;
    /// "All" or absent disables tone re-ranking
    pub tone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<BookRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Run one query against the engine, degrading retrieval failures to an
/// empty result set. Only validation problems surface as errors.
fn run_query(
    engine: &RecommendationEngine,
    text: String,
    category: Option<String>,
    tone: Option<String>,
) -> Result<RecommendResponse, HttpError> {
    let query = RecommendationQuery {
        text: text.clone(),
        category,
        tone,
    };

    match engine.recommend(&query) {
        Ok(results) => {
            let message = results.is_empty().then(|| NO_RESULTS_MESSAGE.to_string());
            Ok(RecommendResponse {
                query: text,
                count: results.len(),
                results,
                message,
            })
        }
        Err(err) if err.is_client_error() => Err(err.into()),
        Err(err) => {
            log::error!("recommendation pipeline failed: {err}");
            Ok(RecommendResponse {
                query: text,
                count: 0,
                results: vec![],
                message: Some(UNAVAILABLE_MESSAGE.to_string()),
            })
        }
    }
}

async fn recommend(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let engine = state.engine.clone();

    tokio::task::block_in_place(move || {
        run_query(&engine, payload.query, payload.category, payload.tone).map(Json)
    })
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Path(query): Path<String>,
) -> Result<Json<RecommendResponse>, HttpError> {
    log::debug!("search query: {query:?}");

    let engine = state.engine.clone();

    tokio::task::block_in_place(move || run_query(&engine, query, None, None).map(Json))
}

async fn categories(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<Vec<String>>, HttpError> {
    let engine = state.engine.clone();

    tokio::task::block_in_place(move || {
        engine.categories().map(Json).map_err(Into::into)
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub documents: usize,
    pub records: usize,
    pub initialized: bool,
}

async fn health(State(state): State<Arc<SharedState>>) -> Json<HealthResponse> {
    let engine = &state.engine;

    Json(HealthResponse {
        status: "ok",
        documents: engine.document_count(),
        records: engine.record_count(),
        initialized: engine.is_initialized(),
    })
}

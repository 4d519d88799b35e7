use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use panel_cut::controller::DEFAULT_TIME_LIMIT_MS;
use panel_cut::{OptimizationResult, OptimizeError, RunHandle, RunOutcome};
use panel_cut::types::{Piece, Sheet};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    sheet: Sheet,
    pieces: Vec<Piece>,
    #[serde(default = "default_time_limit_ms")]
    time_limit_ms: u64,
}

fn default_time_limit_ms() -> u64 {
    DEFAULT_TIME_LIMIT_MS
}

/// Cancels the run if the request goes away before it settles.
struct CancelOnDrop(RunHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            panel_cut::cancel(&self.0);
        }
    }
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizationResult>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let (tx, rx) = oneshot::channel();
    let handle = panel_cut::run(
        &req.sheet,
        &req.pieces,
        req.time_limit_ms,
        |done, total| tracing::debug!(done, total, "optimize progress"),
        move |outcome: &RunOutcome| {
            let _ = tx.send(outcome.clone());
        },
    )
    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let _guard = CancelOnDrop(handle);

    let outcome = rx.await.map_err(|_| {
        tracing::error!("optimization worker exited without a result");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            OptimizeError::WorkerPanicked.to_string(),
        )
    })?;

    match outcome {
        Ok(result) => Ok(Json(result)),
        Err(OptimizeError::Validation(e)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            tracing::error!(error = %e, "optimization failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(level)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}

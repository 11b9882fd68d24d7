//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::dispatch::dispatch;
use crate::interpreter::CommandInterpreter;
use crate::llm::GeminiClient;
use crate::task::{Task, TaskStore};

use super::types::*;

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Turns user text into commands
    pub interpreter: CommandInterpreter,
    /// Task store handle, possibly unavailable
    pub store: TaskStore,
}

/// Build the router with all routes and layers.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/command", post(process_command))
        .route("/tasks", get(list_tasks))
        .route("/health", get(health))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    if config.llm.api_key.is_none() {
        tracing::warn!(
            "GEMINI_API_KEY is not set. Commands will be answered with a configuration error."
        );
    }

    let client = GeminiClient::new(config.llm.clone())?;
    let interpreter = CommandInterpreter::new(Arc::new(client));
    let store = TaskStore::connect(&config.store_url).await;

    let state = Arc::new(AppState {
        config: config.clone(),
        interpreter,
        store,
    });
    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.store.close().await;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, closing task store...");
}

/// CORS for the configured origins. Credentials are allowed, so methods and
/// headers are mirrored rather than wildcarded.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the taskmind API. Send natural-language commands to POST /command."
            .to_string(),
    })
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = if state.store.is_available() {
        "connected"
    } else {
        "unavailable"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store.to_string(),
    })
}

/// Interpret a command and apply it to the task store.
async fn process_command(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CommandResponse>, ApiError> {
    let request: CommandRequest = serde_json::from_slice(&body).map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {}", e),
        )
    })?;

    let text = request.command.trim();
    if text.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "The 'command' field must not be empty.",
        ));
    }

    tracing::info!("Received command: {}", text);
    let command = state.interpreter.interpret(text).await;
    let result = dispatch(&command, &state.store).await;
    tracing::info!("Command '{}' finished with {:?}", command.action, result.status);

    Ok(Json(CommandResponse {
        llm_interpretation: command,
        action_result: result,
    }))
}

/// List all tasks.
async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Task>>, ApiError> {
    state.store.list().await.map(Json).map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not retrieve tasks: {}", e),
        )
    })
}

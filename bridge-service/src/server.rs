//! Server lifecycle.
//!
//! The server runs on its own task and watches a [`ShutdownHandle`]. The
//! control task owns signal handling and only flips the handle; once the
//! accept loop has drained, the listener is dropped and every database
//! handle is closed.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Json, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use common::middleware::request_id::request_id_middleware;
use common::response::panic_response;

use crate::handlers;
use crate::routes;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SQLite Bridge API",
        version = "0.1.0",
        description = "Read-only SQL-over-HTTP access to SQLite database files"
    ),
    paths(
        handlers::root,
        handlers::health_check,
        handlers::database_info,
        handlers::list_tables,
        handlers::table_schema,
        handlers::query_get,
        handlers::query_post,
    ),
    components(schemas(
        common::models::QueryBody,
        common::models::QueryResult,
        common::models::ColumnDescriptor,
        common::models::TablesResponse,
        common::models::TableSchema,
        common::response::ErrorBody,
        handlers::ServiceInfo,
        handlers::HealthResponse,
    )),
    tags(
        (name = "bridge", description = "Capabilities and introspection"),
        (name = "query", description = "Read-only query execution"),
        (name = "health", description = "Liveness")
    )
)]
struct ApiDoc;

/// Builds the full application: routes, OpenAPI document and middleware.
pub fn create_router(state: AppState) -> Router {
    with_layers(
        Router::new()
            .merge(routes::router())
            .route("/api-docs/openapi.json", get(openapi_json)),
    )
    .with_state(state)
}

/// Panic capture sits innermost so request ids and CORS headers still apply to 500s.
fn with_layers(router: Router<AppState>) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// One-shot shutdown trigger shared by the control task and the server.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests shutdown. Returns `true` only for the first call; later calls are no-ops.
    pub fn trigger(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// A bound, not yet running, bridge server.
pub struct BridgeServer {
    listener: TcpListener,
    state: AppState,
    shutdown: ShutdownHandle,
}

impl BridgeServer {
    /// Binds the configured host and port.
    pub async fn bind(state: AppState, shutdown: ShutdownHandle) -> io::Result<Self> {
        let listener = TcpListener::bind(state.config.bind_address()).await?;
        Ok(Self {
            listener,
            state,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the server on a dedicated task.
    pub fn spawn(self) -> JoinHandle<io::Result<()>> {
        tokio::spawn(self.run())
    }

    /// Serves until shutdown is triggered, then closes every database handle.
    pub async fn run(self) -> io::Result<()> {
        let Self {
            listener,
            state,
            shutdown,
        } = self;
        let registry = state.registry.clone();
        let app = create_router(state);

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.triggered().await })
            .await;

        registry.close_all().await;
        tracing::info!("Server stopped");
        result
    }
}

/// Waits for SIGINT or SIGTERM and returns the signal name.
pub async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM, falling back to SIGINT only");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Turns every incoming termination signal into a shutdown request.
pub fn spawn_signal_listener(shutdown: ShutdownHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let signal = wait_for_signal().await;
            if shutdown.trigger() {
                tracing::info!(signal, "Received shutdown signal, stopping server");
            } else {
                tracing::info!(signal, "Shutdown already in progress");
            }
        }
    })
}

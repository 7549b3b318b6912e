//! HTTP routes for the signaling service.
//!
//! Defines the Axum router and application state.

use crate::actors::{ActorMetrics, SignalingActor, SignalingHandle};
use crate::config::Config;
use crate::handlers;
use crate::observability::{health_router, HealthState};
use crate::signaling::EventSink;
use crate::store::MeetingStore;
use crate::transport::{self, ConnectionSinks};

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the signaling actor.
    pub signaling: SignalingHandle,

    /// Writers for live sockets; the signaling actor's event sink.
    pub sinks: Arc<ConnectionSinks>,

    /// Meeting store backing the HTTP endpoints and join checks.
    pub store: Arc<dyn MeetingStore>,

    pub actor_metrics: Arc<ActorMetrics>,

    /// Service configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Spawn the signaling actor and wire it to a fresh set of connection
    /// sinks.
    ///
    /// Cancelling `cancel_token` stops the signaling actor and, through child
    /// tokens, every connection.
    pub fn spawn(
        config: Config,
        store: Arc<dyn MeetingStore>,
        cancel_token: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let sinks = Arc::new(ConnectionSinks::new());
        let actor_metrics = ActorMetrics::new();
        let sink: Arc<dyn EventSink> = sinks.clone();

        let (signaling, task_handle) = SignalingActor::spawn(
            sink,
            Arc::clone(&store),
            config.relay_scope(),
            cancel_token,
            Arc::clone(&actor_metrics),
        );

        let state = Self {
            signaling,
            sinks,
            store,
            actor_metrics,
            config: Arc::new(config),
        };

        (state, task_handle)
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/ws` - WebSocket signaling endpoint
/// - `/create-meeting`, `/join-meeting` - meeting lifecycle over HTTP
/// - `/health`, `/ready` - probes
/// - `/metrics` - Prometheus exposition, when a handle is supplied
/// - CORS and `TraceLayer` on every route
pub fn build_routes(
    state: AppState,
    health_state: Arc<HealthState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Router {
    let cors = cors_layer(state.config.allowed_origin.as_deref());

    let mut app = Router::new()
        .route("/ws", get(transport::ws_handler))
        .route("/create-meeting", get(handlers::create_meeting))
        .route("/join-meeting", post(handlers::join_meeting))
        .with_state(state)
        .merge(health_router(health_state));

    if let Some(handle) = prometheus_handle {
        app = app.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    // Layer order (bottom-to-top execution):
    // 1. CorsLayer - answer preflights, tag responses
    // 2. TraceLayer - log request details
    app.layer(cors).layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let origin = match allowed_origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::InMemoryMeetingStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::collections::HashMap;
    use tower::util::ServiceExt;

    fn test_state(vars: &[(&str, &str)]) -> AppState {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let config = Config::from_vars(&vars).unwrap();
        let (state, _task) = AppState::spawn(
            config,
            Arc::new(InMemoryMeetingStore::new()),
            CancellationToken::new(),
        );
        state
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_metrics_route_absent_without_handle() {
        let app = build_routes(test_state(&[]), Arc::new(HealthState::new()), None);

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_echoes_configured_origin() {
        let state = test_state(&[("SIGNAL_ALLOWED_ORIGIN", "https://app.example.com")]);
        let app = build_routes(state, Arc::new(HealthState::new()), None);

        let response = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://app.example.com"
        );
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin_by_default() {
        let app = build_routes(test_state(&[]), Arc::new(HealthState::new()), None);

        let response = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "https://anywhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}

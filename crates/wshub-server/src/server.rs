//! `HubServer`: axum router, listener and background task wiring.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{any, get};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use wshub_auth::JwtTokenProvider;
use wshub_core::SystemClock;

use crate::api;
use crate::config::HubConfig;
use crate::health::HealthResponse;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::handshake::ws_handler;
use crate::websocket::manager::ConnectionManager;
use crate::websocket::monitor;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry owner; every socket operation goes through it.
    pub manager: Arc<ConnectionManager>,
    /// Issues tokens for `/api/users/login`.
    pub tokens: Arc<JwtTokenProvider>,
    /// Runtime configuration.
    pub config: Arc<HubConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Reports `draining` on `/health` once shutdown starts.
    pub shutdown: Arc<ShutdownCoordinator>,
}

/// The WebSocket hub server.
pub struct HubServer {
    config: Arc<HubConfig>,
    manager: Arc<ConnectionManager>,
    tokens: Arc<JwtTokenProvider>,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

impl HubServer {
    /// Server whose handshake validates tokens issued by `tokens`.
    pub fn new(config: HubConfig, tokens: JwtTokenProvider) -> Self {
        let tokens = Arc::new(tokens);
        let manager = ConnectionManager::new(
            Arc::clone(&tokens) as _,
            Arc::new(SystemClock),
            config.prune_empty,
        );
        Self::with_manager(config, tokens, Arc::new(manager))
    }

    /// Server around an existing manager.
    pub fn with_manager(
        config: HubConfig,
        tokens: Arc<JwtTokenProvider>,
        manager: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            manager,
            tokens,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Serve `GET /metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            manager: Arc::clone(&self.manager),
            tokens: Arc::clone(&self.tokens),
            config: Arc::clone(&self.config),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            shutdown: Arc::clone(&self.shutdown),
        };

        let mut router = Router::new()
            .route("/ws", any(ws_handler))
            .route("/health", get(health_handler))
            .nest("/api/users", api::routes());
        if self.metrics.is_some() {
            router = router.route("/metrics", get(metrics_handler));
        }
        router
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown starts.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "wshub listening");

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
        });
        Ok((local_addr, handle))
    }

    /// Start the liveness monitor; it stops when shutdown starts.
    pub fn spawn_monitor(&self) -> JoinHandle<()> {
        monitor::spawn_monitor(
            Arc::clone(&self.manager),
            self.config.monitor_interval,
            self.shutdown.token(),
        )
    }

    /// Stop the monitor and listener, close every socket, then wait for
    /// `handles` to finish. Returns whether they all finished in time.
    pub async fn shutdown(&self, handles: Vec<JoinHandle<()>>) -> bool {
        self.shutdown.shutdown();
        let report = self.manager.disconnect_all().await;
        info!(users = report.users, removed = report.removed, "sockets closed for shutdown");
        self.shutdown.graceful_shutdown(handles, None).await
    }

    /// The connection manager.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// The token provider.
    pub fn tokens(&self) -> &Arc<JwtTokenProvider> {
        &self.tokens
    }

    /// The shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::snapshot(
        state.start_time,
        &state.manager,
        state.shutdown.is_shutting_down(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, header};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;
    use wshub_auth::TokenOptions;
    use wshub_core::testing::FakeSocket;
    use wshub_settings::TokenSettings;

    fn make_server() -> HubServer {
        let tokens = JwtTokenProvider::new(TokenOptions::from(&TokenSettings::default())).unwrap();
        HubServer::new(HubConfig::default(), tokens)
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let server = make_server();
        let _ = server.manager().register_socket("alice", FakeSocket::open());
        let _ = server.manager().register_socket("alice", FakeSocket::open());

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = body_json(resp).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["users"], 1);
        assert_eq!(parsed["connections"], 2);
        assert!(parsed["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn health_reports_draining_after_shutdown_starts() {
        let server = make_server();
        server.shutdown_coordinator().shutdown();

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(body_json(resp).await["status"], "draining");
    }

    #[tokio::test]
    async fn ws_without_upgrade_is_426() {
        let server = make_server();
        let req = Request::builder()
            .uri("/ws?token=abc")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UPGRADE_REQUIRED);
        assert_eq!(server.manager().socket_count(), 0);
    }

    #[tokio::test]
    async fn ws_with_other_method_is_426() {
        let server = make_server();
        for method in ["POST", "PUT", "DELETE"] {
            let req = Request::builder()
                .method(method)
                .uri("/ws?token=abc")
                .body(Body::empty())
                .unwrap();
            let resp = server.router().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UPGRADE_REQUIRED, "{method}");
        }
    }

    #[tokio::test]
    async fn ws_bad_query_without_upgrade_is_426() {
        let server = make_server();
        let req = Request::builder()
            .uri("/ws?token=a&token=b")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UPGRADE_REQUIRED);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_route_only_with_handle() {
        let req = || Request::builder().uri("/metrics").body(Body::empty()).unwrap();

        let resp = make_server().router().oneshot(req()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server = make_server().with_metrics(handle);
        let resp = server.router().oneshot(req()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_issues_validating_token() {
        let server = make_server();
        let resp = server
            .router()
            .oneshot(json_request(
                Method::POST,
                "/api/users/login",
                r#"{"account":"alice","password":"pw"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let token = body_json(resp).await["token"].as_str().unwrap().to_owned();
        assert_eq!(server.manager().authorize(Some(&token)).as_deref(), Ok("alice"));
    }

    #[tokio::test]
    async fn login_with_empty_account_is_400() {
        let server = make_server();
        let resp = server
            .router()
            .oneshot(json_request(Method::POST, "/api/users/login", r#"{"account":""}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn send_to_user_reaches_their_sockets() {
        let server = make_server();
        let socket = FakeSocket::open();
        let _ = server.manager().register_socket("bob", socket.clone());

        let resp = server
            .router()
            .oneshot(json_request(
                Method::POST,
                "/api/users/send/bob",
                r#"{"risk":"High","message":"alert"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let msg: serde_json::Value = serde_json::from_str(&socket.sent()[0]).unwrap();
        assert_eq!(msg["type"], "Private");
        assert_eq!(msg["risk"], "High");
        assert_eq!(msg["message"], "alert");
    }

    #[tokio::test]
    async fn send_to_unknown_user_is_still_200() {
        let server = make_server();
        let resp = server
            .router()
            .oneshot(json_request(
                Method::POST,
                "/api/users/send/ghost",
                r#"{"message":"x"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn send_without_message_is_400() {
        let server = make_server();
        let resp = server
            .router()
            .oneshot(json_request(Method::POST, "/api/users/send-all", r#"{"risk":"Low"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn send_all_defaults_to_low_risk() {
        let server = make_server();
        let (a, b) = (FakeSocket::open(), FakeSocket::open());
        let _ = server.manager().register_socket("u1", a.clone());
        let _ = server.manager().register_socket("u2", b.clone());

        let resp = server
            .router()
            .oneshot(json_request(
                Method::POST,
                "/api/users/send-all",
                r#"{"message":"maintenance"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(a.sent(), b.sent());
        let msg: serde_json::Value = serde_json::from_str(&a.sent()[0]).unwrap();
        assert_eq!(msg["type"], "All");
        assert_eq!(msg["risk"], "Low");
    }

    #[tokio::test]
    async fn force_disconnect_routes() {
        let server = make_server();
        let (a, b) = (FakeSocket::open(), FakeSocket::open());
        let _ = server.manager().register_socket("u1", a.clone());
        let _ = server.manager().register_socket("u2", b.clone());

        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/api/users/force-disconnect/u1")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(a.close_reasons(), vec!["forced"]);
        assert!(b.close_reasons().is_empty());

        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/api/users/force-disconnect-all")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(server.manager().socket_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_closes_sockets_and_stops_tasks() {
        let server = make_server();
        let socket = FakeSocket::open();
        let _ = server.manager().register_socket("alice", socket.clone());

        let (addr, serve) = server.listen().await.unwrap();
        assert!(addr.port() > 0);
        let monitor = server.spawn_monitor();

        assert!(server.shutdown(vec![serve, monitor]).await);
        assert!(server.shutdown_coordinator().is_shutting_down());
        assert!(socket.is_released());
        assert_eq!(server.manager().user_count(), 0);
    }

    #[test]
    fn default_config_exposed() {
        let server = make_server();
        assert_eq!(server.config().host, "127.0.0.1");
        assert_eq!(server.config().port, 0);
        assert!(format!("{:?}", server.tokens()).contains("wshub"));
    }
}

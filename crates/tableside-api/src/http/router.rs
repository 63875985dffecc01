//! Axum router configuration with middleware.
//!
//! - `/parties/chat/{session_id}`: session WebSocket
//! - `/api/v1/sessions...`: admin API
//! - `/health`
//!
//! The built web client is served from `apps/web/dist/` (configurable via
//! `web_dir` or `TABLESIDE_WEB_DIR`). Unknown paths fall through to the
//! client's `index.html`. If the directory does not exist, only the routes
//! above are served.

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use tableside_infra::config::resolve_web_dir;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/sessions", get(handlers::session::list_sessions))
        .route(
            "/sessions/{id}",
            get(handlers::session::get_session).delete(handlers::session::delete_session),
        );

    let web_dir = resolve_web_dir(&state.config);

    let mut router = Router::new()
        .route("/parties/chat/{session_id}", get(handlers::ws::ws_handler))
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if web_dir.exists() {
        let serve_dir = ServeDir::new(&web_dir).fallback(ServeFile::new(web_dir.join("index.html")));
        router = router.fallback_service(serve_dir);
        tracing::info!(path = %web_dir.display(), "static file serving enabled");
    }

    router
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;
    use tower::ServiceExt;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    type WsStream = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn test_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        AppState::init_at(path).await.unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Serve on an ephemeral port and return the base `ws://` URL.
    async fn boot_server(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state);
        drop(tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        }));
        format!("ws://{addr}")
    }

    async fn connect(base: &str, session_id: &str) -> WsStream {
        let (ws, _) = connect_async(format!("{base}/parties/chat/{session_id}"))
            .await
            .unwrap();
        ws
    }

    async fn read_json(ws: &mut WsStream) -> Value {
        loop {
            let msg = timeout(TIMEOUT, ws.next())
                .await
                .expect("timeout waiting for message")
                .expect("stream closed")
                .expect("ws error");
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn send_json(ws: &mut WsStream, value: Value) {
        ws.send(Message::text(value.to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn test_health_endpoint_returns_ok() {
        let app = build_router(test_state().await);
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = build_router(test_state().await);
        let req = Request::builder()
            .uri("/api/v1/sessions/missing")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["errors"][0]["code"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_blank_session_id_is_rejected() {
        let app = build_router(test_state().await);
        let req = Request::builder()
            .uri("/api/v1/sessions/%20")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let app = build_router(test_state().await);
        let req = Request::builder()
            .uri("/api/v1/sessions")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"], json!([]));
    }

    #[tokio::test]
    async fn test_table_and_hand_over_websocket() {
        let state = test_state().await;
        let base = boot_server(state.clone()).await;

        let mut table = connect(&base, "game-1").await;
        let hydrate = read_json(&mut table).await;
        assert_eq!(hydrate["type"], "hydrate");
        assert_eq!(hydrate["messages"], json!([]));
        assert_eq!(hydrate["gameState"], json!({"serverState": [], "handsState": []}));

        let mut hand = connect(&base, "game-1").await;
        assert_eq!(read_json(&mut hand).await["type"], "hydrate");

        send_json(
            &mut hand,
            json!({"type": "hand-joined", "sessionId": "game-1", "senderId": "h1"}),
        )
        .await;
        let your_state = read_json(&mut hand).await;
        assert_eq!(your_state, json!({"type": "your-state", "handId": "h1", "state": {}}));

        let relayed = read_json(&mut table).await;
        assert_eq!(relayed["type"], "hand-joined");
        assert_eq!(relayed["senderId"], "h1");

        send_json(
            &mut table,
            json!({"type": "update-state", "state": {
                "serverState": {"turn": "h1"},
                "handsState": [{"handId": "h1", "state": {"cards": ["A"]}}]
            }}),
        )
        .await;

        let update = read_json(&mut table).await;
        assert_eq!(update["type"], "update-state");
        assert_eq!(update["state"]["serverState"], json!({"turn": "h1"}));

        assert_eq!(read_json(&mut hand).await["type"], "update-state");
        let mine = read_json(&mut hand).await;
        assert_eq!(mine, json!({"type": "your-state", "handId": "h1", "state": {"cards": ["A"]}}));

        // Hand leaves; the table hears about it.
        hand.close(None).await.unwrap();
        let gone = read_json(&mut table).await;
        assert_eq!(gone, json!({"type": "hand-disconnected", "senderId": "h1"}));
    }

    #[tokio::test]
    async fn test_chat_survives_reconnect() {
        let state = test_state().await;
        let base = boot_server(state.clone()).await;

        let mut a = connect(&base, "room").await;
        read_json(&mut a).await;
        let mut b = connect(&base, "room").await;
        read_json(&mut b).await;

        let message = json!({"type": "add", "id": "m1", "content": "hi", "user": "ann", "role": "user"});
        send_json(&mut a, message.clone()).await;
        assert_eq!(read_json(&mut b).await, message);

        drop(a);
        drop(b);

        let mut c = connect(&base, "room").await;
        let hydrate = read_json(&mut c).await;
        assert_eq!(
            hydrate["messages"],
            json!([{"id": "m1", "content": "hi", "user": "ann", "role": "user"}])
        );
    }

    #[tokio::test]
    async fn test_delete_closes_sockets_and_purges() {
        let state = test_state().await;
        let base = boot_server(state.clone()).await;

        let mut hand = connect(&base, "doomed").await;
        read_json(&mut hand).await;
        send_json(&mut hand, json!({"type": "hand-joined", "senderId": "h1"})).await;
        read_json(&mut hand).await;

        let app = build_router(state.clone());
        let req = Request::builder()
            .method("DELETE")
            .uri("/api/v1/sessions/doomed")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["purged"], true);

        // The server closes the socket.
        let closed = timeout(TIMEOUT, async {
            loop {
                match hand.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        })
        .await;
        assert!(closed.is_ok());

        let app = build_router(state);
        let req = Request::builder()
            .uri("/api/v1/sessions/doomed")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

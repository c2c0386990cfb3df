//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower::ServiceExt;

use static_guard::{MemoryFs, StaticHandler};

pub const TEST_TXT: &str = "This is a test file";
pub const INDEX_HTML: &str = "Test Index Page";
pub const CLIENT: &str = "198.51.100.20:40000";

/// The tree most tests serve, with `testdata` as the only base path.
pub fn fixture_fs() -> MemoryFs {
    MemoryFs::new()
        .with_file("testdata/test.txt", TEST_TXT)
        .with_file("testdata/index.html", INDEX_HTML)
        .with_file("testdata/subdir/nested.txt", "nested file")
        .with_file("testdata/report.pdf", "%PDF-1.4 fake")
        .with_file("testdata/app.js", "console.log('ok');")
        .with_file("testdata/backup.sql", "-- dump")
        .with_file("testdata/.env", "SECRET=1")
        .with_file("testdata/large.bin", vec![7u8; 4096])
}

pub fn fixture_handler() -> Arc<StaticHandler> {
    Arc::new(StaticHandler::new(fixture_fs(), &["testdata"]))
}

/// The handler mounted at `/static`.
pub fn app(handler: &Arc<StaticHandler>) -> Router {
    handler.register_router("/static", Router::new())
}

pub fn request(uri: &str, peer: &str) -> Request<Body> {
    let mut req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    req
}

pub async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, request(uri, CLIENT)).await
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// One POST seen by the webhook receiver.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub content_type: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Delivery {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct ReceiverState {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    status: Arc<AtomicU16>,
}

/// A webhook endpoint on an ephemeral port.
pub struct WebhookReceiver {
    pub url: String,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    status: Arc<AtomicU16>,
}

impl WebhookReceiver {
    pub async fn start() -> Self {
        let deliveries = Arc::new(Mutex::new(Vec::new()));
        let status = Arc::new(AtomicU16::new(200));
        let state = ReceiverState {
            deliveries: deliveries.clone(),
            status: status.clone(),
        };

        let app = Router::new()
            .route("/hook", post(record))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{}/hook", addr),
            deliveries,
            status,
        }
    }

    /// Answer every later POST with `status`.
    pub fn respond_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Delivery> {
        wait_until(timeout, || self.count() >= count).await;
        self.deliveries()
    }
}

async fn record(State(state): State<ReceiverState>, headers: HeaderMap, body: String) -> StatusCode {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.deliveries.lock().unwrap().push(Delivery {
        content_type,
        headers,
        body,
    });
    StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

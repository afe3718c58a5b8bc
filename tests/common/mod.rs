//! In-process mock of the image search provider and image hosts.
//!
//! Image behavior is keyed on `id % 5`:
//!
//! | `id % 5` | original | mid | thumb |
//! |----------|----------|-----|-------|
//! | 0 | 404 | `text/html` | 500 |
//! | 1 | 302 redirect | `image/jpeg` | `image/jpeg` |
//! | other | `image/png` | `image/png` | `image/png` |
//!
//! The redirect target serves a GIF, so a followed redirect is detectable.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

#[derive(Debug, Clone)]
pub struct Hit {
    pub id: usize,
    pub quality: String,
    pub referer: String,
}

pub struct MockState {
    pub base: String,
    pub display_num: usize,
    pub available: usize,
    pub failing_page: Option<usize>,
    pub hits: Mutex<Vec<Hit>>,
    pub search_requests: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

pub struct Provider {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl Provider {
    pub fn search_url(&self) -> String {
        format!("{}/search", self.state.base)
    }

    pub fn image_url(&self, id: usize, quality: &str) -> String {
        format!("{}/img?id={}&q={}", self.state.base, id, quality)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().unwrap().clone()
    }
}

/// Start a provider reporting `display_num` results but serving only
/// `available` records. A page whose offset equals `failing_page` returns 500.
pub fn spawn_provider(display_num: usize, available: usize, failing_page: Option<usize>) -> Provider {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let state = Arc::new(MockState {
        base: format!("http://{}", addr),
        display_num,
        available,
        failing_page,
        hits: Mutex::new(Vec::new()),
        search_requests: AtomicUsize::new(0),
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/search", get(search))
        .route("/nodisplay", get(no_display))
        .route("/img", get(image))
        .with_state(Arc::clone(&state));

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    Provider { addr, state }
}

fn param(q: &HashMap<String, String>, key: &str) -> Option<usize> {
    q.get(key).and_then(|v| v.parse().ok())
}

async fn search(
    State(s): State<Arc<MockState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.search_requests.fetch_add(1, Ordering::SeqCst);

    if q.get("word") != q.get("queryWord") || q.get("word").is_none() {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let pn = param(&q, "pn").unwrap_or(0);
    let rn = param(&q, "rn").unwrap_or(30);

    if pn != 0 && s.failing_page == Some(pn) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let mut data: Vec<serde_json::Value> = (pn..(pn + rn).min(s.available))
        .map(|id| {
            serde_json::json!({
                "thumbURL": format!("{}/img?id={}&q=thumb", s.base, id),
                "middleURL": format!("{}/img?id={}&q=mid", s.base, id),
                "replaceUrl": [
                    {"ObjURL": "http://unused.invalid/", "FromURL": "http://unused.invalid/"},
                    {
                        "ObjURL": format!("{}/img?id={}&q=orig", s.base, id),
                        "FromURL": format!("{}/page?id={}", s.base, id)
                    }
                ]
            })
        })
        .collect();
    // The provider pads every page with an empty record.
    data.push(serde_json::json!({}));

    let body = format!(
        "{{\"queryEnc\":\"it\\'s\",\"displayNum\":{},\"data\":{}}}",
        s.display_num,
        serde_json::Value::Array(data)
    );
    ([(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

async fn no_display() -> Response {
    ([(header::CONTENT_TYPE, "text/plain")], "{\"data\":[]}").into_response()
}

async fn image(
    State(s): State<Arc<MockState>>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let id = param(&q, "id").unwrap_or(0);
    let quality = q.get("q").cloned().unwrap_or_default();
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    s.hits.lock().unwrap().push(Hit {
        id,
        quality: quality.clone(),
        referer,
    });

    let now = s.active.fetch_add(1, Ordering::SeqCst) + 1;
    s.max_active.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(5)).await;
    s.active.fetch_sub(1, Ordering::SeqCst);

    if quality == "redirected" {
        return ([(header::CONTENT_TYPE, "image/gif")], "gif").into_response();
    }

    match (id % 5, quality.as_str()) {
        (0, "orig") => StatusCode::NOT_FOUND.into_response(),
        (0, "mid") => ([(header::CONTENT_TYPE, "text/html")], "<html></html>").into_response(),
        (0, _) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        (1, "orig") => {
            Redirect::temporary(&format!("/img?id={}&q=redirected", id)).into_response()
        }
        (1, _) => ([(header::CONTENT_TYPE, "image/jpeg")], format!("jpeg-{}", id)).into_response(),
        _ => (
            [(header::CONTENT_TYPE, "image/png; charset=binary")],
            format!("png-{}-{}", id, quality),
        )
            .into_response(),
    }
}

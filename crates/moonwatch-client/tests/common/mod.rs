// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process mock Moonraker controller bound to 127.0.0.1:0.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// How the mock answers one path.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Raw(&'static str),
    Status(u16),
    /// Sleep before answering `{}`; pair with a short client timeout.
    Hang(Duration),
}

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    /// Every `Content-Type` value, in arrival order.
    pub content_types: Vec<String>,
    pub body: String,
}

#[derive(Default)]
struct MockState {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

pub struct MockPrinter {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockPrinter {
    /// Start serving.  Unconfigured paths answer `{}` with 200.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Configure the reply for a path (query string excluded).
    pub fn on(&self, path: &str, reply: Reply) {
        self.state
            .replies
            .lock()
            .unwrap()
            .insert(path.to_string(), reply);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        api_key: header("x-api-key"),
        content_types: headers
            .get_all("content-type")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let reply = state.replies.lock().unwrap().get(uri.path()).cloned();
    match reply {
        Some(Reply::Json(value)) => axum::Json(value).into_response(),
        Some(Reply::Raw(text)) => (StatusCode::OK, text).into_response(),
        Some(Reply::Status(code)) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Some(Reply::Hang(delay)) => {
            tokio::time::sleep(delay).await;
            axum::Json(json!({})).into_response()
        }
        None => axum::Json(json!({})).into_response(),
    }
}

/// A status body shaped like a live Moonraker answer.
pub fn status_body(status: &str, bed: f64, nozzle: f64, print_time: f64) -> Value {
    json!({
        "result": {
            "status": status,
            "heater_bed": { "temperature": bed, "target": 60.0 },
            "toolhead": { "position": [0.0, 0.0, 0.0, 0.0], "print_time": print_time, "temperature": nozzle },
            "print_stats": { "filename": "benchy.gcode", "progress": 0.42 },
            "eventtime": 12345.6
        }
    })
}

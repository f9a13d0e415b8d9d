//! Scripted HTTP origin for end-to-end tests.
//!
//! # Design
//! `MockOrigin` holds a queue of canned `Answer`s and a log of every `Query`
//! it received. Any method on any path takes the next answer from the queue;
//! once the queue is empty the origin replies 500. `start` serves the origin
//! on an ephemeral port from its own thread and runtime, so blocking clients
//! in plain `#[test]` functions can talk to it.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::oneshot};

/// One canned response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Answer {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// A request as the origin received it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Query {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Query {
    /// First value of `name`, in any letter casing.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// JSON form of an answer, as read by the `mock-server` binary.
#[derive(Debug, Deserialize)]
pub struct ScriptEntry {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
    #[serde(default = "one")]
    pub times: usize,
}

fn one() -> usize {
    1
}

#[derive(Default)]
struct Script {
    answers: VecDeque<(Answer, usize)>,
    queries: Vec<Query>,
}

type Shared = Arc<Mutex<Script>>;

#[derive(Clone, Default)]
pub struct MockOrigin {
    script: Shared,
}

impl MockOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of `ScriptEntry` values.
    pub fn from_script(json: &str) -> serde_json::Result<Self> {
        let entries: Vec<ScriptEntry> = serde_json::from_str(json)?;
        let origin = entries.into_iter().fold(Self::new(), |origin, entry| {
            let answer = entry
                .headers
                .iter()
                .fold(Answer::new(entry.status), |a, (n, v)| a.with_header(n, v))
                .with_body(entry.body);
            origin.next_times(answer, entry.times)
        });
        Ok(origin)
    }

    pub fn next(self, answer: Answer) -> Self {
        self.next_times(answer, 1)
    }

    /// Queues `answer` for the next `times` requests.
    pub fn next_times(self, answer: Answer, times: usize) -> Self {
        if times > 0 {
            self.lock().answers.push_back((answer, times));
        }
        self
    }

    pub fn queries(&self) -> Vec<Query> {
        self.lock().queries.clone()
    }

    pub fn query_count(&self) -> usize {
        self.lock().queries.len()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .fallback(serve_next)
            .with_state(Arc::clone(&self.script))
    }

    /// Serves the origin on `127.0.0.1` with an ephemeral port.
    pub fn start(self) -> std::io::Result<MockContainer> {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = std_listener.local_addr()?;
        std_listener.set_nonblocking(true)?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let router = self.router();
        let handle = std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!(error = %e, "cannot build mock origin runtime");
                    return;
                }
            };
            let served = rt.block_on(async move {
                let listener = TcpListener::from_std(std_listener)?;
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = signal.await;
                    })
                    .await
            });
            if let Err(e) = served {
                tracing::error!(error = %e, "mock origin stopped with error");
            }
        });

        tracing::debug!(%addr, "mock origin listening");
        Ok(MockContainer {
            addr,
            origin: self,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A running `MockOrigin`. Dropping it shuts the server down.
pub struct MockContainer {
    addr: SocketAddr,
    origin: MockOrigin,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockContainer {
    /// Base URI of the running server, without a trailing slash.
    pub fn home(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn queries(&self) -> Vec<Query> {
        self.origin.queries()
    }

    pub fn query_count(&self) -> usize {
        self.origin.query_count()
    }

    /// Shuts the server down and waits for its thread to finish.
    pub fn stop(mut self) {
        self.signal_shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockContainer {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

/// Serves `origin` on an already bound listener until the process exits.
pub async fn run(listener: TcpListener, origin: MockOrigin) -> Result<(), std::io::Error> {
    axum::serve(listener, origin.router()).await
}

async fn serve_next(
    State(script): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = Query {
        method: method.to_string(),
        uri: uri.to_string(),
        headers: headers
            .iter()
            .map(|(n, v)| {
                (
                    n.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: body.to_vec(),
    };
    tracing::info!(method = %query.method, uri = %query.uri, "query received");

    let next = {
        let mut script = script.lock().unwrap_or_else(PoisonError::into_inner);
        script.queries.push(query);
        let next = script.answers.front_mut().map(|(answer, remaining)| {
            *remaining -= 1;
            (answer.clone(), *remaining == 0)
        });
        if let Some((_, true)) = next {
            script.answers.pop_front();
        }
        next.map(|(answer, _)| answer)
    };

    match next {
        Some(answer) => into_response(answer),
        None => {
            tracing::warn!(%uri, "no more answers scripted");
            (StatusCode::INTERNAL_SERVER_ERROR, "no more answers").into_response()
        }
    }
}

fn into_response(answer: Answer) -> Response {
    let status = StatusCode::from_u16(answer.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    for (name, value) in &answer.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(n), Ok(v)) => {
                headers.append(n, v);
            }
            _ => tracing::warn!(name = %name, "skipping invalid scripted header"),
        }
    }
    (status, headers, answer.body).into_response()
}

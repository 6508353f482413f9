//! Scripted doubles for driving a [`BourseClient`] without a backend.
//!
//! `MockTransport` answers by `"METHOD /path"` route. Each route holds a
//! queue of replies; the last one repeats once the queue is drained.
//! Unrouted requests get a 404.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bourse_cache::{CachePolicy, CacheStore, ManualClock, MemoryStore, TtlPolicy};

use crate::auth::AuthSession;
use crate::client::BourseClient;
use crate::error::ApiError;
use crate::executor::ApiClient;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Fixed start time for test clocks: 2024-01-01T00:00:00Z.
pub const TEST_EPOCH_MILLIS: i64 = 1_704_067_200_000;

#[derive(Debug, Clone)]
enum MockReply {
    Response(HttpResponse),
    Fail(String),
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn route(method: Method, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("{} {}", method.as_str(), path)
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: Method, path: &str, reply: MockReply) {
        lock(&self.routes)
            .entry(route(method, path))
            .or_default()
            .push_back(reply);
    }

    pub fn respond(&self, method: Method, path: &str, response: HttpResponse) {
        self.push(method, path, MockReply::Response(response));
    }

    pub fn respond_json(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.respond(method, path, HttpResponse::json(status, &body));
    }

    /// Fail at the transport level, as if the backend were unreachable.
    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.push(method, path, MockReply::Fail(message.to_string()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path_string() == path)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        lock(&self.requests).push(request.clone());

        let key = route(request.method, &request.path_string());
        let reply = {
            let mut routes = lock(&self.routes);
            match routes.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Fail(message)) => Err(ApiError::Transport(message)),
            None => Ok(HttpResponse::json(
                404,
                &serde_json::json!({ "message": format!("no route for {key}") }),
            )),
        }
    }
}

/// A client wired to a [`MockTransport`], in-memory stores and a manual clock.
pub struct TestHarness {
    pub client: BourseClient,
    pub transport: Arc<MockTransport>,
    pub clock: Arc<ManualClock>,
    /// Long-lived storage, shared by the cache and the auth mirror.
    pub persistent: Arc<MemoryStore>,
    pub session_store: Arc<MemoryStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_ttl(TtlPolicy::default())
    }

    pub fn with_ttl(ttl: TtlPolicy) -> Self {
        let transport = MockTransport::new();
        let clock = Arc::new(ManualClock::new(TEST_EPOCH_MILLIS));
        let persistent = Arc::new(MemoryStore::new());
        let session_store = Arc::new(MemoryStore::new());

        let session = Arc::new(AuthSession::new(
            persistent.clone(),
            session_store.clone(),
        ));
        let api = ApiClient::new(transport.clone(), session);
        let store = Arc::new(CacheStore::new(persistent.clone(), 100, clock.clone()));
        let client = BourseClient::new(api, CachePolicy::new(store, ttl));

        Self {
            client,
            transport,
            clock,
            persistent,
            session_store,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

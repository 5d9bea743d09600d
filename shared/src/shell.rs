//! Native shell: performs the core's effects with reqwest on a tokio runtime.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use crux_core::Request;
use crux_http::protocol::{HttpHeader, HttpRequest, HttpResponse, HttpResult};
use crux_http::Error as HttpError;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::capabilities::{Capabilities, Effect, Key, KeyboardOperation, SubscriptionId};
use crate::event::Event;
use crate::view::ViewModel;
use crate::{Core, Notice, NoticeKind};

const USER_AGENT: &str = concat!("image-search/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Executes the HTTP capability's requests.
pub struct HttpExecutor {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpExecutor {
    /// `timeout` bounds each request end to end; the protocol carries none.
    pub fn new(timeout: Duration) -> Result<Self, ShellError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ShellError::Client(e.without_url().to_string()))?;
        Ok(Self { client, timeout })
    }

    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn execute(&self, request: &HttpRequest) -> HttpResult {
        match self.send(request).await {
            Ok(response) => HttpResult::Ok(response),
            Err(error) => {
                warn!(error = %error, "request failed");
                HttpResult::Err(error)
            }
        }
    }

    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HttpError::Url(format!("unsupported method '{}'", request.method)))?;

        let mut builder = self
            .client
            .request(method, request.url.as_str())
            .timeout(self.timeout);
        for header in &request.headers {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let headers = response_headers(response.headers());
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(status, bytes = body.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}

fn response_headers(map: &reqwest::header::HeaderMap) -> Vec<HttpHeader> {
    let mut headers = Vec::with_capacity(map.len());
    for (name, value) in map {
        match value.to_str() {
            Ok(value) => headers.push(HttpHeader {
                name: name.as_str().to_string(),
                value: value.to_string(),
            }),
            Err(_) => debug!(header = %name, "dropping response header with non-UTF-8 value"),
        }
    }
    headers
}

// reqwest errors carry the full URL, query string (and API key) included.
fn map_transport_error(error: reqwest::Error) -> HttpError {
    let error = error.without_url();
    if error.is_timeout() {
        HttpError::Timeout
    } else if error.is_builder() {
        HttpError::Url(error.to_string())
    } else {
        HttpError::Io(error.to_string())
    }
}

/// Drives a [`Core`] to quiescence, running each effect as it appears.
///
/// Notices are collected for the caller instead of being drawn. Keyboard
/// subscriptions are held open so key presses can be fed back while any is
/// live.
pub struct NativeShell {
    core: Core,
    executor: HttpExecutor,
    key_bindings: BTreeMap<SubscriptionId, Request<KeyboardOperation>>,
}

impl NativeShell {
    pub fn new(executor: HttpExecutor) -> Self {
        Self {
            core: Core::new::<Capabilities>(),
            executor,
            key_bindings: BTreeMap::new(),
        }
    }

    /// Sends `event` and returns the notices raised while settling.
    pub async fn dispatch(&mut self, event: Event) -> Vec<Notice> {
        let effects = self.core.process_event(event);
        self.run(effects).await
    }

    pub async fn press_key(&mut self, key: &Key) -> Vec<Notice> {
        if self.key_bindings.is_empty() {
            debug!(?key, "no live key bindings");
            return Vec::new();
        }
        let mut effects = Vec::new();
        for request in self.key_bindings.values_mut() {
            effects.extend(self.core.resolve(request, key.clone()));
        }
        self.run(effects).await
    }

    pub fn view(&self) -> ViewModel {
        self.core.view()
    }

    async fn run(&mut self, effects: Vec<Effect>) -> Vec<Notice> {
        let mut queue: VecDeque<Effect> = effects.into();
        let mut notices = Vec::new();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Render(_) => {}
                Effect::Http(mut request) => {
                    let result = self.executor.execute(&request.operation).await;
                    queue.extend(self.core.resolve(&mut request, result));
                }
                Effect::Notify(request) => {
                    let notice = request.operation;
                    match notice.kind {
                        NoticeKind::Info => info!(message = %notice.message, "notice"),
                        NoticeKind::Failure => warn!(message = %notice.message, "notice"),
                    }
                    notices.push(notice);
                }
                Effect::Keyboard(request) => match request.operation.clone() {
                    KeyboardOperation::Subscribe { id, key } => {
                        debug!(%id, ?key, "key binding installed");
                        self.key_bindings.insert(id, request);
                    }
                    KeyboardOperation::Unsubscribe { id } => {
                        debug!(%id, "key binding removed");
                        self.key_bindings.remove(&id);
                    }
                },
            }
        }
        notices
    }
}

//! # Axum host integration for the Engine.IO core
//!
//! Adapts an axum request into the core's [`ServerApi`] capability and an
//! accepted [`axum::extract::ws::WebSocket`] into its [`WsStream`] seam.
//!
//! ```ignore
//! let engine = Arc::new(EngineIo::new(Registry::new(), EngineIoConfig::default(), on_session));
//! let app = Router::new().nest_service("/engine.io", engineio_axum::router(engine));
//! axum::serve(listener, app).await?;
//! ```
//!
//! Clients then speak Engine.IO at `/engine.io/?transport=…`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use axum::Router;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use bytes::Bytes;
use futures::{Sink, Stream, ready};
use http::{Method, StatusCode, header};

use engineio_core::{EngineIo, EngineIoError, EngineResponse, ServerApi, WsError, WsMessage};

/// Maximum accepted request body size (16 MiB). Polling payloads are far
/// smaller in practice; anything bigger is a client bug.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Build a router serving the Engine.IO endpoint at `/`.
///
/// Nest it under whatever prefix the host uses (commonly `/engine.io`).
pub fn router(engine: Arc<EngineIo>) -> Router {
    Router::new().route("/", any(handle_request)).with_state(engine)
}

#[allow(clippy::expect_used)]
async fn handle_request(State(engine): State<Arc<EngineIo>>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();

    // Only present when the request actually carries upgrade headers.
    let upgrade = WebSocketUpgrade::from_request_parts(&mut parts, &()).await.ok();

    let body = match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::debug!(%error, "failed to read request body");
            return engine_response(EngineResponse::error(EngineIoError::BadRequest));
        }
    };

    let api = AxumRequest {
        method: parts.method.clone(),
        query: parse_query(parts.uri.query().unwrap_or("")),
        body,
        upgrade,
        response: Arc::new(Mutex::new(None)),
    };
    let slot = api.response.clone();

    match engine.handle(api).await {
        Ok(()) => {}
        Err(never) => match never {},
    }

    let response = slot.lock().expect("response slot poisoned").take();
    response.unwrap_or_else(|| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn parse_query(raw: &str) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in form_urlencoded::parse(raw.as_bytes()) {
        params
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

#[allow(clippy::expect_used)]
fn engine_response(response: EngineResponse) -> Response {
    Response::builder()
        .status(response.status)
        .header(header::CONTENT_TYPE, response.content_type)
        .body(Body::from(response.body))
        .expect("static response parts")
}

/// One in-flight request, adapted to the core's capability.
///
/// The dispatcher writes its response into a shared slot; the axum
/// handler returns whatever landed there.
struct AxumRequest {
    method: Method,
    query: HashMap<String, Vec<String>>,
    body: Bytes,
    upgrade: Option<WebSocketUpgrade>,
    response: Arc<Mutex<Option<Response>>>,
}

impl AxumRequest {
    #[allow(clippy::expect_used)]
    fn store(&self, response: Response) {
        *self.response.lock().expect("response slot poisoned") = Some(response);
    }
}

impl ServerApi for AxumRequest {
    type Error = Infallible;
    type Ws = AxumWsStream;

    fn method(&self) -> &Method {
        &self.method
    }

    fn query_params(&self) -> &HashMap<String, Vec<String>> {
        &self.query
    }

    async fn read_body(&mut self) -> Result<Bytes, Infallible> {
        Ok(self.body.clone())
    }

    async fn respond(self, response: EngineResponse) -> Result<(), Infallible> {
        self.store(engine_response(response));
        Ok(())
    }

    #[allow(clippy::expect_used)]
    async fn run_websocket<F, Fut>(self, acceptor: F) -> Result<(), Infallible>
    where
        F: FnOnce(Self::Ws) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Self {
            upgrade, response, ..
        } = self;

        let stored = match upgrade {
            Some(upgrade) => {
                upgrade.on_upgrade(move |socket| acceptor(AxumWsStream { inner: socket }))
            }
            // transport=websocket without upgrade headers.
            None => engine_response(EngineResponse::error(EngineIoError::BadRequest)),
        };
        *response.lock().expect("response slot poisoned") = Some(stored);
        Ok(())
    }
}

/// An accepted axum WebSocket, adapted to the core's [`WsStream`] seam.
///
/// Text, binary, and close frames map through; ping/pong control frames
/// are absorbed here because axum answers them itself.
pub struct AxumWsStream {
    inner: WebSocket,
}

impl Stream for AxumWsStream {
    type Item = Result<WsMessage, WsError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let message = ready!(Pin::new(&mut self.inner).poll_next(cx));
            let mapped = match message {
                Some(Ok(Message::Text(text))) => Some(Ok(WsMessage::Text(text.as_str().to_owned()))),
                Some(Ok(Message::Binary(frame))) => Some(Ok(WsMessage::Binary(frame))),
                Some(Ok(Message::Close(_))) => Some(Ok(WsMessage::Close)),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Err(error)) => Some(Err(WsError(error.to_string()))),
                None => None,
            };
            return Poll::Ready(mapped);
        }
    }
}

impl Sink<WsMessage> for AxumWsStream {
    type Error = WsError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Pin::new(&mut self.inner)
            .poll_ready(cx)
            .map_err(|e| WsError(e.to_string()))
    }

    fn start_send(mut self: Pin<&mut Self>, item: WsMessage) -> Result<(), WsError> {
        let message = match item {
            WsMessage::Text(text) => Message::Text(text.into()),
            WsMessage::Binary(frame) => Message::Binary(frame),
            WsMessage::Close => Message::Close(None),
        };
        Pin::new(&mut self.inner)
            .start_send(message)
            .map_err(|e| WsError(e.to_string()))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Pin::new(&mut self.inner)
            .poll_flush(cx)
            .map_err(|e| WsError(e.to_string()))
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Pin::new(&mut self.inner)
            .poll_close(cx)
            .map_err(|e| WsError(e.to_string()))
    }
}

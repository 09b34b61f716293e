//! In-memory doubles for the host-facing seams, used by unit tests.

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{Sink, Stream, StreamExt};
use http::Method;

use crate::error::WsError;
use crate::server::{EngineResponse, ServerApi};
use crate::upgrade::WsMessage;

/// A scriptable [`WsStream`](crate::upgrade::WsStream): the server end of
/// an in-memory WebSocket.
pub(crate) struct TestWs {
    rx: UnboundedReceiver<Result<WsMessage, WsError>>,
    tx: UnboundedSender<WsMessage>,
}

/// The client end of a [`TestWs`].
pub(crate) struct TestWsClient {
    to_server: UnboundedSender<Result<WsMessage, WsError>>,
    from_server: UnboundedReceiver<WsMessage>,
}

impl TestWs {
    /// A connected (server, client) pair.
    pub(crate) fn pair() -> (Self, TestWsClient) {
        let (to_server, rx) = mpsc::unbounded();
        let (tx, from_server) = mpsc::unbounded();
        (
            Self { rx, tx },
            TestWsClient {
                to_server,
                from_server,
            },
        )
    }
}

impl TestWsClient {
    /// Deliver a frame to the server.
    pub(crate) fn send(&mut self, message: WsMessage) {
        let _ = self.to_server.unbounded_send(Ok(message));
    }

    /// Wait for the next frame from the server; `None` once it hangs up.
    pub(crate) async fn recv(&mut self) -> Option<WsMessage> {
        self.from_server.next().await
    }

    /// Drop the connection without a close frame.
    pub(crate) fn disconnect(&mut self) {
        self.to_server.close_channel();
    }
}

impl Stream for TestWs {
    type Item = Result<WsMessage, WsError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl Sink<WsMessage> for TestWs {
    type Error = WsError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Pin::new(&mut self.tx)
            .poll_ready(cx)
            .map_err(|e| WsError(e.to_string()))
    }

    fn start_send(mut self: Pin<&mut Self>, item: WsMessage) -> Result<(), WsError> {
        Pin::new(&mut self.tx)
            .start_send(item)
            .map_err(|e| WsError(e.to_string()))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Pin::new(&mut self.tx)
            .poll_flush(cx)
            .map_err(|e| WsError(e.to_string()))
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
        Pin::new(&mut self.tx)
            .poll_close(cx)
            .map_err(|e| WsError(e.to_string()))
    }
}

/// Where a [`TestRequest`] deposits the dispatcher's response.
pub(crate) type ResponseSlot = Arc<Mutex<Option<EngineResponse>>>;

/// A scriptable [`ServerApi`] request.
pub(crate) struct TestRequest {
    method: Method,
    query: HashMap<String, Vec<String>>,
    body: Bytes,
    response: ResponseSlot,
    ws: Option<TestWs>,
}

impl TestRequest {
    pub(crate) fn get(query: &str) -> (Self, ResponseSlot) {
        Self::build(Method::GET, query, Bytes::new())
    }

    pub(crate) fn post(query: &str, body: impl Into<Bytes>) -> (Self, ResponseSlot) {
        Self::build(Method::POST, query, body.into())
    }

    pub(crate) fn with_method(method: Method, query: &str) -> (Self, ResponseSlot) {
        Self::build(method, query, Bytes::new())
    }

    pub(crate) fn with_websocket(mut self, ws: TestWs) -> Self {
        self.ws = Some(ws);
        self
    }

    fn build(method: Method, query: &str, body: Bytes) -> (Self, ResponseSlot) {
        let slot: ResponseSlot = Arc::new(Mutex::new(None));
        (
            Self {
                method,
                query: parse_query(query),
                body,
                response: slot.clone(),
                ws: None,
            },
            slot,
        )
    }
}

// Plain `k=v&k=v` splitting; tests don't need percent decoding.
fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.entry(name.to_owned()).or_default().push(value.to_owned());
    }
    params
}

#[allow(clippy::expect_used)]
impl ServerApi for TestRequest {
    type Error = Infallible;
    type Ws = TestWs;

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
        *self.response.lock().expect("slot poisoned") = Some(response);
        Ok(())
    }

    async fn run_websocket<F, Fut>(self, acceptor: F) -> Result<(), Infallible>
    where
        F: FnOnce(Self::Ws) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ws = self.ws.expect("no websocket scripted for this request");
        acceptor(ws).await;
        Ok(())
    }
}

/// Unwrap a deposited response.
#[allow(clippy::expect_used)]
pub(crate) fn take_response(slot: &ResponseSlot) -> EngineResponse {
    slot.lock()
        .expect("slot poisoned")
        .take()
        .expect("dispatcher wrote no response")
}

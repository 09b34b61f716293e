//! The HTTP endpoint dispatcher and the host-facing capability seam.
//!
//! Hosts adapt each incoming request into a [`ServerApi`] and hand it to
//! [`EngineIo::handle`], which classifies the request (new session,
//! polling, upgrade) per the routing table in the crate docs and either
//! writes an [`EngineResponse`] back through the capability or takes
//! over the connection as a WebSocket.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::brain;
use crate::config::EngineIoConfig;
use crate::error::EngineIoError;
use crate::packet::{Packet, PacketType};
use crate::payload::Payload;
use crate::polling;
use crate::registry::Registry;
use crate::socket::{SessionId, Socket};
use crate::transport::TransportKind;
use crate::upgrade::{self, WsStream};

const OCTET_STREAM: &str = "application/octet-stream";

/// What the dispatcher wants the host to write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// Response body.
    pub body: Bytes,
}

impl EngineResponse {
    /// A `200` carrying an encoded payload.
    #[must_use]
    pub fn payload(payload: &Payload) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: OCTET_STREAM,
            body: payload.encode(),
        }
    }

    /// A `200` with an empty body (successful POST ingestion).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: OCTET_STREAM,
            body: Bytes::new(),
        }
    }

    /// A `400` carrying the protocol error body.
    #[must_use]
    pub fn error(error: EngineIoError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            content_type: "application/json",
            body: Bytes::from(error.to_json()),
        }
    }
}

/// Per-request capability provided by the host HTTP framework.
///
/// The dispatcher consumes exactly one of [`respond`](Self::respond) or
/// [`run_websocket`](Self::run_websocket) per request.
pub trait ServerApi: Send + Sized {
    /// Host transport failure; aborts the request.
    type Error: Send;

    /// The host's accepted WebSocket connection type.
    type Ws: WsStream;

    /// The HTTP request method.
    fn method(&self) -> &Method;

    /// Decoded query parameters; a name may carry several values.
    fn query_params(&self) -> &HashMap<String, Vec<String>>;

    /// Read the full request body.
    fn read_body(&mut self) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;

    /// Write the response.
    fn respond(self, response: EngineResponse) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Hand the connection to the host's WebSocket server; `acceptor`
    /// runs on the accepted connection. A host that cannot upgrade the
    /// request answers `BadRequest` instead of calling the acceptor.
    fn run_websocket<F, Fut>(self, acceptor: F) -> impl Future<Output = Result<(), Self::Error>> + Send
    where
        F: FnOnce(Self::Ws) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static;
}

/// Body of the `OPEN` packet sent when a session is created.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenHandshake {
    sid: String,
    upgrades: Vec<TransportKind>,
    ping_timeout: u64,
    ping_interval: u64,
}

type SessionHandler = dyn Fn(Arc<Socket>) -> BoxFuture<'static, ()> + Send + Sync;

/// The Engine.IO server: registry, handshake config, and the user's
/// session handler.
///
/// `on_session` runs in its own task for every session opened; it
/// receives the [`Socket`] and typically loops on
/// [`Socket::recv`](crate::Socket::recv) until the session ends.
#[derive(Clone)]
pub struct EngineIo {
    registry: Registry,
    config: EngineIoConfig,
    on_session: Arc<SessionHandler>,
}

impl EngineIo {
    /// Build a server over an explicitly-created registry.
    pub fn new<F, Fut>(registry: Registry, config: EngineIoConfig, on_session: F) -> Self
    where
        F: Fn(Arc<Socket>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            registry,
            config,
            on_session: Arc::new(move |socket| on_session(socket).boxed()),
        }
    }

    /// The registry of open sessions.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatch one HTTP request.
    ///
    /// # Errors
    ///
    /// Propagates host transport failures from the capability.
    pub async fn handle<A: ServerApi>(&self, mut api: A) -> Result<(), A::Error> {
        let requested = singleton(api.query_params(), "transport")
            .and_then(|name| name.parse::<TransportKind>().ok());
        let Some(requested) = requested else {
            return api
                .respond(EngineResponse::error(EngineIoError::TransportUnknown))
                .await;
        };

        let sid = match api.query_params().get("sid").map(Vec::as_slice) {
            None => Ok(None),
            Some([only]) => Ok(Some(SessionId::from(only.as_str()))),
            Some(_) => Err(()),
        };
        let Ok(sid) = sid else {
            return api
                .respond(EngineResponse::error(EngineIoError::SessionIdUnknown))
                .await;
        };

        let Some(sid) = sid else {
            let payload = self.open_session().await;
            return api.respond(EngineResponse::payload(&payload)).await;
        };

        let Some(socket) = self.registry.get(&sid).await else {
            return api
                .respond(EngineResponse::error(EngineIoError::SessionIdUnknown))
                .await;
        };

        match (socket.current_transport().await.kind(), requested) {
            (TransportKind::Polling, TransportKind::Polling) => {
                self.polling_request(api, &socket).await
            }
            (TransportKind::Polling, TransportKind::Websocket) => {
                let registry = self.registry.clone();
                api.run_websocket(move |ws| upgrade::run(registry, socket, ws))
                    .await
            }
            _ => {
                api.respond(EngineResponse::error(EngineIoError::BadRequest))
                    .await
            }
        }
    }

    async fn polling_request<A: ServerApi>(
        &self,
        mut api: A,
        socket: &Arc<Socket>,
    ) -> Result<(), A::Error> {
        if *api.method() == Method::GET {
            match polling::poll(socket).await {
                Ok(payload) => api.respond(EngineResponse::payload(&payload)).await,
                // Torn down while we were waiting.
                Err(_) => {
                    api.respond(EngineResponse::error(EngineIoError::BadRequest))
                        .await
                }
            }
        } else if *api.method() == Method::POST {
            let body = api.read_body().await?;
            match polling::receive(socket, &body).await {
                Ok(()) => api.respond(EngineResponse::empty()).await,
                Err(error) => {
                    tracing::debug!(%error, "rejecting unparseable payload");
                    api.respond(EngineResponse::error(EngineIoError::BadRequest))
                        .await
                }
            }
        } else {
            api.respond(EngineResponse::error(EngineIoError::BadRequest))
                .await
        }
    }

    /// Create a session: publish it to the registry, spawn its pump and
    /// the user's session handler, and return the `OPEN` payload.
    #[allow(clippy::expect_used)]
    async fn open_session(&self) -> Payload {
        let socket = Socket::new(SessionId::generate());
        self.registry.insert(socket.clone()).await;
        tokio::spawn(brain::run(self.registry.clone(), socket.clone()));
        tokio::spawn((self.on_session)(socket.clone()));

        tracing::info!(sid = %socket.id(), "session opened");

        let handshake = OpenHandshake {
            sid: socket.id().as_str().to_owned(),
            upgrades: vec![TransportKind::Websocket],
            ping_timeout: self.config.ping_timeout.as_millis() as u64,
            ping_interval: self.config.ping_interval.as_millis() as u64,
        };
        let body = serde_json::to_vec(&handshake).expect("open handshake encodes");
        Payload::single(Packet::new(PacketType::Open, body))
    }
}

impl std::fmt::Debug for EngineIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineIo")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn singleton<'a>(params: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
    match params.get(name)?.as_slice() {
        [only] => Some(only),
        _ => None,
    }
}

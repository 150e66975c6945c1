//! Mock HTTP(S) listener.
//!
//! One listener serves both the admin API (under `/__mimic`) and mocked
//! traffic, which goes through the [`Dispatcher`].

use crate::admin_api::{is_admin_path, route_request, AdminContext};
use crate::config::ListenConfig;
use crate::dispatcher::Dispatcher;
use crate::expectation::Backup;
use crate::history::RecordedRequest;
use crate::response::{build_response, MockReply};
use anyhow::Context;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

/// Returned by the service to make hyper close the connection without
/// writing a response.
#[derive(Debug, thiserror::Error)]
#[error("connection dropped by fault expectation")]
pub struct ConnectionDropped;

/// A bound, not yet serving, mock server.
pub struct MockServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Dispatcher,
    admin: AdminContext,
    tls: Option<TlsAcceptor>,
}

impl MockServer {
    /// Bind the listener. Port 0 picks an ephemeral port.
    pub async fn bind(
        listen: &ListenConfig,
        dispatcher: Dispatcher,
        backup: Backup,
        tls: Option<TlsAcceptor>,
    ) -> Result<Self, anyhow::Error> {
        let addr = listen.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        let local_addr = listener.local_addr()?;
        let admin = AdminContext::new(Arc::clone(dispatcher.state()), backup);

        Ok(Self {
            listener,
            local_addr,
            dispatcher,
            admin,
            tls,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start accepting connections on a background task.
    pub fn spawn(self) -> ServerHandle {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut shutdown_rx = shutdown_tx.subscribe();
        let local_addr = self.local_addr;
        let scheme = if self.tls.is_some() { "https" } else { "http" };
        info!("Mimic listening on {}://{}", scheme, local_addr);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = self.listener.accept() => {
                        match result {
                            Ok((stream, remote_addr)) => {
                                let dispatcher = self.dispatcher.clone();
                                let admin = self.admin.clone();
                                let tls = self.tls.clone();
                                tokio::spawn(async move {
                                    match tls {
                                        Some(acceptor) => match acceptor.accept(stream).await {
                                            Ok(tls_stream) => {
                                                serve(tls_stream, remote_addr, "https", dispatcher, admin).await
                                            }
                                            Err(e) => {
                                                debug!("TLS handshake failed from {}: {}", remote_addr, e)
                                            }
                                        },
                                        None => serve(stream, remote_addr, "http", dispatcher, admin).await,
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error on {}: {}", local_addr, e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Mimic on {} stopped accepting connections", local_addr);
                        break;
                    }
                }
            }
        });

        ServerHandle {
            local_addr,
            shutdown_tx,
            task,
        }
    }
}

/// Handle to a running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    /// Connections already being served run to completion.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("Accept loop ended abnormally: {}", e);
        }
    }
}

async fn serve<I>(
    io: I,
    remote_addr: SocketAddr,
    scheme: &'static str,
    dispatcher: Dispatcher,
    admin: AdminContext,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(io);
    let service = service_fn(move |req| {
        let dispatcher = dispatcher.clone();
        let admin = admin.clone();
        async move { handle_request(req, remote_addr, scheme, &dispatcher, &admin).await }
    });

    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
        debug!("Connection error from {}: {}", remote_addr, e);
    }
}

async fn handle_request(
    req: Request<Incoming>,
    remote_addr: SocketAddr,
    scheme: &'static str,
    dispatcher: &Dispatcher,
    admin: &AdminContext,
) -> Result<Response<Full<Bytes>>, ConnectionDropped> {
    if is_admin_path(req.uri().path()) {
        return Ok(route_request(req, admin).await);
    }

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return Ok(build_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read request body: {e}"),
            ))
        }
    };

    let request = RecordedRequest::from_parts(
        &parts.method,
        &parts.uri,
        &parts.headers,
        body,
        Some(remote_addr),
    )
    .with_scheme(scheme);

    match dispatcher.dispatch(request).await {
        MockReply::Respond(response) => Ok(response),
        MockReply::DropConnection => Err(ConnectionDropped),
    }
}

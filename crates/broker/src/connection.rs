// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! STOMP connection with automatic reconnect.
//!
//! The reader task owns the receive half and forwards MESSAGE frames into a
//! bounded channel; the agent loop is the single consumer. Publishes
//! serialize through one writer half. On connection loss the reader task
//! reconnects with backoff and replays subscriptions; if reconnection fails
//! the inbound channel closes, which agents treat as fatal.

use crate::frame::{read_frame, Frame, FrameError};
use crate::settings::BrokerSettings;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, error, info, warn};

const CONNECT_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Dead-peer detection: three missed server heartbeat windows.
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const INBOUND_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to broker after {attempts} attempts: {last_error}")]
    ConnectFailed { attempts: u32, last_error: String },

    #[error("broker rejected the connection: {0}")]
    Rejected(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("not connected")]
    NotConnected,

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A message delivered on a subscribed destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub destination: String,
    pub body: String,
}

enum BrokerStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for BrokerStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            BrokerStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for BrokerStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            BrokerStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            BrokerStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plain(s) => Pin::new(s).poll_flush(cx),
            BrokerStream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            BrokerStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

type FrameReader = BufReader<ReadHalf<BrokerStream>>;

struct Shared {
    settings: BrokerSettings,
    client_id: String,
    writer: tokio::sync::Mutex<Option<WriteHalf<BrokerStream>>>,
    connected: AtomicBool,
    closed: AtomicBool,
    subscriptions: Mutex<Vec<(String, String)>>,
    next_subscription: AtomicU64,
    inbound: Mutex<Option<mpsc::Sender<Inbound>>>,
}

/// Handle to a live broker session.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    /// Connect and spawn the reader and heartbeat tasks. Blocks until the
    /// CONNECTED frame is received; 3 attempts with 5-second backoff, then
    /// the agent is expected to exit.
    pub async fn connect(
        settings: BrokerSettings,
        client_id: &str,
    ) -> Result<(Self, mpsc::Receiver<Inbound>), TransportError> {
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let shared = Arc::new(Shared {
            settings,
            client_id: client_id.to_string(),
            writer: tokio::sync::Mutex::new(None),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            inbound: Mutex::new(Some(tx)),
        });

        let reader = establish_with_retry(&shared).await?;
        tokio::spawn(read_loop(Arc::clone(&shared), reader));

        let weak = Arc::downgrade(&shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else { return };
                if shared.closed.load(Ordering::SeqCst) {
                    return;
                }
                if shared.connected.load(Ordering::SeqCst) {
                    let mut writer = shared.writer.lock().await;
                    if let Some(w) = writer.as_mut() {
                        if let Err(e) = w.write_all(b"\n").await {
                            debug!(error = %e, "heartbeat write failed");
                        }
                    }
                }
            }
        });

        Ok((Self { shared }, rx))
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Subscribe with auto ack. The subscription is replayed after reconnect.
    pub async fn subscribe(&self, destination: &str) -> Result<(), TransportError> {
        let id = format!(
            "sub-{}",
            self.shared.next_subscription.fetch_add(1, Ordering::SeqCst)
        );
        self.shared
            .subscriptions
            .lock()
            .push((destination.to_string(), id.clone()));
        let frame = Frame::new("SUBSCRIBE")
            .header("destination", destination)
            .header("id", id)
            .header("ack", "auto");
        self.send_frame(frame).await?;
        info!(destination, "subscribed");
        Ok(())
    }

    /// Publish raw bytes with the given headers.
    pub async fn send(
        &self,
        destination: &str,
        body: &[u8],
        headers: &[(String, String)],
    ) -> Result<(), TransportError> {
        let mut frame = Frame::new("SEND")
            .header("destination", destination)
            .header("content-type", "application/json");
        for (name, value) in headers {
            frame = frame.header(name, value.clone());
        }
        self.send_frame(frame.body(body.to_vec())).await
    }

    /// Publish a JSON value with the given headers.
    pub async fn send_json<T: serde::Serialize>(
        &self,
        destination: &str,
        value: &T,
        headers: &[(String, String)],
    ) -> Result<(), TransportError> {
        let body = serde_json::to_vec(value)?;
        self.send(destination, &body, headers).await
    }

    /// Publish and swallow failures. Status broadcasts are best-effort; the
    /// slice queue relies on broker persistence, not sender retries.
    pub async fn publish_best_effort<T: serde::Serialize>(
        &self,
        destination: &str,
        value: &T,
        headers: &[(String, String)],
    ) {
        if let Err(e) = self.send_json(destination, value, headers).await {
            warn!(destination, error = %e, "publish failed, continuing");
        }
    }

    /// Clean shutdown: DISCONNECT, stop the background tasks, close the
    /// inbound channel.
    pub async fn disconnect(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        let _ = self.send_frame(Frame::new("DISCONNECT")).await;
        let mut writer = self.shared.writer.lock().await;
        if let Some(mut w) = writer.take() {
            let _ = w.shutdown().await;
        }
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.inbound.lock().take();
        info!("disconnected from broker");
    }

    async fn send_frame(&self, frame: Frame) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let mut writer = self.shared.writer.lock().await;
        let w = writer.as_mut().ok_or(TransportError::NotConnected)?;
        w.write_all(&frame.encode()).await?;
        w.flush().await?;
        Ok(())
    }
}

async fn open_stream(settings: &BrokerSettings) -> Result<BrokerStream, TransportError> {
    let tcp = TcpStream::connect((settings.host.as_str(), settings.port)).await?;
    if !settings.use_ssl {
        return Ok(BrokerStream::Plain(tcp));
    }

    let mut roots = RootCertStore::empty();
    if let Some(ca_path) = &settings.ssl_ca_certs {
        let pem = std::fs::read(ca_path)
            .map_err(|e| TransportError::Tls(format!("cannot read {}: {e}", ca_path.display())))?;
        for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
            let cert = cert.map_err(|e| TransportError::Tls(format!("bad CA cert: {e}")))?;
            roots
                .add(cert)
                .map_err(|e| TransportError::Tls(format!("bad CA cert: {e}")))?;
        }
    } else {
        warn!("SSL enabled but no CA certificate file configured");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(settings.host.clone())
        .map_err(|e| TransportError::Tls(format!("invalid server name: {e}")))?;
    let tls = connector.connect(server_name, tcp).await?;
    Ok(BrokerStream::Tls(Box::new(tls)))
}

/// One connection attempt: open the stream, handshake, install the writer,
/// and replay subscriptions.
async fn establish(shared: &Arc<Shared>) -> Result<FrameReader, TransportError> {
    let stream = open_stream(&shared.settings).await?;
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let connect = Frame::new("CONNECT")
        .header("accept-version", "1.1,1.2")
        .header("host", shared.settings.host.clone())
        .header("login", shared.settings.user.clone())
        .header("passcode", shared.settings.password.clone())
        .header("heart-beat", "30000,30000")
        .header("client-id", shared.client_id.clone());
    write_half.write_all(&connect.encode()).await?;
    write_half.flush().await?;

    let reply = read_frame(&mut reader)
        .await?
        .ok_or(TransportError::NotConnected)?;
    match reply.command.as_str() {
        "CONNECTED" => {
            debug!(
                version = reply.get_header("version").unwrap_or("1.1"),
                "broker connected"
            );
        }
        "ERROR" => {
            let detail = reply.body_text().unwrap_or("(no detail)").to_string();
            return Err(TransportError::Rejected(detail));
        }
        other => {
            return Err(TransportError::Rejected(format!(
                "unexpected frame: {other}"
            )));
        }
    }

    let subscriptions = shared.subscriptions.lock().clone();
    for (destination, id) in subscriptions {
        let frame = Frame::new("SUBSCRIBE")
            .header("destination", destination.as_str())
            .header("id", id)
            .header("ack", "auto");
        write_half.write_all(&frame.encode()).await?;
    }
    write_half.flush().await?;

    *shared.writer.lock().await = Some(write_half);
    shared.connected.store(true, Ordering::SeqCst);
    Ok(reader)
}

async fn establish_with_retry(shared: &Arc<Shared>) -> Result<FrameReader, TransportError> {
    let mut last_error = String::new();
    for attempt in 1..=CONNECT_ATTEMPTS {
        info!(
            host = %shared.settings.host,
            port = shared.settings.port,
            attempt,
            "connecting to broker"
        );
        match establish(shared).await {
            Ok(reader) => return Ok(reader),
            Err(e) => {
                warn!(attempt, error = %e, "broker connection attempt failed");
                last_error = e.to_string();
            }
        }
        if attempt < CONNECT_ATTEMPTS {
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
    Err(TransportError::ConnectFailed {
        attempts: CONNECT_ATTEMPTS,
        last_error,
    })
}

/// Reader task: forward MESSAGE frames until the connection dies, then
/// reconnect. Exits when the connection is closed, the consumer goes away,
/// or reconnection is exhausted (closing the inbound channel either way).
async fn read_loop(shared: Arc<Shared>, mut reader: FrameReader) {
    loop {
        loop {
            let frame = match tokio::time::timeout(IDLE_TIMEOUT, read_frame(&mut reader)).await {
                Err(_) => {
                    warn!("no broker traffic within heartbeat window, reconnecting");
                    break;
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "broker read failed");
                    break;
                }
                Ok(Ok(None)) => {
                    info!("broker closed the connection");
                    break;
                }
                Ok(Ok(Some(frame))) => frame,
            };

            match frame.command.as_str() {
                "MESSAGE" => {
                    let destination = frame
                        .get_header("destination")
                        .unwrap_or_default()
                        .to_string();
                    let body = match frame.body_text() {
                        Ok(text) => text.to_string(),
                        Err(_) => {
                            warn!(%destination, "dropping non-UTF-8 message body");
                            continue;
                        }
                    };
                    let sender = shared.inbound.lock().clone();
                    match sender {
                        Some(tx) => {
                            if tx.send(Inbound { destination, body }).await.is_err() {
                                return;
                            }
                        }
                        None => return,
                    }
                }
                "ERROR" => {
                    error!(
                        detail = frame.body_text().unwrap_or("(no detail)"),
                        "broker error frame"
                    );
                }
                other => debug!(command = other, "ignoring frame"),
            }
        }

        shared.connected.store(false, Ordering::SeqCst);
        *shared.writer.lock().await = None;
        if shared.closed.load(Ordering::SeqCst) {
            return;
        }

        match establish_with_retry(&shared).await {
            Ok(r) => {
                info!("broker reconnected, subscriptions restored");
                reader = r;
            }
            Err(e) => {
                error!(error = %e, "broker reconnection exhausted");
                shared.inbound.lock().take();
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;

// src/sink/stomp/mod.rs

//! STOMP 1.2 binding for [`QueueSink`].
//!
//! The socket work is async (`tokio`), but the sink is called from the
//! synchronous watch thread, so every operation is driven through a runtime
//! [`Handle`]. Calls must therefore come from outside the runtime's own
//! worker threads (the watch thread, `main`, or `spawn_blocking`).
//!
//! Each `SEND` carries a `receipt` header and the sink waits for the
//! matching `RECEIPT`, so a successful `send` means the broker took the
//! message.

pub mod frame;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context};
use tokio::io::BufStream;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tracing::{debug, info, info_span, warn, Span};

use crate::config::QueueSettings;
use crate::errors::{DirpubError, Result};
use crate::sink::{Message, QueueSink};

use self::frame::{read_frame, write_frame, Frame};

const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug)]
struct StompConnection {
    stream: BufStream<TcpStream>,
}

impl StompConnection {
    async fn open(settings: &QueueSettings) -> anyhow::Result<Self> {
        let authority = settings.address.authority();
        let stream = TcpStream::connect(&authority)
            .await
            .with_context(|| format!("connecting to {authority}"))?;
        let mut conn = Self {
            stream: BufStream::new(stream),
        };

        let connect = Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", settings.address.host.clone())
            .header("login", settings.user.clone())
            .header("passcode", settings.password.clone())
            .header("heart-beat", "0,0");
        write_frame(&mut conn.stream, &connect).await?;

        let reply = read_frame(&mut conn.stream).await?;
        match reply.command.as_str() {
            "CONNECTED" => {
                debug!(
                    version = reply.get("version").unwrap_or("?"),
                    server = reply.get("server").unwrap_or("?"),
                    "STOMP session established"
                );
                Ok(conn)
            }
            "ERROR" => bail!("server refused connection: {}", reply.error_message()),
            other => bail!("unexpected {other} frame in reply to CONNECT"),
        }
    }

    /// Write `frame` and wait for the `RECEIPT` carrying `receipt`.
    async fn request(&mut self, frame: &Frame, receipt: &str) -> anyhow::Result<()> {
        write_frame(&mut self.stream, frame).await?;
        let reply = read_frame(&mut self.stream).await?;
        match reply.command.as_str() {
            "RECEIPT" if reply.get("receipt-id") == Some(receipt) => Ok(()),
            "RECEIPT" => Err(anyhow!(
                "receipt {:?} does not match request {receipt:?}",
                reply.get("receipt-id")
            )),
            "ERROR" => Err(anyhow!("{}", reply.error_message())),
            other => Err(anyhow!("unexpected {other} frame in reply to {}", frame.command)),
        }
    }
}

/// Queue sink speaking STOMP over TCP.
#[derive(Debug)]
pub struct StompSink {
    settings: QueueSettings,
    runtime: Handle,
    connection: Mutex<Option<StompConnection>>,
    next_receipt: AtomicU64,
    span: Span,
}

impl StompSink {
    pub fn new(settings: QueueSettings, runtime: Handle) -> Self {
        let span = info_span!("stomp", server = %settings.address, queue = %settings.name);
        Self {
            settings,
            runtime,
            connection: Mutex::new(None),
            next_receipt: AtomicU64::new(1),
            span,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Broker destination for the configured queue name.
    pub fn destination(&self) -> String {
        let name = &self.settings.name;
        if name.starts_with('/') {
            name.clone()
        } else {
            format!("/queue/{name}")
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<StompConnection>> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn receipt_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_receipt.fetch_add(1, Ordering::Relaxed))
    }

    fn open(&self) -> Result<StompConnection> {
        if self.settings.address.is_secure() {
            return Err(DirpubError::ConnectionError(format!(
                "{} uses a secure transport, which the STOMP adapter does not provide; use tcp://",
                self.settings.address
            )));
        }
        self.runtime
            .block_on(StompConnection::open(&self.settings))
            .map_err(|err| DirpubError::ConnectionError(format!("{err:#}")))
    }

    /// Build the `SEND` frame for `message`.
    ///
    /// Protocol headers come first: STOMP keeps the first occurrence of a
    /// repeated header, so message headers cannot override them.
    pub fn send_frame(&self, message: &Message, receipt: &str) -> Frame {
        let mut frame = Frame::new("SEND")
            .header("destination", self.destination())
            .header("content-type", CONTENT_TYPE)
            .header("content-length", message.body.len().to_string())
            .header("receipt", receipt);
        for (name, value) in &message.headers {
            frame = frame.header(name.clone(), value.clone());
        }
        frame.body(message.body.as_bytes())
    }
}

impl QueueSink for StompSink {
    fn connect(&self) -> Result<()> {
        let _enter = self.span.enter();
        info!(user = %self.settings.user, "connecting to queue server");
        let conn = self.open()?;
        *self.lock() = Some(conn);
        info!("connected to queue server");
        Ok(())
    }

    fn send(&self, message: &Message) -> Result<()> {
        let _enter = self.span.enter();
        let mut guard = self.lock();

        if guard.is_none() {
            // The previous send broke the session; try once to get it back.
            debug!("no open session, reconnecting before send");
            let conn = self
                .open()
                .map_err(|err| DirpubError::SendError(err.to_string()))?;
            *guard = Some(conn);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(DirpubError::SendError("not connected".to_string()));
        };

        let receipt = self.receipt_id("msg");
        let frame = self.send_frame(message, &receipt);
        match self.runtime.block_on(conn.request(&frame, &receipt)) {
            Ok(()) => {
                debug!(receipt = %receipt, bytes = message.body.len(), "broker acknowledged message");
                Ok(())
            }
            Err(err) => {
                // The broker closes the session after an ERROR frame, and an
                // I/O failure leaves the stream in an unknown state.
                *guard = None;
                Err(DirpubError::SendError(format!("{err:#}")))
            }
        }
    }

    fn close(&self) {
        let _enter = self.span.enter();
        let Some(mut conn) = self.lock().take() else {
            return;
        };

        info!("closing queue connection");
        let receipt = self.receipt_id("disconnect");
        let frame = Frame::new("DISCONNECT").header("receipt", receipt.clone());
        if let Err(err) = self.runtime.block_on(conn.request(&frame, &receipt)) {
            warn!(error = %format!("{err:#}"), "unable to close queue connection cleanly");
        }
    }
}

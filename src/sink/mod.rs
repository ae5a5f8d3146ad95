// src/sink/mod.rs

//! Message-queue side of the bridge.
//!
//! The core only depends on the [`QueueSink`] trait. The concrete broker
//! binding lives in [`stomp`]; tests plug in their own implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::Result;

pub mod stomp;

pub use stomp::StompSink;

/// A text message with optional named headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl Message {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Endpoint receiving published messages.
///
/// - `connect` fails with [`DirpubError::ConnectionError`] on authentication
///   or network failure.
/// - `send` fails with [`DirpubError::SendError`] when the transport rejects
///   or cannot deliver the message.
/// - `close` is best effort and only logs.
///
/// [`DirpubError::ConnectionError`]: crate::errors::DirpubError::ConnectionError
/// [`DirpubError::SendError`]: crate::errors::DirpubError::SendError
pub trait QueueSink: Send + Sync {
    fn connect(&self) -> Result<()>;
    fn send(&self, message: &Message) -> Result<()>;
    fn close(&self);
}

impl<T: QueueSink + ?Sized> QueueSink for Arc<T> {
    fn connect(&self) -> Result<()> {
        (**self).connect()
    }

    fn send(&self, message: &Message) -> Result<()> {
        (**self).send(message)
    }

    fn close(&self) {
        (**self).close()
    }
}

//! In-memory [`QueueSink`] used in place of a broker.

use std::sync::{Arc, Mutex, MutexGuard};

use dirpub::errors::{DirpubError, Result};
use dirpub::sink::{Message, QueueSink};

#[derive(Debug, Default)]
struct FakeSinkState {
    connected: bool,
    closed: bool,
    fail_connect: bool,
    fail_sends: bool,
    send_attempts: usize,
    messages: Vec<Message>,
}

/// Records every accepted message. Clones share state, so a test can keep
/// one clone and hand another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct FakeSink {
    state: Arc<Mutex<FakeSinkState>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeSinkState> {
        self.state.lock().unwrap()
    }

    pub fn fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn send_attempts(&self) -> usize {
        self.lock().send_attempts
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl QueueSink for FakeSink {
    fn connect(&self) -> Result<()> {
        let mut state = self.lock();
        if state.fail_connect {
            return Err(DirpubError::ConnectionError("fake broker refused login".into()));
        }
        state.connected = true;
        Ok(())
    }

    fn send(&self, message: &Message) -> Result<()> {
        let mut state = self.lock();
        state.send_attempts += 1;
        if state.fail_sends {
            return Err(DirpubError::SendError("fake broker rejected message".into()));
        }
        state.messages.push(message.clone());
        Ok(())
    }

    fn close(&self) {
        let mut state = self.lock();
        state.connected = false;
        state.closed = true;
    }
}

//! A minimal in-process STOMP broker for exercising `StompSink`.
//!
//! Accepts any number of connections on `127.0.0.1`, records every frame it
//! receives and answers `CONNECT`, `SEND` and `DISCONNECT` the way a real
//! broker would. Nothing is routed anywhere.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use dirpub::sink::stomp::frame::{read_frame, write_frame, Frame};
use tokio::io::BufStream;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;

#[derive(Debug, Clone, Default)]
pub struct BrokerOptions {
    /// Credentials the broker accepts. `None` accepts anything.
    pub login: Option<(String, String)>,
    /// Answer every `SEND` with an `ERROR` frame and drop the connection.
    pub reject_sends: bool,
}

#[derive(Debug, Default)]
struct BrokerState {
    options: BrokerOptions,
    frames: Vec<Frame>,
    connections: usize,
}

#[derive(Debug, Clone)]
pub struct FakeBroker {
    addr: SocketAddr,
    state: Arc<Mutex<BrokerState>>,
}

impl FakeBroker {
    /// Bind to an ephemeral port and serve on `runtime`.
    ///
    /// Call from outside the runtime (a plain `#[test]`).
    pub fn start(runtime: &Handle, options: BrokerOptions) -> std::io::Result<Self> {
        let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0"))?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(BrokerState {
            options,
            ..BrokerState::default()
        }));

        let accept_state = Arc::clone(&state);
        runtime.spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_state.lock().unwrap().connections += 1;
                tokio::spawn(serve(stream, Arc::clone(&accept_state)));
            }
        });

        Ok(Self { addr, state })
    }

    /// `tcp://127.0.0.1:<port>`
    pub fn url(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap()
    }

    pub fn set_reject_sends(&self, reject: bool) {
        self.lock().options.reject_sends = reject;
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.lock().frames.clone()
    }

    /// Frames with the given command, in arrival order.
    pub fn frames_named(&self, command: &str) -> Vec<Frame> {
        self.lock()
            .frames
            .iter()
            .filter(|f| f.command == command)
            .cloned()
            .collect()
    }

    pub fn connections(&self) -> usize {
        self.lock().connections
    }
}

async fn serve(stream: TcpStream, state: Arc<Mutex<BrokerState>>) {
    let mut stream = BufStream::new(stream);
    loop {
        let Ok(frame) = read_frame(&mut stream).await else {
            return;
        };
        let (reply, keep_open) = {
            let mut state = state.lock().unwrap();
            state.frames.push(frame.clone());
            answer(&state.options, &frame)
        };
        if let Some(reply) = reply {
            if write_frame(&mut stream, &reply).await.is_err() {
                return;
            }
        }
        if !keep_open {
            return;
        }
    }
}

fn answer(options: &BrokerOptions, frame: &Frame) -> (Option<Frame>, bool) {
    let receipt = |f: &Frame| {
        f.get("receipt")
            .map(|id| Frame::new("RECEIPT").header("receipt-id", id))
    };

    match frame.command.as_str() {
        "CONNECT" | "STOMP" => {
            let accepted = match &options.login {
                Some((user, pass)) => {
                    frame.get("login") == Some(user.as_str())
                        && frame.get("passcode") == Some(pass.as_str())
                }
                None => true,
            };
            if accepted {
                let reply = Frame::new("CONNECTED")
                    .header("version", "1.2")
                    .header("server", "fake-broker/0.1");
                (Some(reply), true)
            } else {
                let reply = Frame::new("ERROR")
                    .header("message", "access denied")
                    .body("invalid login or passcode");
                (Some(reply), false)
            }
        }
        "SEND" if options.reject_sends => {
            let reply = Frame::new("ERROR")
                .header("message", "destination is full")
                .header("receipt-id", frame.get("receipt").unwrap_or_default());
            (Some(reply), false)
        }
        "SEND" => (receipt(frame), true),
        "DISCONNECT" => (receipt(frame), false),
        other => {
            let reply = Frame::new("ERROR").header("message", format!("unsupported frame {other}"));
            (Some(reply), false)
        }
    }
}

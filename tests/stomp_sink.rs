//! `StompSink` against the in-process fake broker.
//!
//! These are plain `#[test]`s: the sink blocks on the runtime handle, which
//! is only allowed from outside the runtime.

mod common;

use common::TestResult;
use dirpub::config::QueueSettings;
use dirpub::errors::DirpubError;
use dirpub::sink::{Message, QueueSink, StompSink};
use dirpub_test_utils::{init_tracing, wait_until, BrokerOptions, FakeBroker};
use tokio::runtime::Runtime;

fn settings(server: &str, user: &str, password: &str, queue: &str) -> QueueSettings {
    QueueSettings {
        address: server.parse().unwrap(),
        user: user.to_string(),
        password: password.to_string(),
        name: queue.to_string(),
        tls: None,
    }
}

fn broker(rt: &Runtime, options: BrokerOptions) -> FakeBroker {
    FakeBroker::start(rt.handle(), options).unwrap()
}

#[test]
fn connect_sends_credentials() -> TestResult {
    init_tracing();
    let rt = Runtime::new()?;
    let broker = broker(&rt, BrokerOptions::default());
    let sink = StompSink::new(settings(&broker.url(), "me", "pw", "orders"), rt.handle().clone());

    sink.connect()?;
    assert!(sink.is_connected());

    let connects = broker.frames_named("CONNECT");
    assert_eq!(connects.len(), 1);
    assert_eq!(connects[0].get("accept-version"), Some("1.2"));
    assert_eq!(connects[0].get("login"), Some("me"));
    assert_eq!(connects[0].get("passcode"), Some("pw"));
    Ok(())
}

#[test]
fn rejected_login_is_a_connection_error() -> TestResult {
    init_tracing();
    let rt = Runtime::new()?;
    let broker = broker(
        &rt,
        BrokerOptions {
            login: Some(("me".into(), "right".into())),
            ..BrokerOptions::default()
        },
    );
    let sink = StompSink::new(settings(&broker.url(), "me", "wrong", "orders"), rt.handle().clone());

    let err = sink.connect().unwrap_err();
    assert!(matches!(err, DirpubError::ConnectionError(_)), "{err}");
    assert!(err.to_string().contains("access denied"), "{err}");
    assert!(!sink.is_connected());
    Ok(())
}

#[test]
fn unreachable_server_is_a_connection_error() -> TestResult {
    init_tracing();
    let rt = Runtime::new()?;
    // Bind and drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    let sink = StompSink::new(
        settings(&format!("tcp://127.0.0.1:{port}"), "u", "p", "q"),
        rt.handle().clone(),
    );
    assert!(matches!(sink.connect(), Err(DirpubError::ConnectionError(_))));
    Ok(())
}

#[test]
fn secure_transport_is_refused() -> TestResult {
    init_tracing();
    let rt = Runtime::new()?;
    let sink = StompSink::new(settings("ssl://127.0.0.1:1", "u", "p", "q"), rt.handle().clone());
    let err = sink.connect().unwrap_err();
    assert!(matches!(err, DirpubError::ConnectionError(_)));
    assert!(err.to_string().contains("tcp://"), "{err}");
    Ok(())
}

#[test]
fn send_waits_for_receipt_and_carries_headers() -> TestResult {
    init_tracing();
    let rt = Runtime::new()?;
    let broker = broker(&rt, BrokerOptions::default());
    let sink = StompSink::new(settings(&broker.url(), "u", "p", "orders"), rt.handle().clone());
    sink.connect()?;

    let message = Message::text("<order>\u{e9}</order>\n")
        .with_header("Priority", "4")
        .with_header("x-route", "a:b");
    sink.send(&message)?;
    sink.send(&Message::text("second"))?;

    let sends = broker.frames_named("SEND");
    assert_eq!(sends.len(), 2);
    let first = &sends[0];
    assert_eq!(first.get("destination"), Some("/queue/orders"));
    assert_eq!(first.get("Priority"), Some("4"));
    assert_eq!(first.get("x-route"), Some("a:b"));
    assert_eq!(first.body, message.body.as_bytes());
    assert_eq!(
        first.get("content-length"),
        Some(message.body.len().to_string().as_str())
    );
    assert_ne!(first.get("receipt"), sends[1].get("receipt"));
    Ok(())
}

#[test]
fn message_headers_cannot_redirect_the_destination() -> TestResult {
    init_tracing();
    let rt = Runtime::new()?;
    let broker = broker(&rt, BrokerOptions::default());
    let sink = StompSink::new(settings(&broker.url(), "u", "p", "orders"), rt.handle().clone());
    sink.connect()?;

    sink.send(&Message::text("x").with_header("destination", "/queue/elsewhere"))?;
    let sends = broker.frames_named("SEND");
    assert_eq!(sends[0].get("destination"), Some("/queue/orders"));
    Ok(())
}

#[test]
fn broker_error_is_a_send_error_and_next_send_reconnects() -> TestResult {
    init_tracing();
    let rt = Runtime::new()?;
    let broker = broker(&rt, BrokerOptions::default());
    let sink = StompSink::new(settings(&broker.url(), "u", "p", "orders"), rt.handle().clone());
    sink.connect()?;

    broker.set_reject_sends(true);
    let err = sink.send(&Message::text("x")).unwrap_err();
    assert!(matches!(err, DirpubError::SendError(_)), "{err}");
    assert!(!sink.is_connected());

    broker.set_reject_sends(false);
    sink.send(&Message::text("y"))?;
    assert!(sink.is_connected());
    assert!(wait_until(std::time::Duration::from_secs(5), || broker.connections() == 2));
    Ok(())
}

#[test]
fn close_disconnects_and_is_idempotent() -> TestResult {
    init_tracing();
    let rt = Runtime::new()?;
    let broker = broker(&rt, BrokerOptions::default());
    let sink = StompSink::new(settings(&broker.url(), "u", "p", "/topic/raw"), rt.handle().clone());
    assert_eq!(sink.destination(), "/topic/raw");
    sink.connect()?;

    sink.close();
    sink.close();
    assert!(!sink.is_connected());
    assert_eq!(broker.frames_named("DISCONNECT").len(), 1);
    Ok(())
}

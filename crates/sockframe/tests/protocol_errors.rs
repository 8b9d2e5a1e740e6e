//! S3 (signature mismatch), S4 (negative size), S5 (unknown type): a raw
//! peer (plain `std::net::TcpStream`, not a second `Endpoint`) writes
//! malformed frames at a listening endpoint and we assert on the resulting
//! listener notifications and post-condition state.

mod common;

use std::{
    io::Write,
    net::TcpStream,
    sync::Arc,
    time::Duration,
};

use common::{RecordingListener, TestRegistry, free_port, wait_for};
use sockframe::{EndpointConfig, Endpoint, ErrorKind, HEADER_WORD, LifecycleState};

fn spawn_listening(registry: Arc<TestRegistry>) -> (Endpoint, Arc<RecordingListener>, u16) {
    common::init_tracing();
    let port = free_port();
    let server = Endpoint::new(EndpointConfig::new(), registry);
    let listener = Arc::new(RecordingListener::new());
    server.add_listener(Box::new(listener.clone()));
    server.listen("127.0.0.1", port);
    wait_for(Duration::from_secs(2), || (server.state() == LifecycleState::Listening).then_some(()));
    (server, listener, port)
}

fn header_bytes() -> [u8; 4] {
    HEADER_WORD.to_be_bytes()
}

#[test]
fn signature_mismatch_is_non_fatal_and_recovers() {
    let registry = Arc::new(TestRegistry::new([5]));
    let (server, listener, port) = spawn_listening(registry);

    let mut peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
    wait_for(Duration::from_secs(2), || (server.state() == LifecycleState::Connected).then_some(()));

    // S3: bad signature, major/minor otherwise matching.
    let bad = [0xDEu8, 0xAD, 0x01, 0x00];
    peer.write_all(&bad).unwrap();

    wait_for(Duration::from_secs(2), || {
        listener.errors_snapshot().iter().any(|e| e.kind == ErrorKind::ReceiveFailed).then_some(())
    });
    assert_eq!(server.state(), LifecycleState::Connected);

    // Next legal frame still parses correctly.
    let mut frame = header_bytes().to_vec();
    frame.extend_from_slice(&3i32.to_be_bytes());
    frame.extend_from_slice(&5u32.to_be_bytes());
    frame.extend_from_slice(&[0x01, 0x02, 0x03]);
    peer.write_all(&frame).unwrap();

    let received = wait_for(Duration::from_secs(2), || server.take_received());
    assert_eq!(received.serialize(), vec![0x01, 0x02, 0x03]);

    server.close();
}

#[test]
fn negative_size_is_non_fatal() {
    let registry = Arc::new(TestRegistry::new([5]));
    let (server, listener, port) = spawn_listening(registry);

    let mut peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
    wait_for(Duration::from_secs(2), || (server.state() == LifecycleState::Connected).then_some(()));

    let mut frame = header_bytes().to_vec();
    frame.extend_from_slice(&(-1i32).to_be_bytes());
    peer.write_all(&frame).unwrap();

    wait_for(Duration::from_secs(2), || {
        listener.errors_snapshot().iter().any(|e| e.kind == ErrorKind::ReceiveFailed).then_some(())
    });
    assert_eq!(server.state(), LifecycleState::Connected);

    server.close();
}

#[test]
fn unknown_type_is_non_fatal_and_queue_unaffected() {
    let registry = Arc::new(TestRegistry::new([5]));
    let (server, listener, port) = spawn_listening(registry);

    let mut peer = TcpStream::connect(("127.0.0.1", port)).unwrap();
    wait_for(Duration::from_secs(2), || (server.state() == LifecycleState::Connected).then_some(()));

    let mut frame = header_bytes().to_vec();
    frame.extend_from_slice(&1i32.to_be_bytes());
    frame.extend_from_slice(&9999u32.to_be_bytes());
    frame.extend_from_slice(&[0x00]);
    peer.write_all(&frame).unwrap();

    wait_for(Duration::from_secs(2), || {
        listener.errors_snapshot().iter().any(|e| e.kind == ErrorKind::UnknownMessageType).then_some(())
    });
    assert!(server.take_received().is_none());

    server.close();
}

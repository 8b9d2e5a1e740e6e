//! S1: listener accepts one connection, one message round-trips end to end.

mod common;

use std::{sync::Arc, time::Duration};

use common::{RecordingListener, TestMsg, TestRegistry, free_port, wait_for};
use sockframe::{EndpointConfig, Endpoint, LifecycleState};

#[test]
fn handshake_and_one_message() {
    common::init_tracing();
    let port = free_port();
    let registry = Arc::new(TestRegistry::new([5]));

    let server = Endpoint::new(EndpointConfig::new(), registry.clone());
    let server_listener = Arc::new(RecordingListener::new());
    server.add_listener(Box::new(server_listener.clone()));
    server.listen("127.0.0.1", port);

    wait_for(Duration::from_secs(2), || (server.state() == LifecycleState::Listening).then_some(()));

    let client = Endpoint::new(EndpointConfig::new(), registry);
    client.connect("127.0.0.1", port);

    wait_for(Duration::from_secs(2), || (client.state() == LifecycleState::Connected).then_some(()));
    wait_for(Duration::from_secs(2), || (server.state() == LifecycleState::Connected).then_some(()));

    client.send(Box::new(TestMsg::new(5, vec![0x01, 0x02, 0x03])));

    let received = wait_for(Duration::from_secs(2), || server.take_received());
    assert_eq!(received.type_id(), 5);
    assert_eq!(received.serialize(), vec![0x01, 0x02, 0x03]);

    assert_eq!(server_listener.message_count(), 1);

    client.close();
    server.close();
}

//! Connection lifecycle of a client talking to the relay

use crate::stepper::ClientStepper;
use bevy_transform::components::Transform;
use cubesync::messages::{Inbound, decode};
use cubesync::prelude::*;
use test_log::test;

#[test]
fn test_join_is_sent_first() {
    let mut stepper = ClientStepper::single();
    let world = stepper.world_mut(0);
    world.spawn((Player, Transform::default()));
    world.spawn((Cube, Transform::from_xyz(1.0, 0.0, 0.0)));
    world.spawn((Cube, Transform::from_xyz(2.0, 0.0, 0.0)));
    stepper.connect_all();
    assert_eq!(stepper.state(0), ClientState::Connected);

    let received = stepper.server.received();
    assert_eq!(received.len(), 2);
    assert_eq!(
        received[0].1,
        r#"{"playerId":"player:alpha-1","platform":"test"}"#
    );
    let Ok(Inbound::Cubes(batch)) = decode(&received[1].1) else {
        panic!("expected a batch, got {:?}", received[1].1);
    };
    assert_eq!(batch.len(), 3);
    assert!(batch.cubes.iter().any(|cube| cube.id.as_str() == "player:alpha-1"));
    assert_eq!(
        batch
            .cubes
            .iter()
            .filter(|cube| cube.id.as_str().starts_with("cube:alpha:"))
            .count(),
        2
    );
}

#[test]
fn test_connecting_is_observable() {
    let mut stepper = ClientStepper::single();
    stepper.connect(0);
    assert_eq!(stepper.state(0), ClientState::Connecting);
    assert_eq!(stepper.state(0).label(), "Connecting...");
    assert_eq!(stepper.connection(0).handler_count(), 4);

    // a second connect request while connecting is ignored
    stepper.connect(0);
    assert_eq!(stepper.connection(0).handler_count(), 4);

    stepper.wait_for_connection();
    assert_eq!(stepper.state(0).label(), "Connected");
    assert_eq!(stepper.server.client_ids().len(), 1);
}

#[test]
fn test_refused_connection() {
    let mut stepper = ClientStepper::single();
    stepper.server.refuse_connections(true);

    let result = stepper.connection_mut(0).connect();
    assert!(matches!(
        result,
        Err(ConnectionError::Transport(TransportError::Refused(_)))
    ));
    assert_eq!(stepper.state(0), ClientState::Disconnected);
    assert_eq!(stepper.connection(0).handler_count(), 0);

    stepper.frame_step(5);
    assert_eq!(stepper.state(0), ClientState::Disconnected);
    assert!(stepper.server.client_ids().is_empty());

    // the client can retry once the server accepts connections again
    stepper.server.refuse_connections(false);
    stepper.connect_all();
    assert_eq!(stepper.state(0), ClientState::Connected);
}

#[test]
fn test_disconnect_stops_sending() {
    let mut stepper = ClientStepper::single();
    let cube = stepper
        .world_mut(0)
        .spawn((Cube, Transform::default()))
        .id();
    stepper.connect_all();
    stepper.server.take_received();

    stepper.connection_mut(0).disconnect();
    assert_eq!(stepper.state(0), ClientState::Disconnected);
    assert_eq!(stepper.connection(0).handler_count(), 0);

    stepper
        .world_mut(0)
        .get_mut::<Transform>(cube)
        .unwrap()
        .translation
        .x = 5.0;
    stepper.frame_step(300);
    assert!(stepper.server.received().is_empty());
    assert!(stepper.server.client_ids().is_empty());
}

#[test]
fn test_server_close() {
    let mut stepper = ClientStepper::single();
    let cube = stepper
        .world_mut(0)
        .spawn((Cube, Transform::default()))
        .id();
    stepper.connect_all();
    stepper.server.take_received();

    stepper.server.close_all();
    stepper.frame_step(1);
    assert_eq!(stepper.state(0), ClientState::Disconnected);

    stepper
        .world_mut(0)
        .get_mut::<Transform>(cube)
        .unwrap()
        .translation
        .x = 5.0;
    stepper.frame_step(300);
    assert!(stepper.server.received().is_empty());

    stepper.connect_all();
    assert_eq!(stepper.state(0), ClientState::Connected);
    assert_eq!(stepper.connection(0).handler_count(), 4);
}

#[test]
fn test_transport_error_while_connected() {
    let mut stepper = ClientStepper::single();
    stepper.world_mut(0).spawn((Cube, Transform::default()));
    stepper.connect_all();
    let id = stepper.server_id(0).unwrap();
    stepper.server.take_received();

    stepper.server.raise_error(id, "connection reset");
    stepper.frame_step(1);
    assert_eq!(stepper.state(0), ClientState::Disconnected);
    // handlers stay registered until the next connect
    assert_eq!(stepper.connection(0).handler_count(), 4);
    stepper.frame_step(300);
    assert!(stepper.server.received().is_empty());

    // reconnecting replaces the transport, the join is sent again
    stepper.connection_mut(0).toggle();
    stepper.wait_for_connection();
    assert_eq!(stepper.state(0), ClientState::Connected);
    assert_eq!(stepper.connection(0).handler_count(), 4);
    let received = stepper.server.received();
    assert!(received[0].1.contains(r#""playerId":"player:alpha-1""#));
    assert!(matches!(decode(&received[1].1), Ok(Inbound::Cubes(batch)) if batch.len() == 1));
}

#[test]
fn test_toggle() {
    let mut stepper = ClientStepper::single();
    stepper.connection_mut(0).toggle();
    assert_eq!(stepper.state(0), ClientState::Connecting);

    // ignored while connecting
    stepper.connection_mut(0).toggle();
    assert_eq!(stepper.state(0), ClientState::Connecting);

    stepper.wait_for_connection();
    assert_eq!(stepper.state(0), ClientState::Connected);

    stepper.connection_mut(0).toggle();
    assert_eq!(stepper.state(0), ClientState::Disconnected);
    assert_eq!(stepper.state(0).label(), "Disconnected");
}

#[test]
fn test_shutdown_refuses_connect() {
    let mut stepper = ClientStepper::single();
    stepper.connect_all();

    stepper.connection_mut(0).shutdown();
    assert_eq!(stepper.state(0), ClientState::Disconnected);
    assert!(stepper.connection(0).is_shutting_down());
    assert!(matches!(
        stepper.connection_mut(0).connect(),
        Err(ConnectionError::ShuttingDown)
    ));
    stepper.frame_step(1);
    assert!(stepper.server.client_ids().is_empty());
}

//! Publishing the local entities through the relay

use crate::stepper::ClientStepper;
use approx::assert_relative_eq;
use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use bevy_transform::components::Transform;
use core::time::Duration;
use cubesync::crossbeam::RouteMode;
use cubesync::prelude::*;
use test_log::test;

fn network_id(stepper: &ClientStepper, client: usize, entity: Entity) -> NetworkId {
    stepper
        .world(client)
        .resource::<ReplicationSet>()
        .get(entity)
        .unwrap()
        .id
        .clone()
}

fn placeholders(stepper: &mut ClientStepper, client: usize) -> usize {
    let world = stepper.world_mut(client);
    let mut query = world.query::<&Placeholder>();
    query.iter(world).count()
}

#[test]
fn test_relay_between_two_clients() {
    let mut stepper = ClientStepper::with_clients(2);
    let cube = stepper
        .world_mut(0)
        .spawn((
            Cube,
            Transform::from_xyz(1.0, 0.0, 0.0),
            DisplayColor::from_hex("#FF0000").unwrap(),
        ))
        .id();
    stepper.world_mut(0).spawn((Player, Transform::default()));
    stepper.connect_all();
    stepper.frame_step(1);

    let cube_id = network_id(&stepper, 0, cube);
    assert_eq!(stepper.remotes(1).len(), 2);
    assert!(stepper.remotes(1).get(&stepper.player_id(0)).is_some());
    assert_eq!(
        stepper.remote_translation(1, cube_id.as_str()),
        Some(Vec3::new(1.0, 0.0, 0.0))
    );
    // the sender does not see its own entities come back
    assert!(stepper.remotes(0).is_empty());

    stepper
        .world_mut(0)
        .get_mut::<Transform>(cube)
        .unwrap()
        .translation
        .x = 3.0;
    stepper.frame_step(12);
    assert_eq!(
        stepper.remote_translation(1, cube_id.as_str()),
        Some(Vec3::new(3.0, 0.0, 0.0))
    );
    assert_eq!(stepper.remotes(1).len(), 2);
    assert_eq!(placeholders(&mut stepper, 1), 2);
}

#[test]
fn test_color_is_sent_but_not_applied() {
    let mut stepper = ClientStepper::with_clients(2);
    stepper.world_mut(0).spawn((
        Cube,
        Transform::default(),
        DisplayColor::from_hex("#00FF80").unwrap(),
    ));
    stepper.connect_all();
    stepper.frame_step(1);

    let batches = stepper.take_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].1.cubes[0].color, "#00FF80");

    let (_, remote) = stepper.remotes(1).iter().next().unwrap();
    assert!(stepper.world(1).get::<DisplayColor>(remote.entity()).is_none());
}

#[test]
fn test_echo_spawns_nothing() {
    let mut stepper = ClientStepper::single();
    stepper.server.set_mode(RouteMode::Echo);
    let world = stepper.world_mut(0);
    world.spawn((Player, Transform::default()));
    world.spawn((Cube, Transform::from_xyz(1.0, 0.0, 0.0)));
    world.spawn((Cube, Transform::from_xyz(0.0, 1.0, 0.0)));
    stepper.connect_all();
    stepper.frame_step(250);

    assert!(stepper.remotes(0).is_empty());
    assert_eq!(placeholders(&mut stepper, 0), 0);
    assert_eq!(stepper.world(0).resource::<ReplicationSet>().len(), 3);
}

#[test]
fn test_threshold_gating() {
    let mut stepper = ClientStepper::single();
    let cube = stepper
        .world_mut(0)
        .spawn((Cube, Transform::default()))
        .id();
    stepper.connect_all();
    assert_eq!(stepper.take_batches().len(), 1);

    // nothing moved: no batch at all
    stepper.frame_step(50);
    assert!(stepper.take_batches().is_empty());

    // below both thresholds
    {
        let mut transform = stepper.world_mut(0).get_mut::<Transform>(cube).unwrap();
        transform.translation.x = 0.005;
        transform.rotation = Quat::from_rotation_y(0.5f32.to_radians());
    }
    stepper.frame_step(50);
    assert!(stepper.take_batches().is_empty());

    // past the position threshold
    stepper
        .world_mut(0)
        .get_mut::<Transform>(cube)
        .unwrap()
        .translation
        .x = 0.02;
    stepper.frame_step(12);
    let batches = stepper.take_batches();
    assert_eq!(batches.len(), 1);
    assert_relative_eq!(batches[0].1.cubes[0].x, 0.02);
}

#[test]
fn test_periodic_resync_reaches_late_joiner() {
    let config = ClientStepper::default_config().with_connection(
        ConnectionConfig::default()
            .with_platform("test")
            .with_resync_interval(Duration::from_millis(300)),
    );
    let mut stepper = ClientStepper::new(2, config);
    stepper
        .world_mut(0)
        .spawn((Cube, Transform::from_xyz(0.0, 0.0, 7.0)));
    stepper.connect(0);
    stepper.wait_for_connection_of(0);
    stepper.frame_step(10);

    stepper.connect(1);
    stepper.wait_for_connection_of(1);
    stepper.frame_step(3);
    // the cube has not moved since the first send
    assert!(stepper.remotes(1).is_empty());

    stepper.frame_step(30);
    assert_eq!(stepper.remotes(1).len(), 1);
}

#[test]
fn test_destroyed_entities_are_no_longer_sent() {
    let mut stepper = ClientStepper::single();
    let cube = stepper
        .world_mut(0)
        .spawn((Cube, Transform::default()))
        .id();
    stepper.world_mut(0).spawn((Player, Transform::default()));
    stepper.connect_all();
    stepper.take_batches();

    stepper.world_mut(0).despawn(cube);
    stepper.frame_step(60);
    assert_eq!(stepper.world(0).resource::<ReplicationSet>().len(), 1);
    assert!(stepper.world(0).resource::<IdentityRegistry>().get(cube).is_none());

    // the forced resync only carries the player
    stepper.frame_step(200);
    let batches = stepper.take_batches();
    assert!(!batches.is_empty());
    assert!(
        batches
            .iter()
            .all(|(_, batch)| batch.len() == 1 && batch.cubes[0].id == stepper.player_id(0))
    );
}

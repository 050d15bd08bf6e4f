//! Materializing the entities received from the relay

use crate::stepper::ClientStepper;
use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_transform::components::Transform;
use cubesync::prelude::*;
use test_log::test;

const CUBE_FRAME: &str = r##"{"type":"cubes","cubes":[{"id":"cube:abc:123","color":"#FF0000","x":1,"y":2,"z":3,"qx":0,"qy":0,"qz":0,"qw":1}]}"##;

fn count<F: bevy_ecs::query::QueryFilter>(stepper: &mut ClientStepper, client: usize) -> usize {
    let world = stepper.world_mut(client);
    let mut query = world.query_filtered::<Entity, F>();
    query.iter(world).count()
}

#[test]
fn test_injected_cube_is_spawned_once() {
    let mut stepper = ClientStepper::single();
    stepper.connect_all();

    stepper.server.inject(CUBE_FRAME);
    stepper.frame_step(1);
    assert_eq!(stepper.remotes(0).len(), 1);
    assert_eq!(
        stepper.remote_translation(0, "cube:abc:123"),
        Some(Vec3::new(1.0, 2.0, 3.0))
    );
    let remote = stepper.remotes(0).get(&NetworkId::from("cube:abc:123")).unwrap();
    assert!(remote.is_configured());
    assert_eq!(
        stepper.world(0).get::<Name>(remote.entity()).map(Name::as_str),
        Some("Remote Cube [cube:abc:123]")
    );

    // applying the same batch again changes nothing
    stepper.server.inject(CUBE_FRAME);
    stepper.server.inject(CUBE_FRAME);
    stepper.frame_step(1);
    assert_eq!(stepper.remotes(0).get(&NetworkId::from("cube:abc:123")), Some(remote));
    assert_eq!(count::<With<Placeholder>>(&mut stepper, 0), 1);
    assert_eq!(count::<With<RemoteReplica>>(&mut stepper, 0), 1);
}

#[test]
fn test_unnormalized_rotation_is_renormalized() {
    let mut stepper = ClientStepper::single();
    stepper.connect_all();

    stepper.server.inject(
        r##"{"type":"cubes","cubes":[
            {"id":"cube:abc:1","color":"#FFFFFF","x":0,"y":0,"z":0,"qx":0,"qy":0,"qz":0,"qw":2},
            {"id":"cube:abc:2","color":"#FFFFFF","x":0,"y":0,"z":0,"qx":0,"qy":0,"qz":0,"qw":0}
        ]}"##,
    );
    stepper.frame_step(1);
    for id in ["cube:abc:1", "cube:abc:2"] {
        let entity = stepper.remotes(0).get(&NetworkId::from(id)).unwrap().entity();
        let rotation = stepper.world(0).get::<Transform>(entity).unwrap().rotation;
        assert_eq!(rotation, bevy_math::Quat::IDENTITY);
    }
}

#[test]
fn test_remote_player_kind() {
    let mut stepper = ClientStepper::single();
    stepper.connect_all();

    stepper.server.inject(
        r##"{"type":"cubes","cubes":[{"id":"player:abc-9","color":"#FFFFFF","x":0,"y":1,"z":0,"qx":0,"qy":0,"qz":0,"qw":1}]}"##,
    );
    stepper.frame_step(1);
    let entity = stepper
        .remotes(0)
        .get(&NetworkId::from("player:abc-9"))
        .unwrap()
        .entity();
    assert_eq!(
        stepper.world(0).get::<Placeholder>(entity),
        Some(&Placeholder::Capsule)
    );
    assert_eq!(
        stepper.world(0).get::<Name>(entity).map(Name::as_str),
        Some("Remote Player [player:abc-9]")
    );
}

#[test]
fn test_malformed_frames_are_dropped() {
    let mut stepper = ClientStepper::single();
    stepper.connect_all();

    stepper.server.inject("not json");
    stepper.server.inject(r#"{"type":"chat","text":"hello"}"#);
    stepper.server.inject(r#"{"cubes":[]}"#);
    stepper.server.inject(r#"{"type":"cubes","cubes":[{"id":"cube:abc:1"}]}"#);
    stepper.frame_step(1);
    assert!(stepper.remotes(0).is_empty());
    assert_eq!(stepper.state(0), ClientState::Connected);

    // the dispatcher keeps working afterwards
    stepper.server.inject(CUBE_FRAME);
    stepper.frame_step(1);
    assert_eq!(stepper.remotes(0).len(), 1);
}

#[test]
fn test_orphaned_puppet_is_adopted() {
    let mut stepper = ClientStepper::single();
    let orphan = stepper
        .world_mut(0)
        .spawn((
            RemoteReplica {
                id: NetworkId::from("cube:abc:123"),
            },
            Transform::default(),
        ))
        .id();
    stepper.connect_all();

    stepper.server.inject(CUBE_FRAME);
    stepper.frame_step(1);
    assert_eq!(
        stepper.remotes(0).get(&NetworkId::from("cube:abc:123")),
        Some(RemoteEntity::Configured(orphan))
    );
    assert_eq!(count::<With<Placeholder>>(&mut stepper, 0), 0);
    assert_eq!(
        stepper.remote_translation(0, "cube:abc:123"),
        Some(Vec3::new(1.0, 2.0, 3.0))
    );
}

#[test]
fn test_puppets_are_not_published() {
    let mut stepper = ClientStepper::with_clients(2);
    // client 1 instantiates its puppets from a prefab that carries the local tags
    stepper
        .world_mut(1)
        .insert_resource(RemoteSpawner::new(TemplateSpawner::default().with_cube(
            |world: &mut World, pose: Pose, name: &str| {
                let child = world.spawn((Cube, Behaviour::new("Jump"))).id();
                world
                    .spawn((
                        Name::new(name.to_owned()),
                        Transform::from(pose),
                        Cube,
                        Behaviour::new("PlayerHandler"),
                        PhysicsBody {
                            kinematic: false,
                            linear_velocity: Vec3::X,
                            angular_velocity: Vec3::ZERO,
                        },
                    ))
                    .add_child(child)
                    .id()
            },
        )));
    stepper.world_mut(0).spawn((Cube, Transform::default()));
    stepper.world_mut(1).spawn((Player, Transform::default()));
    stepper.connect_all();
    stepper.frame_step(60);

    assert_eq!(stepper.remotes(1).len(), 1);
    let (_, puppet) = stepper.remotes(1).iter().next().unwrap();
    let world = stepper.world(1);
    assert!(world.get::<Cube>(puppet.entity()).is_none());
    assert!(!world.get::<Behaviour>(puppet.entity()).unwrap().enabled);
    assert!(world.get::<PhysicsBody>(puppet.entity()).unwrap().kinematic);
    assert_eq!(count::<With<Cube>>(&mut stepper, 1), 0);

    // client 1 only publishes its own player
    assert_eq!(stepper.world(1).resource::<ReplicationSet>().len(), 1);
    assert_eq!(stepper.remotes(0).len(), 1);
    assert!(stepper.remotes(0).get(&stepper.player_id(1)).is_some());
}

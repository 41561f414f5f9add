//! Ragdoll spawning and rendering in the viewer.
//!
//! Physics parts carry no meshes. Each part gets a separate mesh entity
//! tagged with [`BoneVisual`], whose transform is copied from the body every
//! frame before transform propagation.

use std::collections::HashMap;

use avian3d::prelude::*;
use bevy::{prelude::*, transform::TransformSystems};
use leafwing_input_manager::prelude::*;
use rand::Rng;

use ragdoll_viewer::{
    constants::{SPAWN_HEIGHT, SPAWN_SPREAD},
    ragdoll::{
        skeleton::{Bone, BoneShape, RagdollBlueprint},
        spawn_ragdoll,
    },
};

use crate::{input::ViewerAction, launch_params::LaunchParams};

/// Plugin for ragdoll spawning and mesh sync.
pub struct RagdollViewPlugin;

impl Plugin for RagdollViewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RagdollActions>()
            .add_systems(Startup, (setup_ragdoll_assets, queue_initial_ragdolls))
            .add_systems(
                Update,
                (spawn_ragdoll_shortcut, process_ragdoll_spawns).chain(),
            )
            .add_systems(
                PostUpdate,
                sync_bone_visuals.before(TransformSystems::Propagate),
            );
    }
}

/// Pending ragdoll requests from the UI, keyboard and startup.
#[derive(Resource, Debug, Default)]
pub struct RagdollActions {
    pending_spawns: usize,
}

impl RagdollActions {
    /// Queue one more ragdoll.
    pub fn request_spawn(&mut self) {
        self.pending_spawns += 1;
    }

    /// Take all queued requests.
    pub fn take(&mut self) -> usize {
        std::mem::take(&mut self.pending_spawns)
    }
}

/// Mesh entity following a ragdoll part.
#[derive(Component, Debug, Clone, Copy)]
pub struct BoneVisual {
    /// The rigid body this mesh follows.
    pub body: Entity,
}

/// Blueprint and meshes shared by all spawned ragdolls.
#[derive(Resource)]
pub struct RagdollAssets {
    blueprint: RagdollBlueprint,
    meshes: HashMap<Bone, Handle<Mesh>>,
}

fn bone_mesh(shape: &BoneShape) -> Mesh {
    match *shape {
        BoneShape::Cuboid { half_extents } => Cuboid::from_size(half_extents * 2.0).into(),
        BoneShape::Capsule {
            radius,
            half_length,
        } => Capsule3d::new(radius, half_length * 2.0).into(),
        BoneShape::Sphere { radius } => Sphere::new(radius).into(),
    }
}

fn setup_ragdoll_assets(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    let blueprint = RagdollBlueprint::humanoid();
    if let Err(err) = blueprint.validate() {
        tracing::error!("Ragdoll blueprint is invalid, spawning disabled: {err}");
        return;
    }

    let meshes = blueprint
        .bones
        .iter()
        .map(|spec| (spec.bone, meshes.add(bone_mesh(&spec.shape))))
        .collect();

    tracing::info!(
        "Ragdoll blueprint ready: {} bones, {:.2} m tall",
        blueprint.bones.len(),
        blueprint.height()
    );
    commands.insert_resource(RagdollAssets { blueprint, meshes });
}

fn queue_initial_ragdolls(params: Res<LaunchParams>, mut actions: ResMut<RagdollActions>) {
    for _ in 0..params.ragdolls {
        actions.request_spawn();
    }
}

fn spawn_ragdoll_shortcut(
    query: Query<&ActionState<ViewerAction>>,
    mut actions: ResMut<RagdollActions>,
) {
    for action_state in &query {
        if action_state.just_pressed(&ViewerAction::SpawnRagdoll) {
            actions.request_spawn();
        }
    }
}

/// Drop height of the `index`-th ragdoll spawned in one frame.
///
/// Each one starts a figure height above the previous so a batch stacks
/// instead of spawning interpenetrating.
fn batch_spawn_height(index: usize, figure_height: f32) -> f32 {
    SPAWN_HEIGHT + index as f32 * figure_height
}

/// Spawn queued ragdolls at random spots above the ground.
fn process_ragdoll_spawns(
    mut commands: Commands,
    mut actions: ResMut<RagdollActions>,
    assets: Option<Res<RagdollAssets>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(assets) = assets else {
        return;
    };
    if actions.pending_spawns == 0 {
        return;
    }

    let figure_height = assets.blueprint.height();
    let mut rng = rand::rng();
    for index in 0..actions.take() {
        let origin = Vec3::new(
            rng.random_range(-SPAWN_SPREAD..=SPAWN_SPREAD),
            batch_spawn_height(index, figure_height),
            rng.random_range(-SPAWN_SPREAD..=SPAWN_SPREAD),
        );
        let yaw = rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
        let material = materials.add(StandardMaterial {
            base_color: Color::hsl(rng.random_range(0.0..360.0), 0.55, 0.55),
            perceptual_roughness: 0.7,
            ..default()
        });

        let spawned = spawn_ragdoll(&mut commands, &assets.blueprint, origin, yaw);
        for part in &spawned.parts {
            let Some(mesh) = assets.meshes.get(&part.bone) else {
                continue;
            };
            commands.spawn((
                Name::new(format!("Ragdoll {} mesh", part.bone)),
                BoneVisual { body: part.entity },
                Mesh3d(mesh.clone()),
                MeshMaterial3d(material.clone()),
                part.transform,
            ));
        }
    }
}

/// Copy body poses onto their meshes and drop meshes whose body is gone.
fn sync_bone_visuals(
    mut commands: Commands,
    mut visuals: Query<(Entity, &BoneVisual, &mut Transform)>,
    bodies: Query<(&Position, &Rotation)>,
) {
    for (entity, visual, mut transform) in &mut visuals {
        match bodies.get(visual.body) {
            Ok((position, rotation)) => {
                transform.translation = position.0;
                transform.rotation = rotation.0;
            }
            Err(_) => commands.entity(entity).despawn(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;

    #[test]
    fn test_actions_take_drains_queue() {
        let mut actions = RagdollActions::default();
        actions.request_spawn();
        actions.request_spawn();
        assert_eq!(actions.take(), 2);
        assert_eq!(actions.take(), 0);
    }

    #[test]
    fn test_batch_spawns_do_not_overlap() {
        let blueprint = RagdollBlueprint::humanoid();
        let height = blueprint.height();
        assert!(height > 0.0);
        assert_eq!(batch_spawn_height(0, height), SPAWN_HEIGHT);
        for index in 1..5 {
            let gap = batch_spawn_height(index, height) - batch_spawn_height(index - 1, height);
            assert!(gap >= height - 1e-5, "gap {gap} below figure height {height}");
        }
    }

    #[test]
    fn test_bone_visuals_follow_bodies() {
        let mut world = World::new();
        let rotation = Quat::from_rotation_x(0.5);
        let body = world
            .spawn((Position(Vec3::new(1.0, 2.0, 3.0)), Rotation(rotation)))
            .id();
        let visual = world
            .spawn((BoneVisual { body }, Transform::default()))
            .id();

        world.run_system_once(sync_bone_visuals).unwrap();

        let transform = world.get::<Transform>(visual).unwrap();
        assert_eq!(transform.translation, Vec3::new(1.0, 2.0, 3.0));
        assert!(transform.rotation.angle_between(rotation) < 1e-6);
    }

    #[test]
    fn test_orphaned_bone_visuals_are_removed() {
        let mut world = World::new();
        let body = world.spawn_empty().id();
        world.despawn(body);
        let visual = world
            .spawn((BoneVisual { body }, Transform::default()))
            .id();

        world.run_system_once(sync_bone_visuals).unwrap();

        assert!(world.get_entity(visual).is_err());
    }

    #[test]
    fn test_every_humanoid_bone_has_a_mesh() {
        let blueprint = RagdollBlueprint::humanoid();
        for spec in &blueprint.bones {
            let mesh = bone_mesh(&spec.shape);
            assert!(mesh.count_vertices() > 0, "{} mesh is empty", spec.bone);
        }
    }
}

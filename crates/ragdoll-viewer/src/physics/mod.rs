//! Physics integration using Avian 3D.
//!
//! Owns the simulation settings edited by the UI, keeps avian's gravity in
//! step with them, spawns the static ground and tracks scene statistics.

pub mod debug;

use avian3d::debug_render::PhysicsDebugPlugin;
use avian3d::prelude::*;
use bevy::prelude::*;

use ragdoll_viewer::{
    constants::{DEFAULT_GRAVITY, GROUND_HALF_THICKNESS, GROUND_SIZE, KILL_HEIGHT},
    ragdoll::{GameLayer, Ragdoll, RagdollPart, despawn_ragdoll},
};

use crate::launch_params::LaunchParams;

/// Plugin for the physics world.
pub struct PhysicsIntegrationPlugin;

impl Plugin for PhysicsIntegrationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::default())
            .add_plugins(PhysicsDebugPlugin)
            .insert_resource(Gravity(Vec3::Y * DEFAULT_GRAVITY))
            .init_resource::<SimulationSettings>()
            .init_resource::<SceneStats>()
            .add_systems(
                Startup,
                (spawn_ground, debug::configure_physics_debug_on_startup),
            )
            .add_systems(
                Update,
                (
                    apply_gravity,
                    debug::toggle_physics_debug,
                    debug::apply_physics_debug,
                    despawn_fallen_ragdolls,
                    update_scene_stats,
                )
                    .chain(),
            );
    }
}

/// Simulation settings edited from the UI.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    /// Vertical gravity in m/s².
    pub gravity: f32,
    /// Whether collider and joint outlines are drawn.
    pub debug_physics: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            debug_physics: true,
        }
    }
}

impl SimulationSettings {
    pub fn from_launch_params(params: &LaunchParams) -> Self {
        Self {
            gravity: params.gravity,
            debug_physics: params.debug_physics,
        }
    }

    pub fn gravity_vector(&self) -> Vec3 {
        Vec3::Y * self.gravity
    }
}

/// Counts shown in the UI, recomputed every frame.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SceneStats {
    pub rigid_bodies: usize,
    pub ragdolls: usize,
}

/// Spawn the static ground slab with its top face at y = 0.
fn spawn_ground(mut commands: Commands) {
    commands.spawn((
        Name::new("Ground collider"),
        RigidBody::Static,
        Collider::cuboid(GROUND_SIZE, GROUND_HALF_THICKNESS * 2.0, GROUND_SIZE),
        Transform::from_xyz(0.0, -GROUND_HALF_THICKNESS, 0.0),
        CollisionLayers::new(GameLayer::Ground, [GameLayer::Ground, GameLayer::Ragdoll]),
    ));
}

/// Push the configured gravity into the physics world.
///
/// Runs every frame so the slider takes effect immediately.
fn apply_gravity(settings: Res<SimulationSettings>, mut gravity: ResMut<Gravity>) {
    let target = settings.gravity_vector();
    if gravity.0 != target {
        gravity.0 = target;
    }
}

fn update_scene_stats(
    mut stats: ResMut<SceneStats>,
    bodies: Query<(), With<RigidBody>>,
    ragdolls: Query<(), With<Ragdoll>>,
) {
    let current = SceneStats {
        rigid_bodies: bodies.iter().count(),
        ragdolls: ragdolls.iter().count(),
    };
    if *stats != current {
        *stats = current;
    }
}

/// Remove ragdolls that fell off the ground and kept falling.
fn despawn_fallen_ragdolls(
    mut commands: Commands,
    ragdolls: Query<(Entity, &Ragdoll)>,
    parts: Query<&Position, With<RagdollPart>>,
) {
    for (entity, ragdoll) in &ragdolls {
        let mut positions = parts.iter_many(&ragdoll.parts).peekable();
        if positions.peek().is_none() {
            continue;
        }
        if positions.all(|position| position.y < KILL_HEIGHT) {
            tracing::info!("Ragdoll {entity} fell out of the world, removing it");
            despawn_ragdoll(&mut commands, entity, ragdoll);
        }
    }
}
